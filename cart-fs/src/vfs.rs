use alloc::{sync::Arc, vec::Vec};
use spin::Mutex;

use crate::{cart_bus::CartBus, fs::CartFs, table::FileHandle, Result, FRAME_SZ};

/// An open file on a shared device. Each call holds the device lock for
/// its whole duration, so calls from several owners never interleave.
/// Dropping the file closes it.
pub struct CartFile<B: CartBus> {
  handle: FileHandle,
  fs: Arc<Mutex<CartFs<B>>>,
  /// set once the handle has been given back
  closed: bool,
}

impl<B: CartBus> CartFile<B> {
  pub fn open(fs: &Arc<Mutex<CartFs<B>>>, path: &str) -> Result<Self> {
    let handle = fs.lock().open(path)?;
    Ok(Self { handle, fs: fs.clone(), closed: false })
  }

  pub fn handle(&self) -> FileHandle {
    self.handle
  }

  pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
    self.fs.lock().read_into(self.handle, buf)
  }

  pub fn write(&self, buf: &[u8]) -> Result<usize> {
    self.fs.lock().write(self.handle, buf)
  }

  pub fn seek(&self, offset: usize) -> Result<()> {
    self.fs.lock().seek(self.handle, offset)
  }

  pub fn size(&self) -> Result<usize> {
    self.fs.lock().size(self.handle)
  }

  /// Read everything from the cursor to the end of file
  pub fn read_all(&self) -> Result<Vec<u8>> {
    let mut buf = [0u8; FRAME_SZ];
    let mut vec = Vec::new();
    loop {
      let len = self.read(&mut buf)?;
      if len == 0 {
        break;
      }
      vec.extend_from_slice(&buf[..len]);
    }
    Ok(vec)
  }

  /// Close the file, giving the handle back
  pub fn close(mut self) -> Result<FileHandle> {
    self.closed = true;
    self.fs.lock().close(self.handle)?;
    Ok(self.handle)
  }
}

impl<B: CartBus> Drop for CartFile<B> {
  fn drop(&mut self) {
    if self.closed {
      return;
    }
    // NotOpen and PoweredOff leave nothing to undo
    let _ = self.fs.lock().close(self.handle);
  }
}
