use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use cart_fs::{Frame, FrameAddress, CART_CARTRIDGE_SIZE, FRAME_SZ};

const CARTRIDGE_BYTES: u64 = (CART_CARTRIDGE_SIZE * FRAME_SZ) as u64;

fn check_frame(addr: FrameAddress) -> io::Result<usize> {
  let frame = addr.frame as usize;
  if frame >= CART_CARTRIDGE_SIZE {
    return Err(io::Error::new(io::ErrorKind::InvalidInput, "no such frame"));
  }
  Ok(frame)
}

/// Where the simulated controller keeps frame contents
pub trait FrameStore {
  fn read_frame(&mut self, addr: FrameAddress, buf: &mut Frame) -> io::Result<()>;
  fn write_frame(&mut self, addr: FrameAddress, buf: &Frame) -> io::Result<()>;
  fn zero_cartridge(&mut self, cartridge: u16) -> io::Result<()>;
}

/// Frames held in memory. A cartridge is only allocated once written.
pub struct MemStore {
  cartridges: Vec<Option<Box<[Frame]>>>,
}

impl MemStore {
  pub fn new(cartridges: usize) -> Self {
    Self { cartridges: (0..cartridges).map(|_| None).collect() }
  }

  fn slot(&mut self, cartridge: u16) -> io::Result<&mut Option<Box<[Frame]>>> {
    self.cartridges
      .get_mut(cartridge as usize)
      .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no such cartridge"))
  }
}

impl FrameStore for MemStore {
  fn read_frame(&mut self, addr: FrameAddress, buf: &mut Frame) -> io::Result<()> {
    let frame = check_frame(addr)?;
    match self.slot(addr.cartridge)? {
      Some(frames) => buf.copy_from_slice(&frames[frame]),
      None => buf.fill(0),
    }
    Ok(())
  }

  fn write_frame(&mut self, addr: FrameAddress, buf: &Frame) -> io::Result<()> {
    let frame = check_frame(addr)?;
    let frames = self.slot(addr.cartridge)?
      .get_or_insert_with(|| vec![[0u8; FRAME_SZ]; CART_CARTRIDGE_SIZE].into_boxed_slice());
    frames[frame].copy_from_slice(buf);
    Ok(())
  }

  fn zero_cartridge(&mut self, cartridge: u16) -> io::Result<()> {
    *self.slot(cartridge)? = None;
    Ok(())
  }
}

/// Frames kept in a host image file, one cartridge after another
pub struct FileStore(File);

impl FileStore {
  /// Create (or truncate) an image large enough for `cartridges`
  pub fn create<P: AsRef<Path>>(path: P, cartridges: usize) -> io::Result<Self> {
    let f = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(true)
      .open(path)?;
    f.set_len(cartridges as u64 * CARTRIDGE_BYTES)?;
    Ok(Self(f))
  }

  /// Reuse an existing image
  pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
    let f = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(Self(f))
  }

  /// Number of whole cartridges in the image
  pub fn cartridges(&self) -> io::Result<usize> {
    Ok((self.0.metadata()?.len() / CARTRIDGE_BYTES) as usize)
  }

  fn seek_to(&mut self, addr: FrameAddress) -> io::Result<()> {
    check_frame(addr)?;
    self.0.seek(SeekFrom::Start((addr.index() * FRAME_SZ) as u64))?;
    Ok(())
  }
}

impl FrameStore for FileStore {
  fn read_frame(&mut self, addr: FrameAddress, buf: &mut Frame) -> io::Result<()> {
    self.seek_to(addr)?;
    self.0.read_exact(buf)
  }

  fn write_frame(&mut self, addr: FrameAddress, buf: &Frame) -> io::Result<()> {
    self.seek_to(addr)?;
    self.0.write_all(buf)
  }

  fn zero_cartridge(&mut self, cartridge: u16) -> io::Result<()> {
    let zeros = [0u8; FRAME_SZ];
    self.seek_to(FrameAddress::new(cartridge, 0))?;
    for _ in 0..CART_CARTRIDGE_SIZE {
      self.0.write_all(&zeros)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn exercise(store: &mut dyn FrameStore) {
    let mut buf = [0u8; FRAME_SZ];
    let addr = FrameAddress::new(1, 1023);
    store.write_frame(addr, &[0x5a; FRAME_SZ]).unwrap();
    store.read_frame(addr, &mut buf).unwrap();
    assert_eq!(buf, [0x5a; FRAME_SZ]);
    store.read_frame(FrameAddress::new(1, 0), &mut buf).unwrap();
    assert_eq!(buf, [0; FRAME_SZ]);
    store.zero_cartridge(1).unwrap();
    store.read_frame(addr, &mut buf).unwrap();
    assert_eq!(buf, [0; FRAME_SZ]);

    let past = FrameAddress::new(0, CART_CARTRIDGE_SIZE as u16);
    let err = store.read_frame(past, &mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let err = store.write_frame(past, &[0x5a; FRAME_SZ]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    // the next cartridge is untouched
    store.read_frame(FrameAddress::new(1, 0), &mut buf).unwrap();
    assert_eq!(buf, [0; FRAME_SZ]);
  }

  #[test]
  fn mem_store() {
    let mut store = MemStore::new(2);
    exercise(&mut store);
    assert!(store.zero_cartridge(2).is_err());
  }

  #[test]
  fn file_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::create(dir.path().join("cart.img"), 2).unwrap();
    assert_eq!(store.cartridges().unwrap(), 2);
    exercise(&mut store);
  }
}
