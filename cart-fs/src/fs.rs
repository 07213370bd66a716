use alloc::{string::String, sync::Arc, vec, vec::Vec};
use log::{debug, info};
use spin::Mutex;

use crate::{
  bitmap::FrameBitmap,
  cart_bus::CartBus,
  layout::FileRecord,
  table::{FileHandle, FileTable},
  CartConfig, CartError, Result,
};

/// A powered-on cartridge device together with its file table and
/// free-frame pool.
pub struct CartFs<B: CartBus> {
  bus: B,
  config: CartConfig,
  files: FileTable,
  frame_bitmap: FrameBitmap,
  powered: bool,
}

impl<B: CartBus> CartFs<B> {
  /// Initialize the controller, load and zero every configured cartridge,
  /// and start from an empty file table.
  pub fn power_on(mut bus: B, config: CartConfig) -> Result<Self> {
    if !config.is_valid() {
      return Err(CartError::InvalidConfig);
    }
    bus.init_system()?;
    for cartridge in 0..config.cartridges {
      bus.load_cartridge(cartridge as u16)?;
      bus.zero_cartridge()?;
    }
    let frame_bitmap = FrameBitmap::new(config.cartridges);
    info!(
      "powered on: {} cartridges, {} frames, {} bytes",
      config.cartridges,
      frame_bitmap.maximum(),
      config.capacity()
    );
    Ok(Self {
      bus,
      config,
      files: FileTable::new(config.max_files, config.max_path_len),
      frame_bitmap,
      powered: true,
    })
  }

  /// Same as `power_on`, wrapped for sharing between `CartFile`s
  pub fn power_on_shared(bus: B, config: CartConfig) -> Result<Arc<Mutex<Self>>> {
    Ok(Arc::new(Mutex::new(Self::power_on(bus, config)?)))
  }

  /// Power the controller off. Files left open stay marked open.
  pub fn power_off(&mut self) -> Result<()> {
    self.check_powered()?;
    self.bus.power_off()?;
    self.powered = false;
    if self.files.is_empty() {
      info!("powered off, no files");
    } else {
      info!("powered off with {} files", self.files.len());
    }
    Ok(())
  }

  pub fn is_powered(&self) -> bool {
    self.powered
  }

  fn check_powered(&self) -> Result<()> {
    if self.powered {
      Ok(())
    } else {
      Err(CartError::PoweredOff)
    }
  }

  pub fn open(&mut self, path: &str) -> Result<FileHandle> {
    self.check_powered()?;
    let handle = self.files.open(path)?;
    debug!("open {} -> {}", path, handle);
    Ok(handle)
  }

  pub fn close(&mut self, handle: FileHandle) -> Result<()> {
    self.check_powered()?;
    self.files.close(handle)?;
    debug!("close {}", handle);
    Ok(())
  }

  /// Read up to `buf.len()` bytes at the cursor, returning how many were read
  pub fn read_into(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize> {
    self.check_powered()?;
    let file = self.files.get_open(handle)?;
    let read_size = file.read(buf, &mut self.bus)?;
    debug!("read {}: {} bytes, cursor {}", handle, read_size, file.position());
    Ok(read_size)
  }

  /// Read up to `count` bytes at the cursor
  pub fn read(&mut self, handle: FileHandle, count: usize) -> Result<Vec<u8>> {
    self.check_powered()?;
    let file = self.files.get_open(handle)?;
    let mut buf = vec![0u8; count.min(file.size().saturating_sub(file.position()))];
    let read_size = self.read_into(handle, &mut buf)?;
    buf.truncate(read_size);
    Ok(buf)
  }

  /// Write all of `buf` at the cursor, growing the file as needed
  pub fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize> {
    self.check_powered()?;
    let file = self.files.get_open(handle)?;
    let write_size = file.write(buf, &mut self.bus, &mut self.frame_bitmap)?;
    debug!(
      "write {}: {} bytes, cursor {}, size {}",
      handle,
      write_size,
      file.position(),
      file.size()
    );
    Ok(write_size)
  }

  /// Move the cursor to `offset`, which may equal the file size
  pub fn seek(&mut self, handle: FileHandle, offset: usize) -> Result<()> {
    self.check_powered()?;
    self.files.get_open(handle)?.seek(offset)?;
    debug!("seek {} to {}", handle, offset);
    Ok(())
  }

  /// Current cursor of an open file
  pub fn tell(&mut self, handle: FileHandle) -> Result<usize> {
    self.check_powered()?;
    Ok(self.files.get_open(handle)?.position())
  }

  /// Logical length of any known file
  pub fn size(&self, handle: FileHandle) -> Result<usize> {
    Ok(self.files.get(handle)?.size())
  }

  pub fn is_open(&self, handle: FileHandle) -> Result<bool> {
    Ok(self.files.get(handle)?.is_open())
  }

  pub fn lookup(&self, path: &str) -> Option<FileHandle> {
    self.files.lookup(path)
  }

  /// Record behind `handle`, for inspection
  pub fn record(&self, handle: FileHandle) -> Result<&FileRecord> {
    self.files.get(handle)
  }

  /// Every known file, in handle order
  pub fn records(&self) -> impl Iterator<Item = (FileHandle, &FileRecord)> {
    self.files.records()
  }

  /// Paths of every known file
  pub fn ls(&self) -> Vec<String> {
    self.files.ls()
  }

  pub fn free_frames(&self) -> usize {
    self.frame_bitmap.free()
  }

  pub fn config(&self) -> &CartConfig {
    &self.config
  }

  pub fn bus(&self) -> &B {
    &self.bus
  }

  pub fn bus_mut(&mut self) -> &mut B {
    &mut self.bus
  }

  /// Give the controller back
  pub fn into_bus(self) -> B {
    self.bus
  }
}
