//! Logical layout of a file over the frame space
use core::{cmp::{max, min}, fmt};

use alloc::{string::String, vec::Vec};

use crate::{bitmap::FrameBitmap, cart_bus::CartBus, CartError, Frame, Result, CART_CARTRIDGE_SIZE, FRAME_SZ};

/// Physical location of one frame
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameAddress {
  pub cartridge: u16,
  pub frame: u16,
}

impl FrameAddress {
  pub fn new(cartridge: u16, frame: u16) -> Self {
    Self { cartridge, frame }
  }

  /// Address of the `index`-th frame counting across cartridges
  pub fn from_index(index: usize) -> Self {
    Self {
      cartridge: (index / CART_CARTRIDGE_SIZE) as u16,
      frame: (index % CART_CARTRIDGE_SIZE) as u16,
    }
  }

  pub fn index(&self) -> usize {
    self.cartridge as usize * CART_CARTRIDGE_SIZE + self.frame as usize
  }

  /// Mount this frame's cartridge and read the frame into `buf`
  fn fetch(&self, bus: &mut dyn CartBus, buf: &mut Frame) -> Result<()> {
    bus.load_cartridge(self.cartridge)?;
    bus.read_frame(self.frame, buf)
      .map_err(|err| err.on_cartridge(self.cartridge))
  }

  /// Write `buf` back to this frame, its cartridge already mounted
  fn store(&self, bus: &mut dyn CartBus, buf: &mut Frame) -> Result<()> {
    bus.write_frame(self.frame, buf)
      .map_err(|err| err.on_cartridge(self.cartridge))
  }
}

impl fmt::Debug for FrameAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.cartridge, self.frame)
  }
}

/// Split `pos` into (index into the frame list, offset inside that frame)
fn decompose(pos: usize) -> (usize, usize) {
  (pos / FRAME_SZ, pos % FRAME_SZ)
}

/// Bytes of a transfer starting at `in_frame` that fit in the frame
fn frame_span(in_frame: usize, remaining: usize) -> usize {
  let span = min(FRAME_SZ - in_frame, remaining);
  assert!(in_frame + span <= FRAME_SZ);
  span
}

/// A file known to the device. Bytes `[i * 1024, (i + 1) * 1024)` live in
/// `frames[i]`.
#[derive(Debug, Clone)]
pub struct FileRecord {
  path: String,
  open: bool,
  /// logical length in bytes
  end_position: usize,
  /// cursor, never past `end_position`
  current_position: usize,
  frames: Vec<FrameAddress>,
}

impl FileRecord {
  /// An empty, open record
  pub fn new(path: String) -> Self {
    Self {
      path,
      open: true,
      end_position: 0,
      current_position: 0,
      frames: Vec::new(),
    }
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn size(&self) -> usize {
    self.end_position
  }

  pub fn position(&self) -> usize {
    self.current_position
  }

  pub fn frames(&self) -> &[FrameAddress] {
    &self.frames
  }

  /// Open again, rewinding to the start
  pub(crate) fn reopen(&mut self) {
    self.open = true;
    self.current_position = 0;
  }

  pub(crate) fn close(&mut self) {
    self.open = false;
  }

  pub fn seek(&mut self, offset: usize) -> Result<()> {
    if offset > self.end_position {
      return Err(CartError::OutOfRange { offset, end: self.end_position });
    }
    self.current_position = offset;
    Ok(())
  }

  /// Frames missing for the list to cover `new_end` bytes
  pub fn frames_needed(&self, new_end: usize) -> usize {
    new_end.div_ceil(FRAME_SZ).saturating_sub(self.frames.len())
  }

  /// Grow the frame list until it covers `new_end` bytes. Frames taken
  /// before an exhausted pool stay with this file.
  fn increase_frames(&mut self, new_end: usize, bitmap: &mut FrameBitmap) -> Result<()> {
    for _ in 0..self.frames_needed(new_end) {
      bitmap.alloc_into(&mut self.frames)?;
    }
    Ok(())
  }

  /// Read from the cursor into `buf`, at most up to the end of file.
  /// The cursor follows every completed frame, also when a later one fails.
  pub fn read(&mut self, buf: &mut [u8], bus: &mut dyn CartBus) -> Result<usize> {
    let end = min(self.end_position, self.current_position + buf.len());
    let read_size = end.saturating_sub(self.current_position);
    let mut done = 0usize;
    let mut scratch: Frame = [0; FRAME_SZ];
    while done < read_size {
      let (list_idx, in_frame) = decompose(self.current_position);
      let span = frame_span(in_frame, read_size - done);
      self.frames[list_idx].fetch(bus, &mut scratch)?;
      buf[done..done + span].copy_from_slice(&scratch[in_frame..in_frame + span]);
      done += span;
      self.current_position += span;
    }
    Ok(read_size)
  }

  /// Write `buf` at the cursor, growing the file as needed. Every frame
  /// goes through read-modify-write so neighbouring bytes survive.
  pub fn write(
    &mut self,
    buf: &[u8],
    bus: &mut dyn CartBus,
    bitmap: &mut FrameBitmap,
  ) -> Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }
    self.increase_frames(self.current_position + buf.len(), bitmap)?;
    let mut done = 0usize;
    let mut scratch: Frame = [0; FRAME_SZ];
    while done < buf.len() {
      let (list_idx, in_frame) = decompose(self.current_position);
      let span = frame_span(in_frame, buf.len() - done);
      let addr = self.frames[list_idx];
      addr.fetch(bus, &mut scratch)?;
      scratch[in_frame..in_frame + span].copy_from_slice(&buf[done..done + span]);
      addr.store(bus, &mut scratch)?;
      done += span;
      self.current_position += span;
      self.end_position = max(self.end_position, self.current_position);
    }
    Ok(done)
  }
}
