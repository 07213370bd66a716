use alloc::{vec, vec::Vec};
use log::warn;

use crate::{layout::FrameAddress, CartError, Result, CART_CARTRIDGE_SIZE};

/// one word of the in-memory bitmap
type BitmapWord = u64;

const WORD_BITS: usize = BitmapWord::BITS as usize;
const WORDS_PER_CARTRIDGE: usize = CART_CARTRIDGE_SIZE / WORD_BITS;

/// Free-frame pool. Bit `n` stands for frame `n % 1024` of cartridge
/// `n / 1024`, so scanning upwards hands out the lowest cartridge, then
/// the lowest frame, first.
pub struct FrameBitmap {
  words: Vec<BitmapWord>,
  /// frames still free
  free: usize,
}

fn decompose(bit: usize) -> (usize, usize) {
  (bit / WORD_BITS, bit % WORD_BITS)
}

impl FrameBitmap {
  /// A fully free pool spanning `cartridges` cartridges
  pub fn new(cartridges: usize) -> Self {
    Self {
      words: vec![0; cartridges * WORDS_PER_CARTRIDGE],
      free: cartridges * CART_CARTRIDGE_SIZE,
    }
  }

  /// Take the lowest free frame and mark it used
  pub fn alloc(&mut self) -> Result<FrameAddress> {
    let (word_pos, inner_pos) = match self.words
      .iter()
      .enumerate()
      .find(|(_, word)| **word != BitmapWord::MAX)
      .map(|(idx, word)| (idx, word.trailing_ones() as usize)) {
      Some(pos) => pos,
      None => {
        warn!("no free frames left");
        return Err(CartError::DeviceFull);
      }
    };
    self.words[word_pos] |= 1u64 << inner_pos;
    self.free -= 1;
    Ok(FrameAddress::from_index(word_pos * WORD_BITS + inner_pos))
  }

  /// Allocate a frame and append it to `frames` in the same step, so the
  /// pool and the owner never disagree.
  pub fn alloc_into(&mut self, frames: &mut Vec<FrameAddress>) -> Result<FrameAddress> {
    let addr = self.alloc()?;
    frames.push(addr);
    Ok(addr)
  }

  pub fn is_allocated(&self, addr: FrameAddress) -> bool {
    let (word_pos, inner_pos) = decompose(addr.index());
    self.words
      .get(word_pos)
      .map_or(false, |word| (word >> inner_pos) & 1 == 1)
  }

  /// Number of frames still free
  pub fn free(&self) -> usize {
    self.free
  }

  /// Total frames managed
  pub fn maximum(&self) -> usize {
    self.words.len() * WORD_BITS
  }
}
