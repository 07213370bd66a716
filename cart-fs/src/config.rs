// Constants describing the cartridge device

/// Cartridges present in a fully populated device
pub const CART_MAX_CARTRIDGES: usize = 64;
/// Frames per cartridge
pub const CART_CARTRIDGE_SIZE: usize = 1024;
/// Bytes per frame
pub const CART_FRAME_SIZE: usize = 1024;

/// Maximum number of files ever known to one powered-on device
pub const CART_MAX_TOTAL_FILES: usize = 1024;
/// Maximum path length in bytes
pub const CART_MAX_PATH_LENGTH: usize = 128;

/// Runtime knobs for a `CartFs` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartConfig {
  /// number of cartridges initialized and handed out by the allocator
  pub cartridges: usize,
  /// capacity of the file table
  pub max_files: usize,
  /// longest accepted path, in bytes
  pub max_path_len: usize,
}

impl Default for CartConfig {
  fn default() -> Self {
    Self {
      cartridges: CART_MAX_CARTRIDGES,
      max_files: CART_MAX_TOTAL_FILES,
      max_path_len: CART_MAX_PATH_LENGTH,
    }
  }
}

impl CartConfig {
  /// A config that only populates the first `cartridges` cartridges
  pub fn with_cartridges(cartridges: usize) -> Self {
    Self { cartridges, ..Self::default() }
  }

  pub fn is_valid(&self) -> bool {
    (1..=CART_MAX_CARTRIDGES).contains(&self.cartridges) && self.max_files > 0 && self.max_path_len > 0
  }

  /// Total bytes addressable through this config
  pub fn capacity(&self) -> usize {
    self.cartridges * CART_CARTRIDGE_SIZE * CART_FRAME_SIZE
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_full_device() {
    let cfg = CartConfig::default();
    assert!(cfg.is_valid());
    assert_eq!(cfg.capacity(), 64 * 1024 * 1024);
  }

  #[test]
  fn cartridge_count_is_bounded() {
    assert!(!CartConfig::with_cartridges(0).is_valid());
    assert!(!CartConfig::with_cartridges(CART_MAX_CARTRIDGES + 1).is_valid());
    assert!(CartConfig::with_cartridges(1).is_valid());
  }
}
