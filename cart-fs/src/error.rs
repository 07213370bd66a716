use alloc::string::String;

use thiserror::Error;

use crate::{register::Opcode, table::FileHandle};

/// Errors reported by the cartridge filesystem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
  #[error("unknown file handle {0}")]
  InvalidHandle(FileHandle),
  #[error("file handle {0} is not open")]
  NotOpen(FileHandle),
  #[error("`{0}` is already open")]
  AlreadyOpen(String),
  #[error("offset {offset} is past the end of file ({end})")]
  OutOfRange { offset: usize, end: usize },
  #[error("no free frames left on the device")]
  DeviceFull,
  #[error("file table is full")]
  TooManyFiles,
  #[error("path is empty or too long")]
  InvalidPath,
  /// The controller raised RT1. For frame commands `cartridge` is the
  /// mounted cartridge, otherwise the CT1 register of the command.
  #[error("{opcode:?} failed (cartridge {cartridge}, frame {frame})")]
  Device { opcode: Opcode, cartridge: u16, frame: u16 },
  #[error("device is powered off")]
  PoweredOff,
  #[error("invalid device configuration")]
  InvalidConfig,
}

impl CartError {
  /// Attribute a device failure to `cartridge`. Frame commands carry no
  /// cartridge of their own.
  pub(crate) fn on_cartridge(self, cartridge: u16) -> Self {
    match self {
      CartError::Device { opcode, frame, .. } => CartError::Device { opcode, cartridge, frame },
      other => other,
    }
  }
}
