#![no_std]

extern crate alloc;

mod config;
mod register;
mod cart_bus;
mod bitmap;
mod layout;
mod table;
mod error;
mod fs;
mod vfs;

pub use config::*;
pub use register::{pack, unpack, Opcode, Registers, TransferWord};
pub use cart_bus::CartBus;
pub use bitmap::FrameBitmap;
pub use layout::{FileRecord, FrameAddress};
pub use table::{FileHandle, FileTable};
pub use error::CartError;
pub use fs::CartFs;
pub use vfs::CartFile;

pub const FRAME_SZ: usize = CART_FRAME_SIZE;
/// One physical frame as carried across the bus
pub type Frame = [u8; FRAME_SZ];

pub type Result<T> = core::result::Result<T, CartError>;
