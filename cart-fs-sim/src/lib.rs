//! Host-side model of the cartridge controller, for running `cart-fs`
//! off-target.

mod sim;
mod store;

pub use sim::{CartSim, SimFault, TransferStats};
pub use store::{FileStore, FrameStore, MemStore};

/// Route `log` output through `env_logger`; set `RUST_LOG=trace` to see
/// every transfer word.
pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}
