use std::io;

use cart_fs::{unpack, CartBus, Frame, FrameAddress, Opcode, Registers, TransferWord, CART_CARTRIDGE_SIZE, CART_MAX_CARTRIDGES};
use log::{trace, warn};
use thiserror::Error;

use crate::store::{FileStore, FrameStore, MemStore};

/// Why the simulated controller rejected a command
#[derive(Debug, Error)]
pub enum SimFault {
  #[error("controller not initialized")]
  NotInitialized,
  #[error("controller is powered off")]
  PoweredOff,
  #[error("unknown opcode {0}")]
  UnknownOpcode(u8),
  #[error("cartridge {0} out of range")]
  BadCartridge(u16),
  #[error("frame {0} out of range")]
  BadFrame(u16),
  #[error("no cartridge loaded")]
  NoCartridge,
  #[error("frame command without a buffer")]
  MissingBuffer,
  #[error("injected fault")]
  Injected,
  #[error("backing store: {0}")]
  Io(#[from] io::Error),
}

/// Commands seen by the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
  pub init: usize,
  pub zero: usize,
  pub load: usize,
  pub read: usize,
  pub write: usize,
  pub power_off: usize,
  /// commands answered with RT1 set
  pub failed: usize,
}

impl TransferStats {
  pub fn total(&self) -> usize {
    self.init + self.zero + self.load + self.read + self.write + self.power_off
  }

  fn count(&mut self, op: Opcode) {
    match op {
      Opcode::InitSystem => self.init += 1,
      Opcode::ZeroCartridge => self.zero += 1,
      Opcode::LoadCartridge => self.load += 1,
      Opcode::ReadFrame => self.read += 1,
      Opcode::WriteFrame => self.write += 1,
      Opcode::PowerOff => self.power_off += 1,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  Uninitialized,
  Ready,
  Off,
}

/// Software model of the cartridge controller behind the transfer register
pub struct CartSim<S: FrameStore = MemStore> {
  store: S,
  cartridges: usize,
  state: State,
  loaded: Option<u16>,
  stats: TransferStats,
  /// commands left before an injected one-shot failure
  fail_countdown: Option<usize>,
  /// opcode that always fails
  fail_opcode: Option<Opcode>,
}

impl CartSim<MemStore> {
  /// An in-memory controller with `cartridges` cartridges
  pub fn new(cartridges: usize) -> Self {
    Self::with_store(MemStore::new(cartridges), cartridges)
  }
}

impl Default for CartSim<MemStore> {
  fn default() -> Self {
    Self::new(CART_MAX_CARTRIDGES)
  }
}

impl CartSim<FileStore> {
  /// A controller backed by an existing image file
  pub fn from_image(store: FileStore) -> io::Result<Self> {
    let cartridges = store.cartridges()?;
    Ok(Self::with_store(store, cartridges))
  }
}

impl<S: FrameStore> CartSim<S> {
  pub fn with_store(store: S, cartridges: usize) -> Self {
    Self {
      store,
      cartridges,
      state: State::Uninitialized,
      loaded: None,
      stats: TransferStats::default(),
      fail_countdown: None,
      fail_opcode: None,
    }
  }

  pub fn stats(&self) -> TransferStats {
    self.stats
  }

  pub fn reset_stats(&mut self) {
    self.stats = TransferStats::default();
  }

  /// Currently mounted cartridge
  pub fn loaded(&self) -> Option<u16> {
    self.loaded
  }

  /// Make the `n`-th command from now (1-based) fail once
  pub fn fail_nth(&mut self, n: usize) {
    self.fail_countdown = Some(n);
  }

  /// Make every `op` fail until `clear_faults`
  pub fn fail_opcode(&mut self, op: Opcode) {
    self.fail_opcode = Some(op);
  }

  pub fn clear_faults(&mut self) {
    self.fail_countdown = None;
    self.fail_opcode = None;
  }

  /// Raw frame contents, bypassing the register interface
  pub fn inspect_frame(&mut self, addr: FrameAddress) -> io::Result<Frame> {
    let mut buf = [0u8; cart_fs::FRAME_SZ];
    self.store.read_frame(addr, &mut buf)?;
    Ok(buf)
  }

  pub fn into_store(self) -> S {
    self.store
  }

  fn injected(&mut self, op: Opcode) -> bool {
    if self.fail_opcode == Some(op) {
      return true;
    }
    match self.fail_countdown {
      Some(1) => {
        self.fail_countdown = None;
        true
      }
      Some(n) => {
        self.fail_countdown = Some(n - 1);
        false
      }
      None => false,
    }
  }

  fn mounted_frame(&self, frame: u16) -> Result<FrameAddress, SimFault> {
    let cartridge = self.loaded.ok_or(SimFault::NoCartridge)?;
    if frame as usize >= CART_CARTRIDGE_SIZE {
      return Err(SimFault::BadFrame(frame));
    }
    Ok(FrameAddress::new(cartridge, frame))
  }

  fn execute(&mut self, regs: &Registers, buf: Option<&mut Frame>) -> Result<(), SimFault> {
    let op = regs.opcode().ok_or(SimFault::UnknownOpcode(regs.ky1))?;
    self.stats.count(op);
    if self.injected(op) {
      return Err(SimFault::Injected);
    }
    if op != Opcode::InitSystem {
      match self.state {
        State::Uninitialized => return Err(SimFault::NotInitialized),
        State::Off => return Err(SimFault::PoweredOff),
        State::Ready => {}
      }
    }
    match op {
      Opcode::InitSystem => {
        self.state = State::Ready;
        self.loaded = None;
      }
      Opcode::PowerOff => {
        self.state = State::Off;
        self.loaded = None;
      }
      Opcode::LoadCartridge => {
        if regs.ct1 as usize >= self.cartridges {
          return Err(SimFault::BadCartridge(regs.ct1));
        }
        self.loaded = Some(regs.ct1);
      }
      Opcode::ZeroCartridge => {
        let cartridge = self.loaded.ok_or(SimFault::NoCartridge)?;
        self.store.zero_cartridge(cartridge)?;
      }
      Opcode::ReadFrame => {
        let addr = self.mounted_frame(regs.fm1)?;
        let buf = buf.ok_or(SimFault::MissingBuffer)?;
        self.store.read_frame(addr, buf)?;
      }
      Opcode::WriteFrame => {
        let addr = self.mounted_frame(regs.fm1)?;
        let buf = buf.ok_or(SimFault::MissingBuffer)?;
        self.store.write_frame(addr, buf)?;
      }
    }
    Ok(())
  }
}

impl<S: FrameStore + Send> CartBus for CartSim<S> {
  fn transfer(&mut self, regstate: TransferWord, buf: Option<&mut Frame>) -> TransferWord {
    let mut regs = unpack(regstate);
    regs.rt1 = match self.execute(&regs, buf) {
      Ok(()) => 0,
      Err(fault) => {
        warn!("cart sim: {:016x} rejected: {}", regstate, fault);
        self.stats.failed += 1;
        1
      }
    };
    trace!("cart sim: {:016x} -> {:?}", regstate, regs);
    regs.pack()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ready(cartridges: usize) -> CartSim {
    let mut sim = CartSim::new(cartridges);
    sim.init_system().unwrap();
    sim
  }

  #[test]
  fn commands_before_init_fail() {
    let mut sim = CartSim::new(1);
    assert!(sim.load_cartridge(0).is_err());
    assert!(sim.init_system().is_ok());
    assert!(sim.load_cartridge(0).is_ok());
    assert_eq!(sim.stats().failed, 1);
  }

  #[test]
  fn frame_commands_need_a_cartridge() {
    let mut sim = ready(1);
    let mut buf = [0u8; cart_fs::FRAME_SZ];
    assert!(sim.read_frame(0, &mut buf).is_err());
    assert!(sim.zero_cartridge().is_err());
    sim.load_cartridge(0).unwrap();
    assert!(sim.read_frame(0, &mut buf).is_ok());
    assert!(sim.read_frame(1024, &mut buf).is_err());
  }

  #[test]
  fn out_of_range_cartridge() {
    let mut sim = ready(2);
    assert!(sim.load_cartridge(1).is_ok());
    assert_eq!(
      sim.load_cartridge(2),
      Err(cart_fs::CartError::Device { opcode: Opcode::LoadCartridge, cartridge: 2, frame: 0 })
    );
  }

  #[test]
  fn status_bit_is_set_on_failure() {
    let mut sim = CartSim::new(1);
    let word = Registers::command(Opcode::LoadCartridge, 0, 0).pack();
    let reply = unpack(sim.transfer(word, None));
    assert!(reply.failed());
    assert_eq!((reply.ky1, reply.ct1), (Opcode::LoadCartridge as u8, 0));
  }

  #[test]
  fn unknown_opcode_fails() {
    let mut sim = ready(1);
    let reply = unpack(sim.transfer(cart_fs::pack(9, 0, 0, 0, 0), None));
    assert!(reply.failed());
  }

  #[test]
  fn write_then_read_frame() {
    let mut sim = ready(1);
    sim.load_cartridge(0).unwrap();
    let mut buf = [0xc3u8; cart_fs::FRAME_SZ];
    sim.write_frame(7, &mut buf).unwrap();
    let mut back = [0u8; cart_fs::FRAME_SZ];
    sim.read_frame(7, &mut back).unwrap();
    assert_eq!(back, buf);
    assert_eq!(sim.inspect_frame(FrameAddress::new(0, 7)).unwrap(), buf);
  }

  #[test]
  fn inspect_out_of_range_frame() {
    let mut sim = ready(1);
    let err = sim.inspect_frame(FrameAddress::new(0, 1024)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert!(sim.inspect_frame(FrameAddress::new(1, 0)).is_err());
  }

  #[test]
  fn power_off_until_reinit() {
    let mut sim = ready(1);
    sim.power_off().unwrap();
    assert!(sim.load_cartridge(0).is_err());
    sim.init_system().unwrap();
    assert!(sim.load_cartridge(0).is_ok());
  }

  #[test]
  fn injected_faults() {
    let mut sim = ready(1);
    sim.fail_nth(2);
    assert!(sim.load_cartridge(0).is_ok());
    assert!(sim.load_cartridge(0).is_err());
    assert!(sim.load_cartridge(0).is_ok());
    sim.fail_opcode(Opcode::LoadCartridge);
    assert!(sim.load_cartridge(0).is_err());
    assert!(sim.load_cartridge(0).is_err());
    sim.clear_faults();
    assert!(sim.load_cartridge(0).is_ok());
  }
}
