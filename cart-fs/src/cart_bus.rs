use log::{trace, warn};

use crate::{register::{unpack, Opcode, Registers, TransferWord}, CartError, Frame, Result};

/// The single primitive provided by the controller
pub trait CartBus: Send {
  /// Execute one command. `buf` is filled by `ReadFrame`, consumed by
  /// `WriteFrame` and ignored otherwise. The returned word echoes the
  /// request with RT1 set on failure.
  fn transfer(&mut self, regstate: TransferWord, buf: Option<&mut Frame>) -> TransferWord;

  /// issue `op` and turn a raised status bit into an error
  fn execute(&mut self, op: Opcode, cartridge: u16, frame: u16, buf: Option<&mut Frame>) -> Result<()> {
    let regstate = Registers::command(op, cartridge, frame).pack();
    let oregstate = self.transfer(regstate, buf);
    trace!("{:?}: {:016x} -> {:016x}", op, regstate, oregstate);
    if unpack(oregstate).failed() {
      warn!("{:?} failed (cartridge {}, frame {})", op, cartridge, frame);
      return Err(CartError::Device { opcode: op, cartridge, frame });
    }
    Ok(())
  }

  fn init_system(&mut self) -> Result<()> {
    self.execute(Opcode::InitSystem, 0, 0, None)
  }

  fn power_off(&mut self) -> Result<()> {
    self.execute(Opcode::PowerOff, 0, 0, None)
  }

  fn load_cartridge(&mut self, cartridge: u16) -> Result<()> {
    self.execute(Opcode::LoadCartridge, cartridge, 0, None)
  }

  /// zero the currently loaded cartridge
  fn zero_cartridge(&mut self) -> Result<()> {
    self.execute(Opcode::ZeroCartridge, 0, 0, None)
  }

  /// read `frame` of the loaded cartridge into `buf`
  fn read_frame(&mut self, frame: u16, buf: &mut Frame) -> Result<()> {
    self.execute(Opcode::ReadFrame, 0, frame, Some(buf))
  }

  /// write `buf` to `frame` of the loaded cartridge
  fn write_frame(&mut self, frame: u16, buf: &mut Frame) -> Result<()> {
    self.execute(Opcode::WriteFrame, 0, frame, Some(buf))
  }
}
