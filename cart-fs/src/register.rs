//! Packing of the controller's 64-bit transfer register
//!
//! Bit 0 of the register is the most significant bit, so with `BitField`
//! (least significant bit is 0) the fields land at:
//!
//! | field | register bits | u64 bits |
//! |-------|---------------|----------|
//! | KY1   | 0-7           | 56..64   |
//! | KY2   | 8-15          | 48..56   |
//! | RT1   | 16            | 47       |
//! | CT1   | 17-32         | 31..47   |
//! | FM1   | 33-48         | 15..31   |
//!
//! and the low 15 bits are unused.
use core::{fmt, ops::Range};

use bit_field::BitField;

const KY1_BITS: Range<usize> = 56..64;
const KY2_BITS: Range<usize> = 48..56;
const RT1_BIT: usize = 47;
const CT1_BITS: Range<usize> = 31..47;
const FM1_BITS: Range<usize> = 15..31;

/// Instructions understood by the controller
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  /// initialize the memory interface
  InitSystem = 0,
  /// zero the currently loaded cartridge
  ZeroCartridge = 1,
  /// load the cartridge named in CT1
  LoadCartridge = 2,
  /// read the frame named in FM1 from the loaded cartridge
  ReadFrame = 3,
  /// write the frame named in FM1 of the loaded cartridge
  WriteFrame = 4,
  PowerOff = 5,
}

impl TryFrom<u8> for Opcode {
  type Error = u8;

  fn try_from(value: u8) -> Result<Self, u8> {
    Ok(match value {
      0 => Opcode::InitSystem,
      1 => Opcode::ZeroCartridge,
      2 => Opcode::LoadCartridge,
      3 => Opcode::ReadFrame,
      4 => Opcode::WriteFrame,
      5 => Opcode::PowerOff,
      other => return Err(other),
    })
  }
}

/// Raw value exchanged with the bus
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferWord(pub u64);

impl fmt::Debug for TransferWord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TransferWord({:016x})", self.0)
  }
}

impl fmt::LowerHex for TransferWord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::LowerHex::fmt(&self.0, f)
  }
}

/// The five logical registers carried by a `TransferWord`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
  /// opcode
  pub ky1: u8,
  /// reserved
  pub ky2: u8,
  /// status, 0 on success and 1 on failure
  pub rt1: u8,
  /// cartridge index
  pub ct1: u16,
  /// frame index
  pub fm1: u16,
}

impl Registers {
  /// A request for `op`, with a clear status bit
  pub fn command(op: Opcode, cartridge: u16, frame: u16) -> Self {
    Self {
      ky1: op as u8,
      ky2: 0,
      rt1: 0,
      ct1: cartridge,
      fm1: frame,
    }
  }

  pub fn opcode(&self) -> Option<Opcode> {
    Opcode::try_from(self.ky1).ok()
  }

  pub fn failed(&self) -> bool {
    self.rt1 != 0
  }

  pub fn pack(&self) -> TransferWord {
    pack(self.ky1, self.ky2, self.rt1, self.ct1, self.fm1)
  }
}

/// Build a register value. `rt1` is masked to its single bit.
pub fn pack(ky1: u8, ky2: u8, rt1: u8, ct1: u16, fm1: u16) -> TransferWord {
  let mut regstate = 0u64;
  regstate.set_bits(KY1_BITS, ky1 as u64);
  regstate.set_bits(KY2_BITS, ky2 as u64);
  regstate.set_bit(RT1_BIT, rt1 & 0x1 != 0);
  regstate.set_bits(CT1_BITS, ct1 as u64);
  regstate.set_bits(FM1_BITS, fm1 as u64);
  TransferWord(regstate)
}

/// Split a register value back into its fields. Unused bits are ignored.
pub fn unpack(word: TransferWord) -> Registers {
  let regstate = word.0;
  Registers {
    ky1: regstate.get_bits(KY1_BITS) as u8,
    ky2: regstate.get_bits(KY2_BITS) as u8,
    rt1: regstate.get_bit(RT1_BIT) as u8,
    ct1: regstate.get_bits(CT1_BITS) as u16,
    fm1: regstate.get_bits(FM1_BITS) as u16,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_positions() {
    assert_eq!(pack(0xff, 0, 0, 0, 0).0, 0xff00_0000_0000_0000);
    assert_eq!(pack(0, 0xff, 0, 0, 0).0, 0x00ff_0000_0000_0000);
    assert_eq!(pack(0, 0, 1, 0, 0).0, 0x0000_8000_0000_0000);
    assert_eq!(pack(0, 0, 0, 0xffff, 0).0, 0x0000_7fff_8000_0000);
    assert_eq!(pack(0, 0, 0, 0, 0xffff).0, 0x0000_0000_7fff_8000);
  }

  #[test]
  fn load_cartridge_word() {
    let word = Registers::command(Opcode::LoadCartridge, 3, 0).pack();
    assert_eq!(word.0, (2u64 << 56) | (3u64 << 31));
  }

  #[test]
  fn status_is_masked_to_one_bit() {
    assert_eq!(pack(0, 0, 0xfe, 0, 0).0, 0);
    assert_eq!(unpack(pack(0, 0, 0x3, 0, 0)).rt1, 1);
  }

  #[test]
  fn unpack_inverts_pack() {
    let cases = [
      (0u8, 0u8, 0u8, 0u16, 0u16),
      (Opcode::WriteFrame as u8, 0, 1, 63, 1023),
      (0xff, 0xff, 1, 0xffff, 0xffff),
      (0x5a, 0xa5, 0, 0x8001, 0x7ffe),
    ];
    for (ky1, ky2, rt1, ct1, fm1) in cases {
      let regs = unpack(pack(ky1, ky2, rt1, ct1, fm1));
      assert_eq!(regs, Registers { ky1, ky2, rt1, ct1, fm1 });
    }
  }

  #[test]
  fn unused_bits_are_ignored() {
    let word = TransferWord(pack(1, 2, 1, 3, 4).0 | 0x7fff);
    assert_eq!(unpack(word), Registers { ky1: 1, ky2: 2, rt1: 1, ct1: 3, fm1: 4 });
  }

  #[test]
  fn opcode_decoding() {
    for op in [
      Opcode::InitSystem,
      Opcode::ZeroCartridge,
      Opcode::LoadCartridge,
      Opcode::ReadFrame,
      Opcode::WriteFrame,
      Opcode::PowerOff,
    ] {
      assert_eq!(Registers::command(op, 0, 0).opcode(), Some(op));
    }
    assert_eq!(Opcode::try_from(6), Err(6));
    assert_eq!(unpack(pack(0x40, 0, 0, 0, 0)).opcode(), None);
  }
}
