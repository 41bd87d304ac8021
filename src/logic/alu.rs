//! The arithmetic/logic unit.
//!
//! A combinational 16-bit function unit: operands X and Y, a 5-bit
//! control code, a 16-bit result and two flags. The control table is a
//! wire protocol shared with the external assembler, so every code is a
//! fixed bit pattern; codes without an assigned function are rejected at
//! the instruction boundary and never reach a running CPU.

use serde::{Deserialize, Serialize};

use crate::logic::circuit::{Circuit, Part};
use crate::logic::signal::{Bus, SignalId};

/// Width of the ALU control bus.
pub const CONTROL_WIDTH: usize = 5;

/// The ALU function table.
///
/// Discriminants are the 5-bit control codes. X is the D-register
/// operand, Y the A-register-or-memory operand; arithmetic is wrapping
/// two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AluOp {
    /// Constant 0
    Zero = 0,
    /// Constant 1
    One = 1,
    /// X
    X = 2,
    /// Y
    Y = 3,
    /// ¬X
    NotX = 4,
    /// ¬Y
    NotY = 5,
    /// -X
    NegX = 6,
    /// -Y
    NegY = 7,
    /// X + 1
    XPlusOne = 8,
    /// Y + 1
    YPlusOne = 9,
    /// X - 1
    XMinusOne = 10,
    /// Y - 1
    YMinusOne = 11,
    /// X + Y
    Add = 12,
    /// X - Y
    XMinusY = 13,
    /// Y - X
    YMinusX = 14,
    /// X ^ Y
    Xor = 15,
    /// X & Y
    And = 16,
    /// X | Y
    Or = 17,
}

impl AluOp {
    /// Every documented function, in code order.
    pub const ALL: [AluOp; 18] = [
        AluOp::Zero,
        AluOp::One,
        AluOp::X,
        AluOp::Y,
        AluOp::NotX,
        AluOp::NotY,
        AluOp::NegX,
        AluOp::NegY,
        AluOp::XPlusOne,
        AluOp::YPlusOne,
        AluOp::XMinusOne,
        AluOp::YMinusOne,
        AluOp::Add,
        AluOp::XMinusY,
        AluOp::YMinusX,
        AluOp::Xor,
        AluOp::And,
        AluOp::Or,
    ];

    /// The 5-bit control code for this function.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a control code. Returns `None` for the unassigned codes
    /// 18-31; callers must reject those, never substitute a default.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AluOp::Zero),
            1 => Some(AluOp::One),
            2 => Some(AluOp::X),
            3 => Some(AluOp::Y),
            4 => Some(AluOp::NotX),
            5 => Some(AluOp::NotY),
            6 => Some(AluOp::NegX),
            7 => Some(AluOp::NegY),
            8 => Some(AluOp::XPlusOne),
            9 => Some(AluOp::YPlusOne),
            10 => Some(AluOp::XMinusOne),
            11 => Some(AluOp::YMinusOne),
            12 => Some(AluOp::Add),
            13 => Some(AluOp::XMinusY),
            14 => Some(AluOp::YMinusX),
            15 => Some(AluOp::Xor),
            16 => Some(AluOp::And),
            17 => Some(AluOp::Or),
            _ => None,
        }
    }

    /// Apply the function in wrapping two's-complement arithmetic.
    pub fn apply(self, x: i16, y: i16) -> i16 {
        match self {
            AluOp::Zero => 0,
            AluOp::One => 1,
            AluOp::X => x,
            AluOp::Y => y,
            AluOp::NotX => !x,
            AluOp::NotY => !y,
            AluOp::NegX => x.wrapping_neg(),
            AluOp::NegY => y.wrapping_neg(),
            AluOp::XPlusOne => x.wrapping_add(1),
            AluOp::YPlusOne => y.wrapping_add(1),
            AluOp::XMinusOne => x.wrapping_sub(1),
            AluOp::YMinusOne => y.wrapping_sub(1),
            AluOp::Add => x.wrapping_add(y),
            AluOp::XMinusY => x.wrapping_sub(y),
            AluOp::YMinusX => y.wrapping_sub(x),
            AluOp::Xor => x ^ y,
            AluOp::And => x & y,
            AluOp::Or => x | y,
        }
    }
}

/// Handle to an ALU part.
pub struct Alu {
    /// X operand, undriven until connected.
    pub x: Bus,
    /// Y operand, undriven until connected.
    pub y: Bus,
    /// 5-bit control code, undriven until connected.
    pub control: Bus,
    /// 16-bit result, driven by the part.
    pub output: Bus,
    /// 1 iff the result is all-zero bits.
    pub zero: SignalId,
    /// 1 iff the result's most-significant bit is 1.
    pub negative: SignalId,
}

pub(crate) struct AluPart {
    pub(crate) x: Bus,
    pub(crate) y: Bus,
    pub(crate) control: Bus,
    pub(crate) out: Bus,
    pub(crate) zero: SignalId,
    pub(crate) negative: SignalId,
}

impl AluPart {
    pub(crate) fn result(&self, circuit: &Circuit) -> i16 {
        let x = circuit.read_bus_signed(&self.x);
        let y = circuit.read_bus_signed(&self.y);
        let code = circuit.read_bus(&self.control) as u8;
        // unassigned codes settle to zero; the instruction boundary
        // rejects them before they ever drive a running CPU
        AluOp::from_code(code).map_or(0, |op| op.apply(x, y))
    }
}

impl Circuit {
    /// Build an ALU with `width`-bit operands and a 5-bit control bus.
    ///
    /// # Panics
    /// Panics if `width` exceeds 16.
    pub fn alu(&mut self, width: usize) -> Alu {
        assert!(width <= 16, "ALU width {width} exceeds 16 bits");
        let x = self.bus(width);
        let y = self.bus(width);
        let control = self.bus(CONTROL_WIDTH);
        let output = self.part_output_bus(width);
        let zero = self.part_output();
        let negative = self.part_output();
        self.push_part(Part::Alu(AluPart {
            x: x.clone(),
            y: y.clone(),
            control: control.clone(),
            out: output.clone(),
            zero,
            negative,
        }));
        Alu {
            x,
            y,
            control,
            output,
            zero,
            negative,
        }
    }
}
