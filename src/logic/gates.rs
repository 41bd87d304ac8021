//! Combinational gate primitives.
//!
//! Every constructor allocates the part's own output signals, so a gate
//! output can never conflict with another driver. Single-bit NOT/AND/OR,
//! their per-lane bus-wide variants (no carry, no cross-lane
//! interaction), the 2-way bus mux, and the N-way single-bit selector.

use crate::logic::circuit::{Circuit, Part, WiringError};
use crate::logic::signal::{Bus, SignalId};

impl Circuit {
    /// NOT gate: output = ¬a.
    pub fn not_gate(&mut self, a: SignalId) -> SignalId {
        let out = self.part_output();
        self.push_part(Part::Not { a, out });
        out
    }

    /// AND gate: output = a ∧ b.
    pub fn and_gate(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let out = self.part_output();
        self.push_part(Part::And { a, b, out });
        out
    }

    /// OR gate: output = a ∨ b.
    pub fn or_gate(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let out = self.part_output();
        self.push_part(Part::Or { a, b, out });
        out
    }

    /// Bus-wide NOT: each output lane inverts the matching input lane.
    pub fn bitwise_not(&mut self, a: &Bus) -> Bus {
        let out = self.part_output_bus(a.width());
        self.push_part(Part::BitwiseNot {
            a: a.clone(),
            out: out.clone(),
        });
        out
    }

    /// Bus-wide AND, applied independently per lane.
    pub fn bitwise_and(&mut self, a: &Bus, b: &Bus) -> Result<Bus, WiringError> {
        if a.width() != b.width() {
            return Err(WiringError::WidthMismatch {
                expected: a.width(),
                got: b.width(),
            });
        }
        let out = self.part_output_bus(a.width());
        self.push_part(Part::BitwiseAnd {
            a: a.clone(),
            b: b.clone(),
            out: out.clone(),
        });
        Ok(out)
    }

    /// Bus-wide OR, applied independently per lane.
    pub fn bitwise_or(&mut self, a: &Bus, b: &Bus) -> Result<Bus, WiringError> {
        if a.width() != b.width() {
            return Err(WiringError::WidthMismatch {
                expected: a.width(),
                got: b.width(),
            });
        }
        let out = self.part_output_bus(a.width());
        self.push_part(Part::BitwiseOr {
            a: a.clone(),
            b: b.clone(),
            out: out.clone(),
        });
        Ok(out)
    }

    /// 2-way bus mux: output = `b` when `select` is 1, `a` otherwise.
    pub fn mux(&mut self, a: &Bus, b: &Bus, select: SignalId) -> Result<Bus, WiringError> {
        if a.width() != b.width() {
            return Err(WiringError::WidthMismatch {
                expected: a.width(),
                got: b.width(),
            });
        }
        let out = self.part_output_bus(a.width());
        self.push_part(Part::Mux {
            a: a.clone(),
            b: b.clone(),
            select,
            out: out.clone(),
        });
        Ok(out)
    }

    /// N-way selector: `select.width()` bits choose among
    /// `2^select.width()` single-bit data inputs. Data input `j` is
    /// selected when the select bus reads as integer `j`.
    ///
    /// A flat lookup indexed by the select bits, equivalent to a
    /// balanced tree of 2-way muxes of depth `select.width()`.
    pub fn selector(&mut self, data: &[SignalId], select: &Bus) -> Result<SignalId, WiringError> {
        if data.len() != 1usize << select.width() {
            return Err(WiringError::BadFanIn {
                select: select.width(),
                data: data.len(),
            });
        }
        let out = self.part_output();
        self.push_part(Part::Selector {
            data: data.to_vec(),
            select: select.clone(),
            out,
        });
        Ok(out)
    }
}
