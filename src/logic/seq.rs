//! Sequential parts: registers and counters.
//!
//! Sequential parts are the only stateful elements in a circuit, and the
//! reason combinational settling terminates: their outputs only move on
//! a clock edge, so every feedback loop in the wiring is broken by one.
//! Each part keeps a `current` value (readable at any time through its
//! output bus) and a `pending` value computed during the edge and
//! committed simultaneously with every other sequential part.

use crate::logic::circuit::{Circuit, Part};
use crate::logic::signal::{Bus, SignalId};

fn width_mask(width: usize) -> u16 {
    if width >= 16 {
        u16::MAX
    } else {
        (1u16 << width) - 1
    }
}

/// Storage cell with a load enable.
///
/// Edge law: `next = if load { input } else { current }`. Between edges
/// the output bus holds the last-latched value, never an in-flight
/// combinational one.
pub struct Register {
    /// Value to latch when `load` is high. Undriven until connected.
    pub input: Bus,
    /// Load enable pin.
    pub load: SignalId,
    /// The latched value, driven by the part.
    pub output: Bus,
}

/// A register with a reset input and a +1 fallback.
///
/// Edge law: `next = if reset { 0 } else if load { input } else
/// { current + 1 }`; reset overrides load, and the increment wraps at
/// the bus width.
pub struct Counter {
    /// Value to latch when `load` is high (and `reset` is low).
    pub input: Bus,
    /// Load enable pin.
    pub load: SignalId,
    /// Reset pin; forces the next value to zero.
    pub reset: SignalId,
    /// The latched value, driven by the part.
    pub output: Bus,
}

pub(crate) struct RegisterPart {
    pub(crate) input: Bus,
    pub(crate) load: SignalId,
    pub(crate) out: Bus,
    pub(crate) current: u16,
    pub(crate) pending: u16,
}

pub(crate) struct CounterPart {
    pub(crate) input: Bus,
    pub(crate) load: SignalId,
    pub(crate) reset: SignalId,
    pub(crate) out: Bus,
    pub(crate) mask: u16,
    pub(crate) current: u16,
    pub(crate) pending: u16,
}

impl Circuit {
    /// Build a register of `width` bits, initially zero.
    ///
    /// # Panics
    /// Panics if `width` exceeds 16.
    pub fn register(&mut self, width: usize) -> Register {
        assert!(width <= 16, "register width {width} exceeds 16 bits");
        let input = self.bus(width);
        let load = self.signal();
        let output = self.part_output_bus(width);
        self.push_part(Part::Register(RegisterPart {
            input: input.clone(),
            load,
            out: output.clone(),
            current: 0,
            pending: 0,
        }));
        Register {
            input,
            load,
            output,
        }
    }

    /// Build a counter of `width` bits, initially zero.
    ///
    /// # Panics
    /// Panics if `width` exceeds 16.
    pub fn counter(&mut self, width: usize) -> Counter {
        assert!(width <= 16, "counter width {width} exceeds 16 bits");
        let input = self.bus(width);
        let load = self.signal();
        let reset = self.signal();
        let output = self.part_output_bus(width);
        self.push_part(Part::Counter(CounterPart {
            input: input.clone(),
            load,
            reset,
            out: output.clone(),
            mask: width_mask(width),
            current: 0,
            pending: 0,
        }));
        Counter {
            input,
            load,
            reset,
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_latches_on_load() {
        let mut c = Circuit::new();
        let reg = c.register(16);
        c.set_bus(&reg.input, 42);
        c.set(reg.load, true);
        c.settle();
        // the output holds the old value until the edge
        assert_eq!(c.read_bus(&reg.output), 0);
        c.clock();
        assert_eq!(c.read_bus(&reg.output), 42);
    }

    #[test]
    fn test_register_holds_without_load() {
        let mut c = Circuit::new();
        let reg = c.register(16);
        c.set_bus(&reg.input, 42);
        c.set(reg.load, true);
        c.clock();
        assert_eq!(c.read_bus(&reg.output), 42);

        c.set(reg.load, false);
        c.set_bus(&reg.input, 9999);
        c.clock();
        c.clock();
        assert_eq!(c.read_bus(&reg.output), 42);
    }

    #[test]
    fn test_counter_advances_by_one() {
        let mut c = Circuit::new();
        let ctr = c.counter(16);
        for expected in 1..=5u16 {
            c.clock();
            assert_eq!(c.read_bus(&ctr.output), expected);
        }
    }

    #[test]
    fn test_counter_load() {
        let mut c = Circuit::new();
        let ctr = c.counter(16);
        c.set_bus(&ctr.input, 100);
        c.set(ctr.load, true);
        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 100);

        c.set(ctr.load, false);
        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 101);
    }

    #[test]
    fn test_counter_reset_overrides_load() {
        let mut c = Circuit::new();
        let ctr = c.counter(16);
        c.set_bus(&ctr.input, 100);
        c.set(ctr.load, true);
        c.set(ctr.reset, true);
        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 0);

        c.set(ctr.reset, false);
        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 100);
    }

    #[test]
    fn test_counter_wraps_mod_2_16() {
        let mut c = Circuit::new();
        let ctr = c.counter(16);
        c.set_bus(&ctr.input, u16::MAX);
        c.set(ctr.load, true);
        c.clock();
        c.set(ctr.load, false);
        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 0);
    }

    #[test]
    fn test_registers_commit_atomically() {
        // A register fed from a counter must latch the counter's
        // pre-edge value, never its post-edge one.
        let mut c = Circuit::new();
        let ctr = c.counter(16);
        let reg = c.register(16);
        let hi = c.constant(true);
        c.connect_bus(&reg.input, &ctr.output).unwrap();
        c.connect(reg.load, hi).unwrap();

        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 1);
        assert_eq!(c.read_bus(&reg.output), 0);

        c.clock();
        assert_eq!(c.read_bus(&ctr.output), 2);
        assert_eq!(c.read_bus(&reg.output), 1);
    }

    proptest! {
        #[test]
        fn prop_register_ignores_input_without_load(held: u16, noise: u16) {
            let mut c = Circuit::new();
            let reg = c.register(16);
            c.set_bus(&reg.input, held);
            c.set(reg.load, true);
            c.clock();

            c.set(reg.load, false);
            c.set_bus(&reg.input, noise);
            c.clock();
            prop_assert_eq!(c.read_bus(&reg.output), held);
        }

        #[test]
        fn prop_counter_advances_mod_2_16(start: u16) {
            let mut c = Circuit::new();
            let ctr = c.counter(16);
            c.set_bus(&ctr.input, start);
            c.set(ctr.load, true);
            c.clock();
            c.set(ctr.load, false);
            c.clock();
            prop_assert_eq!(c.read_bus(&ctr.output), start.wrapping_add(1));
        }
    }
}
