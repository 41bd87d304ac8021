//! The wiring graph and its evaluation.
//!
//! A [`Circuit`] owns every signal node and every part (gate, mux,
//! selector, ALU, register, counter) of a design. Structure is fixed at
//! construction time: parts allocate their own output signals, input
//! pins are allocated explicitly, and [`Circuit::connect`] establishes
//! live data-flow edges between them. After construction only signal
//! values and register contents change.
//!
//! Two notions of time are kept apart:
//! - [`Circuit::settle`] runs combinational fixpoint propagation against
//!   the current register outputs.
//! - [`Circuit::clock`] performs one clock edge: settle, compute every
//!   sequential part's next value, commit them all at once, settle again.

use thiserror::Error;

use crate::logic::alu::AluPart;
use crate::logic::seq::{CounterPart, RegisterPart};
use crate::logic::signal::{Bus, SignalId};

/// Errors detected while wiring a circuit. All of them are structural
/// and fatal: a circuit that failed to build cannot be run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    /// Two buses of different widths were connected pairwise.
    #[error("bus width mismatch: expected {expected} signals, got {got}")]
    WidthMismatch { expected: usize, got: usize },

    /// The destination signal already has an upstream driver.
    #[error("signal #{0} is already driven and cannot take another source")]
    AlreadyDriven(u32),

    /// A selector was built with a data fan-in that its select bus
    /// cannot address.
    #[error("selector fan-in must be a power of two: {select} select bits cannot address {data} data inputs")]
    BadFanIn { select: usize, data: usize },
}

/// What, if anything, drives a signal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    /// An input pin: value is set from outside the circuit.
    None,
    /// Mirrors another signal's current value at every read.
    Wire(SignalId),
    /// Output of a part; written during evaluation.
    Part,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    value: bool,
    driver: Driver,
}

/// One structural element of the circuit.
pub(crate) enum Part {
    Not { a: SignalId, out: SignalId },
    And { a: SignalId, b: SignalId, out: SignalId },
    Or { a: SignalId, b: SignalId, out: SignalId },
    BitwiseNot { a: Bus, out: Bus },
    BitwiseAnd { a: Bus, b: Bus, out: Bus },
    BitwiseOr { a: Bus, b: Bus, out: Bus },
    Mux { a: Bus, b: Bus, select: SignalId, out: Bus },
    Selector { data: Vec<SignalId>, select: Bus, out: SignalId },
    Alu(AluPart),
    Register(RegisterPart),
    Counter(CounterPart),
}

/// A gate-level circuit: signal nodes plus the parts that drive them.
#[derive(Default)]
pub struct Circuit {
    nodes: Vec<Node>,
    parts: Vec<Part>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an undriven signal (an input pin until connected).
    pub fn signal(&mut self) -> SignalId {
        let id = SignalId(self.nodes.len() as u32);
        self.nodes.push(Node {
            value: false,
            driver: Driver::None,
        });
        id
    }

    /// Allocate a bus of `width` undriven signals, LSB first.
    pub fn bus(&mut self, width: usize) -> Bus {
        Bus::from_signals((0..width).map(|_| self.signal()).collect())
    }

    /// Allocate a signal pinned to a fixed value.
    pub fn constant(&mut self, value: bool) -> SignalId {
        let id = self.signal();
        self.nodes[id.index()].value = value;
        id
    }

    /// Allocate an output signal owned by the part being built.
    pub(crate) fn part_output(&mut self) -> SignalId {
        let id = self.signal();
        self.nodes[id.index()].driver = Driver::Part;
        id
    }

    /// Allocate a bus of part-owned output signals.
    pub(crate) fn part_output_bus(&mut self, width: usize) -> Bus {
        Bus::from_signals((0..width).map(|_| self.part_output()).collect())
    }

    pub(crate) fn push_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Establish a live data-flow edge: at every future read, `dst`
    /// equals `src`'s current settled value. This is mirroring, not a
    /// one-time copy.
    pub fn connect(&mut self, dst: SignalId, src: SignalId) -> Result<(), WiringError> {
        let node = &mut self.nodes[dst.index()];
        if node.driver != Driver::None {
            return Err(WiringError::AlreadyDriven(dst.0));
        }
        node.driver = Driver::Wire(src);
        Ok(())
    }

    /// Connect two buses pairwise by bit position.
    pub fn connect_bus(&mut self, dst: &Bus, src: &Bus) -> Result<(), WiringError> {
        if dst.width() != src.width() {
            return Err(WiringError::WidthMismatch {
                expected: dst.width(),
                got: src.width(),
            });
        }
        for i in 0..dst.width() {
            self.connect(dst.signal(i), src.signal(i))?;
        }
        Ok(())
    }

    /// Set the value of an input pin.
    ///
    /// # Panics
    /// Panics if the signal has an upstream driver; only true input
    /// pins may be set from outside.
    pub fn set(&mut self, id: SignalId, value: bool) {
        let node = &mut self.nodes[id.index()];
        assert!(
            node.driver == Driver::None,
            "signal #{} is driven and cannot be set externally",
            id.0
        );
        node.value = value;
    }

    /// Set a bus of input pins from an integer, bit 0 = LSB.
    ///
    /// # Panics
    /// Panics if any bus signal has an upstream driver.
    pub fn set_bus(&mut self, bus: &Bus, value: u16) {
        debug_assert!(bus.width() <= 16);
        for (i, &id) in bus.signals().iter().enumerate() {
            self.set(id, (value >> i) & 1 == 1);
        }
    }

    /// Current value of a signal. Side-effect free.
    #[inline]
    pub fn get(&self, id: SignalId) -> bool {
        self.nodes[id.index()].value
    }

    /// Read a bus as an unsigned integer, bit 0 = LSB.
    pub fn read_bus(&self, bus: &Bus) -> u16 {
        debug_assert!(bus.width() <= 16);
        let mut value = 0u16;
        for (i, &id) in bus.signals().iter().enumerate() {
            if self.get(id) {
                value |= 1 << i;
            }
        }
        value
    }

    /// Read a 16-bit bus as a two's-complement integer.
    pub fn read_bus_signed(&self, bus: &Bus) -> i16 {
        self.read_bus(bus) as i16
    }

    #[inline]
    fn drive(&mut self, id: SignalId, value: bool) -> bool {
        let node = &mut self.nodes[id.index()];
        if node.value == value {
            false
        } else {
            node.value = value;
            true
        }
    }

    fn drive_bus(&mut self, bus: &Bus, value: u16) -> bool {
        let mut changed = false;
        for (i, &id) in bus.signals().iter().enumerate() {
            changed |= self.drive(id, (value >> i) & 1 == 1);
        }
        changed
    }

    /// Propagate until no signal changes.
    ///
    /// Terminates because every feedback loop in a well-formed circuit
    /// passes through a register or counter, whose output only moves on
    /// [`Circuit::clock`].
    ///
    /// # Panics
    /// Panics if the network fails to settle within a bound of sweeps,
    /// which indicates a combinational gate loop.
    pub fn settle(&mut self) {
        let bound = self.nodes.len() + self.parts.len() + 2;
        for _ in 0..bound {
            if !self.sweep() {
                return;
            }
        }
        panic!("combinational network failed to settle: the wiring contains a gate loop");
    }

    /// One full sweep: mirror wire connections, then evaluate every
    /// part. Returns whether anything changed.
    fn sweep(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.nodes.len() {
            if let Driver::Wire(src) = self.nodes[i].driver {
                let value = self.nodes[src.index()].value;
                if self.nodes[i].value != value {
                    self.nodes[i].value = value;
                    changed = true;
                }
            }
        }
        let parts = std::mem::take(&mut self.parts);
        for part in &parts {
            changed |= self.eval(part);
        }
        self.parts = parts;
        changed
    }

    fn eval(&mut self, part: &Part) -> bool {
        match part {
            Part::Not { a, out } => {
                let value = !self.get(*a);
                self.drive(*out, value)
            }
            Part::And { a, b, out } => {
                let value = self.get(*a) && self.get(*b);
                self.drive(*out, value)
            }
            Part::Or { a, b, out } => {
                let value = self.get(*a) || self.get(*b);
                self.drive(*out, value)
            }
            Part::BitwiseNot { a, out } => {
                let value = !self.read_bus(a);
                self.drive_bus(out, value)
            }
            Part::BitwiseAnd { a, b, out } => {
                let value = self.read_bus(a) & self.read_bus(b);
                self.drive_bus(out, value)
            }
            Part::BitwiseOr { a, b, out } => {
                let value = self.read_bus(a) | self.read_bus(b);
                self.drive_bus(out, value)
            }
            Part::Mux { a, b, select, out } => {
                let value = if self.get(*select) {
                    self.read_bus(b)
                } else {
                    self.read_bus(a)
                };
                self.drive_bus(out, value)
            }
            Part::Selector { data, select, out } => {
                let index = self.read_bus(select) as usize;
                let value = self.get(data[index]);
                self.drive(*out, value)
            }
            Part::Alu(alu) => {
                let result = alu.result(self);
                let mut changed = self.drive_bus(&alu.out, result as u16);
                changed |= self.drive(alu.zero, result == 0);
                changed |= self.drive(alu.negative, result < 0);
                changed
            }
            Part::Register(reg) => self.drive_bus(&reg.out, reg.current),
            Part::Counter(ctr) => self.drive_bus(&ctr.out, ctr.current),
        }
    }

    /// One clock edge.
    ///
    /// Phase down: the combinational network settles against the current
    /// register outputs and every sequential part computes its next
    /// value from that fixpoint. Phase up: all parts commit at once, so
    /// no register ever observes another register's post-edge value
    /// within the same edge. A final settle propagates the new outputs.
    pub fn clock(&mut self) {
        self.settle();
        let mut parts = std::mem::take(&mut self.parts);
        for part in &mut parts {
            match part {
                Part::Register(reg) => {
                    reg.pending = if self.get(reg.load) {
                        self.read_bus(&reg.input)
                    } else {
                        reg.current
                    };
                }
                Part::Counter(ctr) => {
                    ctr.pending = if self.get(ctr.reset) {
                        0
                    } else if self.get(ctr.load) {
                        self.read_bus(&ctr.input)
                    } else {
                        ctr.current.wrapping_add(1) & ctr.mask
                    };
                }
                _ => {}
            }
        }
        for part in &mut parts {
            match part {
                Part::Register(reg) => reg.current = reg.pending,
                Part::Counter(ctr) => ctr.current = ctr.pending,
                _ => {}
            }
        }
        self.parts = parts;
        self.settle();
    }

    /// Number of signal nodes.
    pub fn signal_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Circuit")
            .field("signals", &self.nodes.len())
            .field("parts", &self.parts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_pin_set_get() {
        let mut c = Circuit::new();
        let pin = c.signal();
        assert!(!c.get(pin));
        c.set(pin, true);
        c.settle();
        assert!(c.get(pin));
    }

    #[test]
    fn test_connect_mirrors_continuously() {
        let mut c = Circuit::new();
        let src = c.signal();
        let dst = c.signal();
        c.connect(dst, src).unwrap();

        c.set(src, true);
        c.settle();
        assert!(c.get(dst));

        // A live edge, not a one-time copy: the downstream follows.
        c.set(src, false);
        c.settle();
        assert!(!c.get(dst));
    }

    #[test]
    fn test_connect_chain() {
        let mut c = Circuit::new();
        let a = c.signal();
        let b = c.signal();
        let d = c.signal();
        c.connect(b, a).unwrap();
        c.connect(d, b).unwrap();

        c.set(a, true);
        c.settle();
        assert!(c.get(d));
    }

    #[test]
    fn test_double_connect_rejected() {
        let mut c = Circuit::new();
        let src = c.signal();
        let other = c.signal();
        let dst = c.signal();
        c.connect(dst, src).unwrap();
        assert_eq!(
            c.connect(dst, other),
            Err(WiringError::AlreadyDriven(dst.0))
        );
    }

    #[test]
    fn test_connect_bus_width_mismatch() {
        let mut c = Circuit::new();
        let wide = c.bus(16);
        let narrow = c.bus(5);
        assert_eq!(
            c.connect_bus(&wide, &narrow),
            Err(WiringError::WidthMismatch {
                expected: 16,
                got: 5
            })
        );
    }

    #[test]
    #[should_panic(expected = "cannot be set externally")]
    fn test_set_on_connected_signal_panics() {
        let mut c = Circuit::new();
        let src = c.signal();
        let dst = c.signal();
        c.connect(dst, src).unwrap();
        c.set(dst, true);
    }

    #[test]
    fn test_bus_integer_roundtrip() {
        let mut c = Circuit::new();
        let bus = c.bus(16);
        for value in [0u16, 1, 5, 0x8000, 0xFFFF, 0x5555] {
            c.set_bus(&bus, value);
            c.settle();
            assert_eq!(c.read_bus(&bus), value);
        }
    }

    #[test]
    fn test_bus_signed_read() {
        let mut c = Circuit::new();
        let bus = c.bus(16);
        c.set_bus(&bus, 0xFFFF);
        c.settle();
        assert_eq!(c.read_bus_signed(&bus), -1);
        c.set_bus(&bus, 0x8000);
        c.settle();
        assert_eq!(c.read_bus_signed(&bus), i16::MIN);
    }

    #[test]
    fn test_lsb_is_index_zero() {
        let mut c = Circuit::new();
        let bus = c.bus(16);
        c.set_bus(&bus, 1);
        c.settle();
        assert!(c.get(bus.signal(0)));
        assert!(!c.get(bus.signal(15)));
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut c = Circuit::new();
        let src = c.signal();
        let dst = c.signal();
        c.connect(dst, src).unwrap();
        c.set(src, true);
        c.settle();
        let before = c.get(dst);
        c.settle();
        c.settle();
        assert_eq!(c.get(dst), before);
    }

    #[test]
    fn test_constant() {
        let mut c = Circuit::new();
        let hi = c.constant(true);
        let lo = c.constant(false);
        c.settle();
        assert!(c.get(hi));
        assert!(!c.get(lo));
    }
}
