//! 74HC595 shift register chains addressed as one wide output register.

use std::cell::RefCell;

use bit_field::BitField;
use embedded_hal::digital::{OutputPin, PinState};

use crate::Error;
use crate::line;
use crate::pin::{BitPort, Pin};

/// Order in which the chain's bits are shifted out on the serial data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// Chain bit `i` is shifted at step `i`, least significant bit first.
    ///
    /// This is the default.
    #[default]
    LsbFirst,
    /// Mirrored order: chain bit `8N - i` is shifted at step `i`.
    ///
    /// Note the mirror point is the bit *above* the top of the chain, so the
    /// first bit shifted is always zero and the most significant shadow bit
    /// is shifted at step 1. Existing wiring depends on this exact order, so
    /// it is part of the driver's contract.
    MsbFirst,
}

/// Driver for a chain of cascaded 74HC595 8-bit shift registers.
///
/// The driver owns the five control lines and an in-memory *shadow* of the
/// last value committed to the chain. The 74HC595 family has no readback
/// path, so every read operation returns the shadow and never touches the
/// hardware: the shadow is the sole source of truth for what the chain is
/// currently outputting.
///
/// Writes go the other way round. The hardware has no partial-update
/// capability, so a write of any granularity (bit, byte, or whole register)
/// merges into the shadow and then re-transmits the entire chain, finishing
/// with a single latch pulse that presents the new pattern on the output
/// pins atomically. A partially shifted pattern is never visible.
///
/// If more physical registers are cascaded than were declared at
/// construction, the extra registers stay blank: the chain's shift cells are
/// cleared before each transmission.
///
/// Individual outputs can be taken as stand-alone pins with
/// [`ShiftRegister::pin`].
///
/// # Concurrency
///
/// The driver state sits behind a [`RefCell`] so that pin handles can share
/// the driver; this makes the type `!Sync`. Operations are synchronous and
/// never block beyond the latency of the underlying line drives. If a driver
/// must be shared across threads, the caller wraps it in a mutex.
///
/// # Power-on state
///
/// Construction drives the control lines to their idle levels but does not
/// touch the chain's contents, which are undefined at power-on. Call
/// [`ShiftRegister::clear_register`] or write a value before trusting the
/// outputs.
pub struct ShiftRegister<Sd, Sc, Lc, Oe, Cl> {
    inner: RefCell<Inner<Sd, Sc, Lc, Oe, Cl>>,
    order: BitOrder,
    length: usize,
}

/// Control lines and shadow, guarded together by one `RefCell`.
struct Inner<Sd, Sc, Lc, Oe, Cl> {
    serial_data: Sd,
    serial_clock: Sc,
    latch_clock: Lc,
    output_enable: Oe,
    clear: Cl,
    /// Byte `k` holds chain bits `8k..8k + 8`; byte 0 is the register whose
    /// serial input is driven directly by the controller.
    shadow: Vec<u8>,
}

impl<Sd, Sc, Lc, Oe, Cl, E> ShiftRegister<Sd, Sc, Lc, Oe, Cl>
where
    Sd: OutputPin<Error = E>,
    Sc: OutputPin<Error = E>,
    Lc: OutputPin<Error = E>,
    Oe: OutputPin<Error = E>,
    Cl: OutputPin<Error = E>,
{
    /// Create a driver for `length` cascaded registers, LSB-first.
    ///
    /// The five lines are, in order: serial data (SER), serial clock
    /// (SRCLK), latch clock (RCLK), output enable (OE, active low) and
    /// register clear (SRCLR, active low). Each is driven to its idle level
    /// before the driver stores it; the data, clock and output-enable lines
    /// idle low (outputs enabled), the clear line idles high (inactive).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidChainLength`] if `length` is zero, before any line is
    /// driven. [`Error::Hardware`] if a line drive fails.
    pub fn new(
        serial_data: Sd,
        serial_clock: Sc,
        latch_clock: Lc,
        output_enable: Oe,
        clear: Cl,
        length: usize,
    ) -> Result<Self, Error<E>> {
        Self::with_bit_order(
            serial_data,
            serial_clock,
            latch_clock,
            output_enable,
            clear,
            length,
            BitOrder::default(),
        )
    }

    /// Create a driver with an explicit shift-out [`BitOrder`].
    ///
    /// See [`ShiftRegister::new`] for the line order and idle levels.
    pub fn with_bit_order(
        serial_data: Sd,
        serial_clock: Sc,
        latch_clock: Lc,
        output_enable: Oe,
        clear: Cl,
        length: usize,
        order: BitOrder,
    ) -> Result<Self, Error<E>> {
        if length == 0 {
            return Err(Error::InvalidChainLength);
        }
        let inner = Inner {
            serial_data: line::bind(serial_data, PinState::Low).map_err(Error::Hardware)?,
            serial_clock: line::bind(serial_clock, PinState::Low).map_err(Error::Hardware)?,
            latch_clock: line::bind(latch_clock, PinState::Low).map_err(Error::Hardware)?,
            output_enable: line::bind(output_enable, PinState::Low).map_err(Error::Hardware)?,
            clear: line::bind(clear, PinState::High).map_err(Error::Hardware)?,
            shadow: vec![0; length],
        };
        Ok(Self {
            inner: RefCell::new(inner),
            order,
            length,
        })
    }

    /// Number of cascaded 8-bit registers in the chain.
    pub fn chain_length(&self) -> usize {
        self.length
    }

    /// The shift-out order fixed at construction.
    pub fn bit_order(&self) -> BitOrder {
        self.order
    }

    /// Reset the chain to all zeros, glitch-free.
    ///
    /// The outputs are 3-stated before the reset so no transient pattern is
    /// ever visible: output enable goes high, the clear line is pulsed, the
    /// latch clock is pulsed to move the now-zero cells onto the output
    /// latch, and only then are the outputs re-enabled. The shadow is zeroed
    /// to match.
    ///
    /// # Datasheet
    ///
    /// SRCLR only clears the internal shift and storage cells; without the
    /// RCLK pulse the output latch would keep showing the old pattern.
    pub fn clear_register(&self) -> Result<(), Error<E>> {
        let mut inner = self.inner.borrow_mut();
        inner.clear_and_latch().map_err(Error::Hardware)?;
        inner.shadow.fill(0);
        Ok(())
    }

    /// The shadow of the whole chain, byte 0 first.
    ///
    /// Purely an accessor: the 74HC595 cannot be read back, so this returns
    /// the last committed value.
    pub fn read_register(&self) -> Vec<u8> {
        self.inner.borrow().shadow.clone()
    }

    /// The shadow byte for register `index`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not below the chain length.
    pub fn read_byte(&self, index: usize) -> Result<u8, Error<E>> {
        if index >= self.length {
            return Err(Error::IndexOutOfRange {
                index,
                capacity: self.length,
            });
        }
        Ok(self.inner.borrow().shadow[index])
    }

    /// The shadow bit at chain position `index`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not below `8 * length`.
    pub fn read_bit(&self, index: usize) -> Result<bool, Error<E>> {
        let capacity = self.length * 8;
        if index >= capacity {
            return Err(Error::IndexOutOfRange { index, capacity });
        }
        Ok(self.inner.borrow().bit_at(index))
    }

    /// Replace the chain's contents and transmit them.
    ///
    /// `value` is taken byte 0 first. Bytes beyond the chain's capacity are
    /// silently dropped (extra declared registers stay blank rather than
    /// erroring), and if `value` is shorter than the chain the remaining
    /// registers are cleared: the new value *replaces* the shadow, it is
    /// not merged into it.
    pub fn write_register(&self, value: &[u8]) -> Result<(), Error<E>> {
        let mut inner = self.inner.borrow_mut();
        for (position, byte) in inner.shadow.iter_mut().enumerate() {
            *byte = value.get(position).copied().unwrap_or(0);
        }
        inner.shift_out(self.order).map_err(Error::Hardware)
    }

    /// Re-transmit the current shadow unchanged.
    ///
    /// Useful to restore the outputs after electrical noise may have
    /// corrupted the physical registers.
    pub fn refresh(&self) -> Result<(), Error<E>> {
        self.inner.borrow_mut().shift_out(self.order).map_err(Error::Hardware)
    }

    /// Set one register's byte and transmit the whole chain.
    ///
    /// There is no partial-update path in the hardware, so this costs a full
    /// chain re-shift regardless.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not below the chain length;
    /// the shadow is untouched in that case.
    pub fn write_byte(&self, value: u8, index: usize) -> Result<(), Error<E>> {
        if index >= self.length {
            return Err(Error::IndexOutOfRange {
                index,
                capacity: self.length,
            });
        }
        let mut inner = self.inner.borrow_mut();
        inner.shadow[index] = value;
        inner.shift_out(self.order).map_err(Error::Hardware)
    }

    /// Set one chain bit and transmit the whole chain.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not below `8 * length`; the
    /// shadow is untouched in that case.
    pub fn write_bit(&self, state: bool, index: usize) -> Result<(), Error<E>> {
        let capacity = self.length * 8;
        if index >= capacity {
            return Err(Error::IndexOutOfRange { index, capacity });
        }
        let mut inner = self.inner.borrow_mut();
        inner.shadow[index / 8].set_bit(index % 8, state);
        inner.shift_out(self.order).map_err(Error::Hardware)
    }

    /// Take chain bit `index` as a stand-alone [`Pin`] handle.
    ///
    /// Handles are cheap and may be created freely; they all delegate to
    /// this driver's per-bit operations.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not below `8 * length`.
    pub fn pin(&self, index: usize) -> Result<Pin<'_, Self>, Error<E>> {
        let capacity = self.length * 8;
        if index >= capacity {
            return Err(Error::IndexOutOfRange { index, capacity });
        }
        Ok(Pin::new(self, index))
    }
}

impl<Sd, Sc, Lc, Oe, Cl, E> BitPort for ShiftRegister<Sd, Sc, Lc, Oe, Cl>
where
    Sd: OutputPin<Error = E>,
    Sc: OutputPin<Error = E>,
    Lc: OutputPin<Error = E>,
    Oe: OutputPin<Error = E>,
    Cl: OutputPin<Error = E>,
{
    type Error = Error<E>;

    fn read_bit(&self, index: usize) -> Result<bool, Self::Error> {
        ShiftRegister::read_bit(self, index)
    }

    fn write_bit(&self, state: bool, index: usize) -> Result<(), Self::Error> {
        ShiftRegister::write_bit(self, state, index)
    }
}

impl<Sd, Sc, Lc, Oe, Cl, E> Inner<Sd, Sc, Lc, Oe, Cl>
where
    Sd: OutputPin<Error = E>,
    Sc: OutputPin<Error = E>,
    Lc: OutputPin<Error = E>,
    Oe: OutputPin<Error = E>,
    Cl: OutputPin<Error = E>,
{
    /// Shadow bit at chain position `index`; one past the top reads as zero.
    fn bit_at(&self, index: usize) -> bool {
        self.shadow
            .get(index / 8)
            .is_some_and(|byte| byte.get_bit(index % 8))
    }

    fn pulse_serial_clock(&mut self) -> Result<(), E> {
        self.serial_clock.set_high()?;
        self.serial_clock.set_low()
    }

    fn pulse_latch(&mut self) -> Result<(), E> {
        self.latch_clock.set_high()?;
        self.latch_clock.set_low()
    }

    /// SRCLR is active low.
    fn pulse_clear(&mut self) -> Result<(), E> {
        self.clear.set_low()?;
        self.clear.set_high()
    }

    /// Transmit the shadow to the chain: clear the shift cells, clock every
    /// bit out, then latch once so the full pattern appears atomically.
    ///
    /// The leading clear pulse keeps stale shift-cell bits from riding along
    /// ahead of the real pattern.
    fn shift_out(&mut self, order: BitOrder) -> Result<(), E> {
        self.pulse_clear()?;
        let total = self.shadow.len() * 8;
        for step in 0..total {
            let bit = match order {
                BitOrder::LsbFirst => self.bit_at(step),
                BitOrder::MsbFirst => self.bit_at(total - step),
            };
            self.serial_data.set_state(PinState::from(bit))?;
            self.pulse_serial_clock()?;
        }
        self.pulse_latch()
    }

    /// The glitch-free reset sequence behind `clear_register`.
    fn clear_and_latch(&mut self) -> Result<(), E> {
        self.output_enable.set_high()?;
        self.pulse_clear()?;
        self.pulse_latch()?;
        self.output_enable.set_low()
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    use super::*;

    /// A hardware-visible operation, for building per-line expectations.
    enum Op<'a> {
        /// A full chain transmission shifting exactly these bits.
        Shift(&'a [bool]),
        /// The `clear_register` line choreography.
        Clear,
    }

    struct LineExpectations {
        serial_data: Vec<PinTransaction>,
        serial_clock: Vec<PinTransaction>,
        latch_clock: Vec<PinTransaction>,
        output_enable: Vec<PinTransaction>,
        clear: Vec<PinTransaction>,
    }

    fn expectations(ops: &[Op]) -> LineExpectations {
        // Construction binds every line to its idle level.
        let mut lines = LineExpectations {
            serial_data: vec![PinTransaction::set(State::Low)],
            serial_clock: vec![PinTransaction::set(State::Low)],
            latch_clock: vec![PinTransaction::set(State::Low)],
            output_enable: vec![PinTransaction::set(State::Low)],
            clear: vec![PinTransaction::set(State::High)],
        };
        for op in ops {
            match op {
                Op::Shift(bits) => {
                    lines.clear.push(PinTransaction::set(State::Low));
                    lines.clear.push(PinTransaction::set(State::High));
                    for &bit in *bits {
                        let state = if bit { State::High } else { State::Low };
                        lines.serial_data.push(PinTransaction::set(state));
                        lines.serial_clock.push(PinTransaction::set(State::High));
                        lines.serial_clock.push(PinTransaction::set(State::Low));
                    }
                    lines.latch_clock.push(PinTransaction::set(State::High));
                    lines.latch_clock.push(PinTransaction::set(State::Low));
                }
                Op::Clear => {
                    lines.output_enable.push(PinTransaction::set(State::High));
                    lines.clear.push(PinTransaction::set(State::Low));
                    lines.clear.push(PinTransaction::set(State::High));
                    lines.latch_clock.push(PinTransaction::set(State::High));
                    lines.latch_clock.push(PinTransaction::set(State::Low));
                    lines.output_enable.push(PinTransaction::set(State::Low));
                }
            }
        }
        lines
    }

    /// The bits an LSB-first transmission of `bytes` shifts, in order.
    fn lsb_bits(bytes: &[u8]) -> Vec<bool> {
        bytes
            .iter()
            .flat_map(|byte| (0..8).map(move |i| byte.get_bit(i)))
            .collect()
    }

    struct Handles([PinMock; 5]);

    impl Handles {
        fn done(mut self) {
            for mock in &mut self.0 {
                mock.done();
            }
        }
    }

    type MockChain = ShiftRegister<PinMock, PinMock, PinMock, PinMock, PinMock>;

    fn chain(length: usize, order: BitOrder, ops: &[Op]) -> (MockChain, Handles) {
        let lines = expectations(ops);
        let ser = PinMock::new(&lines.serial_data);
        let srclk = PinMock::new(&lines.serial_clock);
        let rclk = PinMock::new(&lines.latch_clock);
        let oe = PinMock::new(&lines.output_enable);
        let srclr = PinMock::new(&lines.clear);
        let handles = Handles([
            ser.clone(),
            srclk.clone(),
            rclk.clone(),
            oe.clone(),
            srclr.clone(),
        ]);
        let sr = ShiftRegister::with_bit_order(ser, srclk, rclk, oe, srclr, length, order)
            .expect("valid construction");
        (sr, handles)
    }

    #[test]
    fn zero_chain_length_is_rejected_before_any_line_drive() {
        let mocks: Vec<PinMock> = (0..5).map(|_| PinMock::new(&[])).collect();
        let result = ShiftRegister::new(
            mocks[0].clone(),
            mocks[1].clone(),
            mocks[2].clone(),
            mocks[3].clone(),
            mocks[4].clone(),
            0,
        );
        assert!(matches!(result, Err(Error::InvalidChainLength)));
        for mut mock in mocks {
            mock.done();
        }
    }

    #[test]
    fn default_bit_order_is_lsb_first_and_byte_round_trips() {
        let lines = expectations(&[Op::Shift(&lsb_bits(&[0xFF]))]);
        let ser = PinMock::new(&lines.serial_data);
        let srclk = PinMock::new(&lines.serial_clock);
        let rclk = PinMock::new(&lines.latch_clock);
        let oe = PinMock::new(&lines.output_enable);
        let srclr = PinMock::new(&lines.clear);
        let handles = Handles([
            ser.clone(),
            srclk.clone(),
            rclk.clone(),
            oe.clone(),
            srclr.clone(),
        ]);

        let sr = ShiftRegister::new(ser, srclk, rclk, oe, srclr, 1).unwrap();
        assert_eq!(sr.bit_order(), BitOrder::LsbFirst);
        assert_eq!(sr.chain_length(), 1);
        sr.write_byte(0xFF, 0).unwrap();
        assert_eq!(sr.read_register(), vec![0xFF]);

        drop(sr);
        handles.done();
    }

    #[test]
    fn write_register_truncates_extra_bytes() {
        let (sr, handles) = chain(1, BitOrder::LsbFirst, &[Op::Shift(&lsb_bits(&[0xAB]))]);
        sr.write_register(&[0xAB, 0xCD]).unwrap();
        assert_eq!(sr.read_register(), vec![0xAB]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn write_register_replaces_rather_than_merges() {
        let (sr, handles) = chain(
            2,
            BitOrder::LsbFirst,
            &[
                Op::Shift(&lsb_bits(&[0x34, 0x12])),
                Op::Shift(&lsb_bits(&[0x55, 0x00])),
            ],
        );
        sr.write_register(&[0x34, 0x12]).unwrap();
        // A short value clears the registers it does not cover.
        sr.write_register(&[0x55]).unwrap();
        assert_eq!(sr.read_register(), vec![0x55, 0x00]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn sixteen_bit_chain_byte_and_bit_addressing() {
        let (sr, handles) = chain(
            2,
            BitOrder::LsbFirst,
            &[Op::Shift(&lsb_bits(&[0x34, 0x12]))],
        );
        sr.write_register(&[0x34, 0x12]).unwrap();
        assert_eq!(sr.read_byte(0).unwrap(), 0x34);
        assert_eq!(sr.read_byte(1).unwrap(), 0x12);
        // 0x34 = 0b0011_0100: bit 2 set. 0x12 = 0b0001_0010: chain bit 9 set.
        assert!(sr.read_bit(2).unwrap());
        assert!(sr.read_bit(9).unwrap());
        assert!(!sr.read_bit(0).unwrap());
        drop(sr);
        handles.done();
    }

    #[test]
    fn clear_register_zeroes_the_shadow_with_outputs_hidden() {
        let (sr, handles) = chain(
            1,
            BitOrder::LsbFirst,
            &[Op::Shift(&lsb_bits(&[0xA5])), Op::Clear],
        );
        sr.write_register(&[0xA5]).unwrap();
        sr.clear_register().unwrap();
        assert_eq!(sr.read_register(), vec![0x00]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn write_bit_does_not_corrupt_neighbouring_bits() {
        let (sr, handles) = chain(
            1,
            BitOrder::LsbFirst,
            &[
                Op::Shift(&lsb_bits(&[0b1010_0000])),
                Op::Shift(&lsb_bits(&[0b1010_0100])),
                Op::Shift(&lsb_bits(&[0b1010_0000])),
            ],
        );
        sr.write_register(&[0b1010_0000]).unwrap();
        sr.write_bit(true, 2).unwrap();
        assert_eq!(sr.read_register(), vec![0b1010_0100]);
        sr.write_bit(false, 2).unwrap();
        assert_eq!(sr.read_register(), vec![0b1010_0000]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn out_of_range_indices_error_without_touching_hardware_or_shadow() {
        let (sr, handles) = chain(1, BitOrder::LsbFirst, &[]);
        assert_eq!(
            sr.read_byte(1),
            Err(Error::IndexOutOfRange {
                index: 1,
                capacity: 1
            })
        );
        assert_eq!(
            sr.read_bit(8),
            Err(Error::IndexOutOfRange {
                index: 8,
                capacity: 8
            })
        );
        assert_eq!(
            sr.write_byte(0xFF, 1),
            Err(Error::IndexOutOfRange {
                index: 1,
                capacity: 1
            })
        );
        assert_eq!(
            sr.write_bit(true, 8),
            Err(Error::IndexOutOfRange {
                index: 8,
                capacity: 8
            })
        );
        assert!(sr.pin(8).is_err());
        assert_eq!(sr.read_register(), vec![0x00]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn msb_first_shifts_the_mirrored_bit_sequence() {
        // 0x81: step 0 shifts bit 8 (always zero), step 1 shifts bit 7 (set),
        // step 7 shifts bit 1 (clear). Bit 0 is never shifted.
        let shifted = [false, true, false, false, false, false, false, false];
        let (sr, handles) = chain(1, BitOrder::MsbFirst, &[Op::Shift(&shifted)]);
        sr.write_register(&[0x81]).unwrap();
        assert_eq!(sr.read_register(), vec![0x81]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn refresh_retransmits_the_shadow_unchanged() {
        let bits = lsb_bits(&[0x0F]);
        let (sr, handles) = chain(
            1,
            BitOrder::LsbFirst,
            &[Op::Shift(&bits), Op::Shift(&bits)],
        );
        sr.write_register(&[0x0F]).unwrap();
        sr.refresh().unwrap();
        assert_eq!(sr.read_register(), vec![0x0F]);
        drop(sr);
        handles.done();
    }

    #[test]
    fn write_byte_targets_one_register_but_retransmits_the_chain() {
        let (sr, handles) = chain(
            2,
            BitOrder::LsbFirst,
            &[Op::Shift(&lsb_bits(&[0x00, 0x12]))],
        );
        sr.write_byte(0x12, 1).unwrap();
        assert_eq!(sr.read_register(), vec![0x00, 0x12]);
        drop(sr);
        handles.done();
    }
}
