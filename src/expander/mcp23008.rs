// The register map is declared in full; the interrupt registers are unused
// until interrupt support exists.
#![allow(dead_code)]

use std::cell::RefCell;

use bit_field::BitField;
use embedded_hal::i2c::I2c;

use crate::Error;
use crate::pin::{BitPort, Pin};
use super::PinMode;

// Register map, MCP23008 datasheet table 1-3.

/// I/O direction. 1 = input; resets to 0xFF.
const IODIR: u8 = 0x00;
/// Input polarity inversion. 1 = invert.
const IPOL: u8 = 0x01;
/// Interrupt-on-change enable.
const GPINTEN: u8 = 0x02;
/// Comparison value for interrupt-on-change.
const DEFVAL: u8 = 0x03;
/// Interrupt-on-change control.
const INTCON: u8 = 0x04;
/// Device configuration.
const IOCON: u8 = 0x05;
/// Internal pull-ups. 1 = enabled.
const GPPU: u8 = 0x06;
/// Interrupt flags.
const INTF: u8 = 0x07;
/// Port value captured at interrupt time.
const INTCAP: u8 = 0x08;
/// Port value. Reads the pins; writes go to the output latch.
const GPIO: u8 = 0x09;
/// Output latch.
const OLAT: u8 = 0x0A;

/// Driver for the MCP23008 8-bit I2C port expander.
///
/// The whole bank can be driven as a single byte with [`Mcp23008::write`] /
/// [`Mcp23008::read`], or individual pins can be taken as stand-alone
/// handles with [`Mcp23008::pin`]. Unlike [`ShiftRegister`] there is no
/// local shadow: every operation is an immediate bus transaction, and a
/// single-pin write is a read-modify-write over the bus that is not atomic
/// against other writers on the same bank.
///
/// The bus sits behind a [`RefCell`] so that pin handles can share the
/// driver; this makes the type `!Sync`, and multi-threaded callers must add
/// their own locking. Bus clocking (the device supports 100 kHz, 400 kHz
/// and 1.7 MHz operation) is configured by whoever owns the bus.
///
/// [`ShiftRegister`]: crate::ShiftRegister
pub struct Mcp23008<I2C> {
    bus: RefCell<I2C>,
    address: u8,
}

impl<I2C, E> Mcp23008<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a driver for the device at the given 7-bit address.
    ///
    /// See [`BASE_ADDRESS`](super::BASE_ADDRESS) for how the address is
    /// formed from the hardware address pins. No bus traffic is issued;
    /// the device's power-on defaults (all pins input, pull-ups off) stay
    /// in force until a mode is set.
    pub fn new(bus: I2C, address: u8) -> Self {
        Self {
            bus: RefCell::new(bus),
            address,
        }
    }

    /// Release the underlying bus.
    pub fn destroy(self) -> I2C {
        self.bus.into_inner()
    }

    fn read_register(&self, register: u8) -> Result<u8, Error<E>> {
        let mut value = [0u8; 1];
        self.bus
            .borrow_mut()
            .write_read(self.address, &[register], &mut value)
            .map_err(Error::Hardware)?;
        Ok(value[0])
    }

    fn write_register(&self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.bus
            .borrow_mut()
            .write(self.address, &[register, value])
            .map_err(Error::Hardware)
    }

    /// Write a byte to the whole bank's output latch.
    pub fn write(&self, value: u8) -> Result<(), Error<E>> {
        self.write_register(OLAT, value)
    }

    /// Read the actual level of all eight pins.
    pub fn read(&self) -> Result<u8, Error<E>> {
        self.read_register(GPIO)
    }

    /// Configure all eight pins at once.
    ///
    /// [`PinMode::InputPullup`] enables every pull-up; the other modes leave
    /// the pull-up register as it was.
    pub fn set_mode(&self, mode: PinMode) -> Result<(), Error<E>> {
        match mode {
            PinMode::Output => self.write_register(IODIR, 0x00),
            PinMode::InputFloating => self.write_register(IODIR, 0xFF),
            PinMode::InputPullup => {
                self.write_register(GPPU, 0xFF)?;
                self.write_register(IODIR, 0xFF)
            }
        }
    }

    /// Set a single pin's output state.
    ///
    /// This reads the current pin levels, merges the bit and writes the
    /// result back to the output latch. Another writer racing on the same
    /// bank can have its change overwritten; serialize access if that
    /// matters.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..8`.
    pub fn write_pin(&self, pin: usize, state: bool) -> Result<(), Error<E>> {
        Self::check_pin(pin)?;
        let mut bank = self.read()?;
        bank.set_bit(pin, state);
        self.write(bank)
    }

    /// Read a single pin's level.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..8`.
    pub fn read_pin(&self, pin: usize) -> Result<bool, Error<E>> {
        Self::check_pin(pin)?;
        Ok(self.read()?.get_bit(pin))
    }

    /// Configure a single pin.
    ///
    /// A read-modify-write on the direction register, plus one on the
    /// pull-up register for the input modes (enabled for
    /// [`PinMode::InputPullup`], disabled for [`PinMode::InputFloating`]).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..8`.
    pub fn pin_mode(&self, pin: usize, mode: PinMode) -> Result<(), Error<E>> {
        Self::check_pin(pin)?;
        let mut direction = self.read_register(IODIR)?;
        match mode {
            PinMode::Output => {
                direction.set_bit(pin, false);
            }
            PinMode::InputFloating => {
                direction.set_bit(pin, true);
                let mut pullups = self.read_register(GPPU)?;
                pullups.set_bit(pin, false);
                self.write_register(GPPU, pullups)?;
            }
            PinMode::InputPullup => {
                direction.set_bit(pin, true);
                let mut pullups = self.read_register(GPPU)?;
                pullups.set_bit(pin, true);
                self.write_register(GPPU, pullups)?;
            }
        }
        self.write_register(IODIR, direction)
    }

    /// Take pin `index` as a stand-alone [`Pin`] handle.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not in `0..8`.
    pub fn pin(&self, index: usize) -> Result<Pin<'_, Self>, Error<E>> {
        Self::check_pin(index)?;
        Ok(Pin::new(self, index))
    }

    fn check_pin(pin: usize) -> Result<(), Error<E>> {
        if pin >= 8 {
            return Err(Error::IndexOutOfRange {
                index: pin,
                capacity: 8,
            });
        }
        Ok(())
    }
}

impl<I2C, E> BitPort for Mcp23008<I2C>
where
    I2C: I2c<Error = E>,
{
    type Error = Error<E>;

    fn read_bit(&self, index: usize) -> Result<bool, Self::Error> {
        self.read_pin(index)
    }

    fn write_bit(&self, state: bool, index: usize) -> Result<(), Self::Error> {
        self.write_pin(index, state)
    }
}
