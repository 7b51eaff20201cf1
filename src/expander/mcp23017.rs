// The register map is declared in full; the interrupt registers are unused
// until interrupt support exists.
#![allow(dead_code)]

use std::cell::RefCell;

use bit_field::BitField;
use embedded_hal::i2c::I2c;

use crate::Error;
use crate::pin::{BitPort, Pin};
use super::PinMode;

// Register map with IOCON.BANK = 0, the power-on default: bank A and bank B
// registers interleave, with the bank B register one address above its bank
// A partner. MCP23017 datasheet table 3-4. This driver never changes IOCON,
// so this map is always the one in force.

/// I/O direction, bank A. 1 = input; resets to 0xFF.
const IODIRA: u8 = 0x00;
const IODIRB: u8 = 0x01;
/// Input polarity inversion.
const IPOLA: u8 = 0x02;
const IPOLB: u8 = 0x03;
/// Interrupt-on-change enable.
const GPINTENA: u8 = 0x04;
const GPINTENB: u8 = 0x05;
/// Comparison value for interrupt-on-change.
const DEFVALA: u8 = 0x06;
const DEFVALB: u8 = 0x07;
/// Interrupt-on-change control.
const INTCONA: u8 = 0x08;
const INTCONB: u8 = 0x09;
/// Device configuration (shared, mirrored at both addresses).
const IOCON: u8 = 0x0A;
/// Internal pull-ups. 1 = enabled.
const GPPUA: u8 = 0x0C;
const GPPUB: u8 = 0x0D;
/// Interrupt flags.
const INTFA: u8 = 0x0E;
const INTFB: u8 = 0x0F;
/// Port value captured at interrupt time.
const INTCAPA: u8 = 0x10;
const INTCAPB: u8 = 0x11;
/// Port value. Reads the pins; writes go to the output latch.
const GPIOA: u8 = 0x12;
const GPIOB: u8 = 0x13;
/// Output latch.
const OLATA: u8 = 0x14;
const OLATB: u8 = 0x15;

/// One of the MCP23017's two 8-bit I/O banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    /// Bank A, pins GPA0..=GPA7 (chain bits 0..=7).
    A,
    /// Bank B, pins GPB0..=GPB7 (chain bits 8..=15).
    B,
}

impl Bank {
    /// Resolve a bank A register address for this bank.
    fn register(self, bank_a_register: u8) -> u8 {
        match self {
            Bank::A => bank_a_register,
            Bank::B => bank_a_register + 1,
        }
    }
}

/// Driver for the MCP23017 16-bit I2C port expander.
///
/// The device is two MCP23008-style banks behind one address. Whole-bank
/// operations take an explicit [`Bank`]; per-pin operations address the
/// sixteen pins flat, 0..=7 on bank A and 8..=15 on bank B, which is also
/// how [`Mcp23017::pin`] handles are numbered.
///
/// The same caveats as [`Mcp23008`](super::Mcp23008) apply: no local
/// shadow, per-pin writes are non-atomic read-modify-write bus sequences,
/// and the driver is `!Sync`.
pub struct Mcp23017<I2C> {
    bus: RefCell<I2C>,
    address: u8,
}

impl<I2C, E> Mcp23017<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Create a driver for the device at the given 7-bit address.
    ///
    /// No bus traffic is issued; the power-on defaults (all pins input,
    /// pull-ups off, IOCON.BANK = 0) stay in force until a mode is set.
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

    /// Write a byte to one bank's output latch.
    pub fn write(&self, bank: Bank, value: u8) -> Result<(), Error<E>> {
        self.write_register(bank.register(OLATA), value)
    }

    /// Read the actual level of one bank's eight pins.
    pub fn read(&self, bank: Bank) -> Result<u8, Error<E>> {
        self.read_register(bank.register(GPIOA))
    }

    /// Configure all eight pins of one bank at once.
    ///
    /// [`PinMode::InputPullup`] enables the bank's pull-ups; the other
    /// modes leave the pull-up register as it was.
    pub fn set_mode(&self, bank: Bank, mode: PinMode) -> Result<(), Error<E>> {
        match mode {
            PinMode::Output => self.write_register(bank.register(IODIRA), 0x00),
            PinMode::InputFloating => self.write_register(bank.register(IODIRA), 0xFF),
            PinMode::InputPullup => {
                self.write_register(bank.register(GPPUA), 0xFF)?;
                self.write_register(bank.register(IODIRA), 0xFF)
            }
        }
    }

    /// Set a single pin's output state (flat pin numbering, 0..=15).
    ///
    /// Read-modify-write on the pin's bank; not atomic against other
    /// writers on the same bank.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..16`.
    pub fn write_pin(&self, pin: usize, state: bool) -> Result<(), Error<E>> {
        let (bank, bit) = Self::split_pin(pin)?;
        let mut value = self.read(bank)?;
        value.set_bit(bit, state);
        self.write(bank, value)
    }

    /// Read a single pin's level (flat pin numbering, 0..=15).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..16`.
    pub fn read_pin(&self, pin: usize) -> Result<bool, Error<E>> {
        let (bank, bit) = Self::split_pin(pin)?;
        Ok(self.read(bank)?.get_bit(bit))
    }

    /// Configure a single pin (flat pin numbering, 0..=15).
    ///
    /// Same register traffic as [`Mcp23008::pin_mode`](super::Mcp23008::pin_mode),
    /// against the pin's bank.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `pin` is not in `0..16`.
    pub fn pin_mode(&self, pin: usize, mode: PinMode) -> Result<(), Error<E>> {
        let (bank, bit) = Self::split_pin(pin)?;
        let mut direction = self.read_register(bank.register(IODIRA))?;
        match mode {
            PinMode::Output => {
                direction.set_bit(bit, false);
            }
            PinMode::InputFloating => {
                direction.set_bit(bit, true);
                let mut pullups = self.read_register(bank.register(GPPUA))?;
                pullups.set_bit(bit, false);
                self.write_register(bank.register(GPPUA), pullups)?;
            }
            PinMode::InputPullup => {
                direction.set_bit(bit, true);
                let mut pullups = self.read_register(bank.register(GPPUA))?;
                pullups.set_bit(bit, true);
                self.write_register(bank.register(GPPUA), pullups)?;
            }
        }
        self.write_register(bank.register(IODIRA), direction)
    }

    /// Take pin `index` as a stand-alone [`Pin`] handle (0..=15).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] if `index` is not in `0..16`.
    pub fn pin(&self, index: usize) -> Result<Pin<'_, Self>, Error<E>> {
        Self::split_pin(index)?;
        Ok(Pin::new(self, index))
    }

    fn split_pin(pin: usize) -> Result<(Bank, usize), Error<E>> {
        match pin {
            0..=7 => Ok((Bank::A, pin)),
            8..=15 => Ok((Bank::B, pin - 8)),
            _ => Err(Error::IndexOutOfRange {
                index: pin,
                capacity: 16,
            }),
        }
    }
}

impl<I2C, E> BitPort for Mcp23017<I2C>
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
