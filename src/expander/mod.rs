//! I2C port expander drivers: MCP23008 (8-bit) and MCP23017 (16-bit).
//!
//! These share the pin-addressing surface of the shift register driver but
//! sit on a byte-oriented register bus instead of a serial shift protocol,
//! and they keep *no* local shadow: every whole-bank operation is a bus
//! transaction, and every single-pin write is a read-bank, modify-bit,
//! write-bank sequence. That sequence is not atomic with respect to other
//! code writing the same bank; it is a property of the register protocol,
//! not something this driver papers over.

mod mcp23008;
mod mcp23017;

pub use mcp23008::Mcp23008;
pub use mcp23017::{Bank, Mcp23017};

/// Base 7-bit I2C address with the hardware address pins tied low.
///
/// Both expanders respond at `0x20 | A2 A1 A0`.
pub const BASE_ADDRESS: u8 = 0x20;

/// I/O configuration for an expander bank or a single expander pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output.
    Output,
    /// Input with the internal pull-up disabled.
    InputFloating,
    /// Input with the internal 100 kΩ pull-up enabled.
    InputPullup,
}
