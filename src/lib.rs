#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod error;
pub mod expander;
mod hc595;
mod line;
mod pin;

pub use error::Error;
pub use hc595::{BitOrder, ShiftRegister};
pub use pin::{BitPort, Pin};
