/// Wrapper for problems when driving a shift register chain or port expander.
///
/// `E` is the error type of the underlying `embedded-hal` pin or bus
/// implementation supplied at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// A shift register chain was declared with zero cascaded registers.
    ///
    /// The chain length is fixed at construction and must be at least one.
    InvalidChainLength,
    /// A bit or byte index fell outside the addressable range.
    ///
    /// The driver's shadow state is left untouched when this is returned.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of addressable bits (or bytes, for byte operations).
        capacity: usize,
    },
    /// The underlying line drive or bus transaction reported a fault.
    ///
    /// This is fatal: a shift/latch or register read-modify-write sequence
    /// cannot be resumed mid-way without risking a torn output, so nothing
    /// is retried. After a failed whole-chain write the physical outputs are
    /// indeterminate and should be reset with
    /// [`ShiftRegister::clear_register`](crate::ShiftRegister::clear_register)
    /// before being trusted again.
    Hardware(E),
}

impl<E: core::fmt::Debug> embedded_hal::digital::Error for Error<E> {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}
