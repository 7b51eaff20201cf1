use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

/// A register driver whose contents can be addressed one bit at a time.
///
/// Implemented by [`ShiftRegister`] and the expander drivers, this is the
/// seam the [`Pin`] facade delegates to. The methods take `&self` because
/// every driver in this crate keeps its mutable state behind interior
/// mutability, which is what lets several pin handles share one driver.
///
/// [`ShiftRegister`]: crate::ShiftRegister
pub trait BitPort {
    /// Error produced by the underlying driver.
    type Error;

    /// Read the bit at `index`.
    fn read_bit(&self, index: usize) -> Result<bool, Self::Error>;

    /// Write the bit at `index`.
    fn write_bit(&self, state: bool, index: usize) -> Result<(), Self::Error>;
}

/// A single bit of a register driver, presented as a stand-alone pin.
///
/// Handles are cheap and carry no hardware state of their own; they hold a
/// shared reference to the owning driver and a bit index, so the driver must
/// outlive every handle created from it. Create them with the driver's `pin`
/// method, which checks the index against the addressable range.
///
/// Besides the inherent methods, a handle implements the `embedded-hal`
/// [`OutputPin`], [`StatefulOutputPin`] and [`InputPin`] traits, so it can be
/// handed to any driver expecting a GPIO pin.
///
/// Note that on a shift register chain every single-pin write re-transmits
/// the whole chain. Callers changing many bits at once should batch through
/// the driver's byte- or register-level writes instead.
pub struct Pin<'a, P: BitPort> {
    port: &'a P,
    index: usize,
}

impl<P: BitPort> Clone for Pin<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: BitPort> Copy for Pin<'_, P> {}

impl<'a, P: BitPort> Pin<'a, P> {
    pub(crate) fn new(port: &'a P, index: usize) -> Self {
        Self { port, index }
    }

    /// The zero-based bit position this handle addresses.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read the current state of this pin.
    pub fn get(&self) -> Result<bool, P::Error> {
        self.port.read_bit(self.index)
    }

    /// Set this pin high (`true`) or low (`false`).
    pub fn set(&self, state: bool) -> Result<(), P::Error> {
        self.port.write_bit(state, self.index)
    }

    /// Invert the current state of this pin.
    pub fn toggle(&self) -> Result<(), P::Error> {
        let state = self.get()?;
        self.set(!state)
    }
}

impl<P: BitPort> ErrorType for Pin<'_, P>
where
    P::Error: embedded_hal::digital::Error,
{
    type Error = P::Error;
}

impl<P: BitPort> OutputPin for Pin<'_, P>
where
    P::Error: embedded_hal::digital::Error,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true)
    }
}

impl<P: BitPort> StatefulOutputPin for Pin<'_, P>
where
    P::Error: embedded_hal::digital::Error,
{
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        self.get()
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.get().map(|state| !state)
    }
}

impl<P: BitPort> InputPin for Pin<'_, P>
where
    P::Error: embedded_hal::digital::Error,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.get()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.get().map(|state| !state)
    }
}
