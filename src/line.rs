use embedded_hal::digital::{OutputPin, PinState};

/// Drive a control line to its idle level and hand it back.
///
/// Every control line is bound like this at construction time, so a driver
/// never starts with a line in an unknown state. Which concrete line a pin
/// identifier maps to is the platform HAL's business; by the time a line
/// reaches this crate it is already a drivable [`OutputPin`].
pub(crate) fn bind<P: OutputPin>(mut line: P, idle: PinState) -> Result<P, P::Error> {
    line.set_state(idle)?;
    Ok(line)
}
