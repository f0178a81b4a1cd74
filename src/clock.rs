//! Monotonic time source for the overlay scheduler.

/// Milliseconds since some fixed point, usually boot.
pub type Millis = u64;

/// A monotonic millisecond clock.
///
/// Implemented for any `Fn() -> Millis`, so a closure over the HAL timer is enough:
///
/// ```ignore
/// let clock = || timer.get_counter().ticks() / 1_000;
/// ```
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

impl<F> Clock for F
where
    F: Fn() -> Millis,
{
    fn now_ms(&self) -> Millis {
        self()
    }
}
