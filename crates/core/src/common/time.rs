//! Simulated time.
//!
//! All timing parameters and timestamps are absolute `Tick` values (picoseconds in the
//! default configuration). Integer ticks keep every constraint comparison exact.

/// An absolute or relative simulated time, in ticks.
pub type Tick = u64;

/// Sentinel for "no time yet" when searching for a minimum.
pub const MAX_TICK: Tick = Tick::MAX;

/// Ceiling division, used to convert a tick into a clock-cycle index.
///
/// # Arguments
///
/// * `value` - The dividend.
/// * `divisor` - The divisor; must be non-zero.
///
/// # Returns
///
/// `value / divisor` rounded up.
#[inline]
pub const fn div_ceil(value: u64, divisor: u64) -> u64 {
    value.div_ceil(divisor)
}
