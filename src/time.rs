//! Virtual time.
//!
//! The simulation clock is a plain tick counter. It only moves when the
//! scheduler dispatches an event and never reads the wall clock.

/// A point on the simulation's virtual time axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The start of every simulation unless configured otherwise.
    pub const ZERO: VirtualTime = VirtualTime(0);

    /// Create a time from a raw tick count.
    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    /// Raw tick count.
    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The time `delay` ticks after `self`, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, delay: u64) -> Option<VirtualTime> {
        self.0.checked_add(delay).map(VirtualTime)
    }

    /// Returns `true` if `self` is strictly earlier than `other`.
    #[inline]
    pub fn is_before(self, other: VirtualTime) -> bool {
        self.0 < other.0
    }

    /// Ticks elapsed from `earlier` to `self`. `None` if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl From<u64> for VirtualTime {
    fn from(ticks: u64) -> Self {
        VirtualTime(ticks)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}
