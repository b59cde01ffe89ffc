use std::{ops::Deref, time::Duration};

/// Number of slots granted per window.
///
/// Validated newtype: must be greater than zero.
///
/// ```
/// use docgate::Capacity;
///
/// let capacity = Capacity::try_from(3).unwrap();
/// assert_eq!(*capacity, 3);
/// assert!(Capacity::try_from(0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(u64);

impl Deref for Capacity {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u64> for Capacity {
    type Error = &'static str;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err("Capacity must be greater than 0");
        }

        Ok(Self(value))
    }
}

/// Length of one fixed admission window.
///
/// Capacity is restored to full once per window, never partially.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowDuration(Duration);

impl Deref for WindowDuration {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Duration> for WindowDuration {
    type Error = &'static str;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value.is_zero() {
            return Err("Window duration must be greater than 0");
        }

        Ok(Self(value))
    }
}

/// How often the replenisher checks whether the current window has elapsed.
///
/// Only the rollover *check* runs on this cadence; the window itself is
/// measured from its start instant. Keep it well below the window length
/// (the default is a tenth of it) so that callers are not held much past the
/// boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollInterval(Duration);

impl PollInterval {
    /// Smallest interval the default derivation will produce.
    pub const MIN_DEFAULT: Duration = Duration::from_millis(1);

    /// Default poll interval for `window`: a tenth of the window, at least 1ms.
    pub fn for_window(window: WindowDuration) -> Self {
        Self((*window / 10).max(Self::MIN_DEFAULT))
    }
}

impl Deref for PollInterval {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Duration> for PollInterval {
    type Error = &'static str;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value.is_zero() {
            return Err("Poll interval must be greater than 0");
        }

        Ok(Self(value))
    }
}

/// Point-in-time view of an [`AdmissionController`](crate::AdmissionController).
///
/// All fields are read under the same lock, so they are mutually consistent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Slots per window.
    pub capacity: u64,
    /// Slots still grantable in the current window.
    pub available: u64,
    /// Slots granted and not yet released.
    pub in_flight: u64,
    /// Callers queued for the next window.
    pub waiting: usize,
    /// Number of rollovers since construction.
    pub epoch: u64,
    /// Slots granted since construction.
    pub granted_total: u64,
    /// Slots released since construction.
    pub released_total: u64,
}
