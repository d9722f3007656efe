use core::time::Duration;

/// Per-call override for the attempt timeout.
///
/// - `Inherit`: keep whatever the endpoint or pipeline defaults chose.
/// - `Clear`: no per-attempt timeout.
/// - `Set(d)`: force `d` for every attempt of the call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum TimeoutOverride {
    #[default]
    Inherit,
    Clear,
    Set(Duration),
}

impl TimeoutOverride {
    #[inline]
    pub fn apply(self, current: Option<Duration>) -> Option<Duration> {
        match self {
            TimeoutOverride::Inherit => current,
            TimeoutOverride::Clear => None,
            TimeoutOverride::Set(d) => Some(d),
        }
    }
}
