//! Throttle presence notifications.

/// Receives throttle presence transitions.
///
/// Called from interrupt context with the link's critical section held, so
/// implementations must be short and must not call back into the link.
/// Only transitions are reported: `true` when a signal appears after being
/// absent, `false` when it is lost.
pub trait PresenceHandler: Sync {
    fn presence_changed(&self, present: bool);
}

impl<F: Fn(bool) + Sync> PresenceHandler for F {
    fn presence_changed(&self, present: bool) {
        self(present)
    }
}
