/// Controls whether a change notification fires immediately or is held back
/// until the owning view becomes active again.
///
/// While a view is off-screen it arms delaying on its properties. Mutations
/// that happen while armed are collapsed into a single pending flag, and the
/// view catches up in one batch when it reactivates, instead of one
/// notification per mutation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DelayedNotify {
    /// Notify immediately. The default.
    #[default]
    DoNotDelay,
    /// Delaying is armed but nothing has changed yet.
    DelayNonePending,
    /// A change occurred while armed; one notification is owed.
    DelayNotificationPending,
}

impl DelayedNotify {
    /// Arm delayed notification.
    ///
    /// Arming while a notification is already pending must not erase the
    /// pending flag, or the change would be lost.
    pub fn arm(&mut self) {
        match self {
            DelayedNotify::DoNotDelay | DelayedNotify::DelayNonePending => {
                *self = DelayedNotify::DelayNonePending;
            }
            DelayedNotify::DelayNotificationPending => {}
        }
    }

    /// Record that the value was mutated. Returns `true` if the caller
    /// should notify the owning view right away, `false` if the
    /// notification is now owed for later.
    pub fn record_change(&mut self) -> bool {
        match self {
            DelayedNotify::DoNotDelay => {
                return true;
            }
            DelayedNotify::DelayNonePending | DelayedNotify::DelayNotificationPending => {
                *self = DelayedNotify::DelayNotificationPending;
                return false;
            }
        }
    }

    /// Collect the pending flag and unconditionally reset to [`DoNotDelay`](Self::DoNotDelay).
    ///
    /// Returns `true` if a notification was owed.
    pub fn take_pending(&mut self) -> bool {
        let was_pending = *self == DelayedNotify::DelayNotificationPending;
        *self = DelayedNotify::DoNotDelay;
        return was_pending;
    }
}
