//! App lifecycle state machine for docsync.
//!
//! The host reports when the app enters the background or the foreground.
//! While backgrounded the remote subscription is torn down; on return it is
//! re-established. This module decides *what* to do; `sync-client` does it.
//!
//! ```text
//!            Backgrounded
//!   Active ───────────────► Suspended
//!     ▲                         │
//!     └─────────────────────────┘
//!            Foregrounded
//! ```

/// Lifecycle state - NO I/O, just transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    /// App is in the foreground; a subscription may be live.
    #[default]
    Active,
    /// App is in the background; no subscription should be live.
    Suspended,
}

/// Signals delivered by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App moved to the background.
    Backgrounded,
    /// App returned to the foreground.
    Foregrounded,
}

/// Actions for the client to execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Cancel the active subscription, if any.
    CancelSubscription,
    /// Re-establish the subscription for the current document, if one is set.
    Resubscribe,
}

impl LifecycleState {
    /// Process an event and return the new state plus actions to execute.
    ///
    /// Backgrounding always asks for cancellation, which is idempotent, so a
    /// subscription started while already suspended is still torn down.
    /// Foregrounding only resubscribes when coming out of `Suspended`.
    pub fn on_event(self, event: LifecycleEvent) -> (Self, Vec<LifecycleAction>) {
        match (self, event) {
            (_, LifecycleEvent::Backgrounded) => {
                (Self::Suspended, vec![LifecycleAction::CancelSubscription])
            }
            (Self::Suspended, LifecycleEvent::Foregrounded) => {
                (Self::Active, vec![LifecycleAction::Resubscribe])
            }
            (Self::Active, LifecycleEvent::Foregrounded) => (Self::Active, vec![]),
        }
    }

    /// Check if the app is suspended.
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_active() {
        assert_eq!(LifecycleState::default(), LifecycleState::Active);
        assert!(!LifecycleState::default().is_suspended());
    }

    #[test]
    fn background_suspends_and_cancels() {
        let (state, actions) = LifecycleState::Active.on_event(LifecycleEvent::Backgrounded);

        assert_eq!(state, LifecycleState::Suspended);
        assert_eq!(actions, vec![LifecycleAction::CancelSubscription]);
    }

    #[test]
    fn repeated_background_stays_suspended() {
        let (state, _) = LifecycleState::Active.on_event(LifecycleEvent::Backgrounded);
        let (state, actions) = state.on_event(LifecycleEvent::Backgrounded);

        assert_eq!(state, LifecycleState::Suspended);
        assert_eq!(actions, vec![LifecycleAction::CancelSubscription]);
    }

    #[test]
    fn foreground_from_suspended_resubscribes() {
        let (state, actions) = LifecycleState::Suspended.on_event(LifecycleEvent::Foregrounded);

        assert_eq!(state, LifecycleState::Active);
        assert_eq!(actions, vec![LifecycleAction::Resubscribe]);
    }

    #[test]
    fn foreground_while_active_is_no_op() {
        let (state, actions) = LifecycleState::Active.on_event(LifecycleEvent::Foregrounded);

        assert_eq!(state, LifecycleState::Active);
        assert!(actions.is_empty());
    }

    #[test]
    fn full_cycle_returns_to_active() {
        let (state, _) = LifecycleState::Active.on_event(LifecycleEvent::Backgrounded);
        let (state, _) = state.on_event(LifecycleEvent::Foregrounded);
        assert_eq!(state, LifecycleState::Active);
    }
}
