//! Pass state definitions for tracking crawl progress
//!
//! A pass walks every listing page of one URL slug and, when enrichment is
//! enabled, every pending detail page after that.

use crate::CrawlError;
use std::fmt;

/// Represents the current state of a single crawl pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassState {
    // ===== Active States =====
    /// Landing page is being fetched
    Initializing,

    /// Filter parameters were derived from the landing page
    ParamsReady,

    /// Page jobs are queued and being drained by the page workers
    PagesQueued,

    /// Every page job was marked done
    PagesDrained,

    /// Pending records are queued for detail fetches
    AddressesQueued,

    /// Every detail job was marked done
    AddressesDrained,

    // ===== Terminal States =====
    /// The pass finished
    PassComplete,

    /// The pass was abandoned (landing fetch or pagination failure)
    Failed,
}

impl PassState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PassComplete | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// The address phase is optional, so `PagesDrained` may complete the pass
    /// directly. `Failed` is reachable from any active state.
    pub fn can_transition_to(&self, next: PassState) -> bool {
        use PassState::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Initializing, ParamsReady)
            | (ParamsReady, PagesQueued)
            | (PagesQueued, PagesDrained)
            | (PagesDrained, AddressesQueued)
            | (PagesDrained, PassComplete)
            | (AddressesQueued, AddressesDrained)
            | (AddressesDrained, PassComplete) => true,
            _ => false,
        }
    }

    /// Short label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::ParamsReady => "params_ready",
            Self::PagesQueued => "pages_queued",
            Self::PagesDrained => "pages_drained",
            Self::AddressesQueued => "addresses_queued",
            Self::AddressesDrained => "addresses_drained",
            Self::PassComplete => "pass_complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one pass through its states, rejecting illegal transitions
#[derive(Debug)]
pub struct PassTracker {
    slug: String,
    state: PassState,
}

impl PassTracker {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            state: PassState::Initializing,
        }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Moves to `next`, logging the transition
    pub fn advance(&mut self, next: PassState) -> Result<(), CrawlError> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!("Pass '{}': {} -> {}", self.slug, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Marks the pass failed unless it already reached a terminal state
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            tracing::debug!("Pass '{}': {} -> failed", self.slug, self.state);
            self.state = PassState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!PassState::Initializing.is_terminal());
        assert!(!PassState::PagesQueued.is_terminal());
        assert!(!PassState::AddressesDrained.is_terminal());

        assert!(PassState::PassComplete.is_terminal());
        assert!(PassState::Failed.is_terminal());
    }

    #[test]
    fn test_full_path_with_addresses() {
        let mut tracker = PassTracker::new("government/primary");
        for next in [
            PassState::ParamsReady,
            PassState::PagesQueued,
            PassState::PagesDrained,
            PassState::AddressesQueued,
            PassState::AddressesDrained,
            PassState::PassComplete,
        ] {
            tracker.advance(next).unwrap();
        }
        assert_eq!(tracker.state(), PassState::PassComplete);
    }

    #[test]
    fn test_address_phase_is_optional() {
        assert!(PassState::PagesDrained.can_transition_to(PassState::PassComplete));
    }

    #[test]
    fn test_skipping_states_is_rejected() {
        let mut tracker = PassTracker::new("primary");
        let err = tracker.advance(PassState::PagesQueued).unwrap_err();
        assert!(matches!(
            err,
            CrawlError::InvalidTransition {
                from: PassState::Initializing,
                to: PassState::PagesQueued
            }
        ));
        assert_eq!(tracker.state(), PassState::Initializing);
    }

    #[test]
    fn test_fail_from_active_state() {
        let mut tracker = PassTracker::new("primary");
        tracker.advance(PassState::ParamsReady).unwrap();
        tracker.fail();
        assert_eq!(tracker.state(), PassState::Failed);
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        assert!(!PassState::PassComplete.can_transition_to(PassState::Failed));
        assert!(!PassState::Failed.can_transition_to(PassState::ParamsReady));

        let mut tracker = PassTracker::new("primary");
        tracker.fail();
        tracker.fail();
        assert_eq!(tracker.state(), PassState::Failed);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PassState::PagesDrained), "pages_drained");
        assert_eq!(format!("{}", PassState::PassComplete), "pass_complete");
    }
}
