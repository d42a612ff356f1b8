//! Result of one host event, kept apart from the error channel.

use gd_core::DpiError;

/// How the host should treat a processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// A page was emitted and nothing else needs to happen.
    Handled,
    /// The event was not a navigation the plugin acts on.
    NotHandled,
    /// An error page was emitted; the host may act on the failure.
    Failed(DpiError),
}

/// Outcome plus the non-fatal problems met along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationReport {
    pub outcome: NavigationOutcome,
    pub warnings: Vec<DpiError>,
}

impl NavigationReport {
    pub fn handled() -> Self {
        Self::from(NavigationOutcome::Handled)
    }

    pub fn not_handled() -> Self {
        Self::from(NavigationOutcome::NotHandled)
    }

    pub fn failed(error: DpiError) -> Self {
        Self::from(NavigationOutcome::Failed(error))
    }

    pub fn with_warnings(mut self, warnings: Vec<DpiError>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_handled(&self) -> bool {
        self.outcome == NavigationOutcome::Handled
    }
}

impl From<NavigationOutcome> for NavigationReport {
    fn from(outcome: NavigationOutcome) -> Self {
        Self {
            outcome,
            warnings: Vec::new(),
        }
    }
}
