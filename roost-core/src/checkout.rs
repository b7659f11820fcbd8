//! The checkout entity

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::git::BranchName;

/// Last known working tree state of a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    /// Not refreshed yet, or the last refresh failed
    #[default]
    Unknown,
    /// No uncommitted modifications
    Clean,
    /// Uncommitted modifications present
    Dirty,
}

impl CheckoutStatus {
    /// Status for a dirty-check result
    pub fn from_dirty(dirty: bool) -> Self {
        if dirty {
            CheckoutStatus::Dirty
        } else {
            CheckoutStatus::Clean
        }
    }

    /// Whether the checkout is known to be dirty
    pub fn is_dirty(&self) -> bool {
        matches!(self, CheckoutStatus::Dirty)
    }
}

/// What a front-end should show for a checkout, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// A batch item is running against the checkout
    Busy,
    /// Recently changed by a pull
    Updated,
    Dirty,
    Clean,
    Unknown,
}

impl Indicator {
    /// Single-character marker for plain-text rendering
    pub fn glyph(&self) -> char {
        match self {
            Indicator::Busy => '~',
            Indicator::Updated => '+',
            Indicator::Dirty => '*',
            Indicator::Clean => ' ',
            Indicator::Unknown => '?',
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Indicator::Busy => "busy",
            Indicator::Updated => "updated",
            Indicator::Dirty => "dirty",
            Indicator::Clean => "clean",
            Indicator::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// One managed working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    name: String,
    path: PathBuf,
    /// Checked out branch as of the last refresh or batch operation
    pub branch: BranchName,
    /// Dirty/clean as of the last refresh
    pub status: CheckoutStatus,
    /// Message of the last failed batch operation, cleared on success
    pub last_error: Option<String>,
    /// Why the last status refresh failed, cleared by the next good one
    pub status_error: Option<String>,
    /// HEAD commit as of the last refresh
    pub head: Option<String>,
    /// Set while a batch item is in flight for this checkout
    pub busy: bool,
}

impl Checkout {
    /// Create a checkout in the `Unknown` state
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            branch: BranchName::Detached,
            status: CheckoutStatus::Unknown,
            last_error: None,
            status_error: None,
            head: None,
            busy: false,
        }
    }

    /// Unique name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Working tree root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Error to show: the batch failure first, then the refresh failure
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref().or(self.status_error.as_deref())
    }

    /// Indicator ignoring the update blink
    pub fn base_indicator(&self) -> Indicator {
        if self.busy {
            return Indicator::Busy;
        }
        match self.status {
            CheckoutStatus::Dirty => Indicator::Dirty,
            CheckoutStatus::Clean => Indicator::Clean,
            CheckoutStatus::Unknown => Indicator::Unknown,
        }
    }

    /// Indicator with the update blink layered over dirty/clean
    pub fn indicator(&self, recently_updated: bool) -> Indicator {
        match self.base_indicator() {
            Indicator::Busy => Indicator::Busy,
            _ if recently_updated => Indicator::Updated,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checkout_is_unknown() {
        let checkout = Checkout::new("api", "/src/api");
        assert_eq!(checkout.name(), "api");
        assert_eq!(checkout.path(), Path::new("/src/api"));
        assert_eq!(checkout.status, CheckoutStatus::Unknown);
        assert_eq!(checkout.branch, BranchName::Detached);
        assert_eq!(checkout.base_indicator(), Indicator::Unknown);
    }

    #[test]
    fn test_indicator_priority() {
        let mut checkout = Checkout::new("api", "/src/api");
        checkout.status = CheckoutStatus::Dirty;
        assert_eq!(checkout.indicator(false), Indicator::Dirty);
        assert_eq!(checkout.indicator(true), Indicator::Updated);

        checkout.busy = true;
        assert_eq!(checkout.indicator(true), Indicator::Busy);
    }

    #[test]
    fn test_batch_error_shown_before_refresh_error() {
        let mut checkout = Checkout::new("api", "/src/api");
        assert_eq!(checkout.error(), None);

        checkout.status_error = Some("index locked".into());
        assert_eq!(checkout.error(), Some("index locked"));

        checkout.last_error = Some("conflict".into());
        assert_eq!(checkout.error(), Some("conflict"));
    }
}
