/// Lifecycle state of a crawl checkpoint
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents where a crawl is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    /// Checkpoint created, agency selection not yet made
    #[default]
    Initializing,

    /// Traversal in progress
    Running,

    /// Every selected agency completed and the report was written
    Completed,

    /// Traversal finished but some units stayed pending after retry exhaustion
    Incomplete,

    /// A fatal failure aborted the run
    Error,
}

impl CrawlStatus {
    /// Returns true if the run that wrote this status has ended
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Incomplete | Self::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Error => "error",
        }
    }

    /// Capitalized label used in the status page and console output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Incomplete => "Incomplete",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
