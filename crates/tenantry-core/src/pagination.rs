//! Offset/limit windows for list operations.

use serde::{Deserialize, Serialize};

/// A `skip`/`limit` window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Number of rows to skip.
    pub skip: usize,
    /// Maximum number of rows to return.
    pub limit: usize,
}

impl Window {
    /// The default number of rows per list call.
    pub const DEFAULT_LIMIT: usize = 100;

    /// Creates a new window.
    #[must_use]
    pub const fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }

    /// Caps the limit at `max`.
    #[must_use]
    pub fn clamped(self, max: usize) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.min(max),
        }
    }

    /// Window that matches every row.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            skip: 0,
            limit: usize::MAX,
        }
    }

    /// Returns true if the limit leaves no room for any row.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}
