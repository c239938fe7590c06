//! Call-site origins for nodes.

use core::fmt;
use std::panic::Location;

/// The source location that created a node.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Origin(&'static Location<'static>);

impl Origin {
    /// Captures the caller's location.
    #[must_use]
    #[track_caller]
    pub fn here() -> Self {
        Self(Location::caller())
    }

    /// Wraps an already captured location.
    #[must_use]
    pub const fn from_location(location: &'static Location<'static>) -> Self {
        Self(location)
    }

    /// Source file of the call site.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    /// Line of the call site.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Origin({}:{})", self.0.file(), self.0.line())
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.file(), self.0.line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn captured() -> Origin {
        Origin::here()
    }

    #[test]
    fn track_caller_reports_outer_line() {
        let line = line!() + 1;
        let origin = captured();
        assert_eq!(origin.line(), line);
        assert!(origin.file().ends_with("origin.rs"));
        assert_eq!(origin.to_string(), format!("{}:{line}", origin.file()));
    }
}
