//! Hook phases
//!
//! A hook runs either before the database call of its operation or after it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("Invalid hook phase '{0}': expected 'before' or 'after'")]
    InvalidPhase(String),
}

/// When a hook fires relative to the database call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Before,
    After,
}

impl HookPhase {
    pub const ALL: [HookPhase; 2] = [HookPhase::Before, HookPhase::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        }
    }

    /// Parse an optional phase name; `None` selects both phases
    pub fn parse_optional(when: Option<&str>) -> Result<Option<HookPhase>, HookError> {
        when.map(str::parse).transpose()
    }

    /// Phases selected by an optional filter, in execution order
    pub fn selected(when: Option<HookPhase>) -> &'static [HookPhase] {
        match when {
            Some(HookPhase::Before) => &[HookPhase::Before],
            Some(HookPhase::After) => &[HookPhase::After],
            None => &Self::ALL,
        }
    }
}

impl FromStr for HookPhase {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(HookPhase::Before),
            "after" => Ok(HookPhase::After),
            other => Err(HookError::InvalidPhase(other.to_string())),
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
