//! Lifecycle status of soft-deletable documents.
//!
//! Documents are never physically removed. Deletion flips the status to
//! [`Status::Deleted`] and every write path checks the transition table in
//! [`Status::check_transition`] before touching the collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    #[default]
    Inactive,
    Deleted,
}

/// The write path a status change is attempted through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Create,
    Update,
    Delete,
}

/// A status change the transition table forbids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("status {to} cannot be assigned on {via:?}")]
    Forbidden { to: Status, via: Transition },
    #[error("a {from} document cannot move to {to}")]
    FromDeleted { from: Status, to: Status },
}

impl Status {
    /// Statuses visible in normal listings.
    pub const LISTED: [Status; 2] = [Status::Active, Status::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Deleted => "deleted",
        }
    }

    /// Uppercase tag used inside status-qualified cache keys.
    pub fn key_tag(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
            Status::Deleted => "DELETED",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Status::Deleted)
    }

    /// Checks a status change against the transition table.
    ///
    /// - `Create`: only `active` or `inactive` may be assigned.
    /// - `Update`: `active` <-> `inactive`; never to or from `deleted`.
    /// - `Delete`: anything may become `deleted`.
    ///
    /// `from` is `None` when the current status is unknown to the caller
    /// (always the case on create).
    ///
    /// # Examples
    ///
    /// ```
    /// use mango_core::document::{Status, Transition};
    ///
    /// assert!(Status::check_transition(Some(Status::Active), Status::Inactive, Transition::Update).is_ok());
    /// assert!(Status::check_transition(None, Status::Deleted, Transition::Update).is_err());
    /// assert!(Status::check_transition(Some(Status::Active), Status::Deleted, Transition::Delete).is_ok());
    /// ```
    pub fn check_transition(
        from: Option<Status>,
        to: Status,
        via: Transition,
    ) -> Result<(), TransitionError> {
        match via {
            Transition::Delete => {
                if to.is_deleted() {
                    Ok(())
                } else {
                    Err(TransitionError::Forbidden { to, via })
                }
            }
            Transition::Create | Transition::Update => {
                if to.is_deleted() {
                    return Err(TransitionError::Forbidden { to, via });
                }
                match from {
                    Some(from) if from.is_deleted() => Err(TransitionError::FromDeleted { from, to }),
                    _ => Ok(()),
                }
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            "deleted" => Ok(Status::Deleted),
            other => Err(format!("unknown status: {other}")),
        }
    }
}
