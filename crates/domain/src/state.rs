//! Send-state machine.
//!
//! One state machine per send: `Idle → Sending → {Succeeded |
//! Failed(kind)} → Idle`. Every failed branch still carries a synthetic
//! response so downstream capture, persistence and history have one
//! shape to handle.

use serde::{Deserialize, Serialize};

use crate::response::ResponseRecord;

/// The current state of a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SendState {
    /// No send in progress.
    #[default]
    Idle,

    /// Call in flight.
    Sending {
        /// When the send started, for elapsed display. Not serializable.
        #[serde(skip)]
        started_at: Option<std::time::Instant>,
    },

    /// The call completed with a wire response.
    Succeeded {
        /// The captured response.
        response: Box<ResponseRecord>,
    },

    /// The send failed; a synthetic response stands in for the wire one.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// The synthetic response record.
        response: Box<ResponseRecord>,
    },
}

impl SendState {
    /// Creates a Sending state stamped with the current instant.
    #[must_use]
    pub fn sending() -> Self {
        Self::Sending {
            started_at: Some(std::time::Instant::now()),
        }
    }

    /// Creates a Succeeded state.
    #[must_use]
    pub fn succeeded(response: ResponseRecord) -> Self {
        Self::Succeeded {
            response: Box::new(response),
        }
    }

    /// Creates a Failed state.
    #[must_use]
    pub fn failed(kind: FailureKind, response: ResponseRecord) -> Self {
        Self::Failed {
            kind,
            response: Box::new(response),
        }
    }

    /// Returns true if a send is in flight.
    #[must_use]
    pub const fn is_sending(&self) -> bool {
        matches!(self, Self::Sending { .. })
    }

    /// Returns the captured or synthetic response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseRecord> {
        match self {
            Self::Succeeded { response } | Self::Failed { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns the elapsed time while sending.
    #[must_use]
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        match self {
            Self::Sending {
                started_at: Some(t),
            } => Some(t.elapsed()),
            _ => None,
        }
    }
}

/// Why a send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The call exceeded the timeout budget and was aborted.
    Timeout,

    /// Transport-level failure; endpoint unreachable or blocked.
    Network,

    /// The pre-request script raised an error and the send was aborted.
    ScriptAborted,
}
