//! Role document lifecycle

use crate::error::{KimError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow state of a role document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Being edited
    #[default]
    Draft,
    /// Submitted and awaiting approval
    Enroute,
    /// Changes materialized
    Approved,
    /// Rejected; changes discarded
    Disapproved,
}

impl DocumentState {
    pub fn can_transition_to(&self, next: DocumentState) -> bool {
        matches!(
            (self, next),
            (DocumentState::Draft, DocumentState::Enroute)
                | (DocumentState::Enroute, DocumentState::Approved)
                | (DocumentState::Enroute, DocumentState::Disapproved)
        )
    }

    /// The state after moving to `next`
    ///
    /// # Errors
    ///
    /// Returns `KimError::InvalidTransition` for any change other than
    /// Draft to Enroute, or Enroute to Approved or Disapproved.
    pub fn transition(self, next: DocumentState) -> Result<DocumentState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(KimError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, DocumentState::Approved | DocumentState::Disapproved)
    }

    pub fn is_editable(&self) -> bool {
        *self == DocumentState::Draft
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentState::Draft => "draft",
            DocumentState::Enroute => "enroute",
            DocumentState::Approved => "approved",
            DocumentState::Disapproved => "disapproved",
        };
        f.write_str(label)
    }
}
