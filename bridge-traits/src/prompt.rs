//! User Confirmation Abstraction
//!
//! Destructive operations (replacing the local catalog with a remote backup,
//! choosing how an import is applied) ask the host before proceeding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the core is asking the user to confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmationRequest {
    /// Replace every local collection with `incoming` remote ones.
    ReplaceLocalCatalog { local: usize, incoming: usize },
    /// Accepting restores (clear first); declining merges by id.
    ImportPolicy { incoming: usize },
}

impl ConfirmationRequest {
    /// Human readable prompt text
    pub fn message(&self) -> String {
        match self {
            ConfirmationRequest::ReplaceLocalCatalog { local, incoming } => format!(
                "Replace {} local collection(s) with {} collection(s) from the backup?",
                local, incoming
            ),
            ConfirmationRequest::ImportPolicy { incoming } => format!(
                "Importing {} collection(s). Clear the local catalog first? \
                 Choose no to merge by id.",
                incoming
            ),
        }
    }
}

/// Host-provided confirmation capability
///
/// Desktop: a dialog or CLI prompt. Tests: a canned answer.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Ask the user; `true` means accepted.
    async fn confirm(&self, request: ConfirmationRequest) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_message_mentions_counts() {
        let msg = ConfirmationRequest::ReplaceLocalCatalog {
            local: 3,
            incoming: 5,
        }
        .message();
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(ConfirmationRequest::ImportPolicy { incoming: 2 }).unwrap();
        assert_eq!(json["kind"], "import_policy");
        assert_eq!(json["incoming"], 2);
    }
}
