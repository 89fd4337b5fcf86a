//! Non-interactive confirmation prompt

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    prompt::{ConfirmationPrompt, ConfirmationRequest},
};
use tracing::info;

/// Answers every confirmation with a fixed value.
///
/// Suitable for headless hosts and scripted restores. Interactive desktop
/// shells are expected to provide their own dialog-backed implementation.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm {
    answer: bool,
}

impl AutoConfirm {
    pub fn accept() -> Self {
        Self { answer: true }
    }

    pub fn decline() -> Self {
        Self { answer: false }
    }
}

impl Default for AutoConfirm {
    fn default() -> Self {
        Self::decline()
    }
}

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, request: ConfirmationRequest) -> Result<bool> {
        info!(prompt = %request.message(), answer = self.answer, "Auto-answering confirmation");
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_answers() {
        let request = ConfirmationRequest::ImportPolicy { incoming: 1 };

        assert!(AutoConfirm::accept().confirm(request.clone()).await.unwrap());
        assert!(!AutoConfirm::decline().confirm(request.clone()).await.unwrap());
        assert!(!AutoConfirm::default().confirm(request).await.unwrap());
    }
}
