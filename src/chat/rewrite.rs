use tracing::{debug, warn};

use crate::chat::history::StoredMessage;
use crate::chat::prompt::{render_history, rewrite_prompt};
use crate::cortex::CompletionBackend;

/// Retrieval query chosen for a turn, and whether the model produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub query: String,
    pub rewritten: bool,
}

impl RewriteOutcome {
    fn raw(question: &str) -> Self {
        RewriteOutcome {
            query: question.to_string(),
            rewritten: false,
        }
    }
}

/// Folds the history window into the question so follow-ups retrieve well.
///
/// Any failure, and any blank model output, falls back to the question
/// itself; a rewrite problem never fails the turn.
pub async fn rewrite_query(
    completion: &dyn CompletionBackend,
    model: &str,
    history: &[StoredMessage],
    question: &str,
) -> RewriteOutcome {
    if history.is_empty() {
        return RewriteOutcome::raw(question);
    }

    let prompt = rewrite_prompt(&render_history(history), question);
    match completion.complete(model, &prompt).await {
        Ok(reply) => {
            let query = reply.trim();
            if query.is_empty() {
                warn!("Query rewrite returned empty text, using the question as-is");
                return RewriteOutcome::raw(question);
            }
            debug!("Rewrote retrieval query: {}", query);
            RewriteOutcome {
                query: query.to_string(),
                rewritten: true,
            }
        }
        Err(err) => {
            warn!("Query rewrite failed, using the question as-is: {}", err);
            RewriteOutcome::raw(question)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cortex::CortexError;

    struct FakeCompletion {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl FakeCompletion {
        fn replying(text: &str) -> Self {
            FakeCompletion {
                reply: Some(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            FakeCompletion {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeCompletion {
        async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, CortexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(text) => Ok(text.clone()),
                None => Err(CortexError::response_shape("completion unavailable")),
            }
        }
    }

    fn window() -> Vec<StoredMessage> {
        vec![
            StoredMessage::user("Is ibuprofen safe with food?"),
            StoredMessage::assistant("Yes, taking it with food is gentler."),
        ]
    }

    #[tokio::test]
    async fn rewrite_uses_the_model_reply() {
        let completion = FakeCompletion::replying("  ibuprofen daily dose limit  ");

        let outcome = rewrite_query(
            &completion,
            "mistral-large2",
            &window(),
            "how much per day?",
        )
        .await;

        assert_eq!(outcome.query, "ibuprofen daily dose limit");
        assert!(outcome.rewritten);
    }

    #[tokio::test]
    async fn empty_history_skips_the_model_entirely() {
        let completion = FakeCompletion::replying("should not be used");

        let outcome =
            rewrite_query(&completion, "mistral-large2", &[], "how much per day?").await;

        assert_eq!(outcome.query, "how much per day?");
        assert!(!outcome.rewritten);
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_falls_back_to_the_question() {
        let completion = FakeCompletion::failing();

        let outcome =
            rewrite_query(&completion, "mistral-large2", &window(), "how much per day?").await;

        assert_eq!(outcome.query, "how much per day?");
        assert!(!outcome.rewritten);
    }

    #[tokio::test]
    async fn blank_reply_falls_back_to_the_question() {
        let completion = FakeCompletion::replying("   \n  ");

        let outcome =
            rewrite_query(&completion, "mistral-large2", &window(), "how much per day?").await;

        assert_eq!(outcome.query, "how much per day?");
        assert!(!outcome.rewritten);
    }
}
