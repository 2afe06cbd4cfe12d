use crate::core::moderation::Denylist;
use crate::core::{CompletionClient, GenerateResponse, RequestCycle, Stage};
use crate::utils::error::{RelayError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly, concise AI assistant. Avoid generating unsafe or violent content.";
pub const DEFAULT_REJECTION_MESSAGE: &str = "Your input violated the moderation policy.";
pub const DEFAULT_REDACTION_MESSAGE: &str = "Some content was redacted for safety.";
pub const DEFAULT_FAILURE_MESSAGE: &str = "AI request failed.";

/// Texts the engine attaches to its replies.
#[derive(Debug, Clone)]
pub struct ReplyMessages {
    pub rejection: String,
    pub redaction: String,
    pub failure: String,
}

impl Default for ReplyMessages {
    fn default() -> Self {
        Self {
            rejection: DEFAULT_REJECTION_MESSAGE.to_string(),
            redaction: DEFAULT_REDACTION_MESSAGE.to_string(),
            failure: DEFAULT_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Moderates a prompt, relays it to the model and moderates the answer.
pub struct GenerateEngine<C: CompletionClient> {
    client: C,
    denylist: Denylist,
    system_prompt: String,
    messages: ReplyMessages,
}

impl<C: CompletionClient> GenerateEngine<C> {
    pub fn new(client: C, denylist: Denylist) -> Self {
        Self {
            client,
            denylist,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            messages: ReplyMessages::default(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_messages(mut self, messages: ReplyMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn messages(&self) -> &ReplyMessages {
        &self.messages
    }

    pub async fn run(&self, user_prompt: &str) -> Result<GenerateResponse> {
        let mut cycle = RequestCycle::new(user_prompt, self.system_prompt.as_str());

        // Input moderation
        let rejected = self.denylist.contains_banned_words(&cycle.user_prompt);
        cycle.advance(Stage::InputChecked);
        if rejected {
            cycle.advance(Stage::Rejected);
            tracing::info!("🚫 Prompt rejected by input moderation");
            return Err(RelayError::InputRejected);
        }

        let ai_response = self
            .client
            .complete(&cycle.system_prompt, &cycle.user_prompt)
            .await?;
        cycle.advance(Stage::ModelCalled);

        // Output moderation
        let flagged = self.denylist.contains_banned_words(&ai_response);
        cycle.advance(Stage::OutputChecked);

        let message = if flagged {
            cycle.ai_response = Some(self.denylist.redact_banned_words(&ai_response));
            cycle.moderated = true;
            cycle.advance(Stage::Redacted);
            tracing::info!("✂️ Model output redacted");
            Some(self.messages.redaction.clone())
        } else {
            cycle.ai_response = Some(ai_response);
            cycle.advance(Stage::Clean);
            None
        };

        cycle.advance(Stage::Responded);
        Ok(GenerateResponse {
            moderated: cycle.moderated,
            message,
            response: cycle.ai_response.unwrap_or_default(),
        })
    }
}
