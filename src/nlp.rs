//! Response generation
//!
//! Wraps the hosted completion API behind a deterministic prompt template.
//! This stage never fails: downstream API hiccups are downgraded to one of
//! two canned replies, tagged with a typed [`FallbackReason`] so callers can
//! branch without testing for sentinel strings.

use crate::config::NlpConfig;

/// Canned reply when the API rejects the credentials
const AUTH_FALLBACK: &str = "Authentication error: Please check your API key.";

/// Canned reply for any other generation failure
const GENERATION_FALLBACK: &str = "I'm sorry, I couldn't generate a response at the moment.";

/// Placeholder used in the prompt when no context is supplied
const NO_CONTEXT: &str = "No additional context";

/// Why a canned reply was returned instead of model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The API rejected the credentials
    Auth,
    /// Any other completion failure
    Generation,
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOrigin {
    /// Model completion
    Model,
    /// Canned fallback
    Fallback(FallbackReason),
}

/// A generated reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply text (model completion or canned fallback)
    pub text: String,

    /// Context string the reply was generated with, if any
    pub context: Option<String>,

    /// Whether the text is model output or a fallback
    pub origin: ReplyOrigin,
}

impl Reply {
    /// Whether the reply is genuine model output
    #[must_use]
    pub const fn is_model_output(&self) -> bool {
        matches!(self.origin, ReplyOrigin::Model)
    }
}

/// Request body for the completions API
#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    n: u32,
    stop: [&'a str; 1],
}

#[derive(serde::Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(serde::Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Generates reply text from user input
pub struct ResponseGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseGenerator {
    /// Create a response generator
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the API key is empty
    pub fn new(api_key: String, config: &NlpConfig) -> crate::Result<Self> {
        if api_key.is_empty() {
            return Err(crate::Error::Config(
                "OpenAI API key required for response generation".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Generate a reply to `user_text`
    ///
    /// Never fails: on an authentication error the reply is a fixed apology
    /// tagged [`FallbackReason::Auth`]; on any other failure a second fixed
    /// apology tagged [`FallbackReason::Generation`]. The conversational
    /// loop must keep going through downstream API hiccups.
    pub async fn generate(&self, user_text: &str, context: &str) -> Reply {
        let prompt = build_prompt(user_text, context);
        let tagged_context = (!context.is_empty()).then(|| context.to_string());

        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            n: 1,
            stop: ["\n"],
        };

        let response = match self
            .client
            .post("https://api.openai.com/v1/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "completion request failed");
                return fallback(FallbackReason::Generation, tagged_context);
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            tracing::error!(status = %status, "completion API rejected credentials");
            return fallback(FallbackReason::Auth, tagged_context);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion API error");
            return fallback(FallbackReason::Generation, tagged_context);
        }

        let result: CompletionResponse = match response.json().await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "failed to parse completion response");
                return fallback(FallbackReason::Generation, tagged_context);
            }
        };

        let Some(choice) = result.choices.into_iter().next() else {
            tracing::error!("completion response contained no choices");
            return fallback(FallbackReason::Generation, tagged_context);
        };

        let text = choice.text.trim().to_string();
        tracing::info!(reply = %text, "generated response");
        Reply {
            text,
            context: tagged_context,
            origin: ReplyOrigin::Model,
        }
    }
}

/// Build the deterministic prompt for the completion model
///
/// An empty context becomes a fixed placeholder line so the template shape
/// is stable.
#[must_use]
pub fn build_prompt(user_text: &str, context: &str) -> String {
    let context = if context.is_empty() { NO_CONTEXT } else { context };
    format!(
        "You are an advanced virtual assistant. Respond to the user's query accurately and concisely.\n\
         Context: {context}\n\
         User: {user_text}\n\
         Assistant:"
    )
}

fn fallback(reason: FallbackReason, context: Option<String>) -> Reply {
    let text = match reason {
        FallbackReason::Auth => AUTH_FALLBACK,
        FallbackReason::Generation => GENERATION_FALLBACK,
    };
    Reply {
        text: text.to_string(),
        context,
        origin: ReplyOrigin::Fallback(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_with_context() {
        let prompt = build_prompt("What time is it?", "The user is in Berlin.");
        assert_eq!(
            prompt,
            "You are an advanced virtual assistant. Respond to the user's query accurately and concisely.\n\
             Context: The user is in Berlin.\n\
             User: What time is it?\n\
             Assistant:"
        );
    }

    #[test]
    fn prompt_without_context_uses_placeholder() {
        let prompt = build_prompt("Hello", "");
        assert!(prompt.contains("Context: No additional context\n"));
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn fallback_carries_reason() {
        let reply = fallback(FallbackReason::Auth, None);
        assert_eq!(reply.origin, ReplyOrigin::Fallback(FallbackReason::Auth));
        assert_eq!(reply.text, AUTH_FALLBACK);
        assert!(!reply.is_model_output());

        let reply = fallback(FallbackReason::Generation, Some("ctx".to_string()));
        assert_eq!(
            reply.origin,
            ReplyOrigin::Fallback(FallbackReason::Generation)
        );
        assert_eq!(reply.context.as_deref(), Some("ctx"));
    }
}
