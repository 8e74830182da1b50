use anyhow::Result;

pub mod together_client;
pub use together_client::TogetherClient;

/// Capability for a single chat-completion call.
///
/// The classifier injects this so tests can substitute a deterministic
/// stub. Implementations make one attempt with a bounded timeout; the
/// caller treats any error as a soft failure.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}
