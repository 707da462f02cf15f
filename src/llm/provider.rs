use async_trait::async_trait;

use crate::errors::GridPilotResult;
use crate::llm::types::CallConfig;

/// Unified vision-model provider trait. New providers only need to implement
/// this trait and register in config.toml.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// Send one annotated frame plus the analysis prompt and return the
    /// model's raw text reply. The reply is expected (but not guaranteed) to
    /// be the action-plan JSON; parsing happens at the caller.
    async fn analyze_frame(
        &self,
        image_png_b64: &str,
        prompt: &str,
        cfg: &CallConfig,
    ) -> GridPilotResult<String>;
}
