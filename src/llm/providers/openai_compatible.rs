use async_trait::async_trait;

use crate::errors::{GridPilotError, GridPilotResult};
use crate::llm::provider::VisionProvider;
use crate::llm::types::{ApiMessage, CallConfig, ContentPart, ImageUrl, MessageContent};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn analyze_frame(
        &self,
        image_png_b64: &str,
        prompt: &str,
        cfg: &CallConfig,
    ) -> GridPilotResult<String> {
        let messages = vec![ApiMessage {
            role: "user".into(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{image_png_b64}"),
                    },
                },
                ContentPart::Text {
                    text: prompt.to_string(),
                },
            ]),
        }];

        let body = serde_json::json!({
            "model": cfg.model,
            "messages": messages,
            "stream": false,
            "temperature": cfg.temperature,
        });

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            prompt_len = prompt.len(),
            image_b64_len = image_png_b64.len(),
            "sending frame analysis request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(GridPilotError::Provider(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        if content.is_empty() {
            return Err(GridPilotError::Provider(format!(
                "{}: model returned no content",
                self.id
            )));
        }

        tracing::debug!(provider = %self.id, content_len = content.len(), "analysis received");
        Ok(content)
    }
}
