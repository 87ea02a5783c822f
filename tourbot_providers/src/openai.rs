use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tourbot_core::{GenerationRequest, LLMProvider, LLMResponse, ToolRegistry, Usage};
use tracing::{debug, info, warn};

use crate::retry::retry_with_backoff;

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    max_tool_rounds: usize,
    retry_delays: Vec<Duration>,
}

/// One tool invocation requested by the model.
struct ToolCall {
    id: String,
    name: String,
    arguments: Value,
}

/// Parsed body of a single completion.
struct Completion {
    message: Value,
    content: Option<String>,
    tool_calls: Vec<ToolCall>,
    usage: Option<Usage>,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAIProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            max_tool_rounds: 5,
            retry_delays: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Upper bound on request/tool-result exchanges within one generation.
    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    async fn try_send(&self, body: &Value) -> anyhow::Result<Completion> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_completion(&response)
    }

    async fn send(&self, body: &Value) -> anyhow::Result<Completion> {
        retry_with_backoff(|| self.try_send(body), &self.retry_delays).await
    }
}

fn parse_completion(response: &Value) -> anyhow::Result<Completion> {
    let message = response["choices"][0]["message"].clone();
    if !message.is_object() {
        anyhow::bail!("Invalid response format: missing message");
    }

    let content = message["content"].as_str().map(str::to_string);
    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
        .unwrap_or_default();

    let usage = response["usage"].as_object().map(|u| {
        let count = |key: &str| {
            u.get(key)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0)
        };
        Usage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        }
    });

    Ok(Completion {
        message,
        content,
        tool_calls,
        usage,
    })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let id = call["id"].as_str()?.to_string();
    let name = call["function"]["name"].as_str()?.to_string();
    let raw = call["function"]["arguments"].as_str().unwrap_or_default();
    // Some models send a bare string instead of a JSON object.
    let arguments =
        serde_json::from_str::<Value>(raw).unwrap_or_else(|_| json!({ "query": raw }));
    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

fn request_body(
    model: &str,
    temperature: f32,
    max_tokens: usize,
    messages: &[Value],
    tools: Option<&ToolRegistry>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "max_tokens": max_tokens,
    });
    if let Some(registry) = tools.filter(|r| !r.is_empty()) {
        body["tools"] = Value::Array(registry.get_definitions());
        body["tool_choice"] = json!("auto");
    }
    body
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<LLMResponse> {
        let settings = request.settings;
        let mut messages = request
            .messages
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let mut usage = Usage::default();

        info!(
            "Sending request to chat completions: model={}, tools={}",
            settings.model,
            request.tools.map_or(0, ToolRegistry::len)
        );

        for round in 1..=self.max_tool_rounds {
            let body = request_body(
                &settings.model,
                settings.temperature,
                settings.max_tokens,
                &messages,
                request.tools,
            );
            let completion = self.send(&body).await?;
            if let Some(u) = &completion.usage {
                usage.accumulate(u);
            }

            let registry = match request.tools {
                Some(registry) if !completion.tool_calls.is_empty() => registry,
                _ => {
                    let content = completion.content.ok_or_else(|| {
                        anyhow::anyhow!("Invalid response format: missing content")
                    })?;
                    info!("Received response after {round} round(s)");
                    return Ok(LLMResponse {
                        content,
                        usage: Some(usage),
                    });
                }
            };

            messages.push(completion.message);
            for call in completion.tool_calls {
                debug!("Tool call {} -> {}({})", call.id, call.name, call.arguments);
                let result = registry.execute(&call.name, call.arguments).await;
                if result.is_error {
                    warn!("Tool {} failed: {}", call.name, result.content);
                }
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result.content,
                }));
            }
        }

        anyhow::bail!(
            "Model still requesting tools after {} rounds",
            self.max_tool_rounds
        )
    }

    fn get_default_model(&self) -> &'static str {
        "gpt-4o-mini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_arguments_fall_back_to_query() {
        let call = json!({
            "id": "call_1",
            "type": "function",
            "function": { "name": "ProductSearch", "arguments": "北京的旅游产品" }
        });
        let parsed = parse_tool_call(&call);
        assert!(parsed.is_some());
        if let Some(parsed) = parsed {
            assert_eq!(parsed.arguments, json!({ "query": "北京的旅游产品" }));
        }
    }

    #[test]
    fn completion_without_message_is_error() {
        assert!(parse_completion(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn body_omits_tools_when_registry_empty() {
        let registry = ToolRegistry::new();
        let body = request_body("m", 0.3, 16, &[], Some(&registry));
        assert!(body.get("tools").is_none());
        assert_eq!(body["model"], "m");
    }
}
