//! OpenAI-compatible Chat Completions driver.
//!
//! Streams `/v1/chat/completions` server-sent events and decodes them into
//! [`DriverEvent`]s.

use futures::StreamExt;

use super::{DriverEvent, DriverStream, LlmDriver, LlmRequest, LlmSettings};

/// Driver for the Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request_body(&self, req: LlmRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "stream": true,
            "messages": req.messages,
        });
        if !req.tools.is_empty() {
            body["tools"] = serde_json::Value::Array(req.tools);
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<DriverStream> {
        let url = self.settings.provider.chat_url(&self.settings.base_url);
        let body = self.request_body(req);

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("model provider returned {status}: {}", provider_message(&detail));
        }
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                for event in drain_frames(&mut buf)? {
                    yield event;
                }
            }
        };

        Ok(Box::pin(out))
    }
}

/// Remove every complete frame from `buf` and decode its `data:` lines.
fn drain_frames(buf: &mut Vec<u8>) -> anyhow::Result<Vec<DriverEvent>> {
    let mut events = Vec::new();
    while let Some((pos, len)) = find_frame_end(buf) {
        let frame = buf.drain(..pos + len).collect::<Vec<_>>();
        let text = String::from_utf8_lossy(&frame);

        for line in text.lines() {
            let Some(data) = line.trim().strip_prefix("data:") else {
                continue;
            };
            events.extend(decode_data(data.trim())?);
        }
    }
    Ok(events)
}

/// Decode the payload of one `data:` line.
fn decode_data(data: &str) -> anyhow::Result<Vec<DriverEvent>> {
    if data == "[DONE]" {
        return Ok(vec![DriverEvent::Done]);
    }

    let v: serde_json::Value = serde_json::from_str(data)?;
    if let Some(err) = v.get("error") {
        anyhow::bail!("model provider error: {}", err["message"].as_str().unwrap_or("unknown"));
    }

    let mut events = Vec::new();
    let Some(choice) = v["choices"].get(0) else {
        return Ok(events);
    };
    let delta = &choice["delta"];

    if let Some(s) = delta.get("content").and_then(|x| x.as_str()) {
        if !s.is_empty() {
            events.push(DriverEvent::TextDelta {
                text: s.to_string(),
            });
        }
    }

    if let Some(arr) = delta.get("tool_calls").and_then(|x| x.as_array()) {
        for tc in arr {
            let index = tc
                .get("index")
                .and_then(serde_json::Value::as_u64)
                .and_then(|i| usize::try_from(i).ok())
                .unwrap_or(0);
            let function = tc.get("function");
            events.push(DriverEvent::ToolCallDelta {
                index,
                id: tc.get("id").and_then(|x| x.as_str()).map(ToString::to_string),
                name: function
                    .and_then(|f| f.get("name"))
                    .and_then(|x| x.as_str())
                    .map(ToString::to_string),
                arguments_delta: function
                    .and_then(|f| f.get("arguments"))
                    .and_then(|x| x.as_str())
                    .map(ToString::to_string),
            });
        }
    }

    if let Some(reason) = choice.get("finish_reason").and_then(|x| x.as_str()) {
        events.push(DriverEvent::Finish {
            reason: reason.to_string(),
        });
    }

    Ok(events)
}

/// Pull `error.message` out of a provider error body when present.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Offset and length of the first blank line ending a frame, `\n\n` or `\r\n\r\n`.
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}
