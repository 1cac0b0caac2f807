//! Minimal OpenAI-compatible client for question rewriting.
//!
//! We only call chat.completions and request a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::RewriteConfig;
use crate::error::RewriteError;
use crate::util::fill_template;
use crate::variation::{RewriteProvider, RewriteRequest, RewriteResponse};

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  temperature: f32,
  prompts: crate::config::Prompts,
}

impl OpenAI {
  /// Build the client from explicit settings; None if the HTTP client cannot be built.
  pub fn new(cfg: RewriteConfig) -> Option<Self> {
    let client = match reqwest::Client::builder()
      .timeout(Duration::from_secs(cfg.timeout_secs))
      .build()
    {
      Ok(c) => c,
      Err(e) => {
        error!(target: "rewrite", error = %e, "Failed to build HTTP client; rewriting disabled");
        return None;
      }
    };

    Some(Self {
      client,
      api_key: cfg.api_key,
      base_url: cfg.base_url.trim_end_matches('/').to_string(),
      model: cfg.model,
      temperature: cfg.temperature,
      prompts: cfg.prompts,
    })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "debug", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T, RewriteError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: self.temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "mock-exam-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(http_error(status.as_u16(), body));
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "rewrite", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    completion_to_result(body)
  }
}

/// Turn a successful completion body into T. A filtered or refused choice is
/// `ContentFiltered`; anything that does not parse as T is `Malformed`.
fn completion_to_result<T: DeserializeOwned>(body: ChatCompletionResponse) -> Result<T, RewriteError> {
  let choice = body
    .choices
    .into_iter()
    .next()
    .ok_or_else(|| RewriteError::Malformed("no choices in response".into()))?;
  if choice.finish_reason.as_deref() == Some("content_filter") {
    return Err(RewriteError::ContentFiltered);
  }
  if choice.message.refusal.as_deref().is_some_and(|r| !r.trim().is_empty()) {
    return Err(RewriteError::ContentFiltered);
  }

  let text = choice.message.content.unwrap_or_default();
  serde_json::from_str::<T>(strip_code_fence(&text)).map_err(|e| RewriteError::Malformed(format!("JSON parse error: {e}")))
}

impl RewriteProvider for OpenAI {
  #[instrument(level = "info", skip(self, req), fields(subject = %req.subject, model = %self.model, question_len = req.question.len()))]
  async fn rewrite(&self, req: &RewriteRequest) -> Result<RewriteResponse, RewriteError> {
    let option = |i: usize| req.options.get(i).map(String::as_str).unwrap_or("");
    let user = fill_template(
      &self.prompts.rewrite_user_template,
      &[
        ("subject", req.subject.label()),
        ("question", req.question.as_str()),
        ("option_a", option(0)),
        ("option_b", option(1)),
        ("option_c", option(2)),
        ("option_d", option(3)),
      ],
    );

    let start = Instant::now();
    let result = self.chat_json::<RewriteResponse>(&self.prompts.rewrite_system, &user).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(r) => info!(target: "rewrite", ?elapsed, question_len = r.question.len(), "Rewrite received"),
      Err(e) => warn!(target: "rewrite", ?elapsed, error = %e, "Rewrite call failed"),
    }
    result
  }
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
  let text = text.trim();
  if text.starts_with("```") {
    text
      .trim_start_matches("```json")
      .trim_start_matches("```")
      .trim_end_matches("```")
      .trim()
  } else {
    text
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq {
  role: String,
  content: String,
}
#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  r#type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
  #[serde(default)]
  finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<String>,
  #[serde(default)]
  refusal: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)]
  prompt_tokens: Option<u32>,
  #[serde(default)]
  completion_tokens: Option<u32>,
  #[serde(default)]
  total_tokens: Option<u32>,
}

fn http_error(status: u16, body: String) -> RewriteError {
  let message = extract_openai_error(&body).unwrap_or(body);
  RewriteError::Http { status, message }
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_fences_are_removed() {
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
  }

  #[test]
  fn error_bodies_are_unwrapped() {
    let body = r#"{"error":{"message":"Invalid API key","type":"auth"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Invalid API key"));
    assert_eq!(extract_openai_error("gateway timeout"), None);
  }

  #[test]
  fn non_success_status_maps_to_http_error() {
    let body = r#"{"error":{"message":"Rate limit reached"}}"#.to_string();
    match http_error(429, body) {
      RewriteError::Http { status, message } => {
        assert_eq!(status, 429);
        assert_eq!(message, "Rate limit reached");
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(http_error(502, "bad gateway".into()), RewriteError::Http { status: 502, ref message } if message == "bad gateway"));
  }

  fn completion(json: &str) -> ChatCompletionResponse {
    serde_json::from_str(json).expect("completion json")
  }

  #[test]
  fn filtered_choice_is_content_filtered() {
    let body = completion(r#"{"choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#);
    let res = completion_to_result::<RewriteResponse>(body);
    assert!(matches!(res, Err(RewriteError::ContentFiltered)));
  }

  #[test]
  fn refusal_is_content_filtered() {
    let body = completion(
      r#"{"choices":[{"message":{"content":null,"refusal":"I can't help with that."},"finish_reason":"stop"}]}"#,
    );
    let res = completion_to_result::<RewriteResponse>(body);
    assert!(matches!(res, Err(RewriteError::ContentFiltered)));
  }

  #[test]
  fn fenced_json_content_is_parsed() {
    let content = "```json\n{\"question\":\"3+3=?\",\"options\":[\"6\",\"5\",\"7\",\"8\"],\"correct_answer\":\"A\"}\n```";
    let json = serde_json::json!({
      "choices": [{ "message": { "content": content }, "finish_reason": "stop" }],
      "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    });
    let body: ChatCompletionResponse = serde_json::from_value(json).expect("completion json");
    let resp = completion_to_result::<RewriteResponse>(body).expect("rewrite response");
    assert_eq!(resp.question, "3+3=?");
    assert_eq!(resp.options, vec!["6", "5", "7", "8"]);
    assert_eq!(resp.correct_answer, "A");
  }

  #[test]
  fn three_options_parse_but_are_rejected_downstream() {
    let content = r#"{"question":"q","options":["a","b","c"],"correct_answer":"B"}"#;
    let json = serde_json::json!({ "choices": [{ "message": { "content": content } }] });
    let body: ChatCompletionResponse = serde_json::from_value(json).expect("completion json");
    let resp = completion_to_result::<RewriteResponse>(body).expect("valid JSON");
    assert_eq!(resp.options.len(), 3);
    assert!(matches!(crate::variation::accept_rewrite(resp), Err(RewriteError::Malformed(_))));
  }

  #[test]
  fn empty_choices_and_non_json_content_are_malformed() {
    let res = completion_to_result::<RewriteResponse>(completion(r#"{"choices":[]}"#));
    assert!(matches!(res, Err(RewriteError::Malformed(_))));

    let body = completion(r#"{"choices":[{"message":{"content":"Sure! Here is a question."}}]}"#);
    let res = completion_to_result::<RewriteResponse>(body);
    assert!(matches!(res, Err(RewriteError::Malformed(_))));
  }
}
