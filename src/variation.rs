//! Question variation: rewrite through an external model when one is configured,
//! otherwise (or on any failure) shuffle the original options locally.
//!
//! Shuffle invariant: bank entries list the correct option first. The shuffle
//! moves (position, text) pairs together and reports the new label of the pair
//! that started at position 0, so the answer is known without reading the text.

use std::future::Future;
use std::sync::LazyLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::RewriteConfig;
use crate::domain::{BankEntry, OptionLabel, Subject, Variant, VariantSource};
use crate::error::RewriteError;
use crate::openai::OpenAI;

static LABEL_ARTIFACT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*[(（]\s*[A-Da-d]\s*[)）]\s*").expect("label artifact regex"));

/// What the rewrite collaborator receives.
#[derive(Clone, Debug)]
pub struct RewriteRequest {
  pub subject: Subject,
  pub question: String,
  pub options: Vec<String>,
}

/// What the rewrite collaborator must return. Anything else is a malformed response.
#[derive(Clone, Debug, Deserialize)]
pub struct RewriteResponse {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: String,
}

/// External text-generation service that rewrites one question.
pub trait RewriteProvider {
  fn rewrite(&self, req: &RewriteRequest) -> impl Future<Output = Result<RewriteResponse, RewriteError>> + Send;
}

pub struct VariationEngine<P> {
  provider: Option<P>,
}

impl VariationEngine<OpenAI> {
  /// Engine backed by the OpenAI-compatible client, or shuffle-only when `cfg` is None.
  pub fn from_config(cfg: Option<RewriteConfig>) -> Self {
    match cfg.and_then(OpenAI::new) {
      Some(oa) => {
        info!(target: "rewrite", base_url = %oa.base_url, model = %oa.model, "Question rewriting enabled");
        Self::new(Some(oa))
      }
      None => {
        info!(target: "rewrite", "Question rewriting disabled (no OPENAI_API_KEY). Using option shuffle.");
        Self::offline()
      }
    }
  }
}

impl<P: RewriteProvider> VariationEngine<P> {
  pub fn new(provider: Option<P>) -> Self {
    Self { provider }
  }

  pub fn offline() -> Self {
    Self { provider: None }
  }

  /// Produce one variant. Never fails: every rewrite problem degrades to the shuffle.
  #[instrument(level = "debug", skip(self, entry, rng), fields(options = entry.options.len()))]
  pub async fn vary<R: Rng + Send>(&self, subject: Subject, entry: &BankEntry, rng: &mut R) -> Variant {
    let Some(provider) = &self.provider else {
      return shuffle_options(entry, rng);
    };

    let req = RewriteRequest {
      subject,
      question: entry.question_text.clone(),
      options: entry.options.clone(),
    };
    match provider.rewrite(&req).await.and_then(accept_rewrite) {
      Ok(v) => {
        debug!(target: "rewrite", correct = %v.correct_answer, "Using rewritten question");
        v
      }
      Err(e) => {
        warn!(target: "rewrite", error = %e, "Rewrite unavailable; falling back to option shuffle");
        shuffle_options(entry, rng)
      }
    }
  }
}

/// Validate a provider response and turn it into a variant.
pub fn accept_rewrite(resp: RewriteResponse) -> Result<Variant, RewriteError> {
  let text = resp.question.trim().to_string();
  if text.is_empty() {
    return Err(RewriteError::Malformed("empty question".into()));
  }
  if resp.options.len() != 4 {
    return Err(RewriteError::Malformed(format!("expected 4 options, got {}", resp.options.len())));
  }
  let options: Vec<String> = resp.options.iter().map(|o| strip_label_artifact(o)).collect();
  if options.iter().any(|o| o.is_empty()) {
    return Err(RewriteError::Malformed("empty option text".into()));
  }
  let correct_answer = OptionLabel::parse(&resp.correct_answer)
    .ok_or_else(|| RewriteError::Malformed(format!("bad correct_answer '{}'", resp.correct_answer)))?;

  Ok(Variant { text, options, correct_answer, source: VariantSource::Rewritten })
}

/// Remove a leading `(A)` style label the model copied into the option text.
pub fn strip_label_artifact(text: &str) -> String {
  LABEL_ARTIFACT.replace(text.trim(), "").trim().to_string()
}

/// Local fallback. Exactly four options are shuffled; any other count is kept
/// in order with `A` as the answer.
pub fn shuffle_options<R: Rng + ?Sized>(entry: &BankEntry, rng: &mut R) -> Variant {
  if entry.options.len() != 4 {
    return Variant {
      text: entry.question_text.clone(),
      options: entry.options.clone(),
      correct_answer: OptionLabel::A,
      source: VariantSource::Shuffled,
    };
  }

  let mut pairs: Vec<(usize, &String)> = entry.options.iter().enumerate().collect();
  pairs.shuffle(rng);
  let correct_answer = pairs
    .iter()
    .position(|(original, _)| *original == 0)
    .and_then(OptionLabel::from_index)
    .unwrap_or(OptionLabel::A);

  Variant {
    text: entry.question_text.clone(),
    options: pairs.into_iter().map(|(_, text)| text.clone()).collect(),
    correct_answer,
    source: VariantSource::Shuffled,
  }
}
