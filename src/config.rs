//! Loading application configuration (paths, limits, rewrite prompts) from TOML,
//! plus the rewrite provider settings taken from the environment.
//!
//! See `AppConfig` and `Prompts` for expected schema:
//!
//! ```toml
//! [paths]
//! bank_dir = "exams/bank"
//! generated_dir = "exams/generated"
//!
//! [limits]
//! max_questions = 50
//!
//! [prompts]
//! rewrite_system = "..."
//! rewrite_user_template = "... {question} ... {option_a} ..."
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ExamError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub paths: PathsConfig,
  #[serde(default)]
  pub limits: LimitsConfig,
  #[serde(default)]
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
  pub bank_dir: PathBuf,
  pub generated_dir: PathBuf,
}

impl Default for PathsConfig {
  fn default() -> Self {
    Self {
      bank_dir: PathBuf::from("exams/bank"),
      generated_dir: PathBuf::from("exams/generated"),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
  /// Upper bound on questions per subject in one request.
  pub max_questions: usize,
}

impl Default for LimitsConfig {
  fn default() -> Self {
    Self { max_questions: 50 }
  }
}

/// Prompts used by the rewrite provider. Placeholders: `{subject}`, `{question}`,
/// `{option_a}`..`{option_d}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub rewrite_system: String,
  pub rewrite_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      rewrite_system: "You write multiple-choice exam questions for grade-6 students in Taiwan. Respond ONLY with strict JSON.".into(),
      rewrite_user_template: "Subject: {subject}\nOriginal question: {question}\n(A) {option_a}\n(B) {option_b}\n(C) {option_c}\n(D) {option_d}\n\nWrite ONE new question of the same type and difficulty. Change the wording, numbers or context. Give exactly four options with exactly one correct answer. Write in the same language as the original.\nReturn JSON: {\"question\": string, \"options\": [string, string, string, string], \"correct_answer\": \"A\" | \"B\" | \"C\" | \"D\"}. Do not prefix options with (A)-(D).".into(),
    }
  }
}

impl AppConfig {
  pub fn bank_path(&self, subject: crate::domain::Subject) -> PathBuf {
    self.paths.bank_dir.join(subject.bank_file())
  }

  /// Stored document for an exam id (the generated file name without `.md`).
  pub fn exam_path(&self, exam_id: &str) -> PathBuf {
    self.paths.generated_dir.join(format!("{}.md", exam_id))
  }
}

/// Parse a config file. Unlike the env loader this reports errors to the caller.
pub fn load_app_config(path: &Path) -> Result<AppConfig, ExamError> {
  let s = std::fs::read_to_string(path).map_err(|source| ExamError::Io { path: path.to_path_buf(), source })?;
  toml::from_str::<AppConfig>(&s).map_err(|e| ExamError::Config(format!("{}: {}", path.display(), e)))
}

/// Load `AppConfig` from EXAM_CONFIG_PATH. Missing variable or any error yields defaults.
pub fn load_app_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("EXAM_CONFIG_PATH") else {
    return AppConfig::default();
  };
  match load_app_config(Path::new(&path)) {
    Ok(cfg) => {
      info!(target: "mock_exam", %path, "Loaded exam config (TOML)");
      cfg
    }
    Err(e) => {
      error!(target: "mock_exam", %path, error = %e, "Failed to load exam config; using defaults");
      AppConfig::default()
    }
  }
}

/// Settings for the external rewrite service. Built explicitly and handed to the
/// variation engine; nothing here is global.
#[derive(Clone, Debug)]
pub struct RewriteConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout_secs: u64,
  pub temperature: f32,
  pub prompts: Prompts,
}

impl RewriteConfig {
  /// Present only when OPENAI_API_KEY is set (and non-empty).
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|v| v.parse::<u64>().ok())
      .unwrap_or(30);
    Some(Self { api_key, base_url, model, timeout_secs, temperature: 0.8, prompts })
  }
}
