//! Mock Exam Backend
//!
//! - Builds mock exam documents from per-subject question banks
//! - Optional OpenAI rewriting of sampled questions (via environment variables),
//!   with a local option shuffle as fallback
//! - Parses stored exam documents back for quizzes and grading
//!
//! Every command prints JSON on stdout; logs go to stderr.
//!
//! Important env variables:
//!   OPENAI_API_KEY       : enables question rewriting if present
//!   OPENAI_BASE_URL      : default "https://api.openai.com/v1"
//!   OPENAI_MODEL         : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS  : default 30
//!   EXAM_CONFIG_PATH     : path to TOML config (paths, limits, prompts)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod classify;
mod bank;
mod parser;
mod sampler;
mod seeds;
mod openai;
mod variation;
mod render;
mod grade;
mod generate;
mod protocol;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use crate::config::{load_app_config_from_env, AppConfig, RewriteConfig};
use crate::error::ExamError;
use crate::generate::{bank_stats, parse_subject, ExamGenerator, MixedExamRequest, SingleExamRequest};
use crate::parser::{parse_exam_file, DocumentParser};
use crate::protocol::{ErrorOut, StatsOut, SubmissionIn};
use crate::variation::VariationEngine;

#[derive(Parser, Debug)]
#[command(name = "mock-exam", version, about = "Generate, parse and grade mock exam documents")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Generate a single-subject exam
  Generate(GenerateArgs),

  /// Generate a mixed exam (國語, 英語, 數學 sections in that order)
  GenerateMixed(MixedArgs),

  /// Parse an exam document, answers included
  Parse(DocArgs),

  /// Show an exam document without answers
  Quiz(DocArgs),

  /// Grade a submission against an exam document
  Grade(GradeArgs),

  /// Count usable entries in every subject bank
  Stats,
}

#[derive(Args, Debug)]
struct GenerateArgs {
  /// Subject key: chinese, english or math
  #[arg(long)]
  subject: String,

  /// Number of questions
  #[arg(long, short = 'n', default_value_t = 10)]
  num_questions: usize,
}

#[derive(Args, Debug)]
struct MixedArgs {
  #[arg(long, default_value_t = 0)]
  chinese: usize,
  #[arg(long, default_value_t = 0)]
  english: usize,
  #[arg(long, default_value_t = 0)]
  math: usize,
}

#[derive(Args, Debug)]
struct DocArgs {
  /// Exam document path, or an exam id from `generate` (looked up in the generated directory)
  document: String,
}

#[derive(Args, Debug)]
struct GradeArgs {
  /// Exam document path, or an exam id from `generate`
  document: String,

  /// Submission JSON inline: {"1":"B"} or [{"question_id":1,"user_answer":"B"}]
  #[arg(long, conflicts_with = "answers_file")]
  answers: Option<String>,

  /// Submission JSON read from a file
  #[arg(long)]
  answers_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  telemetry::init_tracing();
  let cli = Cli::parse();

  // Config and provider are built once and passed down explicitly.
  let config = load_app_config_from_env();
  let engine = VariationEngine::from_config(RewriteConfig::from_env(config.prompts.clone()));
  let generator = ExamGenerator::new(config, engine);

  let result = match cli.command {
    Command::Generate(args) => match parse_subject(&args.subject) {
      Ok(subject) => {
        let req = SingleExamRequest { subject, num_questions: args.num_questions };
        generator.generate_single(&req).await.map(to_json)
      }
      Err(e) => Err(e),
    },
    Command::GenerateMixed(args) => {
      let req = MixedExamRequest { chinese_count: args.chinese, english_count: args.english, math_count: args.math };
      generator.generate_mixed(&req).await.map(to_json)
    }
    Command::Parse(args) => {
      let path = resolve_document(generator.config(), &args.document);
      parse_exam_file(&DocumentParser::new(), &path).map(to_json)
    }
    Command::Quiz(args) => {
      let path = resolve_document(generator.config(), &args.document);
      parse_exam_file(&DocumentParser::new(), &path).map(|p| to_json(p.document.quiz_view()))
    }
    Command::Grade(args) => grade_command(generator.config(), &args).await.map(to_json),
    Command::Stats => Ok(to_json(StatsOut::from(bank_stats(generator.config()).await))),
  };

  match result {
    Ok(value) => {
      println!("{}", serde_json::to_string_pretty(&value).context("serializing command output")?);
      Ok(ExitCode::SUCCESS)
    }
    Err(e) => {
      error!(target: "mock_exam", error = %e, "Command failed");
      let out = ErrorOut::from(&e);
      println!("{}", serde_json::to_string_pretty(&out).context("serializing error output")?);
      Ok(ExitCode::from(if out.client_error { 2 } else { 1 }))
    }
  }
}

async fn grade_command(config: &AppConfig, args: &GradeArgs) -> Result<grade::GradeReport, ExamError> {
  let submission = match (&args.answers, &args.answers_file) {
    (Some(inline), _) => inline.clone(),
    (None, Some(path)) => read_submission(path).await?,
    (None, None) => return Err(ExamError::validation("provide --answers or --answers-file")),
  };
  let answers = SubmissionIn::from_json(&submission)?;

  let path = resolve_document(config, &args.document);
  let parsed = parse_exam_file(&DocumentParser::new(), &path)?;
  let report = grade::grade(&parsed.document, &answers);
  info!(target: "mock_exam", path = %path.display(), score = report.score, "Graded submission");
  Ok(report)
}

/// An existing file wins; anything else is treated as an exam id.
fn resolve_document(config: &AppConfig, document: &str) -> PathBuf {
  let path = PathBuf::from(document);
  if path.is_file() {
    path
  } else {
    config.exam_path(document)
  }
}

async fn read_submission(path: &Path) -> Result<String, ExamError> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|source| ExamError::Io { path: path.to_path_buf(), source })
}

/// Every output type derives Serialize; a failure here is a bug, not user input.
fn to_json<T: Serialize>(value: T) -> serde_json::Value {
  serde_json::to_value(value).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}
