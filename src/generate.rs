//! Exam generation: bank → sample → vary → render → write.
//!
//! This module owns:
//!   - request validation (before any file is touched)
//!   - per-subject section assembly, with placeholders for empty banks
//!   - whole-file writes into the generated directory (temp file + rename)
//!   - bank statistics
//!
//! Rewrites run one question at a time; a failed rewrite only downgrades that
//! question to the local shuffle.

use std::path::{Path, PathBuf};

use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::bank::{parse_bank, BankParse};
use crate::config::AppConfig;
use crate::domain::{Subject, Variant, VariantSource};
use crate::error::ExamError;
use crate::render::{render_exam, ExamHeader, Section};
use crate::sampler::sample;
use crate::seeds::placeholder_variant;
use crate::variation::{RewriteProvider, VariationEngine};

const TITLE_PREFIX: &str = "私立國中入學模擬考";
const SINGLE_DURATION_MINUTES: u32 = 50;
const MIXED_DURATION_MINUTES: u32 = 80;

#[derive(Clone, Debug, Deserialize)]
pub struct SingleExamRequest {
    pub subject: Subject,
    pub num_questions: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MixedExamRequest {
    pub chinese_count: usize,
    pub english_count: usize,
    pub math_count: usize,
}

impl MixedExamRequest {
    fn counts(&self) -> [(Subject, usize); 3] {
        [
            (Subject::Chinese, self.chinese_count),
            (Subject::English, self.english_count),
            (Subject::Math, self.math_count),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VariantCounts {
    pub rewritten: usize,
    pub shuffled: usize,
    pub placeholder: usize,
}

impl VariantCounts {
    fn add(&mut self, source: VariantSource) {
        match source {
            VariantSource::Rewritten => self.rewritten += 1,
            VariantSource::Shuffled => self.shuffled += 1,
            VariantSource::Placeholder => self.placeholder += 1,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GeneratedExam {
    pub exam_id: String,
    pub filename: String,
    pub path: PathBuf,
    pub total_questions: usize,
    /// RFC 3339, local time.
    pub created_at: String,
    pub variant_counts: VariantCounts,
}

#[derive(Clone, Debug, Serialize)]
pub struct BankStat {
    pub subject: Subject,
    pub label: &'static str,
    pub path: PathBuf,
    pub entries: usize,
    pub dropped_blocks: usize,
}

/// Map an API key (`chinese`, `english`, `math`) to a subject.
pub fn parse_subject(key: &str) -> Result<Subject, ExamError> {
    Subject::from_key(key).ok_or_else(|| ExamError::validation(format!("unsupported subject '{}'", key)))
}

pub struct ExamGenerator<P> {
    config: AppConfig,
    engine: VariationEngine<P>,
}

impl<P: RewriteProvider> ExamGenerator<P> {
    pub fn new(config: AppConfig, engine: VariationEngine<P>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[instrument(level = "info", skip(self), fields(subject = %req.subject, n = req.num_questions))]
    pub async fn generate_single(&self, req: &SingleExamRequest) -> Result<GeneratedExam, ExamError> {
        self.check_count(req.subject, req.num_questions)?;
        if req.num_questions == 0 {
            return Err(ExamError::validation("num_questions must be at least 1"));
        }

        let mut rng = StdRng::from_entropy();
        let section = self.build_section(req.subject, req.num_questions, &mut rng).await?;
        let header = ExamHeader {
            title: format!("{} - {}", TITLE_PREFIX, req.subject.label()),
            subject_line: req.subject.label().to_string(),
            duration_minutes: SINGLE_DURATION_MINUTES,
        };
        let filename = format!("exam-{}-{}-{}.md", req.subject.key(), timestamp(), short_id());
        self.finish(&header, vec![section], filename).await
    }

    #[instrument(level = "info", skip(self), fields(chinese = req.chinese_count, english = req.english_count, math = req.math_count))]
    pub async fn generate_mixed(&self, req: &MixedExamRequest) -> Result<GeneratedExam, ExamError> {
        for (subject, n) in req.counts() {
            self.check_count(subject, n)?;
        }
        if req.counts().iter().map(|(_, n)| n).sum::<usize>() == 0 {
            return Err(ExamError::validation("total question count must be at least 1"));
        }

        let mut rng = StdRng::from_entropy();
        let mut sections = Vec::new();
        for (subject, n) in req.counts() {
            if n == 0 {
                continue;
            }
            sections.push(self.build_section(subject, n, &mut rng).await?);
        }

        let subject_line = sections
            .iter()
            .map(|s| s.subject.short_name())
            .collect::<Vec<_>>()
            .join("、");
        let header = ExamHeader {
            title: format!("{} - 綜合版", TITLE_PREFIX),
            subject_line,
            duration_minutes: MIXED_DURATION_MINUTES,
        };
        let filename = format!("mock-exam-{}-{}-comprehensive.md", timestamp(), short_id());
        self.finish(&header, sections, filename).await
    }

    fn check_count(&self, subject: Subject, n: usize) -> Result<(), ExamError> {
        let max = self.config.limits.max_questions;
        if n > max {
            return Err(ExamError::validation(format!(
                "{} question count {} exceeds the limit of {}",
                subject.label(),
                n,
                max
            )));
        }
        Ok(())
    }

    async fn build_section(&self, subject: Subject, n: usize, rng: &mut StdRng) -> Result<Section, ExamError> {
        let bank = read_bank(&self.config.bank_path(subject)).await?;
        if bank.entries.is_empty() {
            warn!(target: "exam", %subject, n, "Bank has no usable entries; using placeholder questions");
            let variants = (0..n).map(|_| placeholder_variant(subject)).collect();
            return Ok(Section { subject, variants });
        }

        let picked = sample(&bank.entries, n, rng);
        let mut variants: Vec<Variant> = Vec::with_capacity(n);
        for entry in picked {
            variants.push(self.engine.vary(subject, entry, rng).await);
        }
        info!(target: "exam", %subject, bank_size = bank.entries.len(), picked = variants.len(), "Section assembled");
        Ok(Section { subject, variants })
    }

    async fn finish(&self, header: &ExamHeader, sections: Vec<Section>, filename: String) -> Result<GeneratedExam, ExamError> {
        let mut variant_counts = VariantCounts::default();
        for v in sections.iter().flat_map(|s| s.variants.iter()) {
            variant_counts.add(v.source);
        }
        let total_questions: usize = sections.iter().map(|s| s.variants.len()).sum();

        let text = render_exam(header, &sections);
        let path = write_atomic(&self.config.paths.generated_dir, &filename, &text).await?;
        info!(
            target: "exam",
            %filename,
            total_questions,
            rewritten = variant_counts.rewritten,
            shuffled = variant_counts.shuffled,
            placeholder = variant_counts.placeholder,
            "Exam written"
        );

        // The id is the file stem, so `config.exam_path(id)` finds the document again.
        let exam_id = filename.trim_end_matches(".md").to_string();
        Ok(GeneratedExam {
            exam_id,
            filename,
            path,
            total_questions,
            created_at: Local::now().to_rfc3339(),
            variant_counts,
        })
    }
}

/// Entry counts for every subject's bank. A missing or unreadable bank counts as empty.
#[instrument(level = "info", skip(config))]
pub async fn bank_stats(config: &AppConfig) -> Vec<BankStat> {
    let mut out = Vec::with_capacity(Subject::ALL.len());
    for subject in Subject::ALL {
        let path = config.bank_path(subject);
        let parsed = match read_bank(&path).await {
            Ok(p) => p,
            Err(e) => {
                warn!(target: "bank", %subject, error = %e, "Bank unavailable; counting as empty");
                BankParse::default()
            }
        };
        out.push(BankStat {
            subject,
            label: subject.label(),
            path,
            entries: parsed.entries.len(),
            dropped_blocks: parsed.dropped_blocks,
        });
    }
    out
}

async fn read_bank(path: &Path) -> Result<BankParse, ExamError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExamError::Io { path: path.to_path_buf(), source })?;
    let text = String::from_utf8(bytes).map_err(|_| ExamError::Decode { path: path.to_path_buf() })?;
    Ok(parse_bank(&text))
}

/// Write the whole document to a hidden sibling, then rename it into place, so
/// a reader never sees a half-written exam.
async fn write_atomic(dir: &Path, filename: &str, text: &str) -> Result<PathBuf, ExamError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExamError::Write { path: dir.to_path_buf(), source })?;
    let final_path = dir.join(filename);
    let tmp_path = dir.join(format!(".{}.tmp", filename));
    tokio::fs::write(&tmp_path, text)
        .await
        .map_err(|source| ExamError::Write { path: tmp_path.clone(), source })?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ExamError::Write { path: final_path, source: e });
    }
    Ok(final_path)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
