//! Exam document parser.
//!
//! Flow:
//! 1) Split the text at the first answer heading: questions before, answer key after.
//! 2) Scan the question region line by line with an explicit index so a line
//!    that aborts option collection can be looked at again.
//! 3) Collect `| id | (X) |` rows from the answer region and merge them by id.
//! 4) Label the whole document with a pluggable subject classifier.
//!
//! Structural misses (a question without four options, an answer row with no
//! question) are dropped and counted, never fatal. Reading the file is the only
//! failure that aborts the parse.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::classify::{classify_line, is_answer_heading, strip_break_markers, title_of, LineKind, TABLE_ROW};
use crate::domain::{Document, OptionLabel, Question, QuestionOption, DEFAULT_TITLE, MIXED_SUBJECT};
use crate::error::ExamError;

/// Labels a whole document with a subject. Implementations see the raw text.
pub trait SubjectClassifier {
  fn classify(&self, raw: &str) -> String;
}

/// Looks for subject names in the opening characters of the document.
/// One subject found means that subject; none or several means mixed.
#[derive(Clone, Debug)]
pub struct PrefixSubjectClassifier {
  pub window_chars: usize,
}

impl Default for PrefixSubjectClassifier {
  fn default() -> Self {
    Self { window_chars: 500 }
  }
}

impl SubjectClassifier for PrefixSubjectClassifier {
  fn classify(&self, raw: &str) -> String {
    let window: String = raw.chars().take(self.window_chars).collect();
    let markers: [(&str, &[&str]); 3] = [
      ("國語科", &["國語"]),
      ("英語科", &["英語", "English"]),
      ("數學科", &["數學"]),
    ];
    let found: Vec<&str> = markers
      .iter()
      .filter(|(_, needles)| needles.iter().any(|n| window.contains(n)))
      .map(|(label, _)| *label)
      .collect();
    match found.as_slice() {
      [only] => (*only).to_string(),
      _ => MIXED_SUBJECT.to_string(),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct ParsedDocument {
  pub document: Document,
  /// Question starts that never collected four distinct options.
  pub dropped_questions: usize,
  /// Answer rows whose id matches no parsed question.
  pub orphan_answers: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DocumentParser<C = PrefixSubjectClassifier> {
  classifier: C,
}

impl DocumentParser<PrefixSubjectClassifier> {
  pub fn new() -> Self {
    Self::with_classifier(PrefixSubjectClassifier::default())
  }
}

impl<C: SubjectClassifier> DocumentParser<C> {
  pub fn with_classifier(classifier: C) -> Self {
    Self { classifier }
  }

  #[instrument(level = "debug", skip(self, raw), fields(text_len = raw.len()))]
  pub fn parse(&self, raw: &str) -> ParsedDocument {
    let content = raw.replace("\r\n", "\n");
    let (question_region, answer_region) = split_regions(&content);

    let title = content
      .lines()
      .find_map(title_of)
      .unwrap_or(DEFAULT_TITLE)
      .to_string();

    let scan = scan_questions(question_region);
    let answers = extract_answer_key(answer_region.unwrap_or(""));

    let mut questions = scan.questions;
    for q in questions.iter_mut() {
      q.correct_answer = answers.get(&q.id).copied();
    }
    let known: HashSet<u32> = questions.iter().map(|q| q.id).collect();
    let orphan_answers = answers.keys().filter(|id| !known.contains(id)).count();

    if scan.dropped > 0 || orphan_answers > 0 {
      warn!(target: "exam", dropped_questions = scan.dropped, orphan_answers, "Document parsed with structural misses");
    }

    let subject = self.classifier.classify(&content);
    ParsedDocument {
      document: Document::new(title, subject, questions),
      dropped_questions: scan.dropped,
      orphan_answers,
    }
  }
}

/// Read and parse a document file. Unreadable or non-UTF-8 files fail as a whole.
#[instrument(level = "info", skip(parser, path), fields(path = %path.display()))]
pub fn parse_exam_file<C: SubjectClassifier>(
  parser: &DocumentParser<C>,
  path: &Path,
) -> Result<ParsedDocument, ExamError> {
  let bytes = std::fs::read(path).map_err(|source| ExamError::Io { path: path.to_path_buf(), source })?;
  let text = String::from_utf8(bytes).map_err(|_| ExamError::Decode { path: path.to_path_buf() })?;
  let parsed = parser.parse(&text);
  info!(
    target: "exam",
    title = %parsed.document.title,
    subject = %parsed.document.subject,
    total = parsed.document.total_questions,
    "Exam document parsed"
  );
  Ok(parsed)
}

fn split_regions(content: &str) -> (&str, Option<&str>) {
  let mut offset = 0usize;
  for line in content.split_inclusive('\n') {
    if is_answer_heading(line) {
      let after = offset + line.len();
      return (&content[..offset], Some(&content[after..]));
    }
    offset += line.len();
  }
  (content, None)
}

/// Later rows overwrite earlier ones for the same id.
fn extract_answer_key(region: &str) -> BTreeMap<u32, OptionLabel> {
  let mut answers = BTreeMap::new();
  for caps in TABLE_ROW.captures_iter(region) {
    let id = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
    let label = caps.get(2).and_then(|m| OptionLabel::parse(m.as_str()));
    if let (Some(id), Some(label)) = (id, label) {
      answers.insert(id, label);
    }
  }
  answers
}

struct ScanResult {
  questions: Vec<Question>,
  dropped: usize,
}

struct PendingQuestion {
  id: u32,
  subject: String,
  text: String,
  options: Vec<QuestionOption>,
}

impl PendingQuestion {
  fn has_all_options(&self) -> bool {
    self.options.len() >= 4
  }

  fn finish(self) -> Option<Question> {
    let labels: HashSet<OptionLabel> = self.options.iter().map(|o| o.label).collect();
    if self.options.len() != 4 || labels.len() != 4 {
      return None;
    }
    Some(Question {
      id: self.id,
      subject: self.subject,
      text: self.text,
      options: self.options,
      correct_answer: None,
    })
  }
}

fn scan_questions(region: &str) -> ScanResult {
  let lines: Vec<&str> = region.split('\n').collect();
  let mut questions = Vec::new();
  let mut dropped = 0usize;
  let mut current_subject = MIXED_SUBJECT.to_string();
  let mut i = 0usize;

  // SEEKING_QUESTION
  while i < lines.len() {
    let (id, text) = match classify_line(lines[i]) {
      LineKind::SectionHeading { subject: Some(label) } => {
        current_subject = label.to_string();
        i += 1;
        continue;
      }
      LineKind::QuestionStart { id, text } => (id, text),
      _ => {
        i += 1;
        continue;
      }
    };

    let mut pending = PendingQuestion {
      id,
      subject: current_subject.clone(),
      text: strip_break_markers(text),
      options: Vec::with_capacity(4),
    };
    i += 1;

    // COLLECTING_OPTIONS; `break` without advancing leaves the line for SEEKING_QUESTION.
    while i < lines.len() {
      let line = lines[i];
      match classify_line(line) {
        LineKind::Blank => {
          i += 1;
          if pending.has_all_options() {
            break;
          }
        }
        LineKind::OptionLine { label, text } => {
          pending.options.push(QuestionOption { label, text: text.to_string() });
          i += 1;
          if pending.has_all_options() {
            break;
          }
        }
        LineKind::SectionHeading { .. } | LineKind::QuestionStart { .. } => break,
        LineKind::TableRow { .. } | LineKind::Continuation => {
          if pending.options.is_empty() {
            let extra = strip_break_markers(line);
            if !extra.is_empty() {
              if !pending.text.is_empty() {
                pending.text.push(' ');
              }
              pending.text.push_str(&extra);
            }
          }
          i += 1;
        }
      }
    }

    match pending.finish() {
      Some(q) => questions.push(q),
      None => dropped += 1,
    }
  }

  ScanResult { questions, dropped }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(text: &str) -> ParsedDocument {
    DocumentParser::new().parse(text)
  }

  #[test]
  fn single_question_with_answer_table() {
    let text = "1. What is 2+2?\n(A) 3\n(B) 4\n(C) 5\n(D) 6\n\n## 參考答案\n\n| 1 | (B) |";
    let parsed = parse(text);
    let doc = &parsed.document;
    assert_eq!(doc.total_questions, 1);
    assert_eq!(doc.title, DEFAULT_TITLE);
    let q = &doc.questions[0];
    assert_eq!(q.id, 1);
    assert_eq!(q.text, "What is 2+2?");
    assert_eq!(q.options.len(), 4);
    assert_eq!(q.options[1].text, "4");
    assert_eq!(q.correct_answer, Some(OptionLabel::B));
  }

  #[test]
  fn question_without_options_does_not_swallow_the_next_one() {
    let text = "1. Broken question\n(A) only one\n(B) two\n2. Good question\n(A) a\n(B) b\n(C) c\n(D) d\n";
    let parsed = parse(text);
    assert_eq!(parsed.dropped_questions, 1);
    assert_eq!(parsed.document.questions.len(), 1);
    assert_eq!(parsed.document.questions[0].id, 2);
    assert_eq!(parsed.document.questions[0].text, "Good question");
  }

  #[test]
  fn continuation_lines_and_indentation_are_absorbed() {
    let text = "# 模擬考\n\n## 三、數學科\n\n### 題目區\n\n5. 小明有 3 顆蘋果，<br>\n又買了 2 顆，共有幾顆？\n\n   (A) 4\n   (B) 5\n   (C) 6\n   (D) 7\n";
    let doc = parse(text).document;
    assert_eq!(doc.title, "模擬考");
    assert_eq!(doc.questions.len(), 1);
    let q = &doc.questions[0];
    assert_eq!(q.id, 5);
    assert_eq!(q.subject, "數學科");
    assert_eq!(q.text, "小明有 3 顆蘋果， 又買了 2 顆，共有幾顆？");
    assert_eq!(q.options[3].text, "7");
    assert_eq!(q.correct_answer, None);
  }

  #[test]
  fn duplicate_labels_are_dropped() {
    let text = "1. Q\n(A) a\n(A) again\n(B) b\n(C) c\n";
    let parsed = parse(text);
    assert!(parsed.document.questions.is_empty());
    assert_eq!(parsed.dropped_questions, 1);
  }

  #[test]
  fn heading_aborts_collection() {
    let text = "1. Q\n(A) a\n(B) b\n## 二、英語科\n2. Next\n(A) a\n(B) b\n(C) c\n(D) d\n";
    let doc = parse(text).document;
    assert_eq!(doc.questions.len(), 1);
    assert_eq!(doc.questions[0].subject, "英語科");
  }

  #[test]
  fn answer_tables_merge_with_last_write_wins() {
    let text = "1. Q1\n(A) a\n(B) b\n(C) c\n(D) d\n\n2. Q2\n(A) a\n(B) b\n(C) c\n(D) d\n\n## 參考答案\n\n### 國語科答案\n\n| 題號 | 答案 | 配分 | 考點 |\n|------|------|------|------|\n| 1 | (A) | 2 | x |\n| 2 | (C) | 2 | y |\n\n### 英語科答案\n\n| 2 | (D) | 2 | z |\n| 9 | (B) | 2 | z |\n";
    let parsed = parse(text);
    let doc = &parsed.document;
    assert_eq!(doc.questions[0].correct_answer, Some(OptionLabel::A));
    assert_eq!(doc.questions[1].correct_answer, Some(OptionLabel::D));
    assert_eq!(parsed.orphan_answers, 1);
  }

  #[test]
  fn answer_region_is_not_scanned_for_questions() {
    let text = "## 參考答案\n1. Not a question\n(A) a\n(B) b\n(C) c\n(D) d\n";
    assert!(parse(text).document.questions.is_empty());
  }

  #[test]
  fn subject_detection_uses_the_opening_window() {
    let c = PrefixSubjectClassifier::default();
    assert_eq!(c.classify("# 考卷\n- 科目：國語科"), "國語科");
    assert_eq!(c.classify("- 科目：國語、英語、數學"), MIXED_SUBJECT);
    assert_eq!(c.classify("English reading test"), "英語科");
    assert_eq!(c.classify("數學 and English"), MIXED_SUBJECT);
    assert_eq!(c.classify("no markers here"), MIXED_SUBJECT);

    let late = format!("{}數學", "字".repeat(600));
    assert_eq!(c.classify(&late), MIXED_SUBJECT);
  }

  #[test]
  fn custom_classifier_is_used() {
    struct Fixed;
    impl SubjectClassifier for Fixed {
      fn classify(&self, _raw: &str) -> String {
        "自訂".into()
      }
    }
    let doc = DocumentParser::with_classifier(Fixed).parse("國語").document;
    assert_eq!(doc.subject, "自訂");
  }

  #[test]
  fn unreadable_and_undecodable_files_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.md");
    let err = parse_exam_file(&DocumentParser::new(), &missing).unwrap_err();
    assert!(matches!(err, ExamError::Io { .. }));

    let bad = dir.path().join("bad.md");
    std::fs::write(&bad, [0xff, 0xfe, 0x00]).expect("write");
    let err = parse_exam_file(&DocumentParser::new(), &bad).unwrap_err();
    assert!(matches!(err, ExamError::Decode { .. }));
  }
}
