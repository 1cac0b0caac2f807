//! Line classification for the exam document grammar.
//!
//! Every parser in the crate works line by line; this module decides what a
//! single line is. Patterns are compiled once.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::OptionLabel;

static SUBJECT_HEADING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^##\s+[一二三四五六七八九十]、(.+科)").expect("subject heading regex"));

static ANSWER_HEADING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*#{2,}\s+.*答案").expect("answer heading regex"));

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("title regex"));

static QUESTION_START: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*([0-9]+)\.\s+(\S.*)$").expect("question start regex"));

static OPTION_LINE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\s*\(([A-D])\)\s*(\S.*)$").expect("option regex"));

/// One answer-key row. Unanchored so it can scan a whole region as well as a line.
pub(crate) static TABLE_ROW: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\|\s*([0-9]+)\s*\|\s*\(([A-D])\)").expect("table row regex"));

static BREAK_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("break regex"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind<'a> {
  Blank,
  /// Any `#` heading; `subject` is set for `## 一、國語科` style headings.
  SectionHeading { subject: Option<&'a str> },
  QuestionStart { id: u32, text: &'a str },
  OptionLine { label: OptionLabel, text: &'a str },
  TableRow { id: u32, label: OptionLabel },
  Continuation,
}

pub fn classify_line(line: &str) -> LineKind<'_> {
  let trimmed = line.trim();
  if trimmed.is_empty() {
    return LineKind::Blank;
  }

  if trimmed.starts_with('#') {
    let subject = SUBJECT_HEADING
      .captures(line)
      .and_then(|c| c.get(1))
      .map(|m| m.as_str().trim());
    return LineKind::SectionHeading { subject };
  }

  if let Some(caps) = OPTION_LINE.captures(line) {
    let label = caps.get(1).and_then(|m| OptionLabel::parse(m.as_str()));
    if let (Some(label), Some(text)) = (label, caps.get(2)) {
      return LineKind::OptionLine { label, text: text.as_str().trim() };
    }
  }

  if trimmed.starts_with('|') {
    if let Some((id, label)) = table_row(trimmed) {
      return LineKind::TableRow { id, label };
    }
    return LineKind::Continuation;
  }

  if let Some(caps) = QUESTION_START.captures(line) {
    // Ids too large for u32 are not question numbers.
    let id = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
    if let (Some(id), Some(text)) = (id, caps.get(2)) {
      return LineKind::QuestionStart { id, text: text.as_str().trim() };
    }
  }

  LineKind::Continuation
}

/// True for the heading that opens the answer-key region (`## 參考答案`, `### 國語科答案`, ...).
pub fn is_answer_heading(line: &str) -> bool {
  ANSWER_HEADING.is_match(line)
}

/// Text of a top-level `# ` heading line.
pub fn title_of(line: &str) -> Option<&str> {
  TITLE
    .captures(line)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim())
    .filter(|t| !t.is_empty())
}

pub fn table_row(text: &str) -> Option<(u32, OptionLabel)> {
  let caps = TABLE_ROW.captures(text)?;
  let id = caps.get(1)?.as_str().parse::<u32>().ok()?;
  let label = OptionLabel::parse(caps.get(2)?.as_str())?;
  Some((id, label))
}

/// Remove inline `<br>` markers the renderer (and hand-written documents) put at line ends.
pub fn strip_break_markers(text: &str) -> String {
  BREAK_MARKER.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_every_line_kind() {
    assert_eq!(classify_line("   "), LineKind::Blank);
    assert_eq!(
      classify_line("## 二、英語科"),
      LineKind::SectionHeading { subject: Some("英語科") }
    );
    assert_eq!(classify_line("### 題目區"), LineKind::SectionHeading { subject: None });
    assert_eq!(
      classify_line("12. What is 2+2?<br>"),
      LineKind::QuestionStart { id: 12, text: "What is 2+2?<br>" }
    );
    assert_eq!(
      classify_line("   (C) 5"),
      LineKind::OptionLine { label: OptionLabel::C, text: "5" }
    );
    assert_eq!(
      classify_line("| 3 | (D) | 2 | 待補充 |"),
      LineKind::TableRow { id: 3, label: OptionLabel::D }
    );
    assert_eq!(classify_line("| 題號 | 答案 | 配分 | 考點 |"), LineKind::Continuation);
    assert_eq!(classify_line("and the rest of the sentence"), LineKind::Continuation);
  }

  #[test]
  fn decimals_and_letters_outside_a_to_d_are_continuations() {
    assert_eq!(classify_line("3.14 is close to pi"), LineKind::Continuation);
    assert_eq!(classify_line("(E) not an option"), LineKind::Continuation);
    assert_eq!(classify_line("99999999999. overflow"), LineKind::Continuation);
  }

  #[test]
  fn answer_headings_and_titles() {
    assert!(is_answer_heading("## 參考答案"));
    assert!(is_answer_heading("### 數學科答案"));
    assert!(!is_answer_heading("# 答案"));
    assert!(!is_answer_heading("## 一、國語科"));
    assert_eq!(title_of("# 私立國中入學模擬考"), Some("私立國中入學模擬考"));
    assert_eq!(title_of("## 一、國語科"), None);
  }

  #[test]
  fn break_markers_are_stripped() {
    assert_eq!(strip_break_markers("題目內容<br>"), "題目內容");
    assert_eq!(strip_break_markers("a<BR/>b<br />"), "ab");
  }
}
