//! Domain models used by the pipeline: subjects, option labels, questions,
//! bank entries, parsed documents and generated variants.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Section label used when no subject heading applies (or several subjects are mixed).
pub const MIXED_SUBJECT: &str = "綜合科";

/// Title used when a document carries no top-level `# ` heading.
pub const DEFAULT_TITLE: &str = "模擬考試";

/// One of the four answer letters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
  A,
  B,
  C,
  D,
}

impl OptionLabel {
  pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }

  pub fn index(self) -> usize {
    match self {
      OptionLabel::A => 0,
      OptionLabel::B => 1,
      OptionLabel::C => 2,
      OptionLabel::D => 3,
    }
  }

  pub fn as_char(self) -> char {
    match self {
      OptionLabel::A => 'A',
      OptionLabel::B => 'B',
      OptionLabel::C => 'C',
      OptionLabel::D => 'D',
    }
  }

  /// Lenient parse used for submissions and model output: trims, ignores case,
  /// and accepts a parenthesized form such as `(b)`.
  pub fn parse(s: &str) -> Option<Self> {
    let s = s
      .trim()
      .trim_start_matches(&['(', '（'][..])
      .trim_end_matches(&[')', '）'][..])
      .trim();
    let mut chars = s.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
      return None;
    }
    match ch.to_ascii_uppercase() {
      'A' => Some(OptionLabel::A),
      'B' => Some(OptionLabel::B),
      'C' => Some(OptionLabel::C),
      'D' => Some(OptionLabel::D),
      _ => None,
    }
  }
}

impl fmt::Display for OptionLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_char())
  }
}

/// Subjects that own a question bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
  Chinese,
  English,
  Math,
}

impl Subject {
  /// Fixed order used by mixed documents.
  pub const ALL: [Subject; 3] = [Subject::Chinese, Subject::English, Subject::Math];

  pub fn key(self) -> &'static str {
    match self {
      Subject::Chinese => "chinese",
      Subject::English => "english",
      Subject::Math => "math",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    let key = key.trim().to_ascii_lowercase();
    Self::ALL.into_iter().find(|s| s.key() == key)
  }

  /// Section label as it appears in headings (`國語科`, ...).
  pub fn label(self) -> &'static str {
    match self {
      Subject::Chinese => "國語科",
      Subject::English => "英語科",
      Subject::Math => "數學科",
    }
  }

  /// Short name used in mixed-document header lines.
  pub fn short_name(self) -> &'static str {
    match self {
      Subject::Chinese => "國語",
      Subject::English => "英語",
      Subject::Math => "數學",
    }
  }

  /// CJK ordinal of the subject's section heading.
  pub fn ordinal(self) -> &'static str {
    match self {
      Subject::Chinese => "一",
      Subject::English => "二",
      Subject::Math => "三",
    }
  }

  pub fn bank_file(self) -> &'static str {
    match self {
      Subject::Chinese => "chinese-gr6-bank.md",
      Subject::English => "english-gr6-bank.md",
      Subject::Math => "math-gr6-bank.md",
    }
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
  pub label: OptionLabel,
  pub text: String,
}

/// A complete question recovered from a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub id: u32,
  pub subject: String,
  #[serde(rename = "question")]
  pub text: String,
  pub options: Vec<QuestionOption>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<OptionLabel>,
}

/// Raw bank source: no id, no answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankEntry {
  pub question_text: String,
  pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub title: String,
  pub subject: String,
  pub questions: Vec<Question>,
  pub total_questions: usize,
}

impl Document {
  pub fn new(title: String, subject: String, questions: Vec<Question>) -> Self {
    let total_questions = questions.len();
    Self { title, subject, questions, total_questions }
  }

  /// The document as a test-taker sees it: every answer removed.
  pub fn quiz_view(&self) -> Document {
    let questions = self
      .questions
      .iter()
      .cloned()
      .map(|mut q| {
        q.correct_answer = None;
        q
      })
      .collect();
    Document::new(self.title.clone(), self.subject.clone(), questions)
  }
}

/// How a variant was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantSource {
  Rewritten,
  Shuffled,
  Placeholder,
}

impl VariantSource {
  /// Note written into the answer table's last column.
  pub fn note(self) -> &'static str {
    match self {
      VariantSource::Rewritten => "AI 改寫",
      VariantSource::Shuffled => "選項重排",
      VariantSource::Placeholder => "待補充",
    }
  }
}

/// A generated question ready for rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
  pub text: String,
  pub options: Vec<String>,
  pub correct_answer: OptionLabel,
  pub source: VariantSource,
}
