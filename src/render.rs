//! Document renderer: variants in, exam markdown out.
//!
//! The output uses exactly the grammar `parser` reads back, so a rendered
//! document can be parsed and graded later without any side channel.
//! Question numbers run continuously across sections.

use crate::domain::{OptionLabel, Subject, Variant};
use crate::util::single_line;

const GRADE_LINE: &str = "小六升國一";
const FULL_SCORE: u32 = 100;
const EMPTY_QUESTION: &str = "（題目內容缺漏）";
const EMPTY_OPTION: &str = "（無）";

/// Lines printed above the first section.
#[derive(Clone, Debug)]
pub struct ExamHeader {
  pub title: String,
  /// Value of the `科目` line, e.g. `國語科` or `國語、英語、數學`.
  pub subject_line: String,
  pub duration_minutes: u32,
}

#[derive(Clone, Debug)]
pub struct Section {
  pub subject: Subject,
  pub variants: Vec<Variant>,
}

pub fn render_exam(header: &ExamHeader, sections: &[Section]) -> String {
  let total: usize = sections.iter().map(|s| s.variants.len()).sum();
  let points = points_label(total);
  let mut out: Vec<String> = Vec::new();

  out.push(format!("# {}", single_line(&header.title)));
  out.push(String::new());
  out.push(format!("- 年級：{}", GRADE_LINE));
  out.push(format!("- 科目：{}", header.subject_line));
  out.push(format!("- 測驗時間：{} 分鐘", header.duration_minutes));
  out.push(format!("- 滿分：{} 分", FULL_SCORE));
  out.push(String::new());
  out.push("---".into());
  out.push(String::new());

  let mut next_id = 1usize;
  for section in sections {
    out.push(format!("## {}、{}", section.subject.ordinal(), section.subject.label()));
    out.push(String::new());
    out.push("### 題目區".into());
    out.push(String::new());
    for variant in &section.variants {
      push_question(&mut out, next_id, variant);
      next_id += 1;
    }
    out.push("---".into());
    out.push(String::new());
  }

  out.push("## 參考答案".into());
  out.push(String::new());
  let mut next_id = 1usize;
  for section in sections {
    if sections.len() > 1 {
      out.push(format!("### {}答案", section.subject.label()));
      out.push(String::new());
    }
    out.push("| 題號 | 答案 | 配分 | 考點 |".into());
    out.push("|------|------|------|------|".into());
    for variant in &section.variants {
      out.push(format!(
        "| {} | ({}) | {} | {} |",
        next_id,
        variant.correct_answer,
        points,
        variant.source.note()
      ));
      next_id += 1;
    }
    out.push(String::new());
  }

  out.join("\n")
}

fn push_question(out: &mut Vec<String>, id: usize, variant: &Variant) {
  let text = non_empty(single_line(&variant.text), EMPTY_QUESTION);
  out.push(format!("{}. {}<br>", id, text));
  out.push(String::new());
  for label in OptionLabel::ALL {
    let option = variant
      .options
      .get(label.index())
      .map(|o| single_line(o))
      .unwrap_or_default();
    out.push(format!("   ({}) {}", label, non_empty(option, EMPTY_OPTION)));
  }
  out.push(String::new());
}

fn non_empty(s: String, fallback: &str) -> String {
  if s.is_empty() {
    fallback.to_string()
  } else {
    s
  }
}

/// Per-question points: whole numbers print bare, others to one decimal.
fn points_label(total: usize) -> String {
  if total == 0 {
    return "0".into();
  }
  let pts = (FULL_SCORE as f64 / total as f64 * 10.0).round() / 10.0;
  if pts.fract() == 0.0 {
    format!("{}", pts as u32)
  } else {
    format!("{:.1}", pts)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{VariantSource, MIXED_SUBJECT};
  use crate::parser::DocumentParser;

  fn variant(text: &str, answer: OptionLabel) -> Variant {
    Variant {
      text: text.into(),
      options: vec!["甲".into(), "乙".into(), "丙".into(), "丁".into()],
      correct_answer: answer,
      source: VariantSource::Shuffled,
    }
  }

  fn header(subject_line: &str) -> ExamHeader {
    ExamHeader {
      title: "私立國中入學模擬考 - 測試".into(),
      subject_line: subject_line.into(),
      duration_minutes: 50,
    }
  }

  #[test]
  fn single_section_round_trips_through_the_parser() {
    let answers = [OptionLabel::C, OptionLabel::A, OptionLabel::D];
    let variants: Vec<Variant> = answers
      .iter()
      .enumerate()
      .map(|(i, a)| variant(&format!("第 {} 題\n第二行", i + 1), *a))
      .collect();
    let text = render_exam(&header("數學科"), &[Section { subject: Subject::Math, variants }]);

    let parsed = DocumentParser::new().parse(&text);
    assert_eq!(parsed.dropped_questions, 0);
    assert_eq!(parsed.orphan_answers, 0);
    let doc = parsed.document;
    assert_eq!(doc.title, "私立國中入學模擬考 - 測試");
    assert_eq!(doc.subject, "數學科");
    assert_eq!(doc.total_questions, 3);
    for (q, a) in doc.questions.iter().zip(answers) {
      let labels: Vec<OptionLabel> = q.options.iter().map(|o| o.label).collect();
      assert_eq!(labels, OptionLabel::ALL.to_vec());
      assert_eq!(q.correct_answer, Some(a));
      assert_eq!(q.subject, "數學科");
    }
    assert_eq!(doc.questions[0].text, "第 1 題 第二行");
  }

  #[test]
  fn mixed_sections_number_continuously() {
    let sections = vec![
      Section { subject: Subject::Chinese, variants: vec![variant("一", OptionLabel::A), variant("二", OptionLabel::B)] },
      Section { subject: Subject::English, variants: vec![variant("three", OptionLabel::C)] },
      Section { subject: Subject::Math, variants: vec![variant("四", OptionLabel::D)] },
    ];
    let text = render_exam(&header("國語、英語、數學"), &sections);
    assert!(text.contains("### 國語科答案"));
    assert!(text.contains("### 英語科答案"));
    assert!(text.contains("### 數學科答案"));
    assert!(text.contains("| 4 | (D) | 25 | 選項重排 |"));

    let doc = DocumentParser::new().parse(&text).document;
    assert_eq!(doc.subject, MIXED_SUBJECT);
    let ids: Vec<u32> = doc.questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    let subjects: Vec<&str> = doc.questions.iter().map(|q| q.subject.as_str()).collect();
    assert_eq!(subjects, vec!["國語科", "國語科", "英語科", "數學科"]);
    let answers: Vec<Option<OptionLabel>> = doc.questions.iter().map(|q| q.correct_answer).collect();
    assert_eq!(
      answers,
      vec![Some(OptionLabel::A), Some(OptionLabel::B), Some(OptionLabel::C), Some(OptionLabel::D)]
    );
  }

  #[test]
  fn empty_texts_are_replaced_so_the_document_still_parses() {
    let v = Variant {
      text: "  ".into(),
      options: vec!["x".into(), "".into()],
      correct_answer: OptionLabel::B,
      source: VariantSource::Rewritten,
    };
    let text = render_exam(&header("英語科"), &[Section { subject: Subject::English, variants: vec![v] }]);
    let doc = DocumentParser::new().parse(&text).document;
    assert_eq!(doc.total_questions, 1);
    assert_eq!(doc.questions[0].text, EMPTY_QUESTION);
    assert_eq!(doc.questions[0].options[1].text, EMPTY_OPTION);
    assert_eq!(doc.questions[0].correct_answer, Some(OptionLabel::B));
  }

  #[test]
  fn points_are_spread_over_the_full_score() {
    assert_eq!(points_label(50), "2");
    assert_eq!(points_label(3), "33.3");
    assert_eq!(points_label(0), "0");
  }
}
