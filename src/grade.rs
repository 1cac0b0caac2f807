//! Grading a submission against a parsed document's answer key.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::domain::{Document, OptionLabel};

#[derive(Clone, Debug, Serialize)]
pub struct AnswerDetail {
  pub question_id: u32,
  pub question: String,
  /// As submitted; empty when the question was skipped.
  pub user_answer: String,
  pub correct_answer: Option<OptionLabel>,
  pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GradeReport {
  pub title: String,
  pub subject: String,
  pub total_questions: usize,
  pub correct_count: usize,
  /// Integer percentage in 0..=100.
  pub score: u32,
  pub answers: Vec<AnswerDetail>,
}

/// Missing submissions are wrong answers, never "ungraded". A question with no
/// key cannot be answered correctly.
pub fn grade(document: &Document, submitted: &HashMap<u32, String>) -> GradeReport {
  let answers: Vec<AnswerDetail> = document
    .questions
    .iter()
    .map(|q| {
      let user_answer = submitted.get(&q.id).map(|s| s.trim().to_string()).unwrap_or_default();
      let is_correct = match (OptionLabel::parse(&user_answer), q.correct_answer) {
        (Some(given), Some(expected)) => given == expected,
        _ => false,
      };
      AnswerDetail {
        question_id: q.id,
        question: q.text.clone(),
        user_answer,
        correct_answer: q.correct_answer,
        is_correct,
      }
    })
    .collect();

  let total_questions = document.total_questions;
  let correct_count = answers.iter().filter(|a| a.is_correct).count();
  let score = score_percent(correct_count, total_questions);
  info!(target: "exam", total = total_questions, correct = correct_count, score, "Submission graded");

  GradeReport {
    title: document.title.clone(),
    subject: document.subject.clone(),
    total_questions,
    correct_count,
    score,
    answers,
  }
}

fn score_percent(correct: usize, total: usize) -> u32 {
  if total == 0 {
    return 0;
  }
  let pct = (correct.min(total) as f64 / total as f64 * 100.0).round();
  pct.clamp(0.0, 100.0) as u32
}
