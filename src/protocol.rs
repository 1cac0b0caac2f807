//! Public protocol structs for the command line (serde ready).
//! Keep this small and stable so scripts that drive the CLI keep working.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ExamError;
use crate::generate::BankStat;

/// A grading submission. Two shapes are accepted:
///
/// ```json
/// {"1": "B", "2": "a"}
/// [{"question_id": 1, "user_answer": "B"}]
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SubmissionIn {
    Map(HashMap<String, String>),
    List(Vec<AnswerIn>),
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub question_id: u32,
    #[serde(default)]
    pub user_answer: String,
}

impl SubmissionIn {
    /// Parse submission JSON. Map keys must be question numbers.
    pub fn from_json(text: &str) -> Result<HashMap<u32, String>, ExamError> {
        let parsed: SubmissionIn = serde_json::from_str(text)
            .map_err(|e| ExamError::validation(format!("submission is not valid JSON: {}", e)))?;
        parsed.into_answers()
    }

    pub fn into_answers(self) -> Result<HashMap<u32, String>, ExamError> {
        match self {
            SubmissionIn::Map(map) => map
                .into_iter()
                .map(|(k, v)| {
                    k.trim()
                        .parse::<u32>()
                        .map(|id| (id, v))
                        .map_err(|_| ExamError::validation(format!("question id '{}' is not a number", k)))
                })
                .collect(),
            // Later entries win, matching the answer-key merge.
            SubmissionIn::List(list) => Ok(list.into_iter().map(|a| (a.question_id, a.user_answer)).collect()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsOut {
    pub total_entries: usize,
    pub banks: Vec<BankStat>,
}

impl From<Vec<BankStat>> for StatsOut {
    fn from(banks: Vec<BankStat>) -> Self {
        Self { total_entries: banks.iter().map(|b| b.entries).sum(), banks }
    }
}

/// Printed on stdout when a command fails, so callers always get JSON.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub client_error: bool,
}

impl From<&ExamError> for ErrorOut {
    fn from(e: &ExamError) -> Self {
        Self { error: e.to_string(), client_error: e.is_client_error() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_and_list_submissions() {
        let map = SubmissionIn::from_json(r#"{"1": "B", " 2 ": "a"}"#).expect("map");
        assert_eq!(map.get(&1).map(String::as_str), Some("B"));
        assert_eq!(map.get(&2).map(String::as_str), Some("a"));

        let list = SubmissionIn::from_json(r#"[{"question_id": 3, "user_answer": "C"}, {"question_id": 4}]"#)
            .expect("list");
        assert_eq!(list.get(&3).map(String::as_str), Some("C"));
        assert_eq!(list.get(&4).map(String::as_str), Some(""));
    }

    #[test]
    fn bad_submissions_are_client_errors() {
        assert!(SubmissionIn::from_json(r#"{"one": "B"}"#).unwrap_err().is_client_error());
        assert!(SubmissionIn::from_json("not json").unwrap_err().is_client_error());
    }
}
