//! Question bank parsing.
//!
//! A bank is one document per subject:
//!
//! ```text
//! # 國語科題庫
//! ---
//! ### 1.
//! 題目內容
//!
//! (A)選項一
//! (B)選項二
//! (C)選項三
//! (D)選項四
//! ```
//!
//! Every `### <n>.` heading opens a block; text before the first heading is
//! preamble. Blocks without four in-order option lines are skipped and counted.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::BankEntry;

static BLOCK_HEADING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^[ \t]*###[ \t]*[0-9]+\.").expect("bank heading regex"));

// A, B, C, D on their own lines, in order, separated only by whitespace.
static OPTION_GROUP: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"(?m)^[ \t]*\(A\)[ \t]*(.*)$\s*^[ \t]*\(B\)[ \t]*(.*)$\s*^[ \t]*\(C\)[ \t]*(.*)$\s*^[ \t]*\(D\)[ \t]*(.*)$",
  )
  .expect("bank option regex")
});

#[derive(Clone, Debug, Default, Serialize)]
pub struct BankParse {
  pub entries: Vec<BankEntry>,
  /// Non-empty blocks that did not yield an entry.
  pub dropped_blocks: usize,
}

#[instrument(level = "debug", skip(text), fields(text_len = text.len()))]
pub fn parse_bank(text: &str) -> BankParse {
  let text = text.replace("\r\n", "\n");
  let mut out = BankParse::default();

  for block in BLOCK_HEADING.split(&text).skip(1) {
    let block = block.trim();
    if block.is_empty() {
      continue;
    }
    match parse_block(block) {
      Some(entry) => out.entries.push(entry),
      None => {
        out.dropped_blocks += 1;
        debug!(target: "bank", preview = %crate::util::trunc_for_log(block, 40), "Skipping bank block without four options");
      }
    }
  }

  if out.dropped_blocks > 0 {
    warn!(target: "bank", entries = out.entries.len(), dropped = out.dropped_blocks, "Bank blocks dropped during parse");
  }
  out
}

fn parse_block(block: &str) -> Option<BankEntry> {
  let caps = OPTION_GROUP.captures(block)?;
  let whole = caps.get(0)?;
  let question_text = block[..whole.start()].trim().to_string();
  let options = (1..=4)
    .map(|i| caps.get(i).map(|m| m.as_str().trim().to_string()))
    .collect::<Option<Vec<_>>>()?;
  Some(BankEntry { question_text, options })
}

#[cfg(test)]
mod tests {
  use super::*;

  const BANK: &str = "# 數學科題庫\n\n本題庫彙整自用戶提供。\n\n---\n\n### 1.\n1+1=?\n\n(A)2\n(B)3\n(C)4\n(D)5\n\n### 2.\n下列何者為質數？\n第二行說明\n\n(A) 9\n(B) 15\n(C) 7\n(D) 21\n";

  #[test]
  fn parses_blocks_and_discards_preamble() {
    let parsed = parse_bank(BANK);
    assert_eq!(parsed.entries.len(), 2);
    assert_eq!(parsed.dropped_blocks, 0);
    assert_eq!(parsed.entries[0].question_text, "1+1=?");
    assert_eq!(parsed.entries[0].options, vec!["2", "3", "4", "5"]);
    assert_eq!(parsed.entries[1].question_text, "下列何者為質數？\n第二行說明");
    assert_eq!(parsed.entries[1].options[2], "7");
  }

  #[test]
  fn blocks_with_missing_or_out_of_order_options_are_dropped() {
    let text = "### 1.\nQ1\n(A) a\n(B) b\n(C) c\n\n### 2.\nQ2\n(A) a\n(C) c\n(B) b\n(D) d\n\n### 3.\nQ3\n(A) a\n(B) b\n(C) c\n(D) d\n";
    let parsed = parse_bank(text);
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.entries[0].question_text, "Q3");
    assert_eq!(parsed.dropped_blocks, 2);
  }

  #[test]
  fn options_split_by_a_heading_do_not_form_a_group() {
    let text = "### 1.\nQ\n(A) a\n(B) b\n#### 註\n(C) c\n(D) d\n";
    assert_eq!(parse_bank(text).entries.len(), 0);
  }

  #[test]
  fn crlf_and_empty_blocks_are_tolerated() {
    let text = "preamble\r\n### 1.\r\n\r\n### 2.\r\nQ\r\n(A) a\r\n(B) b\r\n(C) c\r\n(D) d\r\n";
    let parsed = parse_bank(text);
    assert_eq!(parsed.entries.len(), 1);
    assert_eq!(parsed.dropped_blocks, 0);
    assert_eq!(parsed.entries[0].options[3], "d");
    assert_eq!(parse_bank(text).entries.len(), 1);
  }
}
