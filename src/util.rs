//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings. Cuts on a char boundary.
pub fn trunc_for_log(s: &str, max_chars: usize) -> String {
  let total = s.chars().count();
  if total <= max_chars {
    s.to_string()
  } else {
    let head: String = s.chars().take(max_chars).collect();
    format!("{}… ({} chars total)", head, total)
  }
}

/// Collapse a possibly multi-line value onto one line.
/// Document lines are the unit of the grammar, so rendered values must not wrap.
pub fn single_line(s: &str) -> String {
  s.lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_every_key() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn truncation_respects_cjk_boundaries() {
    let s = "國語英語數學";
    assert_eq!(trunc_for_log(s, 10), s);
    assert!(trunc_for_log(s, 2).starts_with("國語…"));
  }

  #[test]
  fn single_line_joins_wrapped_text() {
    assert_eq!(single_line("  first\n\n  second  \r\nthird"), "first second third");
    assert_eq!(single_line(""), "");
  }
}
