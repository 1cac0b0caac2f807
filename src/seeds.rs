//! Built-in placeholder content.

use crate::domain::{OptionLabel, Subject, Variant, VariantSource};

/// Absolute last resort when a bank has no usable entries: the document still
/// gets one question per requested slot.
pub fn placeholder_variant(subject: Subject) -> Variant {
  Variant {
    text: format!("（{}題目待補充）", subject.short_name()),
    options: OptionLabel::ALL.iter().map(|l| format!("選項 {}", l)).collect(),
    correct_answer: OptionLabel::A,
    source: VariantSource::Placeholder,
  }
}
