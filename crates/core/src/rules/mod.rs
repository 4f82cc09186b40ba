//! Rule engine (spec.md §4.7): template placeholder grammar, predicate
//! mini-language, first-match-wins evaluation, and YAML rule-set loading.
//! The plan/apply split mirrors the teacher's `organizer::build_plan` /
//! `organizer::apply` in
//! `examples/M0nkeyFl0wer-your-little-helper-public/crates/services/src/organizer.rs`.

mod predicate;
mod template;

pub use predicate::FileAttributes;

use crate::error::{FoError, Result};
use crate::model::{Rule, Tag};
use serde::Deserialize;

/// Expand the first matching rule's template against `file`/`tags`, or
/// return the file's own path unchanged if nothing matches (spec.md §4.7).
pub fn apply_rules(rules: &[Rule], attrs: &FileAttributes, tags: &[Tag]) -> Result<String> {
    for rule in rules {
        let matches = match &rule.predicate {
            None => true,
            Some(expr) => predicate::eval(expr, attrs, tags)?,
        };
        if !matches {
            continue;
        }
        match template::expand(&rule.template, attrs, tags) {
            Ok(path) => return Ok(sanitize(&path)),
            Err(_) => continue, // failed expansion: skip this rule, not the file
        }
    }
    Ok(attrs.path.to_string_lossy().to_string())
}

/// Trim whitespace and reject `..` segments produced by expanded user text.
fn sanitize(path: &str) -> String {
    path.trim()
        .split('/')
        .filter(|segment| *segment != "..")
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    name: String,
    #[serde(default)]
    when: Option<String>,
    to: String,
}

/// Load a rule set from a YAML document of `{name, when?, to}` entries,
/// preserving declaration order and rejecting duplicate names.
pub fn load_rules(yaml: &str) -> Result<Vec<Rule>> {
    let entries: Vec<RuleEntry> = serde_yaml::from_str(yaml)
        .map_err(|e| FoError::InvalidInput(format!("malformed rules document: {e}")))?;

    let mut seen = std::collections::HashSet::new();
    let mut rules = Vec::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.name.clone()) {
            return Err(FoError::InvalidInput(format!(
                "duplicate rule name: {}",
                entry.name
            )));
        }
        rules.push(Rule {
            name: entry.name,
            predicate: entry.when,
            template: entry.to,
        });
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rules_preserves_order() {
        let yaml = "
- name: a
  to: '{name}.a'
- name: b
  when: 'ext in [png]'
  to: '{name}.b'
";
        let rules = load_rules(yaml).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "a");
        assert_eq!(rules[1].predicate.as_deref(), Some("ext in [png]"));
    }

    #[test]
    fn load_rules_rejects_duplicate_names() {
        let yaml = "
- name: a
  to: 'x'
- name: a
  to: 'y'
";
        assert!(load_rules(yaml).is_err());
    }

    #[test]
    fn sanitize_strips_dotdot_segments_and_trims() {
        assert_eq!(sanitize("  a/../b  "), "a/b");
    }
}
