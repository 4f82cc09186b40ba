//! Predicate mini-language: `ext in [jpg,png]`, `has_tag(cat)`,
//! `size > 1048576`. An empty predicate matches all files (handled by the
//! caller, not here).

use crate::error::{FoError, Result};
use crate::model::Tag;
use std::path::PathBuf;

/// Attributes a predicate or template may reference, gathered ahead of
/// time by the caller (EXIF/GPS fields come from a metadata provider and
/// default to empty when absent).
#[derive(Debug, Clone, Default)]
pub struct FileAttributes {
    pub path: PathBuf,
    pub size: u64,
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub hour: Option<String>,
    pub minute: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_lat: Option<String>,
    pub gps_lon: Option<String>,
}

impl FileAttributes {
    fn ext(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Evaluate a single predicate expression against `attrs`/`tags`.
pub fn eval(expr: &str, attrs: &FileAttributes, tags: &[Tag]) -> Result<bool> {
    let expr = expr.trim();

    if let Some(rest) = expr.strip_prefix("ext in [").and_then(|s| s.strip_suffix(']')) {
        let ext = attrs.ext();
        return Ok(rest.split(',').any(|candidate| candidate.trim() == ext));
    }

    if let Some(rest) = expr.strip_prefix("has_tag(").and_then(|s| s.strip_suffix(')')) {
        let label = rest.trim();
        return Ok(tags.iter().any(|t| t.label == label));
    }

    for (op, cmp) in [
        (">=", Ordering::Ge),
        ("<=", Ordering::Le),
        (">", Ordering::Gt),
        ("<", Ordering::Lt),
        ("=", Ordering::Eq),
    ] {
        if let Some((field, value)) = expr.split_once(op) {
            let field = field.trim();
            let value = value.trim();
            if field == "size" {
                let threshold: u64 = value
                    .parse()
                    .map_err(|_| FoError::InvalidInput(format!("bad size predicate: {expr}")))?;
                return Ok(match cmp {
                    Ordering::Ge => attrs.size >= threshold,
                    Ordering::Le => attrs.size <= threshold,
                    Ordering::Gt => attrs.size > threshold,
                    Ordering::Lt => attrs.size < threshold,
                    Ordering::Eq => attrs.size == threshold,
                });
            }
        }
    }

    Err(FoError::InvalidInput(format!(
        "unrecognized predicate: {expr}"
    )))
}

enum Ordering {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(ext: &str, size: u64) -> FileAttributes {
        FileAttributes {
            path: PathBuf::from(format!("photo.{ext}")),
            size,
            ..Default::default()
        }
    }

    #[test]
    fn ext_in_matches_case_insensitively() {
        let a = FileAttributes {
            path: PathBuf::from("photo.JPG"),
            ..Default::default()
        };
        assert!(eval("ext in [jpg,png]", &a, &[]).unwrap());
    }

    #[test]
    fn size_comparison_operators() {
        let a = attrs("png", 2_000_000);
        assert!(eval("size > 1048576", &a, &[]).unwrap());
        assert!(!eval("size < 1048576", &a, &[]).unwrap());
        assert!(eval("size >= 2000000", &a, &[]).unwrap());
    }

    #[test]
    fn has_tag_checks_label_membership() {
        let tags = vec![Tag {
            file_id: 1,
            label: "cat".into(),
            confidence: 0.5,
            source: "classifier".into(),
        }];
        assert!(eval("has_tag(cat)", &attrs("jpg", 1), &tags).unwrap());
        assert!(!eval("has_tag(dog)", &attrs("jpg", 1), &tags).unwrap());
    }

    #[test]
    fn unrecognized_predicate_is_invalid_input() {
        assert!(eval("bogus nonsense", &attrs("jpg", 1), &[]).is_err());
    }
}
