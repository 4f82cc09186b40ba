//! Placeholder template grammar: literal text interspersed with
//! `{name}` / `{name:default}` placeholders (spec.md §4.7).

use super::predicate::FileAttributes;
use crate::error::{FoError, Result};
use crate::model::Tag;

pub fn expand(template: &str, attrs: &FileAttributes, tags: &[Tag]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut token = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            token.push(c);
        }
        if !closed {
            return Err(FoError::InvalidInput(format!(
                "unterminated placeholder in template: {template}"
            )));
        }
        // `{tag:N}` is the Nth-tag placeholder, not a `{name:default}` pair;
        // every other placeholder may carry a default after the colon.
        let (name, default) = if token == "tag" || token.starts_with("tag:") {
            (token.as_str(), None)
        } else {
            match token.split_once(':') {
                Some((n, d)) => (n, Some(d)),
                None => (token.as_str(), None),
            }
        };
        out.push_str(&resolve(name, default, attrs, tags)?);
    }

    Ok(out)
}

fn resolve(
    name: &str,
    default: Option<&str>,
    attrs: &FileAttributes,
    tags: &[Tag],
) -> Result<String> {
    let value = match name {
        "name" => attrs
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string()),
        "ext" => attrs
            .path
            .extension()
            .map(|s| s.to_string_lossy().to_lowercase()),
        "parent" => attrs
            .path
            .parent()
            .map(|p| p.to_string_lossy().to_string()),
        "size" => Some(attrs.size.to_string()),
        "year" => attrs.year.clone(),
        "month" => attrs.month.clone(),
        "day" => attrs.day.clone(),
        "hour" => attrs.hour.clone(),
        "minute" => attrs.minute.clone(),
        "camera_make" => attrs.camera_make.clone(),
        "camera_model" => attrs.camera_model.clone(),
        "gps_lat" => attrs.gps_lat.clone(),
        "gps_lon" => attrs.gps_lon.clone(),
        "tag" => nth_tag(tags, 1),
        other => {
            if let Some(n) = other.strip_prefix("tag:") {
                let n: usize = n
                    .parse()
                    .map_err(|_| FoError::InvalidInput(format!("bad tag index: {other}")))?;
                nth_tag(tags, n)
            } else {
                return Err(FoError::InvalidInput(format!("unknown placeholder: {other}")));
            }
        }
    };

    match value {
        Some(v) => Ok(v),
        None => default
            .map(|d| d.to_string())
            .ok_or_else(|| FoError::InvalidInput(format!("no value for placeholder: {name}"))),
    }
}

fn nth_tag(tags: &[Tag], n: usize) -> Option<String> {
    if n == 0 {
        return None;
    }
    let mut sorted: Vec<&Tag> = tags.iter().collect();
    sorted.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    sorted.get(n - 1).map(|t| t.label.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn attrs() -> FileAttributes {
        FileAttributes {
            path: PathBuf::from("/photos/vacation.jpg"),
            size: 2048,
            ..Default::default()
        }
    }

    #[test]
    fn expands_name_ext_parent_size() {
        let out = expand("{parent}/{name}-{size}.{ext}", &attrs(), &[]).unwrap();
        assert_eq!(out, "/photos/vacation-2048.jpg");
    }

    #[test]
    fn missing_value_falls_back_to_default() {
        let out = expand("{year:unknown}/{name}.{ext}", &attrs(), &[]).unwrap();
        assert_eq!(out, "unknown/vacation.jpg");
    }

    #[test]
    fn missing_value_without_default_errors() {
        assert!(expand("{year}/{name}.{ext}", &attrs(), &[]).is_err());
    }

    #[test]
    fn tag_placeholders_order_by_descending_confidence() {
        let tags = vec![
            Tag { file_id: 1, label: "low".into(), confidence: 0.2, source: "x".into() },
            Tag { file_id: 1, label: "high".into(), confidence: 0.9, source: "x".into() },
        ];
        assert_eq!(expand("{tag}", &attrs(), &tags).unwrap(), "high");
        assert_eq!(expand("{tag:2}", &attrs(), &tags).unwrap(), "low");
    }

    #[test]
    fn unterminated_placeholder_is_invalid_input() {
        assert!(expand("{name", &attrs(), &[]).is_err());
    }
}
