//! JSON/CSV/HTML export (spec.md §6), grounded on the original
//! implementation's `Exporter` (size/time formatting, stats computation,
//! document shapes) reworked onto `serde_json` for JSON and the `csv`
//! crate for CSV rather than hand-rolled escaping.

use crate::error::Result;
use crate::model::{DuplicateGroup, StoredFile};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ScanStats {
    pub total_files: u64,
    pub total_directories: u64,
    pub total_size: u64,
    pub total_size_human: String,
    pub duplicate_groups: u64,
    pub duplicate_files: u64,
    pub duplicate_size: u64,
    pub duplicate_size_human: String,
}

/// Human-readable size, B/KB/MB/GB/TB, two decimal places.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.2} {}", UNITS[unit])
}

pub fn compute_stats(files: &[StoredFile], duplicates: &[DuplicateGroup]) -> ScanStats {
    let mut stats = ScanStats::default();
    for f in files {
        if f.is_dir {
            stats.total_directories += 1;
        } else {
            stats.total_files += 1;
            stats.total_size += f.size;
        }
    }
    for g in duplicates {
        stats.duplicate_groups += 1;
        stats.duplicate_files += g.member_ids.len() as u64;
        stats.duplicate_size += g.size * (g.member_ids.len() as u64 - 1);
    }
    stats.total_size_human = format_size(stats.total_size);
    stats.duplicate_size_human = format_size(stats.duplicate_size);
    stats
}

#[derive(Serialize)]
struct JsonDuplicateGroup {
    size: u64,
    content_hash: String,
    files: Vec<String>,
}

#[derive(Serialize)]
struct JsonDocument {
    stats: ScanStats,
    files: Vec<serde_json::Value>,
    duplicates: Vec<JsonDuplicateGroup>,
}

/// `{stats, files, duplicates}` document (spec.md §6).
pub fn to_json(files: &[StoredFile], duplicates: &[DuplicateGroup]) -> Result<String> {
    let stats = compute_stats(files, duplicates);
    let json_files: Vec<serde_json::Value> = files
        .iter()
        .map(|f| {
            serde_json::json!({
                "id": f.id,
                "path": f.path.to_string_lossy(),
                "size": f.size,
                "size_human": format_size(f.size),
                "mtime": f.mtime.to_rfc3339(),
                "is_dir": f.is_dir,
            })
        })
        .collect();
    let json_duplicates: Vec<JsonDuplicateGroup> = duplicates
        .iter()
        .map(|g| JsonDuplicateGroup {
            size: g.size,
            content_hash: g.content_hash.clone(),
            files: member_paths(files, g),
        })
        .collect();

    let doc = JsonDocument {
        stats,
        files: json_files,
        duplicates: json_duplicates,
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| crate::error::FoError::InvalidInput(format!("failed to serialize export: {e}")))
}

/// `id,path,size,size_human,mtime,is_dir` (spec.md §6).
pub fn to_csv(files: &[StoredFile]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["id", "path", "size", "size_human", "mtime", "is_dir"])
        .map_err(csv_err)?;
    for f in files {
        writer
            .write_record([
                f.id.to_string(),
                f.path.to_string_lossy().to_string(),
                f.size.to_string(),
                format_size(f.size),
                f.mtime.to_rfc3339(),
                f.is_dir.to_string(),
            ])
            .map_err(csv_err)?;
    }
    bytes_to_string(writer)
}

/// `group_id,size,size_human,fast64,file_path` (spec.md §6).
pub fn duplicates_to_csv(files: &[StoredFile], duplicates: &[DuplicateGroup]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["group_id", "size", "size_human", "fast64", "file_path"])
        .map_err(csv_err)?;
    for group in duplicates {
        for path in member_paths(files, group) {
            writer
                .write_record([
                    group.group_id.to_string(),
                    group.size.to_string(),
                    format_size(group.size),
                    group.content_hash.clone(),
                    path,
                ])
                .map_err(csv_err)?;
        }
    }
    bytes_to_string(writer)
}

/// Self-contained report with inline CSS; files table limited to the
/// first 100 rows.
pub fn to_html(files: &[StoredFile], duplicates: &[DuplicateGroup]) -> String {
    let stats = compute_stats(files, duplicates);
    let mut out = String::new();
    out.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>fo report</title>\n<style>\n",
    );
    out.push_str(
        "body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }\n\
         .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin-bottom: 30px; }\n\
         .stat-card { background: #f8f9fa; border-radius: 8px; padding: 15px; text-align: center; }\n\
         .stat-value { font-size: 24px; font-weight: bold; color: #007bff; }\n\
         table { width: 100%; border-collapse: collapse; margin-bottom: 30px; }\n\
         th, td { border: 1px solid #ddd; padding: 10px; text-align: left; }\n\
         th { background: #007bff; color: white; }\n",
    );
    out.push_str("</style>\n</head>\n<body>\n<h1>fo report</h1>\n<div class=\"stats\">\n");
    for (label, value) in [
        ("Files", stats.total_files.to_string()),
        ("Directories", stats.total_directories.to_string()),
        ("Total size", stats.total_size_human.clone()),
        ("Duplicate groups", stats.duplicate_groups.to_string()),
        ("Wasted space", stats.duplicate_size_human.clone()),
    ] {
        out.push_str(&format!(
            "<div class=\"stat-card\"><div class=\"stat-value\">{}</div><div class=\"stat-label\">{}</div></div>\n",
            html_escape(&value),
            html_escape(label)
        ));
    }
    out.push_str("</div>\n<h2>Files</h2>\n<table>\n<tr><th>Path</th><th>Size</th><th>Modified</th></tr>\n");
    for f in files.iter().take(100) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&f.path.to_string_lossy()),
            html_escape(&format_size(f.size)),
            html_escape(&f.mtime.to_rfc3339())
        ));
    }
    out.push_str("</table>\n<h2>Duplicates</h2>\n<table>\n<tr><th>Group</th><th>Size</th><th>Path</th></tr>\n");
    for group in duplicates {
        for path in member_paths(files, group) {
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                group.group_id,
                html_escape(&format_size(group.size)),
                html_escape(&path)
            ));
        }
    }
    out.push_str("</table>\n</body>\n</html>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn member_paths(files: &[StoredFile], group: &DuplicateGroup) -> Vec<String> {
    group
        .member_ids
        .iter()
        .filter_map(|id| files.iter().find(|f| f.id == *id))
        .map(|f| f.path.to_string_lossy().to_string())
        .collect()
}

fn csv_err(e: csv::Error) -> crate::error::FoError {
    crate::error::FoError::InvalidInput(format!("csv write failed: {e}"))
}

fn bytes_to_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::FoError::InvalidInput(format!("csv flush failed: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn file(id: i64, path: &str, size: u64) -> StoredFile {
        StoredFile {
            id,
            path: PathBuf::from(path),
            size,
            mtime: Utc::now(),
            is_dir: false,
        }
    }

    #[test]
    fn format_size_scales_units() {
        assert_eq!(format_size(500), "500.00 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(1024 * 1024 * 3), "3.00 MB");
    }

    #[test]
    fn compute_stats_counts_wasted_space() {
        let files = vec![file(1, "/a", 100), file(2, "/b", 100)];
        let groups = vec![DuplicateGroup {
            group_id: 1,
            content_hash: "h".into(),
            size: 100,
            member_ids: vec![1, 2],
            primary_file_id: 1,
        }];
        let stats = compute_stats(&files, &groups);
        assert_eq!(stats.duplicate_size, 100);
    }

    #[test]
    fn to_csv_has_expected_header() {
        let files = vec![file(1, "/a", 100)];
        let csv = to_csv(&files).unwrap();
        assert!(csv.starts_with("id,path,size,size_human,mtime,is_dir"));
    }

    #[test]
    fn to_json_round_trips_through_serde() {
        let files = vec![file(1, "/a", 100)];
        let json = to_json(&files, &[]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stats"]["total_files"], 1);
    }
}
