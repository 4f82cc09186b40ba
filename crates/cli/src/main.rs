//! Command-line front end (spec.md §6), grounded on the original CLI's
//! command/flag surface and exit-code contract (`0` success, `1` known
//! application error, `2` unknown option, `3` unhandled exception).

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use fo_core::config::EngineConfig;
use fo_core::engine::Engine;
use fo_core::export;
use fo_core::model::{HashRecord, KeepStrategy, OperationType, PerceptualAlgorithm};
use fo_core::providers::{self, Providers};
use fo_core::rules::{self, FileAttributes};
use fo_core::scanner::CancellationToken;
use fo_core::FoError;
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
    Html,
}

#[derive(Debug, Parser)]
#[command(name = "fo")]
#[command(version)]
#[command(about = "Scan, fingerprint, deduplicate and rule-organize files")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Named scanner provider.
    #[arg(long, global = true, default_value = "walkdir")]
    scanner: String,
    /// Named content-hash provider.
    #[arg(long, global = true, default_value = "fast64")]
    hasher: String,
    /// Database path.
    #[arg(long, global = true, default_value = "fo.db")]
    db: PathBuf,
    /// Comma-separated extension allowlist.
    #[arg(long, global = true, value_delimiter = ',')]
    ext: Vec<String>,
    #[arg(long, global = true)]
    follow_symlinks: bool,
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: Format,
    #[arg(long, global = true)]
    dry_run: bool,
    #[arg(long, global = true, alias = "incremental")]
    prune: bool,
    #[arg(long, global = true)]
    use_ads_cache: bool,
    /// Exclude zero-length files from duplicate detection (spec.md §9
    /// defaults to including them).
    #[arg(long, global = true)]
    no_include_empty: bool,

    /// Roots to scan.
    #[arg(global = true)]
    paths: Vec<PathBuf>,
}

impl Cli {
    fn include_empty(&self) -> bool {
        !self.no_include_empty
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan for files.
    Scan,
    /// Find duplicate files.
    Duplicates,
    /// Compute file hashes.
    Hash,
    /// Find similar images.
    Similar {
        #[arg(long, default_value_t = 10)]
        threshold: u32,
        #[arg(long, default_value = "dhash")]
        phash: String,
    },
    /// Organize files based on rules.
    Organize {
        #[arg(long)]
        rule: Option<String>,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Delete duplicate files.
    DeleteDuplicates {
        #[arg(long, default_value = "oldest")]
        keep: String,
    },
    /// Rename files based on a pattern.
    Rename {
        #[arg(long)]
        pattern: String,
    },
    /// Export scan results to JSON/CSV/HTML.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Undo the last file operation.
    Undo,
    /// Show operation history.
    History,
    /// List available scanners.
    ListScanners,
    /// List available hashers.
    ListHashers,
    /// List available perceptual hash algorithms.
    ListPhash,
    /// List all registered providers.
    Modules,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            match e.downcast_ref::<FoError>() {
                Some(FoError::NotFound(_)) | Some(FoError::InvalidInput(_)) => 1,
                _ => 3,
            }
        }
    });
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let providers = providers::bootstrap();

    match &cli.command {
        Command::ListScanners => {
            println!("Available scanners: {}", providers.scanners.names().join(" "));
            return Ok(0);
        }
        Command::ListHashers => {
            println!("Available hashers: {}", providers.hashers.names().join(" "));
            return Ok(0);
        }
        Command::ListPhash => {
            println!(
                "Available perceptual hash algorithms: {}",
                providers.perceptual_hashers.names().join(" ")
            );
            return Ok(0);
        }
        Command::Modules => {
            println!("Registered Modules:");
            println!("  Scanners: {}", providers.scanners.names().join(" "));
            println!("  Hashers: {}", providers.hashers.names().join(" "));
            println!("  Metadata: {}", providers.metadata.names().join(" "));
            println!("  OCR: {}", providers.ocr.names().join(" "));
            println!("  Classifiers: {}", providers.classifiers.names().join(" "));
            println!(
                "  Perceptual Hash: {}",
                providers.perceptual_hashers.names().join(" ")
            );
            return Ok(0);
        }
        _ => {}
    }

    let config = EngineConfig {
        scanner_name: cli.scanner.clone(),
        hasher_name: cli.hasher.clone(),
        db_path: cli.db.clone(),
        use_ads_cache: cli.use_ads_cache,
    };
    let engine = Engine::new(config, &providers)?;
    let cancel = CancellationToken::new();

    match &cli.command {
        Command::Scan => cmd_scan(&cli, &engine, &providers, &cancel),
        Command::Duplicates => cmd_duplicates(&cli, &engine, &providers, &cancel),
        Command::Hash => cmd_hash(&cli, &engine, &providers, &cancel),
        Command::Similar { threshold, phash } => cmd_similar(&cli, &engine, &providers, phash, *threshold),
        Command::Organize { rule, rules } => {
            cmd_organize(&cli, &engine, &providers, &cancel, rule.as_deref(), rules.as_deref())
        }
        Command::DeleteDuplicates { keep } => cmd_delete_duplicates(&cli, &engine, keep),
        Command::Rename { pattern } => cmd_rename(&cli, &engine, &providers, &cancel, pattern),
        Command::Export { output } => cmd_export(&cli, &engine, &providers, &cancel, output.as_deref()),
        Command::Undo => cmd_undo(&cli, &engine),
        Command::History => cmd_history(&cli, &engine),
        Command::ListScanners | Command::ListHashers | Command::ListPhash | Command::Modules => {
            unreachable!("handled before Engine construction")
        }
    }
}

fn cmd_scan(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
) -> Result<i32> {
    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    match cli.format {
        Format::Json => {
            let out: Vec<_> = files
                .iter()
                .map(|f| json!({"path": f.path, "size": f.size}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            for f in &files {
                println!("{}", f.path.display());
            }
        }
    }
    Ok(0)
}

fn cmd_duplicates(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
) -> Result<i32> {
    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    let groups = engine.find_duplicates(&files, cli.include_empty(), cancel)?;
    match cli.format {
        Format::Json => {
            let out: Vec<_> = groups
                .iter()
                .map(|g| {
                    json!({
                        "size": g.size,
                        "hash": g.content_hash,
                        "files": member_paths(&files, &g.member_ids),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            for g in &groups {
                println!("== size={}, fast64={}", g.size, g.content_hash);
                for path in member_paths(&files, &g.member_ids) {
                    println!("  {path}");
                }
            }
        }
    }
    Ok(0)
}

fn cmd_hash(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
) -> Result<i32> {
    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    let hasher = engine.hasher();
    let repo = engine.file_repository();
    let mut entries = Vec::with_capacity(files.len());
    for f in &files {
        let value = hasher.fast64(&f.path)?;
        repo.add_hash(&HashRecord {
            file_id: f.id,
            algorithm: hasher.name().to_string(),
            value: value.clone(),
        })?;
        entries.push((f.path.to_string_lossy().to_string(), value));
    }
    match cli.format {
        Format::Json => {
            let out: Vec<_> = entries
                .iter()
                .map(|(path, hash)| json!({"path": path, "hash": hash}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            for (path, hash) in &entries {
                println!("{hash}  {path}");
            }
        }
    }
    Ok(0)
}

fn cmd_similar(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    phash: &str,
    threshold: u32,
) -> Result<i32> {
    let Some(query) = cli.paths.first() else {
        bail!("Usage: fo similar <image_path> [--threshold=10] [--phash=dhash|phash|ahash]");
    };
    let algorithm = PerceptualAlgorithm::parse(phash)
        .ok_or_else(|| anyhow::anyhow!("unknown perceptual algorithm '{phash}'"))?;
    let hasher = providers::perceptual_hasher_for(providers, algorithm)?;
    let Some(result) = hasher.compute(query)? else {
        bail!("failed to compute hash for {}", query.display());
    };

    let matches = engine
        .file_repository()
        .find_similar_images(algorithm, result.value, threshold)?;

    match cli.format {
        Format::Json => {
            let out = json!({
                "query": query,
                "hash": result.value,
                "algorithm": phash,
                "threshold": threshold,
                "matches": matches.iter().map(|(f, distance)| json!({
                    "id": f.id, "path": f.path, "size": f.size, "distance": distance,
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            println!("Target hash: {} ({})", result.value, result.method);
            println!("Algorithm: {phash}, Threshold: {threshold}");
            println!("Found {} similar images:", matches.len());
            for (f, distance) in &matches {
                println!("  {} (distance {distance})", f.path.display());
            }
        }
    }
    Ok(0)
}

fn cmd_organize(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
    rule: Option<&str>,
    rules_file: Option<&std::path::Path>,
) -> Result<i32> {
    if rule.is_none() && rules_file.is_none() {
        bail!("--rule or --rules is required for organize");
    }
    let mut rule_set = Vec::new();
    if let Some(template) = rule {
        rule_set.push(fo_core::model::Rule {
            name: "cli_rule".into(),
            predicate: None,
            template: template.to_string(),
        });
    }
    if let Some(path) = rules_file {
        let yaml = std::fs::read_to_string(path)?;
        rule_set.extend(rules::load_rules(&yaml)?);
    }

    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    let mut moves = Vec::new();

    for f in &files {
        let tags = engine.file_repository().get_tags(f.id)?;
        let attrs = attrs_for(f);
        let new_path = match rules::apply_rules(&rule_set, &attrs, &tags) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping {}: {e}", f.path.display());
                continue;
            }
        };
        if new_path != f.path.to_string_lossy() {
            moves.push((f.path.to_string_lossy().to_string(), new_path.clone()));
            if !cli.dry_run {
                apply_move(engine, &f.path, std::path::Path::new(&new_path), f.size)?;
            }
        }
    }

    print_move_report(cli, "Organizing", &files, &moves);
    Ok(0)
}

fn cmd_rename(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
    pattern: &str,
) -> Result<i32> {
    let pattern = if !pattern.contains("{parent}") && !pattern.contains('/') {
        format!("{{parent}}/{pattern}")
    } else {
        pattern.to_string()
    };
    let rule_set = vec![fo_core::model::Rule {
        name: "rename_rule".into(),
        predicate: None,
        template: pattern,
    }];

    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    let mut renames = Vec::new();

    for f in &files {
        let tags = engine.file_repository().get_tags(f.id)?;
        let attrs = attrs_for(f);
        let new_path = match rules::apply_rules(&rule_set, &attrs, &tags) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping {}: {e}", f.path.display());
                continue;
            }
        };
        if new_path != f.path.to_string_lossy() {
            renames.push((f.path.to_string_lossy().to_string(), new_path.clone()));
            if !cli.dry_run {
                apply_move(engine, &f.path, std::path::Path::new(&new_path), f.size)?;
            }
        }
    }

    print_move_report(cli, "Renaming", &files, &renames);
    Ok(0)
}

fn cmd_delete_duplicates(cli: &Cli, engine: &Engine, keep: &str) -> Result<i32> {
    let strategy = KeepStrategy::parse(keep)
        .ok_or_else(|| anyhow::anyhow!("unknown keep strategy '{keep}'"))?;
    let groups = engine.duplicate_repository().list_all()?;
    let repo = engine.file_repository();

    let mut kept_count = 0u32;
    let mut deleted_count = 0u32;
    let mut results = Vec::new();

    for group in &groups {
        let mut members = Vec::new();
        for id in &group.member_ids {
            members.push(repo.get_by_id(*id)?);
        }
        if members.len() < 2 {
            continue;
        }
        let keep_file = strategy.pick_primary(&members).clone();
        kept_count += 1;
        let mut deleted_paths = Vec::new();
        for member in &members {
            if member.id == keep_file.id {
                continue;
            }
            deleted_paths.push(member.path.to_string_lossy().to_string());
            if !cli.dry_run {
                std::fs::remove_file(&member.path)?;
                deleted_count += 1;
                engine.operation_repository().append(
                    OperationType::Delete,
                    &member.path.to_string_lossy(),
                    "",
                    member.size,
                    chrono::Utc::now(),
                )?;
            }
        }
        results.push((keep_file.path.to_string_lossy().to_string(), deleted_paths));
    }

    match cli.format {
        Format::Json => {
            let out = json!({
                "dry_run": cli.dry_run,
                "strategy": keep,
                "groups": groups.len(),
                "kept": kept_count,
                "deleted": deleted_count,
                "results": results.iter().map(|(kept, deleted)| json!({"kept": kept, "deleted": deleted})).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            println!("Found {} duplicate groups.", groups.len());
            if cli.dry_run {
                println!("(Dry run - no files will be deleted)");
            }
            for (kept, deleted) in &results {
                println!("Keeping: {kept}");
                for d in deleted {
                    println!("  Deleting: {d}");
                }
            }
            println!("Deleted {deleted_count} files. Kept {kept_count} files.");
        }
    }
    Ok(0)
}

fn cmd_export(
    cli: &Cli,
    engine: &Engine,
    providers: &Providers,
    cancel: &CancellationToken,
    output: Option<&std::path::Path>,
) -> Result<i32> {
    let files = engine.scan(&cli.paths, &cli.ext, cli.follow_symlinks, cli.prune, providers, cancel)?;
    let groups = engine.find_duplicates(&files, cli.include_empty(), cancel)?;

    let rendered = match cli.format {
        Format::Csv if !groups.is_empty() => export::duplicates_to_csv(&files, &groups)?,
        Format::Csv => export::to_csv(&files)?,
        Format::Html => export::to_html(&files, &groups),
        _ => export::to_json(&files, &groups)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("Exported to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

fn cmd_undo(cli: &Cli, engine: &Engine) -> Result<i32> {
    let undone = engine.operation_repository().undo_last()?;
    match (&cli.format, &undone) {
        (Format::Json, Some(op)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "success": true,
                    "type": op.op_type.as_str(),
                    "source": op.source_path,
                    "dest": op.dest_path,
                }))?
            );
        }
        (Format::Json, None) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"success": false, "message": "No operations to undo"}))?
            );
        }
        (_, Some(op)) => match op.op_type {
            OperationType::Move => println!("Undone: move {} -> {}", op.dest_path, op.source_path),
            OperationType::Rename => println!("Undone: rename {} -> {}", op.dest_path, op.source_path),
            OperationType::Copy => println!("Undone: copy (deleted {})", op.dest_path),
            OperationType::Delete => println!("Undone: delete (cannot restore)"),
        },
        (_, None) => println!("No operations to undo."),
    }
    Ok(0)
}

fn cmd_history(cli: &Cli, engine: &Engine) -> Result<i32> {
    let ops = engine.operation_repository().history(Some(50))?;
    match cli.format {
        Format::Json => {
            let out: Vec<_> = ops
                .iter()
                .map(|op| {
                    json!({
                        "id": op.id,
                        "type": op.op_type.as_str(),
                        "source": op.source_path,
                        "dest": op.dest_path,
                        "timestamp": op.timestamp.to_rfc3339(),
                        "undone": op.undone,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        _ => {
            if ops.is_empty() {
                println!("No operation history.");
            } else {
                println!("Operation History (most recent first):");
                println!("{}", "-".repeat(80));
                for op in &ops {
                    print!(
                        "{} {:>8} {}{}",
                        op.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        op.op_type.as_str().to_uppercase(),
                        if op.undone { "[UNDONE] " } else { "" },
                        op.source_path
                    );
                    if !op.dest_path.is_empty() {
                        print!(" -> {}", op.dest_path);
                    }
                    println!();
                }
            }
        }
    }
    Ok(0)
}

fn apply_move(
    engine: &Engine,
    source: &std::path::Path,
    dest: &std::path::Path,
    size: u64,
) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(source, dest)?;
    engine.operation_repository().append(
        OperationType::Move,
        &source.to_string_lossy(),
        &dest.to_string_lossy(),
        size,
        chrono::Utc::now(),
    )?;
    Ok(())
}

fn print_move_report(
    cli: &Cli,
    verb: &str,
    files: &[fo_core::model::StoredFile],
    moves: &[(String, String)],
) {
    match cli.format {
        Format::Json => {
            let out = json!({
                "dry_run": cli.dry_run,
                "total_files": files.len(),
                "moves": moves.iter().map(|(s, d)| json!({"source": s, "dest": d})).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        }
        _ => {
            println!("{verb} {} files...", files.len());
            if cli.dry_run {
                println!("(Dry run - no files will be moved)");
            }
            for (s, d) in moves {
                println!("{s} -> {d}");
            }
        }
    }
}

fn attrs_for(f: &fo_core::model::StoredFile) -> FileAttributes {
    FileAttributes {
        path: f.path.clone(),
        size: f.size,
        year: Some(f.mtime.format("%Y").to_string()),
        month: Some(f.mtime.format("%m").to_string()),
        day: Some(f.mtime.format("%d").to_string()),
        hour: Some(f.mtime.format("%H").to_string()),
        minute: Some(f.mtime.format("%M").to_string()),
        camera_make: None,
        camera_model: None,
        gps_lat: None,
        gps_lon: None,
    }
}

fn member_paths(files: &[fo_core::model::StoredFile], member_ids: &[i64]) -> Vec<String> {
    member_ids
        .iter()
        .filter_map(|id| files.iter().find(|f| f.id == *id))
        .map(|f| f.path.to_string_lossy().to_string())
        .collect()
}
