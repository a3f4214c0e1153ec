use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use restaurant_linker::assemble::{assemble_with, CandidatePolicy};
use restaurant_linker::db;
use restaurant_linker::linker::Linker;
use restaurant_linker::matcher::{MatcherKind, Outcome};
use restaurant_linker::model::Restaurant;
use restaurant_linker::normalize::parse_address;
use restaurant_linker::report;
use restaurant_linker::settings::{Settings, StrategyKind};
use restaurant_linker::snapshot::{self, PrepareOptions, SnapshotSpec, SourceId};

#[derive(Parser)]
#[command(name = "restaurant_linker", about = "Link restaurant listings across two directories")]
struct Cli {
    /// Settings file (default: ./linker.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Link source B records to source A records
    Link {
        /// Candidate snapshot (JSON array), e.g. michelin.json
        #[arg(long = "source-a", value_name = "FILE")]
        source_a: PathBuf,
        /// Driving snapshot (JSON array), e.g. maitre.json
        #[arg(long = "source-b", value_name = "FILE")]
        source_b: PathBuf,
        /// Where to write pairs and unmatched records
        #[arg(short, long, default_value = "data/links.json")]
        out: PathBuf,
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        /// Single matcher to use (implies --strategy single)
        #[arg(long, value_enum)]
        matcher: Option<MatcherKind>,
        #[arg(long, value_enum)]
        policy: Option<CandidatePolicy>,
        /// Do not record the run in the database
        #[arg(long)]
        no_db: bool,
    },
    /// Score two field values with one matcher (left drives, right is the candidate)
    Score {
        #[arg(value_enum)]
        matcher: MatcherKind,
        left: String,
        right: String,
    },
    /// Show recorded runs
    Runs {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    info!(settings = ?settings, "settings loaded");

    let result = match cli.command {
        Commands::Link {
            source_a,
            source_b,
            out,
            strategy,
            matcher,
            policy,
            no_db,
        } => {
            if let Some(m) = matcher {
                settings.matcher = m;
                settings.strategy = StrategyKind::Single;
            }
            if let Some(s) = strategy {
                settings.strategy = s;
            }
            if let Some(p) = policy {
                settings.candidate_policy = p;
            }
            run_link(&settings, source_a, source_b, &out, no_db)
        }
        Commands::Score {
            matcher,
            left,
            right,
        } => {
            let registry = settings.registry();
            let field = registry.get(matcher);
            let driving = record_with(matcher, &left);
            let candidate = record_with(matcher, &right);
            match field.score(&driving, &candidate) {
                Some(score) => {
                    let verdict = match field.compare(&driving, &candidate) {
                        Outcome::Match => "match",
                        _ => "no match",
                    };
                    match field.threshold() {
                        Some(t) => println!("{}: {:.4} (threshold > {}) -> {}", matcher, score, t, verdict),
                        None => println!("{}: {} -> {}", matcher, score, verdict),
                    }
                }
                None => println!("{}: not applicable (missing value)", matcher),
            }
            Ok(())
        }
        Commands::Runs { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let runs = db::fetch_runs(&conn, limit)?;
            if runs.is_empty() {
                println!("No runs recorded. Run 'link' first.");
                return Ok(());
            }
            println!(
                "{:>4} | {:<20} | {:<20} | {:<7} | {:<9} | {:>7} | {:>7} | {}",
                "#", "Started", "Sources (B -> A)", "Mode", "Policy", "Matched", "Missed", "By matcher"
            );
            println!("{}", "-".repeat(110));
            for r in &runs {
                let sources = format!("{} -> {}", r.source_b, r.source_a);
                println!(
                    "{:>4} | {:<20} | {:<20} | {:<7} | {:<9} | {:>7} | {:>7} | {}",
                    r.id,
                    truncate(&r.started_at, 20),
                    truncate(&sources, 20),
                    r.strategy,
                    r.policy,
                    format!("{}/{}", r.matched, r.driving_count),
                    r.unmatched,
                    r.by_matcher
                );
            }
            println!("\n{} run(s)", runs.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn run_link(
    settings: &Settings,
    source_a: PathBuf,
    source_b: PathBuf,
    out: &std::path::Path,
    no_db: bool,
) -> Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let a = SnapshotSpec::new(SourceId::A, &settings.source_a_label, source_a);
    let b = SnapshotSpec::new(SourceId::B, &settings.source_b_label, source_b);
    let options = PrepareOptions {
        derive_missing_reference: settings.derive_missing_reference,
    };
    let (candidates, driving) = snapshot::load_pair(&a, &b, options)?;

    let registry = settings.registry();
    let linker = Linker::new(&registry, settings.strategy());
    info!(strategy = ?linker.strategy(), policy = settings.candidate_policy.as_str(), "linking");

    let pb = ProgressBar::new(driving.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );
    let linkage = assemble_with(
        &driving,
        &candidates,
        &linker,
        settings.candidate_policy,
        |_| pb.inc(1),
    );
    pb.finish_and_clear();

    print!(
        "{}",
        report::render_summary(&linkage.stats, &settings.source_b_label, &settings.source_a_label)
    );

    report::write_json(out, &linkage)?;
    println!("Wrote {:?}", out);

    if !no_db {
        let conn = db::connect(&settings.db_path)?;
        db::init_schema(&conn)?;
        let meta = db::RunMeta {
            started_at,
            source_a: settings.source_a_label.clone(),
            source_b: settings.source_b_label.clone(),
            strategy: match settings.strategy() {
                restaurant_linker::Strategy::Chain => "chain".to_string(),
                restaurant_linker::Strategy::Single(kind) => format!("single:{}", kind),
            },
            policy: settings.candidate_policy.as_str().to_string(),
            reference_threshold: settings.reference_threshold,
            address_threshold: settings.address_threshold,
        };
        let run_id = db::save_run(&conn, &meta, &linkage)?;
        println!("Recorded run #{} in {:?}", run_id, settings.db_path);
    }
    Ok(())
}

/// A bare record carrying `value` in the field `matcher` reads.
fn record_with(matcher: MatcherKind, value: &str) -> Restaurant {
    let record = Restaurant::new("");
    match matcher {
        MatcherKind::Phone => record.with_phone(value),
        MatcherKind::Website => record.with_website(value),
        MatcherKind::Reference => record.with_reference(value),
        MatcherKind::Address => Restaurant {
            address: Some(parse_address(value)),
            ..record
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
