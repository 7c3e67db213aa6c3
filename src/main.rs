use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use library_reconcile::cli::{init_tracing, load_library, ConfigArgs};
use library_reconcile::export::{
    open_output, write_comparison, write_dedup, write_json_summary, write_matches_csv, write_missing_csv,
};
use library_reconcile::models::Library;
use library_reconcile::progress::{format_duration, set_log_only, Phase};
use library_reconcile::report::{ComparisonReport, DedupReport, LibraryStats};
use library_reconcile::resolve::candidate_pair_count;
use library_reconcile::{analyze_libraries, compare_libraries, deduplicate_library};

#[derive(Parser)]
#[command(name = "library-reconcile")]
#[command(about = "Compare and deduplicate music libraries exported from streaming platforms")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    config: ConfigArgs,

    /// Worker threads for scoring (0 = all cores)
    #[arg(long, default_value = "0", global = true)]
    workers: usize,

    /// Hide progress bars and log phase lines instead
    #[arg(long, global = true)]
    log_only: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Match two libraries track by track
    Compare {
        left: PathBuf,
        right: PathBuf,

        #[command(flatten)]
        outputs: CompareOutputs,

        /// Refuse to run when more than this many pairs would be scored
        #[arg(long)]
        max_pairs: Option<usize>,

        /// Print the first N left tracks missing from the right library
        #[arg(long, default_value = "20")]
        show_missing: usize,
    },

    /// Find duplicate tracks within one library
    Dedup {
        library: PathBuf,

        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Compare every pair of two or more libraries
    Analyze {
        #[arg(required = true, num_args = 2..)]
        libraries: Vec<PathBuf>,

        #[arg(long)]
        summary: Option<PathBuf>,
    },
}

/// Report files for `compare`. Every name must contain "report".
#[derive(ClapArgs)]
struct CompareOutputs {
    /// SQLite report
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// CSV of matched pairs
    #[arg(long)]
    matches_csv: Option<PathBuf>,

    /// CSV of left tracks missing from the right library
    #[arg(long)]
    missing_csv: Option<PathBuf>,
}

fn load_all(paths: &[&Path]) -> Result<Vec<Library>> {
    let phase = Phase::counted("load", paths.len() as u64, "Loading libraries");
    let mut libraries = Vec::with_capacity(paths.len());
    for path in paths {
        let library = load_library(path)?;
        info!(library = %library.label(), tracks = library.len(), "loaded");
        libraries.push(library);
        phase.inc();
    }
    phase.finish(&format!("loaded {} libraries", libraries.len()));
    Ok(libraries)
}

fn print_library_stats(stats: &LibraryStats) {
    println!(
        "  {} ({}): {} tracks, {} music, {} non-music, {} artists",
        stats.name, stats.platform, stats.total_tracks, stats.music_tracks, stats.non_music_tracks, stats.unique_artists
    );
}

fn print_comparison(report: &ComparisonReport) {
    println!("\n{:=<60}", "");
    println!("{} vs {}", report.left_name, report.right_name);
    println!("  Matched:     {}", report.matched);
    println!("  Left only:   {}", report.left_only);
    println!("  Right only:  {}", report.right_only);
    println!("  Match rate:  {:.1}%", report.match_rate * 100.0);
    println!("  Overlap:     {:.1}%", report.overlap_ratio * 100.0);
    println!("  Avg score:   {:.3}", report.average_score);
    for (kind, count) in &report.by_kind {
        println!("    {:<24} {}", kind, count);
    }
    println!("{:=<60}", "");
}

fn run_compare(
    args: &Args,
    left_path: &Path,
    right_path: &Path,
    outputs: &CompareOutputs,
    max_pairs: Option<usize>,
    show_missing: usize,
) -> Result<()> {
    let config = args.config.resolve()?;
    let libraries = load_all(&[left_path, right_path])?;
    let (left, right) = (&libraries[0], &libraries[1]);

    if let Some(limit) = max_pairs {
        let pairs = candidate_pair_count(left, right, &config)?;
        if pairs > limit {
            anyhow::bail!("{} candidate pairs exceed --max-pairs {}", pairs, limit);
        }
        info!(pairs, limit, "candidate budget ok");
    }

    let phase = Phase::spinner("compare", "Comparing libraries");
    let result = compare_libraries(left, right, &config)?;
    phase.finish(&format!(
        "{} matches from {} candidate pairs (largest block {})",
        result.matches.len(),
        result.stats.candidate_pairs,
        result.stats.largest_block
    ));
    if !result.displaced.is_empty() {
        warn!(displaced = result.displaced.len(), "accepted pairs lost to stronger matches");
    }

    let report = ComparisonReport::build(left, right, &result);
    print_comparison(&report);

    if show_missing > 0 && !result.unmatched_left.is_empty() {
        println!("\nMissing from {}:", right.label());
        for track in result.missing_from_right(left).take(show_missing) {
            println!("  {} - {}", track.artist, track.title);
        }
        if result.unmatched_left.len() > show_missing {
            println!("  ... and {} more", result.unmatched_left.len() - show_missing);
        }
    }

    let inputs = [left_path, right_path];
    if let Some(path) = &outputs.output {
        let phase = Phase::spinner("export", "Writing report database");
        let mut conn = open_output(path, &inputs)?;
        write_comparison(&mut conn, left, right, &result, &report)?;
        phase.finish(&format!("wrote {}", path.display()));
    }
    if let Some(path) = &outputs.summary {
        write_json_summary(path, &inputs, &report)?;
        info!(path = %path.display(), "summary written");
    }
    if let Some(path) = &outputs.matches_csv {
        let rows = write_matches_csv(path, &inputs, left, right, &result)?;
        info!(path = %path.display(), rows, "matches written");
    }
    if let Some(path) = &outputs.missing_csv {
        let rows = write_missing_csv(path, &inputs, left, &result.unmatched_left)?;
        info!(path = %path.display(), rows, "missing tracks written");
    }
    Ok(())
}

fn run_dedup(args: &Args, library_path: &Path, output: Option<&Path>, summary: Option<&Path>) -> Result<()> {
    let config = args.config.resolve()?;
    let libraries = load_all(&[library_path])?;
    let library = &libraries[0];

    let phase = Phase::spinner("dedup", "Finding duplicates");
    let clusters = deduplicate_library(library, &config)?;
    phase.finish(&format!("{} clusters", clusters.len()));

    let report = DedupReport::build(library, &clusters);
    println!("\n{:=<60}", "");
    println!("{}", report.library);
    println!("  Tracks:            {}", report.total_tracks);
    println!("  Duplicate groups:  {}", report.clusters);
    println!("  Redundant tracks:  {}", report.redundant_tracks);
    println!("  Largest group:     {}", report.largest_cluster);
    println!("{:=<60}", "");

    for cluster in clusters.iter().take(20) {
        let Some(canonical) = cluster.canonical_track(library) else {
            continue;
        };
        println!("  [{}x] {} - {}", cluster.len(), canonical.artist, canonical.title);
    }

    let inputs = [library_path];
    if let Some(path) = output {
        let mut conn = open_output(path, &inputs)?;
        write_dedup(&mut conn, library, &clusters, &report)?;
        info!(path = %path.display(), "report database written");
    }
    if let Some(path) = summary {
        write_json_summary(path, &inputs, &report)?;
    }
    Ok(())
}

fn run_analyze(args: &Args, paths: &[PathBuf], summary: Option<&Path>) -> Result<()> {
    let config = args.config.resolve()?;
    let inputs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    let libraries = load_all(&inputs)?;

    let phase = Phase::spinner("analyze", "Comparing every library pair");
    let analysis = analyze_libraries(&libraries, &config)?;
    phase.finish(&format!("{} pairwise comparisons", analysis.comparisons.len()));

    println!("\nLibraries:");
    for stats in &analysis.libraries {
        print_library_stats(stats);
    }
    for pairwise in &analysis.comparisons {
        print_comparison(&pairwise.report);
    }
    println!("\nUniversal tracks: {}", analysis.universal_tracks.len());
    for unique in &analysis.unique_tracks {
        println!("  Unique to {}: {}", unique.library, unique.tracks.len());
    }
    println!(
        "Artists: {} total, {} in every library",
        analysis.artists.total_unique_artists,
        analysis.artists.universal_artists.len()
    );

    if let Some(path) = summary {
        write_json_summary(path, &inputs, &analysis)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();

    match &args.command {
        Command::Compare {
            left,
            right,
            outputs,
            max_pairs,
            show_missing,
        } => run_compare(&args, left, right, outputs, *max_pairs, *show_missing)?,
        Command::Dedup {
            library,
            output,
            summary,
        } => run_dedup(&args, library, output.as_deref(), summary.as_deref())?,
        Command::Analyze { libraries, summary } => run_analyze(&args, libraries, summary.as_deref())?,
    }

    info!(elapsed = %format_duration(start.elapsed()), "done");
    Ok(())
}
