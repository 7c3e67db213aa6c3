//! Score a single pair of tracks and print why it matched or not.
//!
//! Usage:
//!   explain-match --left-title "Yesterday" --left-artist "The Beatles" \
//!                 --right-title "Yesterday (Remastered 2009)" --right-artist "Beatles"

use anyhow::Result;
use clap::Parser;

use library_reconcile::cli::{init_tracing, ConfigArgs};
use library_reconcile::models::{MatchCandidate, MatchKind, Track};
use library_reconcile::normalize::normalize_track;
use library_reconcile::scoring::score_tracks;

#[derive(Parser)]
#[command(name = "explain-match")]
#[command(about = "Show normalization and scoring for one track pair")]
struct Args {
    #[arg(long)]
    left_title: String,
    #[arg(long)]
    left_artist: String,
    #[arg(long)]
    left_album: Option<String>,
    #[arg(long)]
    left_duration: Option<u32>,
    #[arg(long)]
    left_isrc: Option<String>,

    #[arg(long)]
    right_title: String,
    #[arg(long)]
    right_artist: String,
    #[arg(long)]
    right_album: Option<String>,
    #[arg(long)]
    right_duration: Option<u32>,
    #[arg(long)]
    right_isrc: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Print the candidate as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn build_track(
    title: &str,
    artist: &str,
    album: Option<&str>,
    duration: Option<u32>,
    isrc: Option<&str>,
) -> Track {
    let mut track = Track::new(title, artist);
    track.album = album.map(str::to_string);
    track.duration = duration;
    track.isrc = isrc.map(str::to_string);
    track
}

fn print_side(label: &str, track: &Track) {
    let key = normalize_track(0, track);
    println!("{label}:");
    println!("  title:   {:?} -> {:?}", track.title, key.title);
    println!("  artists: {:?} -> {:?} (primary {:?})", track.artist, key.artists, key.primary_artist);
    if let Some(album) = &key.album {
        println!("  album:   {:?}", album);
    }
    if let Some(isrc) = &key.isrc {
        println!("  isrc:    {}", isrc);
    }
    println!("  block:   {}", key.blocking_key);
}

fn print_candidate(candidate: &MatchCandidate) {
    let c = &candidate.components;
    println!("\nResult: {} (score {:.4})", candidate.kind.as_str(), candidate.score);
    println!("  title similarity:  {:.4}", c.title_similarity);
    println!("  artist similarity: {:.4}", c.artist_similarity);
    println!("  text score:        {:.4}", c.text_score);
    match c.album_similarity {
        Some(s) => println!("  album similarity:  {:.4}", s),
        None => println!("  album similarity:  n/a"),
    }
    match (c.duration_delta, c.duration_ok) {
        (Some(delta), Some(ok)) => println!("  duration delta:    {}s ({})", delta, if ok { "within tolerance" } else { "out of tolerance" }),
        _ => println!("  duration delta:    n/a"),
    }
    if let Some(reason) = &candidate.reject_reason {
        println!("  not accepted:      {}", reason);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();
    let config = args.config.resolve()?;

    let left = build_track(
        &args.left_title,
        &args.left_artist,
        args.left_album.as_deref(),
        args.left_duration,
        args.left_isrc.as_deref(),
    );
    let right = build_track(
        &args.right_title,
        &args.right_artist,
        args.right_album.as_deref(),
        args.right_duration,
        args.right_isrc.as_deref(),
    );

    let candidate = score_tracks(&left, &right, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidate)?);
        return Ok(());
    }

    print_side("Left", &left);
    print_side("Right", &right);
    let same_block = normalize_track(0, &left).blocking_key == normalize_track(0, &right).blocking_key;
    if !same_block && candidate.kind != MatchKind::IsrcExact {
        println!("\nNote: different blocking keys, so a library comparison never scores this pair");
    }
    print_candidate(&candidate);
    Ok(())
}
