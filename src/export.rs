//! SQLite, CSV and JSON export of comparison and dedup results.
//!
//! One output database per run. Rows are written in batched transactions;
//! the serialized report goes into a `meta` table next to them so the file is
//! self-describing.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

use crate::models::{ComparisonResult, DuplicateCluster, Library, MatchCandidate, Side, Track};
use crate::report::{ComparisonReport, DedupReport};
use crate::safety::validate_report_path;

const WRITE_BATCH_SIZE: usize = 5_000;

/// Validate the output path, drop any previous file at it and open a fresh database.
pub fn open_output(path: &Path, inputs: &[&Path]) -> Result<Connection> {
    validate_report_path(path, inputs)?;

    if path.exists() {
        std::fs::remove_file(path).context("Failed to remove existing output file")?;
    }

    let conn = Connection::open(path).context("Failed to create output database")?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;

         CREATE TABLE meta (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );",
    )?;
    Ok(conn)
}

fn write_meta<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    conn.execute("INSERT INTO meta (key, value) VALUES (?1, ?2)", params![key, json])?;
    Ok(())
}

fn side_name(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Write matches, unmatched tracks and rejected pairs of one comparison.
pub fn write_comparison(
    conn: &mut Connection,
    left: &Library,
    right: &Library,
    result: &ComparisonResult,
    report: &ComparisonReport,
) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE matches (
             left_pos INTEGER NOT NULL,
             right_pos INTEGER NOT NULL,
             kind TEXT NOT NULL,
             score REAL NOT NULL,
             title_similarity REAL NOT NULL,
             artist_similarity REAL NOT NULL,
             album_similarity REAL,
             duration_delta INTEGER,
             left_title TEXT NOT NULL,
             left_artist TEXT NOT NULL,
             right_title TEXT NOT NULL,
             right_artist TEXT NOT NULL
         );

         CREATE TABLE unmatched (
             side TEXT NOT NULL,
             position INTEGER NOT NULL,
             title TEXT NOT NULL,
             artist TEXT NOT NULL,
             album TEXT,
             duration INTEGER,
             isrc TEXT,
             raw_id TEXT
         );

         CREATE TABLE rejected (
             left_pos INTEGER NOT NULL,
             right_pos INTEGER NOT NULL,
             kind TEXT NOT NULL,
             score REAL NOT NULL,
             reason TEXT
         );",
    )?;

    write_meta(conn, "comparison_report", report)?;
    write_meta(conn, "stats", &result.stats)?;

    for chunk in result.matches.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO matches (left_pos, right_pos, kind, score, title_similarity, artist_similarity,
                                      album_similarity, duration_delta, left_title, left_artist, right_title, right_artist)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for m in chunk {
                let (Some(l), Some(r)) = (left.tracks.get(m.left), right.tracks.get(m.right)) else {
                    continue;
                };
                stmt.execute(params![
                    m.left as i64,
                    m.right as i64,
                    m.kind.as_str(),
                    m.score,
                    m.components.title_similarity,
                    m.components.artist_similarity,
                    m.components.album_similarity,
                    m.components.duration_delta,
                    l.title,
                    l.artist,
                    r.title,
                    r.artist,
                ])?;
            }
        }
        tx.commit()?;
    }

    write_unmatched(conn, Side::Left, left, &result.unmatched_left)?;
    write_unmatched(conn, Side::Right, right, &result.unmatched_right)?;
    write_rejected(conn, &result.rejected)?;
    Ok(())
}

fn write_unmatched(conn: &mut Connection, side: Side, library: &Library, positions: &[usize]) -> Result<()> {
    for chunk in positions.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO unmatched (side, position, title, artist, album, duration, isrc, raw_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for &position in chunk {
                let Some(track) = library.tracks.get(position) else {
                    continue;
                };
                insert_track_row(&mut stmt, side, position, track)?;
            }
        }
        tx.commit()?;
    }
    Ok(())
}

fn insert_track_row(stmt: &mut rusqlite::CachedStatement<'_>, side: Side, position: usize, track: &Track) -> Result<()> {
    stmt.execute(params![
        side_name(side),
        position as i64,
        track.title,
        track.artist,
        track.album,
        track.duration,
        track.isrc,
        track.raw_id,
    ])?;
    Ok(())
}

fn write_rejected(conn: &mut Connection, rejected: &[MatchCandidate]) -> Result<()> {
    for chunk in rejected.chunks(WRITE_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO rejected (left_pos, right_pos, kind, score, reason) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for c in chunk {
                stmt.execute(params![
                    c.left as i64,
                    c.right as i64,
                    c.kind.as_str(),
                    c.score,
                    c.reject_reason.as_ref().map(ToString::to_string),
                ])?;
            }
        }
        tx.commit()?;
    }
    Ok(())
}

// ============================================================================
// Dedup
// ============================================================================

/// Write duplicate clusters and their members.
pub fn write_dedup(
    conn: &mut Connection,
    library: &Library,
    clusters: &[DuplicateCluster],
    report: &DedupReport,
) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE clusters (
             id INTEGER PRIMARY KEY,
             canonical_pos INTEGER NOT NULL,
             size INTEGER NOT NULL,
             title TEXT NOT NULL,
             artist TEXT NOT NULL
         );

         CREATE TABLE cluster_members (
             cluster_id INTEGER NOT NULL REFERENCES clusters(id),
             position INTEGER NOT NULL,
             is_canonical INTEGER NOT NULL,
             title TEXT NOT NULL,
             artist TEXT NOT NULL,
             album TEXT,
             duration INTEGER,
             isrc TEXT
         );",
    )?;

    write_meta(conn, "dedup_report", report)?;

    let tx = conn.transaction()?;
    {
        let mut cluster_stmt = tx.prepare_cached(
            "INSERT INTO clusters (id, canonical_pos, size, title, artist) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut member_stmt = tx.prepare_cached(
            "INSERT INTO cluster_members (cluster_id, position, is_canonical, title, artist, album, duration, isrc)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;

        for (id, cluster) in clusters.iter().enumerate() {
            let Some(canonical) = cluster.canonical_track(library) else {
                continue;
            };
            cluster_stmt.execute(params![
                id as i64,
                cluster.canonical as i64,
                cluster.len() as i64,
                canonical.title,
                canonical.artist,
            ])?;

            for &position in &cluster.members {
                let Some(track) = library.tracks.get(position) else {
                    continue;
                };
                member_stmt.execute(params![
                    id as i64,
                    position as i64,
                    position == cluster.canonical,
                    track.title,
                    track.artist,
                    track.album,
                    track.duration,
                    track.isrc,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

// ============================================================================
// CSV
// ============================================================================

fn csv_writer(path: &Path, inputs: &[&Path]) -> Result<csv::Writer<std::fs::File>> {
    validate_report_path(path, inputs)?;
    csv::WriterBuilder::new()
        .has_headers(true)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per committed match, left track first. Confidence is the score as a percentage.
pub fn write_matches_csv(
    path: &Path,
    inputs: &[&Path],
    left: &Library,
    right: &Library,
    result: &ComparisonResult,
) -> Result<usize> {
    let mut writer = csv_writer(path, inputs)?;
    writer.write_record([
        "left_title",
        "left_artist",
        "left_album",
        "left_duration",
        "right_title",
        "right_artist",
        "right_album",
        "right_duration",
        "confidence",
        "match_type",
        "left_platform",
        "right_platform",
    ])?;

    let mut rows = 0;
    for (l, r, m) in result.matched_pairs(left, right) {
        writer.write_record([
            l.title.clone(),
            l.artist.clone(),
            opt_text(&l.album),
            opt_number(l.duration),
            r.title.clone(),
            r.artist.clone(),
            opt_text(&r.album),
            opt_number(r.duration),
            format!("{:.2}", m.score * 100.0),
            m.kind.as_str().to_string(),
            l.platform.clone(),
            r.platform.clone(),
        ])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

/// Tracks of `library` at `positions`, e.g. the left tracks missing on the right.
pub fn write_missing_csv(path: &Path, inputs: &[&Path], library: &Library, positions: &[usize]) -> Result<usize> {
    let mut writer = csv_writer(path, inputs)?;
    writer.write_record([
        "title", "artist", "album", "duration", "isrc", "platform", "track_id", "year", "genre",
    ])?;

    let mut rows = 0;
    for track in positions.iter().filter_map(|&i| library.tracks.get(i)) {
        writer.write_record([
            track.title.clone(),
            track.artist.clone(),
            opt_text(&track.album),
            opt_number(track.duration),
            opt_text(&track.isrc),
            track.platform.clone(),
            opt_text(&track.raw_id),
            opt_number(track.year),
            opt_text(&track.genre),
        ])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

// ============================================================================
// JSON
// ============================================================================

/// Write any report as pretty-printed JSON.
pub fn write_json_summary<T: Serialize>(path: &Path, inputs: &[&Path], value: &T) -> Result<()> {
    validate_report_path(path, inputs)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::dedup::deduplicate_library;
    use crate::resolve::compare_libraries;

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_write_comparison() {
        let left = Library::new(
            "mine",
            "spotify",
            vec![
                Track::new("Yesterday", "The Beatles").with_isrc("GBUM71029604"),
                Track::new("abcdefghij", "Artist"),
                Track::new("Only Here", "Solo"),
            ],
        );
        let right = Library::new(
            "mine",
            "apple_music",
            vec![
                Track::new("Yesterday (Remastered 2009)", "Beatles").with_isrc("GBUM71029604"),
                Track::new("abcdefghxy", "Artist"),
            ],
        );
        let result = compare_libraries(&left, &right, &MatchConfig::default()).unwrap();
        let report = ComparisonReport::build(&left, &right, &result);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compare-report.sqlite3");
        let mut conn = open_output(&path, &[]).unwrap();
        write_comparison(&mut conn, &left, &right, &result, &report).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM matches"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM unmatched WHERE side = 'left'"), 2);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM unmatched WHERE side = 'right'"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM rejected"), 1);

        let kind: String = conn.query_row("SELECT kind FROM matches", [], |row| row.get(0)).unwrap();
        assert_eq!(kind, "isrc-exact");

        let stored: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'comparison_report'", [], |row| row.get(0))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed["matched"], 1);
    }

    #[test]
    fn test_write_dedup_replaces_previous_output() {
        let library = Library::new(
            "mine",
            "spotify",
            vec![
                Track::new("Hit", "Z").with_album("Greatest Hits").with_duration(180),
                Track::new("Hit", "Z").with_duration(180),
            ],
        );
        let clusters = deduplicate_library(&library, &MatchConfig::default()).unwrap();
        let report = DedupReport::build(&library, &clusters);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dedup-report.sqlite3");
        std::fs::write(&path, "stale").unwrap();

        let mut conn = open_output(&path, &[]).unwrap();
        write_dedup(&mut conn, &library, &clusters, &report).unwrap();

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM clusters"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM cluster_members"), 2);
        assert_eq!(
            count(&conn, "SELECT position FROM cluster_members WHERE is_canonical = 1"),
            0
        );
    }

    #[test]
    fn test_output_must_be_named_report() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Library::default();
        assert!(open_output(&dir.path().join("out.sqlite3"), &[]).is_err());
        assert!(write_json_summary(&dir.path().join("out.json"), &[], &1).is_err());
        assert!(write_missing_csv(&dir.path().join("out.csv"), &[], &empty, &[]).is_err());
    }

    #[test]
    fn test_write_csv_lists() {
        let left = Library::new(
            "mine",
            "spotify",
            vec![
                Track::new("Yesterday", "The Beatles").with_duration(125),
                Track::new("Bohemian Rhapsody", "Queen")
                    .with_album("A Night at the Opera, 1975")
                    .with_year(1975),
            ],
        );
        let right = Library::new(
            "theirs",
            "apple_music",
            vec![Track::new("Yesterday", "Beatles").with_duration(126)],
        );
        let result = compare_libraries(&left, &right, &MatchConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let matches_path = dir.path().join("matches-report.csv");
        let missing_path = dir.path().join("missing-report.csv");
        assert_eq!(write_matches_csv(&matches_path, &[], &left, &right, &result).unwrap(), 1);
        assert_eq!(write_missing_csv(&missing_path, &[], &left, &result.unmatched_left).unwrap(), 1);

        let mut reader = csv::Reader::from_path(&matches_path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Yesterday");
        assert_eq!(&rows[0][3], "125");
        assert_eq!(&rows[0][9], "fuzzy-high");
        assert_eq!(&rows[0][11], "apple_music");

        let mut reader = csv::Reader::from_path(&missing_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "title");
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][0], "Bohemian Rhapsody");
        // commas survive quoting
        assert_eq!(&rows[0][2], "A Night at the Opera, 1975");
        assert_eq!(&rows[0][3], "");
        assert_eq!(&rows[0][7], "1975");
    }

    #[test]
    fn test_write_json_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary-report.json");
        let library = Library::new("mine", "spotify", vec![Track::new("A", "B")]);
        write_json_summary(&path, &[], &crate::report::LibraryStats::build(&library)).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["total_tracks"], 1);
        assert_eq!(parsed["platform"], "spotify");
    }
}
