//! Incomplete-row scans
//!
//! Each stage has a table and a predicate marking its rows as incomplete.
//! Selection is random so that items which keep failing do not pin the
//! head of every page.

use crate::error::SyncResult;
use crate::scheduler::Stage;
use sqlx::{Row, SqliteConnection};
use std::collections::HashSet;

/// A row selected for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    pub id: String,
    /// Current name, used by stages that query by name
    pub name: Option<String>,
}

/// (table, incomplete predicate) per stage
fn scan_target(stage: Stage) -> (&'static str, &'static str) {
    match stage {
        Stage::Tracks => ("Track", "name IS NULL"),
        Stage::Albums => ("Album", "name IS NULL"),
        Stage::Artists => ("Artist", "name IS NULL"),
        Stage::ArtistAlbums => ("Artist", "retrieved_albums = 0"),
        Stage::Enrichment => ("Artist", "area_id IS NULL AND name IS NOT NULL"),
    }
}

/// Select up to `limit` incomplete rows of `stage`, skipping `exclude`
///
/// Over-fetches by the size of `exclude` so that a page is only short when
/// the stage really has fewer eligible rows.
pub async fn select_incomplete(
    conn: &mut SqliteConnection,
    stage: Stage,
    limit: usize,
    exclude: &HashSet<String>,
) -> SyncResult<Vec<ScanRow>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let (table, predicate) = scan_target(stage);
    let sql = format!(
        "SELECT id, name FROM {} WHERE {} ORDER BY RANDOM() LIMIT ?",
        table, predicate
    );
    let fetch = (limit + exclude.len()) as i64;

    let rows = sqlx::query(&sql).bind(fetch).fetch_all(&mut *conn).await?;

    let mut selected = Vec::with_capacity(limit);
    for row in rows {
        let id: String = row.get("id");
        if exclude.contains(&id) {
            continue;
        }
        selected.push(ScanRow {
            id,
            name: row.get("name"),
        });
        if selected.len() == limit {
            break;
        }
    }
    Ok(selected)
}

/// Number of incomplete rows of `stage`
pub async fn count_incomplete(conn: &mut SqliteConnection, stage: Stage) -> SyncResult<i64> {
    let (table, predicate) = scan_target(stage);
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, predicate);
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Incomplete rows of `stage` that are not in `exclude`
pub async fn count_eligible(
    conn: &mut SqliteConnection,
    stage: Stage,
    exclude: &HashSet<String>,
) -> SyncResult<i64> {
    let total = count_incomplete(conn, stage).await?;
    if exclude.is_empty() {
        return Ok(total);
    }

    let (table, predicate) = scan_target(stage);
    let mut excluded_incomplete = 0i64;
    let ids: Vec<&String> = exclude.iter().collect();
    // Stay well below SQLite's bound-parameter limit
    for chunk in ids.chunks(500) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} AND id IN ({})",
            table, predicate, placeholders
        );
        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for id in chunk {
            query = query.bind(id.as_str());
        }
        let (count,) = query.fetch_one(&mut *conn).await?;
        excluded_incomplete += count;
    }

    Ok(total - excluded_incomplete)
}
