//! Registry statistics.
//!
//! Per-table record counts split by lifecycle flag, used by `registry stats`
//! to check what a database holds.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate::TABLES;

/// Record counts of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub table: &'static str,
    pub total: i64,
    pub active: i64,
    pub deleted: i64,
}

pub async fn collect(pool: &SqlitePool) -> Result<Vec<TableStats>> {
    let mut stats = Vec::with_capacity(TABLES.len());

    for &(table, _) in TABLES {
        let row = sqlx::query(&format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN active = 1 AND deleted = 0 THEN 1 ELSE 0 END), 0) AS active,
                COALESCE(SUM(CASE WHEN deleted = 1 THEN 1 ELSE 0 END), 0) AS deleted
            FROM {}
            "#,
            table
        ))
        .fetch_one(pool)
        .await?;

        stats.push(TableStats {
            table,
            total: row.get("total"),
            active: row.get("active"),
            deleted: row.get("deleted"),
        });
    }

    Ok(stats)
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect(&pool).await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Facility Registry — Database Stats");
    println!("==================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!(
        "  {:<36} {:>8} {:>8} {:>8}",
        "TABLE", "TOTAL", "ACTIVE", "DELETED"
    );
    for s in stats.iter().filter(|s| s.total > 0) {
        println!(
            "  {:<36} {:>8} {:>8} {:>8}",
            s.table, s.total, s.active, s.deleted
        );
    }

    let total: i64 = stats.iter().map(|s| s.total).sum();
    println!();
    println!("  Records:     {}", total);

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
