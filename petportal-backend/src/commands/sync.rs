//! Copy main-database tables from one file to another
//!
//! Tables are compared by record count. A table is copied when the source
//! holds more rows than the target: the target table is cleared and every
//! source row is inserted with its original id. Chat tables never take part
//! since they route to the chat database.

use rusqlite::types::Value;
use rusqlite::Connection;
use std::path::Path;

use super::{CommandError, CommandResult};
use crate::db::router::{self, DbAlias, CHAT_TABLES, MAIN_TABLES};
use crate::db::{placeholders, Database};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableAction {
    Copy,
    UpToDate,
    /// Routed to another database alias
    Skipped(DbAlias),
}

#[derive(Debug, Clone)]
pub struct TablePlan {
    pub table: &'static str,
    pub source_count: i64,
    pub target_count: i64,
    pub action: TableAction,
    /// Rows written; zero on a dry run
    pub copied: usize,
}

fn count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
}

/// Compare per-table counts of two main databases
pub fn plan(source: &Database, target: &Database) -> CommandResult<Vec<TablePlan>> {
    let source_conn = source.conn();
    let target_conn = target.conn();

    MAIN_TABLES
        .iter()
        .chain(CHAT_TABLES.iter())
        .map(|&table| {
            let alias = router::route_table(table);
            if alias != DbAlias::Default {
                return Ok(TablePlan {
                    table,
                    source_count: 0,
                    target_count: 0,
                    action: TableAction::Skipped(alias),
                    copied: 0,
                });
            }

            let source_count = count(&source_conn, table)?;
            let target_count = count(&target_conn, table)?;
            let action = if source_count > target_count {
                TableAction::Copy
            } else {
                TableAction::UpToDate
            };
            Ok(TablePlan {
                table,
                source_count,
                target_count,
                action,
                copied: 0,
            })
        })
        .collect()
}

/// Replace the target table's rows with the source table's rows
fn copy_table(source: &Connection, target: &mut Connection, table: &str) -> rusqlite::Result<usize> {
    let mut stmt = source.prepare(&format!("SELECT * FROM {}", table))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows: Vec<Vec<Value>> = stmt
        .query_map([], |row| {
            (0..columns.len()).map(|i| row.get::<_, Value>(i)).collect()
        })?
        .collect::<rusqlite::Result<_>>()?;

    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders(columns.len())
    );

    let tx = target.transaction()?;
    tx.execute(&format!("DELETE FROM {}", table), [])?;
    {
        let mut insert = tx.prepare(&insert)?;
        for row in &rows {
            insert.execute(rusqlite::params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;

    Ok(rows.len())
}

/// Sync `source_path` into `target_path`. Returns the per-table plan with
/// copied row counts filled in.
pub fn run(source_path: &str, target_path: &str, dry_run: bool) -> CommandResult<Vec<TablePlan>> {
    if !Path::new(source_path).exists() {
        return Err(CommandError::MissingDatabase(source_path.to_string()));
    }

    let source = Database::new(source_path)?;
    let target = Database::new(target_path)?;
    let mut tables = plan(&source, &target)?;

    println!("Syncing {} -> {}{}", source_path, target_path, if dry_run { " (dry run)" } else { "" });

    if !dry_run {
        let source_conn = source.conn();
        let mut target_conn = target.conn();
        // rows arrive table by table, so references are checked only once all are in
        target_conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let result = tables
            .iter_mut()
            .filter(|t| t.action == TableAction::Copy)
            .try_for_each(|t| {
                t.copied = copy_table(&source_conn, &mut target_conn, t.table)?;
                log::info!("sync: copied {} row(s) into {}", t.copied, t.table);
                Ok::<_, rusqlite::Error>(())
            });
        target_conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        result?;
    }

    for t in &tables {
        match &t.action {
            TableAction::Copy if dry_run => println!(
                "  {:<28} {} -> {} (would copy)",
                t.table, t.source_count, t.target_count
            ),
            TableAction::Copy => println!("  {:<28} copied {} row(s)", t.table, t.copied),
            TableAction::UpToDate => println!(
                "  {:<28} {} / {} up to date",
                t.table, t.source_count, t.target_count
            ),
            TableAction::Skipped(alias) => println!("  {:<28} skipped (routed to {})", t.table, alias),
        }
    }

    Ok(tables)
}
