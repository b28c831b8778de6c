//! Per-day ingestion ledger

use super::models::IngestionLogEntry;
use crate::error::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub fn has_ingestion_for_date(conn: &Connection, day: NaiveDate) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM ingestion_log WHERE file_date = ?1)",
        params![day],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Record `day` as ingested, overwriting any earlier entry
pub fn upsert_ingestion_log(
    conn: &Connection,
    day: NaiveDate,
    filename: &str,
    row_count: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ingestion_log (file_date, filename, row_count, ingested_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(file_date) DO UPDATE SET
            filename = excluded.filename,
            row_count = excluded.row_count,
            ingested_at = excluded.ingested_at",
        params![day, filename, row_count as i64, Utc::now()],
    )?;
    Ok(())
}

pub fn get_ingestion_entry(conn: &Connection, day: NaiveDate) -> Result<Option<IngestionLogEntry>> {
    let entry = conn
        .query_row(
            "SELECT file_date, filename, row_count, ingested_at
             FROM ingestion_log WHERE file_date = ?1",
            params![day],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Every ledger entry, newest business day first
pub fn list_ingestion_log(conn: &Connection) -> Result<Vec<IngestionLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT file_date, filename, row_count, ingested_at
         FROM ingestion_log ORDER BY file_date DESC",
    )?;

    let entries = stmt
        .query_map([], row_to_entry)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<IngestionLogEntry> {
    Ok(IngestionLogEntry {
        file_date: row.get(0)?,
        filename: row.get(1)?,
        row_count: row.get(2)?,
        ingested_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::migrations::run_migrations;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_upsert_overwrites_entry() {
        let conn = conn();
        let day = date(2024, 6, 10);
        assert!(!has_ingestion_for_date(&conn, day).unwrap());

        upsert_ingestion_log(&conn, day, "10-06-2024_NEGOCIOSAVISTA.txt", 10).unwrap();
        let first = get_ingestion_entry(&conn, day).unwrap().unwrap();
        assert_eq!(first.row_count, 10);

        upsert_ingestion_log(&conn, day, "renamed.txt", 12).unwrap();
        let second = get_ingestion_entry(&conn, day).unwrap().unwrap();

        assert!(has_ingestion_for_date(&conn, day).unwrap());
        assert_eq!(second.filename, "renamed.txt");
        assert_eq!(second.row_count, 12);
        assert!(second.ingested_at >= first.ingested_at);
        assert_eq!(list_ingestion_log(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_list_newest_first() {
        let conn = conn();
        upsert_ingestion_log(&conn, date(2024, 6, 10), "a", 1).unwrap();
        upsert_ingestion_log(&conn, date(2024, 6, 12), "c", 3).unwrap();
        upsert_ingestion_log(&conn, date(2024, 6, 11), "b", 2).unwrap();

        let days: Vec<_> = list_ingestion_log(&conn)
            .unwrap()
            .into_iter()
            .map(|e| e.file_date)
            .collect();
        assert_eq!(days, vec![date(2024, 6, 12), date(2024, 6, 11), date(2024, 6, 10)]);
        assert!(get_ingestion_entry(&conn, date(2024, 6, 13)).unwrap().is_none());
    }
}
