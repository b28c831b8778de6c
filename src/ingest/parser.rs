//! End-of-day trade file parser
//!
//! Files are semicolon-delimited with a fixed eleven-column header. The shape
//! is strict: a wrong header or a row with the wrong column count fails the
//! whole file. Cell content is tolerant: empty cells become zero or absent
//! values, but a non-empty cell that does not parse fails the file at that
//! line. Bytes that are not valid UTF-8 are replaced rather than rejected.
//!
//! Parsed rows are flushed to the [`TradeStore`] in batches. Batches already
//! flushed stay persisted if a later line fails.

use super::store::TradeStore;
use crate::db::sqlite::models::Trade;
use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveTime};
use csv::ByteRecord;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Rows per insert call unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Required header, in order
pub const EXPECTED_HEADER: [&str; 11] = [
    "DataReferencia",
    "CodigoInstrumento",
    "AcaoAtualizacao",
    "PrecoNegocio",
    "QuantidadeNegociada",
    "HoraFechamento",
    "CodigoIdentificadorNegocio",
    "TipoSessaoPregao",
    "DataNegocio",
    "CodigoParticipanteComprador",
    "CodigoParticipanteVendedor",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse the file at `path`, persisting trades in batches of `batch_size`.
///
/// Returns the number of rows persisted.
pub fn parse_file(
    cancel: &CancellationToken,
    path: &Path,
    store: &dyn TradeStore,
    batch_size: usize,
) -> Result<usize> {
    let file = File::open(path)?;
    parse_reader(cancel, BufReader::new(file), store, batch_size)
}

/// Parse trades from any reader; see [`parse_file`]
pub fn parse_reader<R: Read>(
    cancel: &CancellationToken,
    input: R,
    store: &dyn TradeStore,
    batch_size: usize,
) -> Result<usize> {
    let batch_size = batch_size.max(1);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut record = ByteRecord::new();
    if !reader.read_byte_record(&mut record)? {
        return Err(AppError::Header("file is empty".to_string()));
    }
    validate_header(&record)?;

    let mut buffer: Vec<Trade> = Vec::with_capacity(batch_size);
    let mut total = 0usize;
    let mut line: u64 = 1;

    loop {
        if cancel.is_cancelled() {
            debug!(line, "parse cancelled");
            return Err(AppError::Cancelled);
        }

        let more = reader.read_byte_record(&mut record).map_err(|e| AppError::Row {
            line: line + 1,
            message: format!("unreadable record: {}", e),
        })?;
        if !more {
            break;
        }
        line += 1;

        if record.len() != EXPECTED_HEADER.len() {
            return Err(AppError::Row {
                line,
                message: format!(
                    "invalid column count: expected {}, got {}",
                    EXPECTED_HEADER.len(),
                    record.len()
                ),
            });
        }

        let trade = record_to_trade(&record).map_err(|message| AppError::Row { line, message })?;
        buffer.push(trade);
        total += 1;

        if buffer.len() >= batch_size {
            flush(store, &mut buffer, line)?;
        }
    }

    if !buffer.is_empty() {
        flush(store, &mut buffer, line)?;
    }

    Ok(total)
}

fn flush(store: &dyn TradeStore, buffer: &mut Vec<Trade>, line: u64) -> Result<()> {
    if let Err(e) = store.insert_trades_batch(buffer) {
        error!(line, rows = buffer.len(), "batch insert failed: {}", e);
        return Err(e);
    }
    debug!(line, rows = buffer.len(), "batch flushed");
    buffer.clear();
    Ok(())
}

/// Decode one cell, replacing invalid UTF-8 sequences
fn text(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

fn validate_header(header: &ByteRecord) -> Result<()> {
    if header.len() != EXPECTED_HEADER.len() {
        return Err(AppError::Header(format!(
            "expected {} columns, got {}",
            EXPECTED_HEADER.len(),
            header.len()
        )));
    }

    for (idx, (raw, expected)) in header.iter().zip(EXPECTED_HEADER).enumerate() {
        let cell = text(raw);
        let got = cell.trim_start_matches('\u{feff}').trim();
        if got != expected {
            return Err(AppError::Header(format!(
                "column {}: expected {:?}, got {:?}",
                idx + 1,
                expected,
                got
            )));
        }
    }

    Ok(())
}

/// Convert one well-shaped record. The error is the message for the row.
fn record_to_trade(rec: &ByteRecord) -> std::result::Result<Trade, String> {
    let cells: Vec<Cow<'_, str>> = rec.iter().map(text).collect();
    let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");

    Ok(Trade {
        reference_date: parse_date(cell(0), "ReferenceDate")?,
        instrument_code: cell(1).to_string(),
        update_action: cell(2).to_string(),
        trade_price: parse_price(cell(3))?,
        trade_quantity: parse_quantity(cell(4))?,
        closing_time: parse_closing_time(cell(5))?,
        trade_identifier_code: cell(6).to_string(),
        session_type: cell(7).to_string(),
        trade_date: parse_date(cell(8), "TradeDate")?,
        buyer_participant_code: cell(9).to_string(),
        seller_participant_code: cell(10).to_string(),
    })
}

fn parse_date(s: &str, column: &str) -> std::result::Result<Option<NaiveDate>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(Some)
        .map_err(|e| format!("invalid {} {:?}: {}", column, s, e))
}

/// Decimal comma is accepted; empty means zero
fn parse_price(s: &str) -> std::result::Result<f64, String> {
    if s.is_empty() {
        return Ok(0.0);
    }
    match s.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid TradePrice {:?}", s)),
    }
}

fn parse_quantity(s: &str) -> std::result::Result<i64, String> {
    if s.is_empty() {
        return Ok(0);
    }
    match s.parse::<i64>() {
        Ok(v) if v >= 0 => Ok(v),
        _ => Err(format!("invalid TradeQuantity {:?}", s)),
    }
}

/// `HHMMSS` followed by optional sub-second digits, which are dropped
fn parse_closing_time(s: &str) -> std::result::Result<Option<NaiveTime>, String> {
    if s.is_empty() {
        return Ok(None);
    }

    let bytes = s.as_bytes();
    if bytes.len() < 6 || !bytes[..6].iter().all(u8::is_ascii_digit) {
        return Err(format!(
            "invalid ClosingTime {:?}: need at least HHMMSS digits",
            s
        ));
    }

    let two = |at: usize| u32::from(bytes[at] - b'0') * 10 + u32::from(bytes[at + 1] - b'0');
    NaiveTime::from_hms_opt(two(0), two(2), two(4))
        .map(Some)
        .ok_or_else(|| format!("invalid ClosingTime {:?}: out of range", s))
}
