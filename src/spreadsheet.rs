//! Writes one snapshot and its analysis into the data sheet of an xlsx workbook.
//!
//! The workbook is rebuilt in memory and saved once: existing sheets are read,
//! the data sheet is dropped by name and recreated, and the result is written to a
//! temporary file that is then renamed over the target.

use crate::fetch_markets::Snapshot;
use crate::market_stats::Analysis;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub const HEADERS: [&str; 6] = [
    "Name",
    "Symbol",
    "Current Price (USD)",
    "Market Cap (USD)",
    "24h Trading Volume (USD)",
    "24h Price Change (%)",
];

pub const NOT_AVAILABLE: &str = "N/A";

// Row offsets of the analysis block, relative to the number of data rows.
const ANALYSIS_TITLE_OFFSET: u32 = 3;
const TOP5_LABEL_OFFSET: u32 = 4;
const TOP5_FIRST_ROW_OFFSET: u32 = 5;
const AVERAGE_OFFSET: u32 = 11;
const HIGHEST_OFFSET: u32 = 12;
const LOWEST_OFFSET: u32 = 13;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to open workbook {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to save workbook {path:?}: {reason}")]
    Save { path: PathBuf, reason: String },
    #[error("failed to lay out sheet {sheet:?}: {reason}")]
    Layout { sheet: String, reason: String },
}

/// Replaces the data sheet of the workbook at `path` (creating the file when it
/// does not exist) with the snapshot table and the analysis block.
pub fn write(
    path: &Path,
    sheet_name: &str,
    snapshot: &Snapshot,
    analysis: &Analysis,
) -> Result<(), WriteError> {
    let mut book = open_or_create(path)?;

    if book.get_sheet_by_name(sheet_name).is_some() {
        book.remove_sheet_by_name(sheet_name)
            .map_err(|reason| WriteError::Layout {
                sheet: sheet_name.to_string(),
                reason: reason.to_string(),
            })?;
    }

    let sheet = book.new_sheet(sheet_name).map_err(|reason| WriteError::Layout {
        sheet: sheet_name.to_string(),
        reason: reason.to_string(),
    })?;

    write_table(sheet, snapshot);
    write_analysis(sheet, snapshot.len() as u32, analysis);

    save_atomically(&book, path)
}

fn open_or_create(path: &Path) -> Result<Spreadsheet, WriteError> {
    if !path.exists() {
        return Ok(umya_spreadsheet::new_file_empty_worksheet());
    }

    umya_spreadsheet::reader::xlsx::read(path).map_err(|e| WriteError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_table(sheet: &mut Worksheet, snapshot: &Snapshot) {
    for (col, header) in (1u32..).zip(HEADERS) {
        sheet.get_cell_mut((col, 1)).set_value(header);
    }

    for (row, record) in (2u32..).zip(&snapshot.records) {
        sheet.get_cell_mut((1, row)).set_value(record.name.as_str());
        sheet.get_cell_mut((2, row)).set_value(record.symbol.as_str());
        set_number(sheet, (3, row), record.price_usd);
        set_number(sheet, (4, row), record.market_cap_usd);
        set_number(sheet, (5, row), record.volume_24h_usd);
        set_number(sheet, (6, row), record.change_24h_pct);
    }
}

// Absent figures stay empty cells.
fn set_number(sheet: &mut Worksheet, at: (u32, u32), value: Option<f64>) {
    if let Some(value) = value {
        sheet.get_cell_mut(at).set_value_number(value);
    }
}

fn write_analysis(sheet: &mut Worksheet, n: u32, analysis: &Analysis) {
    sheet
        .get_cell_mut((1, n + ANALYSIS_TITLE_OFFSET))
        .set_value("Analysis");
    sheet
        .get_cell_mut((1, n + TOP5_LABEL_OFFSET))
        .set_value("Top 5 by Market Cap:");

    for (row, top) in (n + TOP5_FIRST_ROW_OFFSET..).zip(&analysis.top5) {
        sheet.get_cell_mut((1, row)).set_value(top.name.as_str());
        set_number(sheet, (2, row), top.market_cap_usd);
    }

    sheet
        .get_cell_mut((1, n + AVERAGE_OFFSET))
        .set_value(average_line(analysis));
    sheet
        .get_cell_mut((1, n + HIGHEST_OFFSET))
        .set_value(highest_line(analysis));
    sheet
        .get_cell_mut((1, n + LOWEST_OFFSET))
        .set_value(lowest_line(analysis));
}

pub fn average_line(analysis: &Analysis) -> String {
    match analysis.avg_price {
        Some(avg) => format!("Average Price: ${:.2}", avg),
        None => format!("Average Price: {}", NOT_AVAILABLE),
    }
}

pub fn highest_line(analysis: &Analysis) -> String {
    format!(
        "Highest 24h Price Change: {}",
        analysis.max_change_name.as_deref().unwrap_or(NOT_AVAILABLE)
    )
}

pub fn lowest_line(analysis: &Analysis) -> String {
    format!(
        "Lowest 24h Price Change: {}",
        analysis.min_change_name.as_deref().unwrap_or(NOT_AVAILABLE)
    )
}

/// Sibling temp file, e.g. `data/.crypto_live_data.tmp.xlsx`.
fn temp_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    path.with_file_name(format!(".{}.tmp.xlsx", stem))
}

fn save_atomically(book: &Spreadsheet, path: &Path) -> Result<(), WriteError> {
    let tmp_path = temp_path_for(path);
    let save_err = |reason: String| WriteError::Save {
        path: path.to_path_buf(),
        reason,
    };

    // Until the rename, the previous workbook at `path` is untouched.
    let file = File::create(&tmp_path).map_err(|e| save_err(e.to_string()))?;
    let mut writer = BufWriter::new(file);

    let written = umya_spreadsheet::writer::xlsx::write_writer(book, &mut writer)
        .map_err(|e| e.to_string())
        .and_then(|()| writer.flush().map_err(|e| e.to_string()));
    drop(writer);

    if let Err(reason) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(save_err(reason));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        save_err(e.to_string())
    })
}
