//! WebAssembly module for the Stock Ledger platform
//!
//! Provides client-side computation for:
//! - Closing stock previews while transactions are being entered
//! - Opening stock resolution
//! - Date normalization matching the server
//! - Offline daily report rendering

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    closing_stock, format_date, normalize_date, resolve_opening_stock, DailyLedger,
    OpeningStockSource, TransactionTotals,
};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

#[derive(Serialize)]
struct OpeningStockView {
    quantity: Decimal,
    source: OpeningStockSource,
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid quantity '{}': {}", value, e))
}

fn closing_stock_preview(opening: &str, totals_json: &str) -> Result<String, String> {
    let opening = parse_decimal(opening)?;
    let totals: TransactionTotals =
        serde_json::from_str(totals_json).map_err(|e| format!("Invalid totals JSON: {}", e))?;
    Ok(closing_stock(opening, &totals).to_string())
}

fn opening_stock_json(
    previous_closing: Option<String>,
    recorded_opening: Option<String>,
) -> Result<String, String> {
    let previous_closing = previous_closing.as_deref().map(parse_decimal).transpose()?;
    let recorded_opening = recorded_opening.as_deref().map(parse_decimal).transpose()?;
    let resolution = resolve_opening_stock(previous_closing, recorded_opening);

    serde_json::to_string(&OpeningStockView {
        quantity: resolution.quantity,
        source: resolution.source,
    })
    .map_err(|e| e.to_string())
}

fn daily_report_json(ledger_json: &str) -> Result<String, String> {
    let ledger: DailyLedger =
        serde_json::from_str(ledger_json).map_err(|e| format!("Invalid ledger JSON: {}", e))?;
    serde_json::to_string(&ledger.build_report()).map_err(|e| e.to_string())
}

/// Closing stock for a day, as a decimal string
#[wasm_bindgen]
pub fn calculate_closing_stock(opening: &str, totals_json: &str) -> Result<String, JsValue> {
    closing_stock_preview(opening, totals_json).map_err(|e| JsValue::from_str(&e))
}

/// Resolve a day's opening stock; returns `{"quantity", "source"}` JSON
#[wasm_bindgen]
pub fn resolve_opening(
    previous_closing: Option<String>,
    recorded_opening: Option<String>,
) -> Result<String, JsValue> {
    opening_stock_json(previous_closing, recorded_opening).map_err(|e| JsValue::from_str(&e))
}

/// Normalize a user-entered date to `YYYY-MM-DD`
#[wasm_bindgen]
pub fn normalize_ledger_date(input: &str) -> Result<String, JsValue> {
    normalize_date(input)
        .map(format_date)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Build the daily report rows from a serialized ledger
#[wasm_bindgen]
pub fn build_daily_report(ledger_json: &str) -> Result<String, JsValue> {
    daily_report_json(ledger_json).map_err(|e| JsValue::from_str(&e))
}
