// src/market/official.rs
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::db;
use crate::db::official as db_official;
use crate::domain::official::{OfficialPrice, OfficialPriceInput};
use crate::domain::report::normalize_key;
use crate::errors::ServerError;
use crate::market::baseline::{start_of_day, BaselineTracker};

/// Stores an official price row and feeds its modal price into the baseline,
/// both in one transaction.
pub fn ingest_official_price(
    conn: &mut Connection,
    tracker: &BaselineTracker,
    input: &OfficialPriceInput,
    now: DateTime<Utc>,
) -> Result<OfficialPrice, ServerError> {
    let valid = input.validate()?;
    let now_ms = db::to_millis(now);

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

    let id = db_official::insert_official_price(&tx, &valid, now_ms)?;
    tracker.record_sample(
        &tx,
        &valid.crop,
        &valid.district,
        valid.modal_price,
        start_of_day(valid.date),
        None,
    )?;

    tx.commit()
        .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

    info!(id, mandi = %valid.mandi, crop = %valid.crop, "official price ingested");

    Ok(OfficialPrice {
        id,
        mandi: valid.mandi,
        district: valid.district,
        crop: valid.crop,
        min_price: valid.min_price,
        max_price: valid.max_price,
        modal_price: valid.modal_price,
        date: valid.date,
        reported_by: valid.reported_by,
        created_at: db::from_millis(now_ms),
    })
}

/// Rows for one crop, optionally narrowed to a district and a single mandi.
pub fn list_official_prices(
    conn: &Connection,
    crop: &str,
    district: Option<&str>,
    mandi: Option<&str>,
) -> Result<Vec<OfficialPrice>, ServerError> {
    let crop = normalize_key(crop);
    if crop.is_empty() {
        return Err(ServerError::BadRequest("crop is required".into()));
    }
    let district = district.map(normalize_key).filter(|d| !d.is_empty());
    let mandi = mandi.map(str::trim).filter(|m| !m.is_empty());
    db_official::list_official_prices(conn, &crop, district.as_deref(), mandi)
}
