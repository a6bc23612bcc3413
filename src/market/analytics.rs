// src/market/analytics.rs
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::reports as db_reports;
use crate::domain::report::{normalize_key, ReportStatus};
use crate::errors::ServerError;

/// Aggregates over approved reports, plus the moderation queue sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalytics {
    pub district: Option<String>,
    pub total_transactions: i64,
    pub total_volume: f64,
    pub total_value: f64,
    pub crop_distribution: BTreeMap<String, i64>,
    pub status_counts: BTreeMap<ReportStatus, i64>,
}

pub fn market_analytics(
    conn: &Connection,
    district: Option<&str>,
) -> Result<MarketAnalytics, ServerError> {
    let district = district.map(normalize_key).filter(|d| !d.is_empty());
    let key = district.as_deref();

    let totals = db_reports::approved_totals(conn, key)?;
    Ok(MarketAnalytics {
        total_transactions: totals.transactions,
        total_volume: totals.volume,
        total_value: totals.value,
        crop_distribution: db_reports::approved_crop_distribution(conn, key)?,
        status_counts: db_reports::status_counts(conn, key, None)?,
        district,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerTrust {
    pub farmer_id: String,
    pub approved: i64,
    pub rejected: i64,
    pub pending: i64,
    pub trust_score: Option<u8>,
}

/// Derived from the farmer's moderated reports, so every transition
/// (including a reset) is reflected on the next read.
pub fn farmer_trust(conn: &Connection, farmer_id: &str) -> Result<FarmerTrust, ServerError> {
    let farmer_id = farmer_id.trim();
    let counts = db_reports::status_counts(conn, None, Some(farmer_id))?;
    let count = |s: ReportStatus| counts.get(&s).copied().unwrap_or(0);

    let approved = count(ReportStatus::Approved);
    let rejected = count(ReportStatus::Rejected);

    Ok(FarmerTrust {
        farmer_id: farmer_id.to_string(),
        approved,
        rejected,
        pending: count(ReportStatus::Pending),
        trust_score: trust_score(approved, rejected),
    })
}

/// Share of moderated reports that were approved, 0..=100.
/// None until at least one report has been moderated.
pub fn trust_score(approved: i64, rejected: i64) -> Option<u8> {
    let moderated = approved + rejected;
    if moderated <= 0 {
        return None;
    }
    let pct = (approved as f64 * 100.0 / moderated as f64).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}
