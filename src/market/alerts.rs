// src/market/alerts.rs
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::db::alerts as db_alerts;
use crate::domain::alerts::{PriceAlert, PriceAlertInput};
use crate::errors::ServerError;
use crate::ids::generate_id_default;
use crate::market::baseline::BaselineTracker;

pub fn create_alert(
    conn: &Connection,
    input: &PriceAlertInput,
    now: DateTime<Utc>,
) -> Result<PriceAlert, ServerError> {
    let valid = input.validate()?;

    let alert = PriceAlert {
        id: generate_id_default("alr"),
        user_id: valid.user_id,
        crop: valid.crop,
        district: valid.district,
        condition: valid.condition,
        target_price: valid.target_price,
        enabled: true,
        triggered: false,
        triggered_at: None,
        created_at: db::from_millis(db::to_millis(now)),
    };
    db_alerts::insert_alert(conn, &alert)?;
    Ok(alert)
}

pub fn list_alerts(conn: &Connection, user_id: &str) -> Result<Vec<PriceAlert>, ServerError> {
    db_alerts::list_alerts(conn, user_id.trim())
}

/// Compares each armed alert with the current market mean for its key.
/// An alert fires at most once; keys without samples are skipped.
/// Returns the alerts fired by this call.
pub fn evaluate_alerts(
    conn: &Connection,
    tracker: &BaselineTracker,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PriceAlert>, ServerError> {
    let now_ms = db::to_millis(now);
    let mut fired = Vec::new();

    for alert in db_alerts::list_alerts(conn, user_id.trim())? {
        if !alert.enabled || alert.triggered {
            continue;
        }

        let stats = tracker.get_stats(conn, &alert.crop, &alert.district)?;
        if stats.count == 0 || !alert.condition.is_met(stats.mean, alert.target_price) {
            continue;
        }

        if db_alerts::mark_triggered(conn, &alert.id, now_ms)? {
            info!(
                alert_id = %alert.id,
                crop = %alert.crop,
                mean = stats.mean,
                target = alert.target_price,
                "price alert fired"
            );
            fired.push(PriceAlert {
                triggered: true,
                triggered_at: Some(db::from_millis(now_ms)),
                ..alert
            });
        }
    }

    Ok(fired)
}

pub fn set_alert_enabled(
    conn: &Connection,
    id: &str,
    enabled: bool,
) -> Result<PriceAlert, ServerError> {
    if db_alerts::set_enabled(conn, id, enabled)? == 0 {
        return Err(ServerError::NotFound);
    }
    db_alerts::get_alert(conn, id)?.ok_or(ServerError::NotFound)
}

pub fn delete_alert(conn: &Connection, id: &str) -> Result<(), ServerError> {
    if db_alerts::delete_alert(conn, id)? == 0 {
        return Err(ServerError::NotFound);
    }
    Ok(())
}
