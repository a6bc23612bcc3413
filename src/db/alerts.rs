// src/db/alerts.rs
use crate::db::{from_millis, to_millis};
use crate::domain::alerts::{AlertCondition, PriceAlert};
use crate::errors::ServerError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ALERT_COLUMNS: &str = "id, user_id, crop, district, condition, target_price, \
                             enabled, triggered, triggered_at, created_at";

fn row_to_alert(row: &Row) -> rusqlite::Result<PriceAlert> {
    let condition: String = row.get(4)?;
    let condition = AlertCondition::parse(&condition).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown alert condition {condition:?}").into(),
        )
    })?;

    Ok(PriceAlert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        crop: row.get(2)?,
        district: row.get(3)?,
        condition,
        target_price: row.get(5)?,
        enabled: row.get(6)?,
        triggered: row.get(7)?,
        triggered_at: row.get::<_, Option<i64>>(8)?.map(from_millis),
        created_at: from_millis(row.get(9)?),
    })
}

pub fn insert_alert(conn: &Connection, alert: &PriceAlert) -> Result<(), ServerError> {
    conn.execute(
        &format!(
            "insert into price_alerts ({ALERT_COLUMNS}) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            alert.id,
            alert.user_id,
            alert.crop,
            alert.district,
            alert.condition.as_str(),
            alert.target_price,
            alert.enabled,
            alert.triggered,
            alert.triggered_at.map(to_millis),
            to_millis(alert.created_at),
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert alert failed: {e}")))?;
    Ok(())
}

pub fn get_alert(conn: &Connection, id: &str) -> Result<Option<PriceAlert>, ServerError> {
    conn.query_row(
        &format!("select {ALERT_COLUMNS} from price_alerts where id = ?"),
        params![id],
        row_to_alert,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select alert failed: {e}")))
}

pub fn list_alerts(conn: &Connection, user_id: &str) -> Result<Vec<PriceAlert>, ServerError> {
    let mut stmt = conn
        .prepare(&format!(
            "select {ALERT_COLUMNS} from price_alerts where user_id = ? order by created_at desc, seq desc"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![user_id], row_to_alert)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut alerts = Vec::new();
    for r in rows {
        alerts.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(alerts)
}

/// Fires an armed alert once. Returns false if another caller already fired it.
pub fn mark_triggered(conn: &Connection, id: &str, now_ms: i64) -> Result<bool, ServerError> {
    let updated = conn
        .execute(
            "update price_alerts set triggered = 1, triggered_at = ?
             where id = ? and triggered = 0 and enabled = 1",
            params![now_ms, id],
        )
        .map_err(|e| ServerError::DbError(format!("trigger alert failed: {e}")))?;
    Ok(updated == 1)
}

pub fn set_enabled(conn: &Connection, id: &str, enabled: bool) -> Result<usize, ServerError> {
    conn.execute(
        "update price_alerts set enabled = ? where id = ?",
        params![enabled, id],
    )
    .map_err(|e| ServerError::DbError(format!("update alert failed: {e}")))
}

pub fn delete_alert(conn: &Connection, id: &str) -> Result<usize, ServerError> {
    conn.execute("delete from price_alerts where id = ?", params![id])
        .map_err(|e| ServerError::DbError(format!("delete alert failed: {e}")))
}
