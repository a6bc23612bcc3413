// src/db/samples.rs
use crate::db::{from_millis, to_millis};
use crate::domain::baseline::PriceSample;
use crate::errors::ServerError;
use rusqlite::{params, Connection};

pub fn insert_sample(
    conn: &Connection,
    sample: &PriceSample,
    now_ms: i64,
) -> Result<(), ServerError> {
    conn.execute(
        "insert into price_samples (crop, district, price, observed_at, report_id, recorded_at)
         values (?, ?, ?, ?, ?, ?)",
        params![
            sample.crop,
            sample.district,
            sample.price,
            to_millis(sample.observed_at),
            sample.report_id,
            now_ms
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert sample failed: {e}")))?;
    Ok(())
}

/// All samples for one key, oldest observation first. Read in a single
/// statement so a concurrent insert is either fully visible or not at all.
pub fn samples_for_key(
    conn: &Connection,
    crop: &str,
    district: &str,
) -> Result<Vec<PriceSample>, ServerError> {
    let mut stmt = conn
        .prepare(
            "select crop, district, price, observed_at, report_id
             from price_samples
             where crop = ? and district = ?
             order by observed_at, id",
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![crop, district], |row| {
            Ok(PriceSample {
                crop: row.get(0)?,
                district: row.get(1)?,
                price: row.get(2)?,
                observed_at: from_millis(row.get(3)?),
                report_id: row.get(4)?,
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut samples = Vec::new();
    for r in rows {
        samples.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(samples)
}

/// Removes the sample(s) an approval of `report_id` fed into the baseline.
pub fn delete_samples_for_report(conn: &Connection, report_id: &str) -> Result<usize, ServerError> {
    conn.execute(
        "delete from price_samples where report_id = ?",
        params![report_id],
    )
    .map_err(|e| ServerError::DbError(format!("retract sample failed: {e}")))
}
