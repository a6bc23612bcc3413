// src/db/reports.rs
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

use crate::db::{from_millis, to_millis};
use crate::domain::report::{PriceReport, ReportFilter, ReportStatus};
use crate::errors::ServerError;

const REPORT_COLUMNS: &str = r#"
    id, farmer_id, district, mandi, crop,
    price, quantity, transaction_date, receipt_ref,
    status, anomaly_flag, anomaly_reason,
    submitted_at, verified_by, verified_at
"#;

fn row_to_report(row: &Row) -> rusqlite::Result<PriceReport> {
    let status: String = row.get(9)?;
    let status = ReportStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            Type::Text,
            format!("unknown report status {status:?}").into(),
        )
    })?;

    Ok(PriceReport {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        district: row.get(2)?,
        mandi: row.get(3)?,
        crop: row.get(4)?,
        price: row.get(5)?,
        quantity: row.get(6)?,
        transaction_date: row.get(7)?,
        receipt_ref: row.get(8)?,
        status,
        anomaly_flag: row.get(10)?,
        anomaly_reason: row.get(11)?,
        submitted_at: from_millis(row.get(12)?),
        verified_by: row.get(13)?,
        verified_at: row.get::<_, Option<i64>>(14)?.map(from_millis),
    })
}

pub fn insert_report(conn: &Connection, report: &PriceReport) -> Result<(), ServerError> {
    conn.execute(
        r#"
        insert into price_reports (
            id, farmer_id, district, mandi, crop,
            price, quantity, transaction_date, receipt_ref,
            status, anomaly_flag, anomaly_reason,
            submitted_at, verified_by, verified_at
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
        params![
            report.id,
            report.farmer_id,
            report.district,
            report.mandi,
            report.crop,
            report.price,
            report.quantity,
            report.transaction_date,
            report.receipt_ref,
            report.status.as_str(),
            report.anomaly_flag,
            report.anomaly_reason,
            to_millis(report.submitted_at),
            report.verified_by,
            report.verified_at.map(to_millis),
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert report failed: {e}")))?;
    Ok(())
}

pub fn get_report(conn: &Connection, id: &str) -> Result<Option<PriceReport>, ServerError> {
    conn.query_row(
        &format!("select {REPORT_COLUMNS} from price_reports where id = ?"),
        params![id],
        row_to_report,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select report failed: {e}")))
}

/// Newest submission first; `seq` breaks ties within the same millisecond.
pub fn list_reports(
    conn: &Connection,
    filter: &ReportFilter,
) -> Result<Vec<PriceReport>, ServerError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(status.as_str().to_string());
    }
    if let Some(district) = &filter.district {
        clauses.push("district = ?");
        values.push(district.clone());
    }
    if let Some(crop) = &filter.crop {
        clauses.push("crop = ?");
        values.push(crop.clone());
    }
    if let Some(farmer_id) = &filter.farmer_id {
        clauses.push("farmer_id = ?");
        values.push(farmer_id.clone());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("where {}", clauses.join(" and "))
    };

    let mut stmt = conn
        .prepare(&format!(
            "select {REPORT_COLUMNS} from price_reports {where_sql} order by submitted_at desc, seq desc"
        ))
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params_from_iter(values.iter()), row_to_report)
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut reports = Vec::new();
    for r in rows {
        reports.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(reports)
}

/// Moves a report into `approved` only if it is not already there.
/// Returns true when this call performed the transition.
pub fn transition_to_approved(
    conn: &Connection,
    id: &str,
    moderator_id: &str,
    now_ms: i64,
) -> Result<bool, ServerError> {
    let updated = conn
        .execute(
            "update price_reports
             set status = 'approved', verified_by = ?, verified_at = ?
             where id = ? and status <> 'approved'",
            params![moderator_id, now_ms, id],
        )
        .map_err(|e| ServerError::DbError(format!("approve report failed: {e}")))?;
    Ok(updated == 1)
}

/// Sets status and verification stamp unconditionally. Returns rows changed (0 or 1).
pub fn set_status(
    conn: &Connection,
    id: &str,
    status: ReportStatus,
    verified_by: Option<&str>,
    verified_at_ms: Option<i64>,
) -> Result<usize, ServerError> {
    conn.execute(
        "update price_reports set status = ?, verified_by = ?, verified_at = ? where id = ?",
        params![status.as_str(), verified_by, verified_at_ms, id],
    )
    .map_err(|e| ServerError::DbError(format!("update report status failed: {e}")))
}

pub fn delete_report(conn: &Connection, id: &str) -> Result<usize, ServerError> {
    conn.execute("delete from price_reports where id = ?", params![id])
        .map_err(|e| ServerError::DbError(format!("delete report failed: {e}")))
}

/// Report counts per status, every status present (zero when absent).
pub fn status_counts(
    conn: &Connection,
    district: Option<&str>,
    farmer_id: Option<&str>,
) -> Result<BTreeMap<ReportStatus, i64>, ServerError> {
    let mut stmt = conn
        .prepare(
            "select status, count(*) from price_reports
             where (?1 is null or district = ?1) and (?2 is null or farmer_id = ?2)
             group by status",
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![district, farmer_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut counts: BTreeMap<ReportStatus, i64> =
        ReportStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for r in rows {
        let (status, n) = r.map_err(|e| ServerError::DbError(e.to_string()))?;
        if let Some(status) = ReportStatus::parse(&status) {
            counts.insert(status, n);
        }
    }
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedTotals {
    pub transactions: i64,
    pub volume: f64,
    pub value: f64,
}

pub fn approved_totals(
    conn: &Connection,
    district: Option<&str>,
) -> Result<ApprovedTotals, ServerError> {
    conn.query_row(
        "select count(*), coalesce(sum(quantity), 0.0), coalesce(sum(price * quantity), 0.0)
         from price_reports
         where status = 'approved' and (?1 is null or district = ?1)",
        params![district],
        |row| {
            Ok(ApprovedTotals {
                transactions: row.get(0)?,
                volume: row.get(1)?,
                value: row.get(2)?,
            })
        },
    )
    .map_err(|e| ServerError::DbError(format!("approved totals failed: {e}")))
}

pub fn approved_crop_distribution(
    conn: &Connection,
    district: Option<&str>,
) -> Result<BTreeMap<String, i64>, ServerError> {
    let mut stmt = conn
        .prepare(
            "select crop, count(*) from price_reports
             where status = 'approved' and (?1 is null or district = ?1)
             group by crop",
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![district], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = BTreeMap::new();
    for r in rows {
        let (crop, n) = r.map_err(|e| ServerError::DbError(e.to_string()))?;
        out.insert(crop, n);
    }
    Ok(out)
}
