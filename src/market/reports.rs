// src/market/reports.rs
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::db;
use crate::db::{reports as db_reports, samples};
use crate::domain::report::{
    normalize_key, PriceReport, PriceReportInput, ReportFilter, ReportStatus,
};
use crate::errors::{FieldError, ServerError};
use crate::ids::generate_id_default;
use crate::market::baseline::{start_of_day, BaselineTracker};

/// UTC offset of the market calendar (IST).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// When set, resetting a report also removes the baseline sample its
    /// approval inserted. Off by default: approvals permanently shape the baseline.
    pub retract_sample_on_reset: bool,
    /// Offset used to turn the submission instant into the farmer's calendar
    /// date when rejecting future transaction dates.
    pub utc_offset_minutes: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            retract_sample_on_reset: false,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl ReportConfig {
    /// Calendar date of `now` at the configured offset. Out-of-range offsets fall back to UTC.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }
}

/// Owns the report state machine:
/// pending -> approved | rejected, and back to pending via reset.
pub struct ReportService {
    tracker: BaselineTracker,
    cfg: ReportConfig,
}

impl ReportService {
    pub fn new(tracker: BaselineTracker, cfg: ReportConfig) -> Self {
        Self { tracker, cfg }
    }

    pub fn tracker(&self) -> &BaselineTracker {
        &self.tracker
    }

    /// Validate, classify against the current baseline, store as pending.
    /// Never touches the sample set.
    pub fn submit(
        &self,
        conn: &mut Connection,
        input: &PriceReportInput,
        now: DateTime<Utc>,
    ) -> Result<PriceReport, ServerError> {
        let valid = input.validate(self.cfg.local_date(now))?;

        // Immediate, so concurrent writers wait on the busy timeout
        // instead of failing a shared-to-write lock upgrade.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

        let verdict = self
            .tracker
            .classify(&tx, &valid.crop, &valid.district, valid.price)?;

        let report = PriceReport {
            id: generate_id_default("rpt"),
            farmer_id: valid.farmer_id,
            district: valid.district,
            mandi: valid.mandi,
            crop: valid.crop,
            price: valid.price,
            quantity: valid.quantity,
            transaction_date: valid.transaction_date,
            receipt_ref: valid.receipt_ref,
            status: ReportStatus::Pending,
            anomaly_flag: verdict.is_anomaly,
            anomaly_reason: verdict.reason,
            submitted_at: now,
            verified_by: None,
            verified_at: None,
        };
        db_reports::insert_report(&tx, &report)?;
        let stored = db_reports::get_report(&tx, &report.id)?.ok_or(ServerError::InternalError)?;

        tx.commit()
            .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

        info!(
            report_id = %stored.id,
            crop = %stored.crop,
            district = %stored.district,
            price = stored.price,
            anomaly = stored.anomaly_flag,
            deviation_percent = verdict.deviation_percent,
            "price report submitted"
        );
        Ok(stored)
    }

    pub fn get(&self, conn: &Connection, id: &str) -> Result<PriceReport, ServerError> {
        db_reports::get_report(conn, id)?.ok_or(ServerError::NotFound)
    }

    /// Approving an already approved report only re-stamps the moderator;
    /// the baseline gains a sample only on the transition into approved.
    pub fn approve(
        &self,
        conn: &mut Connection,
        id: &str,
        moderator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PriceReport, ServerError> {
        let moderator_id = require_moderator(moderator_id)?;
        let now_ms = db::to_millis(now);

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

        let before = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;

        if db_reports::transition_to_approved(&tx, id, moderator_id, now_ms)? {
            self.tracker.record_sample(
                &tx,
                &before.crop,
                &before.district,
                before.price,
                start_of_day(before.transaction_date),
                Some(id),
            )?;
        } else {
            db_reports::set_status(&tx, id, ReportStatus::Approved, Some(moderator_id), Some(now_ms))?;
        }

        let after = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;
        tx.commit()
            .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

        log_transition(&after.id, before.status, after.status, Some(moderator_id));
        Ok(after)
    }

    pub fn reject(
        &self,
        conn: &mut Connection,
        id: &str,
        moderator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PriceReport, ServerError> {
        let moderator_id = require_moderator(moderator_id)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

        let before = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;
        db_reports::set_status(
            &tx,
            id,
            ReportStatus::Rejected,
            Some(moderator_id),
            Some(db::to_millis(now)),
        )?;
        let after = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;

        tx.commit()
            .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

        log_transition(&after.id, before.status, after.status, Some(moderator_id));
        Ok(after)
    }

    /// Back to pending with the verification stamp cleared.
    pub fn reset(&self, conn: &mut Connection, id: &str) -> Result<PriceReport, ServerError> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ServerError::DbError(format!("begin tx failed: {e}")))?;

        let before = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;
        db_reports::set_status(&tx, id, ReportStatus::Pending, None, None)?;

        if self.cfg.retract_sample_on_reset {
            let removed = samples::delete_samples_for_report(&tx, id)?;
            if removed > 0 {
                info!(report_id = id, removed, "baseline sample retracted");
            }
        }

        let after = db_reports::get_report(&tx, id)?.ok_or(ServerError::NotFound)?;
        tx.commit()
            .map_err(|e| ServerError::DbError(format!("commit tx failed: {e}")))?;

        log_transition(&after.id, before.status, after.status, None);
        Ok(after)
    }

    /// Hard delete. Samples fed by an earlier approval stay in the baseline.
    pub fn delete(&self, conn: &Connection, id: &str) -> Result<(), ServerError> {
        if db_reports::delete_report(conn, id)? == 0 {
            return Err(ServerError::NotFound);
        }
        info!(report_id = id, "price report deleted");
        Ok(())
    }

    pub fn list(
        &self,
        conn: &Connection,
        filter: &ReportFilter,
    ) -> Result<Vec<PriceReport>, ServerError> {
        let filter = ReportFilter {
            status: filter.status,
            district: filter.district.as_deref().map(normalize_key),
            crop: filter.crop.as_deref().map(normalize_key),
            farmer_id: filter.farmer_id.as_deref().map(|f| f.trim().to_string()),
        };
        db_reports::list_reports(conn, &filter)
    }
}

fn require_moderator(moderator_id: &str) -> Result<&str, ServerError> {
    let moderator_id = moderator_id.trim();
    if moderator_id.is_empty() {
        return Err(ServerError::Validation(vec![FieldError::new(
            "moderatorId",
            "Moderator is required",
        )]));
    }
    Ok(moderator_id)
}

fn log_transition(id: &str, from: ReportStatus, to: ReportStatus, moderator: Option<&str>) {
    info!(
        report_id = id,
        from = from.as_str(),
        to = to.as_str(),
        moderator = moderator.unwrap_or("-"),
        "price report moderated"
    );
}
