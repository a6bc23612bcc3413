// src/market/baseline.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db;
use crate::db::samples;
use crate::domain::report::normalize_key;
use crate::errors::ServerError;

pub use crate::domain::baseline::{AnomalyVerdict, BaselineConfig, BaselineStats, PriceSample};

/// Answers "is this price unusual for this crop and district?" against the
/// accepted samples recorded so far, and owns that sample set.
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    cfg: BaselineConfig,
}

impl BaselineTracker {
    pub fn new(cfg: BaselineConfig) -> Self {
        Self { cfg }
    }

    /// Appends an accepted price to the key's sample set.
    pub fn record_sample(
        &self,
        conn: &Connection,
        crop: &str,
        district: &str,
        price: f64,
        observed_at: DateTime<Utc>,
        report_id: Option<&str>,
    ) -> Result<PriceSample, ServerError> {
        let (crop, district) = normalized_key(crop, district)?;
        check_price(price)?;

        let sample = PriceSample {
            crop,
            district,
            price,
            observed_at,
            report_id: report_id.map(str::to_string),
        };
        samples::insert_sample(conn, &sample, db::to_millis(Utc::now()))?;

        info!(
            crop = %sample.crop,
            district = %sample.district,
            price = sample.price,
            report_id = ?sample.report_id,
            "baseline sample recorded"
        );
        Ok(sample)
    }

    /// Zero stats (not an error) when the key has no samples.
    pub fn get_stats(
        &self,
        conn: &Connection,
        crop: &str,
        district: &str,
    ) -> Result<BaselineStats, ServerError> {
        let (crop, district) = normalized_key(crop, district)?;
        let prices: Vec<f64> = samples::samples_for_key(conn, &crop, &district)?
            .into_iter()
            .map(|s| s.price)
            .collect();
        Ok(BaselineStats::from_prices(&prices))
    }

    pub fn classify(
        &self,
        conn: &Connection,
        crop: &str,
        district: &str,
        price: f64,
    ) -> Result<AnomalyVerdict, ServerError> {
        check_price(price)?;
        let stats = self.get_stats(conn, crop, district)?;
        let verdict = stats.classify(price, &self.cfg);

        debug!(
            crop,
            district,
            price,
            count = stats.count,
            mean = stats.mean,
            std_dev = stats.std_dev,
            anomaly = verdict.is_anomaly,
            "classified price"
        );
        Ok(verdict)
    }
}

/// Transaction dates become samples observed at midnight UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn normalized_key(crop: &str, district: &str) -> Result<(String, String), ServerError> {
    let crop = normalize_key(crop);
    let district = normalize_key(district);
    if crop.is_empty() || district.is_empty() {
        return Err(ServerError::InvalidInput(
            "crop and district are required".into(),
        ));
    }
    Ok((crop, district))
}

fn check_price(price: f64) -> Result<(), ServerError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ServerError::InvalidInput(format!(
            "price must be greater than zero, got {price}"
        )));
    }
    Ok(())
}
