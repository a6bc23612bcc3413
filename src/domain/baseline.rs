// src/domain/baseline.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An accepted price observation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSample {
    pub crop: String,
    pub district: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    /// Set when the sample came from an approved report.
    pub report_id: Option<String>,
}

pub const REASON_HIGHER: &str = "Price significantly higher than market average";
pub const REASON_LOWER: &str = "Price significantly lower than market average";

/// Thresholds for the two-rule anomaly gate.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineConfig {
    /// Rule 1: a price further than `std_dev_multiplier * stdDev` from the mean is anomalous.
    pub std_dev_multiplier: f64,
    /// Rule 2: a price deviating more than this percentage of the mean is anomalous.
    pub max_deviation_percent: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            std_dev_multiplier: 2.0,
            max_deviation_percent: 30.0,
        }
    }
}

/// Sample count, mean and population standard deviation for one (crop, district) key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl BaselineStats {
    pub const EMPTY: BaselineStats = BaselineStats {
        count: 0,
        mean: 0.0,
        std_dev: 0.0,
    };

    pub fn from_prices(prices: &[f64]) -> Self {
        if prices.is_empty() {
            return Self::EMPTY;
        }

        let count = prices.len();
        let n = count as f64;
        let mean = prices.iter().sum::<f64>() / n;
        let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;

        Self {
            count,
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// Runs the two-rule gate. Either rule alone flags the price.
    /// With no samples there is nothing to compare against and the price is accepted.
    pub fn classify(&self, price: f64, cfg: &BaselineConfig) -> AnomalyVerdict {
        if self.count == 0 {
            return AnomalyVerdict::normal(0.0);
        }

        let deviation = (price - self.mean).abs();
        let deviation_percent = deviation / self.mean * 100.0;

        let outside_spread = deviation > cfg.std_dev_multiplier * self.std_dev;
        let outside_percent = deviation_percent > cfg.max_deviation_percent;

        if !(outside_spread || outside_percent) {
            return AnomalyVerdict::normal(deviation_percent);
        }

        let reason = if price > self.mean {
            REASON_HIGHER
        } else {
            REASON_LOWER
        };

        AnomalyVerdict {
            is_anomaly: true,
            reason: Some(reason.to_string()),
            deviation_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyVerdict {
    pub is_anomaly: bool,
    pub reason: Option<String>,
    pub deviation_percent: f64,
}

impl AnomalyVerdict {
    fn normal(deviation_percent: f64) -> Self {
        Self {
            is_anomaly: false,
            reason: None,
            deviation_percent,
        }
    }
}
