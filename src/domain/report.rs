// src/domain/report.rs

use crate::errors::{FieldError, ServerError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 3] = [
        ReportStatus::Pending,
        ReportStatus::Approved,
        ReportStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(ReportStatus::Pending),
            "approved" => Some(ReportStatus::Approved),
            "rejected" => Some(ReportStatus::Rejected),
            _ => None,
        }
    }
}

/// A farmer's claim of a completed transaction, as stored.
///
/// `anomaly_flag` and `anomaly_reason` describe the report as submitted and
/// are never touched by moderation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceReport {
    pub id: String,
    pub farmer_id: String,
    pub district: String,
    pub mandi: String,
    pub crop: String,
    pub price: f64,
    pub quantity: f64,
    pub transaction_date: NaiveDate,
    pub receipt_ref: Option<String>,
    pub status: ReportStatus,
    pub anomaly_flag: bool,
    pub anomaly_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Submission payload. Every field is optional on the wire so that a missing
/// field is reported alongside the other violations instead of as a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceReportInput {
    pub farmer_id: String,
    pub district: String,
    pub mandi: String,
    pub crop: String,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub transaction_date: Option<NaiveDate>,
    pub receipt_ref: Option<String>,
}

/// A submission that passed validation, with keys normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReport {
    pub farmer_id: String,
    pub district: String,
    pub mandi: String,
    pub crop: String,
    pub price: f64,
    pub quantity: f64,
    pub transaction_date: NaiveDate,
    pub receipt_ref: Option<String>,
}

impl PriceReportInput {
    /// Checks every field and collects all violations.
    /// `today` is the submission date; transactions dated after it are rejected.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidReport, ServerError> {
        let mut errors = Vec::new();

        let farmer_id = self.farmer_id.trim();
        if farmer_id.is_empty() {
            errors.push(FieldError::new("farmerId", "Farmer is required"));
        }

        let district = normalize_key(&self.district);
        if district.is_empty() {
            errors.push(FieldError::new("district", "District is required"));
        }

        let mandi = self.mandi.trim();
        if mandi.is_empty() {
            errors.push(FieldError::new("mandi", "Mandi is required"));
        }

        let crop = normalize_key(&self.crop);
        if crop.is_empty() {
            errors.push(FieldError::new("crop", "Crop is required"));
        }

        let price = positive(self.price, "price", "Valid price is required", &mut errors);
        let quantity = positive(
            self.quantity,
            "quantity",
            "Valid quantity is required",
            &mut errors,
        );

        match self.transaction_date {
            None => errors.push(FieldError::new(
                "transactionDate",
                "Transaction date is required",
            )),
            Some(d) if d > today => errors.push(FieldError::new(
                "transactionDate",
                "Transaction date cannot be in the future",
            )),
            Some(_) => {}
        }

        if !errors.is_empty() {
            return Err(ServerError::Validation(errors));
        }

        Ok(ValidReport {
            farmer_id: farmer_id.to_string(),
            district,
            mandi: mandi.to_string(),
            crop,
            price: price.unwrap_or_default(),
            quantity: quantity.unwrap_or_default(),
            transaction_date: self.transaction_date.unwrap_or(today),
            receipt_ref: self
                .receipt_ref
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

/// Returns the value when it is a finite number above zero, recording an error otherwise.
pub fn positive(
    value: Option<f64>,
    field: &'static str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// Optional conditions for listing reports. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
    pub district: Option<String>,
    pub crop: Option<String>,
    pub farmer_id: Option<String>,
}

impl ReportFilter {
    pub fn with_status(status: ReportStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Canonical form for crop and district keys:
/// "east_godavari" and " East  Godavari" both become "East Godavari".
pub fn normalize_key(raw: &str) -> String {
    raw.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
