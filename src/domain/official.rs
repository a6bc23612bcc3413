// src/domain/official.rs

use crate::domain::report::{normalize_key, positive};
use crate::errors::{FieldError, ServerError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A price published by a mandi official for one trading day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialPrice {
    pub id: i64,
    pub mandi: String,
    pub district: String,
    pub crop: String,
    pub min_price: f64,
    pub max_price: f64,
    /// Most frequent transaction price of the session; this is what feeds the baseline.
    pub modal_price: f64,
    pub date: NaiveDate,
    pub reported_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfficialPriceInput {
    pub mandi: String,
    pub district: String,
    pub crop: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub modal_price: Option<f64>,
    pub date: Option<NaiveDate>,
    pub reported_by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidOfficialPrice {
    pub mandi: String,
    pub district: String,
    pub crop: String,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
    pub date: NaiveDate,
    pub reported_by: String,
}

impl OfficialPriceInput {
    pub fn validate(&self) -> Result<ValidOfficialPrice, ServerError> {
        let mut errors = Vec::new();

        let mandi = self.mandi.trim();
        if mandi.is_empty() {
            errors.push(FieldError::new("mandi", "Mandi is required"));
        }
        let district = normalize_key(&self.district);
        if district.is_empty() {
            errors.push(FieldError::new("district", "District is required"));
        }
        let crop = normalize_key(&self.crop);
        if crop.is_empty() {
            errors.push(FieldError::new("crop", "Crop is required"));
        }
        let reported_by = self.reported_by.trim();
        if reported_by.is_empty() {
            errors.push(FieldError::new("reportedBy", "Reporter is required"));
        }

        let min = positive(self.min_price, "minPrice", "Valid minimum price is required", &mut errors);
        let max = positive(self.max_price, "maxPrice", "Valid maximum price is required", &mut errors);
        let modal = positive(self.modal_price, "modalPrice", "Valid modal price is required", &mut errors);

        if let (Some(min), Some(max), Some(modal)) = (min, max, modal) {
            if !(min <= modal && modal <= max) {
                errors.push(FieldError::new(
                    "modalPrice",
                    "Modal price must lie between minimum and maximum price",
                ));
            }
        }

        if self.date.is_none() {
            errors.push(FieldError::new("date", "Price date is required"));
        }

        match (min, max, modal, self.date) {
            (Some(min_price), Some(max_price), Some(modal_price), Some(date)) if errors.is_empty() => {
                Ok(ValidOfficialPrice {
                    mandi: mandi.to_string(),
                    district,
                    crop,
                    min_price,
                    max_price,
                    modal_price,
                    date,
                    reported_by: reported_by.to_string(),
                })
            }
            _ => Err(ServerError::Validation(errors)),
        }
    }
}
