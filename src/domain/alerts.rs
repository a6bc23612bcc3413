// src/domain/alerts.rs

use crate::domain::report::{normalize_key, positive};
use crate::errors::{FieldError, ServerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "above" => Some(AlertCondition::Above),
            "below" => Some(AlertCondition::Below),
            _ => None,
        }
    }

    pub fn is_met(&self, market_price: f64, target: f64) -> bool {
        match self {
            AlertCondition::Above => market_price > target,
            AlertCondition::Below => market_price < target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: String,
    pub user_id: String,
    pub crop: String,
    pub district: String,
    pub condition: AlertCondition,
    pub target_price: f64,
    pub enabled: bool,
    pub triggered: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceAlertInput {
    pub user_id: String,
    pub crop: String,
    pub district: String,
    pub condition: Option<AlertCondition>,
    pub target_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidAlert {
    pub user_id: String,
    pub crop: String,
    pub district: String,
    pub condition: AlertCondition,
    pub target_price: f64,
}

impl PriceAlertInput {
    pub fn validate(&self) -> Result<ValidAlert, ServerError> {
        let mut errors = Vec::new();

        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            errors.push(FieldError::new("userId", "User is required"));
        }
        let crop = normalize_key(&self.crop);
        if crop.is_empty() {
            errors.push(FieldError::new("crop", "Crop is required"));
        }
        let district = normalize_key(&self.district);
        if district.is_empty() {
            errors.push(FieldError::new("district", "District is required"));
        }
        if self.condition.is_none() {
            errors.push(FieldError::new("condition", "Condition must be above or below"));
        }
        let target = positive(
            self.target_price,
            "targetPrice",
            "Valid target price is required",
            &mut errors,
        );

        match (self.condition, target) {
            (Some(condition), Some(target_price)) if errors.is_empty() => Ok(ValidAlert {
                user_id: user_id.to_string(),
                crop,
                district,
                condition,
                target_price,
            }),
            _ => Err(ServerError::Validation(errors)),
        }
    }
}
