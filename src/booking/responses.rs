//! Response DTOs for the JSON endpoints.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::CacheStats;

use super::services::QuoteResult;

/// Money value for JSON responses
#[derive(Debug, Clone, Serialize)]
pub struct MoneyResponse {
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
}

impl MoneyResponse {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }
}

/// Response for a stay quote
#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: i64,
    pub nightly_price: MoneyResponse,
    pub total: MoneyResponse,
    pub available: bool,
}

impl QuoteResponse {
    pub fn from_result(result: QuoteResult, currency: &str) -> Self {
        Self {
            room_id: result.room_id,
            start_date: result.range.start(),
            end_date: result.range.end(),
            nights: result.nights,
            nightly_price: MoneyResponse::new(result.nightly_price, currency),
            total: MoneyResponse::new(result.total, currency),
            available: result.available,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: CacheStats,
}

/// Generic error response for JSON endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
}
