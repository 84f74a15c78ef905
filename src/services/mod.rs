//! Service layer. Stores own all row mutation; multi-step writes run on a
//! caller-supplied unit of work (`ConnectionTrait`), single-row operations on
//! the injected pool.

pub mod checkout;
pub mod credit_notes;
pub mod order_addresses;
pub mod order_items;
pub mod orders;
pub mod reconciliation;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Line item data as submitted by a caller, shared by the order and
/// credit-note item stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: i64,
    pub product_name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i32,
    pub unit_price_ht: Decimal,
    pub unit_price_ttc: Decimal,
    #[serde(default)]
    pub vat_rate: Decimal,
    pub total_price_ht: Decimal,
    pub total_price_ttc: Decimal,
}

impl LineItemInput {
    /// Validates the sale-time snapshot invariants.
    ///
    /// The stored line totals are intentionally NOT checked against
    /// unit price × quantity; they are trusted as submitted and the
    /// reconciliation read path sums them as stored.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.product_id <= 0 {
            return Err(ServiceError::ValidationError(
                "product reference required".to_string(),
            ));
        }
        if self.product_name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "product name required".to_string(),
            ));
        }
        if self.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "quantity must be positive".to_string(),
            ));
        }
        if self.unit_price_ht < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit price HT must be non-negative".to_string(),
            ));
        }
        if self.unit_price_ttc < self.unit_price_ht {
            return Err(ServiceError::ValidationError(
                "unit price TTC must be at least unit price HT".to_string(),
            ));
        }
        Ok(())
    }
}

/// Half-open UTC window `[Jan 1 year, Jan 1 year+1)`.
pub fn year_window(year: i32) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ServiceError::ValidationError(format!("invalid year: {}", year)))?;
    let end = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| ServiceError::ValidationError(format!("invalid year: {}", year)))?;
    Ok((start, end))
}
