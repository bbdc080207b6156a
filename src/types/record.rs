//! Transaction record for the cluster anomaly pipeline

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};

/// Purchase record scored against per-cluster outlier baselines.
///
/// All fields are bounded integer codes; [`TransactionRecord::validate`]
/// enforces the training-data domains before any model sees the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Buyer age in years (0-120)
    pub age: i64,

    /// Gender code (1 or 2)
    pub gender: i64,

    /// Region code (1-47)
    #[serde(alias = "prefecture")]
    pub region: i64,

    /// Product category (1-11)
    pub product_category: i64,

    /// Units purchased (>= 1)
    pub quantity: i64,

    /// Unit price (>= 0)
    pub price: i64,

    /// Order total (>= 0)
    pub total_amount: i64,

    /// Hour of purchase (0-23)
    #[serde(alias = "purchase_time")]
    pub purchase_hour: i64,

    /// Limited-edition flag (0 or 1)
    pub limited_flag: i64,

    /// Payment method code (1-7)
    pub payment_method: i64,

    /// Manufacturer id (1-20)
    pub manufacturer: i64,
}

impl TransactionRecord {
    /// Check every field against its training-data domain.
    pub fn validate(&self) -> Result<()> {
        check_range("age", self.age, 0, 120)?;
        check_range("gender", self.gender, 1, 2)?;
        check_range("region", self.region, 1, 47)?;
        check_range("product_category", self.product_category, 1, 11)?;
        check_min("quantity", self.quantity, 1)?;
        check_min("price", self.price, 0)?;
        check_min("total_amount", self.total_amount, 0)?;
        check_range("purchase_hour", self.purchase_hour, 0, 23)?;
        check_range("limited_flag", self.limited_flag, 0, 1)?;
        check_range("payment_method", self.payment_method, 1, 7)?;
        check_range("manufacturer", self.manufacturer, 1, 20)?;
        Ok(())
    }

    /// Fields as a numeric row in training column order.
    pub fn as_features(&self) -> [f64; 11] {
        [
            self.age as f64,
            self.gender as f64,
            self.region as f64,
            self.product_category as f64,
            self.quantity as f64,
            self.price as f64,
            self.total_amount as f64,
            self.purchase_hour as f64,
            self.limited_flag as f64,
            self.payment_method as f64,
            self.manufacturer as f64,
        ]
    }
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(DetectorError::Validation(format!(
            "{} must be within {}..={}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

fn check_min(field: &str, value: i64, min: i64) -> Result<()> {
    if value < min {
        return Err(DetectorError::Validation(format!(
            "{} must be at least {}, got {}",
            field, min, value
        )));
    }
    Ok(())
}
