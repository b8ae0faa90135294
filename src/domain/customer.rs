use crate::error::{LendingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A borrower. Loans refer to customers by id only; registration is optional
/// and just supplies a display name.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(customer_id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let customer_id = customer_id.into();
        let name = name.into();
        if customer_id.trim().is_empty() {
            return Err(LendingError::ValidationError(
                "Customer id must not be empty".to_string(),
            ));
        }
        if name.trim().is_empty() {
            return Err(LendingError::ValidationError(
                "Customer name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            customer_id,
            name,
            created_at: Utc::now(),
        })
    }
}
