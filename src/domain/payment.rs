use super::money::Amount;
use crate::error::LendingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How a payment was made. Both kinds reduce the balance the same way.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Emi,
    LumpSum,
}

impl FromStr for PaymentType {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMI" => Ok(Self::Emi),
            "LUMP_SUM" => Ok(Self::LumpSum),
            other => Err(LendingError::ValidationError(format!(
                "Invalid payment type '{other}'. Must be EMI or LUMP_SUM"
            ))),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emi => f.write_str("EMI"),
            Self::LumpSum => f.write_str("LUMP_SUM"),
        }
    }
}

/// A recorded payment. Never mutated once stored.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub payment_id: String,
    pub loan_id: String,
    pub amount: Amount,
    pub payment_type: PaymentType,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(loan_id: impl Into<String>, amount: Amount, payment_type: PaymentType) -> Self {
        Self {
            payment_id: Uuid::new_v4().to_string(),
            loan_id: loan_id.into(),
            amount,
            payment_type,
            paid_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_type_parsing_is_case_insensitive() {
        assert_eq!("emi".parse::<PaymentType>().unwrap(), PaymentType::Emi);
        assert_eq!(
            " Lump_Sum ".parse::<PaymentType>().unwrap(),
            PaymentType::LumpSum
        );
        assert!(matches!(
            "balloon".parse::<PaymentType>(),
            Err(LendingError::ValidationError(_))
        ));
    }

    #[test]
    fn test_payment_json_shape() {
        let payment = Payment::new("loan-1", Amount::new(dec!(60000)).unwrap(), PaymentType::LumpSum);
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["payment_type"], "LUMP_SUM");
        assert_eq!(json["loan_id"], "loan-1");

        let back: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(back, payment);
    }
}
