use crate::application::service::PaymentRequest;
use crate::error::{LendingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One line of a bulk payment file: `loan_id, amount, payment_type`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PaymentRow {
    pub loan_id: String,
    pub amount: Decimal,
    pub payment_type: String,
}

impl PaymentRow {
    pub fn into_request(self) -> (String, PaymentRequest) {
        (
            self.loan_id,
            PaymentRequest {
                amount: self.amount,
                payment_type: self.payment_type,
            },
        )
    }
}

/// Reads payment rows from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<PaymentRow>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes rows, so large
    /// files stream without being loaded into memory.
    pub fn payments(self) -> impl Iterator<Item = Result<PaymentRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LendingError::from))
    }
}
