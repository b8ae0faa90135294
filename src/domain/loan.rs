use super::amortization::{LoanTerms, compute_loan_terms, installments_remaining};
use super::money::Balance;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Active,
    PaidOff,
}

impl LoanStatus {
    pub fn for_balance(balance: Balance) -> Self {
        if balance.is_settled() {
            Self::PaidOff
        } else {
            Self::Active
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::PaidOff => f.write_str("PAID_OFF"),
        }
    }
}

/// A loan issued to a customer.
///
/// Principal, rate, period and the monthly installment are fixed at creation.
/// Only `balance` and `status` change afterwards, and only through payments.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Loan {
    pub loan_id: String,
    pub customer_id: String,
    pub principal: Decimal,
    /// Annual simple-interest rate, in percent.
    pub interest_rate: Decimal,
    pub period_years: u32,
    pub monthly_emi: Decimal,
    pub balance: Balance,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Issues a new loan with a fresh id; the opening balance is the total payable.
    pub fn issue(
        customer_id: impl Into<String>,
        principal: Decimal,
        period_years: u32,
        interest_rate: Decimal,
    ) -> Result<(Self, LoanTerms)> {
        let terms = compute_loan_terms(principal, period_years, interest_rate)?;
        let loan = Self {
            loan_id: Uuid::new_v4().to_string(),
            customer_id: customer_id.into(),
            principal,
            interest_rate,
            period_years,
            monthly_emi: terms.monthly_installment,
            balance: Balance::new(terms.total_payable),
            status: LoanStatus::Active,
            created_at: Utc::now(),
        };
        Ok((loan, terms))
    }

    /// Rebuilds the original schedule from the immutable loan terms.
    pub fn original_terms(&self) -> Result<LoanTerms> {
        compute_loan_terms(self.principal, self.period_years, self.interest_rate)
    }

    pub fn emis_left(&self) -> Result<u32> {
        Ok(installments_remaining(self.balance, &self.original_terms()?))
    }

    pub fn is_paid_off(&self) -> bool {
        self.status == LoanStatus::PaidOff
    }
}
