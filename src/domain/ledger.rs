//! Read models over a loan's payment history.

use super::amortization::installments_remaining;
use super::loan::{Loan, LoanStatus};
use super::money::Balance;
use super::payment::{Payment, PaymentType};
use crate::error::{LendingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One row of a ledger's transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub transaction_id: String,
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub payment_type: PaymentType,
}

impl From<Payment> for TransactionEntry {
    fn from(payment: Payment) -> Self {
        Self {
            transaction_id: payment.payment_id,
            date: payment.paid_at,
            amount: payment.amount.value(),
            payment_type: payment.payment_type,
        }
    }
}

/// A one-shot iterator over a ledger's transactions, oldest first.
#[derive(Debug)]
pub struct Transactions {
    inner: std::vec::IntoIter<Payment>,
}

impl Iterator for Transactions {
    type Item = TransactionEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(TransactionEntry::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Transactions {}

/// Snapshot of one loan plus its history.
///
/// `total_amount` is the original total payable rebuilt from the loan terms;
/// `balance_amount` is the stored, already-decremented balance.
#[derive(Debug)]
pub struct LedgerView {
    pub loan_id: String,
    pub customer_id: String,
    pub principal: Decimal,
    pub total_amount: Decimal,
    pub monthly_emi: Decimal,
    pub amount_paid: Decimal,
    pub balance_amount: Balance,
    pub emis_left: u32,
    pub status: LoanStatus,
    pub transactions: Transactions,
}

/// Builds the ledger for `loan`. Payments are sorted by time; ties keep their
/// recorded order.
pub fn build_ledger_view(loan: &Loan, mut payments: Vec<Payment>) -> Result<LedgerView> {
    let terms = loan.original_terms()?;
    payments.sort_by_key(|p| p.paid_at);
    let amount_paid = sum_paid(&payments)?;

    Ok(LedgerView {
        loan_id: loan.loan_id.clone(),
        customer_id: loan.customer_id.clone(),
        principal: loan.principal,
        total_amount: terms.total_payable,
        monthly_emi: loan.monthly_emi,
        amount_paid,
        balance_amount: loan.balance,
        emis_left: installments_remaining(loan.balance, &terms),
        status: loan.status,
        transactions: Transactions {
            inner: payments.into_iter(),
        },
    })
}

/// Per-loan line of a customer overview.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSummary {
    pub loan_id: String,
    pub principal: Decimal,
    pub total_amount: Decimal,
    pub total_interest: Decimal,
    pub emi_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_amount: Balance,
    pub emis_left: u32,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountOverview {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub total_loans: usize,
    pub loans: Vec<LoanSummary>,
}

/// Summarizes every loan of a customer independently.
///
/// A customer with no loans is reported as `NotFound` rather than as an empty
/// overview, so an unknown id and an id without loans look the same to callers.
pub fn build_account_overview(
    customer_id: &str,
    customer_name: Option<String>,
    loans: &[Loan],
    payments_by_loan: &HashMap<String, Vec<Payment>>,
) -> Result<AccountOverview> {
    if loans.is_empty() {
        return Err(LendingError::NotFound(format!(
            "No loans found for customer {customer_id}"
        )));
    }

    let summaries = loans
        .iter()
        .map(|loan| {
            let terms = loan.original_terms()?;
            let amount_paid = match payments_by_loan.get(&loan.loan_id) {
                Some(payments) => sum_paid(payments)?,
                None => Decimal::ZERO,
            };
            Ok(LoanSummary {
                loan_id: loan.loan_id.clone(),
                principal: loan.principal,
                total_amount: terms.total_payable,
                total_interest: terms.total_interest,
                emi_amount: loan.monthly_emi,
                amount_paid,
                balance_amount: loan.balance,
                emis_left: installments_remaining(loan.balance, &terms),
                status: loan.status,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AccountOverview {
        customer_id: customer_id.to_string(),
        customer_name,
        total_loans: summaries.len(),
        loans: summaries,
    })
}

fn sum_paid(payments: &[Payment]) -> Result<Decimal> {
    payments.iter().try_fold(Decimal::ZERO, |total, p| {
        total.checked_add(p.amount.value()).ok_or_else(|| {
            LendingError::ValidationError(format!(
                "Amount paid on loan {} overflows",
                p.loan_id
            ))
        })
    })
}
