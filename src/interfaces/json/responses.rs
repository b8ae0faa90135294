//! Wire shapes for request results.
//!
//! Monetary values are rounded to two decimal places here and nowhere else,
//! and serialized as JSON numbers.

use crate::application::service::{LoanReceipt, PaymentReceipt};
use crate::domain::customer::Customer;
use crate::domain::ledger::{AccountOverview, LedgerView, LoanSummary, TransactionEntry};
use crate::domain::loan::LoanStatus;
use crate::domain::money::present;
use crate::domain::payment::PaymentType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

pub const PAYMENT_RECORDED: &str = "Payment recorded successfully.";

#[derive(Debug, Serialize)]
pub struct LoanCreatedResponse {
    pub loan_id: String,
    pub customer_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount_payable: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_emi: Decimal,
}

impl From<LoanReceipt> for LoanCreatedResponse {
    fn from(receipt: LoanReceipt) -> Self {
        Self {
            loan_id: receipt.loan.loan_id,
            customer_id: receipt.loan.customer_id,
            total_amount_payable: present(receipt.total_payable),
            monthly_emi: present(receipt.loan.monthly_emi),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentRecordedResponse {
    pub payment_id: String,
    pub loan_id: String,
    pub message: &'static str,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_balance: Decimal,
    pub emis_left: u32,
}

impl From<PaymentReceipt> for PaymentRecordedResponse {
    fn from(receipt: PaymentReceipt) -> Self {
        Self {
            payment_id: receipt.payment.payment_id,
            loan_id: receipt.payment.loan_id,
            message: PAYMENT_RECORDED,
            remaining_balance: receipt.outcome.new_balance.presented(),
            emis_left: receipt.outcome.installments_remaining,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
}

impl From<TransactionEntry> for TransactionResponse {
    fn from(entry: TransactionEntry) -> Self {
        Self {
            transaction_id: entry.transaction_id,
            date: entry.date,
            amount: present(entry.amount),
            payment_type: entry.payment_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub loan_id: String,
    pub customer_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub principal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_emi: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_amount: Decimal,
    pub emis_left: u32,
    pub status: LoanStatus,
    pub transactions: Vec<TransactionResponse>,
}

impl From<LedgerView> for LedgerResponse {
    fn from(view: LedgerView) -> Self {
        Self {
            loan_id: view.loan_id,
            customer_id: view.customer_id,
            principal: present(view.principal),
            total_amount: present(view.total_amount),
            monthly_emi: present(view.monthly_emi),
            amount_paid: present(view.amount_paid),
            balance_amount: view.balance_amount.presented(),
            emis_left: view.emis_left,
            status: view.status,
            transactions: view.transactions.map(TransactionResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoanSummaryResponse {
    pub loan_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub principal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_interest: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub emi_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_amount: Decimal,
    pub emis_left: u32,
    pub status: LoanStatus,
}

impl From<LoanSummary> for LoanSummaryResponse {
    fn from(summary: LoanSummary) -> Self {
        Self {
            loan_id: summary.loan_id,
            principal: present(summary.principal),
            total_amount: present(summary.total_amount),
            total_interest: present(summary.total_interest),
            emi_amount: present(summary.emi_amount),
            amount_paid: present(summary.amount_paid),
            balance_amount: summary.balance_amount.presented(),
            emis_left: summary.emis_left,
            status: summary.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub total_loans: usize,
    pub loans: Vec<LoanSummaryResponse>,
}

impl From<AccountOverview> for OverviewResponse {
    fn from(overview: AccountOverview) -> Self {
        Self {
            customer_id: overview.customer_id,
            customer_name: overview.customer_name,
            total_loans: overview.total_loans,
            loans: overview
                .loans
                .into_iter()
                .map(LoanSummaryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub customer_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            customer_id: customer.customer_id,
            name: customer.name,
            created_at: customer.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amortization::apply_payment;
    use crate::domain::ledger::build_ledger_view;
    use crate::domain::loan::Loan;
    use crate::domain::money::Amount;
    use crate::domain::payment::Payment;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_loan_created_rounds_at_the_boundary() {
        let (loan, terms) = Loan::issue("cust_123", dec!(100000), 3, dec!(3.5)).unwrap();
        let response = LoanCreatedResponse::from(LoanReceipt {
            loan,
            total_payable: terms.total_payable,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["total_amount_payable"], json!(110500.0));
        assert_eq!(json["monthly_emi"], json!(3069.44));
    }

    #[test]
    fn test_payment_response_shape() {
        let (loan, _) = Loan::issue("cust_123", dec!(100000), 2, dec!(10)).unwrap();
        let amount = Amount::new(dec!(60000)).unwrap();
        let receipt = PaymentReceipt {
            payment: Payment::new(loan.loan_id.clone(), amount, PaymentType::LumpSum),
            outcome: apply_payment(loan.balance, &loan.original_terms().unwrap(), amount),
        };
        let json = serde_json::to_value(PaymentRecordedResponse::from(receipt)).unwrap();
        assert_eq!(json["loan_id"], json!(loan.loan_id));
        assert_eq!(json["message"], json!(PAYMENT_RECORDED));
        assert_eq!(json["remaining_balance"], json!(60000.0));
        assert_eq!(json["emis_left"], json!(12));
    }

    #[test]
    fn test_ledger_response_shape() {
        let (loan, _) = Loan::issue("cust_123", dec!(1000), 1, dec!(12)).unwrap();
        let payment = Payment::new(
            loan.loan_id.clone(),
            Amount::new(dec!(93.333)).unwrap(),
            PaymentType::Emi,
        );
        let view = build_ledger_view(&loan, vec![payment]).unwrap();
        let json = serde_json::to_value(LedgerResponse::from(view)).unwrap();

        assert_eq!(json["total_amount"], json!(1120.0));
        assert_eq!(json["monthly_emi"], json!(93.33));
        assert_eq!(json["status"], json!("ACTIVE"));
        assert_eq!(json["transactions"][0]["type"], json!("EMI"));
        assert_eq!(json["transactions"][0]["amount"], json!(93.33));
    }
}
