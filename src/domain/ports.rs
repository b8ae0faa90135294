use super::customer::Customer;
use super::loan::{Loan, LoanStatus};
use super::money::Balance;
use super::payment::Payment;
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for loans and their payments.
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn create_loan(&self, loan: Loan) -> Result<()>;
    async fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>>;
    /// Fails with `NotFound` when the loan does not exist.
    async fn update_loan_balance(
        &self,
        loan_id: &str,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()>;
    /// Loans owned by the customer, oldest first. Empty when there are none.
    async fn list_loans_for_customer(&self, customer_id: &str) -> Result<Vec<Loan>>;
    /// Appends a payment. Recording the same payment id twice is an error.
    async fn record_payment(&self, payment: Payment) -> Result<()>;
    /// Payments of a loan ordered by `paid_at`, oldest first.
    async fn list_payments_for_loan(&self, loan_id: &str) -> Result<Vec<Payment>>;
    /// Records `payment` and moves its loan to `balance`/`status` as one
    /// atomic write: either both land or neither does.
    async fn commit_payment(
        &self,
        payment: Payment,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn upsert_customer(&self, customer: Customer) -> Result<()>;
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>>;
}

pub type LoanStoreBox = Box<dyn LoanStore>;
pub type CustomerStoreBox = Box<dyn CustomerStore>;
