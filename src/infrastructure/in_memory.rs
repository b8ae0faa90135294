use crate::domain::customer::Customer;
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::money::Balance;
use crate::domain::payment::Payment;
use crate::domain::ports::{CustomerStore, LoanStore};
use crate::error::{LendingError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The full set of records kept by the in-memory and snapshot stores.
///
/// Every mutation validates first and only then writes, so a failed call
/// leaves the state untouched.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct LedgerState {
    customers: BTreeMap<String, Customer>,
    loans: BTreeMap<String, Loan>,
    payments: BTreeMap<String, Vec<Payment>>,
    #[serde(skip)]
    payment_ids: HashSet<String>,
}

impl LedgerState {
    /// Rebuilds derived indexes after deserialization.
    pub(crate) fn reindex(&mut self) {
        self.payment_ids = self
            .payments
            .values()
            .flatten()
            .map(|p| p.payment_id.clone())
            .collect();
    }

    pub(crate) fn upsert_customer(&mut self, customer: Customer) {
        self.customers.insert(customer.customer_id.clone(), customer);
    }

    pub(crate) fn customer(&self, customer_id: &str) -> Option<Customer> {
        self.customers.get(customer_id).cloned()
    }

    pub(crate) fn create_loan(&mut self, loan: Loan) -> Result<()> {
        if self.loans.contains_key(&loan.loan_id) {
            return Err(LendingError::persistence(format!(
                "Loan {} already exists",
                loan.loan_id
            )));
        }
        self.loans.insert(loan.loan_id.clone(), loan);
        Ok(())
    }

    pub(crate) fn loan(&self, loan_id: &str) -> Option<Loan> {
        self.loans.get(loan_id).cloned()
    }

    pub(crate) fn update_balance(
        &mut self,
        loan_id: &str,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        let loan = self
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| LendingError::NotFound(format!("Loan {loan_id}")))?;
        loan.balance = balance;
        loan.status = status;
        Ok(())
    }

    pub(crate) fn loans_for_customer(&self, customer_id: &str) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|loan| loan.customer_id == customer_id)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.created_at);
        loans
    }

    pub(crate) fn record_payment(&mut self, payment: Payment) -> Result<()> {
        self.check_payment(&payment)?;
        self.append_payment(payment);
        Ok(())
    }

    pub(crate) fn payments_for_loan(&self, loan_id: &str) -> Vec<Payment> {
        let mut payments = self.payments.get(loan_id).cloned().unwrap_or_default();
        payments.sort_by_key(|p| p.paid_at);
        payments
    }

    pub(crate) fn commit_payment(
        &mut self,
        payment: Payment,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        self.check_payment(&payment)?;
        let loan_id = payment.loan_id.clone();
        self.append_payment(payment);
        self.update_balance(&loan_id, balance, status)
    }

    fn check_payment(&self, payment: &Payment) -> Result<()> {
        if !self.loans.contains_key(&payment.loan_id) {
            return Err(LendingError::NotFound(format!("Loan {}", payment.loan_id)));
        }
        if self.payment_ids.contains(&payment.payment_id) {
            return Err(LendingError::persistence(format!(
                "Payment {} already recorded",
                payment.payment_id
            )));
        }
        Ok(())
    }

    fn append_payment(&mut self, payment: Payment) {
        self.payment_ids.insert(payment.payment_id.clone());
        self.payments
            .entry(payment.loan_id.clone())
            .or_default()
            .push(payment);
    }
}

/// A thread-safe in-memory store for loans, payments and customers.
///
/// Clones share the same state. Nothing survives the process; use it for
/// tests and single-invocation sessions.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for InMemoryStore {
    async fn create_loan(&self, loan: Loan) -> Result<()> {
        self.state.write().await.create_loan(loan)
    }

    async fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        Ok(self.state.read().await.loan(loan_id))
    }

    async fn update_loan_balance(
        &self,
        loan_id: &str,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        self.state
            .write()
            .await
            .update_balance(loan_id, balance, status)
    }

    async fn list_loans_for_customer(&self, customer_id: &str) -> Result<Vec<Loan>> {
        Ok(self.state.read().await.loans_for_customer(customer_id))
    }

    async fn record_payment(&self, payment: Payment) -> Result<()> {
        self.state.write().await.record_payment(payment)
    }

    async fn list_payments_for_loan(&self, loan_id: &str) -> Result<Vec<Payment>> {
        Ok(self.state.read().await.payments_for_loan(loan_id))
    }

    async fn commit_payment(
        &self,
        payment: Payment,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        self.state
            .write()
            .await
            .commit_payment(payment, balance, status)
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn upsert_customer(&self, customer: Customer) -> Result<()> {
        self.state.write().await.upsert_customer(customer);
        Ok(())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customer(customer_id))
    }
}
