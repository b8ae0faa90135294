use crate::domain::amortization::{PaymentOutcome, apply_payment};
use crate::domain::customer::Customer;
use crate::domain::ledger::{AccountOverview, LedgerView, build_account_overview, build_ledger_view};
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentType};
use crate::domain::ports::{CustomerStoreBox, LoanStoreBox};
use crate::error::{LendingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Inputs of a LEND request.
#[derive(Debug, Clone, Deserialize)]
pub struct LendRequest {
    pub customer_id: String,
    pub loan_amount: Decimal,
    pub loan_period_years: u32,
    pub interest_rate_yearly: Decimal,
}

/// Inputs of a PAYMENT request. The payment type is kept raw so an unknown
/// value surfaces as a validation error.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub payment_type: String,
}

/// Result of a LEND request, at full precision.
#[derive(Debug, Clone)]
pub struct LoanReceipt {
    pub loan: Loan,
    pub total_payable: Decimal,
}

/// Result of a PAYMENT request, at full precision.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub outcome: PaymentOutcome,
}

/// Entry point for every lending operation.
///
/// `LendingService` validates requests, runs the amortization rules and
/// persists the results through the injected stores. Payments are applied
/// under the write side of a service-wide lock, so two payments against the
/// same loan cannot both read the same balance. Ledger and overview reads hold
/// the read side, so they never see a payment without its balance update.
pub struct LendingService {
    loans: LoanStoreBox,
    customers: CustomerStoreBox,
    ledger_lock: RwLock<()>,
}

impl LendingService {
    /// Creates a new `LendingService` instance.
    ///
    /// # Arguments
    ///
    /// * `loans` - The store for loans and their payments.
    /// * `customers` - The store for customer records.
    pub fn new(loans: LoanStoreBox, customers: CustomerStoreBox) -> Self {
        Self {
            loans,
            customers,
            ledger_lock: RwLock::new(()),
        }
    }

    /// LEND: issues a loan and stores it with its opening balance.
    pub async fn lend(&self, request: LendRequest) -> Result<LoanReceipt> {
        let customer_id = require_id("customer_id", &request.customer_id)?;
        let (loan, terms) = Loan::issue(
            customer_id,
            request.loan_amount,
            request.loan_period_years,
            request.interest_rate_yearly,
        )?;

        self.loans.create_loan(loan.clone()).await?;
        info!(
            loan_id = %loan.loan_id,
            customer_id = %loan.customer_id,
            total_payable = %terms.total_payable,
            monthly_emi = %terms.monthly_installment,
            "loan created"
        );

        Ok(LoanReceipt {
            loan,
            total_payable: terms.total_payable,
        })
    }

    /// PAYMENT: applies a payment to a loan and records it.
    ///
    /// Payments against a loan that is already paid off are rejected.
    pub async fn record_payment(
        &self,
        loan_id: &str,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt> {
        let loan_id = require_id("loan_id", loan_id)?;
        let amount = Amount::new(request.amount)?;
        let payment_type: PaymentType = request.payment_type.parse()?;

        let _guard = self.ledger_lock.write().await;
        let loan = self.find_loan(loan_id).await?;
        if loan.is_paid_off() {
            warn!(loan_id, "payment rejected, loan already paid off");
            return Err(LendingError::ValidationError(format!(
                "Loan {loan_id} is already paid off"
            )));
        }

        let terms = loan.original_terms()?;
        let outcome = apply_payment(loan.balance, &terms, amount);
        let status = LoanStatus::for_balance(outcome.new_balance);
        let payment = Payment::new(loan_id, amount, payment_type);
        self.loans
            .commit_payment(payment.clone(), outcome.new_balance, status)
            .await?;

        info!(
            loan_id,
            payment_id = %payment.payment_id,
            amount = %amount.value(),
            payment_type = %payment_type,
            remaining = %outcome.new_balance.value(),
            emis_left = outcome.installments_remaining,
            "payment recorded"
        );
        if outcome.is_paid_off {
            info!(loan_id, "loan paid off");
        }

        Ok(PaymentReceipt { payment, outcome })
    }

    /// LEDGER: the loan snapshot and its ordered transaction history.
    pub async fn ledger(&self, loan_id: &str) -> Result<LedgerView> {
        let loan_id = require_id("loan_id", loan_id)?;
        let _guard = self.ledger_lock.read().await;
        let loan = self.find_loan(loan_id).await?;
        let payments = self.loans.list_payments_for_loan(loan_id).await?;
        debug!(loan_id, payments = payments.len(), "building ledger");
        build_ledger_view(&loan, payments)
    }

    /// ACCOUNT OVERVIEW: a summary of every loan owned by the customer.
    ///
    /// A customer without loans is `NotFound`, whether or not the customer is
    /// registered.
    pub async fn overview(&self, customer_id: &str) -> Result<AccountOverview> {
        let customer_id = require_id("customer_id", customer_id)?;
        let _guard = self.ledger_lock.read().await;
        let loans = self.loans.list_loans_for_customer(customer_id).await?;

        let mut payments_by_loan = HashMap::with_capacity(loans.len());
        for loan in &loans {
            let payments = self.loans.list_payments_for_loan(&loan.loan_id).await?;
            payments_by_loan.insert(loan.loan_id.clone(), payments);
        }

        let customer_name = if loans.is_empty() {
            None
        } else {
            self.customers
                .get_customer(customer_id)
                .await?
                .map(|customer| customer.name)
        };
        debug!(customer_id, loans = loans.len(), "building overview");
        build_account_overview(customer_id, customer_name, &loans, &payments_by_loan)
    }

    /// Registers a customer or renames an existing one.
    pub async fn register_customer(&self, customer_id: &str, name: &str) -> Result<Customer> {
        let customer_id = require_id("customer_id", customer_id)?;
        let customer = match self.customers.get_customer(customer_id).await? {
            Some(existing) => Customer {
                name: name.to_string(),
                ..existing
            },
            None => Customer::new(customer_id, name)?,
        };
        if customer.name.trim().is_empty() {
            return Err(LendingError::ValidationError(
                "Customer name must not be empty".to_string(),
            ));
        }
        self.customers.upsert_customer(customer.clone()).await?;
        info!(customer_id, "customer registered");
        Ok(customer)
    }

    async fn find_loan(&self, loan_id: &str) -> Result<Loan> {
        self.loans
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| LendingError::NotFound(format!("Loan {loan_id}")))
    }
}

fn require_id<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(LendingError::ValidationError(format!(
            "Missing required parameter: {field}"
        )))
    } else {
        Ok(value)
    }
}
