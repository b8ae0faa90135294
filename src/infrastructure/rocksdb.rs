use crate::domain::customer::Customer;
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::money::Balance;
use crate::domain::payment::Payment;
use crate::domain::ports::{CustomerStore, LoanStore};
use crate::error::{LendingError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for loan records, keyed by loan id.
pub const CF_LOANS: &str = "loans";
/// Column Family for payments, keyed by loan id, payment time and payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family marking payment ids already recorded.
pub const CF_PAYMENT_IDS: &str = "payment_ids";
/// Column Family indexing loan ids by customer id.
pub const CF_CUSTOMER_LOANS: &str = "customer_loans";
/// Column Family for customer records.
pub const CF_CUSTOMERS: &str = "customers";

const ALL_CFS: [&str; 5] = [
    CF_LOANS,
    CF_PAYMENTS,
    CF_PAYMENT_IDS,
    CF_CUSTOMER_LOANS,
    CF_CUSTOMERS,
];

const KEY_SEPARATOR: u8 = 0;

/// A persistent store implementation using RocksDB.
///
/// Loans, payments and customers live in separate Column Families. Composite
/// keys put a separator byte between their parts so prefix scans over one
/// loan or one customer stay ordered.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LendingError::persistence(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    /// Values of every entry in `cf_name` whose key starts with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(value);
        }
        Ok(values)
    }

    fn put_loan(&self, batch: &mut WriteBatch, loan: &Loan) -> Result<()> {
        batch.put_cf(self.cf(CF_LOANS)?, loan.loan_id.as_bytes(), to_json(loan)?);
        Ok(())
    }

    fn put_payment(&self, batch: &mut WriteBatch, payment: &Payment) -> Result<()> {
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            payment_key(payment),
            to_json(payment)?,
        );
        batch.put_cf(
            self.cf(CF_PAYMENT_IDS)?,
            payment.payment_id.as_bytes(),
            payment.loan_id.as_bytes(),
        );
        Ok(())
    }

    fn check_payment(&self, payment: &Payment) -> Result<Loan> {
        let loan = self
            .get_json::<Loan>(CF_LOANS, payment.loan_id.as_bytes())?
            .ok_or_else(|| LendingError::NotFound(format!("Loan {}", payment.loan_id)))?;
        if self.contains(CF_PAYMENT_IDS, payment.payment_id.as_bytes())? {
            return Err(LendingError::persistence(format!(
                "Payment {} already recorded",
                payment.payment_id
            )));
        }
        Ok(loan)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn prefixed(prefix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1);
    key.extend_from_slice(prefix.as_bytes());
    key.push(KEY_SEPARATOR);
    key
}

/// Microsecond timestamp with the sign bit flipped so big-endian bytes sort
/// chronologically.
fn sortable_micros(payment: &Payment) -> [u8; 8] {
    ((payment.paid_at.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes()
}

fn payment_key(payment: &Payment) -> Vec<u8> {
    let mut key = prefixed(&payment.loan_id);
    key.extend_from_slice(&sortable_micros(payment));
    key.extend_from_slice(payment.payment_id.as_bytes());
    key
}

fn customer_loan_key(loan: &Loan) -> Vec<u8> {
    let mut key = prefixed(&loan.customer_id);
    key.extend_from_slice(loan.loan_id.as_bytes());
    key
}

#[async_trait]
impl LoanStore for RocksDBStore {
    async fn create_loan(&self, loan: Loan) -> Result<()> {
        if self.contains(CF_LOANS, loan.loan_id.as_bytes())? {
            return Err(LendingError::persistence(format!(
                "Loan {} already exists",
                loan.loan_id
            )));
        }
        let mut batch = WriteBatch::default();
        self.put_loan(&mut batch, &loan)?;
        batch.put_cf(
            self.cf(CF_CUSTOMER_LOANS)?,
            customer_loan_key(&loan),
            loan.loan_id.as_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn get_loan(&self, loan_id: &str) -> Result<Option<Loan>> {
        self.get_json(CF_LOANS, loan_id.as_bytes())
    }

    async fn update_loan_balance(
        &self,
        loan_id: &str,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        let mut loan = self
            .get_json::<Loan>(CF_LOANS, loan_id.as_bytes())?
            .ok_or_else(|| LendingError::NotFound(format!("Loan {loan_id}")))?;
        loan.balance = balance;
        loan.status = status;
        let mut batch = WriteBatch::default();
        self.put_loan(&mut batch, &loan)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn list_loans_for_customer(&self, customer_id: &str) -> Result<Vec<Loan>> {
        let mut loans = Vec::new();
        for loan_id in self.scan_prefix(CF_CUSTOMER_LOANS, &prefixed(customer_id))? {
            if let Some(loan) = self.get_json::<Loan>(CF_LOANS, &loan_id)? {
                loans.push(loan);
            }
        }
        loans.sort_by_key(|loan| loan.created_at);
        Ok(loans)
    }

    async fn record_payment(&self, payment: Payment) -> Result<()> {
        self.check_payment(&payment)?;
        let mut batch = WriteBatch::default();
        self.put_payment(&mut batch, &payment)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn list_payments_for_loan(&self, loan_id: &str) -> Result<Vec<Payment>> {
        self.scan_prefix(CF_PAYMENTS, &prefixed(loan_id))?
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).map_err(LendingError::from))
            .collect()
    }

    async fn commit_payment(
        &self,
        payment: Payment,
        balance: Balance,
        status: LoanStatus,
    ) -> Result<()> {
        let mut loan = self.check_payment(&payment)?;
        loan.balance = balance;
        loan.status = status;

        let mut batch = WriteBatch::default();
        self.put_payment(&mut batch, &payment)?;
        self.put_loan(&mut batch, &loan)?;
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl CustomerStore for RocksDBStore {
    async fn upsert_customer(&self, customer: Customer) -> Result<()> {
        let cf = self.cf(CF_CUSTOMERS)?;
        self.db
            .put_cf(cf, customer.customer_id.as_bytes(), to_json(&customer)?)?;
        Ok(())
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        self.get_json(CF_CUSTOMERS, customer_id.as_bytes())
    }
}
