use super::in_memory::LedgerState;
use crate::domain::customer::Customer;
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::money::Balance;
use crate::domain::payment::Payment;
use crate::domain::ports::{CustomerStore, LoanStore};
use crate::error::{LendingError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

/// A persistent store that keeps every record in one JSON file.
///
/// Each mutation is applied to a copy of the state, written to a temporary
/// file next to the target and renamed over it. The rename is atomic, so a
/// payment and its balance update reach disk together or not at all, and a
/// failed write leaves both the file and the in-memory state unchanged.
///
/// The file is serialized and fsynced on the blocking pool while the state
/// lock is held, so writes are serialized with each other.
/// Clones share the same state and file.
#[derive(Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    state: Arc<RwLock<LedgerState>>,
}

impl SnapshotStore {
    /// Opens the snapshot at `path`, starting empty if the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let mut state: LedgerState = serde_json::from_reader(reader)?;
            state.reindex();
            state
        } else {
            LedgerState::default()
        };
        debug!(path = %path.display(), "opened snapshot store");
        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut LedgerState) -> Result<()>,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        apply(&mut next)?;
        let path = self.path.clone();
        let next = tokio::task::spawn_blocking(move || {
            persist(&path, &next)?;
            Ok::<_, LendingError>(next)
        })
        .await
        .map_err(|e| LendingError::persistence(format!("snapshot writer failed: {e}")))??;
        *guard = next;
        Ok(())
    }
}

fn persist(path: &Path, state: &LedgerState) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, state)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl LoanStore for SnapshotStore {
    async fn create_loan(&self, loan: Loan) -> Result<()> {
        self.mutate(|state| state.create_loan(loan)).await
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
        self.mutate(|state| state.update_balance(loan_id, balance, status))
            .await
    }

    async fn list_loans_for_customer(&self, customer_id: &str) -> Result<Vec<Loan>> {
        Ok(self.state.read().await.loans_for_customer(customer_id))
    }

    async fn record_payment(&self, payment: Payment) -> Result<()> {
        self.mutate(|state| state.record_payment(payment)).await
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
        self.mutate(|state| state.commit_payment(payment, balance, status))
            .await
    }
}

#[async_trait]
impl CustomerStore for SnapshotStore {
    async fn upsert_customer(&self, customer: Customer) -> Result<()> {
        self.mutate(|state| {
            state.upsert_customer(customer);
            Ok(())
        })
        .await
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>> {
        Ok(self.state.read().await.customer(customer_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::payment::PaymentType;
    use crate::error::LendingError;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let (loan, _) = Loan::issue("cust_123", dec!(100000), 2, dec!(10)).unwrap();
        let payment = Payment::new(
            loan.loan_id.clone(),
            Amount::new(dec!(60000)).unwrap(),
            PaymentType::LumpSum,
        );
        {
            let store = SnapshotStore::open(&path).unwrap();
            store.create_loan(loan.clone()).await.unwrap();
            store
                .commit_payment(payment.clone(), Balance::new(dec!(60000)), LoanStatus::Active)
                .await
                .unwrap();
            store
                .upsert_customer(Customer::new("cust_123", "Alice Smith").unwrap())
                .await
                .unwrap();
        }

        let reopened = SnapshotStore::open(&path).unwrap();
        let stored = reopened.get_loan(&loan.loan_id).await.unwrap().unwrap();
        assert_eq!(stored.balance, Balance::new(dec!(60000)));
        assert_eq!(
            reopened.list_payments_for_loan(&loan.loan_id).await.unwrap(),
            vec![payment.clone()]
        );
        assert_eq!(
            reopened.get_customer("cust_123").await.unwrap().unwrap().name,
            "Alice Smith"
        );

        // The payment index is rebuilt on open, so replays are still rejected.
        let replay = reopened
            .commit_payment(payment, Balance::ZERO, LoanStatus::PaidOff)
            .await;
        assert!(matches!(replay, Err(LendingError::PersistenceError(_))));
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::open(dir.path().join("ledger.json")).unwrap();

        let result = store
            .update_loan_balance("missing", Balance::ZERO, LoanStatus::PaidOff)
            .await;
        assert!(matches!(result, Err(LendingError::NotFound(_))));
        assert!(!dir.path().join("ledger.json").exists());
    }

    #[test]
    fn test_corrupt_snapshot_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SnapshotStore::open(&path),
            Err(LendingError::PersistenceError(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_all_reach_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = SnapshotStore::open(&path).unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let (loan, _) = Loan::issue(format!("cust_{i}"), dec!(1000), 1, dec!(5)).unwrap();
                store.create_loan(loan).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = SnapshotStore::open(&path).unwrap();
        for i in 0..8 {
            let loans = reopened
                .list_loans_for_customer(&format!("cust_{i}"))
                .await
                .unwrap();
            assert_eq!(loans.len(), 1);
        }
    }
}
