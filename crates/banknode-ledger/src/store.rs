use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use banknode_types::{AccountNumber, Result};

use crate::persist::{FileStore, SnapshotStore};
use crate::snapshot::LedgerSnapshot;
use crate::traits::Ledger;

/// The authoritative account table of a node.
///
/// Mutations hold the write lock across the durable save, so readers only ever
/// observe states that have been persisted. A failed save leaves memory untouched.
pub struct LedgerStore {
    state: RwLock<LedgerSnapshot>,
    backend: Arc<dyn SnapshotStore>,
}

impl LedgerStore {
    /// Open a file-backed ledger. A missing file yields an empty ledger.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_backend(Arc::new(FileStore::new(path.as_ref()))).await
    }

    pub async fn with_backend(backend: Arc<dyn SnapshotStore>) -> Result<Self> {
        let snapshot = match backend.load().await? {
            Some(snapshot) => {
                info!(
                    accounts = snapshot.account_count(),
                    next_account = snapshot.next_account,
                    "Ledger loaded"
                );
                snapshot
            }
            None => {
                info!("No saved ledger found, starting empty");
                LedgerSnapshot::default()
            }
        };
        Ok(Self {
            state: RwLock::new(snapshot),
            backend,
        })
    }

    /// Flush the current state one last time.
    pub async fn close(&self) -> Result<()> {
        let state = self.state.read().await;
        self.backend.save(&state).await?;
        info!(accounts = state.account_count(), "Ledger closed");
        Ok(())
    }

    #[cfg(test)]
    async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.clone()
    }

    async fn mutate<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&mut LedgerSnapshot) -> Result<T> + Send,
    ) -> Result<T>
    where
        T: Send,
    {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = apply(&mut next)?;
        if let Err(err) = self.backend.save(&next).await {
            error!(op, error = %err, "Failed to persist ledger, mutation discarded");
            return Err(err);
        }
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl Ledger for LedgerStore {
    async fn create_account(&self) -> Result<AccountNumber> {
        let number = self.mutate("create", |s| s.create_account()).await?;
        info!(account = %number, "Account created");
        Ok(number)
    }

    async fn deposit(&self, number: AccountNumber, amount: Decimal) -> Result<Decimal> {
        let balance = self.mutate("deposit", |s| s.deposit(number, amount)).await?;
        info!(account = %number, %amount, %balance, "Deposit applied");
        Ok(balance)
    }

    async fn withdraw(&self, number: AccountNumber, amount: Decimal) -> Result<Decimal> {
        let balance = self.mutate("withdraw", |s| s.withdraw(number, amount)).await?;
        info!(account = %number, %amount, %balance, "Withdrawal applied");
        Ok(balance)
    }

    async fn balance_of(&self, number: AccountNumber) -> Result<Decimal> {
        self.state.read().await.balance_of(number)
    }

    async fn delete_account(&self, number: AccountNumber) -> Result<()> {
        self.mutate("delete", |s| s.delete_account(number)).await?;
        info!(account = %number, "Account removed");
        Ok(())
    }

    async fn total_funds(&self) -> Result<Decimal> {
        self.state.read().await.total_funds()
    }

    async fn account_count(&self) -> Result<usize> {
        Ok(self.state.read().await.account_count())
    }
}
