use async_trait::async_trait;
use rust_decimal::Decimal;

use banknode_types::{AccountNumber, Result};

/// Account operations shared by every connection of a node.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Open a new account with a zero balance.
    async fn create_account(&self) -> Result<AccountNumber>;

    /// Add `amount` to an account and return the new balance.
    async fn deposit(&self, number: AccountNumber, amount: Decimal) -> Result<Decimal>;

    /// Take `amount` from an account and return the new balance.
    async fn withdraw(&self, number: AccountNumber, amount: Decimal) -> Result<Decimal>;

    async fn balance_of(&self, number: AccountNumber) -> Result<Decimal>;

    /// Remove an empty account.
    async fn delete_account(&self, number: AccountNumber) -> Result<()>;

    /// Sum of all balances.
    async fn total_funds(&self) -> Result<Decimal>;

    /// Number of open accounts.
    async fn account_count(&self) -> Result<usize>;
}
