use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use banknode_types::{AMOUNT_SCALE, AccountNumber, BankError, Result, validate_amount};

/// The full account table of one node; the unit that gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Next account number to hand out. Never decreases, even when accounts are removed.
    pub next_account: u32,
    pub accounts: BTreeMap<AccountNumber, Decimal>,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        Self {
            next_account: AccountNumber::MIN,
            accounts: BTreeMap::new(),
        }
    }
}

impl LedgerSnapshot {
    /// Allocate a fresh account number and open the account with a zero balance.
    pub fn create_account(&mut self) -> Result<AccountNumber> {
        let number = AccountNumber::new(self.next_account).ok_or(BankError::AccountLimitReached)?;
        self.next_account += 1;
        self.accounts.insert(number, Decimal::ZERO);
        Ok(number)
    }

    pub fn deposit(&mut self, number: AccountNumber, amount: Decimal) -> Result<Decimal> {
        let amount = validate_amount(amount)?;
        let balance = self
            .accounts
            .get_mut(&number)
            .ok_or(BankError::NotFound(number))?;
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| BankError::Overflow(format!("depositing {amount} into {number}")))?;
        Ok(*balance)
    }

    pub fn withdraw(&mut self, number: AccountNumber, amount: Decimal) -> Result<Decimal> {
        let amount = validate_amount(amount)?;
        let balance = self
            .accounts
            .get_mut(&number)
            .ok_or(BankError::NotFound(number))?;
        if amount > *balance {
            return Err(BankError::InsufficientFunds {
                balance: *balance,
                requested: amount,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    pub fn balance_of(&self, number: AccountNumber) -> Result<Decimal> {
        self.accounts
            .get(&number)
            .copied()
            .ok_or(BankError::NotFound(number))
    }

    /// Remove an account. Only empty accounts can be removed.
    pub fn delete_account(&mut self, number: AccountNumber) -> Result<()> {
        let balance = self.balance_of(number)?;
        if !balance.is_zero() {
            return Err(BankError::NonZeroBalance { number, balance });
        }
        self.accounts.remove(&number);
        Ok(())
    }

    /// Sum of all balances. Each balance fits a `Decimal`, their sum may not.
    pub fn total_funds(&self) -> Result<Decimal> {
        self.accounts
            .values()
            .try_fold(Decimal::ZERO, |total, balance| total.checked_add(*balance))
            .ok_or_else(|| BankError::Overflow("total of all balances".into()))
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Check the invariants a loaded snapshot must satisfy.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.next_account < AccountNumber::MIN {
            return Err(format!(
                "next_account {} is below {}",
                self.next_account,
                AccountNumber::MIN
            ));
        }
        for (number, balance) in &self.accounts {
            if *balance < Decimal::ZERO {
                return Err(format!("account {number} has negative balance {balance}"));
            }
            if balance.normalize().scale() > AMOUNT_SCALE {
                return Err(format!(
                    "account {number} balance {balance} has more than {AMOUNT_SCALE} decimal places"
                ));
            }
            if number.get() >= self.next_account {
                return Err(format!(
                    "account {number} is not below next_account {}",
                    self.next_account
                ));
            }
        }
        Ok(())
    }
}
