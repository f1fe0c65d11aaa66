use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::AccountNumber;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    #[error("Account not found: {0}")]
    NotFound(AccountNumber),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("Account {number} still holds {balance}")]
    NonZeroBalance {
        number: AccountNumber,
        balance: Decimal,
    },

    #[error("Account belongs to bank {host}, this node is {bank_code}")]
    ForeignAccount { host: String, bank_code: String },

    #[error("No account numbers left on this node")]
    AccountLimitReached,

    #[error("Amount overflow: {0}")]
    Overflow(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BankError {
    /// Stable wire code used in `ER` response lines.
    pub fn code(&self) -> &'static str {
        match self {
            BankError::NotFound(_) => "NOT_FOUND",
            BankError::InvalidAmount(_) => "INVALID_AMOUNT",
            BankError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BankError::NonZeroBalance { .. } => "NON_ZERO_BALANCE",
            BankError::ForeignAccount { .. } => "FOREIGN_ACCOUNT",
            BankError::AccountLimitReached => "ACCOUNT_LIMIT",
            BankError::Overflow(_) => "OVERFLOW",
            BankError::Storage(_) => "STORAGE",
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, BankError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, BankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            BankError::NotFound(AccountNumber::FIRST),
            BankError::InvalidAmount("0".into()),
            BankError::InsufficientFunds {
                balance: Decimal::ZERO,
                requested: Decimal::ONE,
            },
            BankError::NonZeroBalance {
                number: AccountNumber::FIRST,
                balance: Decimal::ONE,
            },
            BankError::ForeignAccount {
                host: "10.0.0.2".into(),
                bank_code: "10.0.0.1".into(),
            },
            BankError::AccountLimitReached,
            BankError::Overflow("total".into()),
            BankError::Storage("disk full".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(BankError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_mentions_account() {
        let err = BankError::NotFound(AccountNumber::FIRST);
        assert_eq!(err.to_string(), "Account not found: 10000");
    }
}
