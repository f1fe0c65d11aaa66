use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of an account owned by a bank node.
///
/// Deserialization goes through `TryFrom<u32>`, so a loaded number is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AccountNumber(u32);

impl AccountNumber {
    pub const MIN: u32 = 10_000;
    pub const MAX: u32 = 99_999;
    pub const FIRST: AccountNumber = AccountNumber(Self::MIN);

    /// Returns `None` when `value` is outside `MIN..=MAX`.
    pub fn new(value: u32) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then_some(AccountNumber(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for AccountNumber {
    type Error = AddressError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        AccountNumber::new(value).ok_or(AddressError::NumberOutOfRange)
    }
}

impl From<AccountNumber> for u32 {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an `<number>/<host>` token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("expected <number>/<host>")]
    MissingSeparator,

    #[error("account number is not an integer")]
    BadNumber,

    #[error("account number must be within 10000-99999")]
    NumberOutOfRange,

    #[error("host part is empty or contains a slash")]
    BadHost,
}

/// An account number together with the bank code of the node that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountAddress {
    pub number: AccountNumber,
    pub host: String,
}

impl AccountAddress {
    pub fn new(number: AccountNumber, host: impl Into<String>) -> Self {
        Self {
            number,
            host: host.into(),
        }
    }

    pub fn is_local(&self, bank_code: &str) -> bool {
        self.host == bank_code
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (number, host) = token
            .split_once('/')
            .ok_or(AddressError::MissingSeparator)?;
        if host.is_empty() || host.contains('/') {
            return Err(AddressError::BadHost);
        }
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::BadNumber);
        }
        let value: u32 = number
            .parse()
            .map_err(|_| AddressError::NumberOutOfRange)?;
        let number = AccountNumber::new(value).ok_or(AddressError::NumberOutOfRange)?;
        Ok(AccountAddress::new(number, host))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_range() {
        assert!(AccountNumber::new(9_999).is_none());
        assert_eq!(AccountNumber::new(10_000), Some(AccountNumber::FIRST));
        assert!(AccountNumber::new(99_999).is_some());
        assert!(AccountNumber::new(100_000).is_none());
    }

    #[test]
    fn test_try_from_checks_range() {
        assert_eq!(AccountNumber::try_from(10_500).map(u32::from), Ok(10_500));
        assert_eq!(
            AccountNumber::try_from(5),
            Err(AddressError::NumberOutOfRange)
        );
    }

    #[test]
    fn test_address_error_messages() {
        let err: &dyn std::error::Error = &AddressError::MissingSeparator;
        assert_eq!(err.to_string(), "expected <number>/<host>");
    }

    #[test]
    fn test_parse_address() {
        let addr: AccountAddress = "10001/10.1.2.3".parse().unwrap();
        assert_eq!(addr.number.get(), 10_001);
        assert_eq!(addr.host, "10.1.2.3");
        assert_eq!(addr.to_string(), "10001/10.1.2.3");
        assert!(addr.is_local("10.1.2.3"));
        assert!(!addr.is_local("10.1.2.4"));
    }

    #[test]
    fn test_parse_textual_host() {
        let addr: AccountAddress = "12345/bank.example".parse().unwrap();
        assert_eq!(addr.host, "bank.example");
    }

    #[test]
    fn test_parse_address_errors() {
        assert_eq!(
            "10001".parse::<AccountAddress>(),
            Err(AddressError::MissingSeparator)
        );
        assert_eq!(
            "abc/10.0.0.1".parse::<AccountAddress>(),
            Err(AddressError::BadNumber)
        );
        assert_eq!(
            "-10001/10.0.0.1".parse::<AccountAddress>(),
            Err(AddressError::BadNumber)
        );
        assert_eq!(
            "5/10.0.0.1".parse::<AccountAddress>(),
            Err(AddressError::NumberOutOfRange)
        );
        assert_eq!(
            "99999999999/10.0.0.1".parse::<AccountAddress>(),
            Err(AddressError::NumberOutOfRange)
        );
        assert_eq!(
            "10001/".parse::<AccountAddress>(),
            Err(AddressError::BadHost)
        );
        assert_eq!(
            "10001/a/b".parse::<AccountAddress>(),
            Err(AddressError::BadHost)
        );
    }
}
