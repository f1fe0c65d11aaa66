use rust_decimal::Decimal;
use std::fmt;

use banknode_types::{AccountAddress, BankError, format_amount};

use crate::command::ParseError;

/// Wire code for lines that could not be parsed.
pub const PARSE_ERROR_CODE: &str = "PARSE";

/// Result of one command, rendered as a single response line by `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    BankCode(String),
    AccountCreated(AccountAddress),
    Deposited {
        address: AccountAddress,
        balance: Decimal,
    },
    Withdrawn {
        address: AccountAddress,
        balance: Decimal,
    },
    Balance {
        address: AccountAddress,
        balance: Decimal,
    },
    AccountRemoved(AccountAddress),
    TotalAssets(Decimal),
    AccountCount(usize),
    /// `ER <code> <message>`
    Error { code: &'static str, message: String },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Response::Error { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<BankError> for Response {
    fn from(err: BankError) -> Self {
        Response::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<ParseError> for Response {
    fn from(err: ParseError) -> Self {
        Response::Error {
            code: PARSE_ERROR_CODE,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::BankCode(code) => write!(f, "BC {code}"),
            Response::AccountCreated(address) => write!(f, "AC {address}"),
            Response::Deposited { address, balance } => {
                write!(f, "AD {address} {}", format_amount(*balance))
            }
            Response::Withdrawn { address, balance } => {
                write!(f, "AW {address} {}", format_amount(*balance))
            }
            Response::Balance { address, balance } => {
                write!(f, "AB {address} {}", format_amount(*balance))
            }
            Response::AccountRemoved(address) => write!(f, "AR {address}"),
            Response::TotalAssets(total) => write!(f, "BA {}", format_amount(*total)),
            Response::AccountCount(count) => write!(f, "BN {count}"),
            // One response per line.
            Response::Error { code, message } => {
                write!(f, "ER {code} {}", message.replace(['\r', '\n'], " "))
            }
        }
    }
}
