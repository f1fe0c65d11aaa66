use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use banknode_types::{AccountAddress, AddressError, parse_amount};

/// One request line of the bank protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `BC`
    BankCode,
    /// `AC`
    AccountCreate,
    /// `AD <addr> <amount>`
    Deposit {
        address: AccountAddress,
        amount: Decimal,
    },
    /// `AW <addr> <amount>`
    Withdraw {
        address: AccountAddress,
        amount: Decimal,
    },
    /// `AB <addr>`
    Balance { address: AccountAddress },
    /// `AR <addr>`
    AccountRemove { address: AccountAddress },
    /// `BA`
    TotalAssets,
    /// `BN`
    AccountCount,
}

/// Longest request line accepted, excluding the line terminator.
pub const MAX_LINE_BYTES: usize = 1024;

/// Longest client token quoted back in an error message.
const MAX_ECHO_CHARS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("Unknown command '{0}'")]
    UnknownOpcode(String),

    #[error("{opcode} expects {expected} argument(s), got {found}")]
    WrongArity {
        opcode: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Malformed account address '{token}': {reason}")]
    MalformedAddress { token: String, reason: AddressError },

    #[error("Malformed amount '{0}'")]
    MalformedAmount(String),
}

impl Command {
    /// Parse a single line (without its terminator).
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let opcode = tokens.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = tokens.collect();

        let command = match opcode {
            "BC" => {
                take_args::<0>("BC", &args)?;
                Command::BankCode
            }
            "AC" => {
                take_args::<0>("AC", &args)?;
                Command::AccountCreate
            }
            "AD" => {
                let [address, amount] = take_args::<2>("AD", &args)?;
                Command::Deposit {
                    address: parse_address(address)?,
                    amount: parse_amount_token(amount)?,
                }
            }
            "AW" => {
                let [address, amount] = take_args::<2>("AW", &args)?;
                Command::Withdraw {
                    address: parse_address(address)?,
                    amount: parse_amount_token(amount)?,
                }
            }
            "AB" => {
                let [address] = take_args::<1>("AB", &args)?;
                Command::Balance {
                    address: parse_address(address)?,
                }
            }
            "AR" => {
                let [address] = take_args::<1>("AR", &args)?;
                Command::AccountRemove {
                    address: parse_address(address)?,
                }
            }
            "BA" => {
                take_args::<0>("BA", &args)?;
                Command::TotalAssets
            }
            "BN" => {
                take_args::<0>("BN", &args)?;
                Command::AccountCount
            }
            other => return Err(ParseError::UnknownOpcode(echo(other))),
        };
        Ok(command)
    }

    pub fn opcode(&self) -> &'static str {
        match self {
            Command::BankCode => "BC",
            Command::AccountCreate => "AC",
            Command::Deposit { .. } => "AD",
            Command::Withdraw { .. } => "AW",
            Command::Balance { .. } => "AB",
            Command::AccountRemove { .. } => "AR",
            Command::TotalAssets => "BA",
            Command::AccountCount => "BN",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::AccountCreate
                | Command::Deposit { .. }
                | Command::Withdraw { .. }
                | Command::AccountRemove { .. }
        )
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Command::parse(line)
    }
}

fn take_args<'a, const N: usize>(
    opcode: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], ParseError> {
    <[&'a str; N]>::try_from(args).map_err(|_| ParseError::WrongArity {
        opcode,
        expected: N,
        found: args.len(),
    })
}

/// Client text as quoted in error messages, cut to `MAX_ECHO_CHARS`.
fn echo(token: &str) -> String {
    match token.char_indices().nth(MAX_ECHO_CHARS) {
        Some((cut, _)) => format!("{}...", &token[..cut]),
        None => token.to_string(),
    }
}

fn parse_address(token: &str) -> Result<AccountAddress, ParseError> {
    token
        .parse()
        .map_err(|reason| ParseError::MalformedAddress {
            token: echo(token),
            reason,
        })
}

fn parse_amount_token(token: &str) -> Result<Decimal, ParseError> {
    parse_amount(token).ok_or_else(|| ParseError::MalformedAmount(echo(token)))
}
