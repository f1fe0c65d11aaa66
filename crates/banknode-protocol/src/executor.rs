use std::sync::Arc;
use tracing::{debug, error, warn};

use banknode_ledger::Ledger;
use banknode_types::{AccountAddress, BankError, Result};

use crate::command::Command;
use crate::response::Response;

/// Applies parsed commands to the node's ledger.
#[derive(Clone)]
pub struct Executor {
    bank_code: String,
    ledger: Arc<dyn Ledger>,
}

impl Executor {
    pub fn new(bank_code: impl Into<String>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            bank_code: bank_code.into(),
            ledger,
        }
    }

    /// Parse and execute one line. Never fails: errors become `ER` responses.
    pub async fn handle_line(&self, line: &str) -> Response {
        match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(err) => {
                warn!(line, error = %err, "Rejected malformed command");
                err.into()
            }
        }
    }

    pub async fn execute(&self, command: Command) -> Response {
        let opcode = command.opcode();
        let mutation = command.is_mutation();
        debug!(opcode, mutation, "Executing command");
        match self.dispatch(command).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_storage() {
                    error!(opcode, mutation, error = %err, "Command failed");
                } else {
                    warn!(opcode, mutation, error = %err, "Command rejected");
                }
                err.into()
            }
        }
    }

    async fn dispatch(&self, command: Command) -> Result<Response> {
        let response = match command {
            Command::BankCode => Response::BankCode(self.bank_code.clone()),
            Command::AccountCreate => {
                let number = self.ledger.create_account().await?;
                Response::AccountCreated(AccountAddress::new(number, self.bank_code.clone()))
            }
            Command::Deposit { address, amount } => {
                self.ensure_local(&address)?;
                let balance = self.ledger.deposit(address.number, amount).await?;
                Response::Deposited { address, balance }
            }
            Command::Withdraw { address, amount } => {
                self.ensure_local(&address)?;
                let balance = self.ledger.withdraw(address.number, amount).await?;
                Response::Withdrawn { address, balance }
            }
            Command::Balance { address } => {
                self.ensure_local(&address)?;
                let balance = self.ledger.balance_of(address.number).await?;
                Response::Balance { address, balance }
            }
            Command::AccountRemove { address } => {
                self.ensure_local(&address)?;
                self.ledger.delete_account(address.number).await?;
                Response::AccountRemoved(address)
            }
            Command::TotalAssets => Response::TotalAssets(self.ledger.total_funds().await?),
            Command::AccountCount => Response::AccountCount(self.ledger.account_count().await?),
        };
        Ok(response)
    }

    /// Accounts of other nodes are recognised but never forwarded.
    fn ensure_local(&self, address: &AccountAddress) -> Result<()> {
        if address.is_local(&self.bank_code) {
            Ok(())
        } else {
            Err(BankError::ForeignAccount {
                host: address.host.clone(),
                bank_code: self.bank_code.clone(),
            })
        }
    }
}
