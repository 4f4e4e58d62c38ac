//! Temporary world-state view: a speculative, rollback-capable overlay used
//! during stateful validation.

use std::collections::{BTreeSet, HashMap};

use kagura_proto::api::{command, Command, Transaction};
use thiserror::Error;

/// Read-only account snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    /// Minimum number of signatures a transaction from this account needs.
    pub quorum: u32,
    /// Public keys authorized to sign for this account.
    pub signatories: BTreeSet<Vec<u8>>,
}

impl Account {
    pub fn new(
        account_id: impl Into<String>,
        quorum: u32,
        signatories: impl IntoIterator<Item = Vec<u8>>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            quorum,
            signatories: signatories.into_iter().collect(),
        }
    }
}

/// Command execution failures. Each failure rolls the containing
/// transaction back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WsvError {
    #[error("account {0} already exists")]
    AccountExists(String),
    #[error("unknown account {0}")]
    UnknownAccount(String),
    #[error("key is not a signatory of {0}")]
    UnknownSignatory(String),
    #[error("quorum {quorum} unsatisfiable with {signatories} signatories")]
    UnsatisfiableQuorum { quorum: u32, signatories: usize },
    #[error("transaction carries an empty command")]
    EmptyCommand,
}

/// Speculative overlay over the ledger's account state.
///
/// One validation pass owns the view exclusively. Each [`apply`] call opens
/// a savepoint: effects of an accepted transaction stay visible to later
/// calls in the same pass, while a rejected transaction leaves no trace.
///
/// [`apply`]: TemporaryWsv::apply
pub struct TemporaryWsv {
    accounts: HashMap<String, Account>,
}

impl TemporaryWsv {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Seed the overlay from a snapshot of committed accounts.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|a| (a.account_id.clone(), a))
                .collect(),
        }
    }

    pub fn get_account(&self, account_id: &str) -> Option<Account> {
        self.accounts.get(account_id).cloned()
    }

    pub fn get_signatories(&self, account_id: &str) -> Option<BTreeSet<Vec<u8>>> {
        self.accounts.get(account_id).map(|a| a.signatories.clone())
    }

    /// Atomically evaluates `predicate` against the current overlay and, if
    /// it accepts, commits the transaction's effects. Any predicate
    /// rejection or command failure rolls partial changes back.
    pub fn apply<P>(&mut self, tx: &Transaction, mut predicate: P) -> bool
    where
        P: FnMut(&Transaction, &TemporaryWsv) -> bool,
    {
        if !predicate(tx, self) {
            return false;
        }

        let mut journal = Vec::new();
        for command in &tx.commands {
            if self.execute(command, &mut journal).is_err() {
                self.rollback(journal);
                return false;
            }
        }
        true
    }

    fn execute(
        &mut self,
        command: &Command,
        journal: &mut Vec<(String, Option<Account>)>,
    ) -> Result<(), WsvError> {
        use command::Command::*;

        match command.command.as_ref().ok_or(WsvError::EmptyCommand)? {
            CreateAccount(cmd) => {
                if self.accounts.contains_key(&cmd.account_id) {
                    return Err(WsvError::AccountExists(cmd.account_id.clone()));
                }
                if cmd.quorum == 0 || cmd.quorum as usize > cmd.signatories.len() {
                    return Err(WsvError::UnsatisfiableQuorum {
                        quorum: cmd.quorum,
                        signatories: cmd.signatories.len(),
                    });
                }
                journal.push((cmd.account_id.clone(), None));
                self.accounts.insert(
                    cmd.account_id.clone(),
                    Account::new(&cmd.account_id, cmd.quorum, cmd.signatories.iter().cloned()),
                );
            }
            AddSignatory(cmd) => {
                let account = self.account_for_update(&cmd.account_id, journal)?;
                account.signatories.insert(cmd.public_key.clone());
            }
            RemoveSignatory(cmd) => {
                let account = self.account_for_update(&cmd.account_id, journal)?;
                if !account.signatories.remove(&cmd.public_key) {
                    return Err(WsvError::UnknownSignatory(cmd.account_id.clone()));
                }
                if account.signatories.len() < account.quorum as usize {
                    return Err(WsvError::UnsatisfiableQuorum {
                        quorum: account.quorum,
                        signatories: account.signatories.len(),
                    });
                }
            }
            SetAccountQuorum(cmd) => {
                let account = self.account_for_update(&cmd.account_id, journal)?;
                if cmd.quorum == 0 || cmd.quorum as usize > account.signatories.len() {
                    return Err(WsvError::UnsatisfiableQuorum {
                        quorum: cmd.quorum,
                        signatories: account.signatories.len(),
                    });
                }
                account.quorum = cmd.quorum;
            }
        }
        Ok(())
    }

    /// Journals the account's current state, then hands out a mutable
    /// reference to it.
    fn account_for_update<'a>(
        &'a mut self,
        account_id: &str,
        journal: &mut Vec<(String, Option<Account>)>,
    ) -> Result<&'a mut Account, WsvError> {
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| WsvError::UnknownAccount(account_id.to_string()))?;
        journal.push((account_id.to_string(), Some(account.clone())));
        Ok(account)
    }

    fn rollback(&mut self, journal: Vec<(String, Option<Account>)>) {
        for (account_id, prior) in journal.into_iter().rev() {
            match prior {
                Some(account) => {
                    self.accounts.insert(account_id, account);
                }
                None => {
                    self.accounts.remove(&account_id);
                }
            }
        }
    }
}

impl Default for TemporaryWsv {
    fn default() -> Self {
        Self::new()
    }
}
