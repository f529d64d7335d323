use super::Error;
use crate::external::goal::{parse_account_list, parse_new_account, AccountEntry, NodeCli};
use std::path::{Path, PathBuf};

/// Wallet accounts of the node's default wallet.
pub struct AccountManager<'a> {
    cli: &'a dyn NodeCli,
}

impl<'a> AccountManager<'a> {
    pub fn new(cli: &'a dyn NodeCli) -> Self {
        Self { cli }
    }

    /// Creates an account and returns its address.
    pub fn new_account(&self) -> Result<String, Error> {
        let text = self.cli.account_new().map_err(Error::NewAccount)?;
        let address = parse_new_account(&text).map_err(Error::UnexpectedOutput)?;
        tracing::info!(%address, "account created");
        Ok(address)
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountEntry>, Error> {
        let text = self.cli.account_list().map_err(Error::ListAccounts)?;
        Ok(parse_account_list(&text))
    }

    /// Signs the transaction in `input`, writing the result to `output`.
    pub fn sign_transaction(&self, input: &Path, output: &Path) -> Result<PathBuf, Error> {
        self.cli
            .clerk_sign(input, output)
            .map_err(|source| Error::Sign {
                path: input.to_path_buf(),
                source,
            })?;
        Ok(output.to_path_buf())
    }
}
