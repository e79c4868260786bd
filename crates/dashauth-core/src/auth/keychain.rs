use keyring::Entry;
use tracing::debug;

use super::store::{StoreError, TokenStore};
use crate::models::TokenRecord;

const SERVICE_NAME: &str = "dashauth";

/// Token record kept as a single OS keychain entry.
///
/// The entry handle is created once and reused, so every read and write
/// goes to the same credential.
pub struct KeyringTokenStore {
    account: String,
    entry: Entry,
}

impl KeyringTokenStore {
    /// `account` scopes the entry, typically the API origin
    pub fn new(account: impl Into<String>) -> Result<Self, StoreError> {
        let account = account.into();
        let entry = Entry::new(SERVICE_NAME, &account)?;
        Ok(Self { account, entry })
    }

    #[cfg(test)]
    fn with_entry(account: &str, entry: Entry) -> Self {
        Self {
            account: account.to_string(),
            entry,
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<TokenRecord, StoreError> {
        match self.entry.get_password() {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(keyring::Error::NoEntry) => Ok(TokenRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        if record.is_empty() {
            return self.clear_all();
        }
        let contents = serde_json::to_string(record)?;
        self.entry.set_password(&contents)?;
        debug!(account = %self.account, "Token record saved to keychain");
        Ok(())
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
