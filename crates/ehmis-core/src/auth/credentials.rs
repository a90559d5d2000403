//! DHIS2 passwords in the OS keychain.
//!
//! Entries live under the `ehmis` service with the account named
//! `<username>@<instance>`, so the same username on two DHIS2 servers keeps
//! two passwords.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "ehmis";

pub struct CredentialStore {
    instance: String,
}

impl CredentialStore {
    /// Store for one DHIS2 instance, keyed by `Config::instance_key`.
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
        }
    }

    fn account(&self, username: &str) -> String {
        format!("{}@{}", username, self.instance)
    }

    fn entry(&self, username: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account(username)).context("Failed to create keyring entry")
    }

    /// Keep the password that authenticated against `/api/me`.
    pub fn store(&self, username: &str, password: &str) -> Result<()> {
        self.entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Password for resuming a saved session or running an export.
    pub fn get_password(&self, username: &str) -> Result<String> {
        self.entry(username)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    pub fn delete(&self, username: &str) -> Result<()> {
        self.entry(username)?
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_is_scoped_to_instance() {
        let national = CredentialStore::new("hmis.health.go.ug_api");
        let play = CredentialStore::new("play.dhis2.org_api");
        assert_eq!(national.account("biostat"), "biostat@hmis.health.go.ug_api");
        assert_ne!(national.account("biostat"), play.account("biostat"));
    }
}
