//! Person and group lookups against the site directory.
//!
//! The lookup traits are implemented by:
//! 1. [`LdapDirectory`] when an LDAP server is configured
//! 2. [`StaticDirectory`] backed by a TOML file, for development and tests
//! 3. [`EmptyDirectory`] when neither is available

pub mod ldap;
pub mod static_file;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DirectoryConfig;
use crate::errors::DirectoryError;

pub use ldap::LdapDirectory;
pub use static_file::StaticDirectory;

/// A person entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub uid: String,
    /// Display name (`cn`).
    pub common_name: String,
    pub mail: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

/// A group entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub common_name: String,
    /// Member uids.
    pub members: Vec<String>,
}

pub trait PersonLookup: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<Person>, DirectoryError>;

    /// People whose common name starts with `prefix`, ordered by common name.
    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Person>, DirectoryError>;
}

pub trait GroupLookup: Send + Sync {
    /// Groups whose common name starts with `prefix`, ordered by common name.
    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Group>, DirectoryError>;
}

/// Lookup that never finds anything.
pub struct EmptyDirectory;

impl PersonLookup for EmptyDirectory {
    fn find_by_email(&self, _email: &str) -> Result<Option<Person>, DirectoryError> {
        Ok(None)
    }

    fn find_by_name_prefix(&self, _prefix: &str) -> Result<Vec<Person>, DirectoryError> {
        Ok(Vec::new())
    }
}

impl GroupLookup for EmptyDirectory {
    fn find_by_name_prefix(&self, _prefix: &str) -> Result<Vec<Group>, DirectoryError> {
        Ok(Vec::new())
    }
}

/// The person and group lookups selected by configuration.
#[derive(Clone)]
pub struct Directory {
    pub people: Arc<dyn PersonLookup>,
    pub groups: Arc<dyn GroupLookup>,
}

impl Directory {
    /// Use one backend for both people and groups.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: PersonLookup + GroupLookup + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            people: backend.clone(),
            groups: backend,
        }
    }

    pub fn empty() -> Self {
        Self::from_backend(EmptyDirectory)
    }

    /// Select a backend from a [`DirectoryConfig`].
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        if let (Some(url), Some(base_dn)) = (&config.url, &config.base_dn) {
            info!(url = %url, base_dn = %base_dn, "using LDAP directory");
            return Ok(Self::from_backend(LdapDirectory::new(config)));
        }

        match &config.static_file {
            Some(path) => {
                info!(path = %path.display(), "using static directory file");
                Ok(Self::from_backend(StaticDirectory::load(path)?))
            }
            None => {
                warn!("no directory configured, person and group lookups will be empty");
                Ok(Self::empty())
            }
        }
    }
}
