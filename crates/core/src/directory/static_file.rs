//! TOML-backed directory for development setups without LDAP.
//!
//! The file format:
//!
//! ```toml
//! [people]
//! jdoe = { common_name = "John Doe", mail = "jdoe@example.com" }
//!
//! [groups]
//! operators = { members = ["jdoe"] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Group, GroupLookup, Person, PersonLookup};
use crate::errors::DirectoryError;

/// A person entry in the directory file, keyed by uid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonEntry {
    pub common_name: String,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

/// A group entry in the directory file, keyed by common name.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GroupEntry {
    #[serde(default)]
    pub members: Vec<String>,
}

/// Wrapper around the TOML file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticDirectoryData {
    #[serde(default)]
    pub people: BTreeMap<String, PersonEntry>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupEntry>,
}

/// In-memory directory loaded once from a TOML file.
pub struct StaticDirectory {
    people: Vec<Person>,
    groups: Vec<Group>,
}

impl StaticDirectory {
    /// Load the directory file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading static directory file");

        if !path.exists() {
            return Err(DirectoryError::FileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let data: StaticDirectoryData =
            toml::from_str(&contents).map_err(|e| DirectoryError::ParseError(e.to_string()))?;

        debug!(
            people = data.people.len(),
            groups = data.groups.len(),
            "loaded static directory"
        );
        Ok(Self::from_data(data))
    }

    pub fn from_data(data: StaticDirectoryData) -> Self {
        let mut people: Vec<Person> = data
            .people
            .into_iter()
            .map(|(uid, entry)| Person {
                uid,
                common_name: entry.common_name,
                mail: entry.mail,
                given_name: entry.given_name,
                surname: entry.surname,
            })
            .collect();
        people.sort_by(|a, b| a.common_name.cmp(&b.common_name));

        // BTreeMap iteration is already ordered by common name.
        let groups = data
            .groups
            .into_iter()
            .map(|(common_name, entry)| Group {
                common_name,
                members: entry.members,
            })
            .collect();

        Self { people, groups }
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.to_lowercase().starts_with(&prefix.to_lowercase())
}

impl PersonLookup for StaticDirectory {
    fn find_by_email(&self, email: &str) -> Result<Option<Person>, DirectoryError> {
        Ok(self
            .people
            .iter()
            .find(|p| {
                p.mail
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(email))
            })
            .cloned())
    }

    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Person>, DirectoryError> {
        Ok(self
            .people
            .iter()
            .filter(|p| starts_with_ignore_case(&p.common_name, prefix))
            .cloned()
            .collect())
    }
}

impl GroupLookup for StaticDirectory {
    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Group>, DirectoryError> {
        Ok(self
            .groups
            .iter()
            .filter(|g| starts_with_ignore_case(&g.common_name, prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_directory(path: &Path) {
        let content = r#"
[people.jdoe]
common_name = "John Doe"
mail = "john.doe@example.com"

[people.jane]
common_name = "Jane Roe"
mail = "jane@example.com"
given_name = "Jane"
surname = "Roe"

[people.jdean]
common_name = "Jo Dean"

[groups.operators]
members = ["jdoe", "jane"]

[groups.physicists]
members = ["jdean"]
"#;
        std::fs::write(path, content).unwrap();
    }

    fn load() -> StaticDirectory {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.toml");
        write_test_directory(&path);
        StaticDirectory::load(&path).unwrap()
    }

    #[test]
    fn test_find_by_email() {
        let directory = load();
        let person = directory.find_by_email("JANE@example.com").unwrap().unwrap();
        assert_eq!(person.uid, "jane");
        assert_eq!(person.common_name, "Jane Roe");
        assert_eq!(person.surname.as_deref(), Some("Roe"));

        assert!(directory.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_person_prefix_is_ordered_and_case_insensitive() {
        let directory = load();
        let people = PersonLookup::find_by_name_prefix(&directory, "j").unwrap();
        let names: Vec<_> = people.iter().map(|p| p.common_name.as_str()).collect();
        assert_eq!(names, vec!["Jane Roe", "Jo Dean", "John Doe"]);

        let people = PersonLookup::find_by_name_prefix(&directory, "john").unwrap();
        assert_eq!(people.len(), 1);
    }

    #[test]
    fn test_group_prefix() {
        let directory = load();
        let groups = GroupLookup::find_by_name_prefix(&directory, "OP").unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec!["jdoe", "jane"]);

        let all = GroupLookup::find_by_name_prefix(&directory, "").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[people.jdoe\n").unwrap();
        assert!(matches!(
            StaticDirectory::load(&path),
            Err(DirectoryError::ParseError(_))
        ));
    }
}
