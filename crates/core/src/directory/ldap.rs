//! LDAP-backed person and group lookups.
//!
//! Each lookup opens a connection, binds (anonymously when no bind DN is
//! configured), runs one subtree search and unbinds. The calls block; async
//! callers should run them on a blocking thread.

use std::time::Duration;

use ldap3::{ldap_escape, LdapConn, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info};

use super::{Group, GroupLookup, Person, PersonLookup};
use crate::config::DirectoryConfig;
use crate::errors::DirectoryError;

const PERSON_ATTRS: [&str; 5] = ["uid", "cn", "mail", "givenName", "sn"];
const GROUP_ATTRS: [&str; 3] = ["cn", "memberUid", "member"];

pub struct LdapDirectory {
    url: String,
    people_base: String,
    groups_base: String,
    bind_dn: Option<String>,
    bind_password: String,
    timeout: Duration,
}

impl LdapDirectory {
    /// Create a new LDAP directory. No connection is made until the first lookup.
    pub fn new(config: &DirectoryConfig) -> Self {
        let base_dn = config.base_dn.clone().unwrap_or_default();
        let directory = Self {
            url: config.url.clone().unwrap_or_default(),
            people_base: join_dn(&config.people_ou, &base_dn),
            groups_base: join_dn(&config.groups_ou, &base_dn),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone().unwrap_or_default(),
            timeout: Duration::from_secs(config.timeout_secs),
        };
        info!(
            url = %directory.url,
            people_base = %directory.people_base,
            groups_base = %directory.groups_base,
            "created LdapDirectory"
        );
        directory
    }

    fn connect(&self) -> Result<LdapConn, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let mut conn = LdapConn::with_settings(settings, &self.url)?;
        if let Some(ref bind_dn) = self.bind_dn {
            debug!(bind_dn = %bind_dn, "binding to LDAP");
            conn.simple_bind(bind_dn, &self.bind_password)?.success()?;
        }
        Ok(conn)
    }

    fn search(
        &self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let mut conn = self.connect()?;
        debug!(base, filter, "LDAP search");
        let result = conn.search(base, Scope::Subtree, filter, attrs.to_vec());
        // Unbind even when the search failed.
        let unbind = conn.unbind();
        let (entries, _) = result?.success()?;
        unbind?;
        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

fn join_dn(rdn: &str, base_dn: &str) -> String {
    if rdn.is_empty() {
        base_dn.to_string()
    } else {
        format!("{},{}", rdn, base_dn)
    }
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry.attrs.get(name).and_then(|values| values.first().cloned())
}

/// Build a [`Person`] from a search entry; entries without a uid are skipped.
fn person_from_entry(entry: &SearchEntry) -> Option<Person> {
    let uid = first_attr(entry, "uid")?;
    Some(Person {
        common_name: first_attr(entry, "cn").unwrap_or_else(|| uid.clone()),
        uid,
        mail: first_attr(entry, "mail"),
        given_name: first_attr(entry, "givenName"),
        surname: first_attr(entry, "sn"),
    })
}

/// Build a [`Group`] from a search entry. `memberUid` values are taken as-is,
/// `member` DNs are reduced to their leading RDN value.
fn group_from_entry(entry: &SearchEntry) -> Option<Group> {
    let common_name = first_attr(entry, "cn")?;
    let mut members: Vec<String> = entry.attrs.get("memberUid").cloned().unwrap_or_default();
    if let Some(dns) = entry.attrs.get("member") {
        members.extend(dns.iter().filter_map(|dn| rdn_value(dn)));
    }
    Some(Group {
        common_name,
        members,
    })
}

fn rdn_value(dn: &str) -> Option<String> {
    let first = dn.split(',').next()?;
    let (_, value) = first.split_once('=')?;
    Some(value.trim().to_string())
}

pub(crate) fn person_email_filter(email: &str) -> String {
    format!("(&(objectClass=person)(mail={}))", ldap_escape(email))
}

pub(crate) fn person_prefix_filter(prefix: &str) -> String {
    format!("(&(objectClass=person)(cn={}*))", ldap_escape(prefix))
}

pub(crate) fn group_prefix_filter(prefix: &str) -> String {
    format!(
        "(&(|(objectClass=posixGroup)(objectClass=groupOfNames))(cn={}*))",
        ldap_escape(prefix)
    )
}

impl PersonLookup for LdapDirectory {
    fn find_by_email(&self, email: &str) -> Result<Option<Person>, DirectoryError> {
        let entries = self.search(&self.people_base, &person_email_filter(email), &PERSON_ATTRS)?;
        Ok(entries.iter().find_map(person_from_entry))
    }

    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Person>, DirectoryError> {
        let entries =
            self.search(&self.people_base, &person_prefix_filter(prefix), &PERSON_ATTRS)?;
        let mut people: Vec<Person> = entries.iter().filter_map(person_from_entry).collect();
        people.sort_by(|a, b| a.common_name.cmp(&b.common_name));
        debug!(prefix, count = people.len(), "LDAP person prefix lookup");
        Ok(people)
    }
}

impl GroupLookup for LdapDirectory {
    fn find_by_name_prefix(&self, prefix: &str) -> Result<Vec<Group>, DirectoryError> {
        let entries =
            self.search(&self.groups_base, &group_prefix_filter(prefix), &GROUP_ATTRS)?;
        let mut groups: Vec<Group> = entries.iter().filter_map(group_from_entry).collect();
        groups.sort_by(|a, b| a.common_name.cmp(&b.common_name));
        debug!(prefix, count = groups.len(), "LDAP group prefix lookup");
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn entry(dn: &str, attrs: &[(&str, &[&str])]) -> SearchEntry {
        SearchEntry {
            dn: dn.into(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_search_bases() {
        let config = DirectoryConfig {
            url: Some("ldap://localhost".into()),
            base_dn: Some("dc=example,dc=com".into()),
            ..Default::default()
        };
        let directory = LdapDirectory::new(&config);
        assert_eq!(directory.people_base, "ou=people,dc=example,dc=com");
        assert_eq!(directory.groups_base, "ou=groups,dc=example,dc=com");
        assert!(directory.bind_dn.is_none());
    }

    #[test]
    fn test_filters_escape_input() {
        assert_eq!(
            person_email_filter("a@example.com"),
            "(&(objectClass=person)(mail=a@example.com))"
        );
        // Hex case of the escapes is up to ldap3.
        assert_eq!(
            person_prefix_filter("Jo*)").to_lowercase(),
            "(&(objectclass=person)(cn=jo\\2a\\29*))"
        );
        assert!(group_prefix_filter("ops").ends_with("(cn=ops*))"));
    }

    #[test]
    fn test_person_from_entry() {
        let e = entry(
            "uid=jdoe,ou=people,dc=example,dc=com",
            &[
                ("uid", &["jdoe"]),
                ("cn", &["John Doe"]),
                ("mail", &["jdoe@example.com"]),
                ("sn", &["Doe"]),
            ],
        );
        let person = person_from_entry(&e).unwrap();
        assert_eq!(person.uid, "jdoe");
        assert_eq!(person.common_name, "John Doe");
        assert_eq!(person.mail.as_deref(), Some("jdoe@example.com"));
        assert!(person.given_name.is_none());

        assert!(person_from_entry(&entry("cn=x", &[("cn", &["x"])])).is_none());
    }

    #[test]
    fn test_group_from_entry_merges_member_forms() {
        let e = entry(
            "cn=operators,ou=groups,dc=example,dc=com",
            &[
                ("cn", &["operators"]),
                ("memberUid", &["jdoe"]),
                ("member", &["uid=jane,ou=people,dc=example,dc=com"]),
            ],
        );
        let group = group_from_entry(&e).unwrap();
        assert_eq!(group.common_name, "operators");
        assert_eq!(group.members, vec!["jdoe", "jane"]);
    }
}
