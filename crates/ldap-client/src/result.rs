//! Search results.

use crate::connection::Connection;
use crate::engine::RawEntry;
use std::collections::HashMap;

/// Directory entry decoded from a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attributes whose values are all valid UTF-8 (values keep server order).
    pub attributes: HashMap<String, Vec<String>>,
    /// Attributes holding at least one non UTF-8 value.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes.get(attribute).map(Vec::as_slice)
    }

    /// Returns all binary values for the attribute.
    #[must_use]
    pub fn binary_values(&self, attribute: &str) -> Option<&[Vec<u8>]> {
        self.binary_attributes.get(attribute).map(Vec::as_slice)
    }

    fn decode(raw: RawEntry) -> Self {
        // Repeated attribute names are merged first so one name never straddles both maps.
        let mut merged: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
        for attribute in raw.attributes {
            merged
                .entry(attribute.name)
                .or_default()
                .extend(attribute.values);
        }

        let mut entry = Self {
            dn: raw.dn,
            ..Self::default()
        };
        for (name, values) in merged {
            if values.iter().all(|v| std::str::from_utf8(v).is_ok()) {
                let values = values
                    .into_iter()
                    .map(|v| String::from_utf8(v).unwrap_or_default())
                    .collect();
                entry.attributes.insert(name, values);
            } else {
                entry.binary_attributes.insert(name, values);
            }
        }
        entry
    }
}

/// Entries returned by one search, tied to the connection that produced them.
///
/// The borrow keeps the connection (and its session) open for as long as the result exists.
#[derive(Debug)]
pub struct SearchResult<'c> {
    connection: &'c Connection,
    entries: Vec<LdapEntry>,
}

impl<'c> SearchResult<'c> {
    pub(crate) fn new(connection: &'c Connection, raw: Vec<RawEntry>) -> Self {
        Self {
            connection,
            entries: raw.into_iter().map(LdapEntry::decode).collect(),
        }
    }

    /// Connection that ran the search.
    #[must_use]
    pub fn connection(&self) -> &'c Connection {
        self.connection
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the search matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order the engine returned them.
    #[must_use]
    pub fn entries(&self) -> &[LdapEntry] {
        &self.entries
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, LdapEntry> {
        self.entries.iter()
    }

    /// Releases the connection borrow and returns the entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<LdapEntry> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a SearchResult<'_> {
    type Item = &'a LdapEntry;
    type IntoIter = std::slice::Iter<'a, LdapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for SearchResult<'_> {
    type Item = LdapEntry;
    type IntoIter = std::vec::IntoIter<LdapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
