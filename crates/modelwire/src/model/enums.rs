//! Closed enum domains for enum properties.
//!
//! An enum property stores its member's underlying integer on the wire and
//! needs a closed {name -> number} table from the caller's domain to map
//! back. Unknown integers are a decode error, never a silent fallback.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::SchemaError;

/// One member of an enum domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumMember {
    pub name: String,
    pub number: i64,
}

impl EnumMember {
    pub fn new(name: impl Into<String>, number: i64) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// A closed mapping from member names to integers.
#[derive(Debug, Clone)]
pub struct EnumDomain {
    name: String,
    members: Vec<EnumMember>,
    by_name: FxHashMap<String, usize>,
    by_number: FxHashMap<i64, usize>,
}

impl EnumDomain {
    /// Builds a domain from (name, number) pairs.
    ///
    /// Duplicate names or numbers are a schema error.
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i64)>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = name.into();
        let mut domain = Self {
            name: name.clone(),
            members: Vec::new(),
            by_name: FxHashMap::default(),
            by_number: FxHashMap::default(),
        };

        for (member_name, number) in members {
            let member_name = member_name.into();
            let idx = domain.members.len();
            if domain.by_name.insert(member_name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateEnumMember {
                    domain: name,
                    member: member_name,
                });
            }
            if domain.by_number.insert(number, idx).is_some() {
                return Err(SchemaError::DuplicateEnumNumber {
                    domain: name,
                    number,
                });
            }
            domain.members.push(EnumMember::new(member_name, number));
        }

        Ok(Arc::new(domain))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// Looks up a member by name.
    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.by_name.get(name).map(|&i| &self.members[i])
    }

    /// Looks up a member by its underlying integer.
    pub fn member_by_number(&self, number: i64) -> Option<&EnumMember> {
        self.by_number.get(&number).map(|&i| &self.members[i])
    }

    /// Returns true if the given member belongs to this domain.
    pub fn contains(&self, member: &EnumMember) -> bool {
        self.member(&member.name)
            .is_some_and(|m| m.number == member.number)
    }
}
