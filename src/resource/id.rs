//! Opaque resource identifiers

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque, globally unique resource token.
///
/// Minting the same name twice yields two distinct ids; the name is a
/// label only and takes no part in equality.
#[derive(Clone)]
pub struct ResourceId {
    uuid: Uuid,
    name: Arc<str>,
}

impl ResourceId {
    /// Mint a fresh id labelled `name`
    pub fn new(name: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: Arc::from(name),
        }
    }

    /// Label given at registration
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for ResourceId {}

impl std::hash::Hash for ResourceId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.name)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({}, {})", self.name, self.uuid)
    }
}

/// Anything a caller may hand to `Registry::resolve`.
///
/// Only `Id` can ever succeed; `Raw` exists so untyped keys coming from
/// outside (CLI input, config) are rejected with a distinct error.
#[derive(Debug, Clone, Copy)]
pub enum Identifier<'a> {
    Id(&'a ResourceId),
    Raw(&'a str),
}

impl<'a> From<&'a ResourceId> for Identifier<'a> {
    fn from(id: &'a ResourceId) -> Self {
        Identifier::Id(id)
    }
}

impl<'a> From<&'a str> for Identifier<'a> {
    fn from(raw: &'a str) -> Self {
        Identifier::Raw(raw)
    }
}

impl<'a> From<&'a String> for Identifier<'a> {
    fn from(raw: &'a String) -> Self {
        Identifier::Raw(raw)
    }
}
