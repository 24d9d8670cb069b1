use super::{EntityTypeId, PropertyId};
use crate::{Annotations, ConfigurationSource};
use std::fmt;

/// A set of properties that uniquely identifies instances of an entity type.
#[derive(Debug)]
pub struct Key {
    pub(crate) id: KeyId,
    pub(crate) entity_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub usize);

impl Key {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "KeyId({})", self.0)
    }
}
