use super::{EntityTypeId, PropertyId};
use crate::{Annotations, ConfigurationSource, Facet};
use std::fmt;

#[derive(Debug)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) entity_type: EntityTypeId,

    /// Indexed properties, in index column order
    pub(crate) properties: Vec<PropertyId>,

    pub(crate) unique: Facet<bool>,

    /// Database name; generated when unset
    pub(crate) name: Facet<String>,

    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub usize);

impl Index {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn is_unique(&self) -> bool {
        self.unique.value().unwrap_or(false)
    }

    pub fn is_unique_source(&self) -> Option<ConfigurationSource> {
        self.unique.source()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

impl fmt::Debug for IndexId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "IndexId({})", self.0)
    }
}
