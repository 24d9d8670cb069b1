use super::{ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::annotation::names;
use crate::reflect::TypeInfo;
use crate::{Annotations, ConfigurationSource, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug)]
pub struct EntityType {
    /// Uniquely identifies the entity type within the model
    pub(crate) id: EntityTypeId,

    pub(crate) name: String,

    /// Backing type, `None` for shadow entity types
    pub(crate) type_info: Option<Arc<TypeInfo>>,

    /// Several entity types may share one backing type under different names
    pub(crate) is_shared_type: bool,

    pub(crate) base_type: Option<EntityTypeId>,
    pub(crate) base_type_source: Option<ConfigurationSource>,

    /// Declared properties in declaration order. Inherited properties live on
    /// the ancestor that declares them.
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) navigations: Vec<NavigationId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<IndexId>,

    pub(crate) primary_key: Option<KeyId>,
    pub(crate) primary_key_source: Option<ConfigurationSource>,

    pub(crate) ignored_members: IndexMap<String, ConfigurationSource>,

    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EntityTypeId(pub usize);

impl EntityType {
    pub(crate) fn new(
        id: EntityTypeId,
        name: String,
        type_info: Option<Arc<TypeInfo>>,
        is_shared_type: bool,
        source: ConfigurationSource,
    ) -> EntityType {
        EntityType {
            id,
            name,
            type_info,
            is_shared_type,
            base_type: None,
            base_type_source: None,
            properties: vec![],
            navigations: vec![],
            keys: vec![],
            foreign_keys: vec![],
            indexes: vec![],
            primary_key: None,
            primary_key_source: None,
            ignored_members: IndexMap::new(),
            source,
            annotations: Annotations::default(),
        }
    }

    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_info(&self) -> Option<&Arc<TypeInfo>> {
        self.type_info.as_ref()
    }

    pub fn has_backing_type(&self) -> bool {
        self.type_info.is_some()
    }

    pub fn is_shared_type(&self) -> bool {
        self.is_shared_type
    }

    /// Property-bag entity types only expose indexer properties.
    pub fn is_property_bag(&self) -> bool {
        self.type_info
            .as_ref()
            .map_or(true, |type_info| type_info.is_property_bag)
    }

    pub fn is_abstract(&self) -> bool {
        self.type_info
            .as_ref()
            .map_or(false, |type_info| type_info.is_abstract)
    }

    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type
    }

    pub fn base_type_source(&self) -> Option<ConfigurationSource> {
        self.base_type_source
    }

    pub fn is_root(&self) -> bool {
        self.base_type.is_none()
    }

    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn declared_navigations(&self) -> &[NavigationId] {
        &self.navigations
    }

    pub fn declared_keys(&self) -> &[KeyId] {
        &self.keys
    }

    pub fn declared_foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    pub fn declared_indexes(&self) -> &[IndexId] {
        &self.indexes
    }

    /// The primary key declared on this entity type. Derived types inherit
    /// the root's key; see [`Model::primary_key`](super::Model::primary_key).
    pub fn primary_key(&self) -> Option<KeyId> {
        self.primary_key
    }

    pub fn primary_key_source(&self) -> Option<ConfigurationSource> {
        self.primary_key_source
    }

    /// Returns the source the member was ignored at, if it was.
    pub fn is_ignored(&self, member: &str) -> Option<ConfigurationSource> {
        self.ignored_members.get(member).copied()
    }

    pub fn ignored_members(&self) -> impl Iterator<Item = &str> + '_ {
        self.ignored_members.keys().map(String::as_str)
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn is_keyless(&self) -> bool {
        self.annotations
            .value(names::KEYLESS)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn discriminator_value(&self) -> Option<&Value> {
        self.annotations.value(names::DISCRIMINATOR_VALUE)
    }
}

impl fmt::Debug for EntityTypeId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "EntityTypeId({})", self.0)
    }
}
