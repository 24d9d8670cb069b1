use super::{EntityTypeId, KeyId, Model, NavigationId, PropertyId};
use crate::{Annotations, ConfigurationSource, Facet};
use std::fmt;

/// Relates a dependent entity type's properties to a principal key.
#[derive(Debug)]
pub struct ForeignKey {
    pub(crate) id: ForeignKeyId,

    /// The dependent entity type, which declares the foreign key
    pub(crate) declaring_entity_type: EntityTypeId,

    /// Dependent properties, lined up with the principal key's properties
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) properties_source: Option<ConfigurationSource>,

    pub(crate) principal_entity_type: EntityTypeId,
    pub(crate) principal_key: KeyId,
    pub(crate) principal_key_source: Option<ConfigurationSource>,

    pub(crate) dependent_to_principal: Option<NavigationId>,
    pub(crate) dependent_to_principal_source: Option<ConfigurationSource>,
    pub(crate) principal_to_dependent: Option<NavigationId>,
    pub(crate) principal_to_dependent_source: Option<ConfigurationSource>,

    pub(crate) unique: Facet<bool>,
    pub(crate) required: Facet<bool>,
    pub(crate) delete_behavior: Facet<DeleteBehavior>,

    pub(crate) source: ConfigurationSource,
    pub(crate) annotations: Annotations,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ForeignKeyId(pub usize);

/// What happens to dependents when their principal is deleted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeleteBehavior {
    Cascade,
    ClientSetNull,
    Restrict,
    SetNull,
    NoAction,
}

impl ForeignKey {
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn properties_source(&self) -> Option<ConfigurationSource> {
        self.properties_source
    }

    pub fn principal_entity_type(&self) -> EntityTypeId {
        self.principal_entity_type
    }

    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    pub fn principal_key_source(&self) -> Option<ConfigurationSource> {
        self.principal_key_source
    }

    pub fn dependent_to_principal(&self) -> Option<NavigationId> {
        self.dependent_to_principal
    }

    pub fn principal_to_dependent(&self) -> Option<NavigationId> {
        self.principal_to_dependent
    }

    pub fn navigation_source(&self, on_dependent: bool) -> Option<ConfigurationSource> {
        if on_dependent {
            self.dependent_to_principal_source
        } else {
            self.principal_to_dependent_source
        }
    }

    pub fn is_unique(&self) -> bool {
        self.unique.value().unwrap_or(false)
    }

    pub fn is_unique_source(&self) -> Option<ConfigurationSource> {
        self.unique.source()
    }

    /// Configured requiredness, otherwise required iff no dependent property
    /// is nullable.
    pub fn is_required(&self, model: &Model) -> bool {
        self.required.value().unwrap_or_else(|| {
            self.properties
                .iter()
                .all(|id| !model.property(*id).is_nullable())
        })
    }

    pub fn is_required_source(&self) -> Option<ConfigurationSource> {
        self.required.source()
    }

    /// Required relationships cascade by default; optional ones null out the
    /// dependents in memory.
    pub fn delete_behavior(&self, model: &Model) -> DeleteBehavior {
        self.delete_behavior.value().unwrap_or_else(|| {
            if self.is_required(model) {
                DeleteBehavior::Cascade
            } else {
                DeleteBehavior::ClientSetNull
            }
        })
    }

    pub fn delete_behavior_source(&self) -> Option<ConfigurationSource> {
        self.delete_behavior.source()
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Returns `true` if both ends are the same entity type.
    pub fn is_self_referencing(&self) -> bool {
        self.declaring_entity_type == self.principal_entity_type
    }
}

impl fmt::Debug for ForeignKeyId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ForeignKeyId({})", self.0)
    }
}
