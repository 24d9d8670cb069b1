use super::{EntityTypeId, ForeignKeyId, Model};
use crate::reflect::MemberInfo;
use crate::memo::Memo;
use crate::{Annotations, CollectionAccessor, ConfigurationSource, Error, Facet, Result};
use std::fmt;

/// One end of a relationship.
///
/// A navigation has no shape of its own: whether it sits on the dependent,
/// whether it is a collection and which entity types it connects are all
/// read from the owning foreign key.
#[derive(Debug)]
pub struct Navigation {
    pub(crate) id: NavigationId,
    pub(crate) name: String,
    pub(crate) foreign_key: ForeignKeyId,

    /// Backing member, `None` for shadow navigations
    pub(crate) member: Option<MemberInfo>,

    pub(crate) eager_loaded: Facet<bool>,
    pub(crate) annotations: Annotations,

    /// Filled on first use once the model is finalized
    pub(crate) accessor: Memo<CollectionAccessor>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NavigationId(pub usize);

impl Navigation {
    pub fn id(&self) -> NavigationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn foreign_key(&self) -> ForeignKeyId {
        self.foreign_key
    }

    pub fn member(&self) -> Option<&MemberInfo> {
        self.member.as_ref()
    }

    pub fn is_eager_loaded(&self) -> bool {
        self.eager_loaded.value().unwrap_or(false)
    }

    pub fn is_eager_loaded_source(&self) -> Option<ConfigurationSource> {
        self.eager_loaded.source()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// The navigation points from the dependent to the principal.
    pub fn is_on_dependent(&self, model: &Model) -> bool {
        model.foreign_key(self.foreign_key).dependent_to_principal == Some(self.id)
    }

    pub fn is_collection(&self, model: &Model) -> bool {
        !self.is_on_dependent(model) && !model.foreign_key(self.foreign_key).is_unique()
    }

    pub fn declaring_entity_type(&self, model: &Model) -> EntityTypeId {
        let fk = model.foreign_key(self.foreign_key);
        if self.is_on_dependent(model) {
            fk.declaring_entity_type
        } else {
            fk.principal_entity_type
        }
    }

    pub fn target_entity_type(&self, model: &Model) -> EntityTypeId {
        let fk = model.foreign_key(self.foreign_key);
        if self.is_on_dependent(model) {
            fk.principal_entity_type
        } else {
            fk.declaring_entity_type
        }
    }

    /// The navigation at the other end of the same foreign key.
    pub fn inverse(&self, model: &Model) -> Option<NavigationId> {
        let fk = model.foreign_key(self.foreign_key);
        if self.is_on_dependent(model) {
            fk.principal_to_dependent
        } else {
            fk.dependent_to_principal
        }
    }

    /// Checks whether `member` can back a navigation named `name` from
    /// `source` to `target`.
    ///
    /// The target must have a backing type. `should_be_collection` defaults
    /// to whether the member's type is a sequence. Member-less navigations to
    /// a backed target are always compatible. When `should_throw` is false
    /// every failure is reported as `Ok(false)`.
    pub fn is_compatible(
        model: &Model,
        name: &str,
        member: Option<&MemberInfo>,
        source: EntityTypeId,
        target: EntityTypeId,
        should_be_collection: Option<bool>,
        should_throw: bool,
    ) -> Result<bool> {
        let fail = |err: Error| if should_throw { Err(err) } else { Ok(false) };

        let source_type = model.entity_type(source);
        let target_type = model.entity_type(target);

        let Some(target_info) = target_type.type_info() else {
            return fail(Error::navigation_to_shadow_entity(
                name,
                &source_type.name,
                &target_type.name,
            ));
        };

        let Some(member) = member else {
            return Ok(true);
        };

        let types = model.types();
        let declared_on_source = source_type.type_info().map_or(false, |source_info| {
            types.is_assignable_from(&member.declaring_type, &source_info.name)
        });

        if !declared_on_source {
            return fail(Error::no_backing_navigation(name, &source_type.name));
        }

        let should_be_collection = should_be_collection.unwrap_or_else(|| member.ty.is_sequence());

        if should_be_collection {
            let holds_target = member
                .ty
                .element_type()
                .and_then(|element| element.entity_name())
                .map_or(false, |element| {
                    types.is_assignable_from(element, &target_info.name)
                });

            if !holds_target {
                return fail(Error::navigation_collection_wrong_type(
                    name,
                    &source_type.name,
                    member.ty.to_string(),
                    &target_type.name,
                ));
            }
        } else {
            let refers_to_target = member.ty.entity_name().map_or(false, |entity| {
                types.is_assignable_from(entity, &target_info.name)
            });

            if !refers_to_target {
                return fail(Error::navigation_single_wrong_type(
                    name,
                    &source_type.name,
                    member.ty.to_string(),
                    &target_type.name,
                ));
            }
        }

        Ok(true)
    }
}

impl fmt::Debug for NavigationId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "NavigationId({})", self.0)
    }
}
