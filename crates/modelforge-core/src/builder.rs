//! Mutation entry points for the model graph.
//!
//! [`ModelBuilder`] owns the [`Model`] while it is being built. Handles such
//! as [`EntityTypeBuilder`] borrow the model builder mutably, apply one change
//! at a given [`ConfigurationSource`] and dispatch the resulting event to the
//! conventions.
//!
//! Builder operations return `None` when the change cannot be applied at the
//! requested source, or when a convention reverted it. Operations that can
//! fail on the shape of the user's types return `Result<Option<_>>`.

mod entity_type;
pub use entity_type::EntityTypeBuilder;

mod key;
pub use key::{IndexBuilder, KeyBuilder};

mod property;
pub use property::PropertyBuilder;

mod relationship;
pub use relationship::{ForeignKeyBuilder, NavigationBuilder};

mod remove;

use crate::annotation::AnnotationTarget;
use crate::convention::{Event, Outcome, Undo};
use crate::metadata::{
    EntityType, EntityTypeId, ForeignKeyId, IndexId, KeyId, Model, NavigationId, PropertyId,
};
use crate::reflect::{TypeInfo, TypeRegistry};
use crate::storage::{DefaultTypeMappingSource, TypeMappingSource};
use crate::{
    verify, ConfigurationSource, ConventionSet, Error, FacetChange, FinalizedModel,
    RelationalOptions, Result, Value,
};
use std::sync::Arc;
use tracing::debug;

pub struct ModelBuilder {
    pub(crate) model: Model,
    pub(crate) conventions: Arc<ConventionSet>,

    /// Current nesting of convention dispatch
    pub(crate) depth: usize,

    /// First hard error raised while conventions were running. Surfaced by
    /// `finalize`.
    failure: Option<Error>,
}

impl ModelBuilder {
    pub fn new(types: TypeRegistry, conventions: ConventionSet) -> ModelBuilder {
        ModelBuilder::with_shared(Arc::new(types), Arc::new(conventions))
    }

    /// Like [`ModelBuilder::new`], reusing registries and convention sets
    /// shared between several builds.
    pub fn with_shared(types: Arc<TypeRegistry>, conventions: Arc<ConventionSet>) -> ModelBuilder {
        ModelBuilder {
            model: Model::new(types),
            conventions,
            depth: 0,
            failure: None,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn conventions(&self) -> &ConventionSet {
        &self.conventions
    }

    /// Records a hard error raised from inside a convention. The first one
    /// recorded is returned from [`ModelBuilder::finalize`].
    pub fn record_failure(&mut self, err: Error) {
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    // ===== Entity types =====

    /// Adds or returns the entity type `name`. It is backed by the registered
    /// type of the same name, if any, and is a shadow entity type otherwise.
    pub fn entity(&mut self, name: &str, source: ConfigurationSource) -> Option<EntityTypeBuilder<'_>> {
        let type_info = self.model.types.get(name).cloned();
        self.add_entity_type(name, type_info, false, source)
    }

    /// Adds or returns the entity type backed by the registered type
    /// `type_name`. Returns `None` if the type is not registered.
    pub fn entity_for_type(
        &mut self,
        type_name: &str,
        source: ConfigurationSource,
    ) -> Option<EntityTypeBuilder<'_>> {
        let type_info = self.model.types.get(type_name).cloned()?;
        self.add_entity_type(type_name, Some(type_info), false, source)
    }

    /// Adds or returns an entity type named `name` that shares the backing
    /// type `type_name` with other entity types.
    pub fn shared_type_entity(
        &mut self,
        name: &str,
        type_name: &str,
        source: ConfigurationSource,
    ) -> Option<EntityTypeBuilder<'_>> {
        let type_info = self.model.types.get(type_name).cloned()?;
        self.add_entity_type(name, Some(type_info), true, source)
    }

    fn add_entity_type(
        &mut self,
        name: &str,
        type_info: Option<Arc<TypeInfo>>,
        is_shared_type: bool,
        source: ConfigurationSource,
    ) -> Option<EntityTypeBuilder<'_>> {
        if let Some(ignored) = self.model.ignored.get(name).copied() {
            if !source.overrides(Some(ignored)) {
                return None;
            }
            self.model.ignored.shift_remove(name);
        }

        if let Some(id) = self.model.entity_type_names.get(name).copied() {
            let et = self.model.entity_types.get_mut(id.0)?;
            let same_type = et.type_info.as_ref().map(|ty| &ty.name)
                == type_info.as_ref().map(|ty| &ty.name);
            if et.is_shared_type != is_shared_type || !same_type {
                return None;
            }
            et.source = et.source.max(source);
            return self.entity_type_builder(id);
        }

        let id = EntityTypeId(self.model.entity_types.next_index());
        self.model.entity_types.push(EntityType::new(
            id,
            name.to_string(),
            type_info,
            is_shared_type,
            source,
        ));
        self.model.entity_type_names.insert(name.to_string(), id);
        debug!(entity_type = name, ?source, "entity type added");

        match self.dispatch(Event::EntityTypeAdded(id), Undo::EntityType(id)) {
            Outcome::Reverted => None,
            _ => self.entity_type_builder(id),
        }
    }

    /// Removes an entity type along with everything it declares and every
    /// relationship that involves it.
    pub fn remove_entity_type(&mut self, id: EntityTypeId, source: ConfigurationSource) -> Option<()> {
        let et = self.model.get_entity_type(id)?;
        if !source.overrides(Some(et.source)) {
            return None;
        }
        self.remove_entity_type_internal(id);
        Some(())
    }

    /// Excludes a type name from the model, removing the entity type if one
    /// exists and `source` may remove it.
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> Option<()> {
        if let Some(existing) = self.model.ignored.get_mut(name) {
            *existing = (*existing).max(source);
            return Some(());
        }

        let existing = self.model.entity_type_names.get(name).copied();
        if let Some(id) = existing {
            if !source.overrides(Some(self.model.entity_type(id).source)) {
                return None;
            }
        }

        self.model.ignored.insert(name.to_string(), source);
        if let Some(id) = existing {
            self.remove_entity_type_internal(id);
        }
        Some(())
    }

    // ===== Handles =====

    pub fn entity_type_builder(&mut self, id: EntityTypeId) -> Option<EntityTypeBuilder<'_>> {
        self.model
            .entity_types
            .contains(id.0)
            .then(|| EntityTypeBuilder { mb: self, id })
    }

    pub fn property_builder(&mut self, id: PropertyId) -> Option<PropertyBuilder<'_>> {
        self.model
            .properties
            .contains(id.0)
            .then(|| PropertyBuilder { mb: self, id })
    }

    pub fn key_builder(&mut self, id: KeyId) -> Option<KeyBuilder<'_>> {
        self.model
            .keys
            .contains(id.0)
            .then(|| KeyBuilder { mb: self, id })
    }

    pub fn index_builder(&mut self, id: IndexId) -> Option<IndexBuilder<'_>> {
        self.model
            .indexes
            .contains(id.0)
            .then(|| IndexBuilder { mb: self, id })
    }

    pub fn foreign_key_builder(&mut self, id: ForeignKeyId) -> Option<ForeignKeyBuilder<'_>> {
        self.model
            .foreign_keys
            .contains(id.0)
            .then(|| ForeignKeyBuilder { mb: self, id })
    }

    pub fn navigation_builder(&mut self, id: NavigationId) -> Option<NavigationBuilder<'_>> {
        self.model
            .navigations
            .contains(id.0)
            .then(|| NavigationBuilder { mb: self, id })
    }

    // ===== Annotations =====

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<()> {
        self.set_annotation_on(AnnotationTarget::Model, name, value.into(), source)
    }

    pub fn remove_annotation(&mut self, name: &str, source: ConfigurationSource) -> Option<()> {
        self.remove_annotation_on(AnnotationTarget::Model, name, source)
    }

    pub(crate) fn set_annotation_on(
        &mut self,
        target: AnnotationTarget,
        name: &str,
        value: Value,
        source: ConfigurationSource,
    ) -> Option<()> {
        let change = self.model.annotations_of_mut(target)?.set(name, value, source);
        self.annotation_changed(target, name, change)
    }

    pub(crate) fn remove_annotation_on(
        &mut self,
        target: AnnotationTarget,
        name: &str,
        source: ConfigurationSource,
    ) -> Option<()> {
        let change = self.model.annotations_of_mut(target)?.remove(name, source);
        self.annotation_changed(target, name, change)
    }

    fn annotation_changed(
        &mut self,
        target: AnnotationTarget,
        name: &str,
        change: FacetChange<crate::Annotation>,
    ) -> Option<()> {
        let FacetChange::Changed { old, .. } = change else {
            return change.is_applied().then_some(());
        };

        let new = self
            .model
            .annotations_of(target)
            .and_then(|annotations| annotations.get(name))
            .cloned();

        let event = Event::AnnotationChanged {
            target,
            name: name.to_string(),
            new,
            old: old.clone(),
        };
        let undo = Undo::Annotation {
            target,
            name: name.to_string(),
            old,
        };

        match self.dispatch(event, undo) {
            Outcome::Reverted => None,
            _ => Some(()),
        }
    }

    // ===== Shared helpers =====

    /// Resolves property names against `entity_type` and its ancestors.
    pub(crate) fn resolve_properties(
        &self,
        entity_type: EntityTypeId,
        names: &[&str],
    ) -> Option<Vec<PropertyId>> {
        if names.is_empty() {
            return None;
        }
        names
            .iter()
            .map(|name| self.model.find_property(entity_type, name))
            .collect()
    }

    /// Sets a property's nullability and raises the nullability event.
    pub(crate) fn set_nullable(
        &mut self,
        property: PropertyId,
        nullable: Option<bool>,
        source: ConfigurationSource,
    ) -> Option<()> {
        let change = self
            .model
            .properties
            .get_mut(property.0)?
            .nullable
            .set(nullable, source);

        match change {
            FacetChange::Rejected => None,
            FacetChange::Unchanged => Some(()),
            FacetChange::Changed { old, old_source } => {
                let undo = Undo::Nullability {
                    property,
                    value: old,
                    source: old_source,
                };
                match self.dispatch(Event::PropertyNullabilityChanged(property), undo) {
                    Outcome::Reverted => None,
                    _ => Some(()),
                }
            }
        }
    }

    // ===== Finalization =====

    /// Runs the finalizing conventions, validates the model and freezes it,
    /// using default relational options and store type mappings.
    pub fn finalize(self) -> Result<FinalizedModel> {
        self.finalize_with(
            RelationalOptions::default(),
            Arc::new(DefaultTypeMappingSource::default()),
        )
    }

    pub fn finalize_with(
        mut self,
        options: RelationalOptions,
        type_mappings: Arc<dyn TypeMappingSource>,
    ) -> Result<FinalizedModel> {
        self.dispatch(Event::ModelFinalizing, Undo::Irreversible);

        if let Some(err) = self.failure.take() {
            return Err(err);
        }

        verify::verify(&self.model, type_mappings.as_ref())?;

        debug!(
            entity_types = self.model.entity_type_names.len(),
            foreign_keys = self.model.foreign_keys.iter().count(),
            "model finalized"
        );

        Ok(FinalizedModel::new(self.model, options, type_mappings))
    }
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("model", &self.model)
            .field("conventions", &self.conventions)
            .finish()
    }
}

/// Handles print the element they configure, not the whole model.
macro_rules! debug_handle {
    ($($builder:ident),*) => {
        $(
            impl std::fmt::Debug for $builder<'_> {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_tuple(stringify!($builder)).field(&self.id).finish()
                }
            }
        )*
    };
}

debug_handle!(
    EntityTypeBuilder,
    PropertyBuilder,
    KeyBuilder,
    IndexBuilder,
    ForeignKeyBuilder,
    NavigationBuilder
);
