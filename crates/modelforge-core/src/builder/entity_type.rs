use super::{ForeignKeyBuilder, IndexBuilder, KeyBuilder, NavigationBuilder, PropertyBuilder};
use crate::annotation::names;
use crate::convention::{Event, Outcome, Undo};
use crate::metadata::{
    EntityType, EntityTypeId, Index, IndexId, KeyId, Model, NavigationId, Property, PropertyId,
};
use crate::reflect::{MemberInfo, ScalarType, TypeRef};
use crate::{AnnotationTarget, ConfigurationSource, Facet, ModelBuilder, Result, Value};
use std::collections::HashSet;
use tracing::debug;

/// Configures one entity type.
pub struct EntityTypeBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: EntityTypeId,
}

impl<'a> EntityTypeBuilder<'a> {
    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    pub fn metadata(&self) -> &EntityType {
        self.mb.model.entity_type(self.id)
    }

    pub fn model(&self) -> &Model {
        &self.mb.model
    }

    /// Hands the model builder back, ending this borrow.
    pub fn model_builder(&mut self) -> &mut ModelBuilder {
        self.mb
    }

    fn alive(&mut self) -> Option<&mut Self> {
        if self.mb.model.is_live_entity_type(self.id) {
            Some(self)
        } else {
            None
        }
    }

    // ===== Inheritance =====

    /// Sets or clears the base type.
    ///
    /// Properties and navigations declared on this entity type that clash
    /// with members of the new base chain are removed, along with this
    /// entity type's primary key. All of them must be removable at `source`.
    pub fn has_base_type(
        &mut self,
        base: Option<EntityTypeId>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        let model = &self.mb.model;
        let et = model.entity_type(self.id);

        if et.base_type == base {
            let et = self.mb.model.entity_types.get_mut(self.id.0)?;
            et.base_type_source = Some(source.max_with(et.base_type_source));
            return Some(self);
        }

        if !source.overrides(et.base_type_source) {
            return None;
        }

        let mut conflicting_properties = vec![];
        let mut conflicting_navigations = vec![];
        let mut superseded_key = None;

        if let Some(base) = base {
            if !model.is_live_entity_type(base) || model.is_same_or_ancestor(self.id, base) {
                return None;
            }

            let inherited: HashSet<&str> = model
                .properties_of(base)
                .into_iter()
                .map(|p| model.property(p).name.as_str())
                .chain(
                    model
                        .navigations_of(base)
                        .into_iter()
                        .map(|n| model.navigation(n).name.as_str()),
                )
                .collect();

            for id in &et.properties {
                let property = model.property(*id);
                if inherited.contains(property.name.as_str()) {
                    if !source.overrides(Some(property.source)) {
                        return None;
                    }
                    conflicting_properties.push(*id);
                }
            }

            for id in &et.navigations {
                let navigation = model.navigation(*id);
                if inherited.contains(navigation.name.as_str()) {
                    let fk = model.foreign_key(navigation.foreign_key);
                    if !source.overrides(fk.navigation_source(navigation.is_on_dependent(model))) {
                        return None;
                    }
                    conflicting_navigations.push(*id);
                }
            }

            if let Some(key) = et.primary_key {
                if !source.overrides(et.primary_key_source) {
                    return None;
                }
                superseded_key = Some(key);
            }
        }

        let old_base = et.base_type;
        let old_source = et.base_type_source;

        // Link first, so conventions reacting to the removals below already
        // see this entity type as derived.
        let et = self.mb.model.entity_types.get_mut(self.id.0)?;
        et.base_type = base;
        et.base_type_source = Some(source);
        debug!(entity_type = %et.name, ?base, ?source, "base type changed");

        for navigation in conflicting_navigations {
            self.mb.remove_navigation_internal(navigation);
        }
        if let Some(key) = superseded_key {
            self.mb.remove_key_internal(key);
        }
        for property in conflicting_properties {
            self.mb.remove_property_internal(property);
        }

        let event = Event::BaseTypeChanged {
            entity_type: self.id,
            new_base: base,
            old_base,
        };
        let undo = Undo::BaseType {
            entity_type: self.id,
            base: old_base,
            source: old_source,
        };

        match self.mb.dispatch(event, undo) {
            Outcome::Reverted => None,
            _ => self.alive(),
        }
    }

    // ===== Properties =====

    /// Adds or configures the property `name` of type `ty`. A member of the
    /// same name on the backing type backs the property when its type
    /// agrees; otherwise the property is a shadow property.
    pub fn property(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        source: ConfigurationSource,
    ) -> Option<PropertyBuilder<'_>> {
        let ty = ty.into();
        let member = self.backing_member(name).filter(|member| {
            let member_ty = self.mb.model.member_type(self.id, member);
            member_ty.is_key_compatible(&ty)
        });
        self.add_property(name, ty, member, false, source)
    }

    /// Adds or configures the property backed by `member`.
    pub fn property_for_member(
        &mut self,
        member: &MemberInfo,
        source: ConfigurationSource,
    ) -> Option<PropertyBuilder<'_>> {
        let ty = self.mb.model.member_type(self.id, member);
        self.add_property(&member.name, ty, Some(member.clone()), false, source)
    }

    /// Adds a property read and written through the entity's indexer. Only
    /// entity types without a member-backed type may declare them.
    pub fn indexer_property(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        source: ConfigurationSource,
    ) -> Option<PropertyBuilder<'_>> {
        if !self.metadata().is_property_bag() {
            return None;
        }
        self.add_property(name, ty.into(), None, true, source)
    }

    pub fn remove_property(&mut self, name: &str, source: ConfigurationSource) -> Option<()> {
        let id = self.mb.model.find_declared_property(self.id, name)?;
        if !source.overrides(Some(self.mb.model.property(id).source)) {
            return None;
        }
        self.mb.remove_property_internal(id);
        Some(())
    }

    fn backing_member(&self, name: &str) -> Option<MemberInfo> {
        let type_info = self.metadata().type_info()?;
        self.mb
            .model
            .types
            .find_member(&type_info.name, name)
            .or_else(|| type_info.declared_member(name))
            .cloned()
    }

    pub(crate) fn add_property(
        &mut self,
        name: &str,
        ty: TypeRef,
        member: Option<MemberInfo>,
        is_indexer: bool,
        source: ConfigurationSource,
    ) -> Option<PropertyBuilder<'_>> {
        let model = &self.mb.model;
        let et = model.entity_type(self.id);

        let ignored = et.is_ignored(name);
        if ignored.is_some() && !source.overrides(ignored) {
            return None;
        }

        let mut replaced = None;
        if let Some(existing) = model.find_property(self.id, name) {
            let property = model.property(existing);
            let same_shape = property.ty == ty
                && property.is_indexer == is_indexer
                && property.member.as_ref().map(|m| &m.name) == member.as_ref().map(|m| &m.name);

            if same_shape {
                let property = self.mb.model.properties.get_mut(existing.0)?;
                property.source = property.source.max(source);
                return self.mb.property_builder(existing);
            }

            if property.entity_type != self.id || !source.overrides(Some(property.source)) {
                return None;
            }
            replaced = Some(existing);
        }

        let mut removed_navigation = None;
        if let Some(navigation) = model.find_navigation(self.id, name) {
            let nav = model.navigation(navigation);
            let fk = model.foreign_key(nav.foreign_key);
            if nav.declaring_entity_type(model) != self.id
                || !source.overrides(fk.navigation_source(nav.is_on_dependent(model)))
            {
                return None;
            }
            removed_navigation = Some(navigation);
        }

        // The same name declared lower in the hierarchy moves up here.
        let mut derived_duplicates = vec![];
        for derived in model.derived_types(self.id) {
            if let Some(duplicate) = model.find_declared_property(derived, name) {
                if !source.overrides(Some(model.property(duplicate).source)) {
                    return None;
                }
                derived_duplicates.push(duplicate);
            }
        }

        if let Some(navigation) = removed_navigation {
            self.mb.remove_navigation_internal(navigation);
        }
        if let Some(existing) = replaced {
            self.mb.remove_property_internal(existing);
        }
        for duplicate in derived_duplicates {
            self.mb.remove_property_internal(duplicate);
        }
        if !self.mb.model.is_live_entity_type(self.id) {
            return None;
        }

        let id = PropertyId(self.mb.model.properties.next_index());
        self.mb.model.properties.push(Property::new(
            id,
            self.id,
            name.to_string(),
            ty,
            member,
            is_indexer,
            source,
        ));

        let et = self.mb.model.entity_types.get_mut(self.id.0)?;
        et.ignored_members.shift_remove(name);
        et.properties.push(id);
        debug!(entity_type = %et.name, property = name, ?source, "property added");

        match self.mb.dispatch(Event::PropertyAdded(id), Undo::Property(id)) {
            Outcome::Reverted => None,
            _ => self.mb.property_builder(id),
        }
    }

    // ===== Keys and indexes =====

    /// Sets the primary key. Only hierarchy roots declare one.
    pub fn primary_key(
        &mut self,
        properties: &[&str],
        source: ConfigurationSource,
    ) -> Option<KeyBuilder<'_>> {
        let properties = self.mb.resolve_properties(self.id, properties)?;
        self.set_primary_key(properties, source)
    }

    pub(crate) fn set_primary_key(
        &mut self,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<KeyBuilder<'_>> {
        let model = &self.mb.model;
        let et = model.entity_type(self.id);
        if !et.is_root() {
            return None;
        }

        if let Some(current) = et.primary_key {
            if model.key(current).properties == properties {
                let et = self.mb.model.entity_types.get_mut(self.id.0)?;
                et.primary_key_source = Some(source.max_with(et.primary_key_source));
                let key = self.mb.model.keys.get_mut(current.0)?;
                key.source = key.source.max(source);
                return self.mb.key_builder(current);
            }
        }

        if !source.overrides(et.primary_key_source) {
            return None;
        }

        let previous = et.primary_key;
        let previous_source = et.primary_key_source;

        let key = match model.find_key(self.id, &properties) {
            Some(existing) => {
                let key = self.mb.model.keys.get_mut(existing.0)?;
                key.source = key.source.max(source);
                existing
            }
            None => self.mb.add_key(self.id, properties, source)?,
        };

        let et = self.mb.model.entity_types.get_mut(self.id.0)?;
        et.primary_key = Some(key);
        et.primary_key_source = Some(source);
        debug!(entity_type = %et.name, ?key, ?source, "primary key changed");

        let event = Event::PrimaryKeyChanged {
            entity_type: self.id,
            previous,
        };
        let undo = Undo::PrimaryKey {
            entity_type: self.id,
            key: previous,
            source: previous_source,
        };
        if self.mb.dispatch(event, undo) == Outcome::Reverted {
            return None;
        }

        if let Some(previous) = previous.filter(|previous| *previous != key) {
            self.drop_superseded_key(previous, source);
        }

        self.mb.key_builder(key)
    }

    /// Clears the primary key. Conventions may discover a new one unless the
    /// entity type is also marked keyless.
    pub fn remove_primary_key(&mut self, source: ConfigurationSource) -> Option<&mut Self> {
        let et = self.metadata();
        let Some(key) = et.primary_key else {
            return Some(self);
        };
        if !source.overrides(et.primary_key_source) {
            return None;
        }
        let previous_source = et.primary_key_source;

        let et = self.mb.model.entity_types.get_mut(self.id.0)?;
        et.primary_key = None;
        et.primary_key_source = None;

        let event = Event::PrimaryKeyChanged {
            entity_type: self.id,
            previous: Some(key),
        };
        let undo = Undo::PrimaryKey {
            entity_type: self.id,
            key: Some(key),
            source: previous_source,
        };
        if self.mb.dispatch(event, undo) == Outcome::Reverted {
            return None;
        }

        self.drop_superseded_key(key, source);
        self.alive()
    }

    fn drop_superseded_key(&mut self, key: KeyId, source: ConfigurationSource) {
        let model = &self.mb.model;
        let Some(k) = model.get_key(key) else {
            return;
        };
        let unused = model.foreign_keys_referencing_key(key).is_empty()
            && model.get_entity_type(k.entity_type).map_or(false, |et| et.primary_key != Some(key));
        if unused && source.overrides(Some(k.source)) {
            self.mb.remove_key_internal(key);
        }
    }

    /// Marks the entity type as having no key and removes its primary key.
    pub fn has_no_key(&mut self, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb.set_annotation_on(
            AnnotationTarget::EntityType(self.id),
            names::KEYLESS,
            Value::Bool(true),
            source,
        )?;
        self.remove_primary_key(source)
    }

    /// Adds an alternate key.
    pub fn has_key(
        &mut self,
        properties: &[&str],
        source: ConfigurationSource,
    ) -> Option<KeyBuilder<'_>> {
        let properties = self.mb.resolve_properties(self.id, properties)?;
        if let Some(existing) = self.mb.model.find_key(self.id, &properties) {
            let key = self.mb.model.keys.get_mut(existing.0)?;
            key.source = key.source.max(source);
            return self.mb.key_builder(existing);
        }
        let key = self.mb.add_key(self.id, properties, source)?;
        self.mb.key_builder(key)
    }

    pub fn has_index(
        &mut self,
        properties: &[&str],
        source: ConfigurationSource,
    ) -> Option<IndexBuilder<'_>> {
        let properties = self.mb.resolve_properties(self.id, properties)?;
        let index = self.mb.add_index(self.id, properties, source)?;
        self.mb.index_builder(index)
    }

    // ===== Ignored members =====

    /// Excludes a member from the entity type, removing the property or
    /// navigation mapped to it.
    pub fn ignore(&mut self, name: &str, source: ConfigurationSource) -> Option<&mut Self> {
        let model = &self.mb.model;
        let et = model.entity_type(self.id);

        if let Some(existing) = et.ignored_members.get(name).copied() {
            let et = self.mb.model.entity_types.get_mut(self.id.0)?;
            et.ignored_members.insert(name.to_string(), existing.max(source));
            return Some(self);
        }

        let property = model.find_declared_property(self.id, name);
        if let Some(property) = property {
            if !source.overrides(Some(model.property(property).source)) {
                return None;
            }
        }

        let navigation = et
            .navigations
            .iter()
            .copied()
            .find(|n| model.navigation(*n).name == name);
        if let Some(navigation) = navigation {
            let nav = model.navigation(navigation);
            let fk = model.foreign_key(nav.foreign_key);
            if !source.overrides(fk.navigation_source(nav.is_on_dependent(model))) {
                return None;
            }
            self.mb.remove_navigation_internal(navigation);
        }
        if let Some(property) = property {
            self.mb.remove_property_internal(property);
        }

        let et = self.mb.model.entity_types.get_mut(self.id.0)?;
        et.ignored_members.insert(name.to_string(), source);
        debug!(entity_type = %et.name, member = name, ?source, "member ignored");

        let event = Event::EntityTypeMemberIgnored {
            entity_type: self.id,
            name: name.to_string(),
        };
        let undo = Undo::MemberIgnored {
            entity_type: self.id,
            name: name.to_string(),
            previous: None,
        };
        match self.mb.dispatch(event, undo) {
            Outcome::Reverted => None,
            _ => self.alive(),
        }
    }

    // ===== Relational mapping =====

    pub fn to_table(
        &mut self,
        name: &str,
        schema: Option<&str>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        let target = AnnotationTarget::EntityType(self.id);
        self.mb.set_annotation_on(target, names::TABLE_NAME, name.into(), source)?;
        if let Some(schema) = schema {
            self.mb.set_annotation_on(target, names::SCHEMA, schema.into(), source)?;
        }
        self.alive()
    }

    pub fn to_view(
        &mut self,
        name: &str,
        schema: Option<&str>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        let target = AnnotationTarget::EntityType(self.id);
        self.mb.set_annotation_on(target, names::VIEW_NAME, name.into(), source)?;
        if let Some(schema) = schema {
            self.mb.set_annotation_on(target, names::SCHEMA, schema.into(), source)?;
        }
        self.alive()
    }

    pub fn has_comment(&mut self, comment: &str, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb.set_annotation_on(
            AnnotationTarget::EntityType(self.id),
            names::COMMENT,
            comment.into(),
            source,
        )?;
        self.alive()
    }

    /// Declares the discriminator property on a hierarchy root. The property
    /// is a required shadow string named `Discriminator` unless a name was
    /// configured earlier.
    pub fn has_discriminator(&mut self, source: ConfigurationSource) -> Option<PropertyBuilder<'_>> {
        if !self.metadata().is_root() {
            return None;
        }

        let name = self
            .metadata()
            .annotations
            .value(names::DISCRIMINATOR_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or("Discriminator")
            .to_string();

        if !self
            .metadata()
            .annotations
            .can_set(names::DISCRIMINATOR_PROPERTY, source)
        {
            return None;
        }

        let property = self.property(&name, ScalarType::String, source)?.id();
        self.mb.set_annotation_on(
            AnnotationTarget::EntityType(self.id),
            names::DISCRIMINATOR_PROPERTY,
            name.as_str().into(),
            source,
        )?;
        self.mb.set_nullable(property, Some(false), source);
        self.mb.property_builder(property)
    }

    pub fn has_discriminator_value(
        &mut self,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb.set_annotation_on(
            AnnotationTarget::EntityType(self.id),
            names::DISCRIMINATOR_VALUE,
            value.into(),
            source,
        )?;
        self.alive()
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::EntityType(self.id), name, value.into(), source)?;
        self.alive()
    }

    pub fn remove_annotation(&mut self, name: &str, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb
            .remove_annotation_on(AnnotationTarget::EntityType(self.id), name, source)?;
        self.alive()
    }

    // ===== Relationships =====

    /// Adds a relationship with this entity type as the dependent.
    ///
    /// Without explicit dependent properties, shadow foreign key properties
    /// are created, one per principal key property.
    pub fn has_relationship(
        &mut self,
        principal: EntityTypeId,
        dependent_properties: Option<&[&str]>,
        principal_key: Option<&[&str]>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyBuilder<'_>> {
        let dependent_properties = match dependent_properties {
            Some(names) => Some(self.mb.resolve_properties(self.id, names)?),
            None => None,
        };
        let principal_key = match principal_key {
            Some(names) => Some(self.mb.resolve_properties(principal, names)?),
            None => None,
        };

        let fk = self.mb.add_foreign_key(
            self.id,
            principal,
            dependent_properties,
            principal_key,
            source,
        )?;
        self.mb.foreign_key_builder(fk)
    }

    /// Adds a navigation named `name` to `target`, creating the relationship
    /// behind it.
    ///
    /// With `points_to_principal` the navigation is a reference to the
    /// principal `target`; otherwise it is on the principal side and
    /// `target` is the dependent.
    pub fn has_navigation(
        &mut self,
        name: &str,
        target: EntityTypeId,
        points_to_principal: bool,
        source: ConfigurationSource,
    ) -> Result<Option<NavigationBuilder<'_>>> {
        let model = &self.mb.model;
        if let Some(existing) = model.find_navigation(self.id, name) {
            let navigation = model.navigation(existing);
            if navigation.target_entity_type(model) == target
                && navigation.is_on_dependent(model) == points_to_principal
            {
                let fk_id = navigation.foreign_key;
                if let Some(fk) = self.mb.model.foreign_keys.get_mut(fk_id.0) {
                    let slot = if points_to_principal {
                        &mut fk.dependent_to_principal_source
                    } else {
                        &mut fk.principal_to_dependent_source
                    };
                    *slot = Some(source.max_with(*slot));
                }
                return Ok(self.mb.navigation_builder(existing));
            }
        }

        let (dependent, principal) = if points_to_principal {
            (self.id, target)
        } else {
            (target, self.id)
        };

        let Some(fk) = self.mb.add_foreign_key(dependent, principal, None, None, source) else {
            return Ok(None);
        };

        match self.mb.add_navigation(fk, name, points_to_principal, source) {
            Ok(Some(navigation)) => Ok(self.mb.navigation_builder(navigation)),
            Ok(None) => {
                self.mb.remove_foreign_key_internal(fk);
                Ok(None)
            }
            Err(err) => {
                self.mb.remove_foreign_key_internal(fk);
                Err(err)
            }
        }
    }

    pub fn remove_navigation(&mut self, name: &str, source: ConfigurationSource) -> Option<()> {
        let model = &self.mb.model;
        let id: NavigationId = model
            .entity_type(self.id)
            .navigations
            .iter()
            .copied()
            .find(|n| model.navigation(*n).name == name)?;
        let navigation = model.navigation(id);
        let fk = model.foreign_key(navigation.foreign_key);
        if !source.overrides(fk.navigation_source(navigation.is_on_dependent(model))) {
            return None;
        }
        self.mb.remove_navigation_internal(id);
        Some(())
    }
}

impl ModelBuilder {
    pub(crate) fn add_index(
        &mut self,
        entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<IndexId> {
        let existing = self.model.entity_type(entity_type).indexes.iter().copied().find(|index| {
            self.model.index(*index).properties == properties
        });
        if let Some(existing) = existing {
            let index = self.model.indexes.get_mut(existing.0)?;
            index.source = index.source.max(source);
            return Some(existing);
        }

        let id = IndexId(self.model.indexes.next_index());
        self.model.indexes.push(Index {
            id,
            entity_type,
            properties,
            unique: Facet::default(),
            name: Facet::default(),
            source,
            annotations: Default::default(),
        });
        self.model.entity_types.get_mut(entity_type.0)?.indexes.push(id);

        match self.dispatch(Event::IndexAdded(id), Undo::Index(id)) {
            Outcome::Reverted => None,
            _ => self.model.indexes.contains(id.0).then_some(id),
        }
    }
}
