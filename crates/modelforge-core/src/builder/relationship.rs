use crate::convention::{Event, Outcome, Undo};
use crate::memo::Memo;
use crate::metadata::{
    DeleteBehavior, EntityTypeId, ForeignKey, ForeignKeyId, KeyId, Navigation, NavigationId,
    PropertyId,
};
use crate::reflect::TypeRef;
use crate::{AnnotationTarget, ConfigurationSource, Error, Facet, ModelBuilder, Result, Value};
use std_util::str::{starts_with_ignore_case, uniquify};
use tracing::debug;

/// Configures one relationship.
pub struct ForeignKeyBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: ForeignKeyId,
}

impl<'a> ForeignKeyBuilder<'a> {
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn metadata(&self) -> &ForeignKey {
        self.mb.model.foreign_key(self.id)
    }

    fn alive(&mut self) -> Option<&mut Self> {
        self.mb.model.foreign_keys.contains(self.id.0).then_some(self)
    }

    /// Adds the navigation on the dependent pointing at the principal.
    pub fn has_dependent_to_principal(
        &mut self,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<Option<&mut Self>> {
        Ok(match self.mb.add_navigation(self.id, name, true, source)? {
            Some(_) => self.alive(),
            None => None,
        })
    }

    /// Adds the navigation on the principal pointing at the dependents.
    pub fn has_principal_to_dependent(
        &mut self,
        name: &str,
        source: ConfigurationSource,
    ) -> Result<Option<&mut Self>> {
        Ok(match self.mb.add_navigation(self.id, name, false, source)? {
            Some(_) => self.alive(),
            None => None,
        })
    }

    /// Makes the relationship one-to-one or one-to-many.
    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb.set_foreign_key_unique(self.id, Some(unique), source)?;
        self.alive()
    }

    /// Sets whether each dependent must have a principal. Dependent
    /// properties follow: required relationships make them non-null,
    /// optional ones make the reference-typed ones nullable.
    pub fn is_required(&mut self, required: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let fk = self.mb.model.foreign_keys.get_mut(self.id.0)?;
        if !fk.required.set(Some(required), source).is_applied() {
            return None;
        }

        let properties = fk.properties.clone();
        for property in properties {
            let Some(p) = self.mb.model.get_property(property) else {
                continue;
            };
            if !required && (p.ty.is_value_type() || self.mb.model.is_primary_key_property(property)) {
                continue;
            }
            self.mb.set_nullable(property, Some(!required), source);
        }

        self.alive()
    }

    pub fn on_delete(&mut self, behavior: DeleteBehavior, source: ConfigurationSource) -> Option<&mut Self> {
        let fk = self.mb.model.foreign_keys.get_mut(self.id.0)?;
        fk.delete_behavior
            .set(Some(behavior), source)
            .is_applied()
            .then_some(self)
    }

    /// Uses existing dependent properties as the foreign key.
    pub fn has_foreign_key(&mut self, properties: &[&str], source: ConfigurationSource) -> Option<&mut Self> {
        let dependent = self.metadata().declaring_entity_type;
        let properties = self.mb.resolve_properties(dependent, properties)?;
        self.mb
            .set_foreign_key_properties(self.id, Some(properties), None, source)?;
        self.alive()
    }

    /// Targets an alternate key on the principal, adding it if needed.
    pub fn has_principal_key(&mut self, properties: &[&str], source: ConfigurationSource) -> Option<&mut Self> {
        let principal = self.metadata().principal_entity_type;
        let properties = self.mb.resolve_properties(principal, properties)?;
        let key = match self.mb.model.find_key(principal, &properties) {
            Some(key) => key,
            None => self.mb.add_key(principal, properties, source)?,
        };
        self.mb.set_foreign_key_properties(self.id, None, Some(key), source)?;
        self.alive()
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::ForeignKey(self.id), name, value.into(), source)?;
        self.alive()
    }
}

/// Configures one navigation.
pub struct NavigationBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: NavigationId,
}

impl<'a> NavigationBuilder<'a> {
    pub fn id(&self) -> NavigationId {
        self.id
    }

    pub fn metadata(&self) -> &Navigation {
        self.mb.model.navigation(self.id)
    }

    fn alive(&mut self) -> Option<&mut Self> {
        self.mb.model.navigations.contains(self.id.0).then_some(self)
    }

    /// Adds the navigation at the other end of this relationship.
    pub fn set_inverse(&mut self, name: &str, source: ConfigurationSource) -> Result<Option<&mut Self>> {
        let navigation = self.metadata();
        let fk = navigation.foreign_key;
        let on_dependent = navigation.is_on_dependent(&self.mb.model);

        Ok(match self.mb.add_navigation(fk, name, !on_dependent, source)? {
            Some(_) => self.alive(),
            None => None,
        })
    }

    pub fn is_eager_loaded(&mut self, eager: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let navigation = self.mb.model.navigations.get_mut(self.id.0)?;
        navigation
            .eager_loaded
            .set(Some(eager), source)
            .is_applied()
            .then_some(self)
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::Navigation(self.id), name, value.into(), source)?;
        self.alive()
    }
}

impl ModelBuilder {
    /// Adds a foreign key from `dependent` to `principal`.
    ///
    /// The principal key defaults to the principal's primary key; without
    /// one no relationship can be added. Missing dependent properties are
    /// created as nullable shadow properties.
    pub(crate) fn add_foreign_key(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        dependent_properties: Option<Vec<PropertyId>>,
        principal_key: Option<Vec<PropertyId>>,
        source: ConfigurationSource,
    ) -> Option<ForeignKeyId> {
        if !self.model.is_live_entity_type(dependent) || !self.model.is_live_entity_type(principal) {
            return None;
        }

        let (principal_key, principal_key_source) = match principal_key {
            Some(properties) => {
                let key = match self.model.find_key(principal, &properties) {
                    Some(key) => key,
                    None => self.add_key(principal, properties, source)?,
                };
                (key, Some(source))
            }
            None => (self.model.primary_key(principal)?, None),
        };

        let key_properties = self.model.key(principal_key).properties.clone();
        let (properties, properties_source) = match dependent_properties {
            Some(properties) => {
                if !self.properties_match_key(&properties, &key_properties) {
                    return None;
                }
                (properties, Some(source))
            }
            None => (
                self.create_shadow_foreign_key_properties(dependent, principal, &key_properties, None)?,
                None,
            ),
        };

        let id = ForeignKeyId(self.model.foreign_keys.next_index());
        self.model.foreign_keys.push(ForeignKey {
            id,
            declaring_entity_type: dependent,
            properties,
            properties_source,
            principal_entity_type: principal,
            principal_key,
            principal_key_source,
            dependent_to_principal: None,
            dependent_to_principal_source: None,
            principal_to_dependent: None,
            principal_to_dependent_source: None,
            unique: Facet::default(),
            required: Facet::default(),
            delete_behavior: Facet::default(),
            source,
            annotations: Default::default(),
        });
        self.model.entity_types.get_mut(dependent.0)?.foreign_keys.push(id);

        debug!(
            dependent = %self.model.entity_type(dependent).name,
            principal = %self.model.entity_type(principal).name,
            ?source,
            "foreign key added"
        );

        match self.dispatch(Event::ForeignKeyAdded(id), Undo::ForeignKey(id)) {
            Outcome::Reverted => None,
            _ => self.model.foreign_keys.contains(id.0).then_some(id),
        }
    }

    fn properties_match_key(&self, properties: &[PropertyId], key: &[PropertyId]) -> bool {
        properties.len() == key.len()
            && properties.iter().zip(key).all(|(dependent, principal)| {
                self.model
                    .property(*dependent)
                    .ty
                    .is_key_compatible(&self.model.property(*principal).ty)
            })
    }

    /// Creates one shadow property per principal key property, named after
    /// `prefix` (the principal's name by default) and the key property.
    pub(crate) fn create_shadow_foreign_key_properties(
        &mut self,
        dependent: EntityTypeId,
        principal: EntityTypeId,
        key_properties: &[PropertyId],
        prefix: Option<&str>,
    ) -> Option<Vec<PropertyId>> {
        let prefix = prefix
            .map(str::to_string)
            .unwrap_or_else(|| self.model.entity_type(principal).name.clone());

        let mut created = vec![];
        for key_property in key_properties {
            let key_property = self.model.property(*key_property);
            let base = if starts_with_ignore_case(&key_property.name, &prefix) {
                key_property.name.clone()
            } else {
                format!("{prefix}{}", key_property.name)
            };
            let ty: TypeRef = key_property.ty.non_nullable().clone().nullable();

            let name = uniquify(&base, |candidate| self.is_member_name_taken(dependent, candidate));
            let mut et = self.entity_type_builder(dependent)?;
            let property = et
                .add_property(&name, ty, None, false, ConfigurationSource::Convention)?
                .id();
            created.push(property);
        }

        Some(created)
    }

    /// Returns `true` if `name` is used by a member anywhere in `entity_type`'s
    /// hierarchy, or ignored on it.
    pub(crate) fn is_member_name_taken(&self, entity_type: EntityTypeId, name: &str) -> bool {
        let model = &self.model;
        let in_hierarchy = model
            .self_and_ancestors(entity_type)
            .into_iter()
            .chain(model.derived_types(entity_type))
            .any(|et| {
                let et = model.entity_type(et);
                et.properties.iter().any(|p| model.property(*p).name == name)
                    || et.navigations.iter().any(|n| model.navigation(*n).name == name)
            });

        let on_backing_type = model
            .entity_type(entity_type)
            .type_info()
            .map_or(false, |type_info| model.types.find_member(&type_info.name, name).is_some());

        in_hierarchy || on_backing_type || model.entity_type(entity_type).is_ignored(name).is_some()
    }

    /// Changes the dependent properties and/or the principal key of a
    /// foreign key.
    ///
    /// When only the principal key changes and the current dependent
    /// properties no longer line up with it, fresh shadow properties are
    /// created. Shadow properties left unused are removed.
    pub(crate) fn set_foreign_key_properties(
        &mut self,
        id: ForeignKeyId,
        properties: Option<Vec<PropertyId>>,
        principal_key: Option<KeyId>,
        source: ConfigurationSource,
    ) -> Option<()> {
        let fk = self.model.get_foreign_key(id)?;

        if properties.is_some() && !source.overrides(fk.properties_source) {
            return None;
        }
        if principal_key.is_some() && !source.overrides(fk.principal_key_source) {
            return None;
        }

        let dependent = fk.declaring_entity_type;
        let principal = fk.principal_entity_type;
        let old_properties = fk.properties.clone();
        let old_properties_source = fk.properties_source;
        let old_key = fk.principal_key;
        let old_key_source = fk.principal_key_source;

        let new_key = principal_key.unwrap_or(old_key);
        let key_properties = self.model.key(new_key).properties.clone();

        let mut created = vec![];
        let (new_properties, new_properties_source) = match properties {
            Some(properties) => {
                if !self.properties_match_key(&properties, &key_properties) {
                    return None;
                }
                (properties, Some(source))
            }
            None if self.properties_match_key(&old_properties, &key_properties) => {
                (old_properties.clone(), old_properties_source)
            }
            None => {
                if !source.overrides(old_properties_source) {
                    return None;
                }
                created = self.create_shadow_foreign_key_properties(
                    dependent,
                    principal,
                    &key_properties,
                    None,
                )?;
                (created.clone(), None)
            }
        };

        let new_key_source = match principal_key {
            Some(_) => Some(source),
            None => old_key_source,
        };

        if new_properties == old_properties && new_key == old_key {
            let fk = self.model.foreign_keys.get_mut(id.0)?;
            if new_properties_source.is_some() {
                fk.properties_source = Some(source.max_with(fk.properties_source));
            }
            if principal_key.is_some() {
                fk.principal_key_source = Some(source.max_with(fk.principal_key_source));
            }
            return Some(());
        }

        let fk = self.model.foreign_keys.get_mut(id.0)?;
        fk.properties = new_properties;
        fk.properties_source = new_properties_source;
        fk.principal_key = new_key;
        fk.principal_key_source = new_key_source;

        let event = Event::ForeignKeyPropertiesChanged {
            foreign_key: id,
            old_properties: old_properties.clone(),
        };
        let undo = Undo::ForeignKeyProperties {
            foreign_key: id,
            properties: old_properties.clone(),
            source: old_properties_source,
            principal_key: old_key,
            principal_key_source: old_key_source,
        };

        if self.dispatch(event, undo) == Outcome::Reverted {
            self.remove_unused_shadow_properties(&created);
            return None;
        }

        self.remove_unused_shadow_properties(&old_properties);
        self.model.foreign_keys.contains(id.0).then_some(())
    }

    /// Sets uniqueness, refusing values the principal-side navigation's
    /// member cannot hold.
    pub(crate) fn set_foreign_key_unique(
        &mut self,
        id: ForeignKeyId,
        unique: Option<bool>,
        source: ConfigurationSource,
    ) -> Option<()> {
        let fk = self.model.get_foreign_key(id)?;

        if let (Some(unique), Some(navigation)) = (unique, fk.principal_to_dependent) {
            let navigation = self.model.navigation(navigation);
            let compatible = Navigation::is_compatible(
                &self.model,
                &navigation.name,
                navigation.member.as_ref(),
                fk.principal_entity_type,
                fk.declaring_entity_type,
                Some(!unique),
                false,
            );
            if !matches!(compatible, Ok(true)) {
                return None;
            }
        }

        let change = self.model.foreign_keys.get_mut(id.0)?.unique.set(unique, source);
        let crate::FacetChange::Changed { old, old_source } = change else {
            return change.is_applied().then_some(());
        };

        let undo = Undo::Uniqueness {
            foreign_key: id,
            value: old,
            source: old_source,
        };
        match self.dispatch(Event::ForeignKeyUniquenessChanged(id), undo) {
            Outcome::Reverted => None,
            _ => Some(()),
        }
    }

    /// Adds a navigation named `name` to one end of `fk`.
    ///
    /// Fails when the declaring entity type has a backing type without a
    /// member of that name, or when the member's type cannot refer to the
    /// target. A navigation on the principal side adjusts the relationship's
    /// uniqueness to the member's shape where the current configuration
    /// allows.
    pub(crate) fn add_navigation(
        &mut self,
        fk: ForeignKeyId,
        name: &str,
        on_dependent: bool,
        source: ConfigurationSource,
    ) -> Result<Option<NavigationId>> {
        let model = &self.model;
        let Some(foreign_key) = model.get_foreign_key(fk) else {
            return Ok(None);
        };

        let (declaring, target, slot) = if on_dependent {
            (
                foreign_key.declaring_entity_type,
                foreign_key.principal_entity_type,
                foreign_key.dependent_to_principal,
            )
        } else {
            (
                foreign_key.principal_entity_type,
                foreign_key.declaring_entity_type,
                foreign_key.principal_to_dependent,
            )
        };
        let slot_source = foreign_key.navigation_source(on_dependent);

        if let Some(existing) = slot {
            if model.navigation(existing).name == name {
                if let Some(fk) = self.model.foreign_keys.get_mut(fk.0) {
                    let slot_source = if on_dependent {
                        &mut fk.dependent_to_principal_source
                    } else {
                        &mut fk.principal_to_dependent_source
                    };
                    *slot_source = Some(source.max_with(*slot_source));
                }
                return Ok(Some(existing));
            }
            if !source.overrides(slot_source) {
                return Ok(None);
            }
        }

        let declaring_type = model.entity_type(declaring);
        let ignored = declaring_type.is_ignored(name);
        if ignored.is_some() && !source.overrides(ignored) {
            return Ok(None);
        }

        let mut conflicting_property = None;
        if let Some(property) = model.find_property(declaring, name) {
            let p = model.property(property);
            if p.entity_type != declaring || !source.overrides(Some(p.source)) {
                return Ok(None);
            }
            conflicting_property = Some(property);
        }

        let mut conflicting_navigation = None;
        if let Some(navigation) = model.find_navigation(declaring, name) {
            let nav = model.navigation(navigation);
            let owner = model.foreign_key(nav.foreign_key);
            if Some(navigation) != slot
                && (nav.declaring_entity_type(model) != declaring
                    || !source.overrides(owner.navigation_source(nav.is_on_dependent(model))))
            {
                return Ok(None);
            }
            conflicting_navigation = Some(navigation).filter(|n| Some(*n) != slot);
        }

        let member = match declaring_type.type_info() {
            Some(type_info) if !type_info.is_property_bag => {
                match model.types.find_member(&type_info.name, name) {
                    Some(member) => Some(member.clone()),
                    None => return Err(Error::no_backing_navigation(name, &declaring_type.name)),
                }
            }
            _ => None,
        };

        // Validate before touching the model so a failure leaves it as it was.
        let unique_from_member = member
            .as_ref()
            .filter(|_| !on_dependent)
            .map(|member| !member.ty.is_sequence());
        let should_be_collection = if on_dependent {
            Some(false)
        } else {
            match unique_from_member {
                Some(unique) if foreign_key.unique.can_set(source) => Some(!unique),
                _ => Some(!foreign_key.is_unique()),
            }
        };
        Navigation::is_compatible(
            model,
            name,
            member.as_ref(),
            declaring,
            target,
            should_be_collection,
            true,
        )?;

        if let Some(navigation) = conflicting_navigation {
            self.remove_navigation_internal(navigation);
        }
        if let Some(property) = conflicting_property {
            self.remove_property_internal(property);
        }
        if let Some(existing) = slot {
            self.detach_navigation(existing);
        }
        if let Some(unique) = unique_from_member {
            let current = self.model.get_foreign_key(fk).map(|fk| fk.unique.value());
            if current != Some(Some(unique)) {
                self.set_foreign_key_unique(fk, Some(unique), source);
            }
        }

        if !self.model.foreign_keys.contains(fk.0) || !self.model.is_live_entity_type(declaring) {
            return Ok(None);
        }

        let id = NavigationId(self.model.navigations.next_index());
        self.model.navigations.push(Navigation {
            id,
            name: name.to_string(),
            foreign_key: fk,
            member,
            eager_loaded: Facet::default(),
            annotations: Default::default(),
            accessor: Memo::new(),
        });

        if let Some(foreign_key) = self.model.foreign_keys.get_mut(fk.0) {
            if on_dependent {
                foreign_key.dependent_to_principal = Some(id);
                foreign_key.dependent_to_principal_source = Some(source);
            } else {
                foreign_key.principal_to_dependent = Some(id);
                foreign_key.principal_to_dependent_source = Some(source);
            }
        }
        if let Some(et) = self.model.entity_types.get_mut(declaring.0) {
            et.ignored_members.shift_remove(name);
            et.navigations.push(id);
        }
        debug!(navigation = name, ?fk, on_dependent, ?source, "navigation added");

        Ok(match self.dispatch(Event::NavigationAdded(id), Undo::Navigation(id)) {
            Outcome::Reverted => None,
            _ => self.model.navigations.contains(id.0).then_some(id),
        })
    }
}
