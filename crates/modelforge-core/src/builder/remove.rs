//! Removal of nodes, with and without raising events.
//!
//! `remove_*` functions raise the removal events conventions listen to.
//! `discard_*` functions tear nodes down silently and are used to undo
//! reverted additions.

use crate::convention::{Event, Undo};
use crate::metadata::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::{ConfigurationSource, ModelBuilder};
use tracing::debug;

impl ModelBuilder {
    pub(crate) fn remove_entity_type_internal(&mut self, id: EntityTypeId) {
        let Some(et) = self.model.get_entity_type(id) else {
            return;
        };
        let name = et.name.clone();

        // Unregister first so nothing triggered below can reach the entity
        // type by name.
        self.model.entity_type_names.shift_remove(&name);

        let foreign_keys: Vec<_> = self
            .model
            .foreign_keys
            .iter()
            .filter(|fk| fk.declaring_entity_type == id || fk.principal_entity_type == id)
            .map(|fk| fk.id)
            .collect();
        for fk in foreign_keys {
            self.remove_foreign_key_internal(fk);
        }

        for derived in self.model.direct_derived_types(id) {
            if let Some(et) = self.model.entity_types.get_mut(derived.0) {
                et.base_type = None;
                et.base_type_source = None;
            }
            self.dispatch(
                Event::BaseTypeChanged {
                    entity_type: derived,
                    new_base: None,
                    old_base: Some(id),
                },
                Undo::Irreversible,
            );
        }

        self.discard_entity_type(id);
        debug!(entity_type = %name, "entity type removed");
        self.dispatch(Event::EntityTypeRemoved { name }, Undo::Irreversible);
    }

    pub(crate) fn remove_property_internal(&mut self, id: PropertyId) {
        let Some(property) = self.model.get_property(id) else {
            return;
        };
        let entity_type = property.entity_type;
        let name = property.name.clone();

        if let Some(et) = self.model.entity_types.get_mut(entity_type.0) {
            et.properties.retain(|p| *p != id);
        }

        for fk in self.model.foreign_keys_containing(id) {
            self.remove_foreign_key_internal(fk);
        }
        for key in self.model.keys_containing(id) {
            self.remove_key_internal(key);
        }
        for index in self.model.indexes_containing(id) {
            self.discard_index(index);
        }

        self.model.properties.remove(id.0);
        self.dispatch(
            Event::PropertyRemoved { entity_type, name },
            Undo::Irreversible,
        );
    }

    pub(crate) fn remove_key_internal(&mut self, id: KeyId) {
        let Some(key) = self.model.get_key(id) else {
            return;
        };
        let entity_type = key.entity_type;

        for fk in self.model.foreign_keys_referencing_key(id) {
            self.remove_foreign_key_internal(fk);
        }

        self.model.keys.remove(id.0);
        let was_primary = match self.model.entity_types.get_mut(entity_type.0) {
            Some(et) => {
                et.keys.retain(|k| *k != id);
                if et.primary_key == Some(id) {
                    et.primary_key = None;
                    et.primary_key_source = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if was_primary {
            self.dispatch(
                Event::PrimaryKeyChanged {
                    entity_type,
                    previous: Some(id),
                },
                Undo::Irreversible,
            );
        }
    }

    pub(crate) fn remove_foreign_key_internal(&mut self, id: ForeignKeyId) {
        let Some(fk) = self.model.foreign_keys.remove(id.0) else {
            return;
        };
        if let Some(et) = self.model.entity_types.get_mut(fk.declaring_entity_type.0) {
            et.foreign_keys.retain(|f| *f != id);
        }

        let ends = [
            (fk.dependent_to_principal, fk.declaring_entity_type, fk.principal_entity_type),
            (fk.principal_to_dependent, fk.principal_entity_type, fk.declaring_entity_type),
        ];
        for (navigation, declaring, target) in ends {
            let Some(navigation) = navigation.and_then(|n| self.model.navigations.remove(n.0))
            else {
                continue;
            };
            if let Some(et) = self.model.entity_types.get_mut(declaring.0) {
                et.navigations.retain(|n| *n != navigation.id);
            }
            self.dispatch(
                Event::NavigationRemoved {
                    entity_type: declaring,
                    target,
                    name: navigation.name,
                    member: navigation.member,
                },
                Undo::Irreversible,
            );
        }

        self.dispatch(
            Event::ForeignKeyRemoved {
                entity_type: fk.declaring_entity_type,
                principal: fk.principal_entity_type,
            },
            Undo::Irreversible,
        );

        self.remove_unused_shadow_properties(&fk.properties);
    }

    /// Removes a navigation from its foreign key. A convention-created
    /// relationship left with no navigations is removed as well.
    pub(crate) fn remove_navigation_internal(&mut self, id: NavigationId) {
        let Some(fk_id) = self.model.get_navigation(id).map(|n| n.foreign_key) else {
            return;
        };

        self.detach_navigation(id);

        let orphaned = self.model.get_foreign_key(fk_id).map_or(false, |fk| {
            fk.dependent_to_principal.is_none()
                && fk.principal_to_dependent.is_none()
                && fk.source == ConfigurationSource::Convention
        });
        if orphaned {
            self.remove_foreign_key_internal(fk_id);
        }
    }

    /// Removes a navigation, keeping its foreign key.
    pub(crate) fn detach_navigation(&mut self, id: NavigationId) {
        let Some(navigation) = self.model.get_navigation(id) else {
            return;
        };
        let fk_id = navigation.foreign_key;
        let declaring = navigation.declaring_entity_type(&self.model);
        let target = navigation.target_entity_type(&self.model);

        let Some(navigation) = self.model.navigations.remove(id.0) else {
            return;
        };
        if let Some(fk) = self.model.foreign_keys.get_mut(fk_id.0) {
            if fk.dependent_to_principal == Some(id) {
                fk.dependent_to_principal = None;
                fk.dependent_to_principal_source = None;
            } else {
                fk.principal_to_dependent = None;
                fk.principal_to_dependent_source = None;
            }
        }
        if let Some(et) = self.model.entity_types.get_mut(declaring.0) {
            et.navigations.retain(|n| *n != id);
        }

        self.dispatch(
            Event::NavigationRemoved {
                entity_type: declaring,
                target,
                name: navigation.name,
                member: navigation.member,
            },
            Undo::Irreversible,
        );
    }

    /// Removes convention-created shadow properties that no key, foreign key
    /// or index uses any more.
    pub(crate) fn remove_unused_shadow_properties(&mut self, properties: &[PropertyId]) {
        for property in properties {
            if self.is_unused_shadow(*property) {
                self.remove_property_internal(*property);
            }
        }
    }

    fn is_unused_shadow(&self, id: PropertyId) -> bool {
        let Some(property) = self.model.get_property(id) else {
            return false;
        };
        let listed = self
            .model
            .get_entity_type(property.entity_type)
            .map_or(false, |et| et.properties.contains(&id));

        listed
            && property.is_convention_shadow()
            && self.model.keys_containing(id).is_empty()
            && self.model.foreign_keys_containing(id).is_empty()
            && self.model.indexes_containing(id).is_empty()
    }

    // ===== Silent teardown =====

    pub(crate) fn discard_entity_type(&mut self, id: EntityTypeId) {
        let Some(et) = self.model.get_entity_type(id) else {
            return;
        };
        if self.model.entity_type_names.get(&et.name) == Some(&id) {
            let name = et.name.clone();
            self.model.entity_type_names.shift_remove(&name);
        }

        let foreign_keys: Vec<_> = self
            .model
            .foreign_keys
            .iter()
            .filter(|fk| fk.declaring_entity_type == id || fk.principal_entity_type == id)
            .map(|fk| fk.id)
            .collect();
        for fk in foreign_keys {
            self.discard_foreign_key(fk);
        }

        for et in self.model.entity_types.iter_mut() {
            if et.base_type == Some(id) {
                et.base_type = None;
                et.base_type_source = None;
            }
        }

        let properties = self.model.entity_type(id).properties.clone();
        for property in properties {
            self.discard_property(property);
        }

        if let Some(et) = self.model.entity_types.remove(id.0) {
            for key in et.keys {
                self.model.keys.remove(key.0);
            }
            for index in et.indexes {
                self.model.indexes.remove(index.0);
            }
            for navigation in et.navigations {
                self.model.navigations.remove(navigation.0);
            }
        }
    }

    pub(crate) fn discard_property(&mut self, id: PropertyId) {
        let Some(property) = self.model.get_property(id) else {
            return;
        };
        let entity_type = property.entity_type;

        for fk in self.model.foreign_keys_containing(id) {
            self.discard_foreign_key(fk);
        }
        for key in self.model.keys_containing(id) {
            self.discard_key(key);
        }
        for index in self.model.indexes_containing(id) {
            self.discard_index(index);
        }

        if let Some(et) = self.model.entity_types.get_mut(entity_type.0) {
            et.properties.retain(|p| *p != id);
        }
        self.model.properties.remove(id.0);
    }

    pub(crate) fn discard_key(&mut self, id: KeyId) {
        let Some(key) = self.model.keys.remove(id.0) else {
            return;
        };
        for fk in self.model.foreign_keys_referencing_key(id) {
            self.discard_foreign_key(fk);
        }
        if let Some(et) = self.model.entity_types.get_mut(key.entity_type.0) {
            et.keys.retain(|k| *k != id);
            if et.primary_key == Some(id) {
                et.primary_key = None;
                et.primary_key_source = None;
            }
        }
    }

    pub(crate) fn discard_foreign_key(&mut self, id: ForeignKeyId) {
        let Some(fk) = self.model.foreign_keys.remove(id.0) else {
            return;
        };
        if let Some(et) = self.model.entity_types.get_mut(fk.declaring_entity_type.0) {
            et.foreign_keys.retain(|f| *f != id);
        }
        for navigation in [fk.dependent_to_principal, fk.principal_to_dependent]
            .into_iter()
            .flatten()
        {
            self.model.navigations.remove(navigation.0);
            for et in [fk.declaring_entity_type, fk.principal_entity_type] {
                if let Some(et) = self.model.entity_types.get_mut(et.0) {
                    et.navigations.retain(|n| *n != navigation);
                }
            }
        }
        for property in &fk.properties {
            if self.is_unused_shadow(*property) {
                self.discard_property(*property);
            }
        }
    }

    pub(crate) fn discard_navigation(&mut self, id: NavigationId) {
        let Some(navigation) = self.model.navigations.remove(id.0) else {
            return;
        };
        if let Some(fk) = self.model.foreign_keys.get_mut(navigation.foreign_key.0) {
            if fk.dependent_to_principal == Some(id) {
                fk.dependent_to_principal = None;
                fk.dependent_to_principal_source = None;
            }
            if fk.principal_to_dependent == Some(id) {
                fk.principal_to_dependent = None;
                fk.principal_to_dependent_source = None;
            }
        }
        for et in self.model.entity_types.iter_mut() {
            et.navigations.retain(|n| *n != id);
        }
    }

    pub(crate) fn discard_index(&mut self, id: IndexId) {
        let Some(index) = self.model.indexes.remove(id.0) else {
            return;
        };
        if let Some(et) = self.model.entity_types.get_mut(index.entity_type.0) {
            et.indexes.retain(|i| *i != id);
        }
    }
}
