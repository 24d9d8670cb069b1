use super::{Convention, ConventionFlow, Hook};
use crate::metadata::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::reflect::MemberInfo;
use crate::{Annotation, AnnotationTarget, ConfigurationSource, Error, ModelBuilder};
use std::sync::Arc;
use tracing::{debug, trace};

/// Nested dispatches deeper than this are treated as runaway recursion.
pub(crate) const MAX_DEPTH: usize = 64;

/// A mutation that has been applied and is waiting for conventions.
#[derive(Debug, Clone)]
pub(crate) enum Event {
    EntityTypeAdded(EntityTypeId),
    EntityTypeRemoved {
        name: String,
    },
    BaseTypeChanged {
        entity_type: EntityTypeId,
        new_base: Option<EntityTypeId>,
        old_base: Option<EntityTypeId>,
    },
    EntityTypeMemberIgnored {
        entity_type: EntityTypeId,
        name: String,
    },
    PropertyAdded(PropertyId),
    PropertyNullabilityChanged(PropertyId),
    PropertyRemoved {
        entity_type: EntityTypeId,
        name: String,
    },
    KeyAdded(KeyId),
    PrimaryKeyChanged {
        entity_type: EntityTypeId,
        previous: Option<KeyId>,
    },
    ForeignKeyAdded(ForeignKeyId),
    ForeignKeyRemoved {
        entity_type: EntityTypeId,
        principal: EntityTypeId,
    },
    ForeignKeyPropertiesChanged {
        foreign_key: ForeignKeyId,
        old_properties: Vec<PropertyId>,
    },
    ForeignKeyUniquenessChanged(ForeignKeyId),
    NavigationAdded(NavigationId),
    NavigationRemoved {
        entity_type: EntityTypeId,
        target: EntityTypeId,
        name: String,
        member: Option<MemberInfo>,
    },
    IndexAdded(IndexId),
    AnnotationChanged {
        target: AnnotationTarget,
        name: String,
        new: Option<Annotation>,
        old: Option<Annotation>,
    },
    ModelFinalizing,
}

/// How to take back the mutation that raised an event.
#[derive(Debug, Clone)]
pub(crate) enum Undo {
    /// The mutation cannot be taken back.
    Irreversible,
    EntityType(EntityTypeId),
    Property(PropertyId),
    Key(KeyId),
    ForeignKey(ForeignKeyId),
    Navigation(NavigationId),
    Index(IndexId),
    BaseType {
        entity_type: EntityTypeId,
        base: Option<EntityTypeId>,
        source: Option<ConfigurationSource>,
    },
    MemberIgnored {
        entity_type: EntityTypeId,
        name: String,
        previous: Option<ConfigurationSource>,
    },
    Nullability {
        property: PropertyId,
        value: Option<bool>,
        source: Option<ConfigurationSource>,
    },
    PrimaryKey {
        entity_type: EntityTypeId,
        key: Option<KeyId>,
        source: Option<ConfigurationSource>,
    },
    ForeignKeyProperties {
        foreign_key: ForeignKeyId,
        properties: Vec<PropertyId>,
        source: Option<ConfigurationSource>,
        principal_key: KeyId,
        principal_key_source: Option<ConfigurationSource>,
    },
    Uniqueness {
        foreign_key: ForeignKeyId,
        value: Option<bool>,
        source: Option<ConfigurationSource>,
    },
    Annotation {
        target: AnnotationTarget,
        name: String,
        old: Option<Annotation>,
    },
}

/// The final state of a dispatched mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Committed,
    Stopped,
    Reverted,
}

impl Event {
    pub(crate) fn hook(&self) -> Hook {
        match self {
            Event::EntityTypeAdded(_) => Hook::EntityTypeAdded,
            Event::EntityTypeRemoved { .. } => Hook::EntityTypeRemoved,
            Event::BaseTypeChanged { .. } => Hook::BaseTypeChanged,
            Event::EntityTypeMemberIgnored { .. } => Hook::EntityTypeMemberIgnored,
            Event::PropertyAdded(_) => Hook::PropertyAdded,
            Event::PropertyNullabilityChanged(_) => Hook::PropertyNullabilityChanged,
            Event::PropertyRemoved { .. } => Hook::PropertyRemoved,
            Event::KeyAdded(_) => Hook::KeyAdded,
            Event::PrimaryKeyChanged { .. } => Hook::PrimaryKeyChanged,
            Event::ForeignKeyAdded(_) => Hook::ForeignKeyAdded,
            Event::ForeignKeyRemoved { .. } => Hook::ForeignKeyRemoved,
            Event::ForeignKeyPropertiesChanged { .. } => Hook::ForeignKeyPropertiesChanged,
            Event::ForeignKeyUniquenessChanged(_) => Hook::ForeignKeyUniquenessChanged,
            Event::NavigationAdded(_) => Hook::NavigationAdded,
            Event::NavigationRemoved { .. } => Hook::NavigationRemoved,
            Event::IndexAdded(_) => Hook::IndexAdded,
            Event::AnnotationChanged { .. } => Hook::AnnotationChanged,
            Event::ModelFinalizing => Hook::ModelFinalizing,
        }
    }

    /// The node that must still exist for conventions to keep running.
    fn subject(&self) -> AnnotationTarget {
        match self {
            Event::EntityTypeAdded(id) => AnnotationTarget::EntityType(*id),
            Event::BaseTypeChanged { entity_type, .. }
            | Event::EntityTypeMemberIgnored { entity_type, .. }
            | Event::PropertyRemoved { entity_type, .. }
            | Event::PrimaryKeyChanged { entity_type, .. }
            | Event::ForeignKeyRemoved { entity_type, .. }
            | Event::NavigationRemoved { entity_type, .. } => {
                AnnotationTarget::EntityType(*entity_type)
            }
            Event::PropertyAdded(id) | Event::PropertyNullabilityChanged(id) => {
                AnnotationTarget::Property(*id)
            }
            Event::KeyAdded(id) => AnnotationTarget::Key(*id),
            Event::ForeignKeyAdded(id)
            | Event::ForeignKeyUniquenessChanged(id)
            | Event::ForeignKeyPropertiesChanged {
                foreign_key: id, ..
            } => AnnotationTarget::ForeignKey(*id),
            Event::NavigationAdded(id) => AnnotationTarget::Navigation(*id),
            Event::IndexAdded(id) => AnnotationTarget::Index(*id),
            Event::AnnotationChanged { target, .. } => *target,
            Event::EntityTypeRemoved { .. } | Event::ModelFinalizing => AnnotationTarget::Model,
        }
    }

    fn invoke(&self, convention: &dyn Convention, mb: &mut ModelBuilder) -> ConventionFlow {
        match self {
            Event::EntityTypeAdded(id) => convention.entity_type_added(mb, *id),
            Event::EntityTypeRemoved { name } => convention.entity_type_removed(mb, name),
            Event::BaseTypeChanged {
                entity_type,
                new_base,
                old_base,
            } => convention.base_type_changed(mb, *entity_type, *new_base, *old_base),
            Event::EntityTypeMemberIgnored { entity_type, name } => {
                convention.entity_type_member_ignored(mb, *entity_type, name)
            }
            Event::PropertyAdded(id) => convention.property_added(mb, *id),
            Event::PropertyNullabilityChanged(id) => convention.property_nullability_changed(mb, *id),
            Event::PropertyRemoved { entity_type, name } => {
                convention.property_removed(mb, *entity_type, name)
            }
            Event::KeyAdded(id) => convention.key_added(mb, *id),
            Event::PrimaryKeyChanged {
                entity_type,
                previous,
            } => convention.primary_key_changed(mb, *entity_type, *previous),
            Event::ForeignKeyAdded(id) => convention.foreign_key_added(mb, *id),
            Event::ForeignKeyRemoved {
                entity_type,
                principal,
            } => convention.foreign_key_removed(mb, *entity_type, *principal),
            Event::ForeignKeyPropertiesChanged {
                foreign_key,
                old_properties,
            } => convention.foreign_key_properties_changed(mb, *foreign_key, old_properties),
            Event::ForeignKeyUniquenessChanged(id) => {
                convention.foreign_key_uniqueness_changed(mb, *id)
            }
            Event::NavigationAdded(id) => convention.navigation_added(mb, *id),
            Event::NavigationRemoved {
                entity_type,
                target,
                name,
                member,
            } => convention.navigation_removed(mb, *entity_type, *target, name, member.as_ref()),
            Event::IndexAdded(id) => convention.index_added(mb, *id),
            Event::AnnotationChanged {
                target,
                name,
                new,
                old,
            } => convention.annotation_changed(mb, *target, name, new.as_ref(), old.as_ref()),
            Event::ModelFinalizing => convention.model_finalizing(mb),
        }
    }
}

impl ModelBuilder {
    /// Runs the conventions registered for `event`'s hook.
    ///
    /// Before each convention the subject of the event is checked; if an
    /// earlier convention removed it the dispatch ends as `Stopped`. On
    /// `StopAndRevert` only the triggering mutation is taken back, using
    /// `undo`. Changes other conventions made before the stop are kept.
    pub(crate) fn dispatch(&mut self, event: Event, undo: Undo) -> Outcome {
        let hook = event.hook();

        if self.depth >= MAX_DEPTH {
            debug!(?hook, depth = self.depth, "convention depth limit reached");
            self.record_failure(Error::convention_depth_exceeded(MAX_DEPTH));
            return Outcome::Stopped;
        }

        let conventions = Arc::clone(&self.conventions);
        let subject = event.subject();

        self.depth += 1;
        let mut outcome = Outcome::Committed;

        for convention in conventions.for_hook(hook) {
            if !self.model.contains(subject) {
                debug!(?hook, convention = convention.name(), "subject removed; dispatch stopped");
                outcome = Outcome::Stopped;
                break;
            }

            trace!(?hook, convention = convention.name(), depth = self.depth, "running convention");

            match event.invoke(convention.as_ref(), self) {
                ConventionFlow::Continue => {}
                ConventionFlow::Stop => {
                    debug!(?hook, convention = convention.name(), "convention stopped dispatch");
                    outcome = Outcome::Stopped;
                    break;
                }
                ConventionFlow::StopAndRevert => {
                    if matches!(undo, Undo::Irreversible) {
                        debug!(?hook, convention = convention.name(), "revert requested for irreversible mutation");
                        outcome = Outcome::Stopped;
                    } else {
                        debug!(?hook, convention = convention.name(), "convention reverted mutation");
                        self.undo(undo.clone());
                        outcome = Outcome::Reverted;
                    }
                    break;
                }
            }
        }

        self.depth -= 1;
        outcome
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Irreversible => {}
            Undo::EntityType(id) => self.discard_entity_type(id),
            Undo::Property(id) => self.discard_property(id),
            Undo::Key(id) => self.discard_key(id),
            Undo::ForeignKey(id) => self.discard_foreign_key(id),
            Undo::Navigation(id) => self.discard_navigation(id),
            Undo::Index(id) => self.discard_index(id),
            Undo::BaseType {
                entity_type,
                base,
                source,
            } => {
                if let Some(et) = self.model.entity_types.get_mut(entity_type.0) {
                    et.base_type = base;
                    et.base_type_source = source;
                }
            }
            Undo::MemberIgnored {
                entity_type,
                name,
                previous,
            } => {
                if let Some(et) = self.model.entity_types.get_mut(entity_type.0) {
                    match previous {
                        Some(source) => {
                            et.ignored_members.insert(name, source);
                        }
                        None => {
                            et.ignored_members.shift_remove(&name);
                        }
                    }
                }
            }
            Undo::Nullability {
                property,
                value,
                source,
            } => {
                if let Some(p) = self.model.properties.get_mut(property.0) {
                    p.nullable.restore(value, source);
                }
            }
            Undo::PrimaryKey {
                entity_type,
                key,
                source,
            } => {
                if let Some(et) = self.model.entity_types.get_mut(entity_type.0) {
                    et.primary_key = key.filter(|key| et.keys.contains(key));
                    et.primary_key_source = source;
                }
            }
            Undo::ForeignKeyProperties {
                foreign_key,
                properties,
                source,
                principal_key,
                principal_key_source,
            } => {
                if let Some(fk) = self.model.foreign_keys.get_mut(foreign_key.0) {
                    fk.properties = properties;
                    fk.properties_source = source;
                    fk.principal_key = principal_key;
                    fk.principal_key_source = principal_key_source;
                }
            }
            Undo::Uniqueness {
                foreign_key,
                value,
                source,
            } => {
                if let Some(fk) = self.model.foreign_keys.get_mut(foreign_key.0) {
                    fk.unique.restore(value, source);
                }
            }
            Undo::Annotation { target, name, old } => {
                if let Some(annotations) = self.model.annotations_of_mut(target) {
                    annotations.restore(&name, old);
                }
            }
        }
    }
}
