//! Conventions and the dispatcher that runs them.
//!
//! Every mutation made through a builder raises an event. The dispatcher
//! invokes the conventions registered for that event's [`Hook`] in
//! registration order. A convention may mutate the model through the
//! [`ModelBuilder`] it is handed, which dispatches nested events
//! synchronously before the convention resumes.
//!
//! The dispatcher is single-writer: it is only reachable through
//! `&mut ModelBuilder`.

mod dispatch;
pub(crate) use dispatch::{Event, Outcome, Undo};

mod set;
pub use set::ConventionSet;

use crate::metadata::{
    EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId,
};
use crate::reflect::MemberInfo;
use crate::{Annotation, AnnotationTarget, ModelBuilder};

/// What the dispatcher does after a convention returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConventionFlow {
    /// Run the next convention.
    Continue,

    /// Skip the remaining conventions. The mutation stays applied.
    Stop,

    /// Skip the remaining conventions and undo the triggering mutation. The
    /// builder call that caused it returns `None`. Removals cannot be undone;
    /// for them this behaves like [`ConventionFlow::Stop`].
    StopAndRevert,
}

/// The points in the model-building pipeline conventions can observe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Hook {
    EntityTypeAdded,
    EntityTypeRemoved,
    BaseTypeChanged,
    EntityTypeMemberIgnored,
    PropertyAdded,
    PropertyNullabilityChanged,
    PropertyRemoved,
    KeyAdded,
    PrimaryKeyChanged,
    ForeignKeyAdded,
    ForeignKeyRemoved,
    ForeignKeyPropertiesChanged,
    ForeignKeyUniquenessChanged,
    NavigationAdded,
    NavigationRemoved,
    IndexAdded,
    AnnotationChanged,
    ModelFinalizing,
}

impl Hook {
    pub const ALL: [Hook; 18] = [
        Hook::EntityTypeAdded,
        Hook::EntityTypeRemoved,
        Hook::BaseTypeChanged,
        Hook::EntityTypeMemberIgnored,
        Hook::PropertyAdded,
        Hook::PropertyNullabilityChanged,
        Hook::PropertyRemoved,
        Hook::KeyAdded,
        Hook::PrimaryKeyChanged,
        Hook::ForeignKeyAdded,
        Hook::ForeignKeyRemoved,
        Hook::ForeignKeyPropertiesChanged,
        Hook::ForeignKeyUniquenessChanged,
        Hook::NavigationAdded,
        Hook::NavigationRemoved,
        Hook::IndexAdded,
        Hook::AnnotationChanged,
        Hook::ModelFinalizing,
    ];
}

/// A rewrite rule over the model.
///
/// A convention declares the hooks it listens to in [`Convention::hooks`]
/// and overrides the matching methods. Each method receives the builder and
/// the subject of the event, and must leave the model consistent on return.
pub trait Convention: Send + Sync {
    /// Identifies the convention within a [`ConventionSet`].
    fn name(&self) -> &'static str;

    fn hooks(&self) -> &'static [Hook];

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        let _ = (mb, entity_type);
        ConventionFlow::Continue
    }

    /// The entity type no longer exists; only its name is available.
    fn entity_type_removed(&self, mb: &mut ModelBuilder, name: &str) -> ConventionFlow {
        let _ = (mb, name);
        ConventionFlow::Continue
    }

    fn base_type_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        new_base: Option<EntityTypeId>,
        old_base: Option<EntityTypeId>,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, new_base, old_base);
        ConventionFlow::Continue
    }

    fn entity_type_member_ignored(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        name: &str,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, name);
        ConventionFlow::Continue
    }

    fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
        let _ = (mb, property);
        ConventionFlow::Continue
    }

    fn property_nullability_changed(
        &self,
        mb: &mut ModelBuilder,
        property: PropertyId,
    ) -> ConventionFlow {
        let _ = (mb, property);
        ConventionFlow::Continue
    }

    fn property_removed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        name: &str,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, name);
        ConventionFlow::Continue
    }

    fn key_added(&self, mb: &mut ModelBuilder, key: KeyId) -> ConventionFlow {
        let _ = (mb, key);
        ConventionFlow::Continue
    }

    /// `previous` may already have been removed from the model.
    fn primary_key_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        previous: Option<KeyId>,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, previous);
        ConventionFlow::Continue
    }

    fn foreign_key_added(&self, mb: &mut ModelBuilder, foreign_key: ForeignKeyId) -> ConventionFlow {
        let _ = (mb, foreign_key);
        ConventionFlow::Continue
    }

    fn foreign_key_removed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        principal: EntityTypeId,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, principal);
        ConventionFlow::Continue
    }

    fn foreign_key_properties_changed(
        &self,
        mb: &mut ModelBuilder,
        foreign_key: ForeignKeyId,
        old_properties: &[PropertyId],
    ) -> ConventionFlow {
        let _ = (mb, foreign_key, old_properties);
        ConventionFlow::Continue
    }

    fn foreign_key_uniqueness_changed(
        &self,
        mb: &mut ModelBuilder,
        foreign_key: ForeignKeyId,
    ) -> ConventionFlow {
        let _ = (mb, foreign_key);
        ConventionFlow::Continue
    }

    fn navigation_added(&self, mb: &mut ModelBuilder, navigation: NavigationId) -> ConventionFlow {
        let _ = (mb, navigation);
        ConventionFlow::Continue
    }

    fn navigation_removed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        target: EntityTypeId,
        name: &str,
        member: Option<&MemberInfo>,
    ) -> ConventionFlow {
        let _ = (mb, entity_type, target, name, member);
        ConventionFlow::Continue
    }

    fn index_added(&self, mb: &mut ModelBuilder, index: IndexId) -> ConventionFlow {
        let _ = (mb, index);
        ConventionFlow::Continue
    }

    fn annotation_changed(
        &self,
        mb: &mut ModelBuilder,
        target: AnnotationTarget,
        name: &str,
        new: Option<&Annotation>,
        old: Option<&Annotation>,
    ) -> ConventionFlow {
        let _ = (mb, target, name, new, old);
        ConventionFlow::Continue
    }

    fn model_finalizing(&self, mb: &mut ModelBuilder) -> ConventionFlow {
        let _ = mb;
        ConventionFlow::Continue
    }
}
