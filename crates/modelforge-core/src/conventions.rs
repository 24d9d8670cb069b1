//! The built-in conventions registered by
//! [`ConventionSet::default_set`](crate::ConventionSet::default_set).

mod attributes;
pub use attributes::{
    ColumnAttributeConvention, ConcurrencyCheckAttributeConvention, KeyAttributeConvention,
    MaxLengthAttributeConvention, RequiredAttributeConvention, TimestampAttributeConvention,
};

mod base_type_discovery;
pub use base_type_discovery::BaseTypeDiscoveryConvention;

mod discriminator;
pub use discriminator::DiscriminatorConvention;

mod foreign_key_index;
pub use foreign_key_index::ForeignKeyIndexConvention;

mod foreign_key_property_discovery;
pub use foreign_key_property_discovery::ForeignKeyPropertyDiscoveryConvention;

mod key_discovery;
pub use key_discovery::KeyDiscoveryConvention;

mod not_mapped;
pub use not_mapped::NotMappedMemberAttributeConvention;

mod nullability;
pub use nullability::NullabilityConvention;

mod property_discovery;
pub use property_discovery::PropertyDiscoveryConvention;

mod relationship_discovery;
pub use relationship_discovery::RelationshipDiscoveryConvention;

mod value_generation;
pub use value_generation::ValueGenerationConvention;

use crate::metadata::{EntityTypeId, Model};
use crate::reflect::MemberInfo;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Members an entity type maps itself: those of its backing type and of
/// every ancestor type that is not mapped by one of its base entity types.
/// Ordered base-most first; a redeclared member keeps the base's position.
pub(crate) fn mapped_members(model: &Model, id: EntityTypeId) -> Vec<MemberInfo> {
    let Some(type_info) = model.entity_type(id).type_info() else {
        return vec![];
    };
    if type_info.is_property_bag {
        return vec![];
    }

    let mapped_by_base: HashSet<&str> = model
        .ancestors(id)
        .into_iter()
        .filter_map(|ancestor| model.entity_type(ancestor).type_info())
        .map(|type_info| type_info.name.as_str())
        .collect();

    let mut chain = vec![type_info];
    for ancestor in model.types().ancestors(&type_info.name) {
        if mapped_by_base.contains(ancestor.name.as_str()) {
            break;
        }
        chain.push(ancestor);
    }

    let mut members = IndexMap::new();
    for ty in chain.into_iter().rev() {
        for member in &ty.members {
            members.insert(member.name.clone(), member.clone());
        }
    }
    members.into_values().collect()
}

/// A member whose type refers to other entity types.
#[derive(Debug, Clone)]
pub(crate) struct NavigationCandidate {
    pub(crate) member: MemberInfo,

    /// Name of the registered type the member refers to
    pub(crate) target_type: String,

    pub(crate) is_collection: bool,
}

impl NavigationCandidate {
    pub(crate) fn name(&self) -> &str {
        &self.member.name
    }
}

/// Returns the navigation shape of `member` on entity type `id`, if its type
/// refers to a registered, non-ignored type.
pub(crate) fn navigation_candidate(
    model: &Model,
    id: EntityTypeId,
    member: &MemberInfo,
) -> Option<NavigationCandidate> {
    let ty = model.member_type(id, member);

    let (target_type, is_collection) = match ty.entity_name() {
        Some(name) => (name.to_string(), false),
        None => (ty.element_type()?.entity_name()?.to_string(), true),
    };

    let target = model.types().get(&target_type)?;
    if target.is_property_bag || model.is_ignored(&target_type).is_some() {
        return None;
    }

    Some(NavigationCandidate {
        member: member.clone(),
        target_type,
        is_collection,
    })
}

/// Navigation candidates of `id` that are not ignored on it.
pub(crate) fn navigation_candidates(model: &Model, id: EntityTypeId) -> Vec<NavigationCandidate> {
    let et = model.entity_type(id);
    mapped_members(model, id)
        .iter()
        .filter(|member| !member.is_not_mapped() && et.is_ignored(&member.name).is_none())
        .filter_map(|member| navigation_candidate(model, id, member))
        .collect()
}
