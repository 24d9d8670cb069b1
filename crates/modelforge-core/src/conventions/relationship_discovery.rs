use super::{mapped_members, navigation_candidate, navigation_candidates, NavigationCandidate};
use crate::metadata::{EntityTypeId, ForeignKeyId, KeyId, Model, NavigationId};
use crate::reflect::{MemberAttribute, MemberInfo};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};
use std::collections::HashSet;
use tracing::debug;

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

/// Creates relationships for members whose type refers to other entity
/// types.
///
/// Each navigation candidate is paired with the one candidate on the target
/// that refers back, if there is exactly one on each side. The collection
/// side of a pair is the principal. Between two references the dependent is
/// the side holding properties that look like a foreign key, else the side
/// being discovered. Target entity types are added as needed.
#[derive(Debug, Default)]
pub struct RelationshipDiscoveryConvention;

enum Inverse {
    None,
    Unique(NavigationCandidate),
    Ambiguous,
}

impl RelationshipDiscoveryConvention {
    fn discover(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId, pair_existing: bool) {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) || model.entity_type(entity_type).is_shared_type() {
            return;
        }

        for candidate in navigation_candidates(model, entity_type) {
            if !mb.model().is_live_entity_type(entity_type) {
                return;
            }
            self.discover_candidate(mb, entity_type, &candidate, pair_existing);
        }
    }

    fn discover_candidate(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        candidate: &NavigationCandidate,
        pair_existing: bool,
    ) {
        let model = mb.model();
        if model.entity_type(entity_type).is_ignored(candidate.name()).is_some() {
            return;
        }

        if let Some(existing) = model.find_navigation(entity_type, candidate.name()) {
            let declared_here = model.navigation(existing).declaring_entity_type(model) == entity_type;
            if pair_existing && declared_here {
                self.pair_existing(mb, entity_type, existing);
            }
            return;
        }

        let Some(target) = target_entity_type(mb, &candidate.target_type) else {
            return;
        };

        // Adding the target runs discovery on it, which may already have
        // mapped this member as its inverse.
        let model = mb.model();
        if !model.is_live_entity_type(entity_type)
            || model.find_navigation(entity_type, candidate.name()).is_some()
        {
            return;
        }

        match find_inverse(model, entity_type, candidate, target) {
            Inverse::Ambiguous => {
                debug!(
                    entity_type = %model.entity_type(entity_type).name(),
                    navigation = candidate.name(),
                    "ambiguous inverse, relationship not discovered"
                );
            }
            Inverse::None => self.create(mb, entity_type, candidate, target, None),
            Inverse::Unique(inverse) => match model.find_navigation(target, inverse.name()) {
                Some(mapped) => self.attach_to(mb, mapped, entity_type, candidate, target, inverse),
                None => self.create(mb, entity_type, candidate, target, Some(inverse)),
            },
        }
    }

    /// Creates a relationship between `entity_type` and `target` with
    /// `candidate` as one navigation and `inverse`, if any, as the other.
    fn create(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        candidate: &NavigationCandidate,
        target: EntityTypeId,
        inverse: Option<NavigationCandidate>,
    ) {
        let on_dependent = match &inverse {
            None => !candidate.is_collection,
            Some(inverse) => match (candidate.is_collection, inverse.is_collection) {
                (true, true) => return,
                (true, false) => false,
                (false, true) => true,
                (false, false) => {
                    let model = mb.model();
                    !(has_foreign_key_like_property(model, target, inverse.name(), entity_type)
                        && !has_foreign_key_like_property(model, entity_type, candidate.name(), target))
                }
            },
        };

        let (dependent, principal) = if on_dependent {
            (entity_type, target)
        } else {
            (target, entity_type)
        };

        let Some(fk) = mb.add_foreign_key(dependent, principal, None, None, SOURCE) else {
            return;
        };

        add_navigation(mb, fk, candidate.name(), on_dependent);
        if let Some(inverse) = &inverse {
            add_navigation(mb, fk, inverse.name(), !on_dependent);
        }

        finish(mb, fk);
    }

    /// Pairs `candidate` with `mapped`, the navigation its inverse member is
    /// already mapped to.
    fn attach_to(
        &self,
        mb: &mut ModelBuilder,
        mapped: NavigationId,
        entity_type: EntityTypeId,
        candidate: &NavigationCandidate,
        target: EntityTypeId,
        inverse: NavigationCandidate,
    ) {
        let model = mb.model();
        let navigation = model.navigation(mapped);
        if navigation.declaring_entity_type(model) != target
            || navigation.target_entity_type(model) != entity_type
            || navigation.inverse(model).is_some()
        {
            return;
        }

        let fk = navigation.foreign_key();
        let mapped_on_dependent = navigation.is_on_dependent(model);

        // A collection can only join on the principal side.
        if mapped_on_dependent || !candidate.is_collection {
            add_navigation(mb, fk, candidate.name(), !mapped_on_dependent);
            finish(mb, fk);
            return;
        }

        let foreign_key = model.foreign_key(fk);
        let by_convention = foreign_key.source() == SOURCE
            && foreign_key.navigation_source(mapped_on_dependent) == Some(SOURCE);
        if by_convention {
            mb.remove_navigation_internal(mapped);
            self.create(mb, entity_type, candidate, target, Some(inverse));
        }
    }

    /// Gives the unpaired navigation `existing` its inverse, if the target
    /// has exactly one member referring back.
    fn pair_existing(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId, existing: NavigationId) {
        let model = mb.model();
        let navigation = model.navigation(existing);
        if navigation.inverse(model).is_some() {
            return;
        }

        let target = navigation.target_entity_type(model);
        let Some(member) = navigation.member() else {
            return;
        };
        let Some(candidate) = navigation_candidate(model, entity_type, member) else {
            return;
        };

        let Inverse::Unique(inverse) = find_inverse(model, entity_type, &candidate, target) else {
            return;
        };
        let fk = navigation.foreign_key();
        let on_dependent = navigation.is_on_dependent(model);

        // The inverse of a principal-side navigation sits on the dependent
        // and must be a reference.
        if !on_dependent && inverse.is_collection {
            return;
        }

        if let Some(mapped) = model.find_navigation(target, inverse.name()) {
            let other = model.navigation(mapped);
            let other_fk = model.foreign_key(other.foreign_key());
            let separately_by_convention = other.foreign_key() != fk
                && other.inverse(model).is_none()
                && other_fk.source() == SOURCE
                && other_fk.navigation_source(other.is_on_dependent(model)) == Some(SOURCE);
            if !separately_by_convention {
                return;
            }
            mb.remove_navigation_internal(mapped);
        }

        if mb.model().get_foreign_key(fk).is_some() {
            add_navigation(mb, fk, inverse.name(), !on_dependent);
        }
    }

    /// Entity types with unmapped members referring to `entity_type`'s
    /// hierarchy. They could not relate to it while it had no key.
    fn referring_entity_types(&self, model: &Model, entity_type: EntityTypeId) -> Vec<EntityTypeId> {
        let mut hierarchy = model.derived_types(entity_type);
        hierarchy.push(entity_type);
        let names: HashSet<&str> = hierarchy
            .into_iter()
            .filter_map(|id| model.entity_type(id).type_info())
            .map(|type_info| type_info.name.as_str())
            .collect();

        model
            .entity_types()
            .filter(|et| !et.is_shared_type())
            .filter(|et| {
                navigation_candidates(model, et.id()).iter().any(|candidate| {
                    names.contains(candidate.target_type.as_str())
                        && model.find_navigation(et.id(), candidate.name()).is_none()
                })
            })
            .map(|et| et.id())
            .collect()
    }
}

/// Resolves or adds the entity type backed by `type_name`.
fn target_entity_type(mb: &mut ModelBuilder, type_name: &str) -> Option<EntityTypeId> {
    if let Some(et) = mb.model().find_entity_type(type_name) {
        return (!et.is_shared_type() && et.has_backing_type()).then(|| et.id());
    }
    Some(mb.entity_for_type(type_name, SOURCE)?.id())
}

fn type_name(model: &Model, id: EntityTypeId) -> Option<&str> {
    model.entity_type(id).type_info().map(|type_info| type_info.name.as_str())
}

/// A candidate is free if it is unmapped or mapped without an inverse.
fn is_free(model: &Model, owner: EntityTypeId, candidate: &NavigationCandidate) -> bool {
    model
        .find_navigation(owner, candidate.name())
        .map_or(true, |navigation| model.navigation(navigation).inverse(model).is_none())
}

fn find_inverse(
    model: &Model,
    entity_type: EntityTypeId,
    candidate: &NavigationCandidate,
    target: EntityTypeId,
) -> Inverse {
    let (Some(source_name), Some(target_name)) = (type_name(model, entity_type), type_name(model, target))
    else {
        return Inverse::None;
    };
    let self_referencing = entity_type == target;

    let mut inverses: Vec<_> = navigation_candidates(model, target)
        .into_iter()
        .filter(|c| c.target_type == source_name)
        .filter(|c| !(self_referencing && c.name() == candidate.name()))
        .filter(|c| is_free(model, target, c))
        .collect();

    if inverses.len() > 1 {
        return Inverse::Ambiguous;
    }
    let Some(inverse) = inverses.pop() else {
        return Inverse::None;
    };

    let siblings = navigation_candidates(model, entity_type)
        .into_iter()
        .filter(|c| c.target_type == target_name)
        .filter(|c| !(self_referencing && c.name() == inverse.name()))
        .filter(|c| is_free(model, entity_type, c))
        .count();

    if siblings == 1 {
        Inverse::Unique(inverse)
    } else {
        Inverse::Ambiguous
    }
}

/// Returns `true` if `dependent` has a property or scalar member named
/// `<navigation><Key>` or `<Principal><Key>` for `principal`'s
/// single-property primary key. Members count because discovery can run
/// before every member has become a property.
fn has_foreign_key_like_property(
    model: &Model,
    dependent: EntityTypeId,
    navigation: &str,
    principal: EntityTypeId,
) -> bool {
    let Some(key) = model.primary_key(principal) else {
        return false;
    };
    let [key_property] = model.key(key).properties() else {
        return false;
    };
    let key_name = model.property(*key_property).name();
    let principal_name = model.entity_type(principal).name();

    let expected = [
        format!("{navigation}{key_name}"),
        format!("{principal_name}{key_name}"),
    ];
    let et = model.entity_type(dependent);
    let properties = model
        .properties_of(dependent)
        .into_iter()
        .map(|p| model.property(p).name().to_string());
    let members = mapped_members(model, dependent)
        .into_iter()
        .filter(|member| et.is_ignored(&member.name).is_none())
        .filter(|member| model.member_type(dependent, member).scalar().is_some())
        .map(|member| member.name);

    properties
        .chain(members)
        .any(|name| expected.iter().any(|expected| expected.eq_ignore_ascii_case(&name)))
}

fn add_navigation(
    mb: &mut ModelBuilder,
    fk: ForeignKeyId,
    name: &str,
    on_dependent: bool,
) -> Option<NavigationId> {
    match mb.add_navigation(fk, name, on_dependent, SOURCE) {
        Ok(navigation) => navigation,
        Err(err) => {
            mb.record_failure(err);
            None
        }
    }
}

/// Drops `fk` if no navigation could be added to it, otherwise applies
/// `[Required]` on the dependent navigation.
fn finish(mb: &mut ModelBuilder, fk: ForeignKeyId) {
    let model = mb.model();
    let Some(foreign_key) = model.get_foreign_key(fk) else {
        return;
    };

    if foreign_key.dependent_to_principal().is_none() && foreign_key.principal_to_dependent().is_none() {
        if foreign_key.source() == SOURCE {
            mb.remove_foreign_key_internal(fk);
        }
        return;
    }

    let required = foreign_key
        .dependent_to_principal()
        .and_then(|navigation| model.navigation(navigation).member())
        .map_or(false, is_required_member);

    if required {
        if let Some(mut fk) = mb.foreign_key_builder(fk) {
            fk.is_required(true, ConfigurationSource::DataAnnotation);
        }
    }
}

fn is_required_member(member: &MemberInfo) -> bool {
    member.has_attribute(|attr| matches!(attr, MemberAttribute::Required))
}

impl Convention for RelationshipDiscoveryConvention {
    fn name(&self) -> &'static str {
        "RelationshipDiscovery"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[
            Hook::EntityTypeAdded,
            Hook::BaseTypeChanged,
            Hook::EntityTypeMemberIgnored,
            Hook::NavigationRemoved,
            Hook::PrimaryKeyChanged,
        ]
    }

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        self.discover(mb, entity_type, true);
        ConventionFlow::Continue
    }

    fn base_type_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _new_base: Option<EntityTypeId>,
        _old_base: Option<EntityTypeId>,
    ) -> ConventionFlow {
        self.discover(mb, entity_type, true);
        ConventionFlow::Continue
    }

    fn entity_type_member_ignored(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _name: &str,
    ) -> ConventionFlow {
        self.discover(mb, entity_type, true);
        ConventionFlow::Continue
    }

    /// The target may now have a candidate whose inverse is no longer
    /// ambiguous. Existing navigations are not re-paired, so a removed
    /// navigation is not put straight back.
    fn navigation_removed(
        &self,
        mb: &mut ModelBuilder,
        _entity_type: EntityTypeId,
        target: EntityTypeId,
        _name: &str,
        _member: Option<&MemberInfo>,
    ) -> ConventionFlow {
        self.discover(mb, target, false);
        ConventionFlow::Continue
    }

    fn primary_key_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _previous: Option<KeyId>,
    ) -> ConventionFlow {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) || model.primary_key(entity_type).is_none() {
            return ConventionFlow::Continue;
        }

        for referring in self.referring_entity_types(model, entity_type) {
            self.discover(mb, referring, false);
        }
        ConventionFlow::Continue
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{ScalarType, TypeInfo, TypeRef, TypeRegistry};
    use crate::ConventionSet;

    fn blog_types() -> TypeRegistry {
        TypeRegistry::new()
            .with(
                TypeInfo::new("Blog")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post")))),
            )
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Blog", TypeRef::entity("Blog"))),
            )
    }

    fn find(mb: &ModelBuilder, entity: &str, navigation: &str) -> NavigationId {
        let model = mb.model();
        let et = model.find_entity_type(entity).unwrap().id();
        model.find_navigation(et, navigation).unwrap()
    }

    #[test]
    fn pairs_collection_with_reference() {
        let mut mb = ModelBuilder::new(blog_types(), ConventionSet::default_set());
        mb.entity("Blog", ConfigurationSource::Explicit).unwrap();

        // Post was pulled in through the navigation.
        let model = mb.model();
        let post = model.find_entity_type("Post").unwrap();
        assert_eq!(post.source(), ConfigurationSource::Convention);

        let posts = model.navigation(find(&mb, "Blog", "Posts"));
        let blog = model.navigation(find(&mb, "Post", "Blog"));
        assert_eq!(posts.foreign_key(), blog.foreign_key());
        assert!(posts.is_collection(model));
        assert!(blog.is_on_dependent(model));
        assert_eq!(model.foreign_key(blog.foreign_key()).declaring_entity_type(), post.id());
    }

    #[test]
    fn self_reference_pairs_two_members() {
        let types = TypeRegistry::new().with(
            TypeInfo::new("Employee")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("Manager", TypeRef::entity("Employee")))
                .member(MemberInfo::property(
                    "Reports",
                    TypeRef::collection(TypeRef::entity("Employee")),
                )),
        );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Employee", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let manager = model.navigation(find(&mb, "Employee", "Manager"));
        let reports = model.navigation(find(&mb, "Employee", "Reports"));
        assert_eq!(manager.inverse(model), Some(reports.id()));
        assert!(manager.is_on_dependent(model));
        assert!(model.foreign_key(manager.foreign_key()).is_self_referencing());
    }

    #[test]
    fn ambiguous_inverse_is_not_discovered() {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("User")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post")))),
            )
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Author", TypeRef::entity("User")))
                    .member(MemberInfo::property("Editor", TypeRef::entity("User"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Post", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let post = model.find_entity_type("Post").unwrap().id();
        assert!(model.find_navigation(post, "Author").is_none());
        assert!(model.find_navigation(post, "Editor").is_none());
        assert_eq!(model.foreign_keys().count(), 0);
    }

    #[test]
    fn one_to_one_dependent_follows_foreign_key_property() {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("Person")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Passport", TypeRef::entity("Passport"))),
            )
            .with(
                TypeInfo::new("Passport")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("HolderId", ScalarType::I32))
                    .member(MemberInfo::property("Holder", TypeRef::entity("Person"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Person", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let holder = model.navigation(find(&mb, "Passport", "Holder"));
        let fk = model.foreign_key(holder.foreign_key());
        assert!(holder.is_on_dependent(model));
        assert!(fk.is_unique());
        assert_eq!(model.property_names(fk.properties()), ["HolderId"]);
    }

    #[test]
    fn required_navigation_makes_relationship_required() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("Blog").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(
                        MemberInfo::property("Blog", TypeRef::entity("Blog"))
                            .attribute(MemberAttribute::Required),
                    ),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Post", ConfigurationSource::Explicit).unwrap();

        let model = mb.model();
        let fk = model.foreign_key(model.navigation(find(&mb, "Post", "Blog")).foreign_key());
        assert!(fk.is_required(model));
        assert_eq!(fk.is_required_source(), Some(ConfigurationSource::DataAnnotation));
    }

    #[test]
    fn ignoring_a_navigation_keeps_the_other_end() {
        let mut mb = ModelBuilder::new(blog_types(), ConventionSet::default_set());
        let blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap().id();
        mb.entity_type_builder(blog)
            .unwrap()
            .ignore("Posts", ConfigurationSource::Explicit)
            .unwrap();

        let model = mb.model();
        assert!(model.find_navigation(blog, "Posts").is_none());
        let blog_nav = model.navigation(find(&mb, "Post", "Blog"));
        assert_eq!(blog_nav.inverse(model), None);
        assert!(!model.foreign_key(blog_nav.foreign_key()).is_unique());
    }
}
