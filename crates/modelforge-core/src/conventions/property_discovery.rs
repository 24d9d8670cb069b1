use super::{mapped_members, navigation_candidate};
use crate::metadata::EntityTypeId;
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

/// Adds a property for every scalar member an entity type maps.
///
/// Ignored members, members that look like navigations and members already
/// mapped by a base entity type are skipped.
#[derive(Debug, Default)]
pub struct PropertyDiscoveryConvention;

impl PropertyDiscoveryConvention {
    fn discover(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) {
            return;
        }
        let et = model.entity_type(entity_type);

        let members: Vec<_> = mapped_members(model, entity_type)
            .into_iter()
            .filter(|member| !member.is_not_mapped() && et.is_ignored(&member.name).is_none())
            .filter(|member| navigation_candidate(model, entity_type, member).is_none())
            .filter(|member| model.member_type(entity_type, member).scalar().is_some())
            .filter(|member| {
                model
                    .find_property(entity_type, &member.name)
                    .map_or(true, |p| model.property(p).entity_type() == entity_type)
            })
            .filter(|member| model.find_navigation(entity_type, &member.name).is_none())
            .collect();

        for member in members {
            let Some(mut et) = mb.entity_type_builder(entity_type) else {
                return;
            };
            et.property_for_member(&member, ConfigurationSource::Convention);
        }
    }
}

impl Convention for PropertyDiscoveryConvention {
    fn name(&self) -> &'static str {
        "PropertyDiscovery"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[
            Hook::EntityTypeAdded,
            Hook::BaseTypeChanged,
            Hook::EntityTypeMemberIgnored,
        ]
    }

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        self.discover(mb, entity_type);
        ConventionFlow::Continue
    }

    fn base_type_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _new_base: Option<EntityTypeId>,
        _old_base: Option<EntityTypeId>,
    ) -> ConventionFlow {
        self.discover(mb, entity_type);
        ConventionFlow::Continue
    }

    fn entity_type_member_ignored(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _name: &str,
    ) -> ConventionFlow {
        self.discover(mb, entity_type);
        ConventionFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberAttribute, MemberInfo, ScalarType, TypeInfo, TypeRef, TypeRegistry};
    use crate::ConventionSet;

    fn builder() -> ModelBuilder {
        let types = TypeRegistry::new()
            .with(
                TypeInfo::new("Entity")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("Created", ScalarType::DateTime)),
            )
            .with(
                TypeInfo::new("Blog")
                    .extends("Entity")
                    .member(MemberInfo::property("Name", ScalarType::String))
                    .member(MemberInfo::property("Posts", TypeRef::collection(TypeRef::entity("Post"))))
                    .member(
                        MemberInfo::property("Cache", ScalarType::Bytes)
                            .attribute(MemberAttribute::NotMapped),
                    ),
            )
            .with(TypeInfo::new("Post").member(MemberInfo::property("Id", ScalarType::I32)));

        let mut conventions = ConventionSet::empty();
        conventions.add(PropertyDiscoveryConvention);
        ModelBuilder::new(types, conventions)
    }

    #[test]
    fn discovers_scalars_including_unmapped_ancestors() {
        let mut mb = builder();
        let blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap().id();

        let model = mb.model();
        let names: Vec<_> = model
            .properties_of(blog)
            .into_iter()
            .map(|p| model.property(p).name())
            .collect();
        assert_eq!(names, ["Id", "Created", "Name"]);
        assert_eq!(
            model.property(model.find_property(blog, "Name").unwrap()).source(),
            ConfigurationSource::Convention
        );
    }

    #[test]
    fn ignored_member_is_not_rediscovered() {
        let mut mb = builder();
        let blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap().id();
        mb.entity_type_builder(blog)
            .unwrap()
            .ignore("Name", ConfigurationSource::Explicit)
            .unwrap();

        assert!(mb.model().find_property(blog, "Name").is_none());
    }
}
