use crate::metadata::{EntityTypeId, Model};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

/// Links entity types along the inheritance chain of their backing types.
///
/// A newly added entity type derives from the nearest ancestor type that is
/// mapped, and becomes the base of already-mapped types it is now the
/// nearest mapped ancestor of.
#[derive(Debug, Default)]
pub struct BaseTypeDiscoveryConvention;

impl Convention for BaseTypeDiscoveryConvention {
    fn name(&self) -> &'static str {
        "BaseTypeDiscovery"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::EntityTypeAdded]
    }

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        if let Some(base) = nearest_mapped_ancestor(mb.model(), entity_type) {
            if let Some(mut et) = mb.entity_type_builder(entity_type) {
                et.has_base_type(Some(base), ConfigurationSource::Convention);
            }
        }

        let adoptable: Vec<_> = mb
            .model()
            .entity_types()
            .filter(|et| et.id() != entity_type)
            .filter(|et| ConfigurationSource::Convention.overrides(et.base_type_source()))
            .filter(|et| nearest_mapped_ancestor(mb.model(), et.id()) == Some(entity_type))
            .filter(|et| et.base_type() != Some(entity_type))
            .map(|et| et.id())
            .collect();

        for derived in adoptable {
            if !mb.model().is_live_entity_type(entity_type) {
                break;
            }
            if let Some(mut et) = mb.entity_type_builder(derived) {
                et.has_base_type(Some(entity_type), ConfigurationSource::Convention);
            }
        }

        ConventionFlow::Continue
    }
}

/// The closest ancestor of `id`'s backing type that is mapped by a
/// non-shared entity type.
fn nearest_mapped_ancestor(model: &Model, id: EntityTypeId) -> Option<EntityTypeId> {
    let et = model.get_entity_type(id)?;
    if et.is_shared_type() {
        return None;
    }
    let type_info = et.type_info()?;

    model
        .types()
        .ancestors(&type_info.name)
        .into_iter()
        .find_map(|ancestor| {
            model
                .find_entity_type(&ancestor.name)
                .filter(|candidate| !candidate.is_shared_type() && candidate.has_backing_type())
                .map(|candidate| candidate.id())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRegistry};
    use crate::ConventionSet;

    fn types() -> TypeRegistry {
        TypeRegistry::new()
            .with(TypeInfo::new("Animal").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(TypeInfo::new("Mammal").extends("Animal"))
            .with(TypeInfo::new("Cat").extends("Mammal"))
    }

    fn builder() -> ModelBuilder {
        let mut conventions = ConventionSet::empty();
        conventions.add(BaseTypeDiscoveryConvention);
        ModelBuilder::new(types(), conventions)
    }

    #[test]
    fn links_to_nearest_mapped_ancestor() {
        let mut mb = builder();
        let animal = mb.entity("Animal", ConfigurationSource::Explicit).unwrap().id();
        let cat = mb.entity("Cat", ConfigurationSource::Explicit).unwrap().id();

        assert_eq!(mb.model().entity_type(cat).base_type(), Some(animal));
        assert_eq!(
            mb.model().entity_type(cat).base_type_source(),
            Some(ConfigurationSource::Convention)
        );
    }

    #[test]
    fn adopts_derived_types_added_earlier() {
        let mut mb = builder();
        let cat = mb.entity("Cat", ConfigurationSource::Explicit).unwrap().id();
        let animal = mb.entity("Animal", ConfigurationSource::Explicit).unwrap().id();
        assert_eq!(mb.model().entity_type(cat).base_type(), Some(animal));

        // A nearer ancestor takes over.
        let mammal = mb.entity("Mammal", ConfigurationSource::Explicit).unwrap().id();
        assert_eq!(mb.model().entity_type(cat).base_type(), Some(mammal));
        assert_eq!(mb.model().entity_type(mammal).base_type(), Some(animal));
    }
}
