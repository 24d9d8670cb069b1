use crate::annotation::names;
use crate::metadata::EntityTypeId;
use crate::{AnnotationTarget, ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

/// Gives every inheritance hierarchy a discriminator: a required shadow
/// `Discriminator` string property on the root, and the entity type's name
/// as the discriminator value of each type in the hierarchy.
///
/// A root left without derived types loses the convention-configured
/// discriminator again.
#[derive(Debug, Default)]
pub struct DiscriminatorConvention;

impl DiscriminatorConvention {
    fn configure(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) {
            return;
        }

        let root = model.root_of(entity_type);
        let derived = model.derived_types(root);
        if derived.is_empty() {
            self.clear(mb, root);
            return;
        }

        if let Some(mut root_builder) = mb.entity_type_builder(root) {
            root_builder.has_discriminator(SOURCE);
        }

        for id in std::iter::once(root).chain(derived) {
            let name = mb.model().entity_type(id).name().to_string();
            if let Some(mut et) = mb.entity_type_builder(id) {
                et.has_discriminator_value(name, SOURCE);
            }
        }
    }

    fn clear(&self, mb: &mut ModelBuilder, root: EntityTypeId) {
        let et = mb.model().entity_type(root);
        let property = et
            .annotations()
            .get(names::DISCRIMINATOR_PROPERTY)
            .filter(|annotation| annotation.source == SOURCE)
            .and_then(|annotation| annotation.value.as_str())
            .map(str::to_string);

        if let Some(property) = property {
            if let Some(mut et) = mb.entity_type_builder(root) {
                et.remove_property(&property, SOURCE);
                et.remove_annotation(names::DISCRIMINATOR_PROPERTY, SOURCE);
            }
        }

        let has_convention_value = mb
            .model()
            .entity_type(root)
            .annotations()
            .get(names::DISCRIMINATOR_VALUE)
            .map_or(false, |annotation| annotation.source == SOURCE);
        if has_convention_value {
            mb.remove_annotation_on(
                AnnotationTarget::EntityType(root),
                names::DISCRIMINATOR_VALUE,
                SOURCE,
            );
        }
    }
}

impl Convention for DiscriminatorConvention {
    fn name(&self) -> &'static str {
        "Discriminator"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::BaseTypeChanged]
    }

    fn base_type_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _new_base: Option<EntityTypeId>,
        old_base: Option<EntityTypeId>,
    ) -> ConventionFlow {
        self.configure(mb, entity_type);
        if let Some(old_base) = old_base {
            self.configure(mb, old_base);
        }
        ConventionFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberInfo, ScalarType, TypeInfo, TypeRegistry};
    use crate::{ConventionSet, Value};

    fn types() -> TypeRegistry {
        TypeRegistry::new()
            .with(TypeInfo::new("Animal").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(TypeInfo::new("Dog").extends("Animal"))
            .with(TypeInfo::new("Cat").extends("Animal"))
    }

    #[test]
    fn hierarchy_gets_shadow_discriminator() {
        let mut mb = ModelBuilder::new(types(), ConventionSet::default_set());
        let animal = mb.entity("Animal", ConfigurationSource::Explicit).unwrap().id();
        let dog = mb.entity("Dog", ConfigurationSource::Explicit).unwrap().id();
        let cat = mb.entity("Cat", ConfigurationSource::Explicit).unwrap().id();

        let model = mb.model();
        let discriminator = model.property(model.find_property(animal, "Discriminator").unwrap());
        assert!(discriminator.is_shadow());
        assert!(!discriminator.is_nullable());
        assert_eq!(discriminator.entity_type(), animal);

        for (id, name) in [(animal, "Animal"), (dog, "Dog"), (cat, "Cat")] {
            assert_eq!(model.entity_type(id).discriminator_value(), Some(&Value::from(name)));
        }
    }

    #[test]
    fn explicit_value_is_kept() {
        let mut mb = ModelBuilder::new(types(), ConventionSet::default_set());
        mb.entity("Animal", ConfigurationSource::Explicit).unwrap();
        let mut dog = mb.entity("Dog", ConfigurationSource::Explicit).unwrap();
        dog.has_discriminator_value("D", ConfigurationSource::Explicit).unwrap();
        let dog = dog.id();
        mb.entity("Cat", ConfigurationSource::Explicit).unwrap();

        assert_eq!(mb.model().entity_type(dog).discriminator_value(), Some(&Value::from("D")));
    }

    #[test]
    fn removed_when_hierarchy_dissolves() {
        let mut mb = ModelBuilder::new(types(), ConventionSet::default_set());
        let animal = mb.entity("Animal", ConfigurationSource::Explicit).unwrap().id();
        let dog = mb.entity("Dog", ConfigurationSource::Explicit).unwrap().id();
        assert!(mb.model().find_property(animal, "Discriminator").is_some());

        mb.entity_type_builder(dog)
            .unwrap()
            .has_base_type(None, ConfigurationSource::Explicit)
            .unwrap();

        let model = mb.model();
        assert!(model.find_property(animal, "Discriminator").is_none());
        assert_eq!(model.entity_type(animal).discriminator_value(), None);
        assert_eq!(model.entity_type(dog).discriminator_value(), None);
    }
}
