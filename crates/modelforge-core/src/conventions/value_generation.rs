use crate::metadata::{EntityTypeId, ForeignKeyId, KeyId, Model, PropertyId, ValueGenerated};
use crate::reflect::ScalarType;
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

const SOURCE: ConfigurationSource = ConfigurationSource::Convention;

/// Decides when the store generates property values.
///
/// A primary key made of a single integer or uuid property that is not
/// part of a foreign key is generated on add. Foreign key properties are
/// never generated. Everything else goes back to unconfigured.
#[derive(Debug, Default)]
pub struct ValueGenerationConvention;

impl ValueGenerationConvention {
    fn apply(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) {
            return;
        }

        let root = model.root_of(entity_type);
        let primary_key: Vec<PropertyId> = model
            .primary_key(root)
            .map(|key| model.key(key).properties().to_vec())
            .unwrap_or_default();

        let mut changes = vec![];
        for et in std::iter::once(root).chain(model.derived_types(root)) {
            for property in model.entity_type(et).declared_properties() {
                let value = value_generated(model, *property, &primary_key);
                let p = model.property(*property);
                if p.value_generated() != value && SOURCE.overrides(p.value_generated_source()) {
                    changes.push((*property, value));
                }
            }
        }

        for (property, value) in changes {
            if let Some(mut p) = mb.property_builder(property) {
                p.value_generated(value, SOURCE);
            }
        }
    }
}

fn value_generated(
    model: &Model,
    property: PropertyId,
    primary_key: &[PropertyId],
) -> Option<ValueGenerated> {
    if !model.foreign_keys_containing(property).is_empty() {
        return Some(ValueGenerated::Never);
    }

    if primary_key != [property] {
        return None;
    }

    let generated = model
        .property(property)
        .ty()
        .scalar()
        .map_or(false, |scalar| scalar.is_integer() || scalar == ScalarType::Uuid);
    generated.then_some(ValueGenerated::OnAdd)
}

impl Convention for ValueGenerationConvention {
    fn name(&self) -> &'static str {
        "ValueGeneration"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[
            Hook::PrimaryKeyChanged,
            Hook::ForeignKeyAdded,
            Hook::ForeignKeyRemoved,
            Hook::ForeignKeyPropertiesChanged,
        ]
    }

    fn primary_key_changed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _previous: Option<KeyId>,
    ) -> ConventionFlow {
        self.apply(mb, entity_type);
        ConventionFlow::Continue
    }

    fn foreign_key_added(&self, mb: &mut ModelBuilder, foreign_key: ForeignKeyId) -> ConventionFlow {
        let dependent = mb.model().foreign_key(foreign_key).declaring_entity_type();
        self.apply(mb, dependent);
        ConventionFlow::Continue
    }

    fn foreign_key_removed(
        &self,
        mb: &mut ModelBuilder,
        entity_type: EntityTypeId,
        _principal: EntityTypeId,
    ) -> ConventionFlow {
        self.apply(mb, entity_type);
        ConventionFlow::Continue
    }

    fn foreign_key_properties_changed(
        &self,
        mb: &mut ModelBuilder,
        foreign_key: ForeignKeyId,
        _old_properties: &[PropertyId],
    ) -> ConventionFlow {
        let dependent = mb.model().foreign_key(foreign_key).declaring_entity_type();
        self.apply(mb, dependent);
        ConventionFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MemberInfo, TypeInfo, TypeRef, TypeRegistry};
    use crate::ConventionSet;

    fn generated(mb: &ModelBuilder, entity: &str, property: &str) -> Option<ValueGenerated> {
        let model = mb.model();
        let et = model.find_entity_type(entity).unwrap().id();
        model.property(model.find_property(et, property).unwrap()).value_generated()
    }

    #[test]
    fn integer_and_uuid_keys_are_generated_on_add() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("Blog").member(MemberInfo::property("Id", ScalarType::I64)))
            .with(TypeInfo::new("Tag").member(MemberInfo::property("Id", ScalarType::Uuid)))
            .with(TypeInfo::new("Country").member(MemberInfo::property("Id", ScalarType::String)));
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        for name in ["Blog", "Tag", "Country"] {
            mb.entity(name, ConfigurationSource::Explicit).unwrap();
        }

        assert_eq!(generated(&mb, "Blog", "Id"), Some(ValueGenerated::OnAdd));
        assert_eq!(generated(&mb, "Tag", "Id"), Some(ValueGenerated::OnAdd));
        assert_eq!(generated(&mb, "Country", "Id"), None);
    }

    #[test]
    fn foreign_key_properties_are_never_generated() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("Blog").member(MemberInfo::property("Id", ScalarType::I32)))
            .with(
                TypeInfo::new("Post")
                    .member(MemberInfo::property("Id", ScalarType::I32))
                    .member(MemberInfo::property("BlogId", ScalarType::I32))
                    .member(MemberInfo::property("Blog", TypeRef::entity("Blog"))),
            );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("Post", ConfigurationSource::Explicit).unwrap();

        assert_eq!(generated(&mb, "Post", "Id"), Some(ValueGenerated::OnAdd));
        assert_eq!(generated(&mb, "Post", "BlogId"), Some(ValueGenerated::Never));
    }

    #[test]
    fn composite_key_is_not_generated() {
        let types = TypeRegistry::new().with(
            TypeInfo::new("OrderLine")
                .member(MemberInfo::property("OrderId", ScalarType::I32))
                .member(MemberInfo::property("LineNo", ScalarType::I32)),
        );
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        mb.entity("OrderLine", ConfigurationSource::Explicit)
            .unwrap()
            .primary_key(&["OrderId", "LineNo"], ConfigurationSource::Explicit)
            .unwrap();

        assert_eq!(generated(&mb, "OrderLine", "OrderId"), None);
        assert_eq!(generated(&mb, "OrderLine", "LineNo"), None);
    }

    #[test]
    fn explicit_configuration_wins() {
        let types = TypeRegistry::new()
            .with(TypeInfo::new("Blog").member(MemberInfo::property("Id", ScalarType::I32)));
        let mut mb = ModelBuilder::new(types, ConventionSet::default_set());
        let blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap().id();
        let id = mb.model().find_property(blog, "Id").unwrap();
        mb.property_builder(id)
            .unwrap()
            .value_generated(ValueGenerated::Never, ConfigurationSource::Explicit)
            .unwrap();

        mb.entity_type_builder(blog)
            .unwrap()
            .property("Code", ScalarType::I32, ConfigurationSource::Explicit);
        mb.entity_type_builder(blog)
            .unwrap()
            .primary_key(&["Id"], ConfigurationSource::Explicit)
            .unwrap();
        assert_eq!(generated(&mb, "Blog", "Id"), Some(ValueGenerated::Never));
    }
}
