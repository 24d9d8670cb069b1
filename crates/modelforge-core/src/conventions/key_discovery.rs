use crate::metadata::{EntityTypeId, PropertyId};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

/// Finds the primary key of root entity types by name: a property called
/// `Id`, otherwise one called `<EntityName>Id`, ignoring case.
///
/// Keys configured from data annotations or explicitly are left alone, as
/// are keyless entity types.
#[derive(Debug, Default)]
pub struct KeyDiscoveryConvention;

impl KeyDiscoveryConvention {
    fn discover(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) {
        let model = mb.model();
        if !model.is_live_entity_type(entity_type) {
            return;
        }
        let et = model.entity_type(entity_type);
        if !et.is_root()
            || et.is_keyless()
            || !ConfigurationSource::Convention.overrides(et.primary_key_source())
        {
            return;
        }

        let candidate = find_candidate(mb, entity_type);
        let current = mb.model().entity_type(entity_type).primary_key();

        match candidate {
            Some(property) => {
                let unchanged = current
                    .map_or(false, |key| mb.model().key(key).properties() == [property]);
                if !unchanged {
                    if let Some(mut et) = mb.entity_type_builder(entity_type) {
                        et.set_primary_key(vec![property], ConfigurationSource::Convention);
                    }
                }
            }
            None if current.is_some() => {
                if let Some(mut et) = mb.entity_type_builder(entity_type) {
                    et.remove_primary_key(ConfigurationSource::Convention);
                }
            }
            None => {}
        }
    }
}

fn find_candidate(mb: &ModelBuilder, entity_type: EntityTypeId) -> Option<PropertyId> {
    let model = mb.model();
    let et = model.entity_type(entity_type);
    let type_name = et.type_info().map_or(et.name(), |type_info| type_info.name.as_str());

    let matching = |expected: &str| -> Option<PropertyId> {
        let mut found = et
            .declared_properties()
            .iter()
            .copied()
            .filter(|p| model.property(*p).name().eq_ignore_ascii_case(expected));
        let first = found.next()?;
        // Names differing only by case are ambiguous.
        found.next().is_none().then_some(first)
    };

    matching("Id")
        .or_else(|| matching(&format!("{}Id", et.name())))
        .or_else(|| matching(&format!("{type_name}Id")))
}

impl Convention for KeyDiscoveryConvention {
    fn name(&self) -> &'static str {
        "KeyDiscovery"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[
            Hook::EntityTypeAdded,
            Hook::PropertyAdded,
            Hook::BaseTypeChanged,
            Hook::PropertyRemoved,
        ]
    }

    fn entity_type_added(&self, mb: &mut ModelBuilder, entity_type: EntityTypeId) -> ConventionFlow {
        self.discover(mb, entity_type);
        ConventionFlow::Continue
    }

    fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
        let entity_type = mb.model().property(property).entity_type();
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

    fn property_removed(
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
    use crate::reflect::ScalarType;
    use crate::ConventionSet;
    use crate::reflect::TypeRegistry;

    fn builder() -> ModelBuilder {
        let mut conventions = ConventionSet::empty();
        conventions.add(KeyDiscoveryConvention);
        ModelBuilder::new(TypeRegistry::new(), conventions)
    }

    fn key_names(mb: &ModelBuilder, entity_type: EntityTypeId) -> Vec<&str> {
        let model = mb.model();
        match model.primary_key(entity_type) {
            Some(key) => model.property_names(model.key(key).properties()),
            None => vec![],
        }
    }

    #[test]
    fn prefers_id_over_type_name_id() {
        let mut mb = builder();
        let mut blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap();
        blog.property("BlogId", ScalarType::I32, ConfigurationSource::Explicit);
        let id = blog.id();
        assert_eq!(key_names(&mb, id), ["BlogId"]);

        let mut blog = mb.entity_type_builder(id).unwrap();
        blog.property("ID", ScalarType::I32, ConfigurationSource::Explicit);
        assert_eq!(key_names(&mb, id), ["ID"]);
    }

    #[test]
    fn rediscovers_when_key_property_is_removed() {
        let mut mb = builder();
        let mut blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap();
        blog.property("Id", ScalarType::I32, ConfigurationSource::Explicit);
        blog.property("BlogId", ScalarType::I32, ConfigurationSource::Explicit);
        let id = blog.id();
        assert_eq!(key_names(&mb, id), ["Id"]);

        mb.entity_type_builder(id)
            .unwrap()
            .remove_property("Id", ConfigurationSource::Explicit)
            .unwrap();
        assert_eq!(key_names(&mb, id), ["BlogId"]);
    }

    #[test]
    fn explicit_key_is_kept() {
        let mut mb = builder();
        let mut blog = mb.entity("Blog", ConfigurationSource::Explicit).unwrap();
        blog.property("Code", ScalarType::String, ConfigurationSource::Explicit);
        blog.primary_key(&["Code"], ConfigurationSource::Explicit).unwrap();
        let id = blog.id();

        mb.entity_type_builder(id)
            .unwrap()
            .property("Id", ScalarType::I32, ConfigurationSource::Explicit);
        assert_eq!(key_names(&mb, id), ["Code"]);
    }

    #[test]
    fn keyless_entity_types_get_no_key() {
        let mut mb = builder();
        let mut view = mb.entity("Report", ConfigurationSource::Explicit).unwrap();
        view.has_no_key(ConfigurationSource::Explicit).unwrap();
        view.property("Id", ScalarType::I32, ConfigurationSource::Explicit);
        let id = view.id();
        assert!(key_names(&mb, id).is_empty());
    }
}
