//! Conventions reading attributes on a property's backing member. All of
//! them configure at [`ConfigurationSource::DataAnnotation`].

use crate::metadata::{PropertyId, ValueGenerated};
use crate::reflect::{MemberAttribute, MemberInfo};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

const SOURCE: ConfigurationSource = ConfigurationSource::DataAnnotation;

/// Returns the backing member of `property` if it carries an attribute
/// matching `f`.
fn member_with(
    mb: &ModelBuilder,
    property: PropertyId,
    f: impl Fn(&MemberAttribute) -> bool,
) -> Option<MemberInfo> {
    mb.model()
        .property(property)
        .member()
        .filter(|member| member.has_attribute(f))
        .cloned()
}

/// Generates the boilerplate shared by attribute conventions: the name, the
/// `PropertyAdded` hook and a dispatch into `apply`.
macro_rules! attribute_convention {
    ($ty:ident, $name:literal) => {
        impl Convention for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn hooks(&self) -> &'static [Hook] {
                &[Hook::PropertyAdded]
            }

            fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
                self.apply(mb, property);
                ConventionFlow::Continue
            }
        }
    };
}

/// `[Required]` makes the property non-nullable.
#[derive(Debug, Default)]
pub struct RequiredAttributeConvention;

impl RequiredAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        if member_with(mb, property, |attr| matches!(attr, MemberAttribute::Required)).is_some() {
            mb.set_nullable(property, Some(false), SOURCE);
        }
    }
}

attribute_convention!(RequiredAttributeConvention, "RequiredAttribute");

#[derive(Debug, Default)]
pub struct MaxLengthAttributeConvention;

impl MaxLengthAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        let max_length = mb
            .model()
            .property(property)
            .member()
            .and_then(|member| {
                member.find_attribute(|attr| match attr {
                    MemberAttribute::MaxLength(len) => Some(*len),
                    _ => None,
                })
            });

        if let (Some(len), Some(mut p)) = (max_length, mb.property_builder(property)) {
            p.has_max_length(len, SOURCE);
        }
    }
}

attribute_convention!(MaxLengthAttributeConvention, "MaxLengthAttribute");

/// `[Key]` makes the property the primary key of its hierarchy root. Several
/// `[Key]` members form a composite key in the order they are discovered.
#[derive(Debug, Default)]
pub struct KeyAttributeConvention;

impl KeyAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        if member_with(mb, property, |attr| matches!(attr, MemberAttribute::Key)).is_none() {
            return;
        }

        let model = mb.model();
        let entity_type = model.property(property).entity_type();
        let et = model.entity_type(entity_type);
        if !et.is_root() {
            return;
        }

        let mut properties = vec![];
        if et.primary_key_source() == Some(SOURCE) {
            if let Some(key) = et.primary_key() {
                properties.extend_from_slice(model.key(key).properties());
            }
        }
        if properties.contains(&property) {
            return;
        }
        properties.push(property);

        if let Some(mut et) = mb.entity_type_builder(entity_type) {
            et.set_primary_key(properties, SOURCE);
        }
    }
}

attribute_convention!(KeyAttributeConvention, "KeyAttribute");

#[derive(Debug, Default)]
pub struct ConcurrencyCheckAttributeConvention;

impl ConcurrencyCheckAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        if member_with(mb, property, |attr| matches!(attr, MemberAttribute::ConcurrencyCheck))
            .is_none()
        {
            return;
        }
        if let Some(mut p) = mb.property_builder(property) {
            p.is_concurrency_token(true, SOURCE);
        }
    }
}

attribute_convention!(ConcurrencyCheckAttributeConvention, "ConcurrencyCheckAttribute");

/// `[Timestamp]` marks a row version: a concurrency token the store
/// regenerates on every write.
#[derive(Debug, Default)]
pub struct TimestampAttributeConvention;

impl TimestampAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        if member_with(mb, property, |attr| matches!(attr, MemberAttribute::Timestamp)).is_none() {
            return;
        }
        if let Some(mut p) = mb.property_builder(property) {
            p.is_concurrency_token(true, SOURCE);
            p.value_generated(ValueGenerated::OnAddOrUpdate, SOURCE);
        }
    }
}

attribute_convention!(TimestampAttributeConvention, "TimestampAttribute");

#[derive(Debug, Default)]
pub struct ColumnAttributeConvention;

impl ColumnAttributeConvention {
    fn apply(&self, mb: &mut ModelBuilder, property: PropertyId) {
        let column = mb
            .model()
            .property(property)
            .member()
            .and_then(|member| {
                member.find_attribute(|attr| match attr {
                    MemberAttribute::Column { name, type_name } => {
                        Some((name.clone(), type_name.clone()))
                    }
                    _ => None,
                })
            });

        let (Some((name, type_name)), Some(mut p)) = (column, mb.property_builder(property)) else {
            return;
        };
        if let Some(name) = name {
            p.has_column_name(name, SOURCE);
        }
        if let Some(type_name) = type_name {
            p.has_column_type(type_name, SOURCE);
        }
    }
}

attribute_convention!(ColumnAttributeConvention, "ColumnAttribute");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventions::{KeyDiscoveryConvention, PropertyDiscoveryConvention};
    use crate::reflect::{Nullability, ScalarType, TypeInfo, TypeRegistry};
    use crate::ConventionSet;

    fn build(ty: TypeInfo) -> ModelBuilder {
        let name = ty.name.clone();
        let conventions = ConventionSet::default_set();
        let mut mb = ModelBuilder::new(TypeRegistry::new().with(ty), conventions);
        mb.entity(&name, ConfigurationSource::Explicit).unwrap();
        mb
    }

    fn property<'a>(mb: &'a ModelBuilder, entity: &str, name: &str) -> &'a crate::metadata::Property {
        let model = mb.model();
        let et = model.find_entity_type(entity).unwrap();
        model.property(model.find_property(et.id(), name).unwrap())
    }

    #[test]
    fn required_overrides_nullable_annotation() {
        let mb = build(
            TypeInfo::new("Person").member(
                MemberInfo::property("Name", ScalarType::String)
                    .nullability(Nullability::Annotated)
                    .attribute(MemberAttribute::Required),
            ),
        );
        let name = property(&mb, "Person", "Name");
        assert!(!name.is_nullable());
        assert_eq!(name.is_nullable_source(), Some(SOURCE));
    }

    #[test]
    fn facet_attributes() {
        let mb = build(
            TypeInfo::new("Document")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(
                    MemberInfo::property("Title", ScalarType::String)
                        .attribute(MemberAttribute::MaxLength(200))
                        .attribute(MemberAttribute::Column {
                            name: Some("title_text".into()),
                            type_name: Some("nvarchar(200)".into()),
                        }),
                )
                .member(
                    MemberInfo::property("Version", ScalarType::Bytes)
                        .attribute(MemberAttribute::Timestamp),
                )
                .member(
                    MemberInfo::property("Revision", ScalarType::I32)
                        .attribute(MemberAttribute::ConcurrencyCheck),
                ),
        );

        let title = property(&mb, "Document", "Title");
        assert_eq!(title.max_length(), Some(200));
        assert_eq!(title.column_name().map(String::as_str), Some("title_text"));
        assert_eq!(title.column_type().map(String::as_str), Some("nvarchar(200)"));

        let version = property(&mb, "Document", "Version");
        assert!(version.is_concurrency_token());
        assert_eq!(version.value_generated(), Some(ValueGenerated::OnAddOrUpdate));

        let revision = property(&mb, "Document", "Revision");
        assert!(revision.is_concurrency_token());
        assert_eq!(revision.value_generated(), None);
    }

    #[test]
    fn key_attributes_form_composite_key() {
        let mut conventions = ConventionSet::empty();
        conventions.add(PropertyDiscoveryConvention);
        conventions.add(KeyDiscoveryConvention);
        conventions.add(KeyAttributeConvention);
        let types = TypeRegistry::new().with(
            TypeInfo::new("OrderLine")
                .member(MemberInfo::property("Id", ScalarType::I32))
                .member(MemberInfo::property("OrderId", ScalarType::I32).attribute(MemberAttribute::Key))
                .member(MemberInfo::property("LineNo", ScalarType::I32).attribute(MemberAttribute::Key)),
        );
        let mut mb = ModelBuilder::new(types, conventions);
        let id = mb.entity("OrderLine", ConfigurationSource::Explicit).unwrap().id();

        let model = mb.model();
        let et = model.entity_type(id);
        let key = model.key(et.primary_key().unwrap());
        assert_eq!(model.property_names(key.properties()), ["OrderId", "LineNo"]);
        assert_eq!(et.primary_key_source(), Some(SOURCE));
    }
}
