use crate::metadata::PropertyId;
use crate::reflect::{MemberAttribute, Nullability, TypeRef};
use crate::{ConfigurationSource, Convention, ConventionFlow, Hook, ModelBuilder};

/// Makes reference-typed properties required when their backing member is
/// declared non-nullable.
///
/// The signal is the member's declared [`Nullability`], or that of the
/// generic argument when the member's type is a generic parameter. A
/// `MaybeNull` attribute keeps the property optional. Shadow and indexer
/// properties have no signal and keep the default.
#[derive(Debug, Default)]
pub struct NullabilityConvention;

impl Convention for NullabilityConvention {
    fn name(&self) -> &'static str {
        "Nullability"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::PropertyAdded]
    }

    fn property_added(&self, mb: &mut ModelBuilder, property: PropertyId) -> ConventionFlow {
        let model = mb.model();
        let p = model.property(property);
        let Some(member) = p.member() else {
            return ConventionFlow::Continue;
        };
        if p.ty().is_value_type() || matches!(p.ty(), TypeRef::Nullable(_)) {
            return ConventionFlow::Continue;
        }

        let nullability = match model.resolve_generic_argument(p.entity_type(), member) {
            Some(argument) => argument.nullability,
            None => member.nullability,
        };
        let maybe_null = member.has_attribute(|attr| matches!(attr, MemberAttribute::MaybeNull));

        if nullability == Nullability::NotAnnotated && !maybe_null {
            mb.set_nullable(property, Some(false), ConfigurationSource::Convention);
        }

        ConventionFlow::Continue
    }
}
