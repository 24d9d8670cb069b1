use crate::metadata::{Property, PropertyAccessMode, PropertyId, ValueGenerated};
use crate::storage::ConverterRef;
use crate::{AnnotationTarget, ConfigurationSource, ModelBuilder, Value};

/// Configures one property.
pub struct PropertyBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: PropertyId,
}

/// Generates a setter and a `can_set_*` probe per facet. Setters apply the
/// value if the facet's current source allows it.
macro_rules! facet_setters {
    ( $( $setter:ident, $probe:ident, $facet:ident: $arg:ty => $conv:expr; )* ) => {
        $(
            pub fn $setter(&mut self, value: $arg, source: ConfigurationSource) -> Option<&mut Self> {
                let value = $conv(value);
                self.property_mut()?.$facet.set(value, source).is_applied().then_some(self)
            }

            pub fn $probe(&self, source: ConfigurationSource) -> bool {
                self.metadata().$facet.can_set(source)
            }
        )*
    };
}

impl<'a> PropertyBuilder<'a> {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn metadata(&self) -> &Property {
        self.mb.model.property(self.id)
    }

    fn property_mut(&mut self) -> Option<&mut Property> {
        self.mb.model.properties.get_mut(self.id.0)
    }

    /// Sets whether the property must hold a value.
    ///
    /// Value types without a nullable wrapper and primary key properties
    /// cannot be made optional.
    pub fn is_required(&mut self, required: bool, source: ConfigurationSource) -> Option<&mut Self> {
        if !required {
            let property = self.metadata();
            if property.ty.is_value_type() || self.mb.model.is_primary_key_property(self.id) {
                return None;
            }
        }

        self.mb.set_nullable(self.id, Some(!required), source)?;
        self.mb.model.properties.contains(self.id.0).then_some(self)
    }

    pub fn can_set_is_required(&self, source: ConfigurationSource) -> bool {
        self.metadata().nullable.can_set(source)
    }

    /// Clears configured nullability so the property falls back to its
    /// type's nullability.
    pub fn clear_is_required(&mut self, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb.set_nullable(self.id, None, source)?;
        self.mb.model.properties.contains(self.id.0).then_some(self)
    }

    facet_setters! {
        has_max_length, can_set_max_length, max_length: impl Into<Option<u32>> => Into::into;
        has_precision, can_set_precision, precision: impl Into<Option<u32>> => Into::into;
        has_scale, can_set_scale, scale: impl Into<Option<u32>> => Into::into;
        is_unicode, can_set_is_unicode, unicode: impl Into<Option<bool>> => Into::into;
        is_fixed_length, can_set_is_fixed_length, fixed_length: impl Into<Option<bool>> => Into::into;
        is_concurrency_token, can_set_is_concurrency_token, concurrency_token: impl Into<Option<bool>> => Into::into;
        value_generated, can_set_value_generated, value_generated: impl Into<Option<ValueGenerated>> => Into::into;
        use_property_access_mode, can_set_property_access_mode, access_mode: impl Into<Option<PropertyAccessMode>> => Into::into;
        has_default_value, can_set_default_value, default_value: impl Into<Value> => |v| Some(Into::<Value>::into(v));
        has_default_value_sql, can_set_default_value_sql, default_value_sql: impl Into<String> => |v| Some(Into::<String>::into(v));
        has_computed_column_sql, can_set_computed_column_sql, computed_column_sql: impl Into<String> => |v| Some(Into::<String>::into(v));
        has_column_name, can_set_column_name, column_name: impl Into<String> => |v| Some(Into::<String>::into(v));
        has_column_type, can_set_column_type, column_type: impl Into<String> => |v| Some(Into::<String>::into(v));
        has_comment, can_set_comment, comment: impl Into<String> => |v| Some(Into::<String>::into(v));
        use_collation, can_set_collation, collation: impl Into<String> => |v| Some(Into::<String>::into(v));
        has_field, can_set_field, field: impl Into<String> => |v| Some(Into::<String>::into(v));
        is_stored, can_set_is_stored, stored: bool => Some;
        has_conversion, can_set_conversion, value_converter: ConverterRef => Some;
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::Property(self.id), name, value.into(), source)?;
        self.mb.model.properties.contains(self.id.0).then_some(self)
    }

    pub fn remove_annotation(&mut self, name: &str, source: ConfigurationSource) -> Option<&mut Self> {
        self.mb
            .remove_annotation_on(AnnotationTarget::Property(self.id), name, source)?;
        self.mb.model.properties.contains(self.id.0).then_some(self)
    }
}
