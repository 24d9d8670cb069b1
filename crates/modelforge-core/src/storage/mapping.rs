use super::{BoolToZeroOne, ConverterRef, NumberToString, StoreType};
use crate::metadata::{Property, ValueGenerated};
use crate::reflect::{ScalarType, TypeRef};
use std::fmt;

/// How values of one model type are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    pub store_type: StoreType,

    /// Scalar type of the model values
    pub scalar: ScalarType,

    /// Converter between the model values and the store type, when the two
    /// differ
    pub converter: Option<ConverterRef>,
}

impl TypeMapping {
    fn new(store_type: StoreType, scalar: ScalarType) -> TypeMapping {
        TypeMapping {
            store_type,
            scalar,
            converter: None,
        }
    }
}

/// Facets of a property that influence its store type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingInfo {
    /// Store type configured for the column; wins over everything else
    pub store_type_name: Option<String>,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unicode: Option<bool>,
    pub fixed_length: Option<bool>,
    pub row_version: bool,
}

impl MappingInfo {
    pub fn for_property(property: &Property) -> MappingInfo {
        MappingInfo {
            store_type_name: property.column_type().cloned(),
            max_length: property.max_length(),
            precision: property.precision(),
            scale: property.scale(),
            unicode: property.unicode(),
            fixed_length: property.fixed_length(),
            row_version: property.is_concurrency_token()
                && property.value_generated() == Some(ValueGenerated::OnAddOrUpdate),
        }
    }
}

/// Finds store types for model types, and model types for store types.
pub trait TypeMappingSource: Send + Sync + fmt::Debug {
    /// Returns `None` if values of `ty` cannot be stored.
    fn find_mapping(&self, ty: &TypeRef, info: &MappingInfo) -> Option<TypeMapping>;

    /// Reverse lookup used when reading a database schema. Returns `None` if
    /// the store type is not recognized.
    fn find_mapping_for_store_type(&self, store_type: &str) -> Option<TypeMapping>;
}

/// Provider-neutral mappings onto the types of [`StoreType`].
#[derive(Debug, Default)]
pub struct DefaultTypeMappingSource {
    _priv: (),
}

impl DefaultTypeMappingSource {
    fn default_store_type(scalar: ScalarType, info: &MappingInfo) -> StoreType {
        let fixed = info.fixed_length == Some(true);
        match scalar {
            ScalarType::Bool => StoreType::Boolean,
            ScalarType::I16 => StoreType::Integer(2),
            ScalarType::I32 => StoreType::Integer(4),
            ScalarType::I64 => StoreType::Integer(8),
            ScalarType::U8 => StoreType::UnsignedInteger(1),
            ScalarType::F32 => StoreType::Real(4),
            ScalarType::F64 => StoreType::Real(8),
            ScalarType::Decimal => match info.precision {
                Some(precision) => StoreType::Numeric(Some((precision, info.scale.unwrap_or(0)))),
                None => StoreType::Numeric(Some((18, 2))),
            },
            ScalarType::String => match info.max_length {
                Some(len) if fixed => StoreType::Char(len),
                Some(len) => StoreType::VarChar(len),
                None => StoreType::Text,
            },
            ScalarType::Bytes if info.row_version => StoreType::RowVersion,
            ScalarType::Bytes => match info.max_length {
                Some(len) if fixed => StoreType::Binary(len),
                Some(len) => StoreType::VarBinary(len),
                None => StoreType::Blob,
            },
            ScalarType::Uuid => StoreType::Uuid,
            ScalarType::DateTime => StoreType::Timestamp,
            ScalarType::Date => StoreType::Date,
            ScalarType::Time => StoreType::Time,
        }
    }

    /// Picks a converter for storing `scalar` values in a column whose
    /// natural type is `stored`.
    fn converter(scalar: ScalarType, stored: ScalarType) -> Option<ConverterRef> {
        match (scalar, stored) {
            (ScalarType::Bool, stored) if stored.is_integer() => Some(ConverterRef::new(BoolToZeroOne)),
            (scalar, ScalarType::String) => NumberToString::new(scalar).map(ConverterRef::new),
            _ => None,
        }
    }
}

impl TypeMappingSource for DefaultTypeMappingSource {
    fn find_mapping(&self, ty: &TypeRef, info: &MappingInfo) -> Option<TypeMapping> {
        let scalar = ty.scalar()?;

        let Some(name) = &info.store_type_name else {
            return Some(TypeMapping::new(Self::default_store_type(scalar, info), scalar));
        };

        let store_type = StoreType::parse(name);
        let mut mapping = TypeMapping::new(store_type, scalar);
        if let Some(stored) = mapping.store_type.scalar() {
            if stored != scalar {
                mapping.converter = Self::converter(scalar, stored);
            }
        }
        Some(mapping)
    }

    fn find_mapping_for_store_type(&self, store_type: &str) -> Option<TypeMapping> {
        let store_type = StoreType::parse(store_type);
        let scalar = store_type.scalar()?;
        Some(TypeMapping::new(store_type, scalar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(ty: impl Into<TypeRef>, info: MappingInfo) -> TypeMapping {
        DefaultTypeMappingSource::default()
            .find_mapping(&ty.into(), &info)
            .unwrap()
    }

    #[test]
    fn facets_shape_the_store_type() {
        assert_eq!(mapping(ScalarType::String, MappingInfo::default()).store_type, StoreType::Text);

        let info = MappingInfo {
            max_length: Some(10),
            fixed_length: Some(true),
            ..Default::default()
        };
        assert_eq!(mapping(ScalarType::String, info).store_type, StoreType::Char(10));

        let info = MappingInfo {
            precision: Some(9),
            ..Default::default()
        };
        assert_eq!(
            mapping(ScalarType::Decimal, info).store_type,
            StoreType::Numeric(Some((9, 0)))
        );

        let info = MappingInfo {
            row_version: true,
            ..Default::default()
        };
        assert_eq!(mapping(ScalarType::Bytes, info).store_type, StoreType::RowVersion);
    }

    #[test]
    fn nullable_types_map_like_their_underlying_type() {
        let ty = TypeRef::from(ScalarType::I64).nullable();
        assert_eq!(mapping(ty, MappingInfo::default()).store_type, StoreType::Integer(8));
    }

    #[test]
    fn configured_store_type_brings_a_converter() {
        let info = MappingInfo {
            store_type_name: Some("int".into()),
            ..Default::default()
        };
        let mapping = mapping(ScalarType::Bool, info);
        assert_eq!(mapping.store_type, StoreType::Integer(4));
        let converter = mapping.converter.unwrap();
        assert_eq!(converter.provider_type(), ScalarType::I32);
    }

    #[test]
    fn non_scalar_types_are_not_mapped() {
        let source = DefaultTypeMappingSource::default();
        assert!(source
            .find_mapping(&TypeRef::entity("Blog"), &MappingInfo::default())
            .is_none());
    }

    #[test]
    fn reverse_lookup() {
        let source = DefaultTypeMappingSource::default();
        let mapping = source.find_mapping_for_store_type("nvarchar(50)").unwrap();
        assert_eq!(mapping.scalar, ScalarType::String);
        assert_eq!(mapping.store_type.size(), Some(50));
        assert!(source.find_mapping_for_store_type("hierarchyid").is_none());
    }
}
