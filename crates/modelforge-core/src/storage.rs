//! Store types and the mapping from model types onto them.

mod converter;
pub use converter::{BoolToZeroOne, ConverterRef, NumberToString, ValueConverter};

mod mapping;
pub use mapping::{DefaultTypeMappingSource, MappingInfo, TypeMapping, TypeMappingSource};

mod store_type;
pub use store_type::StoreType;
