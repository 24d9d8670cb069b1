use super::EntityTypeId;
use crate::reflect::{MemberInfo, TypeRef};
use crate::storage::ConverterRef;
use crate::{Annotations, ConfigurationSource, Facet, Value};
use std::fmt;

#[derive(Debug)]
pub struct Property {
    pub(crate) id: PropertyId,

    /// The entity type declaring the property
    pub(crate) entity_type: EntityTypeId,

    pub(crate) name: String,
    pub(crate) ty: TypeRef,

    /// Backing member, `None` for shadow properties
    pub(crate) member: Option<MemberInfo>,

    /// Reached through the entity's indexer rather than a member
    pub(crate) is_indexer: bool,

    pub(crate) source: ConfigurationSource,

    pub(crate) nullable: Facet<bool>,
    pub(crate) max_length: Facet<u32>,
    pub(crate) precision: Facet<u32>,
    pub(crate) scale: Facet<u32>,
    pub(crate) unicode: Facet<bool>,
    pub(crate) fixed_length: Facet<bool>,
    pub(crate) concurrency_token: Facet<bool>,
    pub(crate) value_generated: Facet<ValueGenerated>,
    pub(crate) default_value: Facet<Value>,
    pub(crate) default_value_sql: Facet<String>,
    pub(crate) computed_column_sql: Facet<String>,
    pub(crate) stored: Facet<bool>,
    pub(crate) comment: Facet<String>,
    pub(crate) collation: Facet<String>,
    pub(crate) column_name: Facet<String>,
    pub(crate) column_type: Facet<String>,
    pub(crate) value_converter: Facet<ConverterRef>,
    pub(crate) field: Facet<String>,
    pub(crate) access_mode: Facet<PropertyAccessMode>,

    pub(crate) annotations: Annotations,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub usize);

/// When the store generates a value for the property.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueGenerated {
    Never,
    OnAdd,
    OnAddOrUpdate,
}

/// How the property's value is read and written on instances.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PropertyAccessMode {
    Field,
    FieldDuringConstruction,
    Property,
    PreferField,
    PreferFieldDuringConstruction,
    PreferProperty,
}

macro_rules! facet_getters {
    (
        copy { $( $cname:ident, $csource:ident: $cty:ty; )* }
        borrow { $( $bname:ident, $bsource:ident: $bty:ty; )* }
    ) => {
        $(
            pub fn $cname(&self) -> Option<$cty> {
                self.$cname.value()
            }

            pub fn $csource(&self) -> Option<ConfigurationSource> {
                self.$cname.source()
            }
        )*

        $(
            pub fn $bname(&self) -> Option<&$bty> {
                self.$bname.get()
            }

            pub fn $bsource(&self) -> Option<ConfigurationSource> {
                self.$bname.source()
            }
        )*
    };
}

impl Property {
    pub(crate) fn new(
        id: PropertyId,
        entity_type: EntityTypeId,
        name: String,
        ty: TypeRef,
        member: Option<MemberInfo>,
        is_indexer: bool,
        source: ConfigurationSource,
    ) -> Property {
        Property {
            id,
            entity_type,
            name,
            ty,
            member,
            is_indexer,
            source,
            nullable: Facet::default(),
            max_length: Facet::default(),
            precision: Facet::default(),
            scale: Facet::default(),
            unicode: Facet::default(),
            fixed_length: Facet::default(),
            concurrency_token: Facet::default(),
            value_generated: Facet::default(),
            default_value: Facet::default(),
            default_value_sql: Facet::default(),
            computed_column_sql: Facet::default(),
            stored: Facet::default(),
            comment: Facet::default(),
            collation: Facet::default(),
            column_name: Facet::default(),
            column_type: Facet::default(),
            value_converter: Facet::default(),
            field: Facet::default(),
            access_mode: Facet::default(),
            annotations: Annotations::default(),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity type declaring this property.
    pub fn entity_type(&self) -> EntityTypeId {
        self.entity_type
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn member(&self) -> Option<&MemberInfo> {
        self.member.as_ref()
    }

    pub fn is_shadow(&self) -> bool {
        self.member.is_none()
    }

    pub fn is_indexer(&self) -> bool {
        self.is_indexer
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    /// Configured nullability, falling back to the type's own nullability.
    pub fn is_nullable(&self) -> bool {
        self.nullable
            .value()
            .unwrap_or_else(|| self.ty.is_nullable_by_default())
    }

    pub fn is_nullable_source(&self) -> Option<ConfigurationSource> {
        self.nullable.source()
    }

    pub fn is_concurrency_token(&self) -> bool {
        self.concurrency_token.value().unwrap_or(false)
    }

    facet_getters! {
        copy {
            max_length, max_length_source: u32;
            precision, precision_source: u32;
            scale, scale_source: u32;
            unicode, unicode_source: bool;
            fixed_length, fixed_length_source: bool;
            concurrency_token, concurrency_token_source: bool;
            value_generated, value_generated_source: ValueGenerated;
            stored, stored_source: bool;
            access_mode, access_mode_source: PropertyAccessMode;
        }
        borrow {
            default_value, default_value_source: Value;
            default_value_sql, default_value_sql_source: String;
            computed_column_sql, computed_column_sql_source: String;
            comment, comment_source: String;
            collation, collation_source: String;
            column_name, column_name_source: String;
            column_type, column_type_source: String;
            value_converter, value_converter_source: ConverterRef;
            field, field_source: String;
        }
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Shadow properties created by conventions to hold foreign key values.
    pub(crate) fn is_convention_shadow(&self) -> bool {
        self.member.is_none() && !self.is_indexer && self.source == ConfigurationSource::Convention
    }
}

impl fmt::Debug for PropertyId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "PropertyId({})", self.0)
    }
}
