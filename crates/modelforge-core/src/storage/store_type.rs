use crate::reflect::ScalarType;
use std::fmt;

/// A column type as the database declares it.
///
/// Provider-neutral: the variants cover the types common to relational
/// stores, anything else is kept verbatim as [`StoreType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreType {
    Boolean,

    /// A signed integer of `n` bytes
    Integer(u8),

    /// An unsigned integer of `n` bytes
    UnsignedInteger(u8),

    /// A floating point number of `n` bytes
    Real(u8),

    /// Decimal number with optional precision and scale
    Numeric(Option<(u32, u32)>),

    /// Unconstrained text
    Text,

    /// Text with an explicit maximum length
    VarChar(u32),

    /// Fixed-length text
    Char(u32),

    /// Unconstrained binary
    Blob,

    /// Binary with an explicit maximum length
    VarBinary(u32),

    /// Fixed-length binary
    Binary(u32),

    /// Binary value the store regenerates on every write
    RowVersion,

    Uuid,
    Timestamp,
    Date,
    Time,

    /// Unrecognized type name, kept as written
    Custom(String),
}

impl StoreType {
    /// Parses a store type name such as `varchar(200)` or `decimal(18, 2)`.
    /// Matching ignores case and surrounding whitespace. Names that are not
    /// recognized become [`StoreType::Custom`].
    pub fn parse(name: &str) -> StoreType {
        let trimmed = name.trim();
        let lower = trimmed.to_ascii_lowercase();

        let (base, args) = match lower.find('(') {
            Some(open) => {
                let args = lower[open + 1..].trim_end().trim_end_matches(')');
                let args: Vec<&str> = args.split(',').map(str::trim).collect();
                (lower[..open].trim(), args)
            }
            None => (lower.as_str(), vec![]),
        };
        let size = args.first().and_then(|arg| arg.parse::<u32>().ok());
        let scale = args.get(1).and_then(|arg| arg.parse::<u32>().ok());

        match base {
            "bool" | "boolean" | "bit" => StoreType::Boolean,
            "tinyint" => StoreType::Integer(1),
            "smallint" | "int2" => StoreType::Integer(2),
            "int" | "integer" | "int4" | "mediumint" => StoreType::Integer(4),
            "bigint" | "int8" => StoreType::Integer(8),
            "tinyint unsigned" => StoreType::UnsignedInteger(1),
            "real" | "float4" => StoreType::Real(4),
            "float" | "double" | "double precision" | "float8" => StoreType::Real(8),
            "decimal" | "numeric" | "money" => {
                StoreType::Numeric(size.map(|precision| (precision, scale.unwrap_or(0))))
            }
            "text" | "ntext" | "clob" | "longtext" => StoreType::Text,
            "varchar" | "nvarchar" | "character varying" => match size {
                Some(size) => StoreType::VarChar(size),
                None => StoreType::Text,
            },
            "char" | "nchar" | "character" => StoreType::Char(size.unwrap_or(1)),
            "blob" | "bytea" | "image" | "longblob" => StoreType::Blob,
            "varbinary" => match size {
                Some(size) => StoreType::VarBinary(size),
                None => StoreType::Blob,
            },
            "binary" => StoreType::Binary(size.unwrap_or(1)),
            "rowversion" => StoreType::RowVersion,
            "uuid" | "uniqueidentifier" => StoreType::Uuid,
            "timestamp" | "timestamptz" | "datetime" | "datetime2" | "datetimeoffset" => {
                StoreType::Timestamp
            }
            "date" => StoreType::Date,
            "time" => StoreType::Time,
            _ => StoreType::Custom(trimmed.to_string()),
        }
    }

    /// The scalar type values of this store type naturally read as. `None`
    /// for custom types.
    pub fn scalar(&self) -> Option<ScalarType> {
        Some(match self {
            StoreType::Boolean => ScalarType::Bool,
            StoreType::Integer(1) | StoreType::UnsignedInteger(_) => ScalarType::U8,
            StoreType::Integer(2) => ScalarType::I16,
            StoreType::Integer(8) => ScalarType::I64,
            StoreType::Integer(_) => ScalarType::I32,
            StoreType::Real(4) => ScalarType::F32,
            StoreType::Real(_) => ScalarType::F64,
            StoreType::Numeric(_) => ScalarType::Decimal,
            StoreType::Text | StoreType::VarChar(_) | StoreType::Char(_) => ScalarType::String,
            StoreType::Blob | StoreType::VarBinary(_) | StoreType::Binary(_) | StoreType::RowVersion => {
                ScalarType::Bytes
            }
            StoreType::Uuid => ScalarType::Uuid,
            StoreType::Timestamp => ScalarType::DateTime,
            StoreType::Date => ScalarType::Date,
            StoreType::Time => ScalarType::Time,
            StoreType::Custom(_) => return None,
        })
    }

    /// The declared maximum length, for sized text and binary types.
    pub fn size(&self) -> Option<u32> {
        match *self {
            StoreType::VarChar(size)
            | StoreType::Char(size)
            | StoreType::VarBinary(size)
            | StoreType::Binary(size) => Some(size),
            _ => None,
        }
    }

    pub fn is_fixed_length(&self) -> bool {
        matches!(self, StoreType::Char(_) | StoreType::Binary(_))
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreType::Boolean => f.write_str("boolean"),
            StoreType::Integer(1) => f.write_str("tinyint"),
            StoreType::Integer(2) => f.write_str("smallint"),
            StoreType::Integer(8) => f.write_str("bigint"),
            StoreType::Integer(_) => f.write_str("integer"),
            StoreType::UnsignedInteger(_) => f.write_str("tinyint unsigned"),
            StoreType::Real(4) => f.write_str("real"),
            StoreType::Real(_) => f.write_str("double precision"),
            StoreType::Numeric(None) => f.write_str("numeric"),
            StoreType::Numeric(Some((precision, scale))) => write!(f, "numeric({precision},{scale})"),
            StoreType::Text => f.write_str("text"),
            StoreType::VarChar(size) => write!(f, "varchar({size})"),
            StoreType::Char(size) => write!(f, "char({size})"),
            StoreType::Blob => f.write_str("blob"),
            StoreType::VarBinary(size) => write!(f, "varbinary({size})"),
            StoreType::Binary(size) => write!(f, "binary({size})"),
            StoreType::RowVersion => f.write_str("rowversion"),
            StoreType::Uuid => f.write_str("uuid"),
            StoreType::Timestamp => f.write_str("timestamp"),
            StoreType::Date => f.write_str("date"),
            StoreType::Time => f.write_str("time"),
            StoreType::Custom(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sized_and_aliased_names() {
        assert_eq!(StoreType::parse("NVARCHAR(200)"), StoreType::VarChar(200));
        assert_eq!(StoreType::parse("nvarchar(max)"), StoreType::Text);
        assert_eq!(StoreType::parse(" decimal(18, 2) "), StoreType::Numeric(Some((18, 2))));
        assert_eq!(StoreType::parse("numeric"), StoreType::Numeric(None));
        assert_eq!(StoreType::parse("character varying(40)"), StoreType::VarChar(40));
        assert_eq!(StoreType::parse("uniqueidentifier"), StoreType::Uuid);
        assert_eq!(StoreType::parse("int8"), StoreType::Integer(8));
        assert_eq!(StoreType::parse("geography"), StoreType::Custom("geography".into()));
    }

    #[test]
    fn display_is_parseable() {
        for ty in [
            StoreType::Integer(4),
            StoreType::VarChar(12),
            StoreType::Numeric(Some((10, 4))),
            StoreType::Binary(16),
            StoreType::Timestamp,
        ] {
            assert_eq!(StoreType::parse(&ty.to_string()), ty);
        }
    }

    #[test]
    fn natural_scalar_types() {
        assert_eq!(StoreType::Integer(8).scalar(), Some(ScalarType::I64));
        assert_eq!(StoreType::Char(3).scalar(), Some(ScalarType::String));
        assert_eq!(StoreType::RowVersion.scalar(), Some(ScalarType::Bytes));
        assert_eq!(StoreType::Custom("xml".into()).scalar(), None);
    }
}
