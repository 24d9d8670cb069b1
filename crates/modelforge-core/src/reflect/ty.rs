use std::fmt;

/// Primitive member types a property can have.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    I16,
    I32,
    I64,
    U8,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    Uuid,
    DateTime,
    Date,
    Time,
}

/// The static type of a member or property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarType),

    /// An optional value type.
    Nullable(Box<TypeRef>),

    /// A reference to another type in the registry.
    Entity(String),

    /// A sequence of elements.
    Collection(Box<TypeRef>),

    /// The `n`th generic argument of the declaring type.
    GenericParameter(usize),
}

impl ScalarType {
    /// Reference types are nullable unless annotated otherwise.
    pub fn is_reference(self) -> bool {
        matches!(self, ScalarType::String | ScalarType::Bytes)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarType::I16 | ScalarType::I32 | ScalarType::I64 | ScalarType::U8
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, ScalarType::F32 | ScalarType::F64 | ScalarType::Decimal)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarType::Bool => "bool",
            ScalarType::I16 => "i16",
            ScalarType::I32 => "i32",
            ScalarType::I64 => "i64",
            ScalarType::U8 => "u8",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Decimal => "Decimal",
            ScalarType::String => "String",
            ScalarType::Bytes => "Vec<u8>",
            ScalarType::Uuid => "Uuid",
            ScalarType::DateTime => "DateTime",
            ScalarType::Date => "Date",
            ScalarType::Time => "Time",
        })
    }
}

impl TypeRef {
    pub fn entity(name: impl Into<String>) -> TypeRef {
        TypeRef::Entity(name.into())
    }

    pub fn collection(element: impl Into<TypeRef>) -> TypeRef {
        TypeRef::Collection(Box::new(element.into()))
    }

    /// Wraps a value type in `Nullable`. Types that already admit null are
    /// returned unchanged.
    pub fn nullable(self) -> TypeRef {
        if self.is_nullable_by_default() {
            self
        } else {
            TypeRef::Nullable(Box::new(self))
        }
    }

    /// Whether a property of this type is nullable before any configuration.
    pub fn is_nullable_by_default(&self) -> bool {
        match self {
            TypeRef::Scalar(scalar) => scalar.is_reference(),
            TypeRef::Nullable(_) => true,
            TypeRef::Entity(_) | TypeRef::Collection(_) | TypeRef::GenericParameter(_) => true,
        }
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self, TypeRef::Scalar(scalar) if !scalar.is_reference())
    }

    /// Strips `Nullable` wrappers.
    pub fn non_nullable(&self) -> &TypeRef {
        match self {
            TypeRef::Nullable(inner) => inner.non_nullable(),
            ty => ty,
        }
    }

    /// The scalar type, looking through `Nullable`.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self.non_nullable() {
            TypeRef::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    pub fn entity_name(&self) -> Option<&str> {
        match self.non_nullable() {
            TypeRef::Entity(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.non_nullable(), TypeRef::Collection(_))
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match self.non_nullable() {
            TypeRef::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// Two property types are interchangeable as key/foreign key columns when
    /// their scalar types agree, ignoring nullability.
    pub fn is_key_compatible(&self, other: &TypeRef) -> bool {
        match (self.scalar(), other.scalar()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl From<ScalarType> for TypeRef {
    fn from(value: ScalarType) -> Self {
        TypeRef::Scalar(value)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Scalar(scalar) => fmt::Display::fmt(scalar, f),
            TypeRef::Nullable(inner) => write!(f, "Option<{inner}>"),
            TypeRef::Entity(name) => f.write_str(name),
            TypeRef::Collection(element) => write!(f, "Vec<{element}>"),
            TypeRef::GenericParameter(index) => write!(f, "T{index}"),
        }
    }
}
