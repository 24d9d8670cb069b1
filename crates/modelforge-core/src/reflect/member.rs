use super::TypeRef;

/// Declared nullability of a reference-typed member.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Nullability {
    /// Declared outside a nullable-aware context; no signal either way.
    #[default]
    Oblivious,

    /// Declared non-nullable.
    NotAnnotated,

    /// Declared nullable.
    Annotated,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Field,
}

/// Attributes that data-annotation conventions understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAttribute {
    Required,
    MaybeNull,
    AllowNull,
    NotNull,
    DisallowNull,
    Key,
    MaxLength(u32),
    ConcurrencyCheck,
    Timestamp,
    Column {
        name: Option<String>,
        type_name: Option<String>,
    },
    NotMapped,
}

/// A property or field declared on a [`TypeInfo`](super::TypeInfo).
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub name: String,

    /// Name of the type that declares the member. Filled in when the member
    /// is added to a `TypeInfo`.
    pub declaring_type: String,

    pub ty: TypeRef,
    pub kind: MemberKind,
    pub nullability: Nullability,
    pub attributes: Vec<MemberAttribute>,
}

impl MemberInfo {
    pub fn property(name: impl Into<String>, ty: impl Into<TypeRef>) -> MemberInfo {
        MemberInfo {
            name: name.into(),
            declaring_type: String::new(),
            ty: ty.into(),
            kind: MemberKind::Property,
            nullability: Nullability::Oblivious,
            attributes: vec![],
        }
    }

    pub fn field(name: impl Into<String>, ty: impl Into<TypeRef>) -> MemberInfo {
        MemberInfo {
            kind: MemberKind::Field,
            ..MemberInfo::property(name, ty)
        }
    }

    pub fn nullability(mut self, nullability: Nullability) -> MemberInfo {
        self.nullability = nullability;
        self
    }

    pub fn attribute(mut self, attribute: MemberAttribute) -> MemberInfo {
        self.attributes.push(attribute);
        self
    }

    pub fn has_attribute(&self, f: impl Fn(&MemberAttribute) -> bool) -> bool {
        self.attributes.iter().any(f)
    }

    pub fn find_attribute<T>(&self, f: impl Fn(&MemberAttribute) -> Option<T>) -> Option<T> {
        self.attributes.iter().find_map(f)
    }

    pub fn is_not_mapped(&self) -> bool {
        self.has_attribute(|attr| matches!(attr, MemberAttribute::NotMapped))
    }
}
