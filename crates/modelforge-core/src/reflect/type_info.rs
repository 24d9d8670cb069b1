use super::{MemberInfo, Nullability, TypeRef};

/// A concrete argument bound to one of a generic type's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericArgument {
    pub ty: TypeRef,
    pub nullability: Nullability,
}

/// The backing type of an entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: String,
    pub base_type: Option<String>,
    pub members: Vec<MemberInfo>,
    pub is_abstract: bool,
    pub generic_arguments: Vec<GenericArgument>,

    /// Dictionary-like types whose properties are reached through an indexer
    /// rather than declared members.
    pub is_property_bag: bool,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> TypeInfo {
        TypeInfo {
            name: name.into(),
            base_type: None,
            members: vec![],
            is_abstract: false,
            generic_arguments: vec![],
            is_property_bag: false,
        }
    }

    pub fn extends(mut self, base: impl Into<String>) -> TypeInfo {
        self.base_type = Some(base.into());
        self
    }

    pub fn member(mut self, mut member: MemberInfo) -> TypeInfo {
        member.declaring_type = self.name.clone();
        self.members.push(member);
        self
    }

    pub fn abstract_type(mut self) -> TypeInfo {
        self.is_abstract = true;
        self
    }

    pub fn generic_argument(mut self, ty: impl Into<TypeRef>, nullability: Nullability) -> TypeInfo {
        self.generic_arguments.push(GenericArgument {
            ty: ty.into(),
            nullability,
        });
        self
    }

    pub fn property_bag(mut self) -> TypeInfo {
        self.is_property_bag = true;
        self
    }

    pub fn declared_member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Resolves a generic parameter against this type's arguments.
    pub fn resolve(&self, ty: &TypeRef) -> Option<&GenericArgument> {
        match ty {
            TypeRef::GenericParameter(index) => self.generic_arguments.get(*index),
            _ => None,
        }
    }
}
