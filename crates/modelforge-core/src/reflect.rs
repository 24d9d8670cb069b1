//! Static descriptions of the user's object model.
//!
//! Entity types may be backed by a [`TypeInfo`] whose [`MemberInfo`]s carry
//! the signals conventions read: member types, declared nullability and
//! attributes.

mod member;
pub use member::{MemberAttribute, MemberInfo, MemberKind, Nullability};

mod registry;
pub use registry::TypeRegistry;

mod ty;
pub use ty::{ScalarType, TypeRef};

mod type_info;
pub use type_info::{GenericArgument, TypeInfo};
