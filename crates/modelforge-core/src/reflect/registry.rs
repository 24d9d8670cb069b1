use super::{MemberInfo, TypeInfo};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// The set of backing types known to a model build.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Arc<TypeInfo>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn with(mut self, ty: TypeInfo) -> TypeRegistry {
        self.register(ty);
        self
    }

    pub fn register(&mut self, ty: TypeInfo) {
        self.types.insert(ty.name.clone(), Arc::new(ty));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TypeInfo>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeInfo>> + '_ {
        self.types.values()
    }

    /// Registered ancestors of `name`, nearest first. A malformed base chain
    /// that loops back on itself is cut at the first repeat.
    pub fn ancestors(&self, name: &str) -> Vec<&Arc<TypeInfo>> {
        let mut visited = HashSet::new();
        visited.insert(name);

        let mut ancestors = vec![];
        let mut current = self.get(name).and_then(|ty| ty.base_type.as_deref());

        while let Some(base_name) = current {
            if !visited.insert(base_name) {
                break;
            }
            let Some(base) = self.get(base_name) else {
                break;
            };
            ancestors.push(base);
            current = base.base_type.as_deref();
        }

        ancestors
    }

    /// Returns `true` if a value of type `source` can be stored in a member
    /// of type `target`.
    pub fn is_assignable_from(&self, target: &str, source: &str) -> bool {
        target == source
            || self
                .ancestors(source)
                .iter()
                .any(|ancestor| ancestor.name == target)
    }

    /// Finds a member by name on `type_name` or any of its ancestors.
    pub fn find_member(&self, type_name: &str, member: &str) -> Option<&MemberInfo> {
        let ty = self.get(type_name)?;
        ty.declared_member(member).or_else(|| {
            self.ancestors(type_name)
                .into_iter()
                .find_map(|ancestor| ancestor.declared_member(member))
        })
    }
}
