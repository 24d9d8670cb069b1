use super::{Convention, Hook};
use crate::conventions::*;
use indexmap::IndexMap;
use std::sync::Arc;

/// Conventions registered per hook, in invocation order.
#[derive(Clone, Default)]
pub struct ConventionSet {
    hooks: IndexMap<Hook, Vec<Arc<dyn Convention>>>,
}

impl ConventionSet {
    /// A set with no conventions. Every piece of configuration must be
    /// supplied explicitly.
    pub fn empty() -> ConventionSet {
        ConventionSet::default()
    }

    /// The built-in conventions in their standard order.
    pub fn default_set() -> ConventionSet {
        let mut set = ConventionSet::empty();
        set.add(BaseTypeDiscoveryConvention);
        set.add(NotMappedMemberAttributeConvention);
        set.add(PropertyDiscoveryConvention);
        set.add(KeyDiscoveryConvention);
        set.add(NullabilityConvention);
        set.add(RequiredAttributeConvention);
        set.add(MaxLengthAttributeConvention);
        set.add(KeyAttributeConvention);
        set.add(ConcurrencyCheckAttributeConvention);
        set.add(TimestampAttributeConvention);
        set.add(ColumnAttributeConvention);
        set.add(RelationshipDiscoveryConvention);
        set.add(ForeignKeyPropertyDiscoveryConvention);
        set.add(DiscriminatorConvention);
        set.add(ValueGenerationConvention);
        set.add(ForeignKeyIndexConvention);
        set
    }

    /// Appends `convention` to every hook it declares.
    pub fn add(&mut self, convention: impl Convention + 'static) -> &mut Self {
        self.add_shared(Arc::new(convention))
    }

    pub fn add_shared(&mut self, convention: Arc<dyn Convention>) -> &mut Self {
        for hook in convention.hooks() {
            self.hooks
                .entry(*hook)
                .or_default()
                .push(Arc::clone(&convention));
        }
        self
    }

    /// Swaps the convention named `name` for `convention`, keeping its
    /// position on each hook. Hooks the replacement does not declare drop
    /// the old convention. Returns `false` if no convention had that name.
    pub fn replace(&mut self, name: &str, convention: impl Convention + 'static) -> bool {
        let convention: Arc<dyn Convention> = Arc::new(convention);
        let mut found = false;

        for (hook, conventions) in self.hooks.iter_mut() {
            let Some(position) = conventions.iter().position(|c| c.name() == name) else {
                continue;
            };
            found = true;
            if convention.hooks().contains(hook) {
                conventions[position] = Arc::clone(&convention);
            } else {
                conventions.remove(position);
            }
        }

        found
    }

    /// Removes the convention named `name` from every hook.
    pub fn remove(&mut self, name: &str) -> bool {
        let mut found = false;
        for conventions in self.hooks.values_mut() {
            let before = conventions.len();
            conventions.retain(|c| c.name() != name);
            found |= conventions.len() != before;
        }
        found
    }

    pub fn for_hook(&self, hook: Hook) -> &[Arc<dyn Convention>] {
        self.hooks.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self, hook: Hook) -> Vec<&'static str> {
        self.for_hook(hook).iter().map(|c| c.name()).collect()
    }
}

impl std::fmt::Debug for ConventionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (hook, conventions) in &self.hooks {
            let names: Vec<_> = conventions.iter().map(|c| c.name()).collect();
            map.entry(hook, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(&'static str, &'static [Hook]);

    impl Convention for Probe {
        fn name(&self) -> &'static str {
            self.0
        }

        fn hooks(&self) -> &'static [Hook] {
            self.1
        }
    }

    #[test]
    fn add_registers_on_declared_hooks() {
        let mut set = ConventionSet::empty();
        set.add(Probe("a", &[Hook::PropertyAdded, Hook::KeyAdded]));
        set.add(Probe("b", &[Hook::PropertyAdded]));

        assert_eq!(set.names(Hook::PropertyAdded), ["a", "b"]);
        assert_eq!(set.names(Hook::KeyAdded), ["a"]);
        assert!(set.for_hook(Hook::IndexAdded).is_empty());
    }

    #[test]
    fn replace_keeps_position() {
        let mut set = ConventionSet::empty();
        set.add(Probe("a", &[Hook::PropertyAdded]));
        set.add(Probe("b", &[Hook::PropertyAdded]));
        set.add(Probe("c", &[Hook::PropertyAdded]));

        assert!(set.replace("b", Probe("b2", &[Hook::PropertyAdded])));
        assert_eq!(set.names(Hook::PropertyAdded), ["a", "b2", "c"]);
        assert!(!set.replace("missing", Probe("x", &[Hook::PropertyAdded])));
    }

    #[test]
    fn remove_drops_from_every_hook() {
        let mut set = ConventionSet::empty();
        set.add(Probe("a", &[Hook::PropertyAdded, Hook::KeyAdded]));
        assert!(set.remove("a"));
        assert!(set.names(Hook::PropertyAdded).is_empty());
        assert!(set.names(Hook::KeyAdded).is_empty());
    }

    #[test]
    fn default_set_order() {
        let set = ConventionSet::default_set();
        assert_eq!(
            set.names(Hook::PropertyAdded),
            [
                "KeyDiscovery",
                "Nullability",
                "RequiredAttribute",
                "MaxLengthAttribute",
                "KeyAttribute",
                "ConcurrencyCheckAttribute",
                "TimestampAttribute",
                "ColumnAttribute",
                "ForeignKeyPropertyDiscovery",
            ]
        );
        assert_eq!(set.names(Hook::ModelFinalizing), ["ForeignKeyIndex"]);
    }
}
