//! The conceptual model graph.
//!
//! Every node lives in an arena owned by [`Model`] and refers to other nodes
//! by id. Fields are crate-private; mutation goes through
//! [`ModelBuilder`](crate::ModelBuilder) and its node handles.

mod entity_type;
pub use entity_type::{EntityType, EntityTypeId};

mod foreign_key;
pub use foreign_key::{DeleteBehavior, ForeignKey, ForeignKeyId};

mod index;
pub use index::{Index, IndexId};

mod key;
pub use key::{Key, KeyId};

mod navigation;
pub use navigation::{Navigation, NavigationId};

mod property;
pub use property::{Property, PropertyAccessMode, PropertyId, ValueGenerated};

mod slots;
pub(crate) use slots::Slots;

use crate::reflect::{GenericArgument, MemberInfo, TypeRef, TypeRegistry};
use crate::{AnnotationTarget, Annotations, ConfigurationSource};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct Model {
    pub(crate) types: Arc<TypeRegistry>,

    pub(crate) entity_types: Slots<EntityType>,
    pub(crate) properties: Slots<Property>,
    pub(crate) navigations: Slots<Navigation>,
    pub(crate) foreign_keys: Slots<ForeignKey>,
    pub(crate) keys: Slots<Key>,
    pub(crate) indexes: Slots<Index>,

    /// Entity types by name, in the order they were added
    pub(crate) entity_type_names: IndexMap<String, EntityTypeId>,

    /// Type names excluded from the model
    pub(crate) ignored: IndexMap<String, ConfigurationSource>,

    pub(crate) annotations: Annotations,
}

impl Model {
    pub(crate) fn new(types: Arc<TypeRegistry>) -> Model {
        Model {
            types,
            entity_types: Slots::default(),
            properties: Slots::default(),
            navigations: Slots::default(),
            foreign_keys: Slots::default(),
            keys: Slots::default(),
            indexes: Slots::default(),
            entity_type_names: IndexMap::new(),
            ignored: IndexMap::new(),
            annotations: Annotations::default(),
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Entity types in the order they were added.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> + '_ {
        self.entity_type_names
            .values()
            .filter_map(|id| self.entity_types.get(id.0))
    }

    pub fn entity_type(&self, id: EntityTypeId) -> &EntityType {
        self.entity_types
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(id.0)
    }

    pub fn find_entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_type_names
            .get(name)
            .and_then(|id| self.entity_types.get(id.0))
    }

    pub fn property(&self, id: PropertyId) -> &Property {
        self.properties
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id.0)
    }

    pub fn navigation(&self, id: NavigationId) -> &Navigation {
        self.navigations
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_navigation(&self, id: NavigationId) -> Option<&Navigation> {
        self.navigations.get(id.0)
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        self.foreign_keys
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(id.0)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> + '_ {
        self.foreign_keys.iter()
    }

    pub fn key(&self, id: KeyId) -> &Key {
        self.keys
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(id.0)
    }

    pub fn index(&self, id: IndexId) -> &Index {
        self.indexes
            .get(id.0)
            .unwrap_or_else(|| panic!("{id:?} is not part of the model"))
    }

    pub fn get_index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(id.0)
    }

    /// Returns the source a type name was ignored at, if it was.
    pub fn is_ignored(&self, name: &str) -> Option<ConfigurationSource> {
        self.ignored.get(name).copied()
    }

    pub fn contains(&self, target: AnnotationTarget) -> bool {
        match target {
            AnnotationTarget::Model => true,
            AnnotationTarget::EntityType(id) => self.is_live_entity_type(id),
            AnnotationTarget::Property(id) => self.properties.contains(id.0),
            AnnotationTarget::Key(id) => self.keys.contains(id.0),
            AnnotationTarget::ForeignKey(id) => self.foreign_keys.contains(id.0),
            AnnotationTarget::Navigation(id) => self.navigations.contains(id.0),
            AnnotationTarget::Index(id) => self.indexes.contains(id.0),
        }
    }

    /// An entity type is live while it is registered under its name. During
    /// removal the node is unregistered before its members are torn down.
    pub(crate) fn is_live_entity_type(&self, id: EntityTypeId) -> bool {
        self.entity_types
            .get(id.0)
            .map_or(false, |et| self.entity_type_names.get(&et.name) == Some(&id))
    }

    pub fn annotations_of(&self, target: AnnotationTarget) -> Option<&Annotations> {
        Some(match target {
            AnnotationTarget::Model => &self.annotations,
            AnnotationTarget::EntityType(id) => &self.entity_types.get(id.0)?.annotations,
            AnnotationTarget::Property(id) => &self.properties.get(id.0)?.annotations,
            AnnotationTarget::Key(id) => &self.keys.get(id.0)?.annotations,
            AnnotationTarget::ForeignKey(id) => &self.foreign_keys.get(id.0)?.annotations,
            AnnotationTarget::Navigation(id) => &self.navigations.get(id.0)?.annotations,
            AnnotationTarget::Index(id) => &self.indexes.get(id.0)?.annotations,
        })
    }

    pub(crate) fn annotations_of_mut(&mut self, target: AnnotationTarget) -> Option<&mut Annotations> {
        Some(match target {
            AnnotationTarget::Model => &mut self.annotations,
            AnnotationTarget::EntityType(id) => &mut self.entity_types.get_mut(id.0)?.annotations,
            AnnotationTarget::Property(id) => &mut self.properties.get_mut(id.0)?.annotations,
            AnnotationTarget::Key(id) => &mut self.keys.get_mut(id.0)?.annotations,
            AnnotationTarget::ForeignKey(id) => &mut self.foreign_keys.get_mut(id.0)?.annotations,
            AnnotationTarget::Navigation(id) => &mut self.navigations.get_mut(id.0)?.annotations,
            AnnotationTarget::Index(id) => &mut self.indexes.get_mut(id.0)?.annotations,
        })
    }

    // ===== Hierarchy =====

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut visited = HashSet::from([id]);
        let mut ancestors = vec![];
        let mut current = self.get_entity_type(id).and_then(|et| et.base_type);

        while let Some(base) = current {
            if !visited.insert(base) {
                break;
            }
            ancestors.push(base);
            current = self.get_entity_type(base).and_then(|et| et.base_type);
        }

        ancestors
    }

    /// `id` followed by its ancestors.
    pub fn self_and_ancestors(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut chain = vec![id];
        chain.extend(self.ancestors(id));
        chain
    }

    pub fn root_of(&self, id: EntityTypeId) -> EntityTypeId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    /// Entity types whose base type is `id`, in model order.
    pub fn direct_derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        self.entity_types()
            .filter(|et| et.base_type == Some(id))
            .map(|et| et.id)
            .collect()
    }

    /// All descendants of `id`, depth first, in model order within a level.
    pub fn derived_types(&self, id: EntityTypeId) -> Vec<EntityTypeId> {
        let mut visited = HashSet::from([id]);
        let mut out = vec![];
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let children = self.direct_derived_types(current);
            for child in children.into_iter().rev() {
                if visited.insert(child) {
                    stack.push(child);
                }
            }
            if current != id {
                out.push(current);
            }
        }

        out
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    pub fn is_same_or_ancestor(&self, ancestor: EntityTypeId, id: EntityTypeId) -> bool {
        ancestor == id || self.ancestors(id).contains(&ancestor)
    }

    // ===== Members =====

    /// Every property of `id`, inherited ones first, each in declaration
    /// order.
    pub fn properties_of(&self, id: EntityTypeId) -> Vec<PropertyId> {
        let mut chain = self.self_and_ancestors(id);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|et| self.entity_type(et).properties.iter().copied())
            .collect()
    }

    /// Finds a property declared on `id` or inherited from an ancestor.
    pub fn find_property(&self, id: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.self_and_ancestors(id).into_iter().find_map(|et| {
            self.entity_type(et)
                .properties
                .iter()
                .copied()
                .find(|p| self.property(*p).name == name)
        })
    }

    pub fn find_declared_property(&self, id: EntityTypeId, name: &str) -> Option<PropertyId> {
        self.entity_type(id)
            .properties
            .iter()
            .copied()
            .find(|p| self.property(*p).name == name)
    }

    pub fn navigations_of(&self, id: EntityTypeId) -> Vec<NavigationId> {
        let mut chain = self.self_and_ancestors(id);
        chain.reverse();
        chain
            .into_iter()
            .flat_map(|et| self.entity_type(et).navigations.iter().copied())
            .collect()
    }

    pub fn find_navigation(&self, id: EntityTypeId, name: &str) -> Option<NavigationId> {
        self.self_and_ancestors(id).into_iter().find_map(|et| {
            self.entity_type(et)
                .navigations
                .iter()
                .copied()
                .find(|n| self.navigation(*n).name == name)
        })
    }

    /// The primary key in effect for `id`, declared on the hierarchy root.
    pub fn primary_key(&self, id: EntityTypeId) -> Option<KeyId> {
        self.entity_type(self.root_of(id)).primary_key
    }

    pub fn keys_of(&self, id: EntityTypeId) -> Vec<KeyId> {
        self.self_and_ancestors(id)
            .into_iter()
            .flat_map(|et| self.entity_type(et).keys.iter().copied())
            .collect()
    }

    pub fn find_key(&self, id: EntityTypeId, properties: &[PropertyId]) -> Option<KeyId> {
        self.keys_of(id)
            .into_iter()
            .find(|key| self.key(*key).properties == properties)
    }

    pub fn foreign_keys_of(&self, id: EntityTypeId) -> Vec<ForeignKeyId> {
        self.self_and_ancestors(id)
            .into_iter()
            .flat_map(|et| self.entity_type(et).foreign_keys.iter().copied())
            .collect()
    }

    pub fn indexes_of(&self, id: EntityTypeId) -> Vec<IndexId> {
        self.self_and_ancestors(id)
            .into_iter()
            .flat_map(|et| self.entity_type(et).indexes.iter().copied())
            .collect()
    }

    /// Foreign keys whose principal is `id`.
    pub fn referencing_foreign_keys(&self, id: EntityTypeId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.principal_entity_type == id)
            .map(|fk| fk.id)
            .collect()
    }

    pub fn keys_containing(&self, property: PropertyId) -> Vec<KeyId> {
        self.keys
            .iter()
            .filter(|key| key.properties.contains(&property))
            .map(|key| key.id)
            .collect()
    }

    pub fn foreign_keys_containing(&self, property: PropertyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.properties.contains(&property))
            .map(|fk| fk.id)
            .collect()
    }

    pub fn indexes_containing(&self, property: PropertyId) -> Vec<IndexId> {
        self.indexes
            .iter()
            .filter(|index| index.properties.contains(&property))
            .map(|index| index.id)
            .collect()
    }

    /// Foreign keys that use `key` as their principal key.
    pub fn foreign_keys_referencing_key(&self, key: KeyId) -> Vec<ForeignKeyId> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.principal_key == key)
            .map(|fk| fk.id)
            .collect()
    }

    pub fn is_primary_key_property(&self, property: PropertyId) -> bool {
        let entity = self.property(property).entity_type;
        self.primary_key(entity)
            .map_or(false, |key| self.key(key).properties.contains(&property))
    }

    /// Resolves a member declared with a generic parameter type against the
    /// generic arguments of `id`'s backing type, falling back to the
    /// declaring type's own arguments.
    pub fn resolve_generic_argument(
        &self,
        id: EntityTypeId,
        member: &MemberInfo,
    ) -> Option<&GenericArgument> {
        let TypeRef::GenericParameter(_) = member.ty.non_nullable() else {
            return None;
        };
        let ty = member.ty.non_nullable();

        self.entity_type(id)
            .type_info()
            .and_then(|type_info| type_info.resolve(ty))
            .or_else(|| {
                self.types
                    .get(&member.declaring_type)
                    .and_then(|declaring| declaring.resolve(ty))
            })
    }

    /// The property type a member maps to, with generic parameters bound.
    pub fn member_type(&self, id: EntityTypeId, member: &MemberInfo) -> TypeRef {
        match self.resolve_generic_argument(id, member) {
            Some(argument) => argument.ty.clone(),
            None => member.ty.clone(),
        }
    }

    /// Property names, for messages.
    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<&str> {
        properties
            .iter()
            .map(|id| self.property(*id).name.as_str())
            .collect()
    }
}
