use crate::memo::Memo;
use crate::metadata::{EntityTypeId, Model, NavigationId};
use crate::reflect::TypeRef;
use crate::relational::{RelationalModel, RelationalOptions};
use crate::storage::TypeMappingSource;
use std::ops::Deref;
use std::sync::Arc;

/// A model that has passed validation. It exposes no mutators and can be
/// shared across threads.
#[derive(Debug)]
pub struct FinalizedModel {
    model: Model,

    options: RelationalOptions,

    type_mappings: Arc<dyn TypeMappingSource>,

    /// Computed on first call to `relational()`
    relational: Memo<RelationalModel>,
}

/// Reads and populates the collection behind a collection navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionAccessor {
    navigation: NavigationId,
    name: String,
    declaring_entity_type: EntityTypeId,
    element_entity_type: EntityTypeId,
    collection_type: TypeRef,
    inverse: Option<NavigationId>,
}

impl FinalizedModel {
    pub(crate) fn new(
        model: Model,
        options: RelationalOptions,
        type_mappings: Arc<dyn TypeMappingSource>,
    ) -> FinalizedModel {
        FinalizedModel {
            model,
            options,
            type_mappings,
            relational: Memo::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn options(&self) -> &RelationalOptions {
        &self.options
    }

    pub fn type_mappings(&self) -> &dyn TypeMappingSource {
        self.type_mappings.as_ref()
    }

    /// The relational projection of the model, computed on first access.
    pub fn relational(&self) -> &RelationalModel {
        self.relational.get_or_init(|| {
            RelationalModel::build(&self.model, &self.options, self.type_mappings.as_ref())
        })
    }

    /// Returns `None` if `navigation` is not a collection navigation.
    pub fn collection_accessor(&self, navigation: NavigationId) -> Option<&CollectionAccessor> {
        let model = &self.model;
        let slot = model.get_navigation(navigation)?;
        if !slot.is_collection(model) {
            return None;
        }
        Some(slot.accessor.get_or_init(|| CollectionAccessor::new(model, navigation)))
    }
}

impl Deref for FinalizedModel {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

impl CollectionAccessor {
    fn new(model: &Model, id: NavigationId) -> CollectionAccessor {
        let navigation = model.navigation(id);
        let declaring_entity_type = navigation.declaring_entity_type(model);
        let element_entity_type = navigation.target_entity_type(model);

        let collection_type = match navigation.member() {
            Some(member) => model.member_type(declaring_entity_type, member),
            None => TypeRef::collection(TypeRef::entity(
                model.entity_type(element_entity_type).name(),
            )),
        };

        CollectionAccessor {
            navigation: id,
            name: navigation.name().to_string(),
            declaring_entity_type,
            element_entity_type,
            collection_type,
            inverse: navigation.inverse(model),
        }
    }

    pub fn navigation(&self) -> NavigationId {
        self.navigation
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_entity_type(&self) -> EntityTypeId {
        self.declaring_entity_type
    }

    pub fn element_entity_type(&self) -> EntityTypeId {
        self.element_entity_type
    }

    /// The type of the collection member, or a sequence of the element type
    /// for navigations without one.
    pub fn collection_type(&self) -> &TypeRef {
        &self.collection_type
    }

    pub fn inverse(&self) -> Option<NavigationId> {
        self.inverse
    }
}
