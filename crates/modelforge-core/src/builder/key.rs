use crate::convention::{Event, Outcome, Undo};
use crate::metadata::{EntityTypeId, Index, IndexId, Key, KeyId, PropertyId};
use crate::{AnnotationTarget, ConfigurationSource, ModelBuilder, Value};

pub struct KeyBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: KeyId,
}

impl<'a> KeyBuilder<'a> {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn metadata(&self) -> &Key {
        self.mb.model.key(self.id)
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::Key(self.id), name, value.into(), source)?;
        self.mb.model.keys.contains(self.id.0).then_some(self)
    }
}

pub struct IndexBuilder<'a> {
    pub(crate) mb: &'a mut ModelBuilder,
    pub(crate) id: IndexId,
}

impl<'a> IndexBuilder<'a> {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn metadata(&self) -> &Index {
        self.mb.model.index(self.id)
    }

    pub fn is_unique(&mut self, unique: bool, source: ConfigurationSource) -> Option<&mut Self> {
        let index = self.mb.model.indexes.get_mut(self.id.0)?;
        index.unique.set(Some(unique), source).is_applied().then_some(self)
    }

    /// Sets the database name of the index.
    pub fn has_name(&mut self, name: impl Into<String>, source: ConfigurationSource) -> Option<&mut Self> {
        let index = self.mb.model.indexes.get_mut(self.id.0)?;
        index.name.set(Some(name.into()), source).is_applied().then_some(self)
    }

    pub fn set_annotation(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        source: ConfigurationSource,
    ) -> Option<&mut Self> {
        self.mb
            .set_annotation_on(AnnotationTarget::Index(self.id), name, value.into(), source)?;
        self.mb.model.indexes.contains(self.id.0).then_some(self)
    }
}

impl ModelBuilder {
    /// Adds a key over `properties`, which become required.
    pub(crate) fn add_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        source: ConfigurationSource,
    ) -> Option<KeyId> {
        for property in &properties {
            if self.model.get_property(*property)?.is_nullable() {
                // A higher-sourced nullable configuration wins here and is
                // reported by model validation.
                self.set_nullable(*property, Some(false), source);
            }
        }

        let id = KeyId(self.model.keys.next_index());
        self.model.keys.push(Key {
            id,
            entity_type,
            properties,
            source,
            annotations: Default::default(),
        });
        self.model.entity_types.get_mut(entity_type.0)?.keys.push(id);

        match self.dispatch(Event::KeyAdded(id), Undo::Key(id)) {
            Outcome::Reverted => None,
            _ => self.model.keys.contains(id.0).then_some(id),
        }
    }
}
