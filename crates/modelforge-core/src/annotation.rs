use crate::metadata::{EntityTypeId, ForeignKeyId, IndexId, KeyId, NavigationId, PropertyId};
use crate::{ConfigurationSource, FacetChange, Value};
use indexmap::IndexMap;

/// Annotation names the crate itself reads.
pub mod names {
    pub const TABLE_NAME: &str = "Relational:TableName";
    pub const VIEW_NAME: &str = "Relational:ViewName";
    pub const SCHEMA: &str = "Relational:Schema";
    pub const COMMENT: &str = "Relational:Comment";
    pub const DISCRIMINATOR_PROPERTY: &str = "DiscriminatorProperty";
    pub const DISCRIMINATOR_VALUE: &str = "DiscriminatorValue";
    pub const KEYLESS: &str = "Keyless";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub value: Value,
    pub source: ConfigurationSource,
}

/// The metadata node an annotation is attached to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Model,
    EntityType(EntityTypeId),
    Property(PropertyId),
    Key(KeyId),
    ForeignKey(ForeignKeyId),
    Navigation(NavigationId),
    Index(IndexId),
}

/// Insertion-ordered annotation side table.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    entries: IndexMap<String, Annotation>,
}

impl Annotations {
    pub fn get(&self, name: &str) -> Option<&Annotation> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|annotation| &annotation.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_set(&self, name: &str, source: ConfigurationSource) -> bool {
        source.overrides(self.entries.get(name).map(|annotation| annotation.source))
    }

    pub(crate) fn set(
        &mut self,
        name: &str,
        value: Value,
        source: ConfigurationSource,
    ) -> FacetChange<Annotation> {
        if !self.can_set(name, source) {
            return FacetChange::Rejected;
        }

        if let Some(existing) = self.entries.get_mut(name) {
            if existing.value == value {
                existing.source = existing.source.max(source);
                return FacetChange::Unchanged;
            }
        }

        let old = self.entries.insert(
            name.to_string(),
            Annotation {
                name: name.to_string(),
                value,
                source,
            },
        );
        let old_source = old.as_ref().map(|annotation| annotation.source);
        FacetChange::Changed { old, old_source }
    }

    pub(crate) fn remove(
        &mut self,
        name: &str,
        source: ConfigurationSource,
    ) -> FacetChange<Annotation> {
        match self.entries.get(name) {
            None => FacetChange::Unchanged,
            Some(existing) if !source.overrides(Some(existing.source)) => FacetChange::Rejected,
            Some(_) => {
                let old = self.entries.shift_remove(name);
                let old_source = old.as_ref().map(|annotation| annotation.source);
                FacetChange::Changed { old, old_source }
            }
        }
    }

    pub(crate) fn restore(&mut self, name: &str, old: Option<Annotation>) {
        match old {
            Some(annotation) => {
                self.entries.insert(name.to_string(), annotation);
            }
            None => {
                self.entries.shift_remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigurationSource::*;

    #[test]
    fn set_respects_source() {
        let mut annotations = Annotations::default();
        assert!(annotations.set("Comment", "a".into(), DataAnnotation).is_changed());
        assert_eq!(
            annotations.set("Comment", "b".into(), Convention),
            FacetChange::Rejected
        );
        assert!(annotations.set("Comment", "c".into(), Explicit).is_changed());
        assert_eq!(annotations.value("Comment"), Some(&Value::from("c")));
    }

    #[test]
    fn same_value_is_unchanged() {
        let mut annotations = Annotations::default();
        annotations.set("Comment", "a".into(), Convention);
        assert_eq!(
            annotations.set("Comment", "a".into(), Explicit),
            FacetChange::Unchanged
        );
        assert_eq!(annotations.get("Comment").unwrap().source, Explicit);
    }

    #[test]
    fn remove_requires_override() {
        let mut annotations = Annotations::default();
        annotations.set("Comment", "a".into(), Explicit);
        assert_eq!(
            annotations.remove("Comment", Convention),
            FacetChange::Rejected
        );
        assert!(annotations.remove("Comment", Explicit).is_changed());
        assert!(annotations.is_empty());
    }
}
