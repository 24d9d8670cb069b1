use crate::ConfigurationSource;

/// A configurable value paired with the source that configured it.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet<T> {
    value: Option<T>,
    source: Option<ConfigurationSource>,
}

/// The result of [`Facet::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum FacetChange<T> {
    /// The stored source outranks the new one; nothing changed.
    Rejected,

    /// The value was already stored. The source may have been raised.
    Unchanged,

    /// The value changed. Holds the previous state so it can be restored.
    Changed {
        old: Option<T>,
        old_source: Option<ConfigurationSource>,
    },
}

impl<T> FacetChange<T> {
    pub fn is_applied(&self) -> bool {
        !matches!(self, FacetChange::Rejected)
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, FacetChange::Changed { .. })
    }
}

impl<T> Default for Facet<T> {
    fn default() -> Self {
        Facet {
            value: None,
            source: None,
        }
    }
}

impl<T: PartialEq> Facet<T> {
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn source(&self) -> Option<ConfigurationSource> {
        self.source
    }

    pub fn can_set(&self, source: ConfigurationSource) -> bool {
        source.overrides(self.source)
    }

    /// Sets the value if `source` overrides the stored source.
    ///
    /// Setting `None` clears the value and forgets the source, so any later
    /// source may configure it again.
    pub fn set(&mut self, value: Option<T>, source: ConfigurationSource) -> FacetChange<T> {
        if !self.can_set(source) {
            return FacetChange::Rejected;
        }

        if self.value == value {
            if value.is_some() {
                self.source = Some(source.max_with(self.source));
            }
            return FacetChange::Unchanged;
        }

        let old = std::mem::replace(&mut self.value, value);
        let old_source = self.source;
        self.source = if self.value.is_some() {
            Some(source)
        } else {
            None
        };

        FacetChange::Changed { old, old_source }
    }

    /// Puts back a previous state, bypassing the source check.
    pub(crate) fn restore(&mut self, value: Option<T>, source: Option<ConfigurationSource>) {
        self.value = value;
        self.source = source;
    }
}

impl<T: Copy + PartialEq> Facet<T> {
    pub fn value(&self) -> Option<T> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigurationSource::*;

    #[test]
    fn unset_facet_reads_none() {
        let facet = Facet::<u32>::default();
        assert_eq!(facet.get(), None);
        assert_eq!(facet.source(), None);
    }

    #[test]
    fn lower_source_is_rejected() {
        let mut facet = Facet::default();
        assert!(facet.set(Some(10), Explicit).is_changed());
        assert_eq!(facet.set(Some(20), Convention), FacetChange::Rejected);
        assert_eq!(facet.value(), Some(10));
        assert_eq!(facet.source(), Some(Explicit));
    }

    #[test]
    fn same_value_raises_source_without_change() {
        let mut facet = Facet::default();
        facet.set(Some(true), Convention);
        assert_eq!(facet.set(Some(true), DataAnnotation), FacetChange::Unchanged);
        assert_eq!(facet.source(), Some(DataAnnotation));
    }

    #[test]
    fn change_reports_previous_state() {
        let mut facet = Facet::default();
        facet.set(Some(1), Convention);
        assert_eq!(
            facet.set(Some(2), Explicit),
            FacetChange::Changed {
                old: Some(1),
                old_source: Some(Convention)
            }
        );
    }

    #[test]
    fn clearing_resets_source() {
        let mut facet = Facet::default();
        facet.set(Some(1), DataAnnotation);
        assert!(facet.set(None, Explicit).is_changed());
        assert_eq!(facet.source(), None);
        assert!(facet.set(Some(3), Convention).is_changed());
    }
}
