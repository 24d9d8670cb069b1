/// Where a piece of configuration came from.
///
/// Sources are totally ordered: `Convention < DataAnnotation < Explicit`. A
/// value set at one source can only be replaced from an equal or higher
/// source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigurationSource {
    /// Inferred by a convention.
    Convention,

    /// Read from an attribute on the backing member or type.
    DataAnnotation,

    /// Configured directly through a builder.
    Explicit,
}

impl ConfigurationSource {
    /// Returns `true` if configuration from `self` may replace configuration
    /// previously set from `existing`.
    ///
    /// Every "set iff not already configured at a higher source" decision in
    /// the crate goes through this check.
    pub fn overrides(self, existing: Option<ConfigurationSource>) -> bool {
        match existing {
            None => true,
            Some(existing) => self >= existing,
        }
    }

    /// Merges two optional sources, keeping the higher one.
    pub fn max_with(self, other: Option<ConfigurationSource>) -> ConfigurationSource {
        match other {
            Some(other) => self.max(other),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigurationSource::*;

    #[test]
    fn ordering() {
        assert!(Convention < DataAnnotation);
        assert!(DataAnnotation < Explicit);
    }

    #[test]
    fn overrides() {
        assert!(Convention.overrides(None));
        assert!(Convention.overrides(Some(Convention)));
        assert!(!Convention.overrides(Some(DataAnnotation)));
        assert!(Explicit.overrides(Some(DataAnnotation)));
        assert!(!DataAnnotation.overrides(Some(Explicit)));
    }

    #[test]
    fn max_with() {
        assert_eq!(Convention.max_with(Some(Explicit)), Explicit);
        assert_eq!(DataAnnotation.max_with(None), DataAnnotation);
    }
}
