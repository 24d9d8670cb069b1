use super::Error;

/// Error when a navigation names a member the declaring type does not have.
#[derive(Debug)]
pub(super) struct NoBackingNavigation {
    navigation: Box<str>,
    declaring_type: Box<str>,
}

impl std::error::Error for NoBackingNavigation {}

impl core::fmt::Display for NoBackingNavigation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "navigation `{}` is not a member of type `{}`",
            self.navigation, self.declaring_type
        )
    }
}

impl Error {
    pub fn no_backing_navigation(
        navigation: impl Into<String>,
        declaring_type: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::NoBackingNavigation(NoBackingNavigation {
            navigation: navigation.into().into(),
            declaring_type: declaring_type.into().into(),
        }))
    }

    pub fn is_no_backing_navigation(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::NoBackingNavigation(_)))
    }
}
