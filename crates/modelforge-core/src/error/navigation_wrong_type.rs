use super::Error;

/// Error when a navigation member's type does not fit the shape the
/// relationship requires.
#[derive(Debug)]
pub(super) struct NavigationWrongType {
    navigation: Box<str>,
    declaring_type: Box<str>,
    member_type: Box<str>,
    target_type: Box<str>,
    collection: bool,
}

impl std::error::Error for NavigationWrongType {}

impl core::fmt::Display for NavigationWrongType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.collection {
            write!(
                f,
                "collection navigation `{}.{}` of type `{}` cannot hold elements of type `{}`",
                self.declaring_type, self.navigation, self.member_type, self.target_type
            )
        } else {
            write!(
                f,
                "reference navigation `{}.{}` of type `{}` cannot refer to `{}`",
                self.declaring_type, self.navigation, self.member_type, self.target_type
            )
        }
    }
}

impl Error {
    /// The navigation must be a collection, but its element type cannot hold
    /// the target entity type.
    pub fn navigation_collection_wrong_type(
        navigation: impl Into<String>,
        declaring_type: impl Into<String>,
        member_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Error {
        Error::navigation_wrong_type(navigation, declaring_type, member_type, target_type, true)
    }

    /// The navigation must be a single reference, but its type cannot hold
    /// the target entity type.
    pub fn navigation_single_wrong_type(
        navigation: impl Into<String>,
        declaring_type: impl Into<String>,
        member_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Error {
        Error::navigation_wrong_type(navigation, declaring_type, member_type, target_type, false)
    }

    fn navigation_wrong_type(
        navigation: impl Into<String>,
        declaring_type: impl Into<String>,
        member_type: impl Into<String>,
        target_type: impl Into<String>,
        collection: bool,
    ) -> Error {
        Error::from(super::ErrorKind::NavigationWrongType(NavigationWrongType {
            navigation: navigation.into().into(),
            declaring_type: declaring_type.into().into(),
            member_type: member_type.into().into(),
            target_type: target_type.into().into(),
            collection,
        }))
    }

    pub fn is_navigation_wrong_type(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::NavigationWrongType(_)))
    }
}
