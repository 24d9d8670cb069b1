use super::Error;

/// Error when a navigation targets an entity type that has no backing type.
#[derive(Debug)]
pub(super) struct NavigationToShadowEntity {
    navigation: Box<str>,
    declaring_type: Box<str>,
    target_type: Box<str>,
}

impl std::error::Error for NavigationToShadowEntity {}

impl core::fmt::Display for NavigationToShadowEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "navigation `{}.{}` cannot target `{}` because it has no backing type",
            self.declaring_type, self.navigation, self.target_type
        )
    }
}

impl Error {
    pub fn navigation_to_shadow_entity(
        navigation: impl Into<String>,
        declaring_type: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::NavigationToShadowEntity(
            NavigationToShadowEntity {
                navigation: navigation.into().into(),
                declaring_type: declaring_type.into().into(),
                target_type: target_type.into().into(),
            },
        ))
    }

    pub fn is_navigation_to_shadow_entity(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::NavigationToShadowEntity(_)))
    }
}
