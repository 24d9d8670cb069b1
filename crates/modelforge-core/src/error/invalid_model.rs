use super::Error;

/// Error when a finalized model fails validation.
///
/// This occurs when:
/// - A root entity type has no primary key and is not marked keyless
/// - A key property is nullable
/// - A foreign key's properties do not line up with its principal key
/// - A property has no store type mapping
/// - Two types in a hierarchy share a discriminator value
#[derive(Debug)]
pub(super) struct InvalidModel {
    message: Box<str>,
}

impl std::error::Error for InvalidModel {}

impl core::fmt::Display for InvalidModel {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid model: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid model error.
    pub fn invalid_model(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidModel(InvalidModel {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error, or any error in its context chain, is an
    /// invalid model error.
    pub fn is_invalid_model(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidModel(_)))
    }
}
