use super::Error;

/// Error when conventions keep triggering each other past the nesting limit.
#[derive(Debug)]
pub(super) struct ConventionDepthExceeded {
    limit: usize,
}

impl std::error::Error for ConventionDepthExceeded {}

impl core::fmt::Display for ConventionDepthExceeded {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "convention dispatch exceeded the maximum nesting depth of {}",
            self.limit
        )
    }
}

impl Error {
    pub fn convention_depth_exceeded(limit: usize) -> Error {
        Error::from(super::ErrorKind::ConventionDepthExceeded(
            ConventionDepthExceeded { limit },
        ))
    }

    pub fn is_convention_depth_exceeded(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::ConventionDepthExceeded(_)))
    }
}
