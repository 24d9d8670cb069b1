mod adhoc;
mod convention_depth_exceeded;
mod invalid_model;
mod navigation_to_shadow_entity;
mod navigation_wrong_type;
mod no_backing_navigation;

use adhoc::AdhocError;
use convention_depth_exceeded::ConventionDepthExceeded;
use invalid_model::InvalidModel;
use navigation_to_shadow_entity::NavigationToShadowEntity;
use navigation_wrong_type::NavigationWrongType;
use no_backing_navigation::NoBackingNavigation;
use std::sync::Arc;

/// Returns early with an ad-hoc [`Error`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc [`Error`] from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error raised while building, finalizing, or projecting a model.
///
/// The error is a single pointer wide. Context added with [`Error::context`]
/// forms a chain that is displayed outermost first.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context is shown first,
    /// followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        if err.inner.is_none() {
            err = Error::from(ErrorKind::Unknown);
        }
        let inner = err.inner.as_mut().unwrap();
        assert!(
            inner.cause.is_none(),
            "consequent error must not already have a cause"
        );
        Arc::get_mut(inner).unwrap().cause = Some(self);
        err
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// Returns `true` if any error in the context chain satisfies `f`.
    fn any(&self, f: impl Fn(&ErrorKind) -> bool) -> bool {
        self.chain().any(|err| f(err.kind()))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    InvalidModel(InvalidModel),
    NavigationToShadowEntity(NavigationToShadowEntity),
    NoBackingNavigation(NoBackingNavigation),
    NavigationWrongType(NavigationWrongType),
    ConventionDepthExceeded(ConventionDepthExceeded),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            InvalidModel(err) => core::fmt::Display::fmt(err, f),
            NavigationToShadowEntity(err) => core::fmt::Display::fmt(err, f),
            NoBackingNavigation(err) => core::fmt::Display::fmt(err, f),
            NavigationWrongType(err) => core::fmt::Display::fmt(err, f),
            ConventionDepthExceeded(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown modelforge error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        // Ensure Error stays at one word (size of pointer/Arc)
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn error_chain_display() {
        let root = Error::from_args(format_args!("root cause"));
        let mid = Error::from_args(format_args!("middle context"));
        let top = Error::from_args(format_args!("top context"));

        let chained = root.context(mid).context(top);
        assert_eq!(
            chained.to_string(),
            "top context: middle context: root cause"
        );
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("something failed");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "something failed");
    }

    #[test]
    fn invalid_model_with_context() {
        let err = Error::invalid_model("entity type `Blog` requires a primary key")
            .context(err!("finalizing model"));

        assert_eq!(
            err.to_string(),
            "finalizing model: invalid model: entity type `Blog` requires a primary key"
        );
        assert!(err.is_invalid_model());
    }

    #[test]
    fn navigation_errors() {
        let err = Error::navigation_to_shadow_entity("Posts", "Blog", "Post");
        assert_eq!(
            err.to_string(),
            "navigation `Blog.Posts` cannot target `Post` because it has no backing type"
        );
        assert!(err.is_navigation_to_shadow_entity());

        let err = Error::no_backing_navigation("Posts", "Blog");
        assert_eq!(
            err.to_string(),
            "navigation `Posts` is not a member of type `Blog`"
        );

        let err = Error::navigation_collection_wrong_type("Posts", "Blog", "Vec<Tag>", "Post");
        assert_eq!(
            err.to_string(),
            "collection navigation `Blog.Posts` of type `Vec<Tag>` cannot hold elements of type `Post`"
        );
        assert!(err.is_navigation_wrong_type());

        let err = Error::navigation_single_wrong_type("Blog", "Post", "Vec<Post>", "Blog");
        assert_eq!(
            err.to_string(),
            "reference navigation `Post.Blog` of type `Vec<Post>` cannot refer to `Blog`"
        );
    }

    #[test]
    fn convention_depth() {
        let err = Error::convention_depth_exceeded(64);
        assert_eq!(
            err.to_string(),
            "convention dispatch exceeded the maximum nesting depth of 64"
        );
        assert!(err.is_convention_depth_exceeded());
    }
}
