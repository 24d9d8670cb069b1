mod error;
pub use error::Error;

pub mod annotation;
pub use annotation::{Annotation, AnnotationTarget, Annotations};

pub mod builder;
pub use builder::ModelBuilder;

pub mod convention;
pub use convention::{Convention, ConventionFlow, ConventionSet, Hook};

pub mod conventions;

mod facet;
pub use facet::{Facet, FacetChange};

mod finalized;
pub use finalized::{CollectionAccessor, FinalizedModel};

mod memo;

pub mod metadata;
pub use metadata::Model;

pub mod reflect;

pub mod relational;
pub use relational::{RelationalModel, RelationalOptions};

mod source;
pub use source::ConfigurationSource;

pub mod storage;

mod value;
pub use value::Value;

mod verify;

/// A Result type alias that uses modelforge's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
