mod assert;
pub mod str;

pub mod prelude {
    pub use crate::{assert_err, assert_none, assert_ok, assert_some};
}
