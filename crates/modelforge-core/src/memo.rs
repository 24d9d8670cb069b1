use once_cell::race::OnceBox;
use std::fmt;

/// A value computed on first read and published with a single
/// compare-and-swap.
///
/// Racing readers may each run the initializer; exactly one result is
/// stored and every reader gets a reference to it.
pub(crate) struct Memo<T> {
    cell: OnceBox<T>,
}

impl<T> Memo<T> {
    pub(crate) fn new() -> Memo<T> {
        Memo {
            cell: OnceBox::new(),
        }
    }

    pub(crate) fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub(crate) fn get_or_init(&self, f: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(|| Box::new(f()))
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Memo::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => f.debug_tuple("Memo").field(value).finish(),
            None => f.write_str("Memo(<uninit>)"),
        }
    }
}
