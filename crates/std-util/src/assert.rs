//! Pattern assertions that hand back the matched payload.
//!
//! Each macro accepts an optional trailing format string that is appended to
//! the panic message.

#[doc(hidden)]
#[macro_export]
macro_rules! __assert_failed {
    ($expected:literal, $actual:expr $(, $($t:tt)* )?) => {{
        use std::fmt::Write;
        let mut msg = format!("expected `{}`; actual={:?}", $expected, $actual);

        $(
            write!(msg, ", ").unwrap();
            write!(msg, $($t)*).unwrap();
        )?

        panic!("{}", msg)
    }};
}

#[macro_export]
macro_rules! assert_ok {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Ok(v) => v,
            actual => $crate::__assert_failed!("Ok", actual $(, $($t)*)?),
        }
    };
}

#[macro_export]
macro_rules! assert_err {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Err(e) => e,
            actual => $crate::__assert_failed!("Err", actual $(, $($t)*)?),
        }
    };
}

#[macro_export]
macro_rules! assert_some {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            Some(v) => v,
            None => $crate::__assert_failed!("Some", None::<()> $(, $($t)*)?),
        }
    };
}

#[macro_export]
macro_rules! assert_none {
    ($e:expr $(, $($t:tt)* )?) => {
        match $e {
            None => {}
            actual => $crate::__assert_failed!("None", actual $(, $($t)*)?),
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn payloads_are_returned() {
        let ok: Result<u8, &str> = Ok(1);
        assert_eq!(assert_ok!(ok), 1);

        let err: Result<u8, &str> = Err("boom");
        assert_eq!(assert_err!(err), "boom");

        assert_eq!(assert_some!(Some("x")), "x");
        assert_none!(None::<u8>);
    }

    #[test]
    #[should_panic(expected = "expected `None`; actual=Some(3), while checking slot 2")]
    fn message_is_appended() {
        assert_none!(Some(3), "while checking {} {}", "slot", 2);
    }
}
