//! Utility macros for the SCGI crate.

/// Returns early with an error if a condition is not met.
///
/// This is the non-panicking sibling of `assert!`, used for validation checks
/// on wire data and caller input.
///
/// # Example
///
/// ```ignore
/// ensure!(headers.len() < MAX_HEADER_NUM, ParseError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
