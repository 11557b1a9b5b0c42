
///
/// The result and error types shared by every crate in the workspace.
///
pub use anyhow::{Context, Error, Result};

///
/// Builds an ad-hoc error from a format string, e.g. `error!("bad id {}", id)`.
///
pub use anyhow::anyhow as error;

#[cfg(test)]
mod tests
{
    use super::*;

    fn parse_id (s: & str) -> Result<u32>
    {
        s.parse::<u32>().context(format!("Invalid id '{}'.", s))
    }

    #[test]
    fn context_wraps_the_source_error ()
    {
        let err = parse_id("x1").unwrap_err();
        assert_eq!(err.to_string(), "Invalid id 'x1'.");
        assert!(err.source().is_some());
    }

    #[test]
    fn error_macro_formats ()
    {
        let err : Error = error!("Mode '{}' is unsupported.", "play");
        assert_eq!(err.to_string(), "Mode 'play' is unsupported.");
    }
}
