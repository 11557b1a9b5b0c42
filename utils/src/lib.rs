pub mod error;
pub use self::error::*;

///
/// Log macros are reached through the module (`log::info!`); only the
/// logger setup is lifted to the root, beside the `error!` constructor.
///
pub mod log;
pub use self::log::initialize;

pub mod serialize;
pub use self::serialize::*;

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn root_error_macro_builds_errors ()
    {
        let err : Error = error!("Shard {:04} is missing.", 7);
        assert_eq!(err.to_string(), "Shard 0007 is missing.");
    }
}
