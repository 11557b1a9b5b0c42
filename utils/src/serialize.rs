
use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::Path;

use super::error::*;

pub use serde::{Serialize, Deserialize};
pub use serde::de::DeserializeOwned;

///
/// Reads and deserializes a TOML document from the given path.
///
pub fn read_toml<T: DeserializeOwned> (path: impl AsRef<Path>) -> Result<T>
{
    let path = path.as_ref();

    let mut contents = String::new();
    OpenOptions::new().read(true).open(path)
        .context(format!("Failed to open '{}'.", path.display()))?
        .read_to_string(& mut contents)?;

    let value : T = toml::from_str(& contents).context(format!("Failed to parse '{}'.", path.display()))?;
    Ok(value)
}

///
/// Serializes a value as pretty JSON, replacing whatever the path held before.
///
pub fn write_json<T: Serialize> (path: impl AsRef<Path>, value: & T) -> Result<()>
{
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).context(format!("Failed to write '{}'.", path.display()))?;
    Ok(())
}
