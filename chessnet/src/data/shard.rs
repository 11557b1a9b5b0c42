
use std::fs;
use std::path::{Path, PathBuf};

use tch::Tensor;

use utils::error::*;
use utils::log;

use super::config::Config;
use crate::error::FinetuneError;

///
/// The three aligned files of one shard.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardPaths
{
    pub boards: PathBuf,
    pub policy: PathBuf,
    pub value: PathBuf
}

///
/// A directory of shards and the convention its files are named by.
///
#[derive(Clone, Debug)]
pub struct ShardSource
{
    dir: PathBuf,
    config: Config
}

impl ShardSource
{
    ///
    /// Opens the configured data directory, which must exist.
    ///
    pub fn new (config: & Config) -> Result<ShardSource>
    {
        let dir = PathBuf::from(& config.dir);
        if ! dir.is_dir()
        {
            return Err(FinetuneError::MissingDataDir(dir).into());
        }

        Ok(ShardSource { dir, config: config.clone() })
    }

    pub fn dir (& self) -> & Path
    {
        & self.dir
    }

    ///
    /// Returns the ids of every board file in the directory, ascending.
    /// Files whose id does not parse are skipped with a warning. Finding no
    /// shard at all is an error.
    ///
    pub fn discover (& self) -> Result<Vec<u32>>
    {
        let mut ids = Vec::new();

        let entries = fs::read_dir(& self.dir).context(format!("Failed to list '{}'.", self.dir.display()))?;
        for entry in entries
        {
            let name = entry?.file_name();
            let name = match name.to_str()
            {
                Some(name) => name,
                None       => continue
            };

            if ! name.starts_with(& self.config.board_prefix) || ! name.ends_with(".npy")
            {
                continue;
            }

            match parse_id(name, & self.config.board_prefix)
            {
                Some(id) => ids.push(id),
                None     => log::warn!("Skipping '{}': no shard id after '{}'.", name, self.config.board_prefix)
            }
        }

        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty()
        {
            return Err(FinetuneError::NoShards(self.dir.clone()).into());
        }

        Ok(ids)
    }

    ///
    /// The number of samples in shard `id`, read from its board file alone.
    ///
    pub fn sample_count (& self, id: u32) -> Result<usize>
    {
        let path = self.paths(id).boards;
        let boards = Tensor::read_npy(& path).context(format!("Failed to read '{}'.", path.display()))?;
        Ok(boards.size().first().copied().unwrap_or(0) as usize)
    }

    ///
    /// The file names of shard `id`, with the id zero-padded.
    ///
    pub fn paths (& self, id: u32) -> ShardPaths
    {
        let width = self.config.id_width;
        let file = |prefix: & str| self.dir.join(format!("{}{:0width$}.npy", prefix, id, width = width));

        ShardPaths
        {
            boards: file(& self.config.board_prefix),
            policy: file(& self.config.policy_prefix),
            value: file(& self.config.value_prefix)
        }
    }
}

///
/// Extracts the id from `<prefix><digits>.npy`.
///
pub fn parse_id (file_name: & str, prefix: & str) -> Option<u32>
{
    let digits = file_name.strip_prefix(prefix)?.strip_suffix(".npy")?;

    if digits.is_empty() || ! digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    digits.parse::<u32>().ok()
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn source (dir: & Path) -> ShardSource
    {
        let config = Config { dir: dir.to_string_lossy().into_owned(), ..Config::default() };
        ShardSource::new(& config).unwrap()
    }

    #[test]
    fn ids_parse_from_padded_names ()
    {
        assert_eq!(parse_id("X_boards_batch_0003.npy", "X_boards_batch_"), Some(3));
        assert_eq!(parse_id("X_boards_batch_12345.npy", "X_boards_batch_"), Some(12345));
        assert_eq!(parse_id("X_boards_batch_00a1.npy", "X_boards_batch_"), None);
        assert_eq!(parse_id("X_boards_batch_.npy", "X_boards_batch_"), None);
        assert_eq!(parse_id("X_boards_batch_-1.npy", "X_boards_batch_"), None);
        assert_eq!(parse_id("y_value_batch_0001.npy", "X_boards_batch_"), None);
    }

    #[test]
    fn discovery_sorts_and_skips_malformed_names ()
    {
        let dir = tempfile::tempdir().unwrap();
        for name in ["X_boards_batch_0010.npy", "X_boards_batch_0002.npy", "X_boards_batch_copy.npy", "y_policy_batch_0007.npy", "notes.txt"]
        {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        assert_eq!(source(dir.path()).discover().unwrap(), vec![2, 10]);
    }

    #[test]
    fn empty_directory_has_no_shards ()
    {
        let dir = tempfile::tempdir().unwrap();
        let err = source(dir.path()).discover().unwrap_err();
        assert!(matches!(err.downcast_ref::<FinetuneError>(), Some(FinetuneError::NoShards(_))));
    }

    #[test]
    fn missing_directory_is_rejected ()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { dir: dir.path().join("absent").to_string_lossy().into_owned(), ..Config::default() };

        let err = ShardSource::new(& config).unwrap_err();
        assert!(matches!(err.downcast_ref::<FinetuneError>(), Some(FinetuneError::MissingDataDir(_))));
    }

    #[test]
    fn paths_pad_the_id ()
    {
        let dir = tempfile::tempdir().unwrap();
        let paths = source(dir.path()).paths(7);

        assert_eq!(paths.boards, dir.path().join("X_boards_batch_0007.npy"));
        assert_eq!(paths.policy, dir.path().join("y_policy_batch_0007.npy"));
        assert_eq!(paths.value, dir.path().join("y_value_batch_0007.npy"));
    }
}
