
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tch::nn::VarStore;
use tch::Tensor;

use utils::error::*;
use utils::log;

use crate::error::FinetuneError;

///
/// Reads every named tensor of a checkpoint. `.safetensors` files are read
/// as such; anything else is treated as a libtorch `.ot` archive.
///
pub fn read (path: & Path) -> Result<HashMap<String, Tensor>>
{
    if ! path.is_file()
    {
        return Err(FinetuneError::MissingCheckpoint(path.to_owned()).into());
    }

    let named = match path.extension().and_then(|e| e.to_str())
    {
        Some("safetensors") => Tensor::read_safetensors(path),
        _                   => Tensor::load_multi(path)
    }
    .context(format!("Failed to read checkpoint '{}'.", path.display()))?;

    Ok(named.into_iter().collect())
}

///
/// Copies a checkpoint into the variable store. Every variable must be
/// present with exactly its shape; nothing is copied unless all of them are.
/// Tensors in the file that the store does not know are ignored.
///
pub fn restore (vs: & VarStore, path: & Path) -> Result<()>
{
    let named = read(path)?;
    let variables = vs.variables();

    let mut names : Vec<& String> = variables.keys().collect();
    names.sort();

    for name in & names
    {
        let source = named.get(* name).ok_or_else(|| FinetuneError::MissingTensor { path: path.to_owned(), name: (* name).clone() })?;
        let expected = variables[* name].size();

        if source.size() != expected
        {
            return Err(FinetuneError::ShapeMismatch { name: (* name).clone(), expected, found: source.size() }.into());
        }
    }

    tch::no_grad(|| -> Result<()>
    {
        for name in & names
        {
            let mut target = variables[* name].shallow_clone();
            let source = named[* name].to_kind(target.kind());
            target.f_copy_(& source).context(format!("Failed to copy '{}'.", name))?;
        }
        Ok(())
    })?;

    let ignored = named.len().saturating_sub(names.len());
    log::info!("Loaded {} tensors from '{}' ({} unused entries ignored).", names.len(), path.display(), ignored);

    Ok(())
}

///
/// Writes every variable of the store to `path`, creating its directory.
///
pub fn write (vs: & VarStore, path: & Path) -> Result<()>
{
    if let Some(parent) = path.parent().filter(|p| ! p.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).context(format!("Failed to create '{}'.", parent.display()))?;
    }

    vs.save(path).context(format!("Failed to save checkpoint '{}'.", path.display()))?;
    log::info!("Saved checkpoint '{}'.", path.display());

    Ok(())
}
