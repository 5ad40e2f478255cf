use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::JobError;
use crate::template::substitute::{replace_vars, Bindings};
use crate::template::tree::{expand, TemplateRef};

/// Copy files and directories into `target_dir` byte for byte
pub fn copy_files(refs: &[TemplateRef], target_dir: &Path) -> Result<(), JobError> {
    if refs.is_empty() {
        return Ok(());
    }
    info!("Copying files/folders to {}", target_dir.display());

    for file in expand(refs)? {
        let to_file = target_dir.join(&file.destination);
        create_parent(&to_file)?;
        check_not_source(&file.source, &to_file)?;
        debug!("{} -> {}", file.source.display(), to_file.display());
        fs::copy(&file.source, &to_file)?;
    }
    Ok(())
}

/// Copy files and directories into `target_dir`, replacing variables in file names and contents
///
/// Source paths are substituted first: `inputs/{JOB_NAME}.in` reads a per-job input if it
/// exists, otherwise the path is taken literally. Destinations are substituted after directory
/// expansion so names inside template directories can hold placeholders too. Existing files
/// are overwritten.
pub fn copy_and_replace_files(refs: &[TemplateRef], target_dir: &Path, bindings: &Bindings) -> Result<(), JobError> {
    if refs.is_empty() {
        return Ok(());
    }
    info!("Copying files/folders to {} and replacing vars", target_dir.display());

    let resolved = refs
        .iter()
        .map(|template| resolve_source(template, bindings))
        .collect::<Result<Vec<TemplateRef>, JobError>>()?;

    for file in expand(&resolved)? {
        let to_file = target_dir.join(replace_path(&file.destination, bindings)?);
        create_parent(&to_file)?;
        check_not_source(&file.source, &to_file)?;
        debug!("{} -> {}", file.source.display(), to_file.display());

        let text = fs::read_to_string(&file.source)?;
        fs::write(&to_file, replace_vars(&text, bindings))?;
    }
    Ok(())
}

/// Substitute placeholders in a path
pub fn replace_path(path: &Path, bindings: &Bindings) -> Result<PathBuf, JobError> {
    let text = path
        .to_str()
        .ok_or_else(|| JobError::config(format!("{} is not valid UTF-8", path.display())))?;
    Ok(PathBuf::from(replace_vars(text, bindings)))
}

fn resolve_source(template: &TemplateRef, bindings: &Bindings) -> Result<TemplateRef, JobError> {
    let source = replace_path(template.source(), bindings)?;
    if source.as_path() != template.source() && source.exists() {
        template.with_source(source)
    } else {
        Ok(template.clone())
    }
}

/// Rendering into the base directory can land on the template itself, e.g. `sub.sh` with
/// base directory `.`
fn check_not_source(source: &Path, to_file: &Path) -> Result<(), JobError> {
    if to_file.exists() && fs::canonicalize(source)? == fs::canonicalize(to_file)? {
        return Err(JobError::config(format!("{} would overwrite itself", source.display())));
    }
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), JobError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
