use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;
use serde::Deserialize;

use crate::error::JobError;

/// A unit of content to materialise into a job directory
///
/// A plain `Path` lands under its own base name; a `Pair` is copied to an explicit destination
/// relative to the target directory. Both may point at a directory, which is expanded into
/// its files by [`expand`]. In JSON a pair is a two element array: `["src/run.in", "run.in"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TemplateRef {
    Path(PathBuf),
    Pair(PathBuf, PathBuf),
}

impl TemplateRef {
    pub fn source(&self) -> &Path {
        match self {
            TemplateRef::Path(source) => source,
            TemplateRef::Pair(source, _) => source,
        }
    }

    /// Destination relative to the target directory
    ///
    /// A plain `dir/` or `.` has an empty destination, so its contents land directly in the
    /// target directory rather than under `dir`.
    pub fn destination(&self) -> Result<PathBuf, JobError> {
        match self {
            TemplateRef::Path(source) if is_contents_only(source) => Ok(PathBuf::new()),
            TemplateRef::Path(source) => source
                .file_name()
                .map(PathBuf::from)
                .ok_or_else(|| JobError::config(format!("{} has no file name", source.display()))),
            TemplateRef::Pair(_, destination) => Ok(destination.clone()),
        }
    }

    /// Same reference reading from another source, destination kept
    pub(crate) fn with_source(&self, source: PathBuf) -> Result<TemplateRef, JobError> {
        Ok(TemplateRef::Pair(source, self.destination()?))
    }
}

fn is_contents_only(source: &Path) -> bool {
    let text = source.as_os_str().to_string_lossy();
    text == "." || text.ends_with(std::path::MAIN_SEPARATOR) || text.ends_with('/')
}

/// `SRC` or `SRC:DEST`, as written on the command line
impl FromStr for TemplateRef {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((source, destination)) if !source.is_empty() && !destination.is_empty() => {
                Ok(TemplateRef::Pair(PathBuf::from(source), PathBuf::from(destination)))
            }
            Some(_) => Err(JobError::config(format!("Invalid file reference '{s}', expected SRC or SRC:DEST"))),
            None if s.is_empty() => Err(JobError::config("Empty file reference")),
            None => Ok(TemplateRef::Path(PathBuf::from(s))),
        }
    }
}

/// A single resolved file: where to read it and where it goes relative to the target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Flatten a list of references into regular files
///
/// Directories are replaced by their children with destinations re-based under the directory's
/// destination, repeated until only files remain. Works on its own stack, the caller's list is
/// not touched. Children are visited depth first in file name order.
///
/// Any source that is neither a file nor a directory fails the whole expansion.
pub fn expand(refs: &[TemplateRef]) -> Result<Vec<FileCopy>, JobError> {
    let mut stack: Vec<FileCopy> = Vec::with_capacity(refs.len());
    for template in refs.iter().rev() {
        stack.push(FileCopy { source: template.source().to_path_buf(), destination: template.destination()? });
    }

    let mut files = Vec::new();
    while let Some(entry) = stack.pop() {
        if entry.source.is_dir() {
            debug!("Expanding directory {}", entry.source.display());
            let mut children = read_children(&entry.source)?;
            children.sort();
            for name in children.into_iter().rev() {
                stack.push(FileCopy {
                    source: entry.source.join(&name),
                    destination: entry.destination.join(&name),
                });
            }
        } else if entry.source.is_file() {
            files.push(entry);
        } else {
            return Err(JobError::config(format!(
                "File lists can't contain non-existent files: {}",
                entry.source.display()
            )));
        }
    }

    Ok(files)
}

fn read_children(dir: &Path) -> Result<Vec<PathBuf>, JobError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(PathBuf::from(entry?.file_name()));
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_plain_file_lands_under_base_name() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("input").join("run.in");
        touch(&file);

        let files = expand(&[TemplateRef::Path(file.clone())]).unwrap();
        assert_eq!(files, vec![FileCopy { source: file, destination: PathBuf::from("run.in") }]);
    }

    #[test]
    fn test_pair_keeps_destination() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        touch(&file);

        let files = expand(&[TemplateRef::Pair(file.clone(), PathBuf::from("conf/b.txt"))]).unwrap();
        assert_eq!(files[0].destination, PathBuf::from("conf/b.txt"));
    }

    #[test]
    fn test_directory_expands_to_recursive_file_count() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("inputs");
        touch(&root.join("a.in"));
        touch(&root.join("b.in"));
        touch(&root.join("sub").join("c.in"));
        touch(&root.join("sub").join("deeper").join("d.in"));
        fs::create_dir_all(root.join("empty")).unwrap();

        let files = expand(&[TemplateRef::Path(root.clone())]).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| f.source.is_file()));

        let destinations: Vec<PathBuf> = files.iter().map(|f| f.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                PathBuf::from("inputs/a.in"),
                PathBuf::from("inputs/b.in"),
                PathBuf::from("inputs/sub/c.in"),
                PathBuf::from("inputs/sub/deeper/d.in"),
            ]
        );
    }

    #[test]
    fn test_directory_pair_is_rebased() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("inputs");
        touch(&root.join("sub").join("c.in"));

        let files = expand(&[TemplateRef::Pair(root, PathBuf::from("data"))]).unwrap();
        assert_eq!(files[0].destination, PathBuf::from("data/sub/c.in"));
    }

    #[test]
    fn test_trailing_slash_copies_contents_only() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("inputs");
        touch(&root.join("a.in"));
        touch(&root.join("sub").join("c.in"));

        let contents = PathBuf::from(format!("{}/", root.display()));
        let files = expand(&[TemplateRef::Path(contents)]).unwrap();
        let destinations: Vec<PathBuf> = files.iter().map(|f| f.destination.clone()).collect();
        assert_eq!(destinations, vec![PathBuf::from("a.in"), PathBuf::from("sub/c.in")]);
    }

    #[test]
    fn test_current_dir_has_empty_destination() {
        let current = TemplateRef::Path(PathBuf::from("."));
        assert_eq!(current.destination().unwrap(), PathBuf::new());
        assert_eq!(TemplateRef::Path(PathBuf::from("tpl/")).destination().unwrap(), PathBuf::new());
        assert_eq!(TemplateRef::Path(PathBuf::from("tpl")).destination().unwrap(), PathBuf::from("tpl"));
        assert!(TemplateRef::Path(PathBuf::from("..")).destination().is_err());
    }

    #[test]
    fn test_caller_list_is_unchanged() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("inputs");
        touch(&root.join("a.in"));
        let refs = vec![TemplateRef::Path(root)];

        expand(&refs).unwrap();
        expand(&refs).unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let tmp = tempdir().unwrap();
        let err = expand(&[TemplateRef::Path(tmp.path().join("nope"))]).unwrap_err();
        assert!(matches!(err, JobError::Configuration(_)));
    }

    #[test]
    fn test_parse_from_command_line() {
        assert_eq!("sub.sh".parse::<TemplateRef>().unwrap(), TemplateRef::Path(PathBuf::from("sub.sh")));
        assert_eq!(
            "tpl/run.in:{JOB_NAME}.in".parse::<TemplateRef>().unwrap(),
            TemplateRef::Pair(PathBuf::from("tpl/run.in"), PathBuf::from("{JOB_NAME}.in"))
        );
        assert!("src:".parse::<TemplateRef>().is_err());
        assert!("".parse::<TemplateRef>().is_err());
    }

    #[test]
    fn test_deserialise_mixed_list() {
        let refs: Vec<TemplateRef> = serde_json::from_str(r#"["sub.sh", ["a", "b/c"]]"#).unwrap();
        assert_eq!(
            refs,
            vec![
                TemplateRef::Path(PathBuf::from("sub.sh")),
                TemplateRef::Pair(PathBuf::from("a"), PathBuf::from("b/c")),
            ]
        );
    }
}
