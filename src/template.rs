//! Render template files into job directories

/// Safe `{key}` substitution that tolerates arbitrary braces
pub mod substitute;

/// File and directory references, flattened into single file copies
pub mod tree;

/// Copy (and optionally substitute) referenced files into a target directory
pub mod copy;
