// Path helpers shared by both protocol variants. Remote paths are plain
// '/'-separated strings; local paths follow the host's separators. Nothing
// here touches the local filesystem.

use std::ffi::OsStr;
use std::path::Path;

/// Final `/`-separated segment of `path`.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// File name of a local path, split on the host's separators (`\` too on
/// Windows).
pub fn local_file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_else(|| file_name_of(path))
}

/// Joins `directory` and `name` with a single `/`, dropping at most one
/// trailing slash from `directory`.
pub fn join_remote(directory: &str, name: &str) -> String {
    let directory = directory.strip_suffix('/').unwrap_or(directory);
    format!("{}/{}", directory, name)
}

/// Splits `dir/pattern` into its parent directory and final segment.
/// A bare pattern lives in the current directory, reported as `None`.
pub fn split_parent(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => (Some("/"), name),
        Some((parent, name)) => (Some(parent), name),
        None => (None, path),
    }
}

/// Shell-style match supporting a single `*` anywhere in the pattern.
pub fn glob_match(filename: &str, pattern: &str) -> bool {
    match pattern.split_once('*') {
        None => filename == pattern,
        Some((prefix, suffix)) => {
            filename.len() >= prefix.len() + suffix.len()
                && filename.starts_with(prefix)
                && filename.ends_with(suffix)
        }
    }
}
