use crate::client::RemoteFile;
use crate::connection::Connection;
use crate::error::OperationError;
use crate::utils::{file_name_of, glob_match, split_parent};
use clap::ValueEnum;
use log::{info, warn};
use std::cmp::Ordering;

/// Outcome of a batch transfer. Individual failures do not stop the batch.
#[derive(Debug, Default)]
pub struct TransferReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, OperationError)>,
}

impl TransferReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortKey {
    Name,
    Size,
    #[default]
    Modified,
    Type,
}

/// Downloads `remote` into `local_directory`. A `*` in the final path
/// segment selects every regular file of the parent directory whose name
/// matches; a relative parent is resolved against the working directory.
pub fn download_matching(
    connection: &mut dyn Connection,
    remote: &str,
    local_directory: &str,
) -> Result<TransferReport, OperationError> {
    let (parent, pattern) = split_parent(remote);
    if !pattern.contains('*') {
        connection.download(remote, local_directory)?;
        info!("downloaded {} to {}", remote, local_directory);
        return Ok(TransferReport {
            succeeded: vec![remote.to_string()],
            failed: Vec::new(),
        });
    }

    let listing = match parent {
        None => connection.list_files()?,
        Some(dir) if dir.starts_with('/') => connection.list_directory(dir)?,
        Some(dir) => connection.list_files_in(dir)?,
    };

    let mut report = TransferReport::default();
    for file in listing
        .iter()
        .filter(|f| !f.is_dir() && glob_match(f.name(), pattern))
    {
        match connection.download(file.path(), local_directory) {
            Ok(()) => report.succeeded.push(file.path().to_string()),
            Err(err) => {
                warn!("download of {} failed: {}", file.path(), err);
                report.failed.push((file.path().to_string(), err));
            }
        }
    }
    info!(
        "downloaded {}/{} files matching {}",
        report.succeeded.len(),
        report.total(),
        pattern
    );
    Ok(report)
}

/// Uploads each local file into `remote_directory`, keeping going after a
/// failure.
pub fn upload_files<S: AsRef<str>>(
    connection: &mut dyn Connection,
    files: &[S],
    remote_directory: &str,
) -> TransferReport {
    let mut report = TransferReport::default();
    for file in files {
        let file = file.as_ref();
        match connection.upload(file, remote_directory) {
            Ok(()) => {
                info!("uploaded {} to {}", file, remote_directory);
                report.succeeded.push(file.to_string());
            }
            Err(err) => {
                warn!("upload of {} failed: {}", file, err);
                report.failed.push((file.to_string(), err));
            }
        }
    }
    report
}

/// Orders a listing in place. Newest first for `Modified`; directories
/// ahead of files for `Type`.
pub fn sort_listing(files: &mut [RemoteFile], key: SortKey, reverse: bool) {
    files.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Name => by_name(a, b),
            SortKey::Size => a.size().cmp(&b.size()).then_with(|| by_name(a, b)),
            SortKey::Modified => b.modified().cmp(&a.modified()).then_with(|| by_name(a, b)),
            SortKey::Type => b
                .is_dir()
                .cmp(&a.is_dir())
                .then_with(|| extension(a.name()).cmp(extension(b.name())))
                .then_with(|| by_name(a, b)),
        };
        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn by_name(a: &RemoteFile, b: &RemoteFile) -> Ordering {
    a.name().to_lowercase().cmp(&b.name().to_lowercase())
}

fn extension(name: &str) -> &str {
    match file_name_of(name).rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}
