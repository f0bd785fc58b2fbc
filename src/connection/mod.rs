pub mod ftp;
pub mod sftp;

use crate::backend::{FtpHandle, SftpChannel};
use crate::client::RemoteFile;
use crate::error::OperationError;
use crate::stream::{FileStreamProvider, LocalFileStreams};
use crate::utils::{file_name_of, join_remote, local_file_name};
use log::warn;
use std::io::{self, Write};
use std::rc::Rc;

pub use ftp::FtpConnection;
pub use sftp::SftpConnection;

/// Operations available on a live remote session, whatever the protocol.
///
/// Every underlying failure is reported as an [`OperationError`] whose
/// message names the failing operation and its target.
pub trait Connection {
    fn change_directory(&mut self, path: &str) -> Result<(), OperationError>;

    /// Lists `directory` as given. Each entry's full path is `directory`
    /// joined with the entry name.
    fn list_directory(&mut self, directory: &str) -> Result<Vec<RemoteFile>, OperationError>;

    /// Streams `remote_path` into `local_directory`, keeping the remote
    /// file name.
    fn download(&mut self, remote_path: &str, local_directory: &str)
        -> Result<(), OperationError>;

    /// Streams `local_path` into `remote_directory`, keeping the local file
    /// name.
    fn upload(&mut self, local_path: &str, remote_directory: &str) -> Result<(), OperationError>;

    fn print_working_directory(&mut self) -> Result<String, OperationError>;

    /// Lists the current working directory.
    fn list_files(&mut self) -> Result<Vec<RemoteFile>, OperationError> {
        let current = self.print_working_directory()?;
        self.list_directory(&current)
    }

    /// Lists `relative_path` below the current working directory, then
    /// returns to where the session started, even when listing failed.
    fn list_files_in(&mut self, relative_path: &str) -> Result<Vec<RemoteFile>, OperationError> {
        let original = self.print_working_directory()?;
        self.change_directory(&format!("{}/{}", original, relative_path))?;

        let listing = self
            .print_working_directory()
            .and_then(|target| self.list_directory(&target));
        let restored = self.change_directory(&original);

        match (listing, restored) {
            (Ok(files), Ok(())) => Ok(files),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), restored) => {
                if let Err(restore_err) = restored {
                    warn!("could not return to {}: {}", original, restore_err);
                }
                Err(err)
            }
        }
    }
}

/// Wraps authenticated protocol handles into connections, sharing one
/// local stream provider between all of them.
#[derive(Clone)]
pub struct ConnectionFactory {
    streams: Rc<dyn FileStreamProvider>,
}

impl ConnectionFactory {
    pub fn new(streams: Rc<dyn FileStreamProvider>) -> Self {
        Self { streams }
    }

    pub fn create_ftp_connection<'a, H: FtpHandle>(
        &self,
        handle: &'a mut H,
    ) -> FtpConnection<'a, H> {
        FtpConnection::new(handle, Rc::clone(&self.streams))
    }

    pub fn create_sftp_connection<'a>(
        &self,
        channel: &'a mut dyn SftpChannel,
    ) -> SftpConnection<'a> {
        SftpConnection::new(channel, Rc::clone(&self.streams))
    }
}

impl Default for ConnectionFactory {
    fn default() -> Self {
        Self::new(Rc::new(LocalFileStreams))
    }
}

/// Local file a download of `remote_path` is written to.
fn download_target(remote_path: &str, local_directory: &str) -> String {
    format!("{}/{}", local_directory, file_name_of(remote_path))
}

/// Remote target of an upload, with one trailing slash of the directory
/// dropped.
fn upload_target(local_path: &str, remote_directory: &str) -> String {
    join_remote(remote_directory, local_file_name(local_path))
}

/// Local side of a download. Remembers whether the local write failed, so
/// a broken transfer can be blamed on the right end.
struct LocalSink<'a> {
    inner: &'a mut dyn Write,
    failed: bool,
}

impl<'a> LocalSink<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn track<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(err) = &result {
            if err.kind() != io::ErrorKind::Interrupted {
                self.failed = true;
            }
        }
        result
    }
}

impl Write for LocalSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.track(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.track(result)
    }
}

fn unable_to_write(local_target: &str) -> OperationError {
    OperationError::new(format!("Unable to write to local directory {}", local_target))
}

fn unable_to_list(directory: &str) -> OperationError {
    OperationError::new(format!("Unable to list files in directory {}", directory))
}

fn unable_to_print_working_directory() -> OperationError {
    OperationError::new("Unable to print the working directory")
}

fn upload_may_not_have_completed() -> OperationError {
    OperationError::new("Upload may not have completed.")
}
