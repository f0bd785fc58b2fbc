//! Seams over the protocol libraries.
//!
//! Clients and connections only ever talk to these traits; the adapters in
//! [`suppa`] and [`ssh`] bind them to `suppaftp` and `ssh2`.

pub mod ssh;
pub mod suppa;

use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime};

pub use ssh::Ssh2Transport;
pub use suppa::SuppaFtpHandle;

/// A raw FTP listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpEntry {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub is_directory: bool,
}

/// A raw SFTP listing entry. `mtime` is seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpEntry {
    pub filename: String,
    pub size: u64,
    pub mtime: u64,
    pub is_dir: bool,
}

/// An FTP control connection.
///
/// Methods returning `io::Result<bool>` report `Ok(false)` when the server
/// answered with a negative reply and `Err` when the exchange itself failed.
pub trait FtpHandle {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;
    /// Reply code of the greeting received by the last `connect`.
    fn reply_code(&self) -> u32;
    fn enter_local_passive_mode(&mut self);
    fn login(&mut self, username: &str, password: &str) -> io::Result<bool>;
    fn set_control_keep_alive_timeout(&mut self, timeout: Duration);
    fn set_binary_file_type(&mut self) -> io::Result<bool>;
    fn change_working_directory(&mut self, path: &str) -> io::Result<bool>;
    fn print_working_directory(&mut self) -> io::Result<String>;
    fn list_files(&mut self, path: &str) -> io::Result<Vec<FtpEntry>>;
    fn retrieve_file(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<bool>;
    fn store_file(&mut self, remote: &str, local: &mut dyn Read) -> io::Result<bool>;
    fn is_connected(&self) -> bool;
    fn disconnect(&mut self) -> io::Result<()>;
}

/// Host key handling for SSH sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Skip verification entirely.
    #[default]
    AcceptAny,
    /// Require the key to match the user's `known_hosts`.
    KnownHosts,
}

/// Creates SSH sessions.
pub trait SshTransport {
    fn create_session(
        &self,
        username: &str,
        host: &str,
        port: u16,
    ) -> io::Result<Box<dyn SshSession>>;
}

pub trait SshSession {
    fn set_host_key_policy(&mut self, policy: HostKeyPolicy);
    fn set_password(&mut self, password: &str);
    fn connect(&mut self) -> io::Result<()>;
    fn open_sftp_channel(&mut self) -> io::Result<Box<dyn SftpChannel>>;
    fn disconnect(&mut self) -> io::Result<()>;
}

/// An SFTP channel with a working directory.
///
/// `cd` on a missing directory fails with [`io::ErrorKind::NotFound`].
pub trait SftpChannel {
    fn connect(&mut self) -> io::Result<()>;
    fn cd(&mut self, path: &str) -> io::Result<()>;
    fn pwd(&mut self) -> io::Result<String>;
    fn ls(&mut self, path: &str) -> io::Result<Vec<SftpEntry>>;
    fn get(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<()>;
    fn put(&mut self, local: &mut dyn Read, remote: &str) -> io::Result<()>;
    fn disconnect(&mut self) -> io::Result<()>;
}

pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "not connected")
}
