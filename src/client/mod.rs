pub mod ftp;
pub mod sftp;

use crate::connection::Connection;
use crate::error::ConnectionError;
use chrono::{DateTime, Utc};
use std::fmt;

pub use crate::backend::HostKeyPolicy;
pub use ftp::FtpClient;
pub use sftp::SftpClient;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    name: String,
    path: String,
    size: u64,
    modified: DateTime<Utc>,
    is_dir: bool,
}

impl RemoteFile {
    /// Builds the entry for `name` as seen while listing `parent`. The full
    /// path is fixed here and never re-derived.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        parent: &str,
        modified: DateTime<Utc>,
        is_dir: bool,
    ) -> Self {
        let name = name.into();
        let path = format!("{}/{}", parent, name);
        Self {
            name,
            path,
            size,
            modified,
            is_dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A configurable client for one remote protocol.
///
/// The connection returned by [`Client::connect`] borrows the client, so it
/// has to be dropped before [`Client::disconnect`] can be called.
pub trait Client {
    fn set_host(&mut self, host: &str);
    fn set_port(&mut self, port: u16);
    fn set_credentials(&mut self, credentials: Credentials);

    fn connect(&mut self) -> Result<Box<dyn Connection + '_>, ConnectionError>;
    fn disconnect(&mut self) -> Result<(), ConnectionError>;
}

fn unable_to_connect(host: &str, port: u16) -> ConnectionError {
    ConnectionError::new(format!("Unable to connect to host {} on port {}", host, port))
}

fn unexpected_disconnect_error() -> ConnectionError {
    ConnectionError::new("There was an unexpected error while trying to disconnect.")
}
