#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod backend;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod stream;
pub mod transfer;
pub mod utils;

#[cfg(test)]
mod testing;

pub use client::{Client, Credentials, FtpClient, HostKeyPolicy, RemoteFile, SftpClient};
pub use connection::{Connection, ConnectionFactory};
pub use error::{ConnectionError, Error, OperationError, Result};
pub use stream::{FileStreamProvider, LocalFileStreams};
