use super::{unable_to_connect, unexpected_disconnect_error, Client, Credentials};
use crate::backend::{FtpHandle, SuppaFtpHandle};
use crate::connection::{Connection, ConnectionFactory};
use crate::error::ConnectionError;
use log::{debug, info, warn};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 21;
const KEEP_ALIVE: Duration = Duration::from_secs(300);

pub struct FtpClient<H = SuppaFtpHandle> {
    host: String,
    port: u16,
    credentials: Credentials,
    handle: H,
    factory: ConnectionFactory,
}

impl FtpClient {
    pub fn new() -> Self {
        Self::with_handle(SuppaFtpHandle::new())
    }
}

impl Default for FtpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: FtpHandle> FtpClient<H> {
    pub fn with_handle(handle: H) -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            handle,
            factory: ConnectionFactory::default(),
        }
    }

    #[must_use]
    pub fn with_factory(mut self, factory: ConnectionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Runs the handshake up to a logged-in binary session.
    fn handshake(&mut self) -> Result<(), ConnectionError> {
        let (host, port) = (self.host.as_str(), self.port);

        self.handle
            .connect(host, port)
            .map_err(|err| unable_to_connect(host, port).with_source(err))?;

        let reply_code = self.handle.reply_code();
        if !(200..300).contains(&reply_code) {
            debug!("greeting from {}:{} was {}", host, port, reply_code);
            return Err(ConnectionError::new(format!(
                "The host {} on port {} returned a bad status code.",
                host, port
            )));
        }

        self.handle.enter_local_passive_mode();

        let username = self.credentials.username();
        let unable_to_login =
            || ConnectionError::new(format!("Unable to login for user {}", username));
        match self.handle.login(username, self.credentials.password()) {
            Ok(true) => {}
            Ok(false) => return Err(unable_to_login()),
            Err(err) => return Err(unable_to_login().with_source(err)),
        }

        self.handle.set_control_keep_alive_timeout(KEEP_ALIVE);

        let unable_to_set_binary = || {
            ConnectionError::new(format!("Unable to set binary transfer mode on host {}", host))
        };
        match self.handle.set_binary_file_type() {
            Ok(true) => Ok(()),
            Ok(false) => Err(unable_to_set_binary()),
            Err(err) => Err(unable_to_set_binary().with_source(err)),
        }
    }

    /// Drops a half-open control connection after a failed handshake.
    fn abandon(&mut self) {
        if self.handle.is_connected() {
            if let Err(err) = self.handle.disconnect() {
                warn!("closing {}:{} after failed connect: {}", self.host, self.port, err);
            }
        }
    }
}

impl<H: FtpHandle> Client for FtpClient<H> {
    fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
    }

    fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = credentials;
    }

    fn connect(&mut self) -> Result<Box<dyn Connection + '_>, ConnectionError> {
        if self.handle.is_connected() {
            warn!("reconnecting to {}:{} over a live session", self.host, self.port);
            self.disconnect()?;
        }

        if let Err(err) = self.handshake() {
            self.abandon();
            return Err(err);
        }

        info!(
            "connected to ftp://{}@{}:{}",
            self.credentials.username(),
            self.host,
            self.port
        );
        Ok(Box::new(self.factory.create_ftp_connection(&mut self.handle)))
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        if !self.handle.is_connected() {
            return Ok(());
        }
        self.handle
            .disconnect()
            .map_err(|err| unexpected_disconnect_error().with_source(err))?;
        info!("disconnected from {}:{}", self.host, self.port);
        Ok(())
    }
}
