use super::{unable_to_connect, unexpected_disconnect_error, Client, Credentials};
use crate::backend::{HostKeyPolicy, SftpChannel, Ssh2Transport, SshSession, SshTransport};
use crate::connection::{Connection, ConnectionFactory};
use crate::error::ConnectionError;
use log::{info, warn};
use std::io;

pub const DEFAULT_PORT: u16 = 22;

pub struct SftpClient<T = Ssh2Transport> {
    host: String,
    port: u16,
    credentials: Credentials,
    host_key_policy: HostKeyPolicy,
    transport: T,
    factory: ConnectionFactory,
    session: Option<Box<dyn SshSession>>,
    channel: Option<Box<dyn SftpChannel>>,
}

impl SftpClient {
    pub fn new() -> Self {
        Self::with_transport(Ssh2Transport)
    }
}

impl Default for SftpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SshTransport> SftpClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: Credentials::default(),
            host_key_policy: HostKeyPolicy::default(),
            transport,
            factory: ConnectionFactory::default(),
            session: None,
            channel: None,
        }
    }

    #[must_use]
    pub fn with_factory(mut self, factory: ConnectionFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn set_host_key_policy(&mut self, policy: HostKeyPolicy) {
        self.host_key_policy = policy;
    }

    fn open_session(&self) -> io::Result<(Box<dyn SshSession>, Box<dyn SftpChannel>)> {
        let mut session = self.transport.create_session(
            self.credentials.username(),
            &self.host,
            self.port,
        )?;
        session.set_host_key_policy(self.host_key_policy);
        session.set_password(self.credentials.password());
        session.connect()?;

        let channel = session
            .open_sftp_channel()
            .and_then(|mut channel| channel.connect().map(|()| channel));
        match channel {
            Ok(channel) => Ok((session, channel)),
            Err(err) => {
                if let Err(close_err) = session.disconnect() {
                    warn!("closing session after failed channel open: {}", close_err);
                }
                Err(err)
            }
        }
    }
}

impl<T: SshTransport> Client for SftpClient<T> {
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
        if self.session.is_some() {
            warn!("reconnecting to {}:{} over a live session", self.host, self.port);
            self.disconnect()?;
        }
        if self.host_key_policy == HostKeyPolicy::AcceptAny {
            warn!("host key verification is disabled for {}", self.host);
        }

        let (session, channel) = self
            .open_session()
            .map_err(|err| unable_to_connect(&self.host, self.port).with_source(err))?;
        self.session = Some(session);

        info!(
            "connected to sftp://{}@{}:{}",
            self.credentials.username(),
            self.host,
            self.port
        );
        let channel = self.channel.insert(channel);
        Ok(Box::new(self.factory.create_sftp_connection(&mut **channel)))
    }

    fn disconnect(&mut self) -> Result<(), ConnectionError> {
        let (Some(mut session), Some(mut channel)) = (self.session.take(), self.channel.take())
        else {
            return Err(ConnectionError::new(
                "The underlying connection was never initially made.",
            ));
        };

        let channel_closed = channel.disconnect();
        let session_closed = session.disconnect();
        channel_closed
            .and(session_closed)
            .map_err(|err| unexpected_disconnect_error().with_source(err))?;

        info!("disconnected from {}:{}", self.host, self.port);
        Ok(())
    }
}
