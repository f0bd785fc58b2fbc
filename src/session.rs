use crate::client::{Client, Credentials, FtpClient, HostKeyPolicy, SftpClient};
use crate::config::{Config, Protocol};
use crate::connection::Connection;
use crate::error::ConnectionError;
use log::{debug, warn};

/// Builds the client matching `config.protocol`, already pointed at the
/// configured host with its credentials.
pub fn client_for(config: &Config) -> Box<dyn Client> {
    let mut client: Box<dyn Client> = match config.protocol {
        Protocol::Ftp => Box::new(FtpClient::new()),
        Protocol::Sftp => {
            let mut client = SftpClient::new();
            client.set_host_key_policy(if config.strict_host_key_checking {
                HostKeyPolicy::KnownHosts
            } else {
                HostKeyPolicy::AcceptAny
            });
            Box::new(client)
        }
    };
    client.set_host(&config.host);
    client.set_port(config.effective_port());
    client.set_credentials(Credentials::new(
        config.username.as_str(),
        config.password.clone().unwrap_or_default(),
    ));
    client
}

/// Scopes one connect/disconnect cycle around a unit of work.
pub struct Session {
    client: Box<dyn Client>,
}

impl Session {
    pub fn new(client: Box<dyn Client>) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(client_for(config))
    }

    /// Connects, hands the connection to `work`, then disconnects whatever
    /// `work` returned. A disconnect failure is reported only when `work`
    /// itself succeeded.
    pub fn run<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        E: From<ConnectionError>,
        F: FnOnce(&mut dyn Connection) -> Result<T, E>,
    {
        let mut connection = self.client.connect()?;
        let outcome = work(&mut *connection);
        drop(connection);

        debug!("closing session");
        match (outcome, self.client.disconnect()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!("disconnect after failed operation: {}", close_err);
                }
                Err(err)
            }
        }
    }
}
