use super::{not_connected, HostKeyPolicy, SftpChannel, SftpEntry, SshSession, SshTransport};
use directories::BaseDirs;
use log::debug;
use ssh2::{CheckResult, ErrorCode, KnownHostFileKind, Session, Sftp};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

// libssh2 SFTP status codes
const FX_NO_SUCH_FILE: i32 = 2;
const FX_NO_SUCH_PATH: i32 = 10;

/// [`SshTransport`] backed by libssh2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssh2Transport;

impl SshTransport for Ssh2Transport {
    fn create_session(
        &self,
        username: &str,
        host: &str,
        port: u16,
    ) -> io::Result<Box<dyn SshSession>> {
        Ok(Box::new(Ssh2Session {
            username: username.to_string(),
            host: host.to_string(),
            port,
            password: String::new(),
            policy: HostKeyPolicy::default(),
            session: None,
        }))
    }
}

struct Ssh2Session {
    username: String,
    host: String,
    port: u16,
    password: String,
    policy: HostKeyPolicy,
    session: Option<Session>,
}

impl SshSession for Ssh2Session {
    fn set_host_key_policy(&mut self, policy: HostKeyPolicy) {
        self.policy = policy;
    }

    fn set_password(&mut self, password: &str) {
        self.password = password.to_string();
    }

    fn connect(&mut self) -> io::Result<()> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;

        if self.policy == HostKeyPolicy::KnownHosts {
            verify_host_key(&session, &self.host, self.port)?;
        }

        session.userauth_password(&self.username, &self.password)?;
        if !session.authenticated() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "password authentication rejected",
            ));
        }

        self.session = Some(session);
        Ok(())
    }

    fn open_sftp_channel(&mut self) -> io::Result<Box<dyn SftpChannel>> {
        let session = self.session.as_ref().ok_or_else(not_connected)?.clone();
        Ok(Box::new(Ssh2Channel {
            session,
            sftp: None,
            cwd: String::new(),
        }))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        if let Some(session) = self.session.take() {
            session.disconnect(None, "closing session", None)?;
        }
        Ok(())
    }
}

fn verify_host_key(session: &Session, host: &str, port: u16) -> io::Result<()> {
    let (key, _) = session.host_key().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, "server did not offer a host key")
    })?;
    let known_hosts_file = BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;

    let mut known_hosts = session.known_hosts()?;
    known_hosts.read_file(&known_hosts_file, KnownHostFileKind::OpenSSH)?;

    match known_hosts.check_port(host, port, key) {
        CheckResult::Match => Ok(()),
        CheckResult::NotFound => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("host key for {} is not in {}", host, known_hosts_file.display()),
        )),
        CheckResult::Mismatch => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("host key for {} does not match known_hosts", host),
        )),
        CheckResult::Failure => Err(io::Error::new(
            io::ErrorKind::Other,
            "unable to check host key",
        )),
    }
}

/// SFTP itself is stateless, so the working directory lives here.
struct Ssh2Channel {
    session: Session,
    sftp: Option<Sftp>,
    cwd: String,
}

impl Ssh2Channel {
    fn sftp(&self) -> io::Result<&Sftp> {
        self.sftp.as_ref().ok_or_else(not_connected)
    }
}

impl SftpChannel for Ssh2Channel {
    fn connect(&mut self) -> io::Result<()> {
        let sftp = self.session.sftp()?;
        let home = sftp.realpath(Path::new(".")).map_err(sftp_error)?;
        self.cwd = home.to_string_lossy().into_owned();
        self.sftp = Some(sftp);
        Ok(())
    }

    fn cd(&mut self, path: &str) -> io::Result<()> {
        let target = resolve(&self.cwd, path);
        let sftp = self.sftp()?;
        let real = sftp.realpath(target.as_path()).map_err(sftp_error)?;
        let stat = sftp.stat(real.as_path()).map_err(sftp_error)?;
        if !stat.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", real.display()),
            ));
        }
        self.cwd = real.to_string_lossy().into_owned();
        debug!("sftp working directory is now {}", self.cwd);
        Ok(())
    }

    fn pwd(&mut self) -> io::Result<String> {
        self.sftp()?;
        Ok(self.cwd.clone())
    }

    fn ls(&mut self, path: &str) -> io::Result<Vec<SftpEntry>> {
        let target = resolve(&self.cwd, path);
        let entries = self.sftp()?.readdir(target.as_path()).map_err(sftp_error)?;
        Ok(entries
            .into_iter()
            .map(|(path, stat)| SftpEntry {
                filename: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size: stat.size.unwrap_or(0),
                mtime: stat.mtime.unwrap_or(0),
                is_dir: stat.is_dir(),
            })
            .collect())
    }

    fn get(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<()> {
        let target = resolve(&self.cwd, remote);
        let mut file = self.sftp()?.open(target.as_path()).map_err(sftp_error)?;
        io::copy(&mut file, local)?;
        Ok(())
    }

    fn put(&mut self, local: &mut dyn Read, remote: &str) -> io::Result<()> {
        let target = resolve(&self.cwd, remote);
        let mut file = self.sftp()?.create(target.as_path()).map_err(sftp_error)?;
        write_remote(local, &mut file)
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.sftp.take();
        Ok(())
    }
}

/// Remote file being written. Closing reports whether the server accepted
/// the last of the data.
trait RemoteSink: Write {
    fn finish(&mut self) -> io::Result<()>;
}

impl RemoteSink for ssh2::File {
    fn finish(&mut self) -> io::Result<()> {
        self.close().map_err(sftp_error)
    }
}

fn write_remote(local: &mut dyn Read, file: &mut impl RemoteSink) -> io::Result<()> {
    let copied = io::copy(local, file);
    let closed = file.finish();
    let bytes = copied?;
    closed?;
    debug!("wrote {} bytes", bytes);
    Ok(())
}

fn resolve(cwd: &str, path: &str) -> PathBuf {
    if path.starts_with('/') || cwd.is_empty() {
        PathBuf::from(path)
    } else {
        Path::new(cwd).join(path)
    }
}

fn sftp_error(err: ssh2::Error) -> io::Error {
    match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE | FX_NO_SUCH_PATH) => {
            io::Error::new(io::ErrorKind::NotFound, err)
        }
        _ => err.into(),
    }
}
