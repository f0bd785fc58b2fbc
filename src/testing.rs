//! Recording fakes for the protocol seams. Every fake writes the calls it
//! receives into a shared [`CallLog`] so tests can assert on call order
//! across handles and local streams at once.

use crate::backend::{
    FtpEntry, FtpHandle, HostKeyPolicy, SftpChannel, SftpEntry, SshSession, SshTransport,
};
use crate::client::RemoteFile;
use crate::error::OperationError;
use crate::stream::{FileStreamProvider, InputStream, OutputStream};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.borrow_mut().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.count(call) > 0
    }

    /// Panics unless `expected` all occur, in this relative order.
    pub fn assert_in_order(&self, expected: &[&str]) {
        let calls = self.calls();
        let mut from = 0;
        for want in expected {
            match calls[from..].iter().position(|c| c == want) {
                Some(offset) => from += offset + 1,
                None => panic!("expected {:?} after call #{} in {:#?}", want, from, calls),
            }
        }
    }
}

/// Replays values in order; the last one repeats forever.
#[derive(Clone, Debug)]
pub struct Script<T: Clone>(VecDeque<T>);

impl<T: Clone> Script<T> {
    pub fn always(value: T) -> Self {
        Self(VecDeque::from(vec![value]))
    }

    pub fn sequence(values: Vec<T>) -> Self {
        assert!(!values.is_empty());
        Self(VecDeque::from(values))
    }

    pub fn next(&mut self) -> T {
        if self.0.len() > 1 {
            self.0.pop_front().unwrap()
        } else {
            self.0[0].clone()
        }
    }
}

/// How the fake server answers a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Positive,
    Negative,
    Broken,
}

impl Reply {
    fn answer(self) -> io::Result<bool> {
        match self {
            Reply::Positive => Ok(true),
            Reply::Negative => Ok(false),
            Reply::Broken => Err(broken()),
        }
    }
}

pub fn broken() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "connection reset")
}

pub struct FakeFtpHandle {
    pub log: CallLog,
    pub connect_error: Option<io::ErrorKind>,
    pub reply_code: u32,
    pub login: Reply,
    pub binary: Reply,
    pub cwd: Script<Reply>,
    pub pwd: Script<String>,
    pub pwd_fails: bool,
    pub entries: Vec<FtpEntry>,
    pub list_fails: bool,
    pub retrieve: Reply,
    pub remote_content: Vec<u8>,
    pub store: Reply,
    pub stored: Vec<u8>,
    pub connected: bool,
    pub disconnect_fails: bool,
}

impl FakeFtpHandle {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            connect_error: None,
            reply_code: 220,
            login: Reply::Positive,
            binary: Reply::Positive,
            cwd: Script::always(Reply::Positive),
            pwd: Script::always("this/is/a/directory".to_string()),
            pwd_fails: false,
            entries: Vec::new(),
            list_fails: false,
            retrieve: Reply::Positive,
            remote_content: Vec::new(),
            store: Reply::Positive,
            stored: Vec::new(),
            connected: false,
            disconnect_fails: false,
        }
    }
}

impl FtpHandle for FakeFtpHandle {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.log.record(format!("connect {}:{}", host, port));
        if let Some(kind) = self.connect_error {
            return Err(io::Error::new(kind, "connect failed"));
        }
        self.connected = true;
        Ok(())
    }

    fn reply_code(&self) -> u32 {
        self.log.record("reply_code");
        self.reply_code
    }

    fn enter_local_passive_mode(&mut self) {
        self.log.record("passive");
    }

    fn login(&mut self, username: &str, password: &str) -> io::Result<bool> {
        self.log.record(format!("login {} {}", username, password));
        self.login.answer()
    }

    fn set_control_keep_alive_timeout(&mut self, timeout: Duration) {
        self.log.record(format!("keepalive {}", timeout.as_secs()));
    }

    fn set_binary_file_type(&mut self) -> io::Result<bool> {
        self.log.record("binary");
        self.binary.answer()
    }

    fn change_working_directory(&mut self, path: &str) -> io::Result<bool> {
        self.log.record(format!("cwd {}", path));
        self.cwd.next().answer()
    }

    fn print_working_directory(&mut self) -> io::Result<String> {
        self.log.record("pwd");
        if self.pwd_fails {
            return Err(broken());
        }
        Ok(self.pwd.next())
    }

    fn list_files(&mut self, path: &str) -> io::Result<Vec<FtpEntry>> {
        self.log.record(format!("list {}", path));
        if self.list_fails {
            return Err(broken());
        }
        Ok(self.entries.clone())
    }

    fn retrieve_file(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<bool> {
        self.log.record(format!("retrieve {}", remote));
        if self.retrieve == Reply::Positive {
            local.write_all(&self.remote_content)?;
        }
        self.retrieve.answer()
    }

    fn store_file(&mut self, remote: &str, local: &mut dyn Read) -> io::Result<bool> {
        self.log.record(format!("store {}", remote));
        if self.store == Reply::Positive {
            local.read_to_end(&mut self.stored)?;
        }
        self.store.answer()
    }

    fn is_connected(&self) -> bool {
        self.log.record("is_connected");
        self.connected
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.log.record("disconnect");
        if self.disconnect_fails {
            return Err(broken());
        }
        self.connected = false;
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeSftpChannel {
    pub log: CallLog,
    pub connect_fails: bool,
    pub cd: Script<Option<io::ErrorKind>>,
    pub pwd: Script<String>,
    pub pwd_fails: bool,
    pub entries: Vec<SftpEntry>,
    pub ls_fails: bool,
    pub get_fails: bool,
    pub remote_content: Vec<u8>,
    pub put_fails: bool,
    pub stored: Rc<RefCell<Vec<u8>>>,
    pub disconnect_fails: bool,
}

impl FakeSftpChannel {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            connect_fails: false,
            cd: Script::always(None),
            pwd: Script::always("this/is/the/pwd".to_string()),
            pwd_fails: false,
            entries: Vec::new(),
            ls_fails: false,
            get_fails: false,
            remote_content: Vec::new(),
            put_fails: false,
            stored: Rc::default(),
            disconnect_fails: false,
        }
    }
}

impl SftpChannel for FakeSftpChannel {
    fn connect(&mut self) -> io::Result<()> {
        self.log.record("channel_connect");
        if self.connect_fails {
            return Err(broken());
        }
        Ok(())
    }

    fn cd(&mut self, path: &str) -> io::Result<()> {
        self.log.record(format!("cd {}", path));
        match self.cd.next() {
            None => Ok(()),
            Some(kind) => Err(io::Error::new(kind, "cd failed")),
        }
    }

    fn pwd(&mut self) -> io::Result<String> {
        self.log.record("pwd");
        if self.pwd_fails {
            return Err(broken());
        }
        Ok(self.pwd.next())
    }

    fn ls(&mut self, path: &str) -> io::Result<Vec<SftpEntry>> {
        self.log.record(format!("ls {}", path));
        if self.ls_fails {
            return Err(broken());
        }
        Ok(self.entries.clone())
    }

    fn get(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<()> {
        self.log.record(format!("get {}", remote));
        if self.get_fails {
            return Err(broken());
        }
        local.write_all(&self.remote_content)
    }

    fn put(&mut self, local: &mut dyn Read, remote: &str) -> io::Result<()> {
        self.log.record(format!("put {}", remote));
        if self.put_fails {
            return Err(broken());
        }
        local.read_to_end(&mut self.stored.borrow_mut())?;
        Ok(())
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.log.record("channel_disconnect");
        if self.disconnect_fails {
            return Err(broken());
        }
        Ok(())
    }
}

pub struct FakeSshTransport {
    pub log: CallLog,
    pub create_fails: bool,
    pub session_connect_fails: bool,
    pub open_channel_fails: bool,
    pub session_disconnect_fails: bool,
    pub channel: FakeSftpChannel,
}

impl FakeSshTransport {
    pub fn new(log: CallLog) -> Self {
        Self {
            channel: FakeSftpChannel::new(log.clone()),
            log,
            create_fails: false,
            session_connect_fails: false,
            open_channel_fails: false,
            session_disconnect_fails: false,
        }
    }
}

impl SshTransport for FakeSshTransport {
    fn create_session(
        &self,
        username: &str,
        host: &str,
        port: u16,
    ) -> io::Result<Box<dyn SshSession>> {
        self.log
            .record(format!("session {}@{}:{}", username, host, port));
        if self.create_fails {
            return Err(broken());
        }
        Ok(Box::new(FakeSshSession {
            log: self.log.clone(),
            connect_fails: self.session_connect_fails,
            open_channel_fails: self.open_channel_fails,
            disconnect_fails: self.session_disconnect_fails,
            channel: self.channel.clone(),
        }))
    }
}

struct FakeSshSession {
    log: CallLog,
    connect_fails: bool,
    open_channel_fails: bool,
    disconnect_fails: bool,
    channel: FakeSftpChannel,
}

impl SshSession for FakeSshSession {
    fn set_host_key_policy(&mut self, policy: HostKeyPolicy) {
        self.log.record(format!("host_key_policy {:?}", policy));
    }

    fn set_password(&mut self, password: &str) {
        self.log.record(format!("password {}", password));
    }

    fn connect(&mut self) -> io::Result<()> {
        self.log.record("session_connect");
        if self.connect_fails {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }
        Ok(())
    }

    fn open_sftp_channel(&mut self) -> io::Result<Box<dyn SftpChannel>> {
        self.log.record("open_channel sftp");
        if self.open_channel_fails {
            return Err(broken());
        }
        Ok(Box::new(self.channel.clone()))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        self.log.record("session_disconnect");
        if self.disconnect_fails {
            return Err(broken());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeStreams {
    pub log: CallLog,
    pub input_missing: bool,
    pub input_content: Vec<u8>,
    pub input_close_fails: bool,
    pub output_fails: bool,
    pub output_write_fails: bool,
    pub output_close_fails: bool,
    pub written: Rc<RefCell<Vec<u8>>>,
}

impl FakeStreams {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            input_missing: false,
            input_content: b"local bytes".to_vec(),
            input_close_fails: false,
            output_fails: false,
            output_write_fails: false,
            output_close_fails: false,
            written: Rc::default(),
        }
    }
}

impl FileStreamProvider for FakeStreams {
    fn create_input_stream(&self, path: &str) -> io::Result<Box<dyn InputStream>> {
        self.log.record(format!("open_input {}", path));
        if self.input_missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        }
        Ok(Box::new(FakeInput {
            data: Cursor::new(self.input_content.clone()),
            log: self.log.clone(),
            close_fails: self.input_close_fails,
        }))
    }

    fn create_output_stream(&self, path: &str) -> io::Result<Box<dyn OutputStream>> {
        self.log.record(format!("open_output {}", path));
        if self.output_fails {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        Ok(Box::new(FakeOutput {
            written: Rc::clone(&self.written),
            log: self.log.clone(),
            write_fails: self.output_write_fails,
            close_fails: self.output_close_fails,
        }))
    }
}

struct FakeInput {
    data: Cursor<Vec<u8>>,
    log: CallLog,
    close_fails: bool,
}

impl Read for FakeInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl InputStream for FakeInput {
    fn close(&mut self) -> io::Result<()> {
        self.log.record("close_input");
        if self.close_fails {
            return Err(broken());
        }
        Ok(())
    }
}

struct FakeOutput {
    written: Rc<RefCell<Vec<u8>>>,
    log: CallLog,
    write_fails: bool,
    close_fails: bool,
}

impl Write for FakeOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.write_fails {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.written.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputStream for FakeOutput {
    fn close(&mut self) -> io::Result<()> {
        self.log.record("close_output");
        if self.close_fails {
            return Err(broken());
        }
        Ok(())
    }
}

mockall::mock! {
    pub Connection {}

    impl crate::connection::Connection for Connection {
        fn change_directory(&mut self, path: &str) -> Result<(), OperationError>;
        fn list_directory(&mut self, directory: &str) -> Result<Vec<RemoteFile>, OperationError>;
        fn download(&mut self, remote_path: &str, local_directory: &str) -> Result<(), OperationError>;
        fn upload(&mut self, local_path: &str, remote_directory: &str) -> Result<(), OperationError>;
        fn print_working_directory(&mut self) -> Result<String, OperationError>;
        fn list_files(&mut self) -> Result<Vec<RemoteFile>, OperationError>;
        fn list_files_in(&mut self, relative_path: &str) -> Result<Vec<RemoteFile>, OperationError>;
    }
}

/// Listing entry with a fixed timestamp `minutes` past a reference hour.
pub fn remote_file(name: &str, size: u64, parent: &str, minutes: i64, is_dir: bool) -> RemoteFile {
    let base = chrono::DateTime::<chrono::Utc>::from_timestamp(1_394_525_265, 0).unwrap_or_default();
    RemoteFile::new(name, size, parent, base + chrono::Duration::minutes(minutes), is_dir)
}
