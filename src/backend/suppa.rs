use super::{not_connected, FtpEntry, FtpHandle};
use log::{debug, warn};
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};
use suppaftp::list::File as ListLine;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};

const READY: u32 = 220;

/// [`FtpHandle`] backed by a blocking `suppaftp` stream.
pub struct SuppaFtpHandle {
    stream: Option<FtpStream>,
    reply_code: u32,
    passive: bool,
    keep_alive: Option<Duration>,
    last_command: Instant,
}

impl SuppaFtpHandle {
    pub fn new() -> Self {
        Self {
            stream: None,
            reply_code: 0,
            passive: false,
            keep_alive: None,
            last_command: Instant::now(),
        }
    }

    /// The live stream. Sends a NOOP first when the control channel sat
    /// idle for longer than the keep-alive interval.
    fn stream(&mut self) -> io::Result<&mut FtpStream> {
        let stream = self.stream.as_mut().ok_or_else(not_connected)?;
        if let Some(interval) = self.keep_alive {
            if self.last_command.elapsed() >= interval {
                debug!("control channel idle for {:?}, sending NOOP", interval);
                stream.noop().map_err(into_io)?;
            }
        }
        self.last_command = Instant::now();
        Ok(stream)
    }
}

impl Default for SuppaFtpHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl FtpHandle for SuppaFtpHandle {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        match FtpStream::connect((host, port)) {
            Ok(mut stream) => {
                if self.passive {
                    stream.set_mode(Mode::Passive);
                }
                self.stream = Some(stream);
                self.reply_code = READY;
                self.last_command = Instant::now();
                Ok(())
            }
            Err(FtpError::UnexpectedResponse(response)) => {
                self.stream = None;
                self.reply_code = response.status.code();
                Ok(())
            }
            Err(err) => Err(into_io(err)),
        }
    }

    fn reply_code(&self) -> u32 {
        self.reply_code
    }

    fn enter_local_passive_mode(&mut self) {
        self.passive = true;
        if let Some(stream) = self.stream.as_mut() {
            stream.set_mode(Mode::Passive);
        }
    }

    fn login(&mut self, username: &str, password: &str) -> io::Result<bool> {
        refused_as_false(self.stream()?.login(username, password))
    }

    fn set_control_keep_alive_timeout(&mut self, timeout: Duration) {
        self.keep_alive = Some(timeout);
    }

    fn set_binary_file_type(&mut self) -> io::Result<bool> {
        refused_as_false(self.stream()?.transfer_type(FileType::Binary))
    }

    fn change_working_directory(&mut self, path: &str) -> io::Result<bool> {
        refused_as_false(self.stream()?.cwd(path))
    }

    fn print_working_directory(&mut self) -> io::Result<String> {
        self.stream()?.pwd().map_err(into_io)
    }

    fn list_files(&mut self, path: &str) -> io::Result<Vec<FtpEntry>> {
        let lines = self.stream()?.list(Some(path)).map_err(into_io)?;
        Ok(lines.iter().filter_map(|line| parse_list_line(line)).collect())
    }

    fn retrieve_file(&mut self, remote: &str, local: &mut dyn Write) -> io::Result<bool> {
        let stream = self.stream()?;
        let mut data = match stream.retr_as_stream(remote) {
            Ok(data) => data,
            Err(FtpError::UnexpectedResponse(_)) => return Ok(false),
            Err(err) => return Err(into_io(err)),
        };
        if let Err(err) = io::copy(&mut data, local) {
            // The closing reply must still be read off the control channel.
            log_unfinished(remote, stream.finalize_retr_stream(data));
            return Err(err);
        }
        refused_as_false(stream.finalize_retr_stream(data))
    }

    fn store_file(&mut self, remote: &str, local: &mut dyn Read) -> io::Result<bool> {
        let stream = self.stream()?;
        let mut data = match stream.put_with_stream(remote) {
            Ok(data) => data,
            Err(FtpError::UnexpectedResponse(_)) => return Ok(false),
            Err(err) => return Err(into_io(err)),
        };
        match io::copy(local, &mut data) {
            Ok(bytes) => {
                debug!("stored {} bytes to {}", bytes, remote);
                refused_as_false(stream.finalize_put_stream(data))
            }
            Err(err) => {
                log_unfinished(remote, stream.finalize_put_stream(data));
                Err(err)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn disconnect(&mut self) -> io::Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.quit().map_err(into_io),
            None => Ok(()),
        }
    }
}

fn parse_list_line(line: &str) -> Option<FtpEntry> {
    let entry = match ListLine::from_str(line) {
        Ok(entry) => entry,
        Err(err) => {
            warn!("skipping unparsable listing line {:?}: {:?}", line, err);
            return None;
        }
    };
    if entry.name() == "." || entry.name() == ".." {
        return None;
    }
    Some(FtpEntry {
        name: entry.name().to_string(),
        size: entry.size() as u64,
        modified: entry.modified(),
        is_directory: entry.is_directory(),
    })
}

fn refused_as_false(result: Result<(), FtpError>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(FtpError::UnexpectedResponse(response)) => {
            debug!("server refused: {}", response.status.code());
            Ok(false)
        }
        Err(err) => Err(into_io(err)),
    }
}

fn log_unfinished(remote: &str, closed: Result<(), FtpError>) {
    match closed {
        Ok(()) => debug!("closed interrupted transfer of {}", remote),
        Err(err) => warn!("interrupted transfer of {} did not close cleanly: {}", remote, err),
    }
}

fn into_io(err: FtpError) -> io::Error {
    match err {
        FtpError::ConnectionError(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}
