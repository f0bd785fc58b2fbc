use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Local byte source handed to an upload. `close` releases it and reports
/// any error the release surfaces.
pub trait InputStream: Read {
    fn close(&mut self) -> io::Result<()>;
}

/// Local byte sink handed to a download.
pub trait OutputStream: Write {
    fn close(&mut self) -> io::Result<()>;
}

/// Supplies local streams by path. Connections never touch the local
/// filesystem directly.
pub trait FileStreamProvider {
    /// Fails with [`io::ErrorKind::NotFound`] when `path` does not exist.
    fn create_input_stream(&self, path: &str) -> io::Result<Box<dyn InputStream>>;
    fn create_output_stream(&self, path: &str) -> io::Result<Box<dyn OutputStream>>;
}

/// Opens plain files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileStreams;

impl FileStreamProvider for LocalFileStreams {
    fn create_input_stream(&self, path: &str) -> io::Result<Box<dyn InputStream>> {
        let file = File::open(Path::new(path))?;
        Ok(Box::new(LocalInput {
            reader: Some(BufReader::new(file)),
        }))
    }

    fn create_output_stream(&self, path: &str) -> io::Result<Box<dyn OutputStream>> {
        let file = File::create(Path::new(path))?;
        Ok(Box::new(LocalOutput {
            writer: Some(BufWriter::new(file)),
        }))
    }
}

struct LocalInput {
    reader: Option<BufReader<File>>,
}

impl Read for LocalInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(closed()),
        }
    }
}

impl InputStream for LocalInput {
    fn close(&mut self) -> io::Result<()> {
        self.reader.take();
        Ok(())
    }
}

struct LocalOutput {
    writer: Option<BufWriter<File>>,
}

impl Write for LocalOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl OutputStream for LocalOutput {
    fn close(&mut self) -> io::Result<()> {
        match self.writer.take() {
            Some(writer) => {
                let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
                file.sync_all()
            }
            None => Ok(()),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "stream already closed")
}
