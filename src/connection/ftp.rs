use super::{
    download_target, unable_to_list, unable_to_print_working_directory, unable_to_write,
    upload_may_not_have_completed, upload_target, Connection, LocalSink,
};
use crate::backend::FtpHandle;
use crate::client::RemoteFile;
use crate::error::OperationError;
use crate::stream::FileStreamProvider;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::rc::Rc;

pub struct FtpConnection<'a, H: ?Sized> {
    handle: &'a mut H,
    streams: Rc<dyn FileStreamProvider>,
}

impl<'a, H: FtpHandle + ?Sized> FtpConnection<'a, H> {
    pub fn new(handle: &'a mut H, streams: Rc<dyn FileStreamProvider>) -> Self {
        Self { handle, streams }
    }
}

impl<H: FtpHandle + ?Sized> Connection for FtpConnection<'_, H> {
    fn change_directory(&mut self, path: &str) -> Result<(), OperationError> {
        debug!("CWD {}", path);
        match self.handle.change_working_directory(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(OperationError::new(format!(
                "The directory {} doesn't exist on the remote server.",
                path
            ))),
            Err(err) => Err(
                OperationError::new("Remote server was unable to change directory.")
                    .with_source(err),
            ),
        }
    }

    fn list_directory(&mut self, directory: &str) -> Result<Vec<RemoteFile>, OperationError> {
        debug!("LIST {}", directory);
        let entries = self
            .handle
            .list_files(directory)
            .map_err(|err| unable_to_list(directory).with_source(err))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                RemoteFile::new(
                    entry.name,
                    entry.size,
                    directory,
                    DateTime::<Utc>::from(entry.modified),
                    entry.is_directory,
                )
            })
            .collect())
    }

    fn download(&mut self, remote_path: &str, local_directory: &str) -> Result<(), OperationError> {
        let local_target = download_target(remote_path, local_directory);
        let mut output = self
            .streams
            .create_output_stream(&local_target)
            .map_err(|err| unable_to_write(&local_target).with_source(err))?;

        debug!("RETR {} -> {}", remote_path, local_target);
        let mut sink = LocalSink::new(&mut output);
        let transfer = self.handle.retrieve_file(remote_path, &mut sink);
        let local_failed = sink.failed();
        let closed = output.close();

        match transfer {
            Ok(true) => {}
            Ok(false) => {
                return Err(OperationError::new(
                    "Server returned failure while downloading.",
                ))
            }
            Err(err) if local_failed => {
                return Err(unable_to_write(&local_target).with_source(err))
            }
            Err(err) => {
                return Err(OperationError::new(format!(
                    "Unable to download file {}",
                    remote_path
                ))
                .with_source(err))
            }
        }
        closed.map_err(|err| unable_to_write(&local_target).with_source(err))?;

        info!("downloaded {} to {}", remote_path, local_target);
        Ok(())
    }

    fn upload(&mut self, local_path: &str, remote_directory: &str) -> Result<(), OperationError> {
        let remote_target = upload_target(local_path, remote_directory);
        let mut input = self.streams.create_input_stream(local_path).map_err(|err| {
            OperationError::new(format!("Could not find file: {}", local_path)).with_source(err)
        })?;

        debug!("STOR {} -> {}", local_path, remote_target);
        let stored = self.handle.store_file(&remote_target, &mut input);
        let closed = input.close();

        match stored {
            Ok(true) => {}
            Ok(false) => return Err(OperationError::new("Upload failed.")),
            Err(err) => return Err(upload_may_not_have_completed().with_source(err)),
        }
        closed.map_err(|err| upload_may_not_have_completed().with_source(err))?;

        info!("uploaded {} to {}", local_path, remote_target);
        Ok(())
    }

    fn print_working_directory(&mut self) -> Result<String, OperationError> {
        self.handle
            .print_working_directory()
            .map_err(|err| unable_to_print_working_directory().with_source(err))
    }
}
