use super::{
    download_target, unable_to_list, unable_to_print_working_directory, unable_to_write,
    upload_may_not_have_completed, upload_target, Connection, LocalSink,
};
use crate::backend::SftpChannel;
use crate::client::RemoteFile;
use crate::error::OperationError;
use crate::stream::FileStreamProvider;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::io;
use std::rc::Rc;

pub struct SftpConnection<'a> {
    channel: &'a mut dyn SftpChannel,
    streams: Rc<dyn FileStreamProvider>,
}

impl<'a> SftpConnection<'a> {
    pub fn new(channel: &'a mut dyn SftpChannel, streams: Rc<dyn FileStreamProvider>) -> Self {
        Self { channel, streams }
    }
}

impl Connection for SftpConnection<'_> {
    fn change_directory(&mut self, path: &str) -> Result<(), OperationError> {
        debug!("cd {}", path);
        self.channel.cd(path).map_err(|err| {
            let message = if err.kind() == io::ErrorKind::NotFound {
                format!("Directory {} does not exist.", path)
            } else {
                "Remote server was unable to change directory.".to_string()
            };
            OperationError::new(message).with_source(err)
        })
    }

    fn list_directory(&mut self, directory: &str) -> Result<Vec<RemoteFile>, OperationError> {
        debug!("ls {}", directory);
        let entries = self
            .channel
            .ls(directory)
            .map_err(|err| unable_to_list(directory).with_source(err))?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                RemoteFile::new(
                    entry.filename,
                    entry.size,
                    directory,
                    from_unix_seconds(entry.mtime),
                    entry.is_dir,
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

        debug!("get {} -> {}", remote_path, local_target);
        let mut sink = LocalSink::new(&mut output);
        let transfer = self.channel.get(remote_path, &mut sink);
        let local_failed = sink.failed();
        let closed = output.close();

        transfer.map_err(|err| {
            if local_failed {
                unable_to_write(&local_target).with_source(err)
            } else {
                OperationError::new(format!("Unable to download file {}", remote_path))
                    .with_source(err)
            }
        })?;
        closed.map_err(|err| unable_to_write(&local_target).with_source(err))?;

        info!("downloaded {} to {}", remote_path, local_target);
        Ok(())
    }

    fn upload(&mut self, local_path: &str, remote_directory: &str) -> Result<(), OperationError> {
        let remote_target = upload_target(local_path, remote_directory);
        let mut input = self.streams.create_input_stream(local_path).map_err(|err| {
            OperationError::new(format!("Could not find file: {}", local_path)).with_source(err)
        })?;

        debug!("put {} -> {}", local_path, remote_target);
        let stored = self.channel.put(&mut input, &remote_target);
        let closed = input.close();

        stored.map_err(|err| OperationError::new("Upload failed to complete.").with_source(err))?;
        closed.map_err(|err| upload_may_not_have_completed().with_source(err))?;

        info!("uploaded {} to {}", local_path, remote_target);
        Ok(())
    }

    fn print_working_directory(&mut self) -> Result<String, OperationError> {
        self.channel
            .pwd()
            .map_err(|err| unable_to_print_working_directory().with_source(err))
    }
}

fn from_unix_seconds(seconds: u64) -> DateTime<Utc> {
    i64::try_from(seconds)
        .ok()
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or_default()
}
