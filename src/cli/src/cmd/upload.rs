use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytesize::ByteSize;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;
use tokio::task::JoinHandle;

use librestoredb::api::client::large_uploads::HttpTransport;
use librestoredb::constants::{METADATA_CLIENT_NAME, METADATA_NOTES, METADATA_TICKET_ID};
use librestoredb::error::RestoreError;
use librestoredb::model::{UploadMetadata, UploadSource, UploadStatus};
use librestoredb::opts::UploadOpts;
use librestoredb::storage::LocalResumeStore;
use librestoredb::uploader::ChunkedUploader;
use librestoredb::util;

use crate::cmd::RunCmd;
use crate::helpers;
use crate::reporter::ProgressReporter;

pub const NAME: &str = "upload";
pub struct UploadCmd;

#[async_trait]
impl RunCmd for UploadCmd {
    fn name(&self) -> &str {
        NAME
    }

    fn args(&self) -> Command {
        let command = Command::new(NAME)
            .about("Upload a backup file (.fbk, .gbk, .bt) in resumable chunks.")
            .arg(
                Arg::new("file")
                    .help("Backup file to upload")
                    .required(true)
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("resume")
                    .long("resume")
                    .short('r')
                    .help("Continue an interrupted upload of this file instead of starting over.")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("client-name")
                    .long("client-name")
                    .help("Client the backup belongs to.")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("ticket-id")
                    .long("ticket-id")
                    .help("Support ticket the restore was requested in.")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("notes")
                    .long("notes")
                    .help("Notes for the technician doing the restore.")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("meta")
                    .long("meta")
                    .short('m')
                    .value_name("KEY=VALUE")
                    .help("Extra metadata sent with the upload. Can be given more than once.")
                    .action(clap::ArgAction::Append),
            )
            .arg(
                Arg::new("chunk-size")
                    .long("chunk-size")
                    .help("Requested chunk size, for example '10MiB'. The server may pick another.")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("concurrency")
                    .long("concurrency")
                    .short('c')
                    .help("Chunks in flight at once.")
                    .value_parser(clap::value_parser!(usize))
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("abort-on-interrupt")
                    .long("abort-on-interrupt")
                    .help("Discard the upload on Ctrl-C instead of pausing it.")
                    .action(clap::ArgAction::SetTrue),
            );
        helpers::with_server_args(command)
    }

    async fn run(&self, args: &ArgMatches) -> Result<(), RestoreError> {
        let path = args
            .get_one::<String>("file")
            .map(PathBuf::from)
            .ok_or_else(|| RestoreError::basic_str("Must supply a file to upload"))?;
        util::fs::validate_backup_file(&path)?;

        let metadata = metadata_from_args(args)?;
        let opts = opts_from_args(args)?;
        let resume = args.get_flag("resume");
        let abort_on_interrupt = args.get_flag("abort-on-interrupt");

        let config = helpers::api_config(args)?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        let store = Arc::new(LocalResumeStore::default_location()?);
        let source = UploadSource::from_path(&path)?;
        println!(
            "Uploading {} ({}) to {}",
            source.file_name.bold(),
            ByteSize::b(source.file_size),
            transport.host()
        );
        let reporter = Arc::new(ProgressReporter::new(source.file_size));
        let uploader = Arc::new(ChunkedUploader::new(
            source, metadata, opts, transport, store, reporter,
        ));

        let restored = resume && uploader.restore()?;
        if resume && !restored {
            println!("No interrupted upload of this file, starting a new one");
        }

        let mut run = {
            let uploader = uploader.clone();
            tokio::spawn(async move {
                if restored {
                    uploader.resume().await
                } else {
                    uploader.start().await
                }
            })
        };

        let status = tokio::select! {
            result = &mut run => result??,
            _ = tokio::signal::ctrl_c() => {
                let interrupted = interrupt(&uploader, abort_on_interrupt).await;
                after_interrupt(run, interrupted).await?
            }
        };

        match status {
            UploadStatus::Paused => println!(
                "{}",
                format!(
                    "Paused upload {}, continue with `restoredb upload {} --resume`",
                    uploader.upload_id(),
                    path.display()
                )
                .yellow()
            ),
            UploadStatus::Aborted => println!("{}", "Upload aborted".red()),
            _ => log::debug!("upload ended as {status}"),
        }
        Ok(())
    }
}

/// Ctrl-C pauses a running upload so `--resume` can pick it up later.
/// Before the session exists there is nothing to keep, so it aborts.
async fn interrupt(uploader: &ChunkedUploader, abort: bool) -> Result<(), RestoreError> {
    match uploader.status() {
        Some(UploadStatus::Uploading) if !abort => uploader.pause(),
        Some(UploadStatus::Finalizing) => {
            println!("Interrupted while the server assembles the file, waiting for it to finish");
            Ok(())
        }
        Some(status) if status.is_terminal() => Ok(()),
        _ => uploader.abort().await,
    }
}

/// The upload task always runs to its end, even when stopping it failed
async fn after_interrupt(
    run: JoinHandle<Result<UploadStatus, RestoreError>>,
    interrupted: Result<(), RestoreError>,
) -> Result<UploadStatus, RestoreError> {
    if let Err(err) = interrupted {
        log::warn!("Could not stop the upload on interrupt: {err}");
    }
    run.await?
}

fn metadata_from_args(args: &ArgMatches) -> Result<UploadMetadata, RestoreError> {
    let mut metadata = match args.get_many::<String>("meta") {
        Some(pairs) => helpers::parse_metadata(pairs)?,
        None => UploadMetadata::new(),
    };
    for (arg, key) in [
        ("client-name", METADATA_CLIENT_NAME),
        ("ticket-id", METADATA_TICKET_ID),
        ("notes", METADATA_NOTES),
    ] {
        if let Some(value) = args.get_one::<String>(arg) {
            metadata.insert(key.to_string(), value.to_string());
        }
    }
    Ok(metadata)
}

fn opts_from_args(args: &ArgMatches) -> Result<UploadOpts, RestoreError> {
    let mut opts = UploadOpts::default();
    if let Some(chunk_size) = args.get_one::<String>("chunk-size") {
        let chunk_size: ByteSize = chunk_size.parse().map_err(|err| {
            RestoreError::basic_str(format!("Invalid chunk size '{chunk_size}': {err}"))
        })?;
        opts = opts.with_chunk_size(chunk_size.as_u64());
    }
    if let Some(concurrency) = args.get_one::<usize>("concurrency") {
        opts = opts.with_max_concurrent_uploads(*concurrency);
    }
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use clap::ArgMatches;

    use librestoredb::constants::{METADATA_CLIENT_NAME, METADATA_NOTES, METADATA_TICKET_ID};
    use librestoredb::error::RestoreError;
    use librestoredb::model::UploadStatus;

    use crate::cmd::upload::{after_interrupt, metadata_from_args, opts_from_args};
    use crate::cmd::{RunCmd, UploadCmd};

    fn upload_args(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["upload"];
        argv.extend_from_slice(args);
        UploadCmd.args().try_get_matches_from(argv).unwrap()
    }

    #[test]
    fn test_upload_cmd_metadata_uses_server_keys() {
        let args = upload_args(&[
            "nightly.fbk",
            "--client-name",
            "Padaria Central",
            "--ticket-id",
            "4512",
            "--notes",
            "restore before friday",
            "--meta",
            "env=prod",
        ]);
        let metadata = metadata_from_args(&args).unwrap();
        assert_eq!(metadata.get(METADATA_CLIENT_NAME).unwrap(), "Padaria Central");
        assert_eq!(metadata.get(METADATA_TICKET_ID).unwrap(), "4512");
        assert_eq!(metadata.get(METADATA_NOTES).unwrap(), "restore before friday");
        assert_eq!(metadata.get("env").unwrap(), "prod");
    }

    #[test]
    fn test_upload_cmd_tuning() {
        let args = upload_args(&["nightly.fbk", "--chunk-size", "10MiB", "-c", "5"]);
        let opts = opts_from_args(&args).unwrap();
        assert_eq!(opts.chunk_size, 10 * 1024 * 1024);
        assert_eq!(opts.max_concurrent_uploads, 5);

        let args = upload_args(&["nightly.fbk", "--chunk-size", "lots"]);
        assert!(opts_from_args(&args).is_err());
    }

    #[test]
    fn test_upload_cmd_flags_default_off() {
        let args = upload_args(&["nightly.fbk"]);
        assert!(!args.get_flag("resume"));
        assert!(!args.get_flag("abort-on-interrupt"));
        assert!(args.get_one::<String>("host").is_none());

        let args = upload_args(&["nightly.fbk", "--resume", "--abort-on-interrupt"]);
        assert!(args.get_flag("resume"));
        assert!(args.get_flag("abort-on-interrupt"));
    }

    #[tokio::test]
    async fn test_failed_interrupt_still_waits_for_upload() {
        let finished = Arc::new(AtomicBool::new(false));
        let run = {
            let finished = finished.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(UploadStatus::Paused)
            })
        };

        let interrupted = Err(RestoreError::invalid_state("Can only pause while uploading"));
        let status = after_interrupt(run, interrupted).await.unwrap();

        assert_eq!(status, UploadStatus::Paused);
        assert!(finished.load(Ordering::SeqCst));
    }
}
