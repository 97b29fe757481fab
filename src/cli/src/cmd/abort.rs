use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;

use librestoredb::api;
use librestoredb::error::RestoreError;
use librestoredb::storage::{LocalResumeStore, ResumeStore};

use crate::cmd::RunCmd;
use crate::helpers;

pub const NAME: &str = "abort";
pub struct AbortCmd;

#[async_trait]
impl RunCmd for AbortCmd {
    fn name(&self) -> &str {
        NAME
    }

    fn args(&self) -> Command {
        helpers::with_server_args(
            Command::new(NAME)
                .about("Discard an upload session on the server and forget it locally.")
                .arg(
                    Arg::new("upload_id")
                        .help("Id the server assigned to the upload")
                        .required(true)
                        .action(clap::ArgAction::Set),
                ),
        )
    }

    async fn run(&self, args: &ArgMatches) -> Result<(), RestoreError> {
        let upload_id = args
            .get_one::<String>("upload_id")
            .ok_or_else(|| RestoreError::basic_str("Must supply an upload id"))?;

        // local state goes first, the server may be unreachable
        let store = LocalResumeStore::default_location()?;
        let mut forgotten = 0;
        for (key, record) in store.list()? {
            if &record.upload_id == upload_id {
                store.remove(&key)?;
                forgotten += 1;
            }
        }
        log::debug!("removed {forgotten} resume records for {upload_id}");

        let config = helpers::api_config(args)?;
        let client = api::client::new_for_config(&config)?;
        match api::client::large_uploads::abort(&client, &config.host, upload_id).await {
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| format!("Upload {upload_id} aborted"));
                println!("{}", message.green());
            }
            Err(err) => {
                eprintln!(
                    "{}",
                    format!("Could not notify {} of the abort: {err}", config.host).yellow()
                );
            }
        }
        Ok(())
    }
}
