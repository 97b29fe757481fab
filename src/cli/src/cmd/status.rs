use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use colored::Colorize;

use librestoredb::api;
use librestoredb::error::RestoreError;
use librestoredb::view::large_upload::progress_percent;

use crate::cmd::RunCmd;
use crate::helpers;

pub const NAME: &str = "status";
pub struct StatusCmd;

#[async_trait]
impl RunCmd for StatusCmd {
    fn name(&self) -> &str {
        NAME
    }

    fn args(&self) -> Command {
        helpers::with_server_args(
            Command::new(NAME)
                .about("Show what the server holds for an upload session.")
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
        let config = helpers::api_config(args)?;
        let client = api::client::new_for_config(&config)?;

        let status =
            match api::client::large_uploads::status(&client, &config.host, upload_id).await {
                Ok(status) => status,
                Err(err) if err.is_session_not_found() => {
                    println!("{}", format!("Upload {upload_id} is unknown to {}", config.host).yellow());
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

        println!("Upload   {}", upload_id.bold());
        if let Some(file_name) = &status.file_name {
            println!("File     {file_name}");
        }
        if let Some(state) = &status.status {
            println!("Status   {state}");
        }
        let received = status
            .received_chunks
            .as_ref()
            .map(|chunks| chunks.count())
            .unwrap_or(0);
        match status.total_chunks {
            Some(total) => println!("Chunks   {received}/{total}"),
            None => println!("Chunks   {received}"),
        }
        if let Some(progress) = status.progress {
            println!("Progress {}%", progress_percent(progress));
        }
        if let Some(expires_at) = &status.expires_at {
            println!("Expires  {expires_at}");
        }
        Ok(())
    }
}
