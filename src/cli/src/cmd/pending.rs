use async_trait::async_trait;
use bytesize::ByteSize;
use clap::{ArgMatches, Command};
use colored::Colorize;

use librestoredb::error::RestoreError;
use librestoredb::storage::LocalResumeStore;
use librestoredb::uploader;
use librestoredb::util;

use crate::cmd::RunCmd;

pub const NAME: &str = "pending";
pub struct PendingCmd;

#[async_trait]
impl RunCmd for PendingCmd {
    fn name(&self) -> &str {
        NAME
    }

    fn args(&self) -> Command {
        Command::new(NAME).about("List interrupted uploads that can still be resumed.")
    }

    async fn run(&self, _args: &ArgMatches) -> Result<(), RestoreError> {
        let store = LocalResumeStore::default_location()?;
        let records = uploader::list_resumable(&store)?;
        if records.is_empty() {
            println!("No interrupted uploads in {:?}", store.root_path());
            return Ok(());
        }

        let now = util::now_millis();
        for (_, record) in records {
            let age = std::time::Duration::from_secs(record.age(now).as_secs());
            println!(
                "{}  {} ({})  {}/{} chunks  {} ago",
                record.upload_id.bold(),
                record.file_name,
                ByteSize::b(record.file_size),
                record.received_chunks.len(),
                record.total_chunks,
                humantime::format_duration(age)
            );
        }
        println!(
            "\nContinue one with `restoredb upload <file> --resume`, discard it with `restoredb abort <upload-id>`"
        );
        Ok(())
    }
}
