use clap;
use librestoredb::error::RestoreError;

use async_trait::async_trait;

pub mod abort;
pub use abort::AbortCmd;

pub mod config;
pub use config::ConfigCmd;

pub mod pending;
pub use pending::PendingCmd;

pub mod status;
pub use status::StatusCmd;

pub mod upload;
pub use upload::UploadCmd;

#[async_trait]
pub trait RunCmd {
    fn name(&self) -> &str;
    fn args(&self) -> clap::Command;
    async fn run(&self, args: &clap::ArgMatches) -> Result<(), RestoreError>;
}
