use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};

use librestoredb::config::ApiConfig;
use librestoredb::error::RestoreError;

use crate::cmd::RunCmd;

pub const NAME: &str = "config";
pub struct ConfigCmd;

#[async_trait]
impl RunCmd for ConfigCmd {
    fn name(&self) -> &str {
        NAME
    }

    fn args(&self) -> Command {
        Command::new(NAME)
            .about("Sets the server configuration in ~/.config/restoredb/api_config.toml")
            .arg(
                Arg::new("host")
                    .long("host")
                    .help("Base URL of the RestoreDB server, for example 'https://restore.example.com'")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("api-key")
                    .long("api-key")
                    .help("API key sent with every request. Pass an empty string to remove it.")
                    .action(clap::ArgAction::Set),
            )
    }

    async fn run(&self, args: &ArgMatches) -> Result<(), RestoreError> {
        let path = ApiConfig::default_path()?;
        let mut config = if path.exists() {
            ApiConfig::from_path(&path)?
        } else {
            ApiConfig::default()
        };

        let host = args.get_one::<String>("host");
        let api_key = args.get_one::<String>("api-key");
        if host.is_none() && api_key.is_none() {
            println!("Config   {path:?}");
            println!("Host     {}", config.host);
            println!("API key  {}", mask_api_key(config.api_key.as_deref()));
            return Ok(());
        }

        if let Some(host) = host {
            config.set_host(host);
        }
        if let Some(api_key) = api_key {
            config.set_api_key(api_key);
        }
        config.save(&path)?;
        println!("Saved {path:?}");
        Ok(())
    }
}

fn mask_api_key(api_key: Option<&str>) -> String {
    match api_key {
        None => "(none)".to_string(),
        Some(key) if key.chars().count() <= 4 => "****".to_string(),
        Some(key) => {
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****{tail}")
        }
    }
}
