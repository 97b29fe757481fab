use std::collections::HashMap;
use std::process::ExitCode;

use clap::Command;

pub mod cmd;
pub mod helpers;
pub mod reporter;

#[tokio::main]
async fn main() -> ExitCode {
    librestoredb::util::logging::init_logging();

    let cmds: Vec<Box<dyn cmd::RunCmd>> = vec![
        Box::new(cmd::AbortCmd),
        Box::new(cmd::ConfigCmd),
        Box::new(cmd::PendingCmd),
        Box::new(cmd::StatusCmd),
        Box::new(cmd::UploadCmd),
    ];

    let mut command = Command::new("restoredb")
        .version(librestoredb::constants::RESTOREDB_VERSION)
        .about("🗄️ Resumable uploads of database backups to a RestoreDB server")
        .subcommand_required(true)
        .arg_required_else_help(true);

    // Add all the commands to the command line
    let mut runners: HashMap<String, Box<dyn cmd::RunCmd>> = HashMap::new();
    for cmd in cmds {
        command = command.subcommand(cmd.args());
        runners.insert(cmd.name().to_string(), cmd);
    }

    let matches = command.get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return ExitCode::FAILURE;
    };
    let Some(runner) = runners.get(name) else {
        eprintln!("Unknown command `restoredb {name}`");
        return ExitCode::FAILURE;
    };

    match runner.run(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
