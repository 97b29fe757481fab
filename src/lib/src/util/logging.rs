use env_logger::Env;
use std::io::Write;

/// Level used when neither `RUST_LOG` nor a CLI flag says otherwise
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub fn init_logging() {
    init_logging_with_filter(DEFAULT_LOG_FILTER)
}

/// `RUST_LOG` still wins over `default_filter` when it is set.
pub fn init_logging_with_filter(default_filter: &str) {
    let env = Env::default().default_filter_or(default_filter);
    let result = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let file_name = record
                .file()
                .and_then(|f| f.rsplit('/').next())
                .unwrap_or("unknown");

            writeln!(
                buf,
                "[{}] {} - {}/{}:{} {}",
                record.level(),
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                format_target(record.target()),
                file_name,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();

    if result.is_err() {
        // Tests initialize the logger over and over
        log::trace!("logger already initialized");
    }
}

/// `librestoredb::uploader::chunked_uploader` -> `uploader`
fn format_target(target: &str) -> String {
    let target = target.strip_prefix("librestoredb::").unwrap_or(target);
    target
        .rsplit_once("::")
        .map(|(path, _)| path.replace("::", "/"))
        .unwrap_or_else(|| target.replace("::", "/"))
}
