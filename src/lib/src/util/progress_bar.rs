use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

pub enum ProgressBarType {
    Percent,
    Counter,
    None,
}

pub fn restoredb_progress_bar(size: u64, progress_type: ProgressBarType) -> Arc<ProgressBar> {
    let bar = Arc::new(ProgressBar::new(size));
    let style = ProgressStyle::default_bar()
        .template(progress_type_to_template(progress_type).as_str())
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    bar.set_style(style);
    bar
}

fn progress_type_to_template(progress_type: ProgressBarType) -> String {
    match progress_type {
        ProgressBarType::Percent => {
            "{spinner:.green} [{elapsed_precise}] [{bar:50}] {pos}% {msg}".to_string()
        }
        ProgressBarType::Counter => {
            "{spinner:.green} [{elapsed_precise}] [{bar:50}] {pos}/{len} {msg}".to_string()
        }
        ProgressBarType::None => "{spinner:.green} [{elapsed_precise}] {msg}".to_string(),
    }
}
