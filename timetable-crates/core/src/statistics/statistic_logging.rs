//! Responsible for behaviour related to logging statistics with a specific pre-fix and closing
//! lines.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::stdout;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::RwLock;

use convert_case::Case;
use convert_case::Casing;

/// The options for statistic logging containing the statistic prefix, the (optional) line which is
/// printed after the statistics, and the (optional) casing of the statistics.
pub struct StatisticOptions {
    /// What is printed before a statistic, statistics are printed in the form
    /// `{PREFIX} {NAME}={VALUE}`
    statistic_prefix: String,
    /// A closing line which is printed after all of the statistics have been printed
    after_statistics: Option<String>,
    /// The casing of the name of the statistic
    statistics_casing: Option<Case>,
    /// The writer to which the statistics are written
    statistics_writer: Box<dyn Write + Send + Sync>,
}

impl StatisticOptions {
    /// Options which write `{prefix} {name}={value}` lines to stdout.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            statistic_prefix: prefix.into(),
            after_statistics: None,
            statistics_casing: None,
            statistics_writer: Box::new(stdout()),
        }
    }

    pub fn with_after_statistics(mut self, after: impl Into<String>) -> Self {
        self.after_statistics = Some(after.into());
        self
    }

    pub fn with_casing(mut self, casing: Case) -> Self {
        self.statistics_casing = Some(casing);
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn Write + Send + Sync>) -> Self {
        self.statistics_writer = writer;
        self
    }
}

impl Debug for StatisticOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticOptions")
            .field("statistic_prefix", &self.statistic_prefix)
            .field("after_statistics", &self.after_statistics)
            .field("statistics_casing", &self.statistics_casing)
            .field("statistics_writer", &"<Writer>")
            .finish()
    }
}

static STATISTIC_OPTIONS: OnceLock<RwLock<StatisticOptions>> = OnceLock::new();

/// Configures the logging of the statistics.
///
/// Only the first configuration takes effect; statistics are only written once this function has
/// been called.
pub fn configure_statistic_logging(options: StatisticOptions) {
    let _ = STATISTIC_OPTIONS.get_or_init(|| RwLock::from(options));
}

/// Logs the provided statistic with name `name` and value `value` in the format
/// `STATISTIC_PREFIX NAME=VALUE`.
pub fn log_statistic(name: impl Display, value: impl Display) {
    if let Some(statistic_options_lock) = STATISTIC_OPTIONS.get() {
        if let Ok(mut statistic_options) = statistic_options_lock.write() {
            let name = match &statistic_options.statistics_casing {
                Some(casing) => name.to_string().to_case(*casing),
                None => name.to_string(),
            };
            let prefix = statistic_options.statistic_prefix.clone();
            let _ = writeln!(
                statistic_options.statistics_writer,
                "{prefix} {name}={value}"
            );
        }
    }
}

/// Logs the closing line of a block of statistics, if one has been configured.
pub fn log_statistic_postfix() {
    if let Some(statistic_options_lock) = STATISTIC_OPTIONS.get() {
        if let Ok(mut statistic_options) = statistic_options_lock.write() {
            if let Some(post_fix) = statistic_options.after_statistics.clone() {
                let _ = writeln!(statistic_options.statistics_writer, "{post_fix}");
            }
        }
    }
}

/// Returns whether or not statistics should be logged by determining whether the
/// [`StatisticOptions`] have been configured.
pub fn should_log_statistics() -> bool {
    STATISTIC_OPTIONS.get().is_some()
}
