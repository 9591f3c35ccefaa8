use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable overriding the default filter, e.g. `FUNDME_LOG=debug`.
pub const LOG_ENV: &str = "FUNDME_LOG";

/// Filter applied to everything outside the `fundme` target.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        // Keep HTTP and LSM internals out of debug output
        "debug,hyper=info,hyper_util=info,reqwest=info,fjall=info,lsm_tree=info"
    } else {
        "warn"
    }
}

pub fn init_logging(verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let app_filter = Targets::new()
        .with_target("fundme", level_filter)
        .with_default(level_filter);
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_filter)
        .with(env_filter)
        .init();
}
