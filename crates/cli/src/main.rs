use std::time::Duration;

use {
    clap::Parser,
    tokio_util::sync::CancellationToken,
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use {
    bugseer_channels::{CONFIG_FILE_NAME, HistoryLimits, InvalidConfigPolicy, ResolverSettings},
    bugseer_slack::SlackAccountConfig,
};

#[derive(Parser)]
#[command(
    name = "bugseer",
    about = "Slack bot that reacts to CI failure reports according to a per-channel rules file"
)]
struct Cli {
    /// Bot token (xoxb-...).
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// App-level token (xapp-...) for the Socket Mode connection.
    #[arg(long, env = "SLACK_APP_TOKEN", hide_env_values = true)]
    app_token: String,

    /// Recognized configuration file name prefix.
    #[arg(long, env = "BUGSEER_CONFIG_FILE", default_value = CONFIG_FILE_NAME)]
    config_file: String,

    /// What happens to a previously valid configuration when a refreshed
    /// file fails validation: "replace" or "keep-last-good".
    #[arg(long, env = "BUGSEER_ON_INVALID", default_value_t = InvalidConfigPolicy::Replace)]
    on_invalid: InvalidConfigPolicy,

    /// Rules load timeout in seconds.
    #[arg(long, env = "BUGSEER_LOAD_TIMEOUT_SECS", default_value_t = 30)]
    load_timeout_secs: u64,

    /// History page size per request.
    #[arg(long, default_value_t = 20)]
    history_page_size: u32,

    /// Maximum history pages fetched per replay.
    #[arg(long, default_value_t = 200)]
    history_max_pages: u32,

    /// Timeout per history page request, in seconds.
    #[arg(long, default_value_t = 10)]
    history_page_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BUGSEER_LOG", default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

impl Cli {
    fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            file_prefix: self.config_file.clone(),
            invalid_policy: self.on_invalid,
            load_timeout: Duration::from_secs(self.load_timeout_secs),
            history: HistoryLimits {
                page_size: self.history_page_size,
                max_pages: self.history_max_pages,
                page_timeout: Duration::from_secs(self.history_page_timeout_secs),
            },
            ..Default::default()
        }
    }

    fn init_tracing(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        if self.json_logs {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    cli.init_tracing();

    let settings = cli.resolver_settings();
    let account = SlackAccountConfig::new(cli.bot_token.clone(), cli.app_token.clone());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_cancel.cancel();
        }
    });

    bugseer_slack::run(account, settings, cancel).await
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_resolver_settings() {
        let cli = Cli::try_parse_from([
            "bugseer",
            "--bot-token",
            "xoxb-1",
            "--app-token",
            "xapp-1",
        ])
        .unwrap();
        let settings = cli.resolver_settings();
        assert_eq!(settings.file_prefix, CONFIG_FILE_NAME);
        assert_eq!(settings.file_type, "yaml");
        assert_eq!(settings.invalid_policy, InvalidConfigPolicy::Replace);
        assert_eq!(settings.load_timeout, Duration::from_secs(30));
        assert_eq!(settings.history.page_size, 20);
        assert_eq!(settings.history.max_pages, 200);
    }

    #[test]
    fn invalid_policy_flag_parses() {
        let cli = Cli::try_parse_from([
            "bugseer",
            "--bot-token",
            "xoxb-1",
            "--app-token",
            "xapp-1",
            "--on-invalid",
            "keep-last-good",
        ])
        .unwrap();
        assert_eq!(
            cli.resolver_settings().invalid_policy,
            InvalidConfigPolicy::KeepLastGood
        );
    }
}
