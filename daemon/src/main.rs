//! VisaRun daemon: entry point for running the game server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use visarun_crypto::sign_init_data;
use visarun_node::{init_logging, NodeConfig, VisaRunNode};
use visarun_rpc::RpcServer;
use visarun_types::Timestamp;

/// How long to wait for the bot loop after the HTTP API has stopped.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "visarun-daemon", about = "VisaRun Bingo game server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the HTTP API and the bot.
    Run(RunArgs),

    /// Print the effective configuration as TOML (bot token omitted).
    PrintConfig(RunArgs),

    /// Produce signed init data for calling the API from a terminal.
    SignInitData {
        #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
        bot_token: String,

        #[arg(long)]
        user_id: i64,

        #[arg(long, default_value = "Dev")]
        first_name: String,
    },
}

#[derive(clap::Args, Default)]
struct RunArgs {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VISARUN_CONFIG")]
    config: Option<PathBuf>,

    /// Bot token from @BotFather.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Bot username used in referral links.
    #[arg(long, env = "BOT_USERNAME")]
    bot_username: Option<String>,

    /// URL the bot's button opens.
    #[arg(long, env = "WEBAPP_URL")]
    webapp_url: Option<String>,

    /// Channel checked by the subscription task.
    #[arg(long, env = "CHANNEL_ID")]
    channel_id: Option<String>,

    /// HTTP API bind address.
    #[arg(long, env = "VISARUN_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Run the HTTP API without the bot.
    #[arg(long, env = "VISARUN_DISABLE_BOT")]
    disable_bot: bool,

    /// Receive bot updates on `POST /bot` instead of long polling.
    #[arg(
        long,
        env = "USE_WEBHOOK",
        action = clap::ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    use_webhook: bool,

    /// Public origin Telegram delivers webhook updates to.
    #[arg(long, env = "WEBHOOK_DOMAIN")]
    webhook_domain: Option<String>,

    /// Maximum init-data age in seconds (0 disables the check).
    #[arg(long, env = "VISARUN_AUTH_MAX_AGE")]
    auth_max_age_secs: Option<u64>,

    /// Timeout for external task checks, in seconds.
    #[arg(long, env = "VISARUN_CHECK_TIMEOUT")]
    check_timeout_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VISARUN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VISARUN_LOG_LEVEL")]
    log_level: Option<String>,
}

impl RunArgs {
    /// Layer flags and env vars over the config file (or the defaults).
    fn resolve(self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => NodeConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(self, base: NodeConfig) -> NodeConfig {
        NodeConfig {
            bot_token: self.bot_token.unwrap_or(base.bot_token),
            bot_username: self.bot_username.or(base.bot_username),
            webapp_url: self.webapp_url.unwrap_or(base.webapp_url),
            channel_id: self.channel_id.or(base.channel_id),
            listen_addr: self.listen_addr.unwrap_or(base.listen_addr),
            port: self.port.unwrap_or(base.port),
            enable_bot: base.enable_bot && !self.disable_bot,
            use_webhook: base.use_webhook || self.use_webhook,
            webhook_domain: self.webhook_domain.or(base.webhook_domain),
            auth_max_age_secs: self.auth_max_age_secs.unwrap_or(base.auth_max_age_secs),
            check_timeout_secs: self.check_timeout_secs.unwrap_or(base.check_timeout_secs),
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
            ..base
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args.resolve()?).await,
        Command::PrintConfig(args) => {
            let config = NodeConfig {
                bot_token: String::new(),
                ..args.resolve()?
            };
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::SignInitData {
            bot_token,
            user_id,
            first_name,
        } => {
            let user = serde_json::json!({ "id": user_id, "first_name": first_name }).to_string();
            let auth_date = Timestamp::now().as_secs().to_string();
            println!(
                "{}",
                sign_init_data(&bot_token, &[("user", &user), ("auth_date", &auth_date)])
            );
            Ok(())
        }
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.parsed_log_format()?, &config.log_level);

    tracing::info!(
        addr = %config.bind_addr(),
        bot = config.enable_bot,
        webhook = config.use_webhook,
        webapp_url = %config.webapp_url,
        "starting VisaRun daemon"
    );

    let node = VisaRunNode::new(config)?;
    let shutdown = node.shutdown_controller();

    let mut rpc = RpcServer::new(node.config().bind_addr(), node.service());
    if let Some(bot) = node.webhook_bot() {
        rpc = rpc.with_webhook(bot);
    }
    let rpc_shutdown = shutdown.subscribe();
    let mut rpc_handle = tokio::spawn(async move { rpc.start(rpc_shutdown).await });

    if let Err(e) = node.register_webhook().await {
        tracing::error!(error = %e, "webhook registration failed, stopping");
        shutdown.shutdown();
        rpc_handle.await.context("HTTP API task panicked")??;
        return Err(e.into());
    }
    let bot_handle = node.start_bot();

    let early_exit = tokio::select! {
        _ = shutdown.wait_for_signal() => None,
        result = &mut rpc_handle => Some(result),
    };
    let rpc_result = match early_exit {
        Some(result) => {
            tracing::error!("HTTP API exited, stopping");
            shutdown.shutdown();
            result
        }
        None => rpc_handle.await,
    };

    if let Some(bot) = bot_handle {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, bot).await.is_err() {
            tracing::warn!("bot poller did not stop in time");
        }
    }

    rpc_result.context("HTTP API task panicked")??;
    tracing::info!("VisaRun daemon exited cleanly");
    Ok(())
}
