use clap::Parser;
use moderated_relay::utils::{logger, validation::Validate};
use moderated_relay::{
    app_router, AppState, CliConfig, GenerateEngine, LogFormat, OpenRouterClient, RelayConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 與原本服務相同，啟動時讀取 .env
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // 初始化日誌
    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }

    tracing::info!("🚀 Starting moderated-relay");
    if dotenv_loaded {
        tracing::debug!("Loaded environment from .env");
    }

    // 載入配置
    let mut config = match RelayConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let denylist = config.denylist()?;
    let client = OpenRouterClient::new(&config)?;
    display_config_summary(&config, &denylist, &client);

    let engine = GenerateEngine::new(client, denylist)
        .with_system_prompt(config.moderation.system_prompt.clone())
        .with_messages(config.reply_messages());
    let app = app_router(AppState::new(engine));

    let bind_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("✅ Server running at http://{}", listener.local_addr()?);
    tracing::info!("  POST /generate — moderated completion");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

fn display_config_summary(config: &RelayConfig, denylist: &moderated_relay::Denylist, client: &OpenRouterClient) {
    tracing::info!("📋 Configuration summary:");
    tracing::info!("  Upstream: {}", config.upstream.endpoint);
    tracing::info!("  Model: {}", client.model());
    tracing::info!("  API key: set");
    match config.upstream.timeout_seconds {
        Some(secs) => tracing::info!("  Request timeout: {}s", secs),
        None => tracing::info!("  Request timeout: client default"),
    }
    tracing::info!(
        "  Denylist: {} keywords, placeholder {:?}",
        denylist.keywords().len(),
        denylist.placeholder()
    );
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
