use azure_showcase::utils::error::ErrorSeverity;
use azure_showcase::utils::{logger, validation::Validate};
use azure_showcase::{AppConfig, Application, CliArgs};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    logger::init_logger(args.verbose, args.json_logs);

    tracing::info!("Starting azure-showcase");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match AppConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be contacted");
        return Ok(());
    }

    let app = match Application::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(
                "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(e.severity()));
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    match app.run(!args.skip_demos, shutdown).await {
        Ok(outcomes) => {
            for outcome in outcomes.iter().filter(|o| !o.succeeded) {
                tracing::warn!(
                    "{} demo did not complete: {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("❌ Server failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(e.severity()));
        }
    }
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn display_config_summary(config: &AppConfig) {
    tracing::info!("📋 Configuration summary:");
    tracing::info!("   Server: {}:{}", config.server.host, config.server.port);
    let demos = config.enabled_demos();
    if demos.is_empty() {
        tracing::info!("   Demos: none");
    } else {
        tracing::info!("   Demos: {}", demos.join(", "));
    }
    tracing::info!(
        "   Auth: {}",
        match &config.auth {
            Some(auth) => format!("OIDC, role '{}' required", auth.required_role),
            None => "disabled".to_string(),
        }
    );
}
