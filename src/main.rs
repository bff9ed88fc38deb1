use std::sync::Arc;

use gatewarden::config::WardenConfig;
use gatewarden::platform::ConsoleGateway;
use gatewarden::warden::Warden;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; GATEWARDEN_LOG_DIR moves output into a daily file
    // so the console stays free for the dialogue.
    let _log_guard = match std::env::var("GATEWARDEN_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "gatewarden.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_target(false)
                .init();
            None
        }
    };

    let config = WardenConfig::from_env()?;

    eprintln!("🛡️ Gatewarden v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Pending role: {}", config.pending_role);
    eprintln!("   Summary channel: #{}", config.summary_channel);
    eprintln!(
        "   Steps: name form, {} questions, {} selection menus",
        config.questions.len(),
        config.catalogs.len()
    );
    eprintln!("   /verify to start, /join to simulate a member joining, /quit to exit.\n");

    let gateway = Arc::new(ConsoleGateway::new());
    let warden = Warden::new(config, gateway);
    warden.run().await?;

    Ok(())
}
