/// BlackIce - key-pair identity resolution server
use blackice::{
    config::{LogFormat, ServerConfig},
    context::AppContext,
    error::AccessResult,
    server,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AccessResult<()> {
    // Load configuration first so the log format is known
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let (pretty, json) = match config.logging.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "blackice=info,tower_http=info".into()),
        )
        .with(pretty)
        .with(json)
        .init();

    print_banner();

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ____  __           __   ____
   / __ )/ /___ ______/ /__/  _/_______
  / __  / / __ `/ ___/ //_// // ___/ _ \
 / /_/ / / /_/ / /__/ ,< _/ // /__/  __/
/_____/_/\__,_/\___/_/|_/___/\___/\___/

        Key-pair identity resolver v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
