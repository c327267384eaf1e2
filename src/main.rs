use anyhow::Context;

use policy_survey::config::ServerConfig;
use policy_survey::data::loader::load_file;
use policy_survey::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("reading configuration")?;

    // Load before binding: a bad dataset must never start serving.
    let dataset = load_file(&config.data_path).with_context(|| {
        format!(
            "loading survey data from {} (generate one with `cargo run --bin generate_sample`)",
            config.data_path.display()
        )
    })?;
    log::info!(
        "loaded {} respondents from {}",
        dataset.len(),
        config.data_path.display()
    );

    let app = policy_survey::app(AppState::new(dataset, config.rate_decimals));

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    log::info!("policy survey API listening on {}", config.addr);

    axum::serve(listener, app).await.context("serving HTTP")?;
    Ok(())
}
