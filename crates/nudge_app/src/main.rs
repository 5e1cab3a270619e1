use nudge_app::app::{run, AppConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let config = AppConfig::from_env();
    if let Err(err) = run(config).await {
        eprintln!("Failed to run nudge demo: {err:#}");
    }
}
