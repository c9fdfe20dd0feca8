use chunkvault_core::Config;

// Use mimalloc as the global allocator for better performance and lower
// fragmentation, especially when running on musl-based systems inside
// containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    chunkvault_api::telemetry::init_telemetry();

    // Initialize the application (stores, pipeline, routes)
    let (state, router) = chunkvault_api::setup::build_app(config.clone()).await?;

    // Start the server
    chunkvault_api::server::start_server(&config, router).await?;

    // Stop pulling ingestion messages once the server has drained
    state.consumers.shutdown().await;

    Ok(())
}
