use std::sync::Arc;

use windowscape::config::{EngineConfig, RemoteConfig};
use windowscape::engine::JobEngine;
use windowscape::processors::generate_image::GenerateImageProcessor;
use windowscape::processors::recommend_music::RecommendMusicProcessor;
use windowscape::processors::remove_person::RemovePersonProcessor;
use windowscape::processors::scene_blend::SceneBlendProcessor;
use windowscape::processors::ProcessorRegistry;
use windowscape::remote::{MediaExchange, ModelGateway, VideoSearch};
use windowscape::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let engine_config = EngineConfig::from_env();
    let remote_config = RemoteConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Set AI_UPLOAD_URL, AI_CALLBACK_URL, AI_TOKEN,");
        eprintln!("      MODEL_GATEWAY_URL, MODEL_GATEWAY_KEY, VIDEO_SEARCH_KEY");
        std::process::exit(1);
    });

    let port: u16 = std::env::var("WINDOWSCAPE_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .unwrap_or(8000);

    eprintln!("🪟 Windowscape v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/v1", port);
    eprintln!("   Pool: {} workers\n", engine_config.pool_size);

    // One HTTP client shared by every collaborator.
    let client = reqwest::Client::new();
    let media = MediaExchange::new(client.clone(), remote_config.clone());
    let gateway = ModelGateway::new(client.clone(), remote_config.clone());
    let search = VideoSearch::new(client, remote_config);

    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::new(RemovePersonProcessor::new(
        media.clone(),
        gateway.clone(),
    )));
    registry.register(Arc::new(SceneBlendProcessor::new(
        media.clone(),
        gateway.clone(),
    )));
    registry.register(Arc::new(GenerateImageProcessor::new(
        media.clone(),
        gateway.clone(),
    )));
    registry.register(Arc::new(RecommendMusicProcessor::new(
        media, gateway, search,
    )));
    eprintln!("   Processors: {} registered", registry.count());

    let engine = JobEngine::new(engine_config, registry);
    engine.spawn_scheduler();

    let app = server::routes(Arc::clone(&engine));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Windowscape server started");
    axum::serve(listener, app).await?;

    Ok(())
}
