// Blog Feed Server - posts, groups and follow feeds over SQLite

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_feed::{api::create_router, app_state::AppState, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_feed=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let addr = config.server_address();

    // Initialize application state
    let app_state = AppState::new(config).await?;

    let app = create_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("Blog feed server listening on http://{}", listener.local_addr()?);
    info!("  GET  /                          - Latest posts");
    info!("  GET  /group/{{slug}}              - Group feed");
    info!("  GET  /profile/{{username}}        - Profile feed");
    info!("  GET  /posts/{{id}}                - Post detail");
    info!("  POST /create                    - Publish a post");
    info!("  GET  /follow                    - Following feed");

    axum::serve(listener, app).await?;

    Ok(())
}
