mod reconstruct;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

/// Upload size limit; stereo pairs of full-resolution photographs fit well
/// within this.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    log::info!("🚀 Starting the server");
    log::info!("🔥 Listening on: http://0.0.0.0:3000");
    log::info!("🔧 Press Ctrl+C to stop the server");

    // build our application with the reconstruction routes
    let app = Router::new()
        .route("/", get(|| async { "Welcome to the stereo reconstruction service!" }))
        .route("/api/health", get(reconstruct::health))
        .route("/api/reconstruct", post(reconstruct::reconstruct))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // run our app with hyper, listening globally on port 3000
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    axum::serve(listener, app).await?;

    Ok(())
}
