use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use video_store::{
    config::AppConfig,
    db,
    routes::routes::{BodyLimits, routes},
    services::{
        object_store::S3ObjectStore, probe::FfprobeInspector, remux::FfmpegRemuxer,
        upload_pipeline::UploadPipeline, video_repository::SqliteVideoRepository,
    },
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        host = %cfg.host,
        port = cfg.port,
        bucket = %cfg.s3_bucket,
        region = %cfg.s3_region,
        url_mode = ?cfg.url_mode,
        temp_dir = %cfg.temp_dir.display(),
        "Starting video-store"
    );

    // --- Ensure temp directory exists ---
    if !cfg.temp_dir.exists() {
        fs::create_dir_all(&cfg.temp_dir)?;
        tracing::info!("Created temp directory at {}", cfg.temp_dir.display());
    }

    // --- Initialize SQLite ---
    let pool = db::connect(&cfg.database_url).await?;
    db::run_migrations(&pool).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    let db = Arc::new(pool);

    // --- Initialize services ---
    let videos = Arc::new(SqliteVideoRepository::new(db.clone()));
    let objects = S3ObjectStore::from_env(&cfg.s3_region, cfg.s3_endpoint.as_deref()).await;
    let pipeline = UploadPipeline::new(
        cfg.pipeline(),
        videos.clone(),
        Arc::new(FfprobeInspector::new(&cfg.ffprobe_path)),
        Arc::new(FfmpegRemuxer::new(&cfg.ffmpeg_path)),
        Arc::new(objects),
    );

    let state = AppState {
        db,
        videos,
        pipeline: Arc::new(pipeline),
        jwt_secret: Arc::from(cfg.jwt_secret.as_str()),
        tools: Arc::from(vec![cfg.ffprobe_path.clone(), cfg.ffmpeg_path.clone()]),
    };

    // --- Build router ---
    let app: Router = routes(BodyLimits {
        video_bytes: cfg.max_video_bytes,
        thumbnail_bytes: cfg.max_thumbnail_bytes,
    })
    .with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
