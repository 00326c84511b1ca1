use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

/// How stored object references are turned into URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UrlMode {
    /// Persist a permanent `https://` URL (public-read bucket or CDN).
    Static,
    /// Persist `<bucket>,<key>` and hand out a short-lived presigned URL on every read.
    Signed,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub cdn_host: Option<String>,
    pub url_mode: UrlMode,
    pub signed_url_expiry_secs: u64,
    pub max_video_bytes: usize,
    pub max_thumbnail_bytes: usize,
    pub temp_dir: PathBuf,
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Video upload and processing API")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDEO_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Secret used to validate bearer tokens (overrides VIDEO_STORE_JWT_SECRET)
    #[arg(long)]
    pub jwt_secret: Option<String>,

    /// Destination bucket (overrides VIDEO_STORE_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides VIDEO_STORE_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom endpoint for S3-compatible stores (overrides VIDEO_STORE_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// CDN host fronting the bucket, used for static URLs (overrides VIDEO_STORE_CDN_HOST)
    #[arg(long)]
    pub cdn_host: Option<String>,

    /// URL resolution mode (overrides VIDEO_STORE_URL_MODE)
    #[arg(long, value_enum)]
    pub url_mode: Option<UrlMode>,

    /// Lifetime of presigned URLs in seconds (overrides VIDEO_STORE_SIGNED_URL_EXPIRY_SECS)
    #[arg(long)]
    pub signed_url_expiry_secs: Option<u64>,

    /// Maximum video request body size (overrides VIDEO_STORE_MAX_VIDEO_BYTES)
    #[arg(long)]
    pub max_video_bytes: Option<usize>,

    /// Maximum thumbnail request body size (overrides VIDEO_STORE_MAX_THUMBNAIL_BYTES)
    #[arg(long)]
    pub max_thumbnail_bytes: Option<usize>,

    /// Directory for staged and processed files (overrides VIDEO_STORE_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// ffprobe binary (overrides VIDEO_STORE_FFPROBE_PATH)
    #[arg(long)]
    pub ffprobe_path: Option<PathBuf>,

    /// ffmpeg binary (overrides VIDEO_STORE_FFMPEG_PATH)
    #[arg(long)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

/// Immutable settings the upload pipeline needs. Built once at startup and
/// handed to [`crate::services::upload_pipeline::UploadPipeline::new`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bucket: String,
    pub region: String,
    pub url_mode: UrlMode,
    pub cdn_host: Option<String>,
    pub signed_url_expiry: Duration,
    pub temp_dir: PathBuf,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VIDEO_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse("VIDEO_STORE_PORT", 8091)?;
        let env_db = env::var("VIDEO_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/video_store.db".into());
        let env_region = env::var("VIDEO_STORE_S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_url_mode = match env::var("VIDEO_STORE_URL_MODE") {
            Ok(value) => UrlMode::from_str(&value, true)
                .map_err(|err| anyhow::anyhow!(err))
                .with_context(|| format!("parsing VIDEO_STORE_URL_MODE value `{}`", value))?,
            Err(_) => UrlMode::Signed,
        };
        let env_expiry = env_parse("VIDEO_STORE_SIGNED_URL_EXPIRY_SECS", 5)?;
        let env_max_video = env_parse("VIDEO_STORE_MAX_VIDEO_BYTES", 1 << 30)?;
        let env_max_thumbnail = env_parse("VIDEO_STORE_MAX_THUMBNAIL_BYTES", 10 << 20)?;
        let env_temp_dir = env::var_os("VIDEO_STORE_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);
        let env_ffprobe = env::var_os("VIDEO_STORE_FFPROBE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| "ffprobe".into());
        let env_ffmpeg = env::var_os("VIDEO_STORE_FFMPEG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| "ffmpeg".into());

        // --- Required values ---
        let jwt_secret = args
            .jwt_secret
            .or_else(|| env::var("VIDEO_STORE_JWT_SECRET").ok())
            .context("VIDEO_STORE_JWT_SECRET (or --jwt-secret) must be set")?;
        let s3_bucket = args
            .s3_bucket
            .or_else(|| env::var("VIDEO_STORE_S3_BUCKET").ok())
            .context("VIDEO_STORE_S3_BUCKET (or --s3-bucket) must be set")?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            jwt_secret,
            s3_bucket,
            s3_region: args.s3_region.unwrap_or(env_region),
            s3_endpoint: args
                .s3_endpoint
                .or_else(|| env::var("VIDEO_STORE_S3_ENDPOINT").ok()),
            cdn_host: args.cdn_host.or_else(|| env::var("VIDEO_STORE_CDN_HOST").ok()),
            url_mode: args.url_mode.unwrap_or(env_url_mode),
            signed_url_expiry_secs: args.signed_url_expiry_secs.unwrap_or(env_expiry),
            max_video_bytes: args.max_video_bytes.unwrap_or(env_max_video),
            max_thumbnail_bytes: args.max_thumbnail_bytes.unwrap_or(env_max_thumbnail),
            temp_dir: args.temp_dir.unwrap_or(env_temp_dir),
            ffprobe_path: args.ffprobe_path.unwrap_or(env_ffprobe),
            ffmpeg_path: args.ffmpeg_path.unwrap_or(env_ffmpeg),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Snapshot of the values the upload pipeline reads.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            bucket: self.s3_bucket.clone(),
            region: self.s3_region.clone(),
            url_mode: self.url_mode,
            cdn_host: self.cdn_host.clone(),
            signed_url_expiry: Duration::from_secs(self.signed_url_expiry_secs),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

/// Read and parse an optional environment variable, falling back to `default`.
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
