use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8091;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub assets_root: PathBuf,
    /// Public URL prefix under which `assets_root` is served.
    pub assets_base_url: String,
    pub upload_tmp_dir: PathBuf,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    /// CDN or other public base for stored objects; overrides the derived S3 URL.
    pub s3_public_url: Option<String>,
    pub ffprobe_path: PathBuf,
    pub probe_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Video hosting upload API")]
pub struct Args {
    /// Host to bind to (overrides VIDHOST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDHOST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides VIDHOST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory holding locally served assets (overrides VIDHOST_ASSETS_ROOT)
    #[arg(long)]
    pub assets_root: Option<PathBuf>,

    /// Public URL prefix for local assets (overrides VIDHOST_ASSETS_BASE_URL)
    #[arg(long)]
    pub assets_base_url: Option<String>,

    /// Directory for spooled video uploads (overrides VIDHOST_UPLOAD_TMP_DIR)
    #[arg(long)]
    pub upload_tmp_dir: Option<PathBuf>,

    /// Target bucket for uploaded videos (overrides VIDHOST_S3_BUCKET)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// Bucket region (overrides VIDHOST_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom endpoint for S3-compatible providers (overrides VIDHOST_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Public base URL for stored videos (overrides VIDHOST_S3_PUBLIC_URL)
    #[arg(long)]
    pub s3_public_url: Option<String>,

    /// ffprobe binary (overrides VIDHOST_FFPROBE)
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Seconds before a probe is killed (overrides VIDHOST_PROBE_TIMEOUT_SECS)
    #[arg(long)]
    pub probe_timeout_secs: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Merge parsed flags with an environment lookup. Flags win over env,
    /// env wins over defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<(Self, bool)> {
        let port = match args.port {
            Some(port) => port,
            None => match lookup("VIDHOST_PORT") {
                Some(value) => value
                    .parse::<u16>()
                    .with_context(|| format!("parsing VIDHOST_PORT value `{}`", value))?,
                None => DEFAULT_PORT,
            },
        };

        let probe_timeout_secs = match args.probe_timeout_secs {
            Some(secs) => secs,
            None => match lookup("VIDHOST_PROBE_TIMEOUT_SECS") {
                Some(value) => value.parse::<u64>().with_context(|| {
                    format!("parsing VIDHOST_PROBE_TIMEOUT_SECS value `{}`", value)
                })?,
                None => DEFAULT_PROBE_TIMEOUT_SECS,
            },
        };
        if probe_timeout_secs == 0 {
            bail!("probe timeout must be at least one second");
        }

        let jwt_secret = lookup("VIDHOST_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() {
            bail!("VIDHOST_JWT_SECRET must be set");
        }

        let s3_bucket = args
            .s3_bucket
            .or_else(|| lookup("VIDHOST_S3_BUCKET"))
            .unwrap_or_default();
        if s3_bucket.is_empty() {
            bail!("an S3 bucket is required (--s3-bucket or VIDHOST_S3_BUCKET)");
        }

        let cfg = Self {
            host: args
                .host
                .or_else(|| lookup("VIDHOST_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database_url: args
                .database_url
                .or_else(|| lookup("VIDHOST_DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/vidhost.db".into()),
            jwt_secret,
            assets_root: args
                .assets_root
                .or_else(|| lookup("VIDHOST_ASSETS_ROOT").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("./assets")),
            assets_base_url: args
                .assets_base_url
                .or_else(|| lookup("VIDHOST_ASSETS_BASE_URL"))
                .unwrap_or_else(|| format!("http://localhost:{}/assets", port)),
            upload_tmp_dir: args
                .upload_tmp_dir
                .or_else(|| lookup("VIDHOST_UPLOAD_TMP_DIR").map(PathBuf::from))
                .unwrap_or_else(env::temp_dir),
            s3_bucket,
            s3_region: args
                .s3_region
                .or_else(|| lookup("VIDHOST_S3_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            s3_endpoint: args.s3_endpoint.or_else(|| lookup("VIDHOST_S3_ENDPOINT")),
            s3_public_url: args.s3_public_url.or_else(|| lookup("VIDHOST_S3_PUBLIC_URL")),
            ffprobe_path: args
                .ffprobe
                .or_else(|| lookup("VIDHOST_FFPROBE").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            probe_timeout: Duration::from_secs(probe_timeout_secs),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("assets_root", &self.assets_root)
            .field("assets_base_url", &self.assets_base_url)
            .field("upload_tmp_dir", &self.upload_tmp_dir)
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("s3_public_url", &self.s3_public_url)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}
