use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt::Debug, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub pipeline: PipelineConfig,
}

/// Settings consumed by the import pipeline stages and their runners.
#[derive(Clone)]
pub struct PipelineConfig {
    pub bucket: String,
    pub intake_folder: String,
    pub parsed_folder: String,
    pub batch_size: usize,
    pub url_expiry_secs: u64,
    pub queue_name: String,
    pub topic_name: String,
    pub product_table: String,
    pub stock_table: String,
    pub signing_secret: String,
    pub public_base_url: String,
    pub visibility_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub trigger_max_attempts: u32,
    pub invocation_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: "import-bucket".into(),
            intake_folder: "uploaded".into(),
            parsed_folder: "parsed".into(),
            batch_size: 5,
            url_expiry_secs: 300,
            queue_name: "catalog-items-queue".into(),
            topic_name: "create-product-topic".into(),
            product_table: "products".into(),
            stock_table: "stocks".into(),
            signing_secret: "local-dev-secret".into(),
            public_base_url: "http://localhost:3000".into(),
            visibility_timeout_secs: 30,
            poll_interval_ms: 500,
            trigger_max_attempts: 3,
            invocation_timeout_secs: 30,
        }
    }
}

// The signing secret never reaches the logs.
impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("bucket", &self.bucket)
            .field("intake_folder", &self.intake_folder)
            .field("parsed_folder", &self.parsed_folder)
            .field("batch_size", &self.batch_size)
            .field("url_expiry_secs", &self.url_expiry_secs)
            .field("queue_name", &self.queue_name)
            .field("topic_name", &self.topic_name)
            .field("product_table", &self.product_table)
            .field("stock_table", &self.stock_table)
            .field("signing_secret", &"<redacted>")
            .field("public_base_url", &self.public_base_url)
            .field("visibility_timeout_secs", &self.visibility_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("trigger_max_attempts", &self.trigger_max_attempts)
            .field("invocation_timeout_secs", &self.invocation_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    pub fn intake_prefix(&self) -> String {
        format!("{}/", self.intake_folder)
    }

    pub fn parsed_prefix(&self) -> String {
        format!("{}/", self.parsed_folder)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.intake_folder.is_empty() || self.parsed_folder.is_empty() {
            bail!("intake and parsed folders must be non-empty");
        }
        let (intake, parsed) = (self.intake_prefix(), self.parsed_prefix());
        if intake.starts_with(&parsed) || parsed.starts_with(&intake) {
            bail!(
                "intake folder `{}` and parsed folder `{}` must not contain one another",
                self.intake_folder,
                self.parsed_folder
            );
        }
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.trigger_max_attempts == 0 {
            bail!("trigger max attempts must be at least 1");
        }
        Ok(())
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "CSV catalog import pipeline")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_IMPORT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_IMPORT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded objects are stored (overrides CATALOG_IMPORT_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides CATALOG_IMPORT_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Bucket receiving uploads (overrides CATALOG_IMPORT_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Folder new uploads land in (overrides CATALOG_IMPORT_INTAKE_FOLDER)
    #[arg(long)]
    pub intake_folder: Option<String>,

    /// Folder parsed files move to (overrides CATALOG_IMPORT_PARSED_FOLDER)
    #[arg(long)]
    pub parsed_folder: Option<String>,

    /// Maximum queue messages per consumer batch (overrides CATALOG_IMPORT_BATCH_SIZE)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Upload URL lifetime in seconds (overrides CATALOG_IMPORT_URL_EXPIRY_SECS)
    #[arg(long)]
    pub url_expiry_secs: Option<u64>,

    /// Work queue name (overrides CATALOG_IMPORT_QUEUE_NAME)
    #[arg(long)]
    pub queue_name: Option<String>,

    /// Notification topic (overrides CATALOG_IMPORT_TOPIC_NAME)
    #[arg(long)]
    pub topic_name: Option<String>,

    /// Product table name (overrides CATALOG_IMPORT_PRODUCT_TABLE)
    #[arg(long)]
    pub product_table: Option<String>,

    /// Stock table name (overrides CATALOG_IMPORT_STOCK_TABLE)
    #[arg(long)]
    pub stock_table: Option<String>,

    /// Base URL placed in signed upload URLs (overrides CATALOG_IMPORT_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();
        let defaults = PipelineConfig::default();

        // --- Environment fallback ---
        let env_host = env_or("CATALOG_IMPORT_HOST", "0.0.0.0");
        let env_port = env_parse("CATALOG_IMPORT_PORT", 3000u16)?;
        let env_storage = env_or("CATALOG_IMPORT_STORAGE_DIR", "./data/objects");
        let env_db = env_or(
            "CATALOG_IMPORT_DATABASE_URL",
            "sqlite://./data/meta/catalog_import.db",
        );

        let pipeline = PipelineConfig {
            bucket: args
                .bucket
                .unwrap_or_else(|| env_or("CATALOG_IMPORT_BUCKET", &defaults.bucket)),
            intake_folder: args.intake_folder.unwrap_or_else(|| {
                env_or("CATALOG_IMPORT_INTAKE_FOLDER", &defaults.intake_folder)
            }),
            parsed_folder: args.parsed_folder.unwrap_or_else(|| {
                env_or("CATALOG_IMPORT_PARSED_FOLDER", &defaults.parsed_folder)
            }),
            batch_size: match args.batch_size {
                Some(value) => value,
                None => env_parse("CATALOG_IMPORT_BATCH_SIZE", defaults.batch_size)?,
            },
            url_expiry_secs: match args.url_expiry_secs {
                Some(value) => value,
                None => env_parse("CATALOG_IMPORT_URL_EXPIRY_SECS", defaults.url_expiry_secs)?,
            },
            queue_name: args
                .queue_name
                .unwrap_or_else(|| env_or("CATALOG_IMPORT_QUEUE_NAME", &defaults.queue_name)),
            topic_name: args
                .topic_name
                .unwrap_or_else(|| env_or("CATALOG_IMPORT_TOPIC_NAME", &defaults.topic_name)),
            product_table: args.product_table.unwrap_or_else(|| {
                env_or("CATALOG_IMPORT_PRODUCT_TABLE", &defaults.product_table)
            }),
            stock_table: args
                .stock_table
                .unwrap_or_else(|| env_or("CATALOG_IMPORT_STOCK_TABLE", &defaults.stock_table)),
            signing_secret: env_or("CATALOG_IMPORT_SIGNING_SECRET", &defaults.signing_secret),
            public_base_url: args.public_base_url.unwrap_or_else(|| {
                env_or("CATALOG_IMPORT_PUBLIC_BASE_URL", &defaults.public_base_url)
            }),
            visibility_timeout_secs: env_parse(
                "CATALOG_IMPORT_VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout_secs,
            )?,
            poll_interval_ms: env_parse(
                "CATALOG_IMPORT_POLL_INTERVAL_MS",
                defaults.poll_interval_ms,
            )?,
            trigger_max_attempts: env_parse(
                "CATALOG_IMPORT_TRIGGER_MAX_ATTEMPTS",
                defaults.trigger_max_attempts,
            )?,
            invocation_timeout_secs: env_parse(
                "CATALOG_IMPORT_INVOCATION_TIMEOUT_SECS",
                defaults.invocation_timeout_secs,
            )?,
        };
        pipeline.validate()?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            pipeline,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
