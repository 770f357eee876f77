use clap::Parser;
use nr_core::{ArticleStorage, Result};
use nr_pipeline::{run_periodic, Pipeline};
use nr_publish::{PostQueue, TikTokUploader, UploadConfig, DEFAULT_CAPTION};
use nr_scrapers::{ManagerConfig, ScraperManager};
use nr_storage::{StorageConfig, StorageKind};
use nr_video::{FfmpegVideoRenderer, RenderConfig};
use nr_web::AppState;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    /// `90`, `45s`, `2m`, `1h15m30s`, `1d`. A bare number counts as seconds.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_value = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| format!("Duration too large: {}", s))?;
                current_number.clear();
                has_value = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            let secs = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(secs)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            has_value = true;
        }

        if !has_value {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

async fn check_storage(storage: &Arc<dyn ArticleStorage>, kind: StorageKind) -> Result<()> {
    let articles = storage.list_articles().await?;
    info!("🏦 Storage backend reachable (using {}, {} articles)", kind, articles.len());
    Ok(())
}

async fn check_storage_with_retry(
    storage: &Arc<dyn ArticleStorage>,
    kind: StorageKind,
    max_retries: u32,
    timeout: Duration,
) -> Result<()> {
    let mut retries = 0;
    let mut last_error = None;

    while retries < max_retries {
        match tokio::time::timeout(timeout, check_storage(storage, kind)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => last_error = Some(e),
            Err(_) => {
                last_error = Some(nr_core::Error::Storage(format!(
                    "Storage health check timed out after {}s",
                    timeout.as_secs()
                )))
            }
        }
        retries += 1;
        if retries < max_retries {
            info!("Storage health check failed, retrying {}/{}...", retries, max_retries);
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    Err(last_error.unwrap_or_else(|| nr_core::Error::Storage("Storage health check failed after all retries".to_string())))
}

#[derive(Parser, Debug)]
#[command(name = "newsreel", author, version, about = "Scrapes news, renders short videos and posts them", long_about = None)]
struct Cli {
    /// memory, sqlite or supabase. Defaults to supabase when SUPABASE_URL is set, sqlite otherwise
    #[arg(long, env = "NEWSREEL_STORAGE")]
    storage: Option<String>,
    #[arg(long, env = "NEWSREEL_SQLITE_PATH", default_value = "articles.db")]
    sqlite_path: PathBuf,
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    supabase_key: Option<String>,
    #[arg(long, env = "NEWSREEL_PARAPHRASER", default_value = "remote", help = "Paraphraser to use: remote (default), dummy")]
    paraphraser: String,
    #[arg(long, env = "NEWSREEL_PARAPHRASER_URL", default_value = nr_inference::DEFAULT_ENDPOINT)]
    paraphraser_url: String,
    #[arg(long, env = "NEWSREEL_ASSETS_DIR", default_value = "public")]
    assets_dir: PathBuf,
    #[arg(long, env = "NEWSREEL_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,
    #[arg(long, env = "NEWSREEL_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    #[arg(long, env = "NEWSREEL_WEBDRIVER_URL", default_value = "http://localhost:4444")]
    webdriver_url: String,
    #[arg(long, env = "NEWSREEL_SESSION_FILE", default_value = "Cookies/tiktok_cookies.json")]
    session_file: PathBuf,
    /// Space separated, e.g. "#news #nepal"
    #[arg(long, env = "NEWSREEL_HASHTAGS", default_value = "")]
    hashtags: String,
    #[arg(long, env = "NEWSREEL_HEADLESS")]
    headless: bool,
    #[command(flatten)]
    serve: ServeArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top level so a bare `newsreel` serves with the same defaults as `newsreel serve`.
#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 3003, global = true)]
    port: u16,
    /// Time between scheduled runs (e.g. 10m, 1h, 1h15m30s)
    #[arg(long, default_value = "10m", global = true)]
    interval: HumanDuration,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the scheduler and the HTTP trigger (default)
    Serve,
    /// Run the job once and exit
    Run,
    /// Open the login page and save the session once logged in
    CaptureSession {
        /// How long to wait for the manual login
        #[arg(long, default_value = "2m")]
        wait: HumanDuration,
    },
}

impl Cli {
    fn storage_config(&self) -> Result<StorageConfig> {
        let kind = match self.storage.as_deref() {
            Some(name) => name.parse()?,
            None if self.supabase_url.is_some() => StorageKind::Supabase,
            None => StorageKind::Sqlite,
        };
        Ok(StorageConfig {
            kind,
            sqlite_path: self.sqlite_path.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_key: self.supabase_key.clone(),
        })
    }

    fn paraphraser_config(&self) -> nr_inference::Config {
        nr_inference::Config {
            model_name: self.paraphraser.clone(),
            endpoint: self.paraphraser_url.clone(),
            ..nr_inference::Config::default()
        }
    }

    fn render_config(&self) -> RenderConfig {
        RenderConfig {
            assets_dir: self.assets_dir.clone(),
            output_dir: self.output_dir.clone(),
            ffmpeg: self.ffmpeg.clone(),
            ..RenderConfig::default()
        }
    }

    fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            webdriver_url: self.webdriver_url.clone(),
            session_file: self.session_file.clone(),
            caption: DEFAULT_CAPTION.to_string(),
            hashtags: self.hashtags.clone(),
            headless: self.headless,
        }
    }
}

async fn build_pipeline(cli: &Cli) -> anyhow::Result<Arc<Pipeline>> {
    let storage_config = cli.storage_config()?;
    let storage = nr_storage::create_storage(&storage_config).await?;
    info!("💾 Checking storage connection...");
    check_storage_with_retry(&storage, storage_config.kind, 3, Duration::from_secs(10)).await?;

    let paraphraser = nr_inference::create_model(Some(cli.paraphraser_config()))?;
    info!("🧠 Paraphraser initialized (using {})", paraphraser.name());

    let manager = ScraperManager::with_default_scrapers(storage.clone(), paraphraser, ManagerConfig::default());
    let names: Vec<&str> = manager.scrapers().iter().map(|s| s.source_metadata().name).collect();
    info!("🦗 Scrapers initialized: {}", names.join(", "));

    let renderer = Arc::new(FfmpegVideoRenderer::new(&cli.render_config())?);
    let uploader = Arc::new(TikTokUploader::new(cli.upload_config()));
    let queue = Arc::new(PostQueue::new(uploader, storage));

    Ok(Arc::new(Pipeline::new(manager, renderer, queue)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let mut cli = Cli::parse();

    match cli.command.take().unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let (port, interval) = (cli.serve.port, cli.serve.interval);
            let pipeline = build_pipeline(&cli).await?;

            info!("Initial news processing job starting, then every {}s", interval.0.as_secs());
            tokio::spawn(run_periodic(pipeline.clone(), interval.0));

            let app = nr_web::create_app(AppState { pipeline });
            nr_web::serve(app, port).await?;
        }
        Commands::Run => {
            let pipeline = build_pipeline(&cli).await?;
            let report = pipeline.run().await?;
            info!("{:?}", report);
            if !pipeline.queue().is_empty() {
                error!("{} videos could not be posted and are dropped on exit", pipeline.queue().len());
            }
        }
        Commands::CaptureSession { wait } => {
            let session = nr_publish::capture_session(&cli.upload_config(), wait.0).await?;
            info!("🍪 Captured {} cookies into {}", session.cookies.len(), cli.session_file.display());
        }
    }

    Ok(())
}
