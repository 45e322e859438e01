use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use url::Url;
use xtractor_core::{
    ChainedImageSource, Extraction, Extractor, ExtractorConfig, FetchConfig, HttpPage, ImageSource,
    NetworkImageSource, OutputFormat, SessionCookies, SessionStore, SourceKind, StaticPage, fetch_file, fetch_stdin,
};

use crate::echo::{
    format_size, print_banner, print_extraction_details, print_field, print_images, print_info, print_step,
    print_success, print_warning, session_age_hours,
};
use crate::session_file::FileSessionStore;

mod echo;
mod session_file;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Save X posts, Medium stories and web articles as standalone HTML or Markdown
#[derive(Parser, Debug)]
#[command(name = "xtractor")]
#[command(author = "X-Tractor Contributors")]
#[command(version)]
#[command(about = "Save X posts, Medium stories and web articles", long_about = None)]
struct Args {
    /// URL to extract, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT", required_unless_present_any = ["check_session", "import_cookies"])]
    input: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, markdown)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: OutputFormat,

    /// Force a strategy instead of detecting it (x, medium, generic)
    #[arg(long, value_name = "SOURCE")]
    source: Option<SourceKind>,

    /// Page URL for file or stdin input, used to resolve relative links
    #[arg(long = "url", value_name = "URL")]
    base_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Image downloads in flight
    #[arg(long, default_value = "4", value_name = "NUM")]
    concurrency: usize,

    /// Cookie file (default: ~/.x-tractor-cookies.json)
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Keep remote image URLs instead of embedding them
    #[arg(long)]
    no_inline: bool,

    /// Report whether a saved session exists and how old it is
    #[arg(long)]
    check_session: bool,

    /// Store a browser cookie export as the saved session
    #[arg(long, value_name = "FILE")]
    import_cookies: Option<PathBuf>,

    /// Emit the artifact and the run report as one JSON object
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,xtractor_core=debug,xtractor=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn is_url(input: &str) -> bool {
    Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn check_session(store: &FileSessionStore) -> anyhow::Result<()> {
    let cookies = store.load().context("Failed to read session file")?;
    let Some(cookies) = cookies else {
        print_warning(&format!("No session saved at {}", store.path().display()));
        print_info("Import one with --import-cookies FILE");
        return Ok(());
    };

    print_success(&format!("Session found at {}", store.path().display()));
    print_field("Cookies", &cookies.len().to_string());
    if let Some(saved_at) = store.saved_at().context("Failed to read session timestamp")? {
        print_field("Age", &format!("{} hours", session_age_hours(saved_at)));
    }
    Ok(())
}

fn import_cookies(store: &FileSessionStore, path: &Path) -> anyhow::Result<()> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read cookie file: {}", path.display()))?;
    let cookies = SessionCookies::from_json(&json).context("Cookie file is not a JSON cookie list")?;
    if cookies.is_empty() {
        bail!("Cookie file {} holds no cookies", path.display());
    }

    store.save(&cookies).context("Failed to save session")?;
    print_success(&format!("Saved {} cookies to {}", cookies.len(), store.path().display().bright_white()));
    Ok(())
}

async fn extract_url(
    extractor: &Extractor,
    url: &str,
    fetch_config: &FetchConfig,
    store: &FileSessionStore,
) -> anyhow::Result<Extraction> {
    let mut page = HttpPage::new(fetch_config).context("Failed to build HTTP client")?;
    let images: Arc<dyn ImageSource> = Arc::new(NetworkImageSource::with_client(page.client(), fetch_config));

    extractor
        .run(url, &mut page, store, images)
        .await
        .with_context(|| format!("Failed to extract {url}"))
}

async fn extract_snapshot(
    extractor: &Extractor,
    html: String,
    base_url: Option<&str>,
    fetch_config: &FetchConfig,
    inline: bool,
) -> anyhow::Result<Extraction> {
    let mut page = StaticPage::new(html);
    if let Some(base) = base_url {
        page = page.landing_at(base);
    }

    let images: Arc<dyn ImageSource> = if inline {
        Arc::new(NetworkImageSource::new(fetch_config).context("Failed to build HTTP client")?)
    } else {
        Arc::new(ChainedImageSource::new())
    };

    extractor
        .run_snapshot(&page, images)
        .await
        .context("Failed to extract content")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let store = match &args.session {
        Some(path) => FileSessionStore::new(path),
        None => FileSessionStore::default_location(),
    };

    if let Some(path) = &args.import_cookies {
        import_cookies(&store, path)?;
    }
    if args.check_session {
        check_session(&store)?;
    }
    let Some(input) = args.input.as_deref() else {
        return Ok(());
    };

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let mut fetch_config = FetchConfig { timeout: args.timeout, ..Default::default() };
    if let Some(user_agent) = &args.user_agent {
        fetch_config.user_agent = user_agent.clone();
    }

    let mut builder = ExtractorConfig::builder()
        .format(args.format)
        .inline_images(!args.no_inline)
        .image_concurrency(args.concurrency)
        .image_timeout(Duration::from_secs(args.timeout));
    if let Some(source) = args.source {
        builder = builder.source(source);
    }
    let extractor = Extractor::new(builder.build());

    let started = Instant::now();
    let extraction = if is_url(input) {
        if args.verbose {
            print_step(1, 2, &format!("Extracting {}", input.bright_white().underline()));
        }
        extract_url(&extractor, input, &fetch_config, &store).await?
    } else {
        let html = if input == "-" {
            if args.verbose {
                print_step(1, 2, "Reading from stdin");
            }
            fetch_stdin().context("Failed to read from stdin")?
        } else {
            if args.verbose {
                print_step(1, 2, &format!("Reading from file {}", input.bright_white()));
            }
            fetch_file(input).with_context(|| format!("Failed to read file: {input}"))?
        };

        if args.verbose {
            print_field("Size", &format_size(html.len()));
        }
        extract_snapshot(&extractor, html, args.base_url.as_deref(), &fetch_config, !args.no_inline).await?
    };

    if !args.no_inline {
        print_images(&extraction.images);
    }

    if args.verbose {
        print_step(2, 2, "Writing output");
        print_extraction_details(&extraction, started.elapsed());
    }

    let output = if args.json {
        serde_json::to_string_pretty(&extraction).context("Failed to serialize extraction")?
    } else {
        extraction.artifact
    };
    tracing::debug!(bytes = output.len(), json = args.json, "output ready");

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
