use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docview_core::source::is_http_url;
use docview_core::vertices::{self, VerticesGroup};
use docview_core::{
    AnySource, DisplayList, DrawOutcome, DrawRequest, NormalizedPoint, OverlayRenderer, Rotation,
    ScrollRequest, ViewerConfig, ViewerController, ViewportState,
};
use docview_pdf_engine::{default_engine, LopdfEngine, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "docview")]
#[command(about = "Inspect PDFs and preview review highlights")]
pub struct Cli {
    /// Viewer configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a page to PNG, optionally with its highlight overlay.
    Render {
        /// Local path or http(s) URL
        #[arg(value_name = "FILE_OR_URL")]
        document: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rotation: i32,
        /// JSON file with vertices groups
        #[arg(long, value_name = "JSON")]
        groups: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the overlay display list for a set of vertices groups.
    Overlay {
        #[arg(long, value_name = "JSON")]
        groups: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        width: f32,
        #[arg(long)]
        height: f32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        rotation: i32,
        /// Label drawn above every region
        #[arg(long)]
        label: Option<String>,
        /// Request a scroll target when exactly one region is drawn
        #[arg(long)]
        scroll: bool,
    },
    /// Print the keys of groups containing a normalized point.
    HitTest {
        #[arg(long, value_name = "JSON")]
        groups: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    index: u32,
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct OverlayOutput<'a> {
    drawn: usize,
    scroll_to: Option<ScrollRequest>,
    display_list: &'a DisplayList,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { document, page, scale, rotation, groups, output } => {
            let config = load_config(cli.config.as_deref())?;
            run_render(
                &config,
                &document,
                page,
                scale,
                rotation,
                groups.as_deref(),
                output.as_deref(),
            )
        }
        Commands::Overlay { groups, page, width, height, rotation, label, scroll } => {
            let config = load_config(cli.config.as_deref())?;
            let groups = read_groups(&groups)?;
            let request = DrawRequest {
                viewport: ViewportState::new(width, height, 1.0),
                groups: &groups,
                rotation: Rotation::from_degrees(rotation),
                scroll_into_view: scroll,
                label_override: label.as_deref(),
                label_keys: config.style.label_keys,
                current_page: page,
            };
            run_overlay(&config, &request)
        }
        Commands::HitTest { groups, page, x, y } => {
            let groups = read_groups(&groups)?;
            run_hit_test(&groups, page, x, y);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let config = match path {
        Some(path) => ViewerConfig::from_file(path)
            .and_then(ViewerConfig::merge_env)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewerConfig::from_env().context("failed to load config from environment")?,
    };
    debug!(?config, "configuration loaded");
    Ok(config)
}

fn read_groups(path: &Path) -> Result<Vec<VerticesGroup>> {
    vertices::from_json_file(path)
        .with_context(|| format!("failed to read vertices groups from {}", path.display()))
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let pages = (0..page_count)
        .map(|index| {
            let size = engine.page_size(handle, index)?;
            Ok(PageOutput { index, width: size.width_pt, height: size.height_pt })
        })
        .collect::<Result<Vec<_>>>()?;

    let payload = InfoOutput { path: file.display().to_string(), page_count, pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_render(
    config: &ViewerConfig,
    document: &str,
    page: u32,
    scale: f32,
    rotation: i32,
    groups: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    if !is_http_url(document) {
        ensure_pdf_exists(Path::new(document))?;
    }

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let mut viewer: ViewerController<LopdfEngine, AnySource, DisplayList> =
        ViewerController::new(default_engine(), AnySource::new(), config.clone());
    viewer.attach_overlay(DisplayList::default());

    viewer.load(document).context("failed to open PDF")?;

    if page > viewer.num_pages() {
        anyhow::bail!("page {page} out of range (page_count={})", viewer.num_pages());
    }

    if let Some(groups) = groups {
        viewer.set_vertices_groups(read_groups(groups)?, Instant::now());
    }
    viewer.go_to_page(page);
    viewer.set_scale(scale);
    viewer.set_rotation(Rotation::from_degrees(rotation));
    viewer.render_page().context("failed to render page")?;

    let rendered = viewer.page_render().context("no page was rendered")?;
    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(document, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    rendered
        .bitmap
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;
    info!(path = %output.display(), "page written");
    println!("{}", output.display());

    if groups.is_some() {
        let overlay_path = overlay_output(&output);
        let list = viewer.overlay().context("overlay surface missing")?;
        fs::write(&overlay_path, serde_json::to_string_pretty(list)?)
            .with_context(|| format!("failed to write overlay to {}", overlay_path.display()))?;
        println!("{}", overlay_path.display());
    }

    Ok(())
}

fn run_overlay(config: &ViewerConfig, request: &DrawRequest<'_>) -> Result<()> {
    let renderer = OverlayRenderer::new(config.style.clone(), config.scroll_margin);
    let mut list = DisplayList::new(request.viewport.width, request.viewport.height);

    let DrawOutcome { drawn, scroll_to } = renderer.draw(Some(&mut list), request);

    let json =
        serde_json::to_string_pretty(&OverlayOutput { drawn, scroll_to, display_list: &list })?;
    println!("{json}");

    Ok(())
}

fn run_hit_test(groups: &[VerticesGroup], page: u32, x: f32, y: f32) {
    let point = NormalizedPoint::new(x, y);
    for group in vertices::hits(groups, page, point) {
        println!("{}", group.key);
    }
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

/// `<stem>-page-<n>.png` next to a local file, or in the working directory
/// for a URL.
fn default_render_output(document: &str, page: u32) -> PathBuf {
    if is_http_url(document) {
        let name = document.rsplit('/').next().unwrap_or_default();
        let stem = Path::new(name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("page");
        return PathBuf::from(format!("{stem}-page-{page}.png"));
    }

    let file = Path::new(document);
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

fn overlay_output(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".overlay.json");
    PathBuf::from(name)
}
