//! CLI binary for swan-ocr.
//!
//! Runs the two node units outside the host: `load` rasterises pages to PNG
//! files, `ocr` chains the loader into the DeepSeek-OCR runner, `nodes`
//! prints the declared node schemas.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use swan_ocr::pipeline::tensor::tensor_to_image;
use swan_ocr::{
    load_pdf, registry, run_deepseek_ocr, OcrConfig, OcrMode, OcrProgressCallback, OcrRequest,
    ProgressCallback, TaskType,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar with one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// When the previous page finished; pages run one after another.
    last_tick: Mutex<Instant>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading model…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            last_tick: Mutex::new(Instant::now()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        let mut last = self.last_tick.lock().unwrap();
        let secs = last.elapsed().as_secs_f64();
        *last = Instant::now();
        secs
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
        *self.last_tick.lock().unwrap() = Instant::now();

        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running DeepSeek-OCR on {total_pages} pages…"))
        ));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, markdown_len: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages transcribed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages transcribed  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise pages 2-4 to PNG files
  swanocr load paper.pdf --start 2 --end 4 --out pages/

  # OCR the first page with the default Gundam preset
  swanocr ocr paper.pdf

  # Small preset, plain OCR without layout grounding
  swanocr ocr paper.pdf --end 5 --mode Small --task "without layouts"

  # Custom instruction, JSON result
  swanocr ocr scan.pdf --prompt "<image>\nExtract every table." --json

  # List the node schemas declared to the host
  swanocr nodes

MODES:
  Mode     base_size  image_size  crop
  ──────   ─────────  ──────────  ────
  Tiny     512        512         no
  Small    640        640         no
  Base     1024       1024        no
  Large    1280       1280        no
  Gundam   1024       640         yes   (default)

TASKS:
  document (default), without layouts, other image, figures in document, general

ENVIRONMENT VARIABLES:
  SWANOCR_MODELS_DIR      Model-storage root (contains DeepSeek-OCR-Latest-BF16.I64/)
  SWANOCR_OUTPUT_DIR      Output directory for results
  SWANOCR_PROVIDER        Inference provider serving the model (ollama, openai, ...)
  SWANOCR_MODEL           Model id served by the provider
  EDGEQUAKE_LLM_PROVIDER  Fallback provider when --provider is not given
  PDFIUM_LIB_PATH         Directory or file of an existing libpdfium
"#;

/// Load PDF pages as images and transcribe them with DeepSeek-OCR.
#[derive(Parser, Debug)]
#[command(
    name = "swanocr",
    version,
    about = "Load PDF pages as images and transcribe them to Markdown with DeepSeek-OCR",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SWANOCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SWANOCR_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rasterise a page range and save each page as PNG.
    Load {
        #[command(flatten)]
        pages: PageArgs,

        /// Directory receiving page_<n>.png files.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Rasterise a page range and transcribe it with DeepSeek-OCR.
    Ocr {
        #[command(flatten)]
        pages: PageArgs,

        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Print the declared node schemas as JSON.
    Nodes,
}

#[derive(Args, Debug)]
struct PageArgs {
    /// PDF file path (quotes and surrounding whitespace are stripped).
    pdf: String,

    /// First page, 1-indexed.
    #[arg(long, default_value_t = 1)]
    start: usize,

    /// Last page, inclusive. Defaults to --start.
    #[arg(long)]
    end: Option<usize>,
}

impl PageArgs {
    fn end(&self) -> usize {
        self.end.unwrap_or(self.start)
    }
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// Resolution preset: Tiny, Small, Base, Large, Gundam.
    #[arg(long, default_value = "Gundam")]
    mode: String,

    /// Prompt template: document, without layouts, other image, figures in document, general.
    #[arg(long, default_value = "document")]
    task: String,

    /// Custom prompt; overrides --task when non-empty.
    #[arg(long, default_value = "")]
    prompt: String,

    /// Model-storage root.
    #[arg(long, env = "SWANOCR_MODELS_DIR", default_value = "models")]
    models_dir: PathBuf,

    /// Model directory name under --models-dir.
    #[arg(long, env = "SWANOCR_MODEL_DIR_NAME")]
    model_dir_name: Option<String>,

    /// Output directory.
    #[arg(long, env = "SWANOCR_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Inference provider: ollama, openai (vLLM / OpenAI-compatible), ...
    #[arg(long, env = "SWANOCR_PROVIDER")]
    provider: Option<String>,

    /// Model id served by the provider. Defaults to the model directory name.
    #[arg(long, env = "SWANOCR_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "SWANOCR_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max generated tokens per page.
    #[arg(long, env = "SWANOCR_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Output structured JSON (OcrOutput) instead of Markdown.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SWANOCR_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the progress bar, so they are muted
    // while it is shown.
    let show_progress = match &cli.command {
        Command::Ocr { ocr, .. } => !cli.quiet && !ocr.no_progress && !ocr.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Load { ref pages, ref out } => run_load(pages, out, cli.quiet).await,
        Command::Ocr { ref pages, ref ocr } => run_ocr(pages, ocr, show_progress, cli.quiet).await,
        Command::Nodes => {
            let json = serde_json::to_string_pretty(&registry())
                .context("Failed to serialise node registry")?;
            println!("{json}");
            Ok(())
        }
    }
}

async fn run_load(pages: &PageArgs, out: &Path, quiet: bool) -> Result<()> {
    let images = load_pdf(&pages.pdf, pages.start, pages.end())
        .await
        .context("Failed to load PDF")?;

    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;

    for (page, tensor) in (pages.start..).zip(&images) {
        let path = out.join(format!("page_{page}.png"));
        tensor_to_image(tensor)
            .context("Invalid page image")?
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !quiet {
            let shape = tensor.shape();
            eprintln!(
                "  {} {}  {}",
                green("✓"),
                path.display(),
                dim(&format!("{}×{}", shape[2], shape[1]))
            );
        }
    }
    Ok(())
}

async fn run_ocr(pages: &PageArgs, args: &OcrArgs, show_progress: bool, quiet: bool) -> Result<()> {
    if OcrMode::from_name(&args.mode).is_none() {
        eprintln!("{} unknown mode '{}', using Gundam", cyan("⚠"), args.mode);
    }
    if TaskType::from_name(&args.task).is_none() {
        eprintln!("{} unknown task '{}', using document", cyan("⚠"), args.task);
    }

    let images = load_pdf(&pages.pdf, pages.start, pages.end())
        .await
        .context("Failed to load PDF")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn OcrProgressCallback>)
    } else {
        None
    };
    let config = build_config(args, progress_cb)?;
    let request = OcrRequest::from_host(&args.mode, &args.task, &args.prompt);

    if !quiet && !args.json {
        eprintln!(
            "{} {} pages  {}  {}",
            cyan("◆"),
            images.len(),
            dim(&format!("mode {}", request.mode.name())),
            dim(&format!("model {}", config.served_model())),
        );
    }

    let output = run_deepseek_ocr(&images, &request, &config)
        .await
        .context("OCR failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.markdown.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !quiet && !show_progress && !args.json {
        eprintln!(
            "Transcribed {}/{} pages  →  {}",
            output.success_count(),
            output.pages.len(),
            bold(&output.output_path.display().to_string())
        );
    }
    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(args: &OcrArgs, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .models_dir(&args.models_dir)
        .output_dir(&args.output_dir)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens);

    if let Some(ref name) = args.model_dir_name {
        builder = builder.model_dir_name(name);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
