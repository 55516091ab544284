//! Layout Translate CLI - translate German PDF documents to English in place.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use layout_translate_core::{
    AppConfig, DocumentPipeline, Lang, Progress, ProgressFn, TranslationTask,
    clear_translation_cache,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "layout-translate")]
#[command(author, version, about = "Translate PDF documents while keeping their layout", long_about = None)]
struct Args {
    /// Input PDF file
    input: PathBuf,

    /// Output PDF file
    output: PathBuf,

    /// Texts sent to the translator per request
    #[arg(long)]
    batch_size: Option<usize>,

    /// JSON file of cached translations, loaded before and saved after the run
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Keep the original font size instead of shrinking translations to fit
    #[arg(long)]
    no_formatting: bool,

    /// Source language code
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the memory and disk caches
    #[arg(long)]
    no_cache: bool,

    /// Empty the on-disk translation cache before translating
    #[arg(long)]
    clear_cache: bool,

    /// Write the task status as JSON to this file when done
    #[arg(long)]
    status_file: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Layer command line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(source) = &self.source {
            config.source_lang = Lang::new(source);
        }
        if let Some(target) = &self.target {
            config.target_lang = Lang::new(target);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(api_base) = &self.api_base {
            config.translator.api_base.clone_from(api_base);
        }
        if self.api_key.is_some() {
            config.translator.api_key.clone_from(&self.api_key);
        }
        if let Some(model) = &self.model {
            config.translator.model.clone_from(model);
        }
        if self.cache_file.is_some() {
            config.cache.file.clone_from(&self.cache_file);
        }
        if self.no_formatting {
            config.preserve_formatting = false;
        }
        if self.no_cache {
            config.cache.memory_enabled = false;
            config.cache.disk_enabled = false;
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn write_status(task: &TranslationTask, path: Option<&Path>) {
    if let Some(path) = path
        && let Err(e) = task.write_json(path)
    {
        warn!("Could not write status file {}: {}", path.display(), e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply(&mut config);

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    if args.clear_cache {
        let cleared = clear_translation_cache().map_err(anyhow::Error::msg)?;
        info!("Cleared {} cached translations", cleared);
    }

    let pipeline = DocumentPipeline::new(config).context("Invalid configuration")?;

    let task = Mutex::new(TranslationTask::new(&args.input, &args.output));
    if let Ok(mut task) = task.lock() {
        task.start();
    }

    let pb = progress_bar()?;
    let on_progress = |event: Progress| match event {
        Progress::Extracted { pages, elements } => {
            pb.set_length(pages as u64);
            pb.set_message(format!("{elements} text runs"));
        }
        Progress::Translated { unique_texts } => {
            pb.set_message(format!("{unique_texts} texts translated"));
        }
        Progress::PageDone { page, total } => {
            pb.inc(1);
            if let Ok(mut task) = task.lock() {
                task.set_progress(page + 1, total);
            }
        }
        Progress::Saved => pb.finish_with_message("saved"),
    };

    let result = pipeline
        .translate_file(&args.input, &args.output, Some(&on_progress as &ProgressFn<'_>))
        .await
        .with_context(|| format!("Failed to translate {}", args.input.display()));

    let mut task = task.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
    match &result {
        Ok(_) => task.complete(),
        Err(e) => {
            pb.abandon();
            task.fail(format!("{e:#}"));
        }
    }
    write_status(&task, args.status_file.as_deref());

    let report = result?;
    info!(
        "{} pages, {} replacements, {} kept in German",
        report.pages, report.replacements, report.fallback
    );

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Translated PDF saved to: {}", args.output.display());
    }

    Ok(())
}
