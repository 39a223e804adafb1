// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use srtran::app_config::{LogLevel, ProviderSettings, SettingsOverrides, TranslationConfig};
use srtran::app_controller::{run_folder, Controller, TranslationJob};
use srtran::errors::AppError;
use srtran::file_utils::{JobPaths, LANG_DIR};
use srtran::language_utils;
use srtran::subtitle_processor::normalize_file;
use srtran::translation::{PromptBuilder, TranslationService};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file (or every SRT file in a directory)
    Translate(TranslateArgs),

    /// Fix line breaks between subtitle blocks in place
    Normalize {
        /// SRT files to normalize
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the instruction a configuration file produces, without contacting the service
    Prompt {
        /// Translation configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Generate shell completions for srtran
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Source file, directory, or a name resolved as <ROOT>/lang/<SOURCE_LANG>/<NAME>.srt
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Target language code (e.g. 'fr', 'es', 'pt-BR')
    #[arg(value_name = "TARGET_LANG")]
    target_language: String,

    /// Project root holding the lang/ directory
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Language folder the source name is resolved in
    #[arg(long, default_value = "en")]
    source_lang: String,

    /// Translation configuration file [default: <ROOT>/lang/<TARGET_LANG>/config.yaml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file, or output directory when SOURCE is a directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// API key for the translation service
    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Service base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Subtitle blocks per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Output token ceiling per request
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Retries per failed batch (0 fails on the first error)
    #[arg(short, long)]
    retries: Option<u32>,

    /// Batches translated at once
    #[arg(long)]
    concurrent: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip the credential check that runs before the first batch
    #[arg(long)]
    no_preflight: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,
}

impl TranslateArgs {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout,
            retry_count: self.retries,
            concurrent_requests: self.concurrent,
            max_blocks_per_batch: self.batch_size,
        }
    }

    fn target_dir(&self) -> PathBuf {
        self.root.join(LANG_DIR).join(&self.target_language)
    }

    fn job(&self, paths: JobPaths) -> TranslationJob {
        let paths = match &self.config {
            Some(config) => paths.with_config(config.clone()),
            None => paths,
        };
        TranslationJob::new(paths)
            .with_target_language(self.target_language.clone())
            .with_overrides(self.overrides())
            .with_preflight(!self.no_preflight)
            .with_progress(!self.no_progress)
    }
}

/// srtran - SRT subtitle translation with a language model
#[derive(Parser, Debug)]
#[command(name = "srtran")]
#[command(version)]
#[command(about = "Translate SRT subtitles while keeping every index and timing line")]
#[command(long_about = "srtran splits an SRT file into batches of subtitle blocks, sends each batch to a
language model with an instruction built from a per-language configuration, and
writes the translated file next to that configuration. Existing output files are
never overwritten.

EXAMPLES:
    srtran translate sermon fr                       # lang/en/sermon.srt -> lang/fr/sermon_FR.srt
    srtran translate talk.srt es -c es.yaml -o out.srt
    srtran translate lang/en de --concurrent 2       # every .srt file under lang/en
    srtran normalize lang/fr/sermon_FR.srt           # fix block spacing in place
    srtran prompt --config lang/fr/config.yaml       # show the instruction
    srtran completions bash > srtran.bash

CONFIGURATION:
    lang/<TARGET_LANG>/config.yaml must define:
        language:                 target language name
        translation_mapping:      phrase overrides (may be empty)
        bible_verse_translation:  Bible translation for quoted verses
    An optional 'provider' section overrides model, endpoint, max_tokens,
    timeout_secs, retry_count, retry_backoff_ms, concurrent_requests and
    max_blocks_per_batch. Sampling is always at temperature 0.

    The API key is read from CLAUDE_API_KEY or --api-key.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // The logger accepts everything; verbosity is governed by the max level
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    if let Some(level) = cli.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    let result = match cli.command {
        Commands::Translate(args) => run_translate(args).await,
        Commands::Normalize { files } => run_normalize(&files),
        Commands::Prompt { config } => run_prompt(config),
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "srtran", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run_translate(args: TranslateArgs) -> Result<(), AppError> {
    if language_utils::lookup(&args.target_language).is_none() {
        warn!("'{}' is not an ISO 639 language code", args.target_language);
    }

    let api_key = args.api_key.as_deref();
    let connect = |settings: &ProviderSettings| TranslationService::anthropic(api_key, settings);

    let source = PathBuf::from(&args.source);
    if source.is_dir() {
        let target_dir = args.output.clone().unwrap_or_else(|| args.target_dir());
        let jobs: Vec<TranslationJob> = JobPaths::discover(&source, &target_dir, &args.target_language)?
            .into_iter()
            .map(|paths| args.job(paths))
            .collect();

        if jobs.is_empty() {
            warn!("No .srt files found in {}", source.display());
            return Ok(());
        }

        let summary = run_folder(jobs, connect).await?;
        if !summary.is_success() {
            return Err(AppError::Unknown(format!("{} file(s) failed to translate", summary.failed)));
        }
        return Ok(());
    }

    let paths = if source.is_file() {
        JobPaths::for_source(source, args.target_dir(), &args.target_language)
    } else {
        JobPaths::resolve(&args.root, &args.source, &args.source_lang, &args.target_language)
    };
    let paths = match &args.output {
        Some(output) => paths.with_output(output.clone()),
        None => paths,
    };

    let mut controller = Controller::new(args.job(paths));
    let report = controller.run(connect).await?;
    info!(
        "Translated {} blocks in {} batch(es) into {}",
        report.translated_blocks,
        report.batches,
        report.output_path.display()
    );
    Ok(())
}

fn run_normalize(files: &[PathBuf]) -> Result<(), AppError> {
    for file in files {
        if !file.is_file() {
            return Err(AppError::InputNotFound(file.clone()));
        }
        if !normalize_file(file)? {
            info!("Already normalized: {}", file.display());
        }
    }
    Ok(())
}

fn run_prompt(config: PathBuf) -> Result<(), AppError> {
    let config = TranslationConfig::load(&config)?;
    println!("{}", PromptBuilder::new().build(&config));
    Ok(())
}
