use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::app_config::{ProviderSettings, SettingsOverrides, TranslationConfig};
use crate::errors::{AppError, SubtitleError, TranslationError};
use crate::file_utils::{FileManager, JobPaths};
use crate::language_utils;
use crate::subtitle_processor::{count_blocks, normalize, SubtitleDocument};
use crate::translation::{concatenate, Batch, Batcher, PromptBuilder, TranslationClient};

// @module: Application controller for subtitle translation runs

/// Stage of a translation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Created, nothing checked yet
    Idle,
    /// Checking preconditions and reading the source
    ReadingSource,
    Normalizing,
    Batching,
    /// Waiting on batch `batch` of `total` (1-based)
    Translating { batch: usize, total: usize },
    Concatenating,
    Writing,
    Done,
    /// Terminal failure; nothing was written
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ReadingSource => write!(f, "reading source"),
            Self::Normalizing => write!(f, "normalizing"),
            Self::Batching => write!(f, "batching"),
            Self::Translating { batch, total } => write!(f, "translating batch {} of {}", batch, total),
            Self::Concatenating => write!(f, "concatenating"),
            Self::Writing => write!(f, "writing"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Everything one run needs to know up front
#[derive(Debug, Clone)]
pub struct TranslationJob {
    // @field: Source, output and config locations
    pub paths: JobPaths,

    // @field: Target language code, used to cross-check the configured language name
    pub target_language: Option<String>,

    // @field: Command-line overrides for the provider settings
    pub overrides: SettingsOverrides,

    // @field: Check the credential before sending the first batch (on by default)
    pub preflight: bool,

    // @field: Draw a progress bar over the batches
    pub show_progress: bool,
}

impl TranslationJob {
    pub fn new(paths: JobPaths) -> Self {
        Self {
            paths,
            target_language: None,
            overrides: SettingsOverrides::default(),
            preflight: true,
            show_progress: false,
        }
    }

    pub fn with_target_language(mut self, code: impl Into<String>) -> Self {
        self.target_language = Some(code.into());
        self
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub batches: usize,
    pub source_blocks: usize,
    pub translated_blocks: usize,
    pub elapsed: Duration,
}

/// Tally of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl FolderSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Drives one translation job through its states
pub struct Controller {
    // @field: Job description
    job: TranslationJob,

    // @field: Current state
    state: RunState,

    // @field: Every state entered, in order
    history: Vec<RunState>,
}

impl Controller {
    // @method: Create a controller for a job
    pub fn new(job: TranslationJob) -> Self {
        Self {
            job,
            state: RunState::Idle,
            history: Vec::new(),
        }
    }

    pub fn job(&self) -> &TranslationJob {
        &self.job
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// States entered so far, oldest first
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn transition(&mut self, next: RunState) {
        debug!("State: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Run the job to completion.
    ///
    /// `connect` builds the translation client from the effective provider
    /// settings. It is called only after the source, output and configuration
    /// checks have passed, so a missing credential never hides an earlier
    /// failure. On any error the controller ends in `Aborted` and no output
    /// file is created.
    pub async fn run<C, F>(&mut self, connect: F) -> Result<RunReport, AppError>
    where
        C: TranslationClient,
        F: FnOnce(&ProviderSettings) -> Result<C, AppError>,
    {
        let started = Instant::now();
        match self.execute(connect, started).await {
            Ok(report) => {
                self.transition(RunState::Done);
                Ok(report)
            }
            Err(e) => {
                self.transition(RunState::Aborted);
                Err(e)
            }
        }
    }

    async fn execute<C, F>(&mut self, connect: F, started: Instant) -> Result<RunReport, AppError>
    where
        C: TranslationClient,
        F: FnOnce(&ProviderSettings) -> Result<C, AppError>,
    {
        self.transition(RunState::ReadingSource);
        let paths = self.job.paths.clone();

        if !FileManager::file_exists(&paths.source) {
            return Err(AppError::InputNotFound(paths.source));
        }

        if paths.output.exists() {
            return Err(AppError::OutputExists(paths.output));
        }

        let mut config = TranslationConfig::load(&paths.config)?;
        if !self.job.overrides.is_empty() {
            self.job.overrides.apply(&mut config.provider);
            config.provider.validate()?;
        }

        if let Some(code) = &self.job.target_language {
            if !language_utils::name_matches_code(code, &config.language) {
                warn!(
                    "Configured language '{}' does not look like target code '{}'",
                    config.language, code
                );
            }
        }

        let instruction = PromptBuilder::new().build(&config);
        debug!("Translation instruction:\n{}", instruction);

        let client = connect(&config.provider)?;
        if self.job.preflight {
            info!("Checking connection to {}", config.provider.endpoint);
            client.preflight().await?;
        }

        let raw = FileManager::read_to_string(&paths.source).map_err(|e| AppError::File(e.to_string()))?;

        self.transition(RunState::Normalizing);
        let normalized = normalize(&raw);
        let source_blocks = count_blocks(&normalized);
        if source_blocks == 0 {
            return Err(SubtitleError::NoBlocks.into());
        }
        info!("Read {} subtitle blocks from {}", source_blocks, paths.source.display());

        let well_formed = SubtitleDocument::parse(&normalized).map(|doc| doc.len()).unwrap_or(0);
        if well_formed < source_blocks {
            warn!(
                "{} of {} blocks have bad timings or no text and will be sent unchanged",
                source_blocks - well_formed,
                source_blocks
            );
        }

        self.transition(RunState::Batching);
        let batches = Batcher::new(config.provider.max_blocks_per_batch).split_text(&normalized);

        let translated = self
            .translate_batches(&client, &batches, &instruction, config.provider.concurrent_requests)
            .await?;

        self.transition(RunState::Concatenating);
        let output = normalize(&concatenate(&translated));

        let translated_blocks = count_blocks(&output);
        if translated_blocks != source_blocks {
            warn!(
                "Number of blocks changed during translation! Before: {}, After: {}",
                source_blocks,
                translated_blocks
            );
        }

        self.transition(RunState::Writing);
        FileManager::write_new(&paths.output, &output).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                AppError::OutputExists(paths.output.clone())
            } else {
                AppError::File(format!("Failed to write {}: {}", paths.output.display(), e))
            }
        })?;

        let elapsed = started.elapsed();
        info!("Success: {} ({})", paths.output.display(), format_duration(elapsed));
        if let Some(summary) = client.usage_summary() {
            info!("{}", summary);
        }

        Ok(RunReport {
            output_path: paths.output,
            batches: batches.len(),
            source_blocks,
            translated_blocks,
            elapsed,
        })
    }

    /// Translate every batch, returning the texts in batch order
    async fn translate_batches<C: TranslationClient>(
        &mut self,
        client: &C,
        batches: &[Batch],
        instruction: &str,
        concurrent_requests: usize,
    ) -> Result<Vec<String>, AppError> {
        let total = batches.len();
        let progress = self.progress_bar(total);
        let mut results = Vec::with_capacity(total);

        if concurrent_requests <= 1 {
            for batch in batches {
                self.transition(RunState::Translating { batch: batch.number, total });
                info!("Translating batch {} of {}", batch.number, total);

                let text = client
                    .translate(&batch.text, instruction)
                    .await
                    .map_err(|e| batch_failed(e, batch.number, total))?;
                progress.inc(1);
                results.push(text);
            }
        } else {
            // buffered() yields in submission order regardless of completion order
            let mut pending = stream::iter(batches.iter().map(|batch| async move {
                info!("Translating batch {} of {}", batch.number, total);
                (batch.number, client.translate(&batch.text, instruction).await)
            }))
            .buffered(concurrent_requests);

            while let Some((number, result)) = pending.next().await {
                self.transition(RunState::Translating { batch: number, total });
                let text = result.map_err(|e| batch_failed(e, number, total))?;
                progress.inc(1);
                results.push(text);
            }
        }

        progress.finish_and_clear();
        Ok(results)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.job.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }
}

/// Run every job in order, sharing one client factory.
///
/// Jobs whose output already exists are skipped. A missing or rejected
/// credential stops the whole folder since every later job would fail the
/// same way; any other failure is logged and counted.
pub async fn run_folder<C, F>(jobs: Vec<TranslationJob>, connect: F) -> Result<FolderSummary, AppError>
where
    C: TranslationClient,
    F: Fn(&ProviderSettings) -> Result<C, AppError>,
{
    let mut summary = FolderSummary::default();
    info!("Processing {} subtitle file(s)", jobs.len());

    for job in jobs {
        let source = job.paths.source.clone();
        info!("Processing: {}", source.display());

        let mut controller = Controller::new(job);
        match controller.run(&connect).await {
            Ok(_) => summary.translated += 1,
            Err(AppError::OutputExists(path)) => {
                warn!("Skipping {}, translation already exists: {}", source.display(), path.display());
                summary.skipped += 1;
            }
            Err(e @ AppError::CredentialMissing(_)) => return Err(e),
            Err(AppError::Translation(e)) if e.is_authentication() => return Err(AppError::Translation(e)),
            Err(e) => {
                error!("Error processing file {}: {}", source.display(), e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Finished: {} translated, {} skipped, {} failed",
        summary.translated, summary.skipped, summary.failed
    );
    Ok(summary)
}

fn batch_failed(error: TranslationError, batch: usize, total: usize) -> AppError {
    match error {
        TranslationError::Provider(source) => AppError::Translation(TranslationError::BatchFailed { batch, total, source }),
        other => AppError::Translation(other),
    }
}

/// Human readable duration: `1h 2m 3s`, `2m 3s` or `3.250s`
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
