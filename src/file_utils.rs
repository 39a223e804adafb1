use anyhow::{Result, Context};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Directory that holds per-language folders under a project root
pub const LANG_DIR: &str = "lang";

/// Name of the per-language translation configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(extension) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file that must not exist yet.
    ///
    /// The existence check and the creation are one atomic step, so a file
    /// that appears concurrently is never truncated. Returns the raw
    /// `io::Error` so callers can tell `AlreadyExists` apart.
    pub fn write_new<P: AsRef<Path>>(path: P, content: &str) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()
    }
}

/// Output file name for a translated subtitle: `<stem>_<TARGET>.srt`
pub fn output_file_name<P: AsRef<Path>>(source: P, target_language: &str) -> String {
    let stem = source
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}_{}.srt", stem, target_language.to_uppercase())
}

/// Whether `path` looks like an output this tool wrote for `target_language`
pub fn is_translated_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
    let suffix = format!("_{}", target_language.to_uppercase());
    path.as_ref()
        .file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with(&suffix))
}

/// Append `.srt` when the name has no such extension
pub fn with_srt_extension(name: &str) -> String {
    if name.to_lowercase().ends_with(".srt") {
        name.to_string()
    } else {
        format!("{}.srt", name)
    }
}

/// The three paths a translation job touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    /// Source subtitle file
    pub source: PathBuf,
    /// Translated output file
    pub output: PathBuf,
    /// Translation configuration file
    pub config: PathBuf,
}

impl JobPaths {
    /// Resolve paths in the project layout:
    ///
    /// - source: `<root>/lang/<source_lang>/<name>.srt`
    /// - output: `<root>/lang/<target>/<stem>_<TARGET>.srt`
    /// - config: `<root>/lang/<target>/config.yaml`
    pub fn resolve<P: AsRef<Path>>(root: P, source_name: &str, source_language: &str, target_language: &str) -> Self {
        let lang_dir = root.as_ref().join(LANG_DIR);
        let source = lang_dir.join(source_language).join(with_srt_extension(source_name));
        Self::for_source(source, lang_dir.join(target_language), target_language)
    }

    /// Paths for an explicit source file with outputs and config in `target_dir`
    pub fn for_source<P: AsRef<Path>>(source: PathBuf, target_dir: P, target_language: &str) -> Self {
        let target_dir = target_dir.as_ref();
        let output = target_dir.join(output_file_name(&source, target_language));
        Self {
            source,
            output,
            config: target_dir.join(CONFIG_FILE_NAME),
        }
    }

    /// Replace the configuration path
    pub fn with_config(mut self, config: PathBuf) -> Self {
        self.config = config;
        self
    }

    /// Jobs for every `.srt` file under `dir`, skipping files that are
    /// themselves outputs for `target_language`
    pub fn discover<P: AsRef<Path>, Q: AsRef<Path>>(dir: P, target_dir: Q, target_language: &str) -> Result<Vec<Self>> {
        let sources = FileManager::find_files(dir, "srt")?;
        Ok(sources
            .into_iter()
            .filter(|source| !is_translated_output(source, target_language))
            .map(|source| Self::for_source(source, target_dir.as_ref(), target_language))
            .collect())
    }

    /// Replace the output path
    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = output;
        self
    }
}
