use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::error::{DispatchError, ExtractError};
use crate::extractor::RecordExtractor;
use crate::record::{InputFile, PurchaseRecord};

/// Non-fatal conditions found while discovering input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MissingRoot(PathBuf),
    NoFolders(PathBuf),
    EmptyFolder(PathBuf),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::MissingRoot(p) => write!(f, "Input directory does not exist: {}", p.display()),
            Notice::NoFolders(p) => write!(f, "No folders found in the directory: {}", p.display()),
            Notice::EmptyFolder(p) => write!(f, "No text files found in folder: {}", p.display()),
        }
    }
}

/// Folders and files found under the input root.
#[derive(Debug, Default)]
pub struct Discovery {
    pub folders: Vec<PathBuf>,
    pub files: Vec<InputFile>,
    pub notices: Vec<Notice>,
    /// Folders that could not be listed.
    pub errors: Vec<ExtractError>,
}

impl Discovery {
    /// Records the listing of one folder. Only a folder that was read without
    /// error and held no matching file is reported as empty.
    pub fn add_folder_entries<I>(&mut self, folder: &Path, entries: I)
    where
        I: IntoIterator<Item = Result<PathBuf, ExtractError>>,
    {
        let before = self.files.len();
        let mut failed = false;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => self.files.push(InputFile::from_path(path)),
                Ok(_) => {}
                Err(e) => {
                    error!("{}", e);
                    self.errors.push(e);
                    failed = true;
                }
            }
        }
        if self.files.len() == before && !failed {
            self.notices.push(Notice::EmptyFolder(folder.to_path_buf()));
        }
    }
}

#[derive(Default, Debug)]
pub struct ExtractionStats {
    pub files_processed: AtomicU64,
    pub unreadable_files: AtomicU64,
    pub lines_read: AtomicU64,
    pub records_extracted: AtomicU64,
    pub malformed_lines: AtomicU64,
}

impl ExtractionStats {
    pub fn log_current_stats(&self, stage: &str) {
        info!("--- Extraction Stats ({}) ---", stage);
        info!(" Files Processed: {}", self.files_processed.load(Ordering::Relaxed));
        info!(" Unreadable Files: {}", self.unreadable_files.load(Ordering::Relaxed));
        info!(" Lines Read: {}", self.lines_read.load(Ordering::Relaxed));
        info!(" Records Extracted: {}", self.records_extracted.load(Ordering::Relaxed));
        info!(" Malformed Lines Skipped: {}", self.malformed_lines.load(Ordering::Relaxed));
        info!("------------------------------");
    }
}

/// Everything the parallel phase produced, available once every worker is done.
#[derive(Debug)]
pub struct Dispatch {
    pub records: Vec<PurchaseRecord>,
    pub notices: Vec<Notice>,
    /// Unreadable files and corrupt lines, in file order.
    pub errors: Vec<ExtractError>,
    pub folder_count: usize,
    pub file_count: usize,
    pub worker_count: usize,
    pub stats: ExtractionStats,
}

impl Dispatch {
    /// Number of distinct files that reported at least one error.
    pub fn files_with_errors(&self) -> usize {
        let mut paths: Vec<&Path> = self
            .errors
            .iter()
            .map(|e| match e {
                ExtractError::Unreadable { path, .. } => path.as_path(),
                ExtractError::MalformedNumeric { path, .. } => path.as_path(),
            })
            .collect();
        paths.sort();
        paths.dedup();
        paths.len()
    }
}

/// Pool size derived from folder count and partition factor, never below one.
pub fn worker_count(folder_count: usize, partition_size: usize) -> usize {
    folder_count.div_ceil(partition_size.max(1)).max(1)
}

pub struct WorkDispatcher {
    extractor: RecordExtractor,
    partition_size: usize,
    extension: String,
    show_progress: bool,
}

impl WorkDispatcher {
    pub fn new(extractor: RecordExtractor, partition_size: usize, extension: &str) -> Self {
        Self {
            extractor,
            partition_size,
            extension: extension.trim_start_matches('.').to_string(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Lists immediate subdirectories of `root` and the matching files in each.
    pub fn discover(&self, root: &Path) -> Result<Discovery, DispatchError> {
        let mut discovery = Discovery::default();
        if !root.is_dir() {
            discovery.notices.push(Notice::MissingRoot(root.to_path_buf()));
            return Ok(discovery);
        }

        let entries = fs::read_dir(root).map_err(|source| DispatchError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| DispatchError::Io {
                path: root.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                discovery.folders.push(path);
            }
        }
        discovery.folders.sort();

        if discovery.folders.is_empty() {
            discovery.notices.push(Notice::NoFolders(root.to_path_buf()));
            return Ok(discovery);
        }

        let options = MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let folders = discovery.folders.clone();
        for folder in &folders {
            let pattern = format!(
                "{}/*.{}",
                Pattern::escape(&folder.to_string_lossy()),
                Pattern::escape(&self.extension)
            );
            let paths = glob_with(&pattern, options).map_err(|source| DispatchError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            discovery.add_folder_entries(
                folder,
                paths.map(|entry| {
                    entry.map_err(|e| ExtractError::Unreadable {
                        path: e.path().to_path_buf(),
                        source: e.into_error(),
                    })
                }),
            );
        }
        Ok(discovery)
    }

    /// Discovers and extracts everything under `root`.
    pub fn run(&self, root: &Path) -> Result<Dispatch, DispatchError> {
        let discovery = self.discover(root)?;
        self.extract(discovery)
    }

    /// Extracts every discovered file on a bounded pool and returns once all units finish.
    pub fn extract(&self, discovery: Discovery) -> Result<Dispatch, DispatchError> {
        for notice in &discovery.notices {
            warn!("{}", notice);
        }

        let num_threads = worker_count(discovery.folders.len(), self.partition_size);
        info!(
            "Found {} folders and {} input files. Using {} worker threads (partition size {}).",
            discovery.folders.len(),
            discovery.files.len(),
            num_threads,
            self.partition_size
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("extract-{}", i))
            .build()?;

        let stats = ExtractionStats::default();
        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(discovery.files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_message("Processing: Starting...");

        // One unit per file; each returns its own batch and the batches are joined afterwards.
        let outcomes: Vec<Result<_, ExtractError>> = pool.install(|| {
            discovery
                .files
                .par_iter()
                .map(|input| {
                    let outcome = self.extractor.extract_file(input);
                    stats.files_processed.fetch_add(1, Ordering::Relaxed);
                    match &outcome {
                        Ok(extraction) => {
                            stats.lines_read.fetch_add(extraction.lines_read, Ordering::Relaxed);
                            stats
                                .records_extracted
                                .fetch_add(extraction.records.len() as u64, Ordering::Relaxed);
                            stats
                                .malformed_lines
                                .fetch_add(extraction.malformed.len() as u64, Ordering::Relaxed);
                        }
                        Err(e) => {
                            error!("{}", e);
                            stats.unreadable_files.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    progress_bar.inc(1);
                    progress_bar.set_message(format!("Processed: {}", input.file));
                    outcome
                })
                .collect()
        });
        progress_bar.finish_with_message("Processing complete.");

        let mut records = Vec::new();
        let mut errors = discovery.errors;
        for outcome in outcomes {
            match outcome {
                Ok(extraction) => {
                    records.extend(extraction.records);
                    errors.extend(extraction.malformed);
                }
                Err(e) => errors.push(e),
            }
        }

        Ok(Dispatch {
            records,
            notices: discovery.notices,
            errors,
            folder_count: discovery.folders.len(),
            file_count: discovery.files.len(),
            worker_count: num_threads,
            stats,
        })
    }
}
