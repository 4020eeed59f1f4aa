//! Drives the per-file loop: read, parse, filter, group.

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use colored::*;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::field::{key_path, GroupField};
use crate::filter::FilterConfig;
use crate::record::{parse_line, DEFAULT_SEPARATOR};
use crate::tree::GroupTree;

/// Reads lines, converting invalid UTF-8 sequences using replacement characters.
/// Line terminators are stripped; a final line without one is still yielded.
pub struct LossyLineReader {
    reader: BufReader<Box<dyn Read + Send>>,
    buffer: Vec<u8>,
}

impl LossyLineReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::from_reader(Box::new(fs::File::open(path)?)))
    }

    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::with_capacity(8 * 1024),
        }
    }
}

impl Iterator for LossyLineReader {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                let text = String::from_utf8_lossy(&self.buffer);
                let line = text.trim_end_matches(['\n', '\r']).to_string();
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

pub fn safe_rate(value: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= f64::EPSILON {
        0.0
    } else {
        value as f64 / elapsed_secs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileStats {
    pub path: PathBuf,
    pub elapsed: Duration,
    pub lines: u64,
    pub filtered: u64,
}

impl FileStats {
    pub fn kept(&self) -> u64 {
        self.lines - self.filtered
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub elapsed: Duration,
    pub lines: u64,
    pub filtered: u64,
    pub files: Vec<FileStats>,
}

impl RunStats {
    pub fn kept(&self) -> u64 {
        self.lines - self.filtered
    }

    fn add(&mut self, file: FileStats) {
        self.lines += file.lines;
        self.filtered += file.filtered;
        self.files.push(file);
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub stats: RunStats,
    pub tree: GroupTree,
}

/// Writes throughput lines as each file completes.
pub struct Progress {
    writer: Box<dyn Write + Send>,
    enabled: bool,
}

impl Progress {
    pub fn stdout(enabled: bool) -> Self {
        Self::with_writer(Box::new(io::stdout()), enabled)
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, enabled: bool) -> Self {
        Self { writer, enabled }
    }

    fn file_done(&mut self, file: &FileStats) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let elapsed = file.elapsed.as_secs_f64();
        writeln!(
            self.writer,
            "[{:6.2} s, {:10} : (+{:10}, -{:10}) lines, {:9.2} l/s] {}",
            elapsed,
            file.lines,
            file.kept(),
            file.filtered,
            safe_rate(file.lines, elapsed),
            file.path.display()
        )?;
        self.writer.flush()
    }

    fn run_done(&mut self, stats: &RunStats) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let elapsed = stats.elapsed.as_secs_f64();
        writeln!(
            self.writer,
            "\n{}\n[{:6.2} s, {:10} : (+{:10}, -{:10}) lines, {:.2} l/s]\n\n",
            "Total".blue().bold(),
            elapsed,
            stats.lines,
            stats.kept(),
            stats.filtered,
            safe_rate(stats.lines, elapsed)
        )?;
        self.writer.flush()
    }
}

pub struct BatchRunner<'a> {
    fields: &'a [GroupField],
    filters: &'a FilterConfig,
    separator: char,
    progress: Progress,
}

impl<'a> BatchRunner<'a> {
    pub fn new(fields: &'a [GroupField], filters: &'a FilterConfig) -> Self {
        Self {
            fields,
            filters,
            separator: DEFAULT_SEPARATOR,
            progress: Progress::stdout(true),
        }
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Folds every file, in order, into one tree. Aborts on the first file
    /// that cannot be opened or read.
    pub fn run(&mut self, files: &[PathBuf]) -> Result<RunOutcome> {
        if files.is_empty() {
            return Err(Error::NoInput);
        }
        let start = Instant::now();
        let mut tree = GroupTree::new(self.fields.len())?;
        let mut stats = RunStats::default();

        for path in files {
            info!(path = %path.display(), "processing file");
            let file_start = Instant::now();
            let reader =
                LossyLineReader::open(path).map_err(|err| Error::file_access(path, err))?;
            let (lines, filtered) = self
                .fold_lines(reader, &mut tree)
                .map_err(|err| match err {
                    Error::Io(source) => Error::file_access(path, source),
                    other => other,
                })?;
            let file = FileStats {
                path: path.clone(),
                elapsed: file_start.elapsed(),
                lines,
                filtered,
            };
            self.progress.file_done(&file)?;
            stats.add(file);
        }

        stats.elapsed = start.elapsed();
        self.progress.run_done(&stats)?;
        Ok(RunOutcome { stats, tree })
    }

    /// Returns `(lines read, lines filtered out)`.
    pub fn fold_lines<I>(&self, lines: I, tree: &mut GroupTree) -> Result<(u64, u64)>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let (mut count, mut filtered, mut short) = (0u64, 0u64, 0u64);
        for line in lines {
            let line = line?;
            count += 1;
            let record = parse_line(&line, self.separator);
            if record.is_short() {
                short += 1;
            }
            if !self.filters.passes(&record) {
                filtered += 1;
                continue;
            }
            tree.insert(&key_path(self.fields, &record))?;
        }
        if short > 0 {
            debug!(short, "lines with missing fields");
        }
        Ok((count, filtered))
    }
}
