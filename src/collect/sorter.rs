//! External sort providers for intermediate files.
//!
//! Intermediate files hold one record per line with space-separated fields.
//! Every provider sorts by the first field only, byte-wise, and is stable:
//! lines with equal keys keep their input order, and a merge takes equal
//! keys from earlier inputs first.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use super::{sort_key, CollectError};
use crate::core::config::{IndexConfig, SortProviderKind};

/// Sorts and merges line-oriented intermediate files
pub trait SortProvider {
    /// Stable sort of `input` into `output`; both may be the same path
    ///
    /// # Errors
    ///
    /// Returns a `CollectError` if a file cannot be read or written, or the
    /// sort program cannot be started.
    fn sort(&self, input: &Path, output: &Path) -> Result<(), CollectError>;

    /// Merge sorted `inputs` into `output`
    ///
    /// # Errors
    ///
    /// Returns a `CollectError` if a file cannot be read or written, or the
    /// sort program cannot be started.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CollectError>;

    fn name(&self) -> &'static str;
}

/// Build the provider selected by the configuration
pub fn provider_for(config: &IndexConfig) -> Box<dyn SortProvider> {
    match config.sort_provider {
        SortProviderKind::Builtin => Box::new(InProcessSorter::new(
            config.sort_chunk_lines,
            config.temp_dir(),
        )),
        SortProviderKind::System => Box::new(SystemSorter::new(&config.sort_options, config.temp_dir())),
    }
}

/// Stable in-process sort that spills sorted chunks to disk and merges them
#[derive(Debug, Clone)]
pub struct InProcessSorter {
    chunk_lines: usize,
    temp_dir: PathBuf,
}

impl InProcessSorter {
    pub fn new(chunk_lines: usize, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            chunk_lines: chunk_lines.max(1),
            temp_dir: temp_dir.into(),
        }
    }

    fn spill(&self, chunk: &mut Vec<String>) -> Result<BufReader<File>, CollectError> {
        sort_lines(chunk);
        let mut file = tempfile::tempfile_in(&self.temp_dir)?;
        {
            let mut writer = BufWriter::new(&mut file);
            for line in chunk.drain(..) {
                writeln!(writer, "{line}")?;
            }
            writer.flush()?;
        }
        file.seek(SeekFrom::Start(0))?;
        Ok(BufReader::new(file))
    }
}

impl SortProvider for InProcessSorter {
    fn sort(&self, input: &Path, output: &Path) -> Result<(), CollectError> {
        let reader = BufReader::new(File::open(input)?);
        let mut chunk = Vec::new();
        let mut spilled = Vec::new();

        for line in reader.lines() {
            chunk.push(line?);
            if chunk.len() >= self.chunk_lines {
                spilled.push(self.spill(&mut chunk)?);
            }
        }

        if spilled.is_empty() {
            sort_lines(&mut chunk);
            return write_lines(output, chunk);
        }
        if !chunk.is_empty() {
            spilled.push(self.spill(&mut chunk)?);
        }

        debug!(
            "{}: merging {} sorted chunks",
            input.display(),
            spilled.len()
        );
        merge_readers(spilled, output)
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CollectError> {
        let readers = inputs
            .iter()
            .map(|p| File::open(p).map(BufReader::new))
            .collect::<Result<Vec<_>, _>>()?;
        merge_readers(readers, output)
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

fn sort_lines(lines: &mut [String]) {
    lines.sort_by(|a, b| sort_key(a).cmp(sort_key(b)));
}

fn create(path: &Path) -> Result<BufWriter<File>, CollectError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| CollectError::Create {
            path: path.to_path_buf(),
            source,
        })
}

fn write_lines(output: &Path, lines: Vec<String>) -> Result<(), CollectError> {
    let mut writer = create(output)?;
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Next line of one merge input, with the input it came from
#[derive(Debug)]
struct MergeHead {
    line: String,
    source: usize,
}

impl PartialEq for MergeHead {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeHead {}

impl PartialOrd for MergeHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeHead {
    fn cmp(&self, other: &Self) -> Ordering {
        sort_key(&self.line)
            .cmp(sort_key(&other.line))
            .then(self.source.cmp(&other.source))
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, CollectError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// k-way merge of sorted readers into `output`
fn merge_readers<R: BufRead>(mut readers: Vec<R>, output: &Path) -> Result<(), CollectError> {
    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (source, reader) in readers.iter_mut().enumerate() {
        if let Some(line) = read_line(reader)? {
            heap.push(Reverse(MergeHead { line, source }));
        }
    }

    let mut writer = create(output)?;
    while let Some(Reverse(head)) = heap.pop() {
        writeln!(writer, "{}", head.line)?;
        if let Some(line) = read_line(&mut readers[head.source])? {
            heap.push(Reverse(MergeHead {
                line,
                source: head.source,
            }));
        }
    }
    writer.flush()?;
    Ok(())
}

/// Shells out to the system `sort` utility
#[derive(Debug, Clone)]
pub struct SystemSorter {
    program: String,
    options: Vec<String>,
    temp_dir: PathBuf,
}

impl SystemSorter {
    pub fn new(options: &str, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "sort".to_string(),
            options: options.split_whitespace().map(str::to_string).collect(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Use another program with `sort`-compatible arguments
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .env("LC_ALL", "C")
            .args(["-s", "-t", " ", "-k1,1", "-T"])
            .arg(&self.temp_dir)
            .args(&self.options);
        command
    }

    /// Run to completion; a failed exit is logged, not returned
    fn run(&self, mut command: Command) -> Result<(), CollectError> {
        debug!("Running {command:?}");
        let status = command.status().map_err(|source| CollectError::SortSpawn {
            program: self.program.clone(),
            source,
        })?;
        if !status.success() {
            warn!("{} exited with {status}", self.program);
        }
        Ok(())
    }
}

impl SortProvider for SystemSorter {
    fn sort(&self, input: &Path, output: &Path) -> Result<(), CollectError> {
        let mut command = self.command();
        command.arg("-o").arg(output).arg(input);
        self.run(command)
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CollectError> {
        let mut command = self.command();
        command.arg("-m").arg("-o").arg(output).args(inputs);
        self.run(command)
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut text = lines.join("\n");
        text.push('\n');
        std::fs::write(&path, text).unwrap();
        path
    }

    fn read(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    const UNSORTED: [&str; 7] = [
        "delta 1",
        "alpha 1",
        "charlie 1",
        "alpha 2",
        "bravo 1",
        "alpha 3",
        "Zulu 1",
    ];

    const SORTED: [&str; 7] = [
        "Zulu 1",
        "alpha 1",
        "alpha 2",
        "alpha 3",
        "bravo 1",
        "charlie 1",
        "delta 1",
    ];

    #[test]
    fn test_builtin_sort_single_chunk_in_place() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "x.list", &UNSORTED);

        InProcessSorter::new(100, dir.path()).sort(&path, &path).unwrap();
        assert_eq!(read(&path), SORTED);
    }

    #[test]
    fn test_builtin_sort_spills_chunks_and_stays_stable() {
        let dir = TempDir::new().unwrap();
        let input = write(dir.path(), "x.list", &UNSORTED);
        let output = dir.path().join("x.sorted");

        // two lines per chunk forces four spilled chunks
        InProcessSorter::new(2, dir.path()).sort(&input, &output).unwrap();
        assert_eq!(read(&output), SORTED);
    }

    #[test]
    fn test_builtin_merge_prefers_earlier_inputs() {
        let dir = TempDir::new().unwrap();
        let first = write(dir.path(), "01.list", &["a 1", "c 1"]);
        let second = write(dir.path(), "02.list", &["a 2", "b 2", "c 2"]);
        let output = dir.path().join("all");

        InProcessSorter::new(10, dir.path())
            .merge(&[first, second], &output)
            .unwrap();
        assert_eq!(read(&output), vec!["a 1", "a 2", "b 2", "c 1", "c 2"]);
    }

    #[test]
    fn test_builtin_sort_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, "").unwrap();

        InProcessSorter::new(10, dir.path()).sort(&path, &path).unwrap();
        assert!(read(&path).is_empty());
    }

    #[test]
    fn test_system_sort_matches_builtin() {
        if Command::new("sort").arg("--version").output().is_err() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "x.list", &UNSORTED);

        SystemSorter::new("", dir.path()).sort(&path, &path).unwrap();
        assert_eq!(read(&path), SORTED);
    }

    #[test]
    fn test_system_sort_spawn_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "x.list", &["a 1"]);

        let sorter = SystemSorter::new("", dir.path()).with_program("/nonexistent/seq-dbi-sort");
        assert!(matches!(
            sorter.sort(&path, &path),
            Err(CollectError::SortSpawn { .. })
        ));
    }

    #[test]
    fn test_provider_for_config() {
        use crate::core::types::SourceFormat;

        let mut config = IndexConfig::new("/data", "/index", SourceFormat::Embl, "embl");
        assert_eq!(provider_for(&config).name(), "builtin");
        config.sort_provider = SortProviderKind::System;
        assert_eq!(provider_for(&config).name(), "system");
    }
}
