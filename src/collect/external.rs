//! External sort-merge collection mode.
//!
//! Only the intermediate files live on disk; no more than one line per
//! merge input is held in memory. With database name `db` the stages are:
//!
//! 1. per source file `NN`: `dbNN.list` (`id recoff seqoff filenum`) and
//!    `dbNN.acid` (`id acc`), each sorted once the file is complete
//! 2. all `.list` files merged into `db.idsrt`, all `.acid` files into
//!    `db.acsrt`
//! 3. one cross-referencing pass over both writes `db.acid2` (`acc rank`)
//! 4. `db.acid2` sorted by accession into `db.acsrt2`
//!
//! Files of a stage are removed once the next stage has consumed them, and
//! the final two once the index writer is done with them, unless
//! intermediate files are kept. A collector dropped before `finish`
//! completes removes whatever intermediate files it has written.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::sorter::SortProvider;
use super::xref::CrossReferencer;
use super::{CollectError, CollectStats, CollectedIndex, Collector, UniqueEntries};
use crate::core::types::{AccessionRef, Entry, IndexedEntry, ResolvedAccession, SourceFile};

struct FileSpill {
    list_path: PathBuf,
    acid_path: PathBuf,
    list: BufWriter<File>,
    acid: BufWriter<File>,
}

pub struct ExternalCollector {
    db_name: String,
    temp_dir: PathBuf,
    sorter: Box<dyn SortProvider>,
    keep_temp: bool,
    current: Option<FileSpill>,
    lists: Vec<PathBuf>,
    acids: Vec<PathBuf>,
    accession_refs: usize,
    /// Set once the final files have been handed to the index writer
    finished: bool,
}

impl ExternalCollector {
    pub fn new(
        db_name: impl Into<String>,
        temp_dir: impl Into<PathBuf>,
        sorter: Box<dyn SortProvider>,
        keep_temp: bool,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            temp_dir: temp_dir.into(),
            sorter,
            keep_temp,
            current: None,
            lists: Vec::new(),
            acids: Vec::new(),
            accession_refs: 0,
            finished: false,
        }
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.temp_dir.join(format!("{}{suffix}", self.db_name))
    }

    fn remove(&self, paths: &[PathBuf]) {
        if !self.keep_temp {
            remove_files(paths);
        }
    }

    /// Merge per-file lists and accession files and remove them
    fn merge_stage(&mut self) -> Result<(PathBuf, PathBuf), CollectError> {
        let idsrt = self.path(".idsrt");
        let acsrt = self.path(".acsrt");
        debug!(
            "Merging {} identifier files with the {} sorter",
            self.lists.len(),
            self.sorter.name()
        );
        self.sorter.merge(&self.lists, &idsrt)?;
        self.sorter.merge(&self.acids, &acsrt)?;

        let merged: Vec<PathBuf> = self.lists.drain(..).chain(self.acids.drain(..)).collect();
        self.remove(&merged);
        Ok((idsrt, acsrt))
    }

    /// Resolve accession owners to ranks, writing `acc rank` lines
    fn cross_reference(&self, idsrt: &Path, acsrt: &Path) -> Result<(PathBuf, CollectStats), CollectError> {
        let acid2 = self.path(".acid2");
        let mut out = create(&acid2)?;

        let mut unique = UniqueEntries::new(read_records(idsrt, parse_list_line)?);
        let refs = read_records(acsrt, parse_acid_line)?;
        {
            let ids = unique.by_ref().map(|e| e.map(|e| e.id));
            for resolved in CrossReferencer::new(ids, refs) {
                let resolved = resolved?;
                writeln!(out, "{} {}", resolved.accession, resolved.rank)?;
            }
        }
        for entry in unique.by_ref() {
            entry?;
        }
        out.flush()?;

        let stats = CollectStats {
            entries: unique.kept(),
            duplicates_dropped: unique.dropped(),
            accession_refs: self.accession_refs,
        };
        self.remove(&[acsrt.to_path_buf()]);
        Ok((acid2, stats))
    }
}

impl Collector for ExternalCollector {
    fn begin_file(&mut self, file: &SourceFile) -> Result<(), CollectError> {
        if self.current.is_some() {
            self.end_file()?;
        }
        let list_path = self.path(&format!("{:02}.list", file.number));
        let acid_path = self.path(&format!("{:02}.acid", file.number));
        debug!("Spilling {} to {}", file.file_name(), list_path.display());

        self.current = Some(FileSpill {
            list: create(&list_path)?,
            acid: create(&acid_path)?,
            list_path,
            acid_path,
        });
        Ok(())
    }

    fn add_entry(&mut self, entry: Entry) -> Result<(), CollectError> {
        let spill = self.current.as_mut().ok_or(CollectError::NoActiveFile)?;
        writeln!(
            spill.list,
            "{} {} {} {}",
            entry.id, entry.record_offset, entry.sequence_offset, entry.file_number
        )?;
        for accession in &entry.accessions {
            writeln!(spill.acid, "{} {accession}", entry.id)?;
        }
        self.accession_refs += entry.accessions.len();
        Ok(())
    }

    fn end_file(&mut self) -> Result<(), CollectError> {
        let Some(mut spill) = self.current.take() else {
            return Ok(());
        };
        spill.list.flush()?;
        spill.acid.flush()?;
        drop(spill.list);
        drop(spill.acid);

        self.sorter.sort(&spill.list_path, &spill.list_path)?;
        self.sorter.sort(&spill.acid_path, &spill.acid_path)?;
        self.lists.push(spill.list_path);
        self.acids.push(spill.acid_path);
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<CollectedIndex, CollectError> {
        self.end_file()?;

        let (idsrt, acsrt) = self.merge_stage()?;
        let (acid2, stats) = self.cross_reference(&idsrt, &acsrt)?;

        let acsrt2 = self.path(".acsrt2");
        self.sorter.sort(&acid2, &acsrt2)?;
        self.remove(&[acid2]);

        info!(
            "Sort-merge complete: {} identifiers ({} duplicates dropped), {} accession refs",
            stats.entries, stats.duplicates_dropped, stats.accession_refs
        );

        let entries = UniqueEntries::quiet(read_records(&idsrt, parse_list_line)?);
        let accessions = read_records(&acsrt2, parse_acid2_line)?;
        self.finished = true;
        Ok(CollectedIndex {
            entries: Box::new(RemoveWhenDone::new(entries, idsrt, self.keep_temp)),
            accessions: Box::new(RemoveWhenDone::new(accessions, acsrt2, self.keep_temp)),
            stats,
        })
    }
}

impl Drop for ExternalCollector {
    fn drop(&mut self) {
        if self.keep_temp || self.finished {
            return;
        }
        let mut paths: Vec<PathBuf> = self.lists.drain(..).chain(self.acids.drain(..)).collect();
        if let Some(spill) = self.current.take() {
            paths.push(spill.list_path);
            paths.push(spill.acid_path);
        }
        paths.extend([".idsrt", ".acsrt", ".acid2", ".acsrt2"].map(|suffix| self.path(suffix)));
        paths.retain(|path| path.is_file());
        if !paths.is_empty() {
            debug!("Removing {} intermediate files of an unfinished run", paths.len());
            remove_files(&paths);
        }
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, CollectError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| CollectError::Create {
            path: path.to_path_buf(),
            source,
        })
}

fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Cannot remove intermediate file {}: {e}", path.display());
        }
    }
}

/// Parsed records of an intermediate file, in file order
fn read_records<T, F>(
    path: &Path,
    parse: F,
) -> Result<impl Iterator<Item = Result<T, CollectError>> + 'static, CollectError>
where
    T: 'static,
    F: Fn(&str) -> Option<T> + 'static,
{
    let reader = BufReader::new(File::open(path)?);
    let path = path.to_path_buf();
    Ok(reader.lines().enumerate().map(move |(index, line)| {
        let text = line?;
        parse(&text).ok_or_else(|| CollectError::MalformedLine {
            path: path.clone(),
            line: index + 1,
            text,
        })
    }))
}

/// `id recoff seqoff filenum`
fn parse_list_line(text: &str) -> Option<IndexedEntry> {
    let mut fields = text.split(' ');
    let id = fields.next().filter(|f| !f.is_empty())?;
    let record_offset = fields.next()?.parse().ok()?;
    let sequence_offset = fields.next()?.parse().ok()?;
    let file_number = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(IndexedEntry {
        id: id.to_string(),
        record_offset,
        sequence_offset,
        file_number,
    })
}

/// `id acc`
fn parse_acid_line(text: &str) -> Option<AccessionRef> {
    let (id, accession) = text.split_once(' ')?;
    if id.is_empty() || accession.is_empty() || accession.contains(' ') {
        return None;
    }
    Some(AccessionRef {
        accession: accession.to_string(),
        id: id.to_string(),
    })
}

/// `acc rank`
fn parse_acid2_line(text: &str) -> Option<ResolvedAccession> {
    let (accession, rank) = text.split_once(' ')?;
    if accession.is_empty() {
        return None;
    }
    Some(ResolvedAccession {
        accession: accession.to_string(),
        rank: rank.parse().ok()?,
    })
}

/// Removes the file behind a stream once the stream is dropped
struct RemoveWhenDone<I> {
    inner: I,
    path: PathBuf,
    keep: bool,
}

impl<I> RemoveWhenDone<I> {
    fn new(inner: I, path: PathBuf, keep: bool) -> Self {
        Self { inner, path, keep }
    }
}

impl<I: Iterator> Iterator for RemoveWhenDone<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> Drop for RemoveWhenDone<I> {
    fn drop(&mut self) {
        if !self.keep {
            remove_files(std::slice::from_ref(&self.path));
        }
    }
}
