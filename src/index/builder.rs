//! Index build pipeline.
//!
//! Source files are enumerated, read one at a time through their format
//! adapter, and handed entry by entry to the configured collector. Once every
//! file is consumed the sorted streams are written out as the four index
//! files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;
use tracing::{debug, info};

use super::report::BuildReport;
use super::writer::{AccessionCounts, IndexHeader, IndexWriter, WriteError};
use crate::collect::external::ExternalCollector;
use crate::collect::memory::MemoryCollector;
use crate::collect::sorter::provider_for;
use crate::collect::{CollectError, CollectedIndex, Collector};
use crate::core::config::{ConfigError, IndexByteOrder, IndexConfig, SortMode};
use crate::core::types::{Maxima, SourceFile, SourceFormat};
use crate::parsing::blast::table_extensions;
use crate::parsing::headers::extractor_for;
use crate::parsing::{open_source, ParseError};
use crate::source::{SourceEnumerator, SourceError};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Cannot create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Runs one indexing job
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Source files of the run, numbered from 1
    ///
    /// # Errors
    ///
    /// Returns a `BuildError::Source` if the directory cannot be read or
    /// nothing matches.
    pub fn enumerate(&self) -> Result<Vec<SourceFile>, BuildError> {
        let config = &self.config;
        let mut enumerator = SourceEnumerator::new(&config.directory, &config.wildcard)?;
        if let Some(exclude) = &config.exclude {
            enumerator = enumerator.exclude(exclude)?;
        }
        if config.format == SourceFormat::Blast {
            enumerator = enumerator
                .require_extensions(&table_extensions(config.blast_version, config.alphabet));
        }
        Ok(enumerator.list(config.format)?)
    }

    /// Build the index files
    ///
    /// # Errors
    ///
    /// Returns a `BuildError` for any fatal problem; nothing is retried.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let config = &self.config;
        config.validate()?;
        let date = config.release_date()?;

        let files = self.enumerate()?;
        info!(
            "Indexing {} {} file(s) from {}",
            files.len(),
            config.format,
            config.directory.display()
        );

        create_dir(&config.index_dir)?;
        if config.sort_mode == SortMode::External {
            create_dir(config.temp_dir())?;
        }

        let mut maxima = Maxima::with_floors(config.min_id_len, config.min_acc_len);
        for file in &files {
            maxima.observe_file(file);
        }

        let collected = self.collect(&files, &mut maxima)?;
        let stats = collected.stats;

        let header = IndexHeader {
            db_name: config.db_name.clone(),
            release: config.release.clone(),
            date,
        };
        let counts = match config.byte_order {
            IndexByteOrder::Little => {
                write_index::<LittleEndian>(&config.index_dir, header, &files, collected, &maxima)?
            }
            IndexByteOrder::Big => {
                write_index::<BigEndian>(&config.index_dir, header, &files, collected, &maxima)?
            }
        };

        info!(
            "Wrote {} identifiers and {} accessions to {}",
            stats.entries,
            counts.targets,
            config.index_dir.display()
        );

        Ok(BuildReport {
            db_name: config.db_name.clone(),
            release: config.release.clone(),
            format: config.format,
            sort_mode: config.sort_mode,
            index_dir: config.index_dir.clone(),
            files: files.iter().map(SourceFile::file_name).collect(),
            entries: stats.entries,
            duplicates_dropped: stats.duplicates_dropped,
            accession_refs: stats.accession_refs,
            distinct_accessions: counts.targets,
            maxima,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    fn collect(&self, files: &[SourceFile], maxima: &mut Maxima) -> Result<CollectedIndex, BuildError> {
        let config = &self.config;
        let mut collector: Box<dyn Collector> = match config.sort_mode {
            SortMode::Memory => Box::new(MemoryCollector::new()),
            SortMode::External => Box::new(ExternalCollector::new(
                &config.db_name,
                config.temp_dir(),
                provider_for(config),
                config.keep_temp,
            )),
        };
        let mut extractor = extractor_for(config.convention);

        for file in files {
            info!("Reading {}", file.path().display());
            collector.begin_file(file)?;

            let mut source = open_source(file, config, extractor.as_mut())?;
            let mut count = 0usize;
            while let Some(entry) = source.next_entry()? {
                maxima.observe_entry(&entry);
                collector.add_entry(entry)?;
                count += 1;
            }

            collector.end_file()?;
            debug!("{}: {count} entries", file.file_name());
        }

        Ok(collector.finish()?)
    }
}

fn create_dir(path: &Path) -> Result<(), BuildError> {
    std::fs::create_dir_all(path).map_err(|source| BuildError::Directory {
        path: path.to_path_buf(),
        source,
    })
}

fn write_index<B: ByteOrder>(
    dir: &Path,
    header: IndexHeader,
    files: &[SourceFile],
    collected: CollectedIndex,
    maxima: &Maxima,
) -> Result<AccessionCounts, WriteError> {
    let writer = IndexWriter::<B>::new(dir, header)?;
    writer.write_division(files, maxima.file_name_len)?;
    writer.write_entries(collected.entries, maxima.id_len)?;
    writer.write_accessions(collected.accessions, maxima.accession_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::writer::index_files;
    use tempfile::TempDir;

    const EMBL: &str = "\
ID   B0001; SV 1; linear; DNA; STD; HUM; 10 BP.
AC   P00002; P00001;
//
ID   A0001; SV 1; linear; DNA; STD; HUM; 10 BP.
AC   P00003;
//
";

    fn config(dir: &Path) -> IndexConfig {
        let mut config = IndexConfig::new(dir.join("src"), dir.join("index"), SourceFormat::Embl, "test");
        config.wildcard = "*.dat".to_string();
        config.date = Some("2024-01-02".to_string());
        config
    }

    #[test]
    fn test_run_embl() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/one.dat"), EMBL).unwrap();

        let report = IndexBuilder::new(config(dir.path())).run().unwrap();
        assert_eq!(report.files, vec!["one.dat"]);
        assert_eq!(report.entries, 2);
        assert_eq!(report.accession_refs, 3);
        assert_eq!(report.distinct_accessions, 3);
        assert_eq!(report.maxima.id_len, 5);
        assert_eq!(report.maxima.accession_len, 6);
        for path in index_files(&dir.path().join("index")) {
            assert!(path.is_file(), "missing {}", path.display());
        }
    }

    #[test]
    fn test_floors_widen_records() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/one.dat"), EMBL).unwrap();

        let mut config = config(dir.path());
        config.min_id_len = 20;
        let report = IndexBuilder::new(config).run().unwrap();
        assert_eq!(report.maxima.id_len, 20);

        let entrynam = std::fs::read(dir.path().join("index/entrynam.idx")).unwrap();
        assert_eq!(entrynam.len(), 300 + 2 * 30);
    }

    #[test]
    fn test_blast_enumeration_lists_table_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        for name in ["nr.pin", "nr.phr", "nr.psq", "nt.nin", "est.ntb"] {
            std::fs::write(src.join(name), b"").unwrap();
        }

        let mut config = config(dir.path());
        config.format = SourceFormat::Blast;
        config.wildcard = "*".to_string();
        let names: Vec<_> = IndexBuilder::new(config.clone())
            .enumerate()
            .unwrap()
            .iter()
            .map(SourceFile::file_name)
            .collect();
        assert_eq!(names, vec!["est.ntb", "nr.pin", "nt.nin"]);

        config.blast_version = Some(crate::core::config::BlastVersion::Blast2);
        config.alphabet = Some(crate::core::config::Alphabet::Protein);
        let files = IndexBuilder::new(config).enumerate().unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let result = IndexBuilder::new(config(dir.path())).run();
        assert!(matches!(result, Err(BuildError::Source(SourceError::NoMatches { .. }))));

        std::fs::write(dir.path().join("src/bad.dat"), "ID   X1;\nAC   A1;\n").unwrap();
        let result = IndexBuilder::new(config(dir.path())).run();
        assert!(matches!(
            result,
            Err(BuildError::Parse(ParseError::TruncatedRecord { .. }))
        ));

        let mut bad = config(dir.path());
        bad.db_name = String::new();
        assert!(matches!(
            IndexBuilder::new(bad).run(),
            Err(BuildError::Config(_))
        ));
    }
}
