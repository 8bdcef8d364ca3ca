//! Binary index file writer.
//!
//! Every index file starts with the same 300-byte header:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0   | 4   | total file size |
//! | 4   | 4   | record count |
//! | 8   | 2   | record size |
//! | 10  | 20  | database name, space padded |
//! | 30  | 10  | release tag, space padded |
//! | 40  | 4   | release date `[0, year - 1900, month, day]` |
//! | 44  | 256 | reserved, zero |
//!
//! followed by `count` fixed-size records. String fields inside records are
//! NUL padded. All integers use the byte order the writer is instantiated
//! with, independent of the host.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, WriteBytesExt};
use thiserror::Error;
use tracing::debug;

use crate::collect::CollectError;
use crate::core::config::ReleaseDate;
use crate::core::types::{IndexedEntry, ResolvedAccession, SourceFile};
use crate::utils::validation::{MAX_DB_NAME_LENGTH, MAX_RELEASE_LENGTH};

pub const DIVISION_FILE: &str = "division.lkp";
pub const ENTRY_NAME_FILE: &str = "entrynam.idx";
pub const ACCESSION_TARGET_FILE: &str = "acnum.trg";
pub const ACCESSION_HIT_FILE: &str = "acnum.hit";

pub const HEADER_SIZE: u64 = 300;
const RESERVED_SIZE: usize = 256;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Cannot create index file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{field} '{value}' does not fit in {width} bytes")]
    FieldTooLong {
        field: &'static str,
        value: String,
        width: usize,
    },

    #[error("Record size {0} does not fit in the header field")]
    RecordTooLarge(usize),

    #[error("Index file {file} would exceed the 32-bit size fields")]
    TooManyRecords { file: &'static str },

    #[error(transparent)]
    Collect(#[from] CollectError),
}

/// Fixed fields shared by all four headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub db_name: String,
    pub release: String,
    pub date: ReleaseDate,
}

/// Counts of records written to the accession files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessionCounts {
    pub targets: u32,
    pub hits: u32,
}

/// Writes the four index files into one directory
#[derive(Debug)]
pub struct IndexWriter<B> {
    dir: PathBuf,
    header: IndexHeader,
    order: PhantomData<B>,
}

impl<B: ByteOrder> IndexWriter<B> {
    /// # Errors
    ///
    /// Returns `WriteError::FieldTooLong` if the name or release does not fit
    /// its header field.
    pub fn new(dir: impl Into<PathBuf>, header: IndexHeader) -> Result<Self, WriteError> {
        check_width("database name", &header.db_name, MAX_DB_NAME_LENGTH)?;
        check_width("release", &header.release, MAX_RELEASE_LENGTH)?;
        Ok(Self {
            dir: dir.into(),
            header,
            order: PhantomData,
        })
    }

    fn open(&self, name: &'static str, record_size: usize) -> Result<RecordFile<B>, WriteError> {
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(|source| WriteError::Create {
            path: path.clone(),
            source,
        })?;
        let record_size = u16::try_from(record_size)
            .ok()
            .filter(|&s| i16::try_from(s).is_ok())
            .ok_or(WriteError::RecordTooLarge(record_size))?;

        let mut records = RecordFile {
            out: BufWriter::new(file),
            name,
            path,
            record_size,
            count: 0,
            order: PhantomData,
        };
        records.write_header(&self.header)?;
        Ok(records)
    }

    /// Division table: one `file number, file name` record per source file
    ///
    /// # Errors
    ///
    /// Returns a `WriteError` if the file cannot be written.
    pub fn write_division(&self, files: &[SourceFile], name_width: usize) -> Result<u32, WriteError> {
        let mut out = self.open(DIVISION_FILE, 2 + name_width)?;
        for file in files {
            out.begin_record()?;
            #[allow(clippy::cast_possible_wrap)] // file numbers are bounded by i16::MAX
            out.write_i16(file.number as i16)?;
            out.write_padded("file name", &file.file_name(), name_width)?;
        }
        out.finish()
    }

    /// Entry name index: one `id, record offset, sequence offset, file
    /// number` record per identifier, in rank order
    ///
    /// # Errors
    ///
    /// Returns a `WriteError` if the stream fails or the file cannot be written.
    pub fn write_entries<I>(&self, entries: I, id_width: usize) -> Result<u32, WriteError>
    where
        I: IntoIterator<Item = Result<IndexedEntry, CollectError>>,
    {
        let mut out = self.open(ENTRY_NAME_FILE, id_width + 10)?;
        for entry in entries {
            let entry = entry?;
            out.begin_record()?;
            out.write_padded("identifier", &entry.id, id_width)?;
            out.write_u32_field(entry.record_offset)?;
            out.write_u32_field(entry.sequence_offset)?;
            #[allow(clippy::cast_possible_wrap)] // file numbers are bounded by i16::MAX
            out.write_i16(entry.file_number as i16)?;
        }
        out.finish()
    }

    /// Accession target and hit files.
    ///
    /// The stream must be sorted by accession. Each run of equal accessions
    /// becomes one target record `hit count, first hit, accession`, and each
    /// member of the run one hit record holding its rank.
    ///
    /// # Errors
    ///
    /// Returns a `WriteError` if the stream fails or a file cannot be written.
    pub fn write_accessions<I>(&self, accessions: I, accession_width: usize) -> Result<AccessionCounts, WriteError>
    where
        I: IntoIterator<Item = Result<ResolvedAccession, CollectError>>,
    {
        let mut targets = self.open(ACCESSION_TARGET_FILE, accession_width + 8)?;
        let mut hits = self.open(ACCESSION_HIT_FILE, 4)?;

        let mut run: Option<(String, u32, u32)> = None;
        for resolved in accessions {
            let resolved = resolved?;
            let first = hits.count;
            hits.begin_record()?;
            hits.write_u32_field(resolved.rank)?;

            if let Some((accession, _, count)) = run.as_mut() {
                if *accession == resolved.accession {
                    *count += 1;
                    continue;
                }
            }
            if let Some((accession, first, count)) = run.take() {
                write_target(&mut targets, &accession, first, count, accession_width)?;
            }
            run = Some((resolved.accession, first, 1));
        }
        if let Some((accession, first, count)) = run {
            write_target(&mut targets, &accession, first, count, accession_width)?;
        }

        let hits = hits.finish()?;
        let targets = targets.finish()?;
        Ok(AccessionCounts { targets, hits })
    }
}

fn write_target<B: ByteOrder>(
    out: &mut RecordFile<B>,
    accession: &str,
    first: u32,
    count: u32,
    width: usize,
) -> Result<(), WriteError> {
    out.begin_record()?;
    out.write_u32_field(count)?;
    out.write_u32_field(first)?;
    out.write_padded("accession", accession, width)
}

fn check_width(field: &'static str, value: &str, width: usize) -> Result<(), WriteError> {
    if value.len() > width {
        return Err(WriteError::FieldTooLong {
            field,
            value: value.to_string(),
            width,
        });
    }
    Ok(())
}

/// One index file being written; the header is rewritten on finish once the
/// record count is known
struct RecordFile<B> {
    out: BufWriter<File>,
    name: &'static str,
    path: PathBuf,
    record_size: u16,
    count: u32,
    order: PhantomData<B>,
}

impl<B: ByteOrder> RecordFile<B> {
    fn write_header(&mut self, header: &IndexHeader) -> Result<(), WriteError> {
        let size = HEADER_SIZE + u64::from(self.count) * u64::from(self.record_size);
        let size = i32::try_from(size).map_err(|_| WriteError::TooManyRecords { file: self.name })?;
        let count = i32::try_from(self.count).map_err(|_| WriteError::TooManyRecords { file: self.name })?;

        self.out.write_i32::<B>(size)?;
        self.out.write_i32::<B>(count)?;
        #[allow(clippy::cast_possible_wrap)] // checked against i16 on open
        self.out.write_i16::<B>(self.record_size as i16)?;
        write_field(&mut self.out, &header.db_name, MAX_DB_NAME_LENGTH, b' ')?;
        write_field(&mut self.out, &header.release, MAX_RELEASE_LENGTH, b' ')?;
        self.out.write_all(&header.date.to_bytes())?;
        self.out.write_all(&[0u8; RESERVED_SIZE])?;
        Ok(())
    }

    fn begin_record(&mut self) -> Result<(), WriteError> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(WriteError::TooManyRecords { file: self.name })?;
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> Result<(), WriteError> {
        self.out.write_i16::<B>(value)?;
        Ok(())
    }

    /// Offsets, counts and ranks are stored in signed 32-bit fields
    fn write_u32_field(&mut self, value: u32) -> Result<(), WriteError> {
        #[allow(clippy::cast_possible_wrap)] // same bit pattern, readers treat it as unsigned
        self.out.write_i32::<B>(value as i32)?;
        Ok(())
    }

    fn write_padded(&mut self, field: &'static str, value: &str, width: usize) -> Result<(), WriteError> {
        check_width(field, value, width)?;
        write_field(&mut self.out, value, width, 0)?;
        Ok(())
    }

    /// Rewrite the size and count fields and return the record count
    fn finish(mut self) -> Result<u32, WriteError> {
        self.out.seek(SeekFrom::Start(0))?;
        let size = HEADER_SIZE + u64::from(self.count) * u64::from(self.record_size);
        let size = i32::try_from(size).map_err(|_| WriteError::TooManyRecords { file: self.name })?;
        self.out.write_i32::<B>(size)?;
        #[allow(clippy::cast_possible_wrap)] // size fits, so the count does too
        self.out.write_i32::<B>(self.count as i32)?;
        self.out.flush()?;
        debug!(
            "Wrote {} records of {} bytes to {}",
            self.count,
            self.record_size,
            self.path.display()
        );
        Ok(self.count)
    }
}

fn write_field<W: Write>(out: &mut W, value: &str, width: usize, pad: u8) -> std::io::Result<()> {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    out.write_all(&bytes[..len])?;
    for _ in len..width {
        out.write_u8(pad)?;
    }
    Ok(())
}

/// Paths of the four index files in `dir`
pub fn index_files(dir: &Path) -> [PathBuf; 4] {
    [
        dir.join(DIVISION_FILE),
        dir.join(ENTRY_NAME_FILE),
        dir.join(ACCESSION_TARGET_FILE),
        dir.join(ACCESSION_HIT_FILE),
    ]
}
