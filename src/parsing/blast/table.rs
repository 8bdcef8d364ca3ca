//! Reader for the fixed-layout table file of a packed BLAST database.
//!
//! The table file starts with a header describing the database, followed by
//! `record_count + 1` 32-bit offsets per sub-table. Two layouts exist:
//!
//! | Field | `blast1` | `blast2` |
//! |-------|----------|----------|
//! | first word | magic `0x0BDB0001` | format version `3` |
//! | sequence type | 1 = protein, 0 = nucleotide | same |
//! | title | length + text, padded to 4 bytes | length + text |
//! | date | - | length + text |
//! | record count | 4 bytes | 4 bytes |
//! | total residues | 4 bytes | 8 bytes |
//! | max entry length | 4 bytes | 4 bytes |
//! | line length, ambiguity table size | nucleotide only | - |
//! | offset tables | sequence, source (nucleotide), header | header, sequence, ambiguity (nucleotide) |
//!
//! Integers use the byte order of the machine that wrote the database; it is
//! detected from the first word and applied to every later read.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use super::BlastError;
use crate::core::config::{Alphabet, BlastVersion};

/// First word of a `blast1` table file
pub const BLAST1_MAGIC: u32 = 0x0BDB_0001;

/// Format version word of a `blast2` table file
pub const BLAST2_FORMAT_VERSION: u32 = 3;

/// Offsets held in memory at once while paging through an offset table
pub const OFFSET_WINDOW: usize = 1024;

const OFFSET_SIZE: u64 = 4;

/// Byte order a database was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileByteOrder {
    Big,
    Little,
}

impl FileByteOrder {
    /// Detect the byte order from a first word that must equal `expected`
    fn detect(word: [u8; 4], expected: u32) -> Option<Self> {
        if BigEndian::read_u32(&word) == expected {
            Some(Self::Big)
        } else if LittleEndian::read_u32(&word) == expected {
            Some(Self::Little)
        } else {
            None
        }
    }

    fn read_u32<R: Read>(self, reader: &mut R) -> io::Result<u32> {
        match self {
            Self::Big => reader.read_u32::<BigEndian>(),
            Self::Little => reader.read_u32::<LittleEndian>(),
        }
    }

    fn read_u64<R: Read>(self, reader: &mut R) -> io::Result<u64> {
        match self {
            Self::Big => reader.read_u64::<BigEndian>(),
            Self::Little => reader.read_u64::<LittleEndian>(),
        }
    }

    fn decode_u32s(self, bytes: &[u8], out: &mut [u32]) {
        match self {
            Self::Big => BigEndian::read_u32_into(bytes, out),
            Self::Little => LittleEndian::read_u32_into(bytes, out),
        }
    }
}

/// Decoded table header with the absolute positions of its offset tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlastTable {
    pub version: BlastVersion,
    pub alphabet: Alphabet,
    pub byte_order: FileByteOrder,
    pub title: String,
    pub date: Option<String>,
    pub record_count: u32,
    pub total_residues: u64,
    pub max_entry_length: u32,
    pub line_length: Option<u32>,
    pub ambiguity_table_size: Option<u32>,
    pub sequence_offsets_at: u64,
    pub source_offsets_at: Option<u64>,
    pub header_offsets_at: u64,
    pub ambiguity_offsets_at: Option<u64>,
}

impl BlastTable {
    /// Read and check the header of a table file
    ///
    /// # Errors
    ///
    /// Returns `BlastError` if the first word does not identify the layout,
    /// the sequence type is unknown, or the file is too short for its tables.
    pub fn read<R: Read + Seek>(reader: &mut R, version: BlastVersion) -> Result<Self, BlastError> {
        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;

        let expected = match version {
            BlastVersion::Blast1 => BLAST1_MAGIC,
            BlastVersion::Blast2 => BLAST2_FORMAT_VERSION,
        };
        let order = FileByteOrder::detect(word, expected).ok_or(BlastError::BadMagic {
            version,
            word: BigEndian::read_u32(&word),
        })?;

        let alphabet = match order.read_u32(reader)? {
            1 => Alphabet::Protein,
            0 => Alphabet::Nucleotide,
            other => return Err(BlastError::UnknownSequenceType(other)),
        };

        let title = match version {
            BlastVersion::Blast1 => read_padded_string(reader, order)?,
            BlastVersion::Blast2 => read_string(reader, order)?,
        };
        let date = match version {
            BlastVersion::Blast1 => None,
            BlastVersion::Blast2 => Some(read_string(reader, order)?),
        };

        let record_count = order.read_u32(reader)?;
        let total_residues = match version {
            BlastVersion::Blast1 => u64::from(order.read_u32(reader)?),
            BlastVersion::Blast2 => order.read_u64(reader)?,
        };
        let max_entry_length = order.read_u32(reader)?;

        let (line_length, ambiguity_table_size) =
            if version == BlastVersion::Blast1 && alphabet == Alphabet::Nucleotide {
                (Some(order.read_u32(reader)?), Some(order.read_u32(reader)?))
            } else {
                (None, None)
            };

        let start = reader.stream_position()?;
        let table_bytes = (u64::from(record_count) + 1) * OFFSET_SIZE;
        let nucleotide = alphabet == Alphabet::Nucleotide;

        let mut next = start;
        let mut take = || {
            let at = next;
            next += table_bytes;
            at
        };

        let (sequence_offsets_at, source_offsets_at, header_offsets_at, ambiguity_offsets_at) =
            match version {
                BlastVersion::Blast1 => {
                    let sequence = take();
                    let source = nucleotide.then(&mut take);
                    let header = take();
                    (sequence, source, header, None)
                }
                BlastVersion::Blast2 => {
                    let header = take();
                    let sequence = take();
                    let ambiguity = nucleotide.then(&mut take);
                    (sequence, None, header, ambiguity)
                }
            };

        let needed = next;
        let actual = reader.seek(SeekFrom::End(0))?;
        if actual < needed {
            return Err(BlastError::TableTruncated { needed, actual });
        }

        Ok(Self {
            version,
            alphabet,
            byte_order: order,
            title,
            date,
            record_count,
            total_residues,
            max_entry_length,
            line_length,
            ambiguity_table_size,
            sequence_offsets_at,
            source_offsets_at,
            header_offsets_at,
            ambiguity_offsets_at,
        })
    }

    /// Pager over the header offset table
    pub fn header_offsets(&self) -> OffsetPager {
        OffsetPager::new(self.header_offsets_at, self.record_count + 1, self.byte_order)
    }
}

fn read_string<R: Read>(reader: &mut R, order: FileByteOrder) -> Result<String, BlastError> {
    let len = order.read_u32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).trim_end_matches('\0').to_string())
}

fn read_padded_string<R: Read>(reader: &mut R, order: FileByteOrder) -> Result<String, BlastError> {
    let len = order.read_u32(reader)? as usize;
    let padded = len.div_ceil(4) * 4;
    let mut buf = vec![0u8; padded];
    reader.read_exact(&mut buf)?;
    buf.truncate(len);
    Ok(String::from_utf8_lossy(&buf).trim_end_matches('\0').to_string())
}

/// Random access to an offset table through a fixed-size window.
///
/// At most [`OFFSET_WINDOW`] offsets are decoded at a time, so memory use is
/// independent of the record count.
#[derive(Debug)]
pub struct OffsetPager {
    table_at: u64,
    len: u32,
    order: FileByteOrder,
    window_start: u32,
    window: Vec<u32>,
    raw: Vec<u8>,
}

impl OffsetPager {
    pub fn new(table_at: u64, len: u32, order: FileByteOrder) -> Self {
        Self {
            table_at,
            len,
            order,
            window_start: 0,
            window: Vec::new(),
            raw: Vec::new(),
        }
    }

    /// Offset at `index`, loading a new window when it is not resident
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::InvalidInput` if `index` is past the table,
    /// or any read error.
    pub fn get<R: Read + Seek>(&mut self, reader: &mut R, index: u32) -> io::Result<u32> {
        if index >= self.len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("offset index {index} past table of {}", self.len),
            ));
        }

        let resident = index >= self.window_start
            && ((index - self.window_start) as usize) < self.window.len();
        if !resident {
            self.load(reader, index)?;
        }
        Ok(self.window[(index - self.window_start) as usize])
    }

    fn load<R: Read + Seek>(&mut self, reader: &mut R, start: u32) -> io::Result<()> {
        let count = OFFSET_WINDOW.min((self.len - start) as usize);
        reader.seek(SeekFrom::Start(self.table_at + u64::from(start) * OFFSET_SIZE))?;

        self.raw.resize(count * OFFSET_SIZE as usize, 0);
        reader.read_exact(&mut self.raw)?;

        self.window.resize(count, 0);
        self.order.decode_u32s(&self.raw, &mut self.window);
        self.window_start = start;
        Ok(())
    }

    /// Number of resident offsets
    pub fn resident(&self) -> usize {
        self.window.len()
    }
}
