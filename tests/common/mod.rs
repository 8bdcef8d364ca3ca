//! Shared fixtures and an index file reader for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use seq_dbi::{IndexConfig, SourceFormat};

/// Two EMBL division files: one duplicate identifier (`ALPHA`), three
/// records with two accessions and one record with none
pub const DIVISION_A: &str = "\
ID   DELTA; SV 1; linear; DNA; STD; HUM; 10 BP.
AC   P4; P1;
SQ   Sequence 10 BP;
     acgtacgtac                                                          10
//
ID   ALPHA; SV 1; linear; DNA; STD; HUM; 10 BP.
AC   P1; P2;
//
ID   GAMMA; SV 1; linear; DNA; STD; HUM; 10 BP.
DE   No accession line
//
";

pub const DIVISION_B: &str = "\
ID   BETA; SV 1; linear; DNA; STD; HUM; 10 BP.
AC   P3; P2;
//
ID   ALPHA; SV 2; linear; DNA; STD; HUM; 12 BP.
AC   P9;
//
";

pub const RELEASE_DATE: &str = "2024-03-15";

/// Write `files` into `<root>/src` and return a config indexing them into
/// `<root>/<index>`
pub fn flat_fixture(root: &Path, index: &str, files: &[(&str, &str)]) -> IndexConfig {
    let src = root.join("src");
    std::fs::create_dir_all(&src).unwrap();
    for (name, text) in files {
        std::fs::write(src.join(name), text).unwrap();
    }
    let mut config = IndexConfig::new(src, root.join(index), SourceFormat::Embl, "testdb");
    config.wildcard = "*.dat".to_string();
    config.release = "1.0".to_string();
    config.date = Some(RELEASE_DATE.to_string());
    config
}

/// Write a version 2 protein BLAST database (big-endian table) with one
/// record per header and return the table file path
pub fn blast2_protein(dir: &Path, base: &str, headers: &[&str]) -> PathBuf {
    let n = u32::try_from(headers.len()).unwrap();
    let title = b"integration";
    let date = b"Jan 1, 2024";

    let mut table = Vec::new();
    table.write_u32::<BigEndian>(3).unwrap();
    table.write_u32::<BigEndian>(1).unwrap();
    table.write_u32::<BigEndian>(title.len() as u32).unwrap();
    table.extend_from_slice(title);
    table.write_u32::<BigEndian>(date.len() as u32).unwrap();
    table.extend_from_slice(date);
    table.write_u32::<BigEndian>(n).unwrap();
    table.write_u64::<BigEndian>(u64::from(n) * 10).unwrap();
    table.write_u32::<BigEndian>(10).unwrap();

    let mut offset = 0u32;
    table.write_u32::<BigEndian>(offset).unwrap();
    for header in headers {
        offset += header.len() as u32;
        table.write_u32::<BigEndian>(offset).unwrap();
    }
    for i in 0..=n {
        table.write_u32::<BigEndian>(i * 10).unwrap();
    }

    let path = dir.join(format!("{base}.pin"));
    std::fs::write(&path, table).unwrap();
    std::fs::write(dir.join(format!("{base}.phr")), headers.concat()).unwrap();
    std::fs::write(dir.join(format!("{base}.psq")), vec![0u8; headers.len() * 10]).unwrap();
    path
}

/// One index file split into header fields and raw records
#[derive(Debug)]
pub struct IndexFile {
    pub size: i32,
    pub count: i32,
    pub record_size: i16,
    pub db_name: String,
    pub release: String,
    pub date: [u8; 4],
    pub records: Vec<Vec<u8>>,
    big_endian: bool,
}

impl IndexFile {
    pub fn read(path: &Path) -> Self {
        Self::read_with(path, false)
    }

    pub fn read_with(path: &Path, big_endian: bool) -> Self {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.len() >= 300, "{} is shorter than its header", path.display());

        let i32_at = |at: usize| {
            if big_endian {
                BigEndian::read_i32(&bytes[at..at + 4])
            } else {
                LittleEndian::read_i32(&bytes[at..at + 4])
            }
        };
        let size = i32_at(0);
        let count = i32_at(4);
        let record_size = if big_endian {
            BigEndian::read_i16(&bytes[8..10])
        } else {
            LittleEndian::read_i16(&bytes[8..10])
        };

        assert_eq!(size as usize, bytes.len(), "size field of {}", path.display());
        let width = record_size as usize;
        let records = bytes[300..].chunks(width.max(1)).map(<[u8]>::to_vec).collect::<Vec<_>>();
        if width > 0 {
            assert_eq!(records.len(), count as usize, "record count of {}", path.display());
        }

        Self {
            size,
            count,
            record_size,
            db_name: String::from_utf8_lossy(&bytes[10..30]).trim_end().to_string(),
            release: String::from_utf8_lossy(&bytes[30..40]).trim_end().to_string(),
            date: [bytes[40], bytes[41], bytes[42], bytes[43]],
            records,
            big_endian,
        }
    }

    fn i32(&self, field: &[u8]) -> i32 {
        if self.big_endian {
            BigEndian::read_i32(field)
        } else {
            LittleEndian::read_i32(field)
        }
    }

    fn i16(&self, field: &[u8]) -> i16 {
        if self.big_endian {
            BigEndian::read_i16(field)
        } else {
            LittleEndian::read_i16(field)
        }
    }
}

fn text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec()).unwrap()
}

/// Decoded contents of an index directory
#[derive(Debug)]
pub struct Index {
    pub divisions: Vec<(i16, String)>,
    pub entries: Vec<EntryRecord>,
    pub targets: Vec<TargetRecord>,
    pub hits: Vec<i32>,
    pub headers: Vec<IndexFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub id: String,
    pub record_offset: i32,
    pub sequence_offset: i32,
    pub file_number: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    pub hit_count: i32,
    pub first_hit: i32,
    pub accession: String,
}

impl Index {
    pub fn read(dir: &Path) -> Self {
        Self::read_with(dir, false)
    }

    pub fn read_with(dir: &Path, big_endian: bool) -> Self {
        let division = IndexFile::read_with(&dir.join("division.lkp"), big_endian);
        let entrynam = IndexFile::read_with(&dir.join("entrynam.idx"), big_endian);
        let trg = IndexFile::read_with(&dir.join("acnum.trg"), big_endian);
        let hit = IndexFile::read_with(&dir.join("acnum.hit"), big_endian);

        let divisions = division
            .records
            .iter()
            .map(|r| (division.i16(&r[..2]), text(&r[2..])))
            .collect();
        let entries = entrynam
            .records
            .iter()
            .map(|r| {
                let id_width = r.len() - 10;
                EntryRecord {
                    id: text(&r[..id_width]),
                    record_offset: entrynam.i32(&r[id_width..id_width + 4]),
                    sequence_offset: entrynam.i32(&r[id_width + 4..id_width + 8]),
                    file_number: entrynam.i16(&r[id_width + 8..]),
                }
            })
            .collect();
        let targets = trg
            .records
            .iter()
            .map(|r| TargetRecord {
                hit_count: trg.i32(&r[..4]),
                first_hit: trg.i32(&r[4..8]),
                accession: text(&r[8..]),
            })
            .collect();
        let hits = hit.records.iter().map(|r| hit.i32(r)).collect();

        Self {
            divisions,
            entries,
            targets,
            hits,
            headers: vec![division, entrynam, trg, hit],
        }
    }

    /// Identifiers reachable from `accession` through the hit list
    pub fn lookup(&self, accession: &str) -> Vec<&str> {
        let Some(target) = self.targets.iter().find(|t| t.accession == accession) else {
            return Vec::new();
        };
        let first = target.first_hit as usize;
        self.hits[first..first + target.hit_count as usize]
            .iter()
            .map(|&rank| self.entries[rank as usize - 1].id.as_str())
            .collect()
    }
}

/// Bytes of every index file in `dir`, in a fixed order
pub fn index_bytes(dir: &Path) -> Vec<Vec<u8>> {
    ["division.lkp", "entrynam.idx", "acnum.trg", "acnum.hit"]
        .iter()
        .map(|name| std::fs::read(dir.join(name)).unwrap())
        .collect()
}
