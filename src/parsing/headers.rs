//! Header extraction strategies.
//!
//! A header extractor turns the raw header text of one record into a primary
//! identifier and zero or more accessions. One strategy is chosen per run from
//! the configured [`HeaderConvention`]:
//!
//! | Convention | Example header | Identifier | Accessions |
//! |------------|----------------|------------|------------|
//! | `ncbi`   | `gi\|12345\|sp\|P69905\|HBA_HUMAN Hemoglobin` | `HBA_HUMAN` | `P69905` |
//! | `gcg`    | `HBA_HUMAN p69905 Hemoglobin alpha`       | `HBA_HUMAN` | `P69905` |
//! | `simple` | `HBA_HUMAN Hemoglobin alpha`              | `HBA_HUMAN` | none |
//!
//! Under `ncbi` every identifier gets exactly one accession slot: when the
//! defline carries none, a synthetic `ZZnnnnnnn` accession is minted.
//!
//! Flat-file records (EMBL, Swiss-Prot, GenBank) use [`FlatRecordConvention`],
//! which reads the identifier and accession field lines of a record.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::core::config::HeaderConvention;
use crate::core::types::SourceFormat;

/// Namespace prefixes stripped before the defline is parsed, each followed by
/// one `|`-terminated value (e.g. `gi|12345|`)
const KNOWN_PREFIXES: [&str; 2] = ["gi", "ti"];

/// Prefix of minted accessions
const SYNTHETIC_PREFIX: &str = "ZZ";

static ACCESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]+[0-9]$").expect("valid accession pattern"));

static ACCESSION_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("valid accession run pattern"));

/// Identifier and accessions extracted from one header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    pub id: String,
    pub accessions: Vec<String>,
}

impl ParsedHeader {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            accessions: Vec::new(),
        }
    }
}

/// Strategy interface for header conventions
pub trait HeaderExtractor {
    /// Extract identifier and accessions, or `None` if the header does not
    /// follow the convention at all
    fn extract(&mut self, header: &str) -> Option<ParsedHeader>;

    fn convention(&self) -> HeaderConvention;
}

/// Build the extractor for a convention
pub fn extractor_for(convention: HeaderConvention) -> Box<dyn HeaderExtractor> {
    match convention {
        HeaderConvention::Ncbi => Box::new(NcbiHeader::new()),
        HeaderConvention::Gcg => Box::new(GcgHeader),
        HeaderConvention::Simple => Box::new(SimpleHeader),
    }
}

/// Strip `>` and surrounding whitespace from a header line
fn header_text(header: &str) -> &str {
    header.trim().trim_start_matches('>').trim_start()
}

/// NCBI-style deflines (`db|accession|name`)
#[derive(Debug, Default)]
pub struct NcbiHeader {
    synthetic_count: u32,
}

impl NcbiHeader {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_synthetic(&mut self) -> String {
        self.synthetic_count += 1;
        format!("{SYNTHETIC_PREFIX}{:07}", self.synthetic_count)
    }
}

impl HeaderExtractor for NcbiHeader {
    fn extract(&mut self, header: &str) -> Option<ParsedHeader> {
        let token = header_text(header).split_whitespace().next()?;
        let token = strip_known_prefixes(token);
        if token.is_empty() {
            return None;
        }

        let (id, accession) = parse_defline(token)?;
        let accession = accession.unwrap_or_else(|| self.next_synthetic());

        Some(ParsedHeader {
            id,
            accessions: vec![accession],
        })
    }

    fn convention(&self) -> HeaderConvention {
        HeaderConvention::Ncbi
    }
}

/// Remove any number of leading `gi|value|` / `ti|value|` groups.
///
/// A header that is only a prefix and its value (`gi|12345`) keeps the value.
fn strip_known_prefixes(mut token: &str) -> &str {
    loop {
        let Some((prefix, rest)) = token.split_once('|') else {
            return token;
        };
        if !KNOWN_PREFIXES.contains(&prefix.to_ascii_lowercase().as_str()) {
            return token;
        }
        match rest.split_once('|') {
            Some((_, remainder)) if !remainder.is_empty() => token = remainder,
            Some((value, _)) => return value,
            None => return rest,
        }
    }
}

/// Remove a trailing `.version` from an accession
fn strip_version(accession: &str) -> &str {
    match accession.rsplit_once('.') {
        Some((base, version)) if !base.is_empty() && version.chars().all(|c| c.is_ascii_digit()) => {
            base
        }
        _ => accession,
    }
}

fn non_empty(field: Option<&&str>) -> Option<String> {
    field.filter(|f| !f.is_empty()).map(|f| (*f).to_string())
}

/// Parse one NCBI defline token into identifier and optional accession
fn parse_defline(token: &str) -> Option<(String, Option<String>)> {
    let fields: Vec<&str> = token.split('|').collect();
    if fields.len() == 1 {
        return Some((token.to_string(), None));
    }

    let db = fields[0].to_ascii_lowercase();
    match db.as_str() {
        "gb" | "emb" | "dbj" | "ref" | "tpg" | "tpe" | "tpd" | "sp" | "tr" => {
            let accession = fields
                .get(1)
                .filter(|f| !f.is_empty())
                .map(|f| strip_version(f).to_string());
            let id = non_empty(fields.get(2)).or_else(|| accession.clone())?;
            Some((id, accession))
        }
        "pir" | "prf" => {
            let id = non_empty(fields.get(2)).or_else(|| non_empty(fields.get(1)))?;
            Some((id, None))
        }
        "pdb" => {
            let entry = non_empty(fields.get(1))?;
            let id = match non_empty(fields.get(2)) {
                Some(chain) => format!("{entry}_{chain}"),
                None => entry,
            };
            Some((id, None))
        }
        "lcl" | "gnl" | "bbs" | "pat" => {
            // last value names the entry
            let id = fields.iter().skip(1).rev().find(|f| !f.is_empty())?;
            Some(((*id).to_string(), None))
        }
        _ => Some((token.to_string(), None)),
    }
}

/// `ID ACC description`; the first accession-like token is upper-cased
#[derive(Debug, Default)]
pub struct GcgHeader;

impl HeaderExtractor for GcgHeader {
    fn extract(&mut self, header: &str) -> Option<ParsedHeader> {
        let mut tokens = header_text(header).split_whitespace();
        let mut parsed = ParsedHeader::new(tokens.next()?);

        match tokens.find(|t| ACCESSION_PATTERN.is_match(t)) {
            Some(acc) => parsed.accessions.push(acc.to_ascii_uppercase()),
            None => warn!("No accession found in header for {}", parsed.id),
        }

        Some(parsed)
    }

    fn convention(&self) -> HeaderConvention {
        HeaderConvention::Gcg
    }
}

/// First token is the identifier, nothing else is indexed
#[derive(Debug, Default)]
pub struct SimpleHeader;

impl HeaderExtractor for SimpleHeader {
    fn extract(&mut self, header: &str) -> Option<ParsedHeader> {
        header_text(header)
            .split_whitespace()
            .next()
            .map(ParsedHeader::new)
    }

    fn convention(&self) -> HeaderConvention {
        HeaderConvention::Simple
    }
}

/// Line codes of a flat-file record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRecordConvention {
    /// Code of the line that starts a record and names it
    pub id_code: &'static str,
    /// Code of the (repeatable) accession line
    pub accession_code: &'static str,
    /// Whether indented lines continue the previous accession line
    pub indented_continuation: bool,
}

/// Record terminator shared by all flat-file layouts
pub const END_OF_RECORD: &str = "//";

impl FlatRecordConvention {
    pub const EMBL: Self = Self {
        id_code: "ID",
        accession_code: "AC",
        indented_continuation: false,
    };

    pub const GENBANK: Self = Self {
        id_code: "LOCUS",
        accession_code: "ACCESSION",
        indented_continuation: true,
    };

    /// Layout for a flat-file format, `None` for formats without field lines
    pub fn for_format(format: SourceFormat) -> Option<Self> {
        match format {
            SourceFormat::Embl | SourceFormat::Swissprot => Some(Self::EMBL),
            SourceFormat::Genbank => Some(Self::GENBANK),
            SourceFormat::Fasta | SourceFormat::Blast => None,
        }
    }

    /// Value of a line with the given code, if the line has that code
    fn field<'a>(line: &'a str, code: &str) -> Option<&'a str> {
        let rest = line.strip_prefix(code)?;
        if rest.is_empty() {
            return Some(rest);
        }
        rest.starts_with(char::is_whitespace).then(|| rest.trim())
    }

    /// Whether a line starts a record
    pub fn is_start(&self, line: &str) -> bool {
        Self::field(line, self.id_code).is_some()
    }

    /// Whether a line carries accessions
    pub fn accession_field<'a>(&self, line: &'a str) -> Option<&'a str> {
        Self::field(line, self.accession_code)
    }

    /// Whether a line continues the previous field
    pub fn is_continuation(&self, line: &str) -> bool {
        self.indented_continuation && line.starts_with(char::is_whitespace) && !line.trim().is_empty()
    }

    /// Identifier named by a start line
    pub fn identifier(&self, line: &str) -> Option<String> {
        let value = Self::field(line, self.id_code)?;
        let token = value.split_whitespace().next()?;
        let token = token.trim_end_matches(';');
        (!token.is_empty()).then(|| token.to_string())
    }

    /// Split concatenated accession text into accessions.
    ///
    /// Every run of letters, digits and `_` is one accession; `;`, `.`,
    /// whitespace and anything else separate them. Version suffixes are
    /// dropped so `X56734.1` yields `X56734` (the trailing `1` is a version,
    /// not an accession).
    pub fn accessions(text: &str) -> Vec<String> {
        let mut accessions = Vec::new();
        for token in text.split(|c: char| c == ';' || c.is_whitespace()) {
            let token = strip_version(token);
            for run in ACCESSION_RUN.find_iter(token) {
                accessions.push(run.as_str().to_string());
            }
        }
        accessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ncbi(header: &str) -> Option<ParsedHeader> {
        NcbiHeader::new().extract(header)
    }

    #[test]
    fn test_ncbi_swissprot_defline() {
        let parsed = ncbi(">sp|P69905.2|HBA_HUMAN Hemoglobin subunit alpha").unwrap();
        assert_eq!(parsed.id, "HBA_HUMAN");
        assert_eq!(parsed.accessions, vec!["P69905"]);
    }

    #[test]
    fn test_ncbi_strips_known_prefixes() {
        let parsed = ncbi("gi|4504347|ref|NP_000549.1| hemoglobin").unwrap();
        assert_eq!(parsed.id, "NP_000549");
        assert_eq!(parsed.accessions, vec!["NP_000549"]);

        let parsed = ncbi("ti|99|gi|12|emb|CAA39742.1|HSHBA1").unwrap();
        assert_eq!(parsed.id, "HSHBA1");
        assert_eq!(parsed.accessions, vec!["CAA39742"]);

        // prefix and value only: the value is the identifier
        let mut extractor = NcbiHeader::new();
        let parsed = extractor.extract("gi|12345 some protein").unwrap();
        assert_eq!(parsed.id, "12345");
        assert_eq!(parsed.accessions, vec!["ZZ0000001"]);
    }

    #[test]
    fn test_ncbi_namespaces_without_accession() {
        assert_eq!(ncbi("pir||HAHU").unwrap().id, "HAHU");
        assert_eq!(ncbi("pdb|1ABC|A").unwrap().id, "1ABC_A");
        assert_eq!(ncbi("pdb|1ABC|").unwrap().id, "1ABC");
        assert_eq!(ncbi("lcl|contig_17").unwrap().id, "contig_17");
        assert_eq!(ncbi("gnl|ti|12345").unwrap().id, "12345");
        assert_eq!(ncbi("plain_id description").unwrap().id, "plain_id");
    }

    #[test]
    fn test_ncbi_unknown_namespace_keeps_token() {
        let mut extractor = NcbiHeader::new();
        let parsed = extractor.extract(">chr1|len=5 desc").unwrap();
        assert_eq!(parsed.id, "chr1|len=5");
        assert_eq!(parsed.accessions, vec!["ZZ0000001"]);

        let parsed = extractor.extract("abc| desc").unwrap();
        assert_eq!(parsed.id, "abc|");
        assert_eq!(parsed.accessions, vec!["ZZ0000002"]);

        assert_eq!(ncbi("bbs|1234").unwrap().id, "1234");
        assert_eq!(ncbi("pat|US|5432|7").unwrap().id, "7");
    }

    #[test]
    fn test_ncbi_mints_sequential_synthetic_accessions() {
        let mut extractor = NcbiHeader::new();
        let first = extractor.extract("lcl|one").unwrap();
        let second = extractor.extract("sp|P12345|TWO").unwrap();
        let third = extractor.extract("three").unwrap();
        assert_eq!(first.accessions, vec!["ZZ0000001"]);
        assert_eq!(second.accessions, vec!["P12345"]);
        assert_eq!(third.accessions, vec!["ZZ0000002"]);
    }

    #[test]
    fn test_ncbi_empty_header() {
        assert!(ncbi(">").is_none());
        assert!(ncbi("   ").is_none());
        assert!(ncbi("pir||").is_none());
    }

    #[test]
    fn test_gcg_header() {
        let parsed = GcgHeader.extract(">HBA_HUMAN p69905 Hemoglobin alpha").unwrap();
        assert_eq!(parsed.id, "HBA_HUMAN");
        assert_eq!(parsed.accessions, vec!["P69905"]);

        // description words are skipped until something accession-like appears
        let parsed = GcgHeader.extract("MYID some words x12 more").unwrap();
        assert_eq!(parsed.accessions, vec!["X12"]);

        let parsed = GcgHeader.extract("MYID no accession here").unwrap();
        assert_eq!(parsed.id, "MYID");
        assert!(parsed.accessions.is_empty());

        // one letter then a digit is too short to be an accession
        let parsed = GcgHeader.extract("ID a1 desc").unwrap();
        assert!(parsed.accessions.is_empty());
    }

    #[test]
    fn test_simple_header() {
        let parsed = SimpleHeader.extract(">seq1 P69905 description").unwrap();
        assert_eq!(parsed.id, "seq1");
        assert!(parsed.accessions.is_empty());
        assert!(SimpleHeader.extract(">").is_none());
    }

    #[test]
    fn test_extractor_for() {
        assert_eq!(
            extractor_for(HeaderConvention::Gcg).convention(),
            HeaderConvention::Gcg
        );
        assert_eq!(
            extractor_for(HeaderConvention::Ncbi).convention(),
            HeaderConvention::Ncbi
        );
    }

    #[test]
    fn test_flat_identifier_lines() {
        let embl = FlatRecordConvention::EMBL;
        assert_eq!(
            embl.identifier("ID   X56734; SV 1; linear; mRNA; STD; PLN; 1859 BP."),
            Some("X56734".to_string())
        );
        assert_eq!(
            embl.identifier("ID   CRAM_CRAAB              Reviewed;          46 AA."),
            Some("CRAM_CRAAB".to_string())
        );
        assert!(embl.is_start("ID   X"));
        assert!(!embl.is_start("IDX  X"));
        assert_eq!(embl.identifier("ID"), None);

        let genbank = FlatRecordConvention::GENBANK;
        assert_eq!(
            genbank.identifier("LOCUS       SCU49845     5028 bp    DNA             PLN       21-JUN-1999"),
            Some("SCU49845".to_string())
        );
    }

    #[test]
    fn test_flat_accession_lines() {
        let embl = FlatRecordConvention::EMBL;
        assert_eq!(embl.accession_field("AC   P01922; Q9UCM0;"), Some("P01922; Q9UCM0;"));
        assert_eq!(embl.accession_field("ACX  nope"), None);
        assert!(!embl.is_continuation("     continued"));

        let genbank = FlatRecordConvention::GENBANK;
        assert!(genbank.is_continuation("            U12345"));
        assert!(!genbank.is_continuation("VERSION     U49845.1"));
    }

    #[test]
    fn test_flat_accession_splitting() {
        assert_eq!(
            FlatRecordConvention::accessions("P01922; Q9UCM0; "),
            vec!["P01922", "Q9UCM0"]
        );
        assert_eq!(
            FlatRecordConvention::accessions("NC_000001.11 X56734.1"),
            vec!["NC_000001", "X56734"]
        );
        assert_eq!(
            FlatRecordConvention::accessions("AB000001-AB000003"),
            vec!["AB000001", "AB000003"]
        );
        assert!(FlatRecordConvention::accessions("  ;  ").is_empty());
    }
}
