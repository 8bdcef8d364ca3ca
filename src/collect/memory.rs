//! In-memory collection mode.

use tracing::debug;

use super::xref::CrossReferencer;
use super::{CollectError, CollectStats, CollectedIndex, Collector, UniqueEntries};
use crate::core::types::{AccessionRef, Entry, IndexedEntry, SourceFile};

/// Keeps every record in memory and sorts once all files are read
#[derive(Debug, Default)]
pub struct MemoryCollector {
    entries: Vec<IndexedEntry>,
    accessions: Vec<AccessionRef>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for MemoryCollector {
    fn begin_file(&mut self, file: &SourceFile) -> Result<(), CollectError> {
        debug!("Collecting {} in memory", file.file_name());
        Ok(())
    }

    fn add_entry(&mut self, entry: Entry) -> Result<(), CollectError> {
        self.accessions.extend(entry.accession_refs());
        self.entries.push(entry.to_indexed());
        Ok(())
    }

    fn end_file(&mut self) -> Result<(), CollectError> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<CollectedIndex, CollectError> {
        let Self {
            mut entries,
            mut accessions,
        } = *self;

        // stable sorts: ties keep file order, then record order
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        accessions.sort_by(|a, b| a.id.cmp(&b.id));

        let mut unique = UniqueEntries::new(entries.into_iter().map(Ok::<_, CollectError>));
        let entries: Vec<IndexedEntry> = unique.by_ref().collect::<Result<_, _>>()?;
        let stats = CollectStats {
            entries: unique.kept(),
            duplicates_dropped: unique.dropped(),
            accession_refs: accessions.len(),
        };

        let ids = entries.iter().map(|e| Ok::<_, CollectError>(e.id.clone()));
        let mut resolved = CrossReferencer::new(ids, accessions.into_iter().map(Ok::<_, CollectError>))
            .collect::<Result<Vec<_>, _>>()?;
        resolved.sort_by(|a, b| a.accession.cmp(&b.accession));

        debug!(
            "Collected {} identifiers, {} accession refs",
            stats.entries, stats.accession_refs
        );

        Ok(CollectedIndex {
            entries: Box::new(entries.into_iter().map(Ok::<_, CollectError>)),
            accessions: Box::new(resolved.into_iter().map(Ok::<_, CollectError>)),
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceFormat;

    fn collect(entries: Vec<Entry>) -> CollectedIndex {
        let file = SourceFile::new("a.dat", SourceFormat::Embl, 1);
        let mut collector: Box<dyn Collector> = Box::new(MemoryCollector::new());
        collector.begin_file(&file).unwrap();
        for entry in entries {
            collector.add_entry(entry).unwrap();
        }
        collector.end_file().unwrap();
        collector.finish().unwrap()
    }

    #[test]
    fn test_sorted_streams_and_ranks() {
        let collected = collect(vec![
            Entry::new("GAMMA", 200, 1).with_accessions(["P3"]),
            Entry::new("ALPHA", 0, 1).with_accessions(["P2", "P1"]),
            Entry::new("BETA", 100, 1),
        ]);

        assert_eq!(collected.stats.entries, 3);
        assert_eq!(collected.stats.accession_refs, 3);

        let ids: Vec<_> = collected.entries.map(|e| e.unwrap().id).collect();
        assert_eq!(ids, vec!["ALPHA", "BETA", "GAMMA"]);

        let accs: Vec<_> = collected
            .accessions
            .map(|a| {
                let a = a.unwrap();
                (a.accession, a.rank)
            })
            .collect();
        assert_eq!(
            accs,
            vec![
                ("P1".to_string(), 1),
                ("P2".to_string(), 1),
                ("P3".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_duplicates_dropped_and_accessions_reattached() {
        let collected = collect(vec![
            Entry::new("DUP", 0, 1).with_accessions(["A1"]),
            Entry::new("OTHER", 50, 1).with_accessions(["B1"]),
            Entry::new("DUP", 100, 1).with_accessions(["A2"]),
        ]);

        assert_eq!(collected.stats.entries, 2);
        assert_eq!(collected.stats.duplicates_dropped, 1);

        let entries: Vec<_> = collected.entries.map(Result::unwrap).collect();
        assert_eq!(entries[0].id, "DUP");
        assert_eq!(entries[0].record_offset, 0);

        let ranks: Vec<_> = collected.accessions.map(|a| a.unwrap().rank).collect();
        assert_eq!(ranks, vec![1, 1, 2]);
    }

    #[test]
    fn test_shared_accession_keeps_rank_order() {
        let collected = collect(vec![
            Entry::new("Z_LAST", 0, 1).with_accessions(["SHARED"]),
            Entry::new("A_FIRST", 10, 1).with_accessions(["SHARED"]),
        ]);
        let ranks: Vec<_> = collected.accessions.map(|a| a.unwrap().rank).collect();
        assert_eq!(ranks, vec![1, 2]);
    }
}
