//! Cross-referencing of accessions to identifier ranks.
//!
//! Both inputs must be sorted by identifier: the unique identifier stream
//! (rank = 1-based position) and the accession refs keyed by their owning
//! identifier. A single two-cursor pass replaces each owning identifier with
//! its rank. Identifiers without accessions are stepped over; accession refs
//! keep their input order.

use std::cmp::Ordering;

use super::CollectError;
use crate::core::types::{AccessionRef, ResolvedAccession};

pub struct CrossReferencer<I, A> {
    ids: I,
    refs: A,
    current: Option<String>,
    rank: u32,
}

impl<I, A> CrossReferencer<I, A>
where
    I: Iterator<Item = Result<String, CollectError>>,
    A: Iterator<Item = Result<AccessionRef, CollectError>>,
{
    pub fn new(ids: I, refs: A) -> Self {
        Self {
            ids,
            refs,
            current: None,
            rank: 0,
        }
    }

    fn resolve(&mut self, accession_ref: AccessionRef) -> Result<ResolvedAccession, CollectError> {
        loop {
            let ordering = match &self.current {
                Some(id) => id.as_str().cmp(&accession_ref.id),
                None => Ordering::Less,
            };
            match ordering {
                Ordering::Equal => {
                    return Ok(ResolvedAccession {
                        accession: accession_ref.accession,
                        rank: self.rank,
                    })
                }
                Ordering::Greater => break,
                Ordering::Less => match self.ids.next().transpose()? {
                    Some(id) => {
                        self.current = Some(id);
                        self.rank += 1;
                    }
                    None => break,
                },
            }
        }
        Err(CollectError::DanglingAccession {
            accession: accession_ref.accession,
            id: accession_ref.id,
        })
    }
}

impl<I, A> Iterator for CrossReferencer<I, A>
where
    I: Iterator<Item = Result<String, CollectError>>,
    A: Iterator<Item = Result<AccessionRef, CollectError>>,
{
    type Item = Result<ResolvedAccession, CollectError>;

    fn next(&mut self) -> Option<Self::Item> {
        let accession_ref = match self.refs.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e)),
        };
        Some(self.resolve(accession_ref))
    }
}
