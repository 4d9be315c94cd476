//! Brute force search over a fingerprint's records
//!
//! Every record is read and compared against every term, then the matching ordinals are mapped
//! back onto the bins of a variant. A term matches a record when it is exactly equal to the
//! record's id or structure field. Each bin is reported at most once per term, in ascending order.

use crate::bins::{BinOrdinal, CompoundOrdinal};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::record::STRUCTURE_FIELD;
use log::debug;
use std::collections::HashSet;

/// Drops empty terms, keeping the order of the rest.
pub fn filter_terms(terms: &[String]) -> Vec<String> {
    terms.iter().filter(|t| !t.is_empty()).cloned().collect()
}

/// Bin ordinals of `variant_id` containing a match, one list per term.
///
/// `terms` should already be filtered with [`filter_terms`]. With no terms nothing is read.
pub fn search(
    context: &Context,
    fingerprint_id: &str,
    variant_id: &str,
    terms: &[String],
) -> Result<Vec<Vec<BinOrdinal>>> {
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let variant = context
        .variant(variant_id)
        .ok_or_else(|| Error::unknown("variant", variant_id))?;
    let mut reader = context.records(fingerprint_id)?;

    debug!(
        "Searching {} records of {} for {:?}",
        reader.len(),
        fingerprint_id,
        terms
    );

    let mut hits: Vec<HashSet<CompoundOrdinal>> = vec![HashSet::new(); terms.len()];

    for ordinal in 0..reader.len() {
        let record = reader.fetch(ordinal)?.require(ordinal, STRUCTURE_FIELD + 1)?;

        for (term, term_hits) in terms.iter().zip(hits.iter_mut()) {
            if record.id() == Some(term.as_str()) || record.structure() == Some(term.as_str()) {
                term_hits.insert(ordinal as CompoundOrdinal);
            }
        }
    }

    let mut results: Vec<Vec<BinOrdinal>> = vec![Vec::new(); terms.len()];

    for (bin, members) in variant.bins.iter().enumerate() {
        for (term_hits, result) in hits.iter().zip(results.iter_mut()) {
            if members.iter().any(|m| term_hits.contains(m)) {
                result.push(bin as BinOrdinal);
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_record_index;
    use crate::synthetic::{SyntheticDataset, RECORDS_FILENAME, RECORD_INDEX_FILENAME};

    fn terms(t: &[&str]) -> Vec<String> {
        t.iter().map(|s| s.to_string()).collect()
    }

    fn open(dataset: &SyntheticDataset) -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        dataset.write(dir.path()).unwrap();
        let context = Context::open(dir.path()).unwrap();
        (dir, context)
    }

    #[test]
    fn filter_drops_empty_terms() {
        assert_eq!(filter_terms(&terms(&["", "A", "", "CCO"])), terms(&["A", "CCO"]));
        assert!(filter_terms(&terms(&["", ""])).is_empty());
    }

    #[test]
    fn finds_bin_of_id() {
        let (_dir, context) = open(&SyntheticDataset::example());

        let result = search(&context, "db1.fp1", "db1.fp1.v1", &terms(&["C"])).unwrap();
        assert_eq!(result, vec![vec![2]]);
    }

    #[test]
    fn matches_id_or_structure_exactly() {
        let (_dir, context) = open(&SyntheticDataset::example());

        let result = search(
            &context,
            "db1.fp1",
            "db1.fp1.v1",
            &terms(&["O=C=O", "B", "CC", "nothing"]),
        )
        .unwrap();

        assert_eq!(result, vec![vec![1], vec![0], vec![], vec![]]);
    }

    #[test]
    fn bins_reported_once_per_term() {
        let mut dataset = SyntheticDataset::example();
        dataset.records[1].structure = "CCO".to_string();
        dataset.records[3].structure = "CCO".to_string();
        let (_dir, context) = open(&dataset);

        let result = search(&context, "db1.fp1", "db1.fp1.v1", &terms(&["CCO"])).unwrap();
        assert_eq!(result, vec![vec![0, 1]]);
    }

    #[test]
    fn compound_in_several_bins() {
        let mut dataset = SyntheticDataset::example();
        dataset.bins = vec![vec![0, 1], vec![2], vec![3, 2]];
        let (_dir, context) = open(&dataset);

        let result = search(&context, "db1.fp1", "db1.fp1.v1", &terms(&["C", "A"])).unwrap();
        assert_eq!(result, vec![vec![1, 2], vec![0]]);
    }

    #[test]
    fn no_terms_reads_nothing() {
        let context = Context::default();

        let result = search(&context, "missing", "missing", &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn malformed_record_fails_search() {
        let dataset = SyntheticDataset::example();
        let dir = tempfile::tempdir().unwrap();
        dataset.write(dir.path()).unwrap();

        // append a record with a single field
        let fingerprint_dir = dataset.fingerprint_dir(dir.path());
        let records = fingerprint_dir.join(RECORDS_FILENAME);
        let mut content = std::fs::read_to_string(&records).unwrap();
        content.push_str("E\n");
        std::fs::write(&records, content).unwrap();
        build_record_index(&records, &fingerprint_dir.join(RECORD_INDEX_FILENAME)).unwrap();

        let context = Context::open(dir.path()).unwrap();

        assert!(matches!(
            search(&context, "db1.fp1", "db1.fp1.v1", &terms(&["A"])),
            Err(Error::MalformedRecord { ordinal: 4, found: 1, .. })
        ));
    }

    #[test]
    fn unknown_ids_fail_search() {
        let (_dir, context) = open(&SyntheticDataset::example());

        assert!(search(&context, "db1.fp1", "db1.fp1.v9", &terms(&["A"])).is_err());
        assert!(search(&context, "db1.fp9", "db1.fp1.v1", &terms(&["A"])).is_err());
    }
}
