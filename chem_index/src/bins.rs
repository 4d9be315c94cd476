//! Spatial bins of a variant and the statistics derived from them
//!
//! Line `b` of a variant's bin index file lists, comma separated, the compound ordinals that fall
//! into bin `b`. An empty line is an empty bin. Ordinals are not checked against the owning
//! fingerprint here; callers reading records must bounds check them.

use crate::error::{Error, Result};
use crate::index::count_lines;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub type BinOrdinal = u32;
pub type CompoundOrdinal = u32;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinIndex {
    bins: Vec<Vec<CompoundOrdinal>>,
}

impl BinIndex {
    pub fn from_file(path: &Path) -> Result<Self> {
        let num_bins = count_lines(path)?;
        let mut bins: Vec<Vec<CompoundOrdinal>> = Vec::with_capacity(num_bins);

        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;

            let members = parse_members(&line).ok_or_else(|| Error::MalformedLine {
                path: path.to_path_buf(),
                line: i + 1,
                content: line.clone(),
            })?;

            bins.push(members);
        }

        debug!("Read {} bins from {}", bins.len(), path.display());

        Ok(Self { bins })
    }

    pub fn from_bins(bins: Vec<Vec<CompoundOrdinal>>) -> Self {
        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Members of bin `bin`, `None` past the last bin.
    pub fn members(&self, bin: usize) -> Option<&[CompoundOrdinal]> {
        self.bins.get(bin).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[CompoundOrdinal]> {
        self.bins.iter().map(Vec::as_slice)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_bins(self)
    }
}

fn parse_members(line: &str) -> Option<Vec<CompoundOrdinal>> {
    let line = line.trim();

    if line.is_empty() {
        return Some(Vec::new());
    }

    line.split(',').map(|x| x.trim().parse().ok()).collect()
}

/// Population summary of a variant's bins, serialized with the field names clients expect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Stats {
    #[serde(rename = "compoundCount")]
    pub compound_count: u64,
    #[serde(rename = "binCount")]
    pub bin_count: u32,
    /// Exact mean, not truncated.
    #[serde(rename = "avgCompoundCount")]
    pub average_bin_size: f32,
    /// `bin_size_histogram[k]` is the number of bins holding exactly `k` compounds.
    #[serde(rename = "binHist")]
    pub bin_size_histogram: Vec<u32>,
    #[serde(rename = "histMin")]
    pub min_bin_size: u32,
    #[serde(rename = "histMax")]
    pub max_bin_size: u32,
}

impl Stats {
    pub fn from_bins(bins: &BinIndex) -> Self {
        if bins.is_empty() {
            return Self::default();
        }

        let mut compound_count: u64 = 0;
        let mut min = usize::MAX;
        let mut max = 0;

        for members in bins.iter() {
            compound_count += members.len() as u64;
            min = min.min(members.len());
            max = max.max(members.len());
        }

        let mut histogram = vec![0u32; max + 1];
        for members in bins.iter() {
            histogram[members.len()] += 1;
        }

        Self {
            compound_count,
            bin_count: bins.len() as u32,
            average_bin_size: (compound_count as f64 / bins.len() as f64) as f32,
            bin_size_histogram: histogram,
            min_bin_size: min as u32,
            max_bin_size: max as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::Rng;

    #[test]
    fn bins_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bins.idx");
        std::fs::write(&path, "0,1\n\n2\n3, 4 ,5\n").unwrap();

        let bins = BinIndex::from_file(&path).unwrap();

        assert_eq!(bins.len(), 4);
        assert_eq!(bins.members(0), Some(&[0, 1][..]));
        assert_eq!(bins.members(1), Some(&[][..]));
        assert_eq!(bins.members(3), Some(&[3, 4, 5][..]));
        assert_eq!(bins.members(4), None);
    }

    #[test]
    fn malformed_bin_line_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bins.idx");
        std::fs::write(&path, "0,1\n2,x\n").unwrap();

        assert!(matches!(
            BinIndex::from_file(&path),
            Err(Error::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn stats_with_empty_bins() {
        let bins = BinIndex::from_bins(vec![vec![0, 1], vec![], vec![2], vec![3, 4]]);
        let stats = bins.stats();

        assert_eq!(stats.compound_count, 5);
        assert_eq!(stats.bin_count, 4);
        assert_eq!(stats.min_bin_size, 0);
        assert_eq!(stats.max_bin_size, 2);
        assert_eq!(stats.bin_size_histogram, vec![1, 1, 2]);
        assert_approx_eq!(stats.average_bin_size, 1.25);
    }

    #[test]
    fn average_is_not_truncated() {
        let bins = BinIndex::from_bins(vec![vec![0, 1, 2], vec![3, 4]]);
        assert_approx_eq!(bins.stats().average_bin_size, 2.5);
    }

    #[test]
    fn stats_without_bins() {
        let stats = BinIndex::default().stats();

        assert_eq!(stats, Stats::default());
        assert!(stats.bin_size_histogram.is_empty());
    }

    #[test]
    fn stats_serialize_with_client_names() {
        let stats = BinIndex::from_bins(vec![vec![0], vec![1, 2]]).stats();
        let value = serde_json::to_value(&stats).unwrap();

        assert_eq!(value["compoundCount"], 3);
        assert_eq!(value["binCount"], 2);
        assert_eq!(value["avgCompoundCount"], 1.5);
        assert_eq!(value["binHist"], serde_json::json!([0, 1, 1]));
        assert_eq!(value["histMin"], 1);
        assert_eq!(value["histMax"], 2);
    }

    #[test]
    fn quick_random_stats_are_consistent() {
        let mut rng = rand::thread_rng();

        for _ in 0..20 {
            let mut next: CompoundOrdinal = 0;
            let bins: Vec<Vec<CompoundOrdinal>> = (0..rng.gen_range(1..200))
                .map(|_| {
                    let size = rng.gen_range(0..12);
                    let members = (next..next + size).collect();
                    next += size;
                    members
                })
                .collect();
            let bins = BinIndex::from_bins(bins);
            let stats = bins.stats();

            let total: usize = bins.iter().map(|m| m.len()).sum();
            assert_eq!(stats.compound_count, total as u64);
            assert_eq!(stats.bin_size_histogram.len(), stats.max_bin_size as usize + 1);

            for k in stats.min_bin_size..=stats.max_bin_size {
                let expected = bins.iter().filter(|m| m.len() == k as usize).count();
                assert_eq!(stats.bin_size_histogram[k as usize] as usize, expected);
            }
        }
    }
}
