//! Writes small self-consistent data directories
//!
//! Used by the builder to produce random datasets for local testing, and by the tests of this
//! workspace to lay out fixtures with known contents. A dataset holds one database with one
//! fingerprint and one variant:
//!
//! ```text
//! <root>/config.json
//! <root>/<db>/<fp>/infos.txt, infos.idx
//! <root>/<db>/<fp>/<variant>/bins.idx, coords.txt, <map>.map
//! ```

use crate::bins::CompoundOrdinal;
use crate::catalog::{Catalog, ColorMap, Database, Fingerprint, Variant, CATALOG_FILENAME};
use crate::error::{Error, Result};
use crate::index::build_record_index;
use rand::{distributions::Alphanumeric, Rng};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RECORDS_FILENAME: &str = "infos.txt";
pub const RECORD_INDEX_FILENAME: &str = "infos.idx";
pub const BIN_INDEX_FILENAME: &str = "bins.idx";
pub const COORDINATES_FILENAME: &str = "coords.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRecord {
    pub id: String,
    pub structure: String,
    pub fingerprint: String,
    pub coordinates: String,
}

impl SyntheticRecord {
    pub fn new(id: &str, structure: &str, fingerprint: &str, coordinates: &str) -> Self {
        Self {
            id: id.to_string(),
            structure: structure.to_string(),
            fingerprint: fingerprint.to_string(),
            coordinates: coordinates.to_string(),
        }
    }

    pub fn random<R: Rng>(rng: &mut R, index: usize) -> Self {
        let structure: String = (0..20)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect();

        let fingerprint: String = (0..16)
            .map(|_| if rng.gen_bool(0.5) { '1' } else { '0' })
            .collect();

        let coordinates = format!("{:.3},{:.3}", rng.gen::<f32>(), rng.gen::<f32>());

        Self {
            id: format!("CMPD{}", index),
            structure,
            fingerprint,
            coordinates,
        }
    }

    fn line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.id, self.structure, self.fingerprint, self.coordinates
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticColorMap {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticDataset {
    pub database_id: String,
    pub fingerprint_id: String,
    pub variant_id: String,
    pub records: Vec<SyntheticRecord>,
    pub bins: Vec<Vec<CompoundOrdinal>>,
    pub color_maps: Vec<SyntheticColorMap>,
}

impl SyntheticDataset {
    /// Four compounds `A`..`D` in bins `[[0, 1], [3], [2]]`.
    pub fn example() -> Self {
        Self {
            database_id: "db1".to_string(),
            fingerprint_id: "fp1".to_string(),
            variant_id: "v1".to_string(),
            records: vec![
                SyntheticRecord::new("A", "CCO", "0101", "0.10,0.20"),
                SyntheticRecord::new("B", "c1ccccc1", "1100", "0.15,0.25"),
                SyntheticRecord::new("C", "CCN", "0011", "0.70,0.10"),
                SyntheticRecord::new("D", "O=C=O", "1111", "0.90,0.90"),
            ],
            bins: vec![vec![0, 1], vec![3], vec![2]],
            color_maps: vec![SyntheticColorMap {
                id: "m1".to_string(),
                content: "0.5\n0.25\n1.0\n".to_string(),
            }],
        }
    }

    /// Random compounds spread over `num_bins` bins, some of which may stay empty.
    pub fn random<R: Rng>(rng: &mut R, num_records: usize, num_bins: usize) -> Self {
        let records = (0..num_records)
            .map(|i| SyntheticRecord::random(rng, i))
            .collect();

        let mut bins: Vec<Vec<CompoundOrdinal>> = vec![Vec::new(); num_bins];
        if num_bins > 0 {
            for i in 0..num_records {
                bins[rng.gen_range(0..num_bins)].push(i as CompoundOrdinal);
            }
        }

        let color_maps = vec![SyntheticColorMap {
            id: "density".to_string(),
            content: bins
                .iter()
                .map(|members| format!("{}\n", members.len()))
                .collect(),
        }];

        Self {
            database_id: "synthetic".to_string(),
            fingerprint_id: "random".to_string(),
            variant_id: format!("{}bins", num_bins),
            records,
            bins,
            color_maps,
        }
    }

    pub fn fingerprint_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.database_id).join(&self.fingerprint_id)
    }

    pub fn variant_dir(&self, root: &Path) -> PathBuf {
        self.fingerprint_dir(root).join(&self.variant_id)
    }

    /// Catalog as it appears in `config.json`, with relative ids and paths.
    pub fn catalog(&self) -> Catalog {
        let color_maps = self
            .color_maps
            .iter()
            .map(|m| ColorMap {
                id: m.id.clone(),
                name: m.id.clone(),
                map_file: PathBuf::from(format!("{}.map", m.id)),
                data_types: vec!["float".to_string()],
                ..Default::default()
            })
            .collect();

        let variant = Variant {
            id: self.variant_id.clone(),
            name: self.variant_id.clone(),
            resolution: self.bins.len() as u32,
            directory: PathBuf::from(&self.variant_id),
            bin_index_file: PathBuf::from(BIN_INDEX_FILENAME),
            coordinates_file: PathBuf::from(COORDINATES_FILENAME),
            color_maps,
            ..Default::default()
        };

        let fingerprint = Fingerprint {
            id: self.fingerprint_id.clone(),
            name: self.fingerprint_id.clone(),
            directory: PathBuf::from(&self.fingerprint_id),
            records_file: PathBuf::from(RECORDS_FILENAME),
            record_index_file: PathBuf::from(RECORD_INDEX_FILENAME),
            variants: vec![variant],
            ..Default::default()
        };

        Catalog {
            databases: vec![Database {
                id: self.database_id.clone(),
                name: self.database_id.clone(),
                directory: PathBuf::from(&self.database_id),
                fingerprints: vec![fingerprint],
                ..Default::default()
            }],
        }
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        let fingerprint_dir = self.fingerprint_dir(root);
        let variant_dir = self.variant_dir(root);
        std::fs::create_dir_all(&variant_dir).map_err(|e| Error::io(&variant_dir, e))?;

        let records_path = fingerprint_dir.join(RECORDS_FILENAME);
        write_lines(&records_path, self.records.iter().map(SyntheticRecord::line))?;
        build_record_index(&records_path, &fingerprint_dir.join(RECORD_INDEX_FILENAME))?;

        let bin_lines = self.bins.iter().map(|members| {
            members
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(",")
        });
        write_lines(&variant_dir.join(BIN_INDEX_FILENAME), bin_lines)?;

        let coordinate_lines = self.bins.iter().enumerate().map(|(i, members)| {
            let first = members.first().and_then(|m| self.records.get(*m as usize));
            match first {
                Some(record) => format!("{},{}", i, record.coordinates),
                None => format!("{},0,0", i),
            }
        });
        write_lines(&variant_dir.join(COORDINATES_FILENAME), coordinate_lines)?;

        for color_map in self.color_maps.iter() {
            let path = variant_dir.join(format!("{}.map", color_map.id));
            std::fs::write(&path, &color_map.content).map_err(|e| Error::io(&path, e))?;
        }

        let catalog_path = root.join(CATALOG_FILENAME);
        let serialized =
            serde_json::to_string_pretty(&self.catalog()).map_err(|e| Error::Catalog {
                path: catalog_path.clone(),
                source: e,
            })?;
        std::fs::write(&catalog_path, serialized).map_err(|e| Error::io(&catalog_path, e))?;

        Ok(())
    }
}

fn write_lines<I: Iterator<Item = String>>(path: &Path, lines: I) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);

    for line in lines {
        writeln!(out, "{}", line).map_err(|e| Error::io(path, e))?;
    }

    out.flush().map_err(|e| Error::io(path, e))
}
