//! In-memory tables for a whole catalog
//!
//! A [`Context`] is built once, before any client is served, by walking the resolved catalog and
//! reading every record index and bin index it references. Nothing in it changes afterwards, so a
//! single instance is shared by reference between all connections.

use crate::bins::{BinIndex, CompoundOrdinal, Stats};
use crate::catalog::{Catalog, CatalogVisitor, ColorMap, Database, Fingerprint, Variant};
use crate::error::{Error, Result};
use crate::index::RecordIndex;
use crate::record::{Record, RecordReader};
use log::{error, info};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FingerprintTables {
    pub records_file: PathBuf,
    pub index: RecordIndex,
}

#[derive(Debug)]
pub struct VariantTables {
    pub fingerprint_id: String,
    pub coordinates_file: PathBuf,
    pub bins: BinIndex,
    pub stats: Stats,
}

#[derive(Debug, Default)]
pub struct Context {
    catalog: Catalog,
    fingerprints: HashMap<String, FingerprintTables>,
    variants: HashMap<String, VariantTables>,
    color_maps: HashMap<String, PathBuf>,
}

#[derive(Default)]
struct IndexLoader {
    ids: HashSet<String>,
    fingerprints: HashMap<String, FingerprintTables>,
    variants: HashMap<String, VariantTables>,
    color_maps: HashMap<String, PathBuf>,
}

impl IndexLoader {
    fn claim(&mut self, id: &str) -> Result<()> {
        match self.ids.insert(id.to_string()) {
            true => Ok(()),
            false => Err(Error::DuplicateId(id.to_string())),
        }
    }
}

impl CatalogVisitor for IndexLoader {
    fn visit_database(&mut self, database: &Database) -> Result<()> {
        self.claim(&database.id)
    }

    fn visit_fingerprint(&mut self, _database: &Database, fingerprint: &Fingerprint) -> Result<()> {
        self.claim(&fingerprint.id)?;

        info!("Reading {} ...", fingerprint.record_index_file.display());

        let index = RecordIndex::from_file(&fingerprint.record_index_file)?;
        index.check_bounds(&fingerprint.record_index_file, &fingerprint.records_file)?;

        self.fingerprints.insert(
            fingerprint.id.clone(),
            FingerprintTables {
                records_file: fingerprint.records_file.clone(),
                index,
            },
        );

        Ok(())
    }

    fn visit_variant(&mut self, fingerprint: &Fingerprint, variant: &Variant) -> Result<()> {
        self.claim(&variant.id)?;

        info!("Reading {} ...", variant.bin_index_file.display());

        let bins = BinIndex::from_file(&variant.bin_index_file)?;
        let stats = bins.stats();

        self.variants.insert(
            variant.id.clone(),
            VariantTables {
                fingerprint_id: fingerprint.id.clone(),
                coordinates_file: variant.coordinates_file.clone(),
                bins,
                stats,
            },
        );

        Ok(())
    }

    fn visit_color_map(&mut self, _variant: &Variant, color_map: &ColorMap) -> Result<()> {
        self.claim(&color_map.id)?;
        self.color_maps
            .insert(color_map.id.clone(), color_map.map_file.clone());

        Ok(())
    }
}

impl Context {
    /// Reads `config.json` from `data_dir`, resolves it and loads every table.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let resolved = Catalog::from_data_dir(data_dir)?.resolve(data_dir);

        if !resolved.missing.is_empty() {
            error!("The following files were not found. Please add the files or remove the entries from the config.");
            for path in resolved.missing.iter() {
                error!("{}", path.display());
            }
        }

        Self::load(resolved.into_checked()?)
    }

    /// Builds the tables for an already resolved catalog.
    pub fn load(catalog: Catalog) -> Result<Self> {
        let mut loader = IndexLoader::default();
        catalog.walk(&mut loader)?;

        info!(
            "Loaded {} fingerprints, {} variants and {} color maps",
            loader.fingerprints.len(),
            loader.variants.len(),
            loader.color_maps.len()
        );

        Ok(Self {
            catalog,
            fingerprints: loader.fingerprints,
            variants: loader.variants,
            color_maps: loader.color_maps,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn fingerprint(&self, id: &str) -> Option<&FingerprintTables> {
        self.fingerprints.get(id)
    }

    pub fn variant(&self, id: &str) -> Option<&VariantTables> {
        self.variants.get(id)
    }

    pub fn color_map_file(&self, id: &str) -> Option<&Path> {
        self.color_maps.get(id).map(PathBuf::as_path)
    }

    pub fn record_count(&self, fingerprint_id: &str) -> Option<usize> {
        self.fingerprint(fingerprint_id).map(|f| f.index.len())
    }

    /// Opens the records file of a fingerprint for the duration of one request.
    pub fn records(&self, fingerprint_id: &str) -> Result<RecordReader<'_>> {
        let tables = self
            .fingerprint(fingerprint_id)
            .ok_or_else(|| Error::unknown("fingerprint", fingerprint_id))?;

        RecordReader::open(&tables.records_file, &tables.index)
    }

    pub fn fetch(&self, fingerprint_id: &str, ordinal: usize) -> Result<Record> {
        self.records(fingerprint_id)?.fetch(ordinal)
    }

    /// `None` for an unknown variant or a bin past the last one.
    pub fn bin_members(&self, variant_id: &str, bin: usize) -> Option<&[CompoundOrdinal]> {
        self.variant(variant_id)?.bins.members(bin)
    }

    pub fn bin_count(&self, variant_id: &str) -> Option<usize> {
        self.variant(variant_id).map(|v| v.bins.len())
    }

    pub fn stats(&self, variant_id: &str) -> Option<&Stats> {
        self.variant(variant_id).map(|v| &v.stats)
    }
}
