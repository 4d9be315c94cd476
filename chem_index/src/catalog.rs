//! Catalog description of a data directory
//!
//! The catalog lives in `config.json` at the root of the data directory and describes a tree of
//! databases, fingerprints, variants and color maps. Ids and file names in the file are relative;
//! [`Catalog::resolve`] turns them into the globally unique dotted ids (`db.fp.variant.map`) and
//! absolute paths that the rest of the crate works with.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CATALOG_FILENAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColorMap {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub map_file: PathBuf,
    #[serde(default)]
    pub data_types: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resolution: u32,
    #[serde(default)]
    pub data_types: Vec<String>,
    #[serde(default)]
    pub directory: PathBuf,
    #[serde(rename = "indicesFile")]
    pub bin_index_file: PathBuf,
    pub coordinates_file: PathBuf,
    #[serde(rename = "maps", default)]
    pub color_maps: Vec<ColorMap>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub directory: PathBuf,
    #[serde(rename = "infosFile")]
    pub records_file: PathBuf,
    #[serde(rename = "infoIndicesFile")]
    pub record_index_file: PathBuf,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub min: Vec<f32>,
    #[serde(default)]
    pub max: Vec<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub directory: PathBuf,
    #[serde(default)]
    pub fingerprints: Vec<Fingerprint>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    pub databases: Vec<Database>,
}

/// Per-level callbacks for [`Catalog::walk`]. Levels are visited depth first, parents before
/// children.
pub trait CatalogVisitor {
    fn visit_database(&mut self, _database: &Database) -> Result<()> {
        Ok(())
    }

    fn visit_fingerprint(&mut self, _database: &Database, _fingerprint: &Fingerprint) -> Result<()> {
        Ok(())
    }

    fn visit_variant(&mut self, _fingerprint: &Fingerprint, _variant: &Variant) -> Result<()> {
        Ok(())
    }

    fn visit_color_map(&mut self, _variant: &Variant, _color_map: &ColorMap) -> Result<()> {
        Ok(())
    }
}

/// A catalog with dotted ids and absolute paths, plus every referenced file that does not exist.
#[derive(Debug, Clone)]
pub struct ResolvedCatalog {
    pub catalog: Catalog,
    pub missing: Vec<PathBuf>,
}

impl ResolvedCatalog {
    pub fn into_checked(self) -> Result<Catalog> {
        match self.missing.is_empty() {
            true => Ok(self.catalog),
            false => Err(Error::MissingFiles(self.missing)),
        }
    }
}

impl Catalog {
    pub fn from_data_dir(data_dir: &Path) -> Result<Self> {
        Self::from_file(&data_dir.join(CATALOG_FILENAME))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let serialized = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        serde_json::from_str(&serialized).map_err(|e| Error::Catalog {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Rewrites ids and file names relative to `data_dir`.
    ///
    /// Directories nest (`data_dir/database/fingerprint/variant`); fingerprint files live in the
    /// fingerprint directory, variant and color map files in the variant directory.
    pub fn resolve(mut self, data_dir: &Path) -> ResolvedCatalog {
        let mut missing: Vec<PathBuf> = Vec::new();

        for database in self.databases.iter_mut() {
            let database_dir = join_relative(data_dir, &database.directory);

            for fingerprint in database.fingerprints.iter_mut() {
                fingerprint.id = format!("{}.{}", database.id, fingerprint.id);
                let fingerprint_dir = join_relative(&database_dir, &fingerprint.directory);

                fingerprint.records_file =
                    locate(&fingerprint_dir, &fingerprint.records_file, &mut missing);
                fingerprint.record_index_file =
                    locate(&fingerprint_dir, &fingerprint.record_index_file, &mut missing);

                for variant in fingerprint.variants.iter_mut() {
                    variant.id = format!("{}.{}", fingerprint.id, variant.id);
                    let variant_dir = join_relative(&fingerprint_dir, &variant.directory);

                    variant.bin_index_file =
                        locate(&variant_dir, &variant.bin_index_file, &mut missing);
                    variant.coordinates_file =
                        locate(&variant_dir, &variant.coordinates_file, &mut missing);

                    for color_map in variant.color_maps.iter_mut() {
                        color_map.id = format!("{}.{}", variant.id, color_map.id);
                        color_map.map_file = locate(&variant_dir, &color_map.map_file, &mut missing);
                    }
                }
            }
        }

        ResolvedCatalog {
            catalog: self,
            missing,
        }
    }

    pub fn walk<V: CatalogVisitor>(&self, visitor: &mut V) -> Result<()> {
        for database in self.databases.iter() {
            visitor.visit_database(database)?;

            for fingerprint in database.fingerprints.iter() {
                visitor.visit_fingerprint(database, fingerprint)?;

                for variant in fingerprint.variants.iter() {
                    visitor.visit_variant(fingerprint, variant)?;

                    for color_map in variant.color_maps.iter() {
                        visitor.visit_color_map(variant, color_map)?;
                    }
                }
            }
        }

        Ok(())
    }
}

// catalog directories are always relative to their parent, even when written with a leading slash
fn join_relative(base: &Path, relative: &Path) -> PathBuf {
    let relative = relative.strip_prefix("/").unwrap_or(relative);
    base.join(relative)
}

fn locate(dir: &Path, filename: &Path, missing: &mut Vec<PathBuf>) -> PathBuf {
    let path = join_relative(dir, filename);

    if !path.exists() {
        missing.push(path.clone());
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "databases": [{
            "id": "db1",
            "name": "Database 1",
            "directory": "db1",
            "fingerprints": [{
                "id": "fp1",
                "name": "ECFP",
                "directory": "/fp1",
                "infosFile": "infos.txt",
                "infoIndicesFile": "infos.idx",
                "variants": [{
                    "id": "v1",
                    "name": "low",
                    "resolution": 64,
                    "directory": "v1",
                    "indicesFile": "bins.idx",
                    "coordinatesFile": "coords.txt",
                    "maps": [{
                        "id": "m1",
                        "name": "weight",
                        "mapFile": "weight.map",
                        "dataTypes": ["float"]
                    }]
                }]
            }]
        }]
    }"#;

    fn write_catalog_files(root: &Path, with_map: bool) {
        let fp_dir = root.join("db1/fp1");
        let variant_dir = fp_dir.join("v1");
        std::fs::create_dir_all(&variant_dir).unwrap();
        std::fs::write(root.join(CATALOG_FILENAME), CATALOG).unwrap();
        std::fs::write(fp_dir.join("infos.txt"), "").unwrap();
        std::fs::write(fp_dir.join("infos.idx"), "").unwrap();
        std::fs::write(variant_dir.join("bins.idx"), "").unwrap();
        std::fs::write(variant_dir.join("coords.txt"), "").unwrap();
        if with_map {
            std::fs::write(variant_dir.join("weight.map"), "").unwrap();
        }
    }

    #[test]
    fn parses_client_field_names() {
        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();

        let fingerprint = &catalog.databases[0].fingerprints[0];
        assert_eq!(fingerprint.records_file, PathBuf::from("infos.txt"));
        assert_eq!(fingerprint.record_index_file, PathBuf::from("infos.idx"));

        let variant = &fingerprint.variants[0];
        assert_eq!(variant.resolution, 64);
        assert_eq!(variant.bin_index_file, PathBuf::from("bins.idx"));
        assert_eq!(variant.color_maps[0].data_types, vec!["float".to_string()]);
    }

    #[test]
    fn resolve_prefixes_ids_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog_files(dir.path(), true);

        let resolved = Catalog::from_data_dir(dir.path()).unwrap().resolve(dir.path());
        assert!(resolved.missing.is_empty(), "{:?}", resolved.missing);

        let catalog = resolved.into_checked().unwrap();
        let fingerprint = &catalog.databases[0].fingerprints[0];
        let variant = &fingerprint.variants[0];
        let color_map = &variant.color_maps[0];

        assert_eq!(catalog.databases[0].id, "db1");
        assert_eq!(fingerprint.id, "db1.fp1");
        assert_eq!(variant.id, "db1.fp1.v1");
        assert_eq!(color_map.id, "db1.fp1.v1.m1");

        assert_eq!(fingerprint.records_file, dir.path().join("db1/fp1/infos.txt"));
        assert_eq!(variant.bin_index_file, dir.path().join("db1/fp1/v1/bins.idx"));
        assert_eq!(color_map.map_file, dir.path().join("db1/fp1/v1/weight.map"));
    }

    #[test]
    fn resolve_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog_files(dir.path(), false);

        let resolved = Catalog::from_data_dir(dir.path()).unwrap().resolve(dir.path());
        assert_eq!(resolved.missing, vec![dir.path().join("db1/fp1/v1/weight.map")]);

        match resolved.into_checked() {
            Err(Error::MissingFiles(files)) => assert_eq!(files.len(), 1),
            other => panic!("expected missing files, got {:?}", other),
        }
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Catalog::from_data_dir(dir.path()), Err(Error::Io { .. })));

        std::fs::write(dir.path().join(CATALOG_FILENAME), "{ not json").unwrap();
        assert!(matches!(Catalog::from_data_dir(dir.path()), Err(Error::Catalog { .. })));
    }

    #[test]
    fn walk_visits_parents_first() {
        struct Trace(Vec<String>);

        impl CatalogVisitor for Trace {
            fn visit_database(&mut self, database: &Database) -> Result<()> {
                self.0.push(database.id.clone());
                Ok(())
            }
            fn visit_fingerprint(&mut self, _: &Database, fingerprint: &Fingerprint) -> Result<()> {
                self.0.push(fingerprint.id.clone());
                Ok(())
            }
            fn visit_variant(&mut self, _: &Fingerprint, variant: &Variant) -> Result<()> {
                self.0.push(variant.id.clone());
                Ok(())
            }
            fn visit_color_map(&mut self, _: &Variant, color_map: &ColorMap) -> Result<()> {
                self.0.push(color_map.id.clone());
                Ok(())
            }
        }

        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();
        let catalog = catalog.resolve(Path::new("/nonexistent")).catalog;

        let mut trace = Trace(Vec::new());
        catalog.walk(&mut trace).unwrap();

        assert_eq!(trace.0, vec!["db1", "db1.fp1", "db1.fp1.v1", "db1.fp1.v1.m1"]);
    }
}
