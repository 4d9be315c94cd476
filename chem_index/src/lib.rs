//! Random access into large compound datasets laid out for map visualization.
//!
//! A data directory holds a catalog of databases, fingerprints, variants and color maps. Every
//! fingerprint owns a flat records file with one compound per line and a record index giving the
//! byte offset and length of each line, so any compound can be read with a single positioned read
//! given its ordinal. Every variant groups those ordinals into spatial bins.
//!
//! All index tables are read once into a [`context::Context`] and never change afterwards. Record
//! files stay on disk and are opened per request.
//!
//! - [`catalog`]: the `config.json` tree and its resolution to absolute paths
//! - [`index`]: record index files
//! - [`record`]: reading and splitting single records
//! - [`bins`]: bin membership and bin statistics
//! - [`search`]: brute force search by id or structure
//! - [`message`] and [`handlers`]: the command protocol spoken with clients
pub mod error;
pub mod catalog;
pub mod index;
pub mod record;
pub mod bins;
pub mod context;
pub mod search;
pub mod message;
pub mod handlers;
pub mod synthetic;
