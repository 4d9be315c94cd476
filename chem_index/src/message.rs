//! Request and response messages exchanged with clients
//!
//! Requests are `{"cmd": ..., "msg": [...]}` with positional string arguments. Every response
//! echoes the command in `cmd`; the remaining fields depend on the command.

use crate::bins::{BinOrdinal, Stats};
use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Request {
    #[serde(rename = "cmd")]
    pub command: String,
    #[serde(rename = "msg", default)]
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init,
    LoadVariant,
    LoadStats,
    LoadMap,
    LoadBinPreview,
    LoadBin,
    SearchInfos,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Command::Init,
        Command::LoadVariant,
        Command::LoadStats,
        Command::LoadMap,
        Command::LoadBinPreview,
        Command::LoadBin,
        Command::SearchInfos,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::LoadVariant => "load:variant",
            Command::LoadStats => "load:stats",
            Command::LoadMap => "load:map",
            Command::LoadBinPreview => "load:binpreview",
            Command::LoadBin => "load:bin",
            Command::SearchInfos => "search:infos",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown command: {}", s))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InitResponse<'a> {
    pub cmd: &'static str,
    pub msg: &'a Catalog,
}

/// File contents served verbatim, for `load:variant` and `load:map`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FileResponse {
    pub cmd: &'static str,
    pub msg: String,
    pub id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatsResponse<'a> {
    pub cmd: &'static str,
    pub msg: Cow<'a, Stats>,
    pub id: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BinPreviewResponse {
    pub cmd: &'static str,
    pub smiles: String,
    pub index: String,
    #[serde(rename = "binSize")]
    pub bin_size: String,
}

impl BinPreviewResponse {
    pub fn empty() -> Self {
        Self {
            cmd: Command::LoadBinPreview.name(),
            smiles: String::new(),
            index: String::new(),
            bin_size: "0".to_string(),
        }
    }
}

/// Members of one or more bins; all vectors are parallel.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BinResponse {
    pub cmd: &'static str,
    pub smiles: Vec<String>,
    pub ids: Vec<String>,
    pub coordinates: Vec<String>,
    pub fps: Vec<String>,
    /// Bin each compound was taken from.
    #[serde(rename = "binIndices")]
    pub bin_indices: Vec<BinOrdinal>,
    pub index: String,
    #[serde(rename = "binSize")]
    pub bin_size: String,
}

impl BinResponse {
    pub fn empty(index: &str) -> Self {
        Self {
            cmd: Command::LoadBin.name(),
            smiles: Vec::new(),
            ids: Vec::new(),
            coordinates: Vec::new(),
            fps: Vec::new(),
            bin_indices: Vec::new(),
            index: index.to_string(),
            bin_size: "0".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub cmd: &'static str,
    #[serde(rename = "binIndices")]
    pub bin_indices: Vec<Vec<BinOrdinal>>,
    #[serde(rename = "searchTerms")]
    pub search_terms: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Response<'a> {
    Init(InitResponse<'a>),
    File(FileResponse),
    Stats(StatsResponse<'a>),
    BinPreview(BinPreviewResponse),
    Bin(BinResponse),
    Search(SearchResponse),
}

impl<'a> Response<'a> {
    pub fn cmd(&self) -> &'static str {
        match self {
            Response::Init(r) => r.cmd,
            Response::File(r) => r.cmd,
            Response::Stats(r) => r.cmd,
            Response::BinPreview(r) => r.cmd,
            Response::Bin(r) => r.cmd,
            Response::Search(r) => r.cmd,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
