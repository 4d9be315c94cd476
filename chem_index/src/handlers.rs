//! One handler per command
//!
//! Handlers never fail: any problem with the arguments or the data on disk is logged and answered
//! with the empty form of that command's response. Handlers read files synchronously and should
//! be called off the async executor.

use crate::bins::BinOrdinal;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::message::{
    BinPreviewResponse, BinResponse, Command, FileResponse, InitResponse, Request, Response,
    SearchResponse, StatsResponse,
};
use crate::record::{FINGERPRINT_FIELD, STRUCTURE_FIELD};
use crate::search::{filter_terms, search};
use log::{debug, warn};
use std::borrow::Cow;
use std::path::Path;

/// Runs the handler for `request`, or returns `None` for a command nobody handles.
pub fn dispatch<'a>(context: &'a Context, request: &Request) -> Option<Response<'a>> {
    let command = match request.command.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            warn!("{}", e);
            return None;
        }
    };

    let args = request.args.as_slice();

    let response = match command {
        Command::Init => Response::Init(init(context)),
        Command::LoadVariant => Response::File(load_variant(context, args)),
        Command::LoadStats => Response::Stats(load_stats(context, args)),
        Command::LoadMap => Response::File(load_map(context, args)),
        Command::LoadBinPreview => Response::BinPreview(load_bin_preview(context, args)),
        Command::LoadBin => Response::Bin(load_bin(context, args)),
        Command::SearchInfos => Response::Search(search_infos(context, args)),
    };

    Some(response)
}

pub fn init(context: &Context) -> InitResponse<'_> {
    InitResponse {
        cmd: Command::Init.name(),
        msg: context.catalog(),
    }
}

pub fn load_variant(context: &Context, args: &[String]) -> FileResponse {
    let id = args.first().map(String::as_str).unwrap_or_default();
    let path = context.variant(id).map(|v| v.coordinates_file.as_path());

    FileResponse {
        cmd: Command::LoadVariant.name(),
        msg: read_text(Command::LoadVariant, "variant", id, path),
        id: id.to_string(),
    }
}

pub fn load_stats<'a>(context: &'a Context, args: &[String]) -> StatsResponse<'a> {
    let id = args.first().map(String::as_str).unwrap_or_default();

    let stats = match context.stats(id) {
        Some(stats) => Cow::Borrowed(stats),
        None => {
            warn!("{}: {}", Command::LoadStats, Error::unknown("variant", id));
            Cow::Owned(Default::default())
        }
    };

    StatsResponse {
        cmd: Command::LoadStats.name(),
        msg: stats,
        id: id.to_string(),
    }
}

pub fn load_map(context: &Context, args: &[String]) -> FileResponse {
    let id = args.first().map(String::as_str).unwrap_or_default();
    let path = context.color_map_file(id);

    FileResponse {
        cmd: Command::LoadMap.name(),
        msg: read_text(Command::LoadMap, "color map", id, path),
        id: id.to_string(),
    }
}

fn read_text(command: Command, kind: &'static str, id: &str, path: Option<&Path>) -> String {
    let result = path
        .ok_or_else(|| Error::unknown(kind, id))
        .and_then(|path| std::fs::read(path).map_err(|e| Error::io(path, e)));

    match result {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("{}: {}", command, e);
            String::new()
        }
    }
}

pub fn load_bin_preview(context: &Context, args: &[String]) -> BinPreviewResponse {
    match bin_preview(context, args) {
        Ok(response) => response,
        Err(e) => {
            warn!("{}: {}", Command::LoadBinPreview, e);
            BinPreviewResponse::empty()
        }
    }
}

fn bin_preview(context: &Context, args: &[String]) -> Result<BinPreviewResponse> {
    let command = Command::LoadBinPreview;
    let fingerprint_id = arg(args, 1, command)?;
    let variant_id = arg(args, 2, command)?;
    let raw_bin = arg(args, 3, command)?;

    let bin = parse_ordinal(raw_bin)?;
    let members = bin_members(context, variant_id, bin)?;

    let first = *members.first().ok_or_else(|| Error::EmptyBin {
        variant: variant_id.to_string(),
        bin,
    })? as usize;

    let mut reader = context.records(fingerprint_id)?;
    check_ordinal(first, reader.len())?;
    let record = reader.fetch(first)?.require(first, STRUCTURE_FIELD + 1)?;

    debug!(
        "Bin preview for bin {} of {}: compound {} of {}",
        bin, variant_id, first, fingerprint_id
    );

    Ok(BinPreviewResponse {
        cmd: command.name(),
        smiles: record.structure().unwrap_or_default().to_string(),
        index: raw_bin.to_string(),
        bin_size: members.len().to_string(),
    })
}

pub fn load_bin(context: &Context, args: &[String]) -> BinResponse {
    match bin(context, args) {
        Ok(response) => response,
        Err(e) => {
            warn!("{}: {}", Command::LoadBin, e);
            BinResponse::empty(args.get(3).map(String::as_str).unwrap_or_default())
        }
    }
}

fn bin(context: &Context, args: &[String]) -> Result<BinResponse> {
    let command = Command::LoadBin;
    let fingerprint_id = arg(args, 1, command)?;
    let variant_id = arg(args, 2, command)?;
    let raw_bins = arg(args, 3, command)?;

    let bins = raw_bins
        .split(',')
        .map(parse_ordinal)
        .collect::<Result<Vec<usize>>>()?;

    let mut compounds: Vec<usize> = Vec::new();
    let mut origins: Vec<BinOrdinal> = Vec::new();

    for bin in bins {
        let members = bin_members(context, variant_id, bin)?;
        compounds.extend(members.iter().map(|m| *m as usize));
        origins.extend(std::iter::repeat(bin as BinOrdinal).take(members.len()));
    }

    let mut reader = context.records(fingerprint_id)?;
    let mut response = BinResponse::empty(raw_bins);

    for ordinal in compounds.iter().copied() {
        check_ordinal(ordinal, reader.len())?;
        let record = reader.fetch(ordinal)?.require(ordinal, FINGERPRINT_FIELD + 1)?;

        response.ids.push(record.id().unwrap_or_default().to_string());
        response.smiles.push(record.structure().unwrap_or_default().to_string());
        response.fps.push(record.fingerprint().unwrap_or_default().to_string());
        response.coordinates.push(record.coordinates().unwrap_or_default().to_string());
    }

    response.bin_indices = origins;
    response.bin_size = compounds.len().to_string();

    Ok(response)
}

pub fn search_infos(context: &Context, args: &[String]) -> SearchResponse {
    let terms = filter_terms(args.get(2..).unwrap_or_default());

    let result = match (args.first(), args.get(1)) {
        (Some(fingerprint_id), Some(variant_id)) => {
            search(context, fingerprint_id, variant_id, &terms)
        }
        _ => Err(Error::MissingArgument {
            command: Command::SearchInfos.name(),
            position: args.len(),
        }),
    };

    let bin_indices = match result {
        Ok(bins) => bins,
        Err(e) => {
            warn!("Error while searching: {}", e);
            vec![Vec::new(); terms.len()]
        }
    };

    SearchResponse {
        cmd: Command::SearchInfos.name(),
        bin_indices,
        search_terms: terms,
    }
}

fn arg<'a>(args: &'a [String], position: usize, command: Command) -> Result<&'a str> {
    args.get(position)
        .map(String::as_str)
        .ok_or(Error::MissingArgument {
            command: command.name(),
            position,
        })
}

fn parse_ordinal(raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| Error::InvalidArgument(raw.to_string()))
}

// bin ordinals come straight from clients
fn bin_members<'a>(context: &'a Context, variant_id: &str, bin: usize) -> Result<&'a [u32]> {
    let variant = context
        .variant(variant_id)
        .ok_or_else(|| Error::unknown("variant", variant_id))?;

    variant.bins.members(bin).ok_or_else(|| Error::BinOutOfRange {
        variant: variant_id.to_string(),
        bin,
        len: variant.bins.len(),
    })
}

// bin index files are not checked against their fingerprint at load
fn check_ordinal(ordinal: usize, len: usize) -> Result<()> {
    match ordinal < len {
        true => Ok(()),
        false => Err(Error::OrdinalOutOfRange { ordinal, len }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticDataset;

    fn example() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        SyntheticDataset::example().write(dir.path()).unwrap();
        let context = Context::open(dir.path()).unwrap();
        (dir, context)
    }

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn init_returns_resolved_catalog() {
        let (_dir, context) = example();

        let response = dispatch(&context, &Request::new("init", &[])).unwrap();
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["cmd"], "init");
        assert_eq!(value["msg"]["databases"][0]["id"], "db1");
        assert_eq!(value["msg"]["databases"][0]["fingerprints"][0]["id"], "db1.fp1");
        assert_eq!(
            value["msg"]["databases"][0]["fingerprints"][0]["variants"][0]["maps"][0]["id"],
            "db1.fp1.v1.m1"
        );
    }

    #[test]
    fn unknown_command_has_no_response() {
        let (_dir, context) = example();
        assert!(dispatch(&context, &Request::new("load:everything", &[])).is_none());
    }

    #[test]
    fn variant_and_map_are_served_verbatim() {
        let (dir, context) = example();
        let dataset = SyntheticDataset::example();

        let response = load_variant(&context, &args(&["db1.fp1.v1"]));
        let expected =
            std::fs::read_to_string(dataset.variant_dir(dir.path()).join("coords.txt")).unwrap();
        assert_eq!(response.cmd, "load:variant");
        assert_eq!(response.id, "db1.fp1.v1");
        assert_eq!(response.msg, expected);

        let response = load_map(&context, &args(&["db1.fp1.v1.m1"]));
        assert_eq!(response.cmd, "load:map");
        assert_eq!(response.msg, dataset.color_maps[0].content);
    }

    #[test]
    fn unknown_ids_give_empty_text() {
        let (_dir, context) = example();

        assert_eq!(load_variant(&context, &args(&["db1.fp1.v9"])).msg, "");
        assert_eq!(load_map(&context, &args(&[])).msg, "");
    }

    #[test]
    fn stats_for_variant() {
        let (_dir, context) = example();

        let response = load_stats(&context, &args(&["db1.fp1.v1"]));
        assert_eq!(response.msg.compound_count, 4);
        assert_eq!(response.msg.bin_count, 3);

        let response = load_stats(&context, &args(&["db1.fp1.v9"]));
        assert_eq!(response.msg.bin_count, 0);
        assert_eq!(response.id, "db1.fp1.v9");
    }

    #[test]
    fn bin_preview_of_first_member() {
        let (_dir, context) = example();

        let response = load_bin_preview(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "0"]));

        assert_eq!(response.smiles, "CCO");
        assert_eq!(response.index, "0");
        assert_eq!(response.bin_size, "2");
    }

    #[test]
    fn bin_preview_out_of_range() {
        let (_dir, context) = example();

        for bin in ["3", "4000000000", "-1", "x"] {
            let response =
                load_bin_preview(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", bin]));
            assert_eq!(response, BinPreviewResponse::empty(), "{}", bin);
        }

        let response = load_bin_preview(&context, &args(&["db1", "db1.fp1"]));
        assert_eq!(response.bin_size, "0");
    }

    #[test]
    fn bin_preview_of_empty_bin() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = SyntheticDataset::example();
        dataset.bins.push(Vec::new());
        dataset.write(dir.path()).unwrap();
        let context = Context::open(dir.path()).unwrap();

        let response = load_bin_preview(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "3"]));
        assert_eq!(response, BinPreviewResponse::empty());
    }

    #[test]
    fn bin_members_in_listed_order() {
        let (_dir, context) = example();

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "0,2"]));

        assert_eq!(response.ids, vec!["A", "B", "C"]);
        assert_eq!(response.smiles, vec!["CCO", "c1ccccc1", "CCN"]);
        assert_eq!(response.fps, vec!["0101", "1100", "0011"]);
        assert_eq!(response.coordinates, vec!["0.10,0.20", "0.15,0.25", "0.70,0.10"]);
        assert_eq!(response.bin_indices, vec![0, 0, 2]);
        assert_eq!(response.index, "0,2");
        assert_eq!(response.bin_size, "3");

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "2,1,0"]));
        assert_eq!(response.ids, vec!["C", "D", "A", "B"]);
        assert_eq!(response.bin_indices, vec![2, 1, 0, 0]);
    }

    #[test]
    fn bin_origins_follow_listed_bins() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = SyntheticDataset::example();
        dataset.bins = vec![vec![], vec![], vec![0, 1, 2], vec![], vec![], vec![3, 1]];
        dataset.write(dir.path()).unwrap();
        let context = Context::open(dir.path()).unwrap();

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "2,5"]));

        assert_eq!(response.len(), 5);
        assert_eq!(response.bin_indices, vec![2, 2, 2, 5, 5]);
        assert_eq!(response.ids, vec!["A", "B", "C", "D", "B"]);
    }

    #[test]
    fn bin_aborts_on_any_invalid_bin() {
        let (_dir, context) = example();

        for bins in ["0,3", "3,0", "0,,2", "", "a"] {
            let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", bins]));
            assert!(response.is_empty(), "{}", bins);
            assert_eq!(response.bin_indices.len(), 0);
            assert_eq!(response.bin_size, "0");
            assert_eq!(response.index, bins);
        }
    }

    #[test]
    fn bin_aborts_on_member_past_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = SyntheticDataset::example();
        dataset.bins = vec![vec![0, 1], vec![2, 9]];
        dataset.write(dir.path()).unwrap();
        let context = Context::open(dir.path()).unwrap();

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "0,1"]));
        assert!(response.is_empty());
        assert_eq!(response.bin_size, "0");

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "0"]));
        assert_eq!(response.ids, vec!["A", "B"]);
    }

    #[test]
    fn bin_aborts_on_short_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = SyntheticDataset::example();
        dataset.records[2] = crate::synthetic::SyntheticRecord::new("C", "CCN", "", "");
        dataset.write(dir.path()).unwrap();

        // rewrite record C as "C CCN" so it only has two fields
        let fingerprint_dir = dataset.fingerprint_dir(dir.path());
        let records = fingerprint_dir.join("infos.txt");
        let content = std::fs::read_to_string(&records)
            .unwrap()
            .replace("C CCN  \n", "C CCN\n");
        std::fs::write(&records, content).unwrap();
        crate::index::build_record_index(&records, &fingerprint_dir.join("infos.idx")).unwrap();
        let context = Context::open(dir.path()).unwrap();

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "2"]));
        assert!(response.is_empty());

        let response = load_bin(&context, &args(&["db1", "db1.fp1", "db1.fp1.v1", "0"]));
        assert_eq!(response.len(), 2);
    }

    #[test]
    fn search_example() {
        let (_dir, context) = example();

        let response = search_infos(&context, &args(&["db1.fp1", "db1.fp1.v1", "", "C", "CCO"]));

        assert_eq!(response.search_terms, vec!["C", "CCO"]);
        assert_eq!(response.bin_indices, vec![vec![2], vec![0]]);
    }

    #[test]
    fn search_without_terms() {
        let (_dir, context) = example();

        let response = search_infos(&context, &args(&["db1.fp1", "db1.fp1.v1", ""]));
        assert!(response.search_terms.is_empty());
        assert!(response.bin_indices.is_empty());
    }

    #[test]
    fn failed_search_is_empty_per_term() {
        let (_dir, context) = example();

        let response = search_infos(&context, &args(&["db1.fp9", "db1.fp1.v1", "A", "B"]));
        assert_eq!(response.bin_indices, vec![Vec::<u32>::new(), Vec::new()]);
        assert_eq!(response.search_terms, vec!["A", "B"]);

        let response = search_infos(&context, &args(&["db1.fp1"]));
        assert!(response.bin_indices.is_empty());
    }
}
