// ── Process-list encoding ──
//
// The server stores an input's processing as comma-separated
// `processId:feedId` pairs. Desired entries name a method and a feed; both
// are resolved to numeric ids against remote state, falling back to the
// names themselves when unresolved.

use std::collections::BTreeSet;

use crate::model::{ProcessCatalogue, RemoteFeed};
use crate::template::ProcessEntry;

/// Encode desired process entries as `proc:feed[,proc:feed...]`.
pub fn encode(entries: &[ProcessEntry], feeds: &[RemoteFeed], catalogue: &ProcessCatalogue) -> String {
    entries
        .iter()
        .map(|entry| {
            let process = catalogue
                .numeric_id(&entry.process)
                .map_or_else(|| entry.process.clone(), |id| id.to_string());
            let feed = feeds
                .iter()
                .find(|f| f.name == entry.arguments.value)
                .and_then(|f| f.id)
                .map_or_else(|| entry.arguments.value.clone(), |id| id.to_string());
            format!("{process}:{feed}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// An encoded process list compared as a set of pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessPairs(BTreeSet<(String, String)>);

impl ProcessPairs {
    /// Parse an encoded list. Empty segments are skipped; a segment
    /// without `:` has an empty feed part.
    pub fn parse(encoded: &str) -> Self {
        Self(
            encoded
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|pair| match pair.split_once(':') {
                    Some((p, f)) => (p.to_owned(), f.to_owned()),
                    None => (pair.to_owned(), String::new()),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// True when the remote attachment differs from the desired encoding.
/// Order is not significant; a missing remote list always differs.
pub fn differs(desired: &str, remote: Option<&str>) -> bool {
    remote.is_none_or(|remote| ProcessPairs::parse(desired) != ProcessPairs::parse(remote))
}
