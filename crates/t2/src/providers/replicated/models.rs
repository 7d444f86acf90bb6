//! Parsing of `replicated cluster ls` output.
//!
//! The listing is free text with variable column widths, so rows are matched
//! with a regular expression rather than by header offsets.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// State of a cluster that is ready for use.
pub const STATE_RUNNING: &str = "running";

/// Lifetime of a test cluster before Replicated removes it on its own.
pub const CLUSTER_TTL: &str = "6h";

/// `ID NAME DISTRIBUTION VERSION STATUS ...`; the header does not match
/// because `ID` is not a hex id followed by whitespace.
static CLUSTER_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-f]*)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+.*").expect("valid regex")
});

/// A cluster as reported by `replicated cluster ls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatedCluster {
    pub id: String,
    pub name: String,
    pub distribution: String,
    pub version: String,
    pub state: String,
}

/// Parse `replicated cluster ls` output into clusters keyed by name.
#[must_use]
pub fn parse_cluster_list<S: AsRef<str>>(lines: &[S]) -> BTreeMap<String, ReplicatedCluster> {
    lines
        .iter()
        .filter_map(|line| CLUSTER_ROW.captures(line.as_ref()))
        .map(|caps| {
            let cluster = ReplicatedCluster {
                id: caps[1].to_string(),
                name: caps[2].to_string(),
                distribution: caps[3].to_string(),
                version: caps[4].to_string(),
                state: caps[5].to_string(),
            };
            (cluster.name.clone(), cluster)
        })
        .collect()
}
