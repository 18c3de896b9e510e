use crate::objective::ObjectiveSpec;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

pub const CANDIDATE_OPEN: &str = "<candidate>";
pub const CANDIDATE_CLOSE: &str = "</candidate>";

/// External representation of a genome, as written by seed files and by
/// generative proposals.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct GenomePayload {
    pub new_code_blocks: BTreeMap<String, String>,
}

/// A parent handed to the generative collaborator: its blocks and whatever
/// raw metrics are known for it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SerializedCandidate {
    pub code_blocks: BTreeMap<String, String>,
    #[serde(default)]
    pub performance: BTreeMap<String, f64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Instruction {
    Mutation,
    Crossover,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerativeRequest {
    pub instruction: Instruction,
    pub parents: Vec<SerializedCandidate>,
    /// Number of delimited payloads expected in the response.
    pub children: usize,
    pub objectives: Vec<ObjectiveSpec>,
}

/// Shape of the analysis result store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricsDocument {
    pub status: String,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}
