use crate::error::VariationError;
use crate::util::sha256_hex;
use paretoforge_protocol::protocol::{GenomePayload, CANDIDATE_CLOSE, CANDIDATE_OPEN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// One design: block name -> fixed-width text record.
///
/// Ordered so that iteration, serialization and the random draws made while
/// walking the blocks are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    blocks: BTreeMap<String, String>,
}

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: BTreeMap<String, String>) -> Self {
        Self { blocks }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.blocks.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, record: impl Into<String>) {
        self.blocks.insert(name.into(), record.into());
    }

    pub fn blocks(&self) -> &BTreeMap<String, String> {
        &self.blocks
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn into_blocks(self) -> BTreeMap<String, String> {
        self.blocks
    }

    /// Overlays `other`'s blocks onto a copy of `self`.
    pub fn overlay(&self, other: &Genome) -> Genome {
        let mut merged = self.clone();
        for (name, record) in &other.blocks {
            merged.blocks.insert(name.clone(), record.clone());
        }
        merged
    }

    /// Canonical external form: `{"new_code_blocks": {...}}`.
    pub fn to_payload(&self) -> String {
        serde_json::json!({ "new_code_blocks": &self.blocks }).to_string()
    }

    /// Parses the external form. A single `<candidate>` wrapper is accepted
    /// and stripped.
    pub fn from_payload(text: &str) -> Result<Genome, VariationError> {
        let body = unwrap_candidate(text).unwrap_or(text).trim();
        let payload: GenomePayload = serde_json::from_str(body)
            .map_err(|e| VariationError::malformed(e.to_string(), text))?;
        Ok(Genome::from_blocks(payload.new_code_blocks))
    }

    pub fn fingerprint(&self) -> String {
        sha256_hex(self.to_payload().as_bytes())
    }
}

/// Text between the first `<candidate>` and the following `</candidate>`.
pub fn unwrap_candidate(text: &str) -> Option<&str> {
    let start = text.find(CANDIDATE_OPEN)? + CANDIDATE_OPEN.len();
    let len = text[start..].find(CANDIDATE_CLOSE)?;
    Some(&text[start..start + len])
}

/// Every delimited payload in a free-form response, in order.
pub fn extract_candidates(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(CANDIDATE_OPEN) {
        let after = &rest[open + CANDIDATE_OPEN.len()..];
        match after.find(CANDIDATE_CLOSE) {
            Some(close) => {
                found.push(&after[..close]);
                rest = &after[close + CANDIDATE_CLOSE.len()..];
            }
            None => break,
        }
    }
    found
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Origin {
    Seed,
    Mutation,
    Crossover,
    Generative,
    /// A proposal that never made it to a well-formed genome.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub payload: String,
    pub feasible: bool,
    /// Normalized, lower is better, one entry per objective.
    pub objectives: Vec<f64>,
    pub raw_metrics: BTreeMap<String, f64>,
    pub error_reason: Option<String>,
    pub origin: Origin,
    pub generation: usize,
}

impl Candidate {
    /// An unevaluated candidate carrying `payload` verbatim.
    pub fn proposed(payload: impl Into<String>, origin: Origin, generation: usize) -> Self {
        Self {
            payload: payload.into(),
            feasible: false,
            objectives: Vec::new(),
            raw_metrics: BTreeMap::new(),
            error_reason: None,
            origin,
            generation,
        }
    }

    pub fn from_genome(genome: &Genome, origin: Origin, generation: usize) -> Self {
        Self::proposed(genome.to_payload(), origin, generation)
    }

    pub fn genome(&self) -> Option<Genome> {
        Genome::from_payload(&self.payload).ok()
    }

    /// Content hash of the parsed genome, or of the raw text when it does
    /// not parse.
    pub fn fingerprint(&self) -> String {
        match self.genome() {
            Some(g) => g.fingerprint(),
            None => sha256_hex(self.payload.as_bytes()),
        }
    }

    /// Scalar summary for display: `1 - mean(objectives)`, or `-1` when
    /// penalized. Never used for selection.
    pub fn overall_score(&self) -> f64 {
        if !self.feasible {
            return -1.0;
        }
        if self.objectives.is_empty() {
            return 1.0;
        }
        1.0 - self.objectives.iter().sum::<f64>() / self.objectives.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome() -> Genome {
        let mut g = Genome::new();
        g.insert("GRUP LG1", "GRUP LG1         42.200 1.450");
        g.insert("PGRUP P01", "PGRUP P01 0.3750I29.000");
        g
    }

    #[test]
    fn test_payload_accepts_wrapper() {
        let g = genome();
        let wrapped = format!("Here you go:\n<candidate>{}</candidate>\nthanks", g.to_payload());
        assert_eq!(Genome::from_payload(&wrapped).unwrap(), g);
        assert_eq!(Genome::from_payload(&g.to_payload()).unwrap(), g);
    }

    #[test]
    fn test_payload_rejects_garbage() {
        let err = Genome::from_payload("<candidate>{not json</candidate>").unwrap_err();
        assert!(matches!(err, VariationError::MalformedGenome { .. }));
        assert!(err.payload().contains("not json"));
    }

    #[test]
    fn test_extract_candidates_ignores_unclosed() {
        let text = "a<candidate>1</candidate>b<candidate>2</candidate><candidate>3";
        assert_eq!(extract_candidates(text), vec!["1", "2"]);
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        let g = genome();
        let spaced = serde_json::to_string_pretty(&GenomePayload {
            new_code_blocks: g.blocks().clone(),
        })
        .unwrap();
        let a = Candidate::proposed(g.to_payload(), Origin::Seed, 0);
        let b = Candidate::proposed(spaced, Origin::Mutation, 3);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_overall_score() {
        let mut c = Candidate::proposed("", Origin::Seed, 0);
        c.objectives = vec![0.2, 0.4];
        assert_eq!(c.overall_score(), -1.0);
        c.feasible = true;
        assert!((c.overall_score() - 0.7).abs() < 1e-12);
    }
}
