use crate::config::SearchParams;
use crate::objective::ObjectiveSpec;
use crate::schema::Schema;
use crate::ConfigError;
use sha2::{Digest, Sha256};

/// Fingerprint of a problem definition. Two runs with the same identifier
/// search the same space under the same objectives and budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentifier {
    pub hash: String,
}

impl RunIdentifier {
    pub fn from_parts(
        schema: &Schema,
        objectives: &[ObjectiveSpec],
        params: &SearchParams,
    ) -> Result<Self, ConfigError> {
        let mut hasher = Sha256::new();

        let schema_json = serde_json::to_string(schema)?;
        hasher.update(schema_json.as_bytes());

        let objectives_json = serde_json::to_string(objectives)?;
        hasher.update(objectives_json.as_bytes());

        // Budgets and persistence settings may change between a run and its
        // resumption; only the parts that shape the search are hashed.
        let shape = (
            params.pop_size,
            params.offspring_count,
            params.rng_seed,
            params.parent_selection,
            params.tournament_size,
        );
        let params_json = serde_json::to_string(&shape)?;
        hasher.update(params_json.as_bytes());

        let result = hasher.finalize();
        Ok(Self {
            hash: hex::encode(result),
        })
    }

    pub fn short(&self) -> &str {
        &self.hash[..self.hash.len().min(12)]
    }
}
