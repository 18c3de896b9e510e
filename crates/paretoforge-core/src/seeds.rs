use crate::codec::GenomeCodec;
use crate::core_types::Genome;
use crate::error::{ForgeError, ForgeResult};
use paretoforge_protocol::protocol::GenomePayload;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Reference jacket design matching the default schema.
const BASELINE_RECORDS: [(&str, &str); 18] = [
    ("GRUP_LG1", "GRUP LG1         42.200 1.450 29.0011.6050.00 1    1.001.00     0.500N490.005.00"),
    ("GRUP_LG2", "GRUP LG2         42.200 1.450 29.0011.6050.00 1    1.001.00     0.500N490.006.15"),
    ("GRUP_LG3", "GRUP LG3         42.200 1.450 29.0011.6050.00 1    1.001.00     0.500N490.006.75"),
    ("GRUP_LG4", "GRUP LG4         42.200 1.450 29.0011.6050.00 1    1.001.00     0.500N490.00"),
    ("GRUP_LG5", "GRUP LG5         36.300 1.050 29.0011.6050.00 1    1.001.00     0.500N490.00"),
    ("GRUP_LG6", "GRUP LG6         36.300 0.800 29.0011.0036.00 1    1.001.00     0.500N490.003.25"),
    ("GRUP_LG7", "GRUP LG7         26.200 0.800 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_PL1", "GRUP PL1         36.300 1.050 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_PL2", "GRUP PL2         36.300 1.050 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_PL3", "GRUP PL3         36.300 1.050 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_PL4", "GRUP PL4         36.300 1.050 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_T01", "GRUP T01         16.100 0.650 29.0111.2035.00 1    1.001.00     0.500N490.00"),
    ("GRUP_T02", "GRUP T02         20.100 0.780 29.0011.6035.00 1    1.001.00     0.500N490.00"),
    ("GRUP_T03", "GRUP T03         12.800 0.520 29.0111.6035.00 1    1.001.00     0.500N490.00"),
    ("GRUP_T04", "GRUP T04         24.100 0.780 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_T05", "GRUP T05         26.100 1.050 29.0011.6036.00 1    1.001.00     0.500N490.00"),
    ("GRUP_W.B", "GRUP W.B         36.500 1.050 29.0111.2035.97 1    1.001.00     0.500 490.00"),
    ("PGRUP_P01", "PGRUP P01 0.3750I29.000 0.25036.000                                     490.0000"),
];

pub fn builtin_baseline() -> Genome {
    let mut genome = Genome::new();
    for (name, record) in BASELINE_RECORDS {
        genome.insert(name, record);
    }
    genome
}

/// Seed files hold either the wrapped payload or a bare block map.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Wrapped(GenomePayload),
    Bare(BTreeMap<String, String>),
}

pub fn parse_seed(text: &str) -> Result<Genome, serde_json::Error> {
    Ok(match serde_json::from_str::<SeedFile>(text)? {
        SeedFile::Wrapped(p) => Genome::from_blocks(p.new_code_blocks),
        SeedFile::Bare(blocks) => Genome::from_blocks(blocks),
    })
}

/// Read-only library of schema-complete, distinct seed genomes. The baseline
/// is always the first seed.
#[derive(Debug, Clone)]
pub struct SeedCatalog {
    seeds: Vec<Genome>,
}

impl SeedCatalog {
    /// Validates `baseline` and every overlay of `partials` onto it. Invalid
    /// partials are skipped; an invalid baseline is fatal.
    pub fn from_genomes(
        codec: &GenomeCodec,
        baseline: Genome,
        partials: Vec<(String, Genome)>,
    ) -> ForgeResult<Self> {
        codec
            .validate_genome(&baseline)
            .map_err(|e| ForgeError::Config(format!("baseline seed is invalid: {}", e)))?;

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(baseline.fingerprint());
        let mut seeds = vec![baseline.clone()];

        for (label, partial) in partials {
            let merged = baseline.overlay(&partial);
            if let Err(e) = codec.validate_genome(&merged) {
                warn!("⚠️ Skipping seed '{}': {}", label, e);
                continue;
            }
            if seen.insert(merged.fingerprint()) {
                seeds.push(merged);
            } else {
                info!("Seed '{}' duplicates an earlier seed", label);
            }
        }

        Ok(Self { seeds })
    }

    /// Only the built-in baseline. Fails when the schema is not the default one.
    pub fn builtin(codec: &GenomeCodec) -> ForgeResult<Self> {
        Self::from_genomes(codec, builtin_baseline(), Vec::new())
    }

    /// Loads every `*.json` file of `dir` in file-name order. Without an
    /// explicit `baseline`, the first readable file is the baseline.
    pub fn load_dir<P: AsRef<Path>>(
        dir: P,
        codec: &GenomeCodec,
        baseline: Option<Genome>,
    ) -> ForgeResult<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut parsed: Vec<(String, Genome)> = Vec::with_capacity(paths.len());
        for path in &paths {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let genome = fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|text| parse_seed(&text).map_err(|e| e.to_string()));
            match genome {
                Ok(g) => parsed.push((label, g)),
                Err(e) => warn!("⚠️ Skipping unreadable seed '{}': {}", label, e),
            }
        }

        let baseline = match baseline {
            Some(b) => b,
            None if parsed.is_empty() => {
                return Err(ForgeError::Config(format!(
                    "seed directory {:?} holds no usable seeds",
                    dir
                )));
            }
            None => parsed.remove(0).1,
        };

        let catalog = Self::from_genomes(codec, baseline, parsed)?;
        info!("📚 Loaded {} seeds from {:?}", catalog.len(), dir);
        Ok(catalog)
    }

    pub fn baseline(&self) -> &Genome {
        &self.seeds[0]
    }

    pub fn seeds(&self) -> &[Genome] {
        &self.seeds
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}
