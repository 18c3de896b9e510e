use crate::cmd::{load_genome, load_schema};
use crate::reports::{self, SeedAudit};
use clap::Args;
use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::error::{ForgeError, ForgeResult};
use paretoforge_core::seeds::{builtin_baseline, parse_seed};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Directory of seed files to audit
    #[arg(long)]
    pub seeds: Option<String>,

    /// Baseline genome (defaults to the built-in reference design)
    #[arg(long)]
    pub baseline: Option<String>,
}

fn seed_files(dir: &Path) -> ForgeResult<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

pub fn run(args: &ValidateArgs, schema_path: Option<&str>) -> ForgeResult<()> {
    let schema = load_schema(schema_path)?;
    schema.validate()?;
    info!(
        "📐 Schema: {} layouts, {} blocks",
        schema.layouts.len(),
        schema.blocks.len()
    );
    let codec = GenomeCodec::new(Arc::new(schema));

    let baseline = match &args.baseline {
        Some(path) => load_genome(path)?,
        None => builtin_baseline(),
    };
    let mut rows = vec![SeedAudit {
        label: args.baseline.clone().unwrap_or_else(|| "(built-in baseline)".into()),
        blocks: baseline.len(),
        error: codec.validate_genome(&baseline).err().map(|e| e.to_string()),
    }];
    let baseline_ok = rows[0].error.is_none();

    if let Some(dir) = &args.seeds {
        for path in seed_files(Path::new(dir))? {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parsed = fs::read_to_string(&path)
                .map_err(ForgeError::from)
                .and_then(|text| parse_seed(&text).map_err(ForgeError::from));
            let row = match parsed {
                Ok(partial) => {
                    let merged = baseline.overlay(&partial);
                    SeedAudit {
                        label,
                        blocks: partial.len(),
                        error: codec.validate_genome(&merged).err().map(|e| e.to_string()),
                    }
                }
                Err(e) => SeedAudit {
                    label,
                    blocks: 0,
                    error: Some(e.to_string()),
                },
            };
            rows.push(row);
        }
    }

    reports::print_decoded_fields("📋 === BASELINE FIELDS ===", &codec, &baseline);
    reports::print_seed_audit(&rows);

    let invalid = rows.iter().filter(|r| r.error.is_some()).count();
    info!("✅ {} valid, {} invalid", rows.len() - invalid, invalid);

    if !baseline_ok {
        return Err(ForgeError::Config("baseline genome is invalid".into()));
    }
    Ok(())
}
