pub mod export;
pub mod inspect;
pub mod search;
pub mod validate;

use paretoforge_core::core_types::Genome;
use paretoforge_core::error::ForgeResult;
use paretoforge_core::schema::Schema;
use paretoforge_core::seeds::parse_seed;
use std::fs;
use tracing::info;

pub fn load_schema(path: Option<&str>) -> ForgeResult<Schema> {
    match path {
        Some(p) => {
            info!("📐 Loading schema: {}", p);
            Ok(Schema::load_from_file(p)?)
        }
        None => Ok(Schema::default()),
    }
}

pub fn load_genome(path: &str) -> ForgeResult<Genome> {
    let text = fs::read_to_string(path)?;
    Ok(parse_seed(&text)?)
}
