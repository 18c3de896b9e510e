mod tables;

pub use self::tables::SeedAudit;

use comfy_table::Table;
use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::core_types::{Candidate, Genome};
use paretoforge_core::history::HistoryBuffer;

fn print(title: &str, table: Table) {
    println!("\n{}", title);
    println!("{}", table);
}

pub fn print_front(objective_names: &[String], members: &[&Candidate]) {
    print(
        &format!("🏆 === PARETO FRONT ({} members) ===", members.len()),
        tables::front(objective_names, members),
    );
}

pub fn print_generations(history: &HistoryBuffer) {
    print("🧬 === GENERATIONS ===", tables::generations(history));
}

pub fn print_best_per_objective(objective_names: &[String], population: &[Candidate]) {
    print(
        "🎯 === BEST PER OBJECTIVE ===",
        tables::best_per_objective(objective_names, population),
    );
}

pub fn print_seed_audit(rows: &[SeedAudit]) {
    print("🔎 === SEED AUDIT ===", tables::seed_audit(rows));
}

pub fn print_decoded_fields(title: &str, codec: &GenomeCodec, genome: &Genome) {
    print(title, tables::decoded_fields(codec, genome));
}
