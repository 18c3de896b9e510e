use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::core_types::{Candidate, Genome};
use paretoforge_core::history::HistoryBuffer;

fn new_table(header: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn right_align(table: &mut Table, from: usize) {
    let count = table.column_count();
    for i in from..count {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

/// Raw metric values of `members`, one row each.
pub fn front(objective_names: &[String], members: &[&Candidate]) -> Table {
    let mut header = vec![Cell::new("#").add_attribute(Attribute::Bold)];
    header.extend(objective_names.iter().map(|n| Cell::new(n).fg(Color::Cyan)));
    header.push(Cell::new("Score"));
    header.push(Cell::new("Origin"));
    header.push(Cell::new("Gen"));
    let mut table = new_table(header);

    for (i, c) in members.iter().enumerate() {
        let mut row = vec![Cell::new(i + 1)];
        row.extend(objective_names.iter().map(|n| {
            Cell::new(
                c.raw_metrics
                    .get(n)
                    .map(|v| format!("{:.4}", v))
                    .unwrap_or_else(|| "-".into()),
            )
        }));
        row.push(Cell::new(format!("{:.4}", c.overall_score())).fg(Color::Green));
        row.push(Cell::new(c.origin));
        row.push(Cell::new(c.generation));
        table.add_row(row);
    }
    right_align(&mut table, 1);
    table
}

pub fn generations(history: &HistoryBuffer) -> Table {
    let header = [
        "Gen", "Evaluated", "Invalid", "Repeated", "Feasible", "Front", "Best", "Total",
    ]
    .into_iter()
    .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
    .collect();
    let mut table = new_table(header);

    for record in history.generations() {
        let s = &record.stats;
        let invalid = if s.invalid > 0 {
            Cell::new(s.invalid).fg(Color::Red)
        } else {
            Cell::new(s.invalid)
        };
        table.add_row(vec![
            Cell::new(record.index),
            Cell::new(s.evaluated),
            invalid,
            Cell::new(s.repeated),
            Cell::new(s.feasible),
            Cell::new(s.front_size),
            Cell::new(format!("{:.4}", s.best_score)).fg(Color::Green),
            Cell::new(s.evaluations),
        ]);
    }
    right_align(&mut table, 0);
    table
}

/// Best feasible member of `population` on each objective.
pub fn best_per_objective(objective_names: &[String], population: &[Candidate]) -> Table {
    let mut table = new_table(
        ["Objective", "Best raw", "Score", "Origin", "Gen"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect(),
    );

    for (i, name) in objective_names.iter().enumerate() {
        let best = population
            .iter()
            .filter(|c| c.feasible)
            .filter(|c| c.objectives.get(i).is_some())
            .min_by(|a, b| a.objectives[i].total_cmp(&b.objectives[i]));
        match best {
            Some(c) => table.add_row(vec![
                Cell::new(name).fg(Color::Cyan),
                Cell::new(
                    c.raw_metrics
                        .get(name)
                        .map(|v| format!("{:.4}", v))
                        .unwrap_or_else(|| "-".into()),
                ),
                Cell::new(format!("{:.4}", c.overall_score())),
                Cell::new(c.origin),
                Cell::new(c.generation),
            ]),
            None => table.add_row(vec![
                Cell::new(name).fg(Color::Cyan),
                Cell::new("no feasible candidate").fg(Color::Red),
            ]),
        };
    }
    table
}

/// One seed file per row.
pub struct SeedAudit {
    pub label: String,
    pub blocks: usize,
    pub error: Option<String>,
}

pub fn seed_audit(rows: &[SeedAudit]) -> Table {
    let mut table = new_table(
        ["Seed", "Blocks", "Status", "Reason"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect(),
    );
    for row in rows {
        let status = match row.error {
            None => Cell::new("valid").fg(Color::Green),
            Some(_) => Cell::new("invalid").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(&row.label),
            Cell::new(row.blocks),
            status,
            Cell::new(row.error.as_deref().unwrap_or("")),
        ]);
    }
    table
}

/// Decoded numeric fields of every block of `genome`.
pub fn decoded_fields(codec: &GenomeCodec, genome: &Genome) -> Table {
    let mut table = new_table(
        ["Block", "Fields"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect(),
    );
    for (name, record) in genome.blocks() {
        let fields = match codec.decode_named(record) {
            Ok(values) if values.is_empty() => Cell::new("(no layout)"),
            Ok(values) => Cell::new(
                values
                    .iter()
                    .map(|(f, v)| format!("{}={}", f, v))
                    .collect::<Vec<_>>()
                    .join("  "),
            ),
            Err(e) => Cell::new(e.to_string()).fg(Color::Red),
        };
        table.add_row(vec![Cell::new(name).add_attribute(Attribute::Bold), fields]);
    }
    table
}
