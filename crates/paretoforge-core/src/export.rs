use crate::error::ForgeResult;
use crate::history::Checkpoint;
use std::io::Write;

/// Writes every archived candidate of `checkpoint` as CSV rows, survivors
/// and evaluated offspring of each generation. Returns the row count.
pub fn export_csv<W: Write>(checkpoint: &Checkpoint, out: W) -> ForgeResult<usize> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header: Vec<String> = ["generation", "set", "origin", "feasible", "overall_score"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(checkpoint.objective_names.iter().map(|n| format!("norm_{}", n)));
    header.extend(checkpoint.objective_names.iter().map(|n| format!("raw_{}", n)));
    header.extend(["error_reason".to_string(), "fingerprint".to_string()]);
    wtr.write_record(&header)?;

    let mut rows = 0;
    for record in checkpoint.history.generations() {
        let sets = [("survivor", &record.survivors), ("offspring", &record.offspring)];
        for (set, candidates) in sets {
            for c in candidates {
                let mut row = vec![
                    record.index.to_string(),
                    set.to_string(),
                    c.origin.to_string(),
                    c.feasible.to_string(),
                    format!("{:.6}", c.overall_score()),
                ];
                row.extend(
                    (0..checkpoint.objective_names.len())
                        .map(|i| c.objectives.get(i).map(|v| v.to_string()).unwrap_or_default()),
                );
                row.extend(checkpoint.objective_names.iter().map(|n| {
                    c.raw_metrics
                        .get(n)
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                }));
                row.push(c.error_reason.clone().unwrap_or_default());
                row.push(c.fingerprint());
                wtr.write_record(&row)?;
                rows += 1;
            }
        }
    }

    wtr.flush()?;
    Ok(rows)
}
