use crate::consts::{STDERR_CAPTURE_FILE, STDERR_TAIL_LINES};
use crate::error::{ForgeError, ForgeResult};
use crate::fitness::{AnalysisEngine, MetricStatus, MetricsReport, RunOutcome};
use crate::util::{atomic_write, shell_command, tail_lines, wait_with_timeout};
use paretoforge_protocol::config::AnalysisParams;
use paretoforge_protocol::protocol::MetricsDocument;
use paretoforge_protocol::schema::record_label;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Drives an external analysis command inside a private copy of the
/// template project.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    workdir: PathBuf,
    input_file: String,
    command: String,
    metrics_file: String,
}

fn copy_tree(from: &Path, to: &Path) -> ForgeResult<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| ForgeError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| ForgeError::Config(e.to_string()))?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Replaces every line that starts with a block's label by that block's
/// record. `None` if some block matches no line.
pub fn rewrite_deck(content: &str, blocks: &BTreeMap<String, String>) -> Option<String> {
    let labels: Vec<(String, &String)> = blocks
        .iter()
        .map(|(name, record)| (record_label(name), record))
        .collect();
    let mut matched = vec![false; labels.len()];

    let mut out = String::with_capacity(content.len());
    for segment in content.split_inclusive('\n') {
        let (line, ending) = match segment.strip_suffix("\r\n") {
            Some(l) => (l, "\r\n"),
            None => match segment.strip_suffix('\n') {
                Some(l) => (l, "\n"),
                None => (segment, ""),
            },
        };

        let hit = labels.iter().position(|(label, _)| {
            line.strip_prefix(label.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        });
        match hit {
            Some(i) => {
                matched[i] = true;
                out.push_str(labels[i].1);
            }
            None => out.push_str(line),
        }
        out.push_str(ending);
    }

    if let Some(i) = matched.iter().position(|m| !m) {
        debug!("block '{}' has no line in the input deck", labels[i].0);
        return None;
    }
    Some(out)
}

impl ProcessEngine {
    /// Copies the template project into `<scratch_root>/slot_<slot>`.
    pub fn new(params: &AnalysisParams, slot: usize) -> ForgeResult<Self> {
        let template = Path::new(&params.project_dir);
        if !template.join(&params.input_file).is_file() {
            return Err(ForgeError::Config(format!(
                "input deck {:?} not found in project {:?}",
                params.input_file, template
            )));
        }

        let workdir = Path::new(&params.scratch_root).join(format!("slot_{}", slot));
        if workdir.exists() {
            fs::remove_dir_all(&workdir)?;
        }
        fs::create_dir_all(&workdir)?;
        copy_tree(template, &workdir)?;
        debug!("analysis slot {} ready at {:?}", slot, workdir);

        Ok(Self {
            workdir,
            input_file: params.input_file.clone(),
            command: params.analysis_command.clone(),
            metrics_file: params.metrics_file.clone(),
        })
    }

    pub fn create_slots(params: &AnalysisParams, workers: usize) -> ForgeResult<Vec<Box<dyn AnalysisEngine>>> {
        (0..workers.max(1))
            .map(|i| Ok(Box::new(Self::new(params, i)?) as Box<dyn AnalysisEngine>))
            .collect()
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn metrics_path(&self) -> PathBuf {
        self.workdir.join(&self.metrics_file)
    }
}

impl AnalysisEngine for ProcessEngine {
    fn write(&mut self, blocks: &BTreeMap<String, String>) -> bool {
        let path = self.workdir.join(&self.input_file);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Cannot read input deck {:?}: {}", path, e);
                return false;
            }
        };
        let Some(updated) = rewrite_deck(&content, blocks) else {
            return false;
        };
        match atomic_write(&path, updated) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot write input deck {:?}: {}", path, e);
                false
            }
        }
    }

    fn run(&mut self, timeout: Duration) -> RunOutcome {
        if self.command.trim().is_empty() {
            return RunOutcome::failed("no analysis command configured");
        }

        let metrics = self.metrics_path();
        if metrics.exists() {
            if let Err(e) = fs::remove_file(&metrics) {
                return RunOutcome::failed(format!("cannot clear stale metrics: {}", e));
            }
        }

        let stderr_path = self.workdir.join(STDERR_CAPTURE_FILE);
        let stderr = match fs::File::create(&stderr_path) {
            Ok(f) => f,
            Err(e) => return RunOutcome::failed(format!("cannot capture stderr: {}", e)),
        };

        let spawned = shell_command(&self.command)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => return RunOutcome::failed(format!("failed to launch analysis: {}", e)),
        };

        match wait_with_timeout(&mut child, timeout) {
            Ok(Some(status)) if status.success() => RunOutcome::ok(),
            Ok(Some(status)) => {
                let tail = fs::read_to_string(&stderr_path)
                    .map(|text| tail_lines(&text, STDERR_TAIL_LINES))
                    .unwrap_or_default();
                RunOutcome::failed(format!("analysis exited with {}: {}", status, tail))
            }
            Ok(None) => RunOutcome::failed(format!(
                "analysis timed out after {}s",
                timeout.as_secs()
            )),
            Err(e) => RunOutcome::failed(format!("failed to wait for analysis: {}", e)),
        }
    }

    fn read_metrics(&mut self) -> MetricsReport {
        let text = match fs::read_to_string(self.metrics_path()) {
            Ok(t) => t,
            Err(_) => return MetricsReport::failed(),
        };
        match serde_json::from_str::<MetricsDocument>(&text) {
            Ok(doc) => MetricsReport {
                status: MetricStatus::parse_lenient(&doc.status),
                values: doc.values,
            },
            Err(e) => {
                debug!("unparsable metrics file: {}", e);
                MetricsReport::failed()
            }
        }
    }
}
