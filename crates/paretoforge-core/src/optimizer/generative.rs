use crate::consts::ERROR_REASON_LIMIT;
use crate::core_types::{extract_candidates, Genome, Origin};
use crate::error::VariationError;
use crate::optimizer::variation::{Parent, VariationOperator};
use crate::util::{shell_command, truncate_chars, wait_with_timeout};
use fastrand::Rng;
use paretoforge_protocol::objective::ObjectiveSpec;
use paretoforge_protocol::protocol::{GenerativeRequest, Instruction, SerializedCandidate};
use std::io::{Read, Write};
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Turns a request into free-form text containing delimited payloads.
pub trait GenerativeBackend: Send + Sync {
    fn complete(&self, request: &GenerativeRequest) -> Result<String, VariationError>;
}

impl<F> GenerativeBackend for F
where
    F: Fn(&GenerativeRequest) -> Result<String, VariationError> + Send + Sync,
{
    fn complete(&self, request: &GenerativeRequest) -> Result<String, VariationError> {
        self(request)
    }
}

/// Pipes the request JSON into a shell command and reads its stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    pub command: String,
    pub timeout: Duration,
}

impl CommandBackend {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

impl GenerativeBackend for CommandBackend {
    fn complete(&self, request: &GenerativeRequest) -> Result<String, VariationError> {
        let backend_err = |e: String| VariationError::Backend(truncate_chars(&e, ERROR_REASON_LIMIT));

        let body = serde_json::to_vec(request).map_err(|e| backend_err(e.to_string()))?;
        let mut child = shell_command(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| backend_err(format!("failed to launch '{}': {}", self.command, e)))?;

        // Feed stdin and drain stdout on their own threads so neither pipe
        // can stall the child while the timeout runs
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                // A command that ignores its input closes the pipe early
                if let Err(e) = stdin.write_all(&body) {
                    debug!("generative command did not read its request: {}", e);
                }
            })
        });

        let reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut text = String::new();
                out.read_to_string(&mut text).map(|_| text)
            })
        });

        let status = wait_with_timeout(&mut child, self.timeout)
            .map_err(|e| backend_err(e.to_string()))?
            .ok_or_else(|| {
                backend_err(format!(
                    "generative command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?;

        if let Some(handle) = writer {
            handle
                .join()
                .map_err(|_| backend_err("stdin writer panicked".into()))?;
        }

        let text = match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| backend_err("stdout reader panicked".into()))?
                .map_err(|e| backend_err(e.to_string()))?,
            None => String::new(),
        };

        if !status.success() {
            return Err(backend_err(format!("generative command exited with {}", status)));
        }
        Ok(text)
    }
}

/// Delegates child production to an external generator.
pub struct Generative<B: GenerativeBackend> {
    backend: B,
    instruction: Instruction,
    objectives: Vec<ObjectiveSpec>,
}

impl<B: GenerativeBackend> Generative<B> {
    pub fn new(backend: B, instruction: Instruction, objectives: Vec<ObjectiveSpec>) -> Self {
        Self {
            backend,
            instruction,
            objectives,
        }
    }

    pub fn request(&self, parents: &[Parent<'_>]) -> GenerativeRequest {
        GenerativeRequest {
            instruction: self.instruction,
            parents: parents
                .iter()
                .map(|p| SerializedCandidate {
                    code_blocks: p.genome.blocks().clone(),
                    performance: p.raw_metrics.clone(),
                })
                .collect(),
            children: self.children(),
            objectives: self.objectives.clone(),
        }
    }
}

/// Parses every delimited payload of `response`. No delimiter at all is a
/// single malformed result carrying the whole response.
pub fn parse_response(response: &str) -> Vec<Result<Genome, VariationError>> {
    let payloads = extract_candidates(response);
    if payloads.is_empty() {
        return vec![Err(VariationError::malformed(
            "no <candidate> payload in response",
            response,
        ))];
    }
    payloads.into_iter().map(Genome::from_payload).collect()
}

impl<B: GenerativeBackend> VariationOperator for Generative<B> {
    fn name(&self) -> &'static str {
        "generative"
    }

    fn arity(&self) -> usize {
        match self.instruction {
            Instruction::Mutation => 1,
            Instruction::Crossover => 2,
        }
    }

    fn origin(&self) -> Origin {
        Origin::Generative
    }

    fn propose(&self, parents: &[Parent<'_>], _rng: &mut Rng) -> Vec<Result<Genome, VariationError>> {
        let request = self.request(parents);
        match self.backend.complete(&request) {
            Ok(text) => parse_response(&text),
            Err(e) => {
                warn!("⚠️ Generative backend failed: {}", e);
                vec![Err(e); self.children()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GenomeCodec;
    use crate::seeds::builtin_baseline;
    use paretoforge_protocol::schema::Schema;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn test_closure_backend_roundtrip() {
        let base = builtin_baseline();
        let payload = base.to_payload();
        let backend = move |req: &GenerativeRequest| -> Result<String, VariationError> {
            assert_eq!(req.instruction, Instruction::Mutation);
            assert_eq!(req.parents.len(), 1);
            Ok(format!("thinking...\n<candidate>{}</candidate>\ndone", payload))
        };
        let op = Generative::new(backend, Instruction::Mutation, vec![]);

        let codec = GenomeCodec::new(Arc::new(Schema::default()));
        let metrics = BTreeMap::new();
        let parents = [Parent {
            genome: &base,
            raw_metrics: &metrics,
        }];
        let out = op.vary(&codec, &parents, &mut Rng::with_seed(0));
        assert_eq!(out, vec![Ok(base.clone())]);
    }

    #[test]
    fn test_missing_delimiter_is_malformed() {
        let out = parse_response("{\"new_code_blocks\": {}}");
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(VariationError::MalformedGenome { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_echoes() {
        let backend = CommandBackend::new(
            "cat >/dev/null; printf '<candidate>{\"new_code_blocks\":{}}</candidate>'",
            Duration::from_secs(10),
        );
        let req = GenerativeRequest {
            instruction: Instruction::Mutation,
            parents: vec![],
            children: 1,
            objectives: vec![],
        };
        let text = backend.complete(&req).unwrap();
        assert_eq!(parse_response(&text), vec![Ok(Genome::new())]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_failure() {
        let backend = CommandBackend::new("exit 3", Duration::from_secs(10));
        let req = GenerativeRequest {
            instruction: Instruction::Crossover,
            parents: vec![],
            children: 2,
            objectives: vec![],
        };
        assert!(matches!(
            backend.complete(&req),
            Err(VariationError::Backend(_))
        ));
    }
}
