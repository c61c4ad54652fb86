//! Runs an external extractor program: file bytes on stdin, numbers on stdout.

use super::{FeatureExtractor, FeatureVector, FeatureVersion};
use crate::config::ExtractorConfig;
use crate::error::ExtractionError;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::warn;

/// Longest stderr excerpt carried into an error message
const MAX_STDERR: usize = 512;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    version: FeatureVersion,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, version: FeatureVersion) -> Self {
        Self {
            program: program.into(),
            args,
            version,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Kill the program and fail the extraction once this much time has passed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from config; `None` when no command is configured.
    pub fn from_config(config: &ExtractorConfig) -> Option<Self> {
        let program = config.command.as_deref()?.trim();
        if program.is_empty() {
            return None;
        }
        Some(
            Self::new(program, config.args.clone(), config.version)
                .with_timeout(Duration::from_secs(config.timeout_secs)),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>, ExtractionError> {
    handle
        .join()
        .map_err(|_| ExtractionError::Rejected("pipe reader panicked".to_string()))?
        .map_err(ExtractionError::Spawn)
}

impl FeatureExtractor for CommandExtractor {
    fn version(&self) -> FeatureVersion {
        self.version
    }

    fn extract(&self, bytes: &[u8]) -> Result<FeatureVector, ExtractionError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractionError::Spawn)?;

        let (Some(mut stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractionError::Rejected("stdio unavailable".to_string()));
        };

        // Pipes are serviced off this thread so a full pipe cannot stall the
        // deadline check. A child that exits early breaks the stdin pipe; that
        // surfaces through its exit status instead.
        let input = bytes.to_vec();
        thread::spawn(move || {
            let _ = stdin.write_all(&input);
        });
        let stdout = drain(stdout);
        let stderr = drain(stderr);

        // Wait for the exit and for both pipes to close; a grandchild holding
        // a pipe open counts against the deadline too.
        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(ExtractionError::Spawn)? {
                if stdout.is_finished() && stderr.is_finished() {
                    break status;
                }
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    program = %self.program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "extractor timed out"
                );
                return Err(ExtractionError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR).collect();
            return Err(ExtractionError::Rejected(format!(
                "{} exited with {}: {}",
                self.program, status, excerpt
            )));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        parse_vector(&stdout).map(FeatureVector::new)
    }
}

/// Parse whitespace/comma separated numbers, optionally wrapped in brackets.
/// `nan`, `inf` and `infinity` are accepted in any case.
pub(crate) fn parse_vector(text: &str) -> Result<Vec<f32>, ExtractionError> {
    let values = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == '[' || c == ']')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| ExtractionError::Output(format!("bad token {t:?}")))
        })
        .collect::<Result<Vec<f32>, _>>()?;
    if values.is_empty() {
        return Err(ExtractionError::Output("no values".to_string()));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_style_and_plain_output() {
        assert_eq!(parse_vector("[1.0, 2.5, -3]\n").unwrap(), vec![1.0, 2.5, -3.0]);
        assert_eq!(parse_vector("1 2\n3").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn keeps_non_finite_tokens() {
        let v = parse_vector("[NaN, Infinity, -Infinity, inf]").unwrap();
        assert!(v[0].is_nan());
        assert_eq!(v[1], f32::INFINITY);
        assert_eq!(v[2], f32::NEG_INFINITY);
        assert_eq!(v[3], f32::INFINITY);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_vector("1, two, 3"), Err(ExtractionError::Output(_))));
        assert!(matches!(parse_vector("  \n"), Err(ExtractionError::Output(_))));
    }

    #[cfg(unix)]
    fn sh(script: &str) -> CommandExtractor {
        CommandExtractor::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            FeatureVersion::Ember2024,
        )
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let ex =
            CommandExtractor::new("malscan-no-such-extractor", vec![], FeatureVersion::Ember2024);
        assert!(matches!(ex.extract(b"MZ"), Err(ExtractionError::Spawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_rejected() {
        let err = sh("echo 'not a PE file' >&2; exit 3").extract(b"MZ").unwrap_err();
        match err {
            ExtractionError::Rejected(msg) => {
                assert!(msg.starts_with("sh exited with"), "{msg}");
                assert!(msg.contains("not a PE file"), "{msg}");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn reads_stdin_and_parses_stdout() {
        let v = sh("cat >/dev/null; echo \"[1, NaN, inf]\"").extract(b"MZ").unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v.values[0], 1.0);
        assert!(v.values[1].is_nan());
        assert_eq!(v.values[2], f32::INFINITY);
    }

    #[cfg(unix)]
    #[test]
    fn large_input_does_not_stall() {
        let input = vec![0x4d; 4 * 1024 * 1024];
        let v = sh("wc -c").extract(&input).unwrap();
        assert_eq!(v.values, vec![input.len() as f32]);
    }

    #[cfg(unix)]
    #[test]
    fn slow_extractor_is_killed_at_deadline() {
        let ex = sh("sleep 5; echo 1").with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = ex.extract(b"MZ").unwrap_err();
        assert!(matches!(err, ExtractionError::Timeout(t) if t == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn config_carries_timeout() {
        let config = ExtractorConfig {
            command: Some(" extract-features ".to_string()),
            timeout_secs: 7,
            ..ExtractorConfig::default()
        };
        let ex = CommandExtractor::from_config(&config).unwrap();
        assert_eq!(ex.program(), "extract-features");
        assert_eq!(ex.timeout(), Duration::from_secs(7));

        let unset = ExtractorConfig::default();
        assert!(CommandExtractor::from_config(&unset).is_none());
    }
}
