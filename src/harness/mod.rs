//! Batch evaluation: drive a labeled corpus through the predict endpoint with
//! a fixed pool of workers, collect one record per file, reduce to metrics.

mod client;
mod corpus;
mod metrics;
mod report;

pub use client::{HttpPredictClient, PredictClient};
pub use corpus::{discover_corpus, list_files, Sample};
pub use metrics::AggregateMetrics;
pub use report::{progress_line, render_summary, write_records};

use crate::decision::Verdict;
use crate::error::SubmissionError;
use crate::server::PredictionResponse;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of one submitted file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub file: String,
    pub expected: Verdict,
    /// Label returned by the server; `None` when no response was decoded
    pub predicted: Option<String>,
    pub confidence: f32,
    pub correct: bool,
    pub error: Option<String>,
}

impl EvaluationRecord {
    /// A 200 response. Labels other than a verdict are recorded as errors.
    pub fn from_response(file: String, expected: Verdict, response: &PredictionResponse) -> Self {
        let confidence = if response.confidence.is_finite() {
            response.confidence
        } else {
            0.0
        };
        match Verdict::from_label(&response.label) {
            Some(observed) => Self {
                file,
                expected,
                predicted: Some(response.label.clone()),
                confidence,
                correct: observed == expected,
                error: None,
            },
            None => Self {
                file,
                expected,
                predicted: Some(response.label.clone()),
                confidence,
                correct: false,
                error: Some(format!("degraded verdict: {}", response.label)),
            },
        }
    }

    pub fn failed(file: String, expected: Verdict, error: &SubmissionError) -> Self {
        Self {
            file,
            expected,
            predicted: None,
            confidence: 0.0,
            correct: false,
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Verdict used by the confusion matrix; `None` for errored records.
    pub fn observed(&self) -> Option<Verdict> {
        if self.is_error() {
            return None;
        }
        self.predicted.as_deref().and_then(Verdict::from_label)
    }
}

/// Read one sample and submit it, bounded by `timeout`. Never fails.
pub async fn evaluate_one(
    client: &dyn PredictClient,
    sample: &Sample,
    timeout: Duration,
) -> EvaluationRecord {
    let name = sample.name();
    let attempt = async {
        let bytes = tokio::fs::read(&sample.path).await?;
        client.predict(&name, bytes).await
    };
    let outcome = match tokio::time::timeout(timeout, attempt).await {
        Ok(res) => res,
        Err(_) => Err(SubmissionError::Timeout(timeout)),
    };
    match outcome {
        Ok(response) => EvaluationRecord::from_response(name, sample.expected, &response),
        Err(e) => {
            debug!(file = %name, error = %e, "submission failed");
            EvaluationRecord::failed(name, sample.expected, &e)
        }
    }
}

pub struct Harness {
    client: Arc<dyn PredictClient>,
    workers: usize,
    timeout: Duration,
}

impl Harness {
    pub fn new(client: Arc<dyn PredictClient>, workers: usize, timeout: Duration) -> Self {
        Self {
            client,
            workers: workers.max(1),
            timeout,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Submit every sample with at most `workers` in flight and wait for all of
    /// them. `on_record(done, total, record)` runs in completion order.
    pub async fn run<F>(&self, samples: Vec<Sample>, mut on_record: F) -> Vec<EvaluationRecord>
    where
        F: FnMut(usize, usize, &EvaluationRecord),
    {
        let total = samples.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(samples)));
        let (tx, mut rx) = mpsc::unbounded_channel::<EvaluationRecord>();

        let mut pool = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let queue = Arc::clone(&queue);
            let client = Arc::clone(&self.client);
            let tx = tx.clone();
            let timeout = self.timeout;
            pool.spawn(async move {
                let mut handled = 0usize;
                while let Some(sample) = next_sample(&queue) {
                    let file = sample.name();
                    let expected = sample.expected;
                    // A panicking submission still yields its record.
                    let client = Arc::clone(&client);
                    let task = tokio::spawn(async move {
                        evaluate_one(client.as_ref(), &sample, timeout).await
                    });
                    let record = match task.await {
                        Ok(record) => record,
                        Err(e) => {
                            warn!(worker, file = %file, error = %e, "submission task failed");
                            let err = SubmissionError::Aborted(e.to_string());
                            EvaluationRecord::failed(file, expected, &err)
                        }
                    };
                    handled += 1;
                    if tx.send(record).is_err() {
                        break;
                    }
                }
                debug!(worker, handled, "worker drained");
            });
        }
        drop(tx);

        // Single collector: the only writer of the record set.
        let mut records = Vec::with_capacity(total);
        while let Some(record) = rx.recv().await {
            on_record(records.len() + 1, total, &record);
            records.push(record);
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "evaluation worker failed");
            }
        }
        records
    }
}

fn next_sample(queue: &Mutex<VecDeque<Sample>>) -> Option<Sample> {
    queue.lock().ok()?.pop_front()
}
