use super::EvaluationRecord;
use crate::decision::Verdict;
use serde::Serialize;

/// Summary of a completed evaluation run. Ratios are `None` when their
/// denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub total: usize,
    pub errors: usize,
    /// Records that produced a verdict (`total - errors`)
    pub processed: usize,
    pub correct: usize,
    pub malware_total: usize,
    pub benign_total: usize,
    pub true_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub specificity: Option<f64>,
    pub f1: Option<f64>,
    pub mean_confidence_malicious: Option<f64>,
    pub mean_confidence_benign: Option<f64>,
}

impl AggregateMetrics {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let total = records.len();
        let errors = records.iter().filter(|r| r.is_error()).count();
        let processed = total - errors;
        let correct = records.iter().filter(|r| r.correct).count();

        let partition = |class: Verdict| -> Vec<&EvaluationRecord> {
            records
                .iter()
                .filter(|r| !r.is_error() && r.expected == class)
                .collect()
        };
        let malware = partition(Verdict::Malicious);
        let benign = partition(Verdict::Benign);

        let true_positives = malware
            .iter()
            .filter(|r| r.observed() == Some(Verdict::Malicious))
            .count();
        let true_negatives = benign
            .iter()
            .filter(|r| r.observed() == Some(Verdict::Benign))
            .count();
        let false_negatives = malware.len() - true_positives;
        let false_positives = benign.len() - true_negatives;

        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, malware.len());
        let f1 = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        };

        Self {
            total,
            errors,
            processed,
            correct,
            malware_total: malware.len(),
            benign_total: benign.len(),
            true_positives,
            false_negatives,
            true_negatives,
            false_positives,
            accuracy: ratio(correct, processed),
            precision,
            recall,
            specificity: ratio(true_negatives, benign.len()),
            f1,
            mean_confidence_malicious: mean_confidence(&malware),
            mean_confidence_benign: mean_confidence(&benign),
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

fn mean_confidence(records: &[&EvaluationRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let sum: f64 = records.iter().map(|r| f64::from(r.confidence)).sum();
    Some(sum / records.len() as f64)
}
