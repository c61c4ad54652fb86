//! Console rendering of evaluation progress and results.

use super::{AggregateMetrics, EvaluationRecord};
use crate::logging::StructuredLogger;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const NAME_WIDTH: usize = 40;

/// `[i/N] name | Expected: .. | Got: .. | Conf: ..% | STATUS`
pub fn progress_line(done: usize, total: usize, record: &EvaluationRecord) -> String {
    let name: String = record.file.chars().take(NAME_WIDTH).collect();
    let status = match (&record.error, record.correct) {
        (Some(err), _) => format!("ERROR: {err}"),
        (None, true) => "CORRECT".to_string(),
        (None, false) => "WRONG".to_string(),
    };
    format!(
        "[{done}/{total}] {name:<width$} | Expected: {expected:<9} | Got: {got:<9} | Conf: {conf:5.1}% | {status}",
        width = NAME_WIDTH,
        expected = record.expected.as_str(),
        got = record.predicted.as_deref().unwrap_or("-"),
        conf = record.confidence * 100.0,
    )
}

fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => "N/A".to_string(),
    }
}

fn fixed(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "N/A".to_string(),
    }
}

pub fn render_summary(m: &AggregateMetrics) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "EVALUATION RESULTS");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Total samples:      {}", m.total);
    let _ = writeln!(out, "Errors:             {}", m.errors);
    let _ = writeln!(out, "Processed:          {}", m.processed);
    let _ = writeln!(out, "Correct:            {}", m.correct);
    let _ = writeln!(out, "Accuracy:           {}", pct(m.accuracy));
    let _ = writeln!(out);
    let _ = writeln!(out, "Malware samples:    {}", m.malware_total);
    let _ = writeln!(out, "  True positives:   {}", m.true_positives);
    let _ = writeln!(out, "  False negatives:  {}", m.false_negatives);
    let _ = writeln!(out, "  Mean confidence:  {}", pct(m.mean_confidence_malicious));
    let _ = writeln!(out, "Benign samples:     {}", m.benign_total);
    let _ = writeln!(out, "  True negatives:   {}", m.true_negatives);
    let _ = writeln!(out, "  False positives:  {}", m.false_positives);
    let _ = writeln!(out, "  Mean confidence:  {}", pct(m.mean_confidence_benign));
    let _ = writeln!(out);
    let _ = writeln!(out, "Precision:          {}", fixed(m.precision));
    let _ = writeln!(out, "Recall:             {}", fixed(m.recall));
    let _ = writeln!(out, "Specificity:        {}", fixed(m.specificity));
    let _ = writeln!(out, "F1 score:           {}", fixed(m.f1));
    let _ = write!(out, "{rule}");
    out
}

/// One JSON object per record, newline delimited.
pub fn write_records(path: &Path, records: &[EvaluationRecord]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    for record in records {
        StructuredLogger::emit_json(record, &mut w)?;
    }
    w.flush()
}
