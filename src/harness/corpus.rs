//! Labeled sample corpus: one directory per expected class.

use crate::decision::Verdict;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub path: PathBuf,
    pub expected: Verdict,
}

impl Sample {
    pub fn new(path: impl Into<PathBuf>, expected: Verdict) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }

    /// File name used as the record identifier.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Regular files directly inside `dir`, sorted by name. Missing dir yields nothing.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Malware samples first, then benign ones.
pub fn discover_corpus(malware_dir: &Path, benign_dir: &Path) -> Vec<Sample> {
    let malware = list_files(malware_dir)
        .into_iter()
        .map(|p| Sample::new(p, Verdict::Malicious));
    let benign = list_files(benign_dir)
        .into_iter()
        .map(|p| Sample::new(p, Verdict::Benign));
    malware.chain(benign).collect()
}
