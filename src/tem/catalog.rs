use std::{
    collections::HashMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::info;

use super::model::NounDocument;
use crate::error::Result;

/// Default file name for the persisted candidate labels.
pub const CLUSTER_LABELS_FILE: &str = "cluster_labels.txt";

/// Default number of candidate labels kept.
pub const DEFAULT_LABEL_CAP: usize = 150;

/// Machine translation leaves this marker in translated reviews.
const TRANSLATION_ARTIFACT: &str = "translated by google";

/// Candidate topic names, backed by a one-label-per-line text file.
///
/// Once non-empty the catalog is reused verbatim; it is only derived again
/// if the backing file goes away and the catalog is reopened or [`reset`].
///
/// [`reset`]: LabelCatalog::reset
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCatalog {
    path: PathBuf,
    cap: usize,
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Open the catalog at `path`, loading any labels already persisted there.
    pub fn open<P: Into<PathBuf>>(path: P, cap: usize) -> Result<Self> {
        let path = path.into();
        let labels = if path.is_file() {
            let labels = fs::read_to_string(&path)?
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect::<Vec<String>>();
            info!(
                count = labels.len(),
                path = %path.display(),
                "Found cluster labels file"
            );
            labels
        } else {
            Vec::new()
        };
        Ok(Self { path, cap, labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rank the tokens of `documents` by frequency, keep the top `cap`, persist
    /// them (overwriting the file) and adopt them as the current labels.
    pub fn derive(&mut self, documents: &[NounDocument]) -> Result<&[String]> {
        let labels = rank_labels(documents, self.cap);
        self.persist(&labels)?;
        info!(
            count = labels.len(),
            path = %self.path.display(),
            "Derived cluster labels"
        );
        self.labels = labels;
        Ok(&self.labels)
    }

    /// Derive from `documents` only if the catalog is empty.
    pub fn ensure(&mut self, documents: &[NounDocument]) -> Result<&[String]> {
        if self.is_empty() {
            self.derive(documents)
        } else {
            Ok(&self.labels)
        }
    }

    /// Forget the current labels and remove the backing file.
    pub fn reset(&mut self) -> Result<()> {
        if self.path.is_file() {
            fs::remove_file(&self.path)?;
        }
        self.labels.clear();
        Ok(())
    }

    fn persist(&self, labels: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(fs::File::create(&self.path)?);
        for label in labels {
            writeln!(out, "{}", label)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// The `cap` most frequent whitespace tokens across `documents`, most
/// frequent first. Equal counts keep first-occurrence order.
pub fn rank_labels(documents: &[NounDocument], cap: usize) -> Vec<String> {
    let cleaned = documents
        .iter()
        .map(|d| d.as_str().replace(TRANSLATION_ARTIFACT, " "))
        .collect::<Vec<String>>();

    let mut first_seen: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in cleaned.iter().flat_map(|d| d.split_whitespace()) {
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            first_seen.push(token);
        }
        *count += 1;
    }

    // stable sort keeps first-occurrence order among ties
    first_seen.sort_by(|a, b| counts[b].cmp(&counts[a]));
    first_seen
        .into_iter()
        .take(cap)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<NounDocument> {
        items.iter().map(|d| NounDocument::from(*d)).collect()
    }

    #[test]
    fn test_rank_by_frequency() {
        let ranked = rank_labels(&docs(&["shelf shelf price", "price price aisle"]), 150);
        assert_eq!(ranked, vec!["price", "shelf", "aisle"]);
    }

    #[test]
    fn test_rank_ties_keep_first_occurrence() {
        let ranked = rank_labels(&docs(&["coffee bagel", "tea bagel coffee tea"]), 150);
        assert_eq!(ranked, vec!["coffee", "bagel", "tea"]);
    }

    #[test]
    fn test_rank_respects_cap() {
        let ranked = rank_labels(&docs(&["a a a b b c d"]), 2);
        assert_eq!(ranked, vec!["a", "b"]);
    }

    #[test]
    fn test_rank_strips_translation_artifact() {
        let ranked = rank_labels(
            &docs(&["food translated by google", "food service"]),
            150,
        );
        assert_eq!(ranked, vec!["food", "service"]);
    }

    #[test]
    fn test_rank_empty_documents() {
        assert!(rank_labels(&docs(&["", ""]), 150).is_empty());
    }

    #[test]
    fn test_derive_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CLUSTER_LABELS_FILE);

        let mut catalog = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();
        assert!(catalog.is_empty());

        let labels = catalog
            .derive(&docs(&["shelf shelf price", "price price aisle"]))
            .unwrap()
            .to_vec();
        assert_eq!(labels, vec!["price", "shelf", "aisle"]);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "price\nshelf\naisle\n"
        );

        let reopened = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();
        assert_eq!(reopened.labels(), labels.as_slice());
    }

    #[test]
    fn test_derive_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLUSTER_LABELS_FILE);
        fs::write(&path, "old\nstale\nlabels\nhere\n").unwrap();

        let mut catalog = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();
        assert_eq!(catalog.len(), 4);
        catalog.derive(&docs(&["fresh"])).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_ensure_only_derives_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLUSTER_LABELS_FILE);
        let mut catalog = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();

        catalog.ensure(&docs(&["price price staff"])).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let labels = catalog.ensure(&docs(&["parking parking parking"])).unwrap();
        assert_eq!(labels, ["price", "staff"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLUSTER_LABELS_FILE);
        fs::write(&path, "price\n\nstaff\n").unwrap();

        let catalog = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();
        assert_eq!(catalog.labels(), ["price", "staff"]);
    }

    #[test]
    fn test_reset_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLUSTER_LABELS_FILE);
        let mut catalog = LabelCatalog::open(&path, DEFAULT_LABEL_CAP).unwrap();
        catalog.derive(&docs(&["price"])).unwrap();
        assert!(path.is_file());

        catalog.reset().unwrap();
        assert!(catalog.is_empty());
        assert!(!path.exists());
    }
}
