use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::error::ClassifierError;

/// Ordered class-name vocabulary loaded from the `labels.json` sidecar.
/// Position i corresponds to index i of the model's output vector; the
/// ordering is fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct LabelVocab(Vec<String>);

impl LabelVocab {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let file = File::open(path).map_err(|e| ClassifierError::Labels {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let labels: Vec<String> =
            serde_json::from_reader(file).map_err(|e| ClassifierError::Labels {
                path: path.to_path_buf(),
                reason: format!("not a JSON string array: {e}"),
            })?;
        Self::new(labels).map_err(|reason| ClassifierError::Labels {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn new(labels: Vec<String>) -> Result<Self, String> {
        if labels.is_empty() {
            return Err("vocabulary is empty".into());
        }
        let mut seen = HashSet::new();
        for l in &labels {
            if !seen.insert(l.as_str()) {
                return Err(format!("duplicate label {l:?}"));
            }
        }
        Ok(Self(labels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_ordered_vocab_from_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"["black", "grizzly", "teddy"]"#).unwrap();
        let vocab = LabelVocab::load(f.path()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get(0), Some("black"));
        assert_eq!(vocab.get(1), Some("grizzly"));
        assert_eq!(vocab.get(2), Some("teddy"));
        assert_eq!(vocab.get(3), None);
    }

    #[test]
    fn rejects_empty_vocab() {
        assert!(LabelVocab::new(vec![]).is_err());
    }

    #[test]
    fn rejects_duplicate_labels() {
        let err = LabelVocab::new(vec!["bear".into(), "bear".into()]).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(LabelVocab::load(std::path::Path::new("/nonexistent/labels.json")).is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"not": "an array"}}"#).unwrap();
        assert!(LabelVocab::load(f.path()).is_err());
    }
}
