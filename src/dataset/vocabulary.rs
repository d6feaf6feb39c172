//! Label vocabulary
//!
//! The ordered list of class names. Position `i` is the label of model output
//! `i`, so the order written at training time is the contract every later
//! inference run depends on.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::list_class_dirs;
use crate::utils::error::{PlantError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    names: Vec<String>,
}

impl LabelVocabulary {
    /// Create a vocabulary from names in their final order
    ///
    /// Duplicate names are rejected.
    pub fn from_names(names: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PlantError::Serialization(format!(
                    "Duplicate class name '{}' in label vocabulary",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    /// Derive the vocabulary from the class directories of a training tree
    pub fn build(train_root: &Path) -> Result<Self> {
        let names = list_class_dirs(train_root)?;
        info!("Found {} classes under {:?}", names.len(), train_root);
        Ok(Self { names })
    }

    /// Write the vocabulary as a JSON array
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.names)?;
        fs::write(path, json)?;
        info!("Saved label vocabulary ({} classes) to {:?}", self.len(), path);
        Ok(())
    }

    /// Read a vocabulary written by [`LabelVocabulary::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PlantError::PathNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let names: Vec<String> = serde_json::from_str(&json)?;
        Self::from_names(names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name at a model output index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Model output index of a class name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_sorts_class_names() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["Tomato___healthy", "Potato___Early_blight", "Apple___scab"] {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        fs::write(temp_dir.path().join("README.txt"), "not a class").unwrap();

        let vocab = LabelVocabulary::build(temp_dir.path()).unwrap();

        assert_eq!(
            vocab.names(),
            &["Apple___scab", "Potato___Early_blight", "Tomato___healthy"]
        );
        assert_eq!(vocab.index_of("Tomato___healthy"), Some(2));
        assert_eq!(vocab.get(0), Some("Apple___scab"));
        assert_eq!(vocab.get(3), None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("artifacts/class_names.json");
        let vocab = LabelVocabulary::from_names(vec![
            "Potato___Late_blight".to_string(),
            "Potato___healthy".to_string(),
        ])
        .unwrap();

        vocab.save(&path).unwrap();
        let loaded = LabelVocabulary::load(&path).unwrap();

        assert_eq!(loaded, vocab);
        let raw: Vec<String> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, vocab.names());
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("class_names.json");
        fs::write(&path, r#"["a", "b", "a"]"#).unwrap();

        let err = LabelVocabulary::load(&path).unwrap_err();
        assert!(matches!(err, PlantError::Serialization(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LabelVocabulary::load(Path::new("/no/vocab.json")).unwrap_err();
        assert!(matches!(err, PlantError::PathNotFound(_)));
    }

    #[test]
    fn test_empty_root_gives_empty_vocabulary() {
        let temp_dir = TempDir::new().unwrap();
        let vocab = LabelVocabulary::build(temp_dir.path()).unwrap();
        assert!(vocab.is_empty());
        assert_eq!(vocab.len(), 0);
    }
}
