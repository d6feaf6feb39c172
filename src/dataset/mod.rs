//! Dataset module for class-per-directory leaf image corpora
//!
//! This module provides functionality for:
//! - Removing undecodable images from a corpus (`validate`)
//! - Splitting a corpus into train/validation trees (`split`)
//! - Deriving and persisting the label vocabulary (`vocabulary`)
//! - Decoding, resizing, normalising and augmenting images (`preprocess`)
//! - Streaming one-hot labelled batches for training (`batch_source`)
//!
//! ## Layout
//!
//! ```text
//! root/
//! ├── Potato___Early_blight/
//! │   ├── image1.jpg
//! │   └── image2.jpg
//! ├── Potato___healthy/
//! │   └── ...
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::error::{PlantError, Result};

pub mod batch_source;
pub mod preprocess;
pub mod split;
pub mod validate;
pub mod vocabulary;

pub use batch_source::{BatchSource, ImageBatch, LabeledImage, PlantBatch, PlantBatcher, PreparedSample};
pub use preprocess::{ImageInput, ImagePreprocessor};
pub use split::{split_dataset, ClassSplit, SplitConfig, SplitReport};
pub use validate::{validate_images, ValidationReport};
pub use vocabulary::LabelVocabulary;

/// Side length of the square network input
pub const IMAGE_SIZE: usize = 128;

/// Number of color channels fed to the network
pub const CHANNELS: usize = 3;

/// File extensions picked up by the splitter and the batch source
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Check whether a path carries one of the supported image extensions
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the class directories directly under `root`, sorted by name
///
/// Hidden directories are skipped. Sorting is what keeps label indices stable
/// between the training run and every later inference run.
pub fn list_class_dirs(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(PlantError::PathNotFound(root.to_path_buf()));
    }

    let mut class_dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_str().map(str::to_string).ok_or_else(|| {
            PlantError::Dataset(format!("Non UTF-8 class directory under {:?}", root))
        })?;

        if name.starts_with('.') {
            continue;
        }
        class_dirs.push(name);
    }
    class_dirs.sort();

    Ok(class_dirs)
}

/// List the supported image files directly inside `dir`, sorted by path
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort();

    Ok(images)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("leaf.jpg")));
        assert!(is_supported_image(Path::new("leaf.JPEG")));
        assert!(is_supported_image(Path::new("dir/leaf.png")));
        assert!(!is_supported_image(Path::new("labels.json")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    #[test]
    fn test_list_class_dirs_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["Tomato___healthy", "Apple___scab", ".cache", "Corn___rust"] {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();

        let classes = list_class_dirs(temp_dir.path()).unwrap();
        assert_eq!(classes, vec!["Apple___scab", "Corn___rust", "Tomato___healthy"]);
    }

    #[test]
    fn test_list_class_dirs_missing_root() {
        let err = list_class_dirs(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, PlantError::PathNotFound(_)));
    }

    #[test]
    fn test_list_images_filters_extensions() {
        let temp_dir = TempDir::new().unwrap();
        test_support::write_solid(&temp_dir.path().join("b.png"), 4, [0, 255, 0]);
        test_support::write_solid(&temp_dir.path().join("a.jpg"), 4, [0, 255, 0]);
        fs::write(temp_dir.path().join("readme.md"), "x").unwrap();

        let images = list_images(temp_dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }
}
