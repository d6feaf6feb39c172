//! Corpus cleaning
//!
//! Walks a dataset tree and deletes every file that cannot be fully decoded as
//! an image. Each file is handled on its own: a corrupt file, an unreadable
//! directory entry or a failed deletion is logged and the walk continues.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::utils::error::{PlantError, Result};

/// Outcome of a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of regular files inspected
    pub scanned: usize,
    /// Files deleted because they failed to decode
    pub removed: Vec<PathBuf>,
    /// Files that failed to decode but could not be deleted
    pub failed_removals: Vec<PathBuf>,
}

impl ValidationReport {
    /// Number of files that decoded successfully
    pub fn valid(&self) -> usize {
        self.scanned - self.removed.len() - self.failed_removals.len()
    }
}

/// Fully decode the file at `path`, guessing the format from its content
fn decode_check(path: &Path) -> std::result::Result<(), String> {
    let reader = ImageReader::open(path)
        .map_err(|e| e.to_string())?
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    reader.decode().map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete every undecodable file under `root`
///
/// Running this twice on the same tree is a no-op the second time.
pub fn validate_images(root: &Path) -> Result<ValidationReport> {
    if !root.exists() {
        return Err(PlantError::PathNotFound(root.to_path_buf()));
    }

    info!("Validating images under {:?}", root);

    let mut report = ValidationReport::default();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        report.scanned += 1;
        let path = entry.path();

        if let Err(reason) = decode_check(path) {
            warn!("Removing invalid image {:?}: {}", path, reason);
            match fs::remove_file(path) {
                Ok(()) => report.removed.push(path.to_path_buf()),
                Err(e) => {
                    warn!("Failed to remove {:?}: {}", path, e);
                    report.failed_removals.push(path.to_path_buf());
                }
            }
        } else {
            debug!("Valid image {:?}", path);
        }
    }

    info!(
        "Validation done: {} scanned, {} removed, {} could not be removed",
        report.scanned,
        report.removed.len(),
        report.failed_removals.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::write_solid;
    use tempfile::TempDir;

    fn corpus() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let class_a = temp_dir.path().join("Tomato___healthy");
        let nested = temp_dir.path().join("Potato___Late_blight").join("batch_1");
        fs::create_dir_all(&class_a).unwrap();
        fs::create_dir_all(&nested).unwrap();

        write_solid(&class_a.join("ok_1.png"), 8, [10, 200, 10]);
        write_solid(&class_a.join("ok_2.jpg"), 8, [10, 200, 10]);
        fs::write(class_a.join("broken.jpg"), b"definitely not a jpeg").unwrap();
        fs::write(nested.join("notes.txt"), b"field notes").unwrap();
        write_solid(&nested.join("ok_3.png"), 8, [120, 60, 10]);

        temp_dir
    }

    #[test]
    fn test_removes_undecodable_files() {
        let temp_dir = corpus();

        let report = validate_images(temp_dir.path()).unwrap();

        assert_eq!(report.scanned, 5);
        assert_eq!(report.removed.len(), 2);
        assert!(report.failed_removals.is_empty());
        assert_eq!(report.valid(), 3);
        assert!(!temp_dir.path().join("Tomato___healthy/broken.jpg").exists());
        assert!(temp_dir.path().join("Tomato___healthy/ok_1.png").exists());
        assert!(temp_dir
            .path()
            .join("Potato___Late_blight/batch_1/ok_3.png")
            .exists());
    }

    #[test]
    fn test_second_pass_is_noop() {
        let temp_dir = corpus();

        validate_images(temp_dir.path()).unwrap();
        let second = validate_images(temp_dir.path()).unwrap();

        assert_eq!(second.scanned, 3);
        assert!(second.removed.is_empty());
    }

    #[test]
    fn test_empty_tree() {
        let temp_dir = TempDir::new().unwrap();
        let report = validate_images(temp_dir.path()).unwrap();
        assert_eq!(report, ValidationReport::default());
    }

    #[test]
    fn test_missing_root() {
        let err = validate_images(Path::new("/no/such/corpus")).unwrap_err();
        assert!(matches!(err, PlantError::PathNotFound(_)));
    }
}
