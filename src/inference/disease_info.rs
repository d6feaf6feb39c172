//! Treatment recommendations per predicted label

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Treatment text shown next to a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    /// Recommended chemical treatment
    pub treatment: String,
    /// Field advice
    pub advisory: String,
}

impl DiseaseInfo {
    fn new(treatment: &str, advisory: &str) -> Self {
        Self {
            treatment: treatment.to_string(),
            advisory: advisory.to_string(),
        }
    }
}

/// Label → recommendation table with a fallback entry
#[derive(Debug, Clone)]
pub struct DiseaseInfoTable {
    entries: HashMap<String, DiseaseInfo>,
    fallback: DiseaseInfo,
}

impl Default for DiseaseInfoTable {
    fn default() -> Self {
        let entries = [
            (
                "Potato___Early_blight",
                "Mancozeb 75% WP or Chlorothalonil",
                "Remove infected leaves. Avoid overhead irrigation. Spray Mancozeb every 7–10 days.",
            ),
            (
                "Potato___Late_blight",
                "Metalaxyl + Mancozeb",
                "Apply fungicide immediately. Ensure good drainage and destroy infected plants.",
            ),
            (
                "Tomato___Early_blight",
                "Chlorothalonil or Copper Fungicide",
                "Remove affected leaves. Rotate crops and avoid wet foliage.",
            ),
            (
                "Tomato___Late_blight",
                "Metalaxyl-based fungicide",
                "Spray fungicide early. Avoid high humidity and overcrowding.",
            ),
            (
                "Healthy",
                "No chemical required",
                "Plant is healthy. Maintain proper watering and nutrition.",
            ),
        ]
        .into_iter()
        .map(|(label, treatment, advisory)| (label.to_string(), DiseaseInfo::new(treatment, advisory)))
        .collect();

        Self {
            entries,
            fallback: DiseaseInfo::new(
                "Consult agriculture expert",
                "Follow standard crop protection practices.",
            ),
        }
    }
}

impl DiseaseInfoTable {
    /// Recommendation for an exact label, or the fallback
    pub fn lookup(&self, label: &str) -> &DiseaseInfo {
        self.entries.get(label).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn fallback(&self) -> &DiseaseInfo {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
