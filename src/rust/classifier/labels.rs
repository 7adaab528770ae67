use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::error::ClassifierError;

/// Ordered category names, where index `i` names the model's `i`-th output logit.
///
/// The order comes from the persisted artifact and must match the order the model was
/// trained against. It is never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRegistry {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelRegistry {
    /// Builds a registry from labels already in model output order.
    ///
    /// # Errors
    /// - `ModelLoadError` if the list is empty, a label is blank, or a label repeats
    pub fn new(labels: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifierError::ModelLoadError("Label registry is empty".into()));
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(ClassifierError::ModelLoadError(
                    format!("Label {} is blank", i)
                ));
            }
            if index.insert(label.clone(), i).is_some() {
                return Err(ClassifierError::ModelLoadError(
                    format!("Duplicate label '{}' in registry", label)
                ));
            }
        }

        Ok(Self { labels, index })
    }

    /// Loads a registry from a JSON array of strings (`labels.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ClassifierError::ModelLoadError(format!("Failed to read labels {:?}: {}", path, e))
        })?;
        Self::from_json(&raw)
    }

    /// Parses a registry from a JSON array of strings.
    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let labels: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| ClassifierError::ModelLoadError(format!("Malformed label list: {}", e)))?;
        Self::new(labels)
    }

    pub fn class_count(&self) -> usize {
        self.labels.len()
    }

    pub fn name_for_index(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::OutOfRange { index, count: self.labels.len() })
    }

    pub fn index_for_name(&self, name: &str) -> Result<usize, ClassifierError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ClassifierError::UnknownLabel(name.to_string()))
    }

    /// Labels in model output order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LabelRegistry {
        LabelRegistry::new(vec!["Complaints", "Admission Inquiry", "Staff Matters"]).unwrap()
    }

    #[test]
    fn test_round_trip_every_name() {
        let registry = registry();
        for name in registry.labels() {
            let index = registry.index_for_name(name).unwrap();
            assert_eq!(registry.name_for_index(index).unwrap(), name);
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let registry = registry();
        assert_eq!(registry.class_count(), 3);
        assert_eq!(registry.name_for_index(0).unwrap(), "Complaints");
        assert_eq!(registry.name_for_index(2).unwrap(), "Staff Matters");
    }

    #[test]
    fn test_out_of_range() {
        let err = registry().name_for_index(3).unwrap_err();
        assert!(matches!(err, ClassifierError::OutOfRange { index: 3, count: 3 }));
    }

    #[test]
    fn test_unknown_label() {
        let err = registry().index_for_name("Parking").unwrap_err();
        assert!(matches!(err, ClassifierError::UnknownLabel(ref n) if n == "Parking"));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(LabelRegistry::new(vec!["a", "b", "a"]).is_err());
        assert!(LabelRegistry::new(Vec::<String>::new()).is_err());
        assert!(LabelRegistry::new(vec!["a", " "]).is_err());
    }

    #[test]
    fn test_from_json() {
        let registry = LabelRegistry::from_json(r#"["Fees & Payment", "Complaints"]"#).unwrap();
        assert_eq!(registry.index_for_name("Complaints").unwrap(), 1);
        assert!(LabelRegistry::from_json("{\"not\": \"a list\"}").is_err());
    }
}
