//! Class id to display label resolution.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Class names of the COCO-trained detector weights.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    Map(BTreeMap<String, String>),
    List(Vec<String>),
}

/// Mapping from detector class id to display label, supplied once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<i64, String>,
}

impl LabelTable {
    pub fn new(labels: BTreeMap<i64, String>) -> Self {
        Self { labels }
    }

    pub fn coco() -> Self {
        Self::from_names(COCO_LABELS.iter().map(|name| name.to_string()))
    }

    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            labels: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id as i64, name))
                .collect(),
        }
    }

    /// Load a label table from JSON: either `{"0": "person", ...}` or
    /// `["person", ...]`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: LabelFile =
            serde_json::from_str(raw).map_err(|e| anyhow!("invalid label table: {}", e))?;
        match parsed {
            LabelFile::List(names) => Ok(Self::from_names(names)),
            LabelFile::Map(entries) => {
                let mut labels = BTreeMap::new();
                for (key, name) in entries {
                    let id: i64 = key
                        .trim()
                        .parse()
                        .map_err(|_| anyhow!("label key '{}' is not a class id", key))?;
                    labels.insert(id, name);
                }
                Ok(Self { labels })
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label table {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn get(&self, class_id: i64) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    /// Label for a class id, falling back to `class_{id}` for unknown ids.
    pub fn resolve(&self, class_id: i64) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_table_resolves_known_ids() {
        let table = LabelTable::coco();
        assert_eq!(table.len(), 80);
        assert_eq!(table.resolve(0), "person");
        assert_eq!(table.resolve(2), "car");
        assert_eq!(table.resolve(79), "toothbrush");
    }

    #[test]
    fn unknown_ids_fall_back_to_class_name() {
        let table = LabelTable::coco();
        assert_eq!(table.get(80), None);
        assert_eq!(table.resolve(80), "class_80");
    }

    #[test]
    fn loads_map_and_list_json() {
        let map = LabelTable::from_json(r#"{"0": "hard hat", "3": "vest"}"#).unwrap();
        assert_eq!(map.resolve(3), "vest");
        assert_eq!(map.get(1), None);

        let list = LabelTable::from_json(r#"["person", "forklift"]"#).unwrap();
        assert_eq!(list.resolve(1), "forklift");
    }

    #[test]
    fn rejects_non_numeric_keys() {
        let err = LabelTable::from_json(r#"{"zero": "person"}"#).unwrap_err();
        assert!(err.to_string().contains("not a class id"));
    }
}
