//! Emotion weight sub-language: `name:[weight];name:[weight];...`.

use std::sync::LazyLock;

use regex::Regex;

use super::sampling::DecimalDisplay;

/// The six emotions the analysis stage is asked to weigh.
pub const CANONICAL_EMOTIONS: [&str; 6] = [
    "happiness",
    "anger",
    "fear",
    "sadness",
    "disgust",
    "surprise",
];

static EMOTION_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>\w+):\[(?P<weight>[0-9.]+)\]").expect("emotion pair pattern is valid")
});

/// Insertion-ordered emotion name to weight mapping.
///
/// Names form an open set. Weights are carried as given, with no
/// normalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionVector {
    entries: Vec<(String, f64)>,
}

impl EmotionVector {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// All canonical emotions at weight zero.
    pub fn neutral() -> Self {
        let mut vector = Self::new();
        for name in CANONICAL_EMOTIONS {
            vector.insert(name, 0.0);
        }
        vector
    }

    /// Decode every `name:[weight]` pair found in `tag`.
    ///
    /// A later pair with an already seen name overwrites the earlier weight
    /// but keeps its original position. Pairs whose weight is not a number
    /// (`1.2.3`) are skipped. Text with no pairs yields an empty vector.
    pub fn decode(tag: &str) -> Self {
        let mut vector = Self::new();
        for caps in EMOTION_PAIR.captures_iter(tag) {
            let (Some(name), Some(weight)) = (caps.name("name"), caps.name("weight")) else {
                continue;
            };
            match weight.as_str().parse::<f64>() {
                Ok(value) => vector.insert(name.as_str(), value),
                Err(_) => {
                    tracing::debug!(
                        emotion = name.as_str(),
                        raw = weight.as_str(),
                        "skipping unparsable emotion weight"
                    );
                }
            }
        }
        vector
    }

    /// Render as a complete `emoweight` tag.
    pub fn encode(&self) -> String {
        let body = self
            .entries
            .iter()
            .map(|(name, weight)| format!("{name}:[{}]", DecimalDisplay(*weight)))
            .collect::<Vec<_>>()
            .join(";");
        format!("~!emoweight:{{{body}}}!~")
    }

    /// Set a weight, replacing an existing entry in place.
    ///
    /// `-0.0` is stored as `0.0`; the encoded form has no sign.
    pub fn insert(&mut self, name: &str, weight: f64) {
        let weight = if weight == 0.0 { 0.0 } else { weight };
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((name.to_owned(), weight)),
        }
    }

    /// Weight for `name`, if present.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, weight)| *weight)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
