//! Ordered label table for the classifier output
//!
//! Loaded from a Hugging Face style `config.json` (`id2label` map). Ids the
//! file does not name fall back to a small table of well-known AudioSet
//! labels, then to `Event_{id}`.

use echotag_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Number of classes in the AudioSet ontology used by the default model
pub const AUDIOSET_CLASS_COUNT: usize = 527;

/// Well-known AudioSet labels, used when no label file is configured
const FALLBACK_LABELS: &[(usize, &str)] = &[
    (0, "Speech"),
    (1, "Male speech"),
    (2, "Female speech"),
    (3, "Child speech"),
    (7, "Speech synthesizer"),
    (16, "Laughter"),
    (17, "Baby laughter"),
    (20, "Belly laugh"),
    (47, "Cough"),
    (48, "Throat clearing"),
    (49, "Sneeze"),
    (50, "Sniff"),
    (62, "Burping"),
    (63, "Hiccup"),
    (70, "Conversation"),
    (137, "Music"),
    (500, "Silence"),
    (506, "Inside, small room"),
    (507, "Inside, large room"),
    (508, "Inside, public space"),
    (509, "Outside, urban"),
    (510, "Outside, rural"),
    (511, "Reverberation"),
    (512, "Echo"),
    (513, "Noise"),
    (514, "Environmental noise"),
    (515, "Static"),
    (516, "Mains hum"),
    (517, "Distortion"),
    (518, "Sidetone"),
    (519, "Cacophony"),
    (520, "White noise"),
    (521, "Pink noise"),
    (522, "Throbbing"),
    (523, "Vibration"),
    (524, "Hum"),
    (525, "Whoosh"),
    (526, "Fire"),
];

fn fallback_label(id: usize) -> String {
    FALLBACK_LABELS
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| format!("Event_{}", id))
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    id2label: HashMap<String, String>,
}

/// Label names indexed by class id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Built-in table for `count` classes
    pub fn fallback(count: usize) -> Self {
        Self {
            labels: (0..count).map(fallback_label).collect(),
        }
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Parse the `id2label` object of a model `config.json`
    ///
    /// The table spans ids `0..=max_id`; gaps are filled from the fallback table.
    pub fn from_config_json(json: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(json)?;

        let mut named = HashMap::with_capacity(config.id2label.len());
        for (key, label) in config.id2label {
            let id: usize = key.trim().parse().map_err(|_| {
                Error::Config(format!("id2label key is not a class id: {:?}", key))
            })?;
            named.insert(id, label);
        }

        let Some(max_id) = named.keys().max().copied() else {
            return Err(Error::Config("id2label is empty".to_string()));
        };

        let labels = (0..=max_id)
            .map(|id| named.remove(&id).unwrap_or_else(|| fallback_label(id)))
            .collect();
        Ok(Self { labels })
    }

    /// Read a `config.json` from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read label file {}: {}", path.display(), e))
        })?;
        let labels = Self::from_config_json(&content)?;
        tracing::info!(path = %path.display(), labels = labels.len(), "Loaded classifier labels");
        Ok(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
