//! Phrase datasets cycled by confirmed blinks

use gaze_debounce::Cardinal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use crate::sink::PhraseSource;
use crate::{DispatchError, SinkError};

/// One 4-entry up/down/left/right phrase lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseDataset {
    pub name: String,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
}

impl PhraseDataset {
    pub fn phrase(&self, direction: Cardinal) -> &str {
        match direction {
            Cardinal::Up => &self.up,
            Cardinal::Down => &self.down,
            Cardinal::Left => &self.left,
            Cardinal::Right => &self.right,
        }
    }
}

/// Datasets with a cyclic current index
#[derive(Debug)]
pub struct DatasetCatalog {
    datasets: Vec<PhraseDataset>,
    current: AtomicUsize,
}

impl DatasetCatalog {
    pub fn new(datasets: Vec<PhraseDataset>) -> Result<Self, DispatchError> {
        if datasets.is_empty() {
            return Err(DispatchError::EmptyCatalog);
        }
        Ok(Self {
            datasets,
            current: AtomicUsize::new(0),
        })
    }

    /// Built-in phrase sets
    pub fn default_datasets() -> Vec<PhraseDataset> {
        vec![
            PhraseDataset {
                name: "basic".to_string(),
                up: "Yes".to_string(),
                down: "No".to_string(),
                left: "I need help".to_string(),
                right: "Thank you".to_string(),
            },
            PhraseDataset {
                name: "comfort".to_string(),
                up: "I'm thirsty".to_string(),
                down: "I'm hungry".to_string(),
                left: "I'm in pain".to_string(),
                right: "I'm tired".to_string(),
            },
        ]
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn current(&self) -> &PhraseDataset {
        &self.datasets[self.current_index() % self.datasets.len()]
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self {
            datasets: Self::default_datasets(),
            current: AtomicUsize::new(0),
        }
    }
}

impl PhraseSource for DatasetCatalog {
    fn resolve(&self, direction: Cardinal) -> Option<String> {
        Some(self.current().phrase(direction).to_string())
    }

    fn advance(&self) -> Result<(), SinkError> {
        let count = self.datasets.len();
        let previous = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % count))
            .map_err(|_| SinkError::Rejected("dataset index update failed".to_string()))?;
        info!(
            "Dataset advanced: {} -> {}",
            self.datasets[previous].name,
            self.datasets[(previous + 1) % count].name
        );
        Ok(())
    }
}
