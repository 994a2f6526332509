use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ComponentIo, IoKey};

/// Values of continuity-flagged IOs handed from one window to the next.
///
/// This is the only data surviving between two windows. It is produced by
/// committing a solved window and consumed by the build of the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarriedState {
    values: BTreeMap<IoKey, f64>,
}

impl CarriedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, io: &ComponentIo) -> Option<f64> {
        self.values.get(&io.key()).copied()
    }

    pub fn get_key(&self, key: &IoKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn insert(&mut self, key: IoKey, value: f64) {
        self.values.insert(key, value);
    }

    /// Later values win over the values of `self`
    pub fn merged_with(&self, later: &CarriedState) -> CarriedState {
        let mut values = self.values.clone();
        values.extend(later.values.iter().map(|(k, v)| (k.clone(), *v)));
        CarriedState { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IoKey, f64)> {
        self.values.iter().map(|(k, v)| (k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, TimeSerieType};

    #[test]
    fn test_merge_prefers_later_values() {
        let storage = ComponentIo::new("dam", "storage", Direction::Output, TimeSerieType::Extensive, true);
        let mut initial = CarriedState::new();
        initial.insert(storage.key(), 10.0);
        initial.insert(IoKey::new("cluster", "units_on"), 2.0);

        let mut committed = CarriedState::new();
        committed.insert(storage.key(), 4.0);

        let merged = initial.merged_with(&committed);
        assert_eq!(merged.get(&storage), Some(4.0));
        assert_eq!(merged.get_key(&IoKey::new("cluster", "units_on")), Some(2.0));
        assert_eq!(merged.len(), 2);
    }
}
