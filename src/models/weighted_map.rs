use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default fraction of a positive entry that survives a single negative update
pub const DEFAULT_CAP_PENALTY: f64 = 0.5;

/// Signed weighted tally keyed by name
///
/// Missing keys read as `0.0` through [`WeightedMap::get_or_default`]. Keys are kept
/// sorted so that iteration (and therefore tie-breaking during matching) is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedMap(BTreeMap<String, f64>);

impl WeightedMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the weight for `key`, or `0.0` when the key was never tallied
    pub fn get_or_default(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Unconditionally adds `weight` to the entry for `key`
    pub fn add(&mut self, key: &str, weight: f64) {
        *self.0.entry(key.to_string()).or_insert(0.0) += weight;
    }

    /// Folds one signed contribution into the tally.
    ///
    /// Non-negative weights accumulate. A negative weight applied to a positive entry
    /// cannot take it below `current * cap_penalty` in one call; entries that are
    /// already zero or negative take the full negative weight.
    pub fn apply_capped_weight(&mut self, key: &str, weight: f64, cap_penalty: f64) {
        if weight == 0.0 {
            return;
        }

        if weight > 0.0 {
            self.add(key, weight);
            return;
        }

        let current = self.get_or_default(key);
        if current > 0.0 {
            let floor = current * cap_penalty;
            self.0.insert(key.to_string(), (current + weight).max(floor));
        } else {
            self.add(key, weight);
        }
    }

    /// Largest strictly positive weight, or `1.0` when there is none.
    ///
    /// Used as the normalization denominator, so it must never be zero.
    pub fn max_positive(&self) -> f64 {
        self.0
            .values()
            .copied()
            .filter(|v| *v > 0.0)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
            .unwrap_or(1.0)
    }

    /// Copy of this map with every key passed through `rekey`.
    ///
    /// Keys that collide after rekeying keep the larger weight.
    pub fn rekeyed(&self, rekey: impl Fn(&str) -> String) -> WeightedMap {
        let mut rekeyed = BTreeMap::new();
        for (key, weight) in &self.0 {
            rekeyed
                .entry(rekey(key))
                .and_modify(|existing: &mut f64| *existing = existing.max(*weight))
                .or_insert(*weight);
        }
        WeightedMap(rekeyed)
    }

    pub fn to_lowercase_keys(&self) -> WeightedMap {
        self.rekeyed(str::to_lowercase)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for WeightedMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
