//! Weighted set with O(log) updates and O(1) expected weighted sampling.
//!
//! The event scheduler needs to repeatedly draw an element with probability
//! proportional to its weight while weights change after every event, and the
//! weights (group rates) can span many orders of magnitude. The structure
//! used here partitions the declared weight range `[wmin, wmax]` into
//! geometric bins by factors of two: bin `b` holds the keys whose weight lies
//! in `[wmin·2^b, wmin·2^(b+1))`. A Fenwick tree tracks per-bin weight
//! totals; sampling first picks a bin proportionally to its total, then
//! rejection-samples within the bin. Because weights inside one bin differ by
//! less than a factor of two, the in-bin acceptance probability is at least
//! one half and the expected work per sample is O(1).

mod fenwick;

pub(crate) use fenwick::FenwickTree;

use crate::error::HocsimError;
use crate::hashing::{HashMap, HashMapExt};
use rand::Rng;
use std::fmt::Debug;
use std::hash::Hash;

/// A set of distinct keys with positive weights in a declared envelope,
/// supporting weighted sampling.
#[derive(Debug, Clone)]
pub struct SamplableSet<K> {
    min_weight: f64,
    max_weight: f64,
    bins: Vec<Vec<(K, f64)>>,
    totals: FenwickTree,
    // key -> (bin, slot within bin) for O(1) relocation
    positions: HashMap<K, (usize, usize)>,
}

impl<K: Copy + Eq + Hash + Debug> SamplableSet<K> {
    /// Creates an empty set accepting weights in `[min_weight, max_weight]`.
    ///
    /// Fails unless `0 < min_weight <= max_weight` and both are finite.
    pub fn new(min_weight: f64, max_weight: f64) -> Result<Self, HocsimError> {
        if !(min_weight.is_finite() && max_weight.is_finite())
            || min_weight <= 0.0
            || max_weight < min_weight
        {
            return Err(HocsimError::InvalidOperation(format!(
                "invalid weight envelope [{min_weight}, {max_weight}]"
            )));
        }
        let number_of_bins = (max_weight / min_weight).log2().floor() as usize + 1;
        Ok(SamplableSet {
            min_weight,
            max_weight,
            bins: vec![Vec::new(); number_of_bins],
            totals: FenwickTree::new(number_of_bins),
            positions: HashMap::new(),
        })
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    /// Current weight of `key`, if present.
    pub fn weight(&self, key: &K) -> Option<f64> {
        self.positions
            .get(key)
            .map(|&(bin, slot)| self.bins[bin][slot].1)
    }

    /// Sum of all weights, up to floating-point accumulation tolerance.
    pub fn total_weight(&self) -> f64 {
        self.totals.total()
    }

    /// Inserts an absent key.
    pub fn insert(&mut self, key: K, weight: f64) -> Result<(), HocsimError> {
        self.check_weight(weight)?;
        if self.positions.contains_key(&key) {
            return Err(HocsimError::InvalidOperation(format!(
                "insert of duplicate key {key:?}"
            )));
        }
        let bin = self.bin_of(weight);
        self.bins[bin].push((key, weight));
        self.positions.insert(key, (bin, self.bins[bin].len() - 1));
        self.totals.add(bin, weight);
        Ok(())
    }

    /// Updates the weight of a present key.
    pub fn set_weight(&mut self, key: K, weight: f64) -> Result<(), HocsimError> {
        self.check_weight(weight)?;
        let &(bin, slot) = self.positions.get(&key).ok_or_else(|| {
            HocsimError::InvalidOperation(format!("set_weight on absent key {key:?}"))
        })?;
        let new_bin = self.bin_of(weight);
        if new_bin == bin {
            let old_weight = self.bins[bin][slot].1;
            self.bins[bin][slot].1 = weight;
            self.totals.add(bin, weight - old_weight);
        } else {
            let old_weight = self.remove_slot(bin, slot);
            self.totals.add(bin, -old_weight);
            self.bins[new_bin].push((key, weight));
            self.positions
                .insert(key, (new_bin, self.bins[new_bin].len() - 1));
            self.totals.add(new_bin, weight);
        }
        Ok(())
    }

    /// Removes a present key.
    pub fn erase(&mut self, key: &K) -> Result<(), HocsimError> {
        let (bin, slot) = self
            .positions
            .remove(key)
            .ok_or_else(|| HocsimError::InvalidOperation(format!("erase of absent key {key:?}")))?;
        let weight = self.remove_slot(bin, slot);
        self.totals.add(bin, -weight);
        Ok(())
    }

    /// Inserts, updates, or erases `key` so that its weight becomes
    /// `weight`: a non-positive weight removes the key (if present), a
    /// positive one inserts or updates it. This is the convenience the
    /// per-event rate recomputation in every process variant goes through.
    pub fn update(&mut self, key: K, weight: f64) -> Result<(), HocsimError> {
        if weight > 0.0 {
            if self.contains(&key) {
                self.set_weight(key, weight)
            } else {
                self.insert(key, weight)
            }
        } else if self.contains(&key) {
            self.erase(&key)
        } else {
            Ok(())
        }
    }

    /// Draws a key with probability proportional to its weight, returning
    /// the key and its weight. Fails with [`HocsimError::Empty`] on an
    /// empty set.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(K, f64), HocsimError> {
        if self.positions.is_empty() {
            return Err(HocsimError::Empty);
        }
        loop {
            let target = rng.random::<f64>() * self.totals.total();
            let bin = self.totals.prefix_search(target).min(self.bins.len() - 1);
            let entries = &self.bins[bin];
            if entries.is_empty() {
                // Accumulated drift left residual mass on an empty bin.
                continue;
            }
            let (key, weight) = entries[rng.random_range(0..entries.len())];
            let ceiling = self.min_weight * f64::exp2(bin as f64 + 1.0);
            if rng.random::<f64>() * ceiling < weight {
                return Ok((key, weight));
            }
        }
    }

    /// Empties the set and rebuilds the totals from scratch, cancelling
    /// floating-point accumulation drift.
    pub fn clear(&mut self) {
        for bin in &mut self.bins {
            bin.clear();
        }
        self.positions.clear();
        self.totals.reset();
    }

    fn check_weight(&self, weight: f64) -> Result<(), HocsimError> {
        if !weight.is_finite() || weight < self.min_weight || weight > self.max_weight {
            return Err(HocsimError::OutOfRange {
                value: weight,
                min: self.min_weight,
                max: self.max_weight,
            });
        }
        Ok(())
    }

    fn bin_of(&self, weight: f64) -> usize {
        let bin = (weight / self.min_weight).log2().floor() as usize;
        bin.min(self.bins.len() - 1)
    }

    // Swap-removes a slot and fixes the position of the entry moved into
    // its place. Returns the removed weight. The caller owns the totals
    // update and the positions entry of the removed key.
    fn remove_slot(&mut self, bin: usize, slot: usize) -> f64 {
        let (_, weight) = self.bins[bin].swap_remove(slot);
        if slot < self.bins[bin].len() {
            let moved = self.bins[bin][slot].0;
            self.positions.insert(moved, (bin, slot));
        }
        weight
    }
}
