// THEORY:
// An `ElectrodeMask` is a fixed-length boolean vector parallel to an electrode
// grid. It is the common currency between selectors, clustering results and
// editing operations: "which electrodes does this act on?".
//
// Binary operators only make sense between masks of the same grid, so every
// one of them checks lengths and returns a `Result`. A mismatch is a caller
// bug and is reported, never truncated or padded.

use crate::core_modules::blueprint::Category;
use crate::error::{BlueprintError, BlueprintResult, check_len};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ElectrodeMask {
    bits: Vec<bool>,
}

impl ElectrodeMask {
    /// All-false mask of `len` electrodes.
    pub fn new(len: usize) -> Self {
        Self { bits: vec![false; len] }
    }

    /// All-true mask of `len` electrodes.
    pub fn full(len: usize) -> Self {
        Self { bits: vec![true; len] }
    }

    pub fn from_bools(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Mask with exactly `indices` set. Out-of-range indices are rejected.
    pub fn from_indices(len: usize, indices: &[usize]) -> BlueprintResult<Self> {
        let mut mask = Self::new(len);
        for &index in indices {
            if index >= len {
                return Err(BlueprintError::IndexOutOfRange { index, len });
            }
            mask.bits[index] = true;
        }
        Ok(mask)
    }

    /// Mask of the positions in `values` where `predicate` holds.
    pub fn from_predicate<T>(values: &[T], predicate: impl Fn(&T) -> bool) -> Self {
        Self {
            bits: values.iter().map(predicate).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// `false` for indices outside the mask.
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, value: bool) -> BlueprintResult<()> {
        let len = self.bits.len();
        match self.bits.get_mut(index) {
            Some(bit) => {
                *bit = value;
                Ok(())
            }
            None => Err(BlueprintError::IndexOutOfRange { index, len }),
        }
    }

    /// Number of set positions.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn any(&self) -> bool {
        self.bits.iter().any(|&b| b)
    }

    /// True for the empty mask.
    pub fn all(&self) -> bool {
        self.bits.iter().all(|&b| b)
    }

    pub fn not(&self) -> Self {
        Self {
            bits: self.bits.iter().map(|&b| !b).collect(),
        }
    }

    pub fn and(&self, other: &Self) -> BlueprintResult<Self> {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn or(&self, other: &Self) -> BlueprintResult<Self> {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn xor(&self, other: &Self) -> BlueprintResult<Self> {
        self.zip_with(other, |a, b| a != b)
    }

    /// `self & !other`.
    pub fn diff(&self, other: &Self) -> BlueprintResult<Self> {
        self.zip_with(other, |a, b| a && !b)
    }

    pub fn not_assign(&mut self) {
        self.bits.iter_mut().for_each(|b| *b = !*b);
    }

    pub fn and_assign(&mut self, other: &Self) -> BlueprintResult<()> {
        self.zip_assign(other, |a, b| a && b)
    }

    pub fn or_assign(&mut self, other: &Self) -> BlueprintResult<()> {
        self.zip_assign(other, |a, b| a || b)
    }

    pub fn xor_assign(&mut self, other: &Self) -> BlueprintResult<()> {
        self.zip_assign(other, |a, b| a != b)
    }

    pub fn diff_assign(&mut self, other: &Self) -> BlueprintResult<()> {
        self.zip_assign(other, |a, b| a && !b)
    }

    /// Set indices in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
    }

    pub fn as_bool_mask(&self) -> &[bool] {
        &self.bits
    }

    pub fn as_indices(&self) -> Vec<usize> {
        self.iter_set().collect()
    }

    /// Writes `value` into `categories` at every set position.
    pub fn fill(&self, categories: &mut [Category], value: Category) -> BlueprintResult<()> {
        check_len("mask fill target", self.bits.len(), categories.len())?;
        for i in self.iter_set() {
            categories[i] = value;
        }
        Ok(())
    }

    fn zip_with(&self, other: &Self, op: impl Fn(bool, bool) -> bool) -> BlueprintResult<Self> {
        check_len("mask operand", self.bits.len(), other.bits.len())?;
        Ok(Self {
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        })
    }

    fn zip_assign(&mut self, other: &Self, op: impl Fn(bool, bool) -> bool) -> BlueprintResult<()> {
        check_len("mask operand", self.bits.len(), other.bits.len())?;
        for (a, &b) in self.bits.iter_mut().zip(&other.bits) {
            *a = op(*a, b);
        }
        Ok(())
    }
}

impl From<Vec<bool>> for ElectrodeMask {
    fn from(bits: Vec<bool>) -> Self {
        Self::from_bools(bits)
    }
}

impl fmt::Debug for ElectrodeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect();
        write!(f, "ElectrodeMask({text})")
    }
}
