use std::{collections::HashSet, sync::Arc};

use crate::errors::{MosaicError, Result};

/// Band selection: either the listed indexes, or every index except the listed ones.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Indexes {
    selection: Arc<[usize]>,
    drop: bool,
}

impl<const N: usize> From<([usize; N], bool)> for Indexes {
    fn from(value: ([usize; N], bool)) -> Self {
        let selection = Arc::from(value.0);
        let drop = value.1;
        Indexes { selection, drop }
    }
}

impl From<(std::ops::Range<usize>, bool)> for Indexes {
    fn from(value: (std::ops::Range<usize>, bool)) -> Self {
        let selection = value.0.collect();
        let drop = value.1;
        Indexes { selection, drop }
    }
}

impl<const N: usize> From<[usize; N]> for Indexes {
    fn from(value: [usize; N]) -> Self {
        let selection = Arc::from(value);
        Indexes {
            selection,
            drop: false,
        }
    }
}

impl From<std::ops::Range<usize>> for Indexes {
    fn from(value: std::ops::Range<usize>) -> Self {
        let selection = value.collect();
        Indexes {
            selection,
            drop: false,
        }
    }
}

impl From<&[usize]> for Indexes {
    fn from(value: &[usize]) -> Self {
        Indexes {
            selection: Arc::from(value),
            drop: false,
        }
    }
}

impl Indexes {
    /// Resolve against a collection of `collection_len` items.
    pub fn indexes_from(&self, collection_len: usize) -> Result<Arc<[usize]>> {
        if let Some(&band) = self.selection.iter().find(|idx| **idx >= collection_len) {
            if !self.drop {
                return Err(MosaicError::BandOutOfRange {
                    band,
                    count: collection_len,
                });
            }
        }
        if self.drop {
            let drop_idxs: HashSet<usize> = self.selection.iter().copied().collect();
            Ok((0..collection_len)
                .filter(|idx| !drop_idxs.contains(idx))
                .collect())
        } else {
            Ok(Arc::clone(&self.selection))
        }
    }

    pub fn select_from<T: Clone>(&self, collection: &[T]) -> Result<Box<[T]>> {
        Ok(self
            .indexes_from(collection.len())?
            .iter()
            .map(|idx| collection[*idx].clone())
            .collect())
    }

    /// Whether the selection keeps every index of a `collection_len` collection, in order.
    pub fn is_identity(&self, collection_len: usize) -> bool {
        self.indexes_from(collection_len)
            .map(|idxs| idxs.iter().copied().eq(0..collection_len))
            .unwrap_or(false)
    }

    pub fn all() -> Self {
        Self {
            selection: Arc::from([]),
            drop: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Indexes::all(), 3, vec![0, 1, 2])]
    #[case(Indexes::from([2, 0]), 3, vec![2, 0])]
    #[case(Indexes::from(([1], true)), 3, vec![0, 2])]
    #[case(Indexes::from(1..3), 4, vec![1, 2])]
    fn resolves(#[case] indexes: Indexes, #[case] len: usize, #[case] expected: Vec<usize>) {
        assert_eq!(indexes.indexes_from(len).unwrap().to_vec(), expected)
    }

    #[test]
    fn out_of_range_selection() {
        assert!(matches!(
            Indexes::from([4]).indexes_from(2),
            Err(MosaicError::BandOutOfRange { band: 4, count: 2 })
        ));
        assert!(Indexes::all().is_identity(2));
        assert!(!Indexes::from([1, 0]).is_identity(2));
    }
}
