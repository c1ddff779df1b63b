//! Training tensors and their train/test/valid grouping.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed-width pitch tensor for one piece: time steps × voice slots.
///
/// Absent slots serialize as `null`, so they never collide with pitch 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PitchGrid {
    pub steps: Vec<Vec<Option<u8>>>,
}

impl PitchGrid {
    pub fn new(steps: Vec<Vec<Option<u8>>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Slot count of the first step, 0 when empty.
    pub fn width(&self) -> usize {
        self.steps.first().map(Vec::len).unwrap_or(0)
    }
}

/// Items grouped into the three training sets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetSplit<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
    pub valid: Vec<T>,
}

impl<T> SetSplit<T> {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len() + self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set names paired with their members, in train/test/valid order.
    pub fn named(&self) -> [(&'static str, &[T]); 3] {
        [
            ("train", self.train.as_slice()),
            ("test", self.test.as_slice()),
            ("valid", self.valid.as_slice()),
        ]
    }
}

/// Shuffle `items` and cut them into three groups of `ceil(n / 3)`.
///
/// The valid group takes the remainder and may be shorter or empty.
pub fn split_sets<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> SetSplit<T> {
    items.shuffle(rng);
    let part = items.len().div_ceil(3);
    let mut rest = items.into_iter();
    let train = rest.by_ref().take(part).collect();
    let test = rest.by_ref().take(part).collect();
    let valid = rest.collect();
    SetSplit { train, test, valid }
}

/// The persisted training data.
pub type Dataset = SetSplit<PitchGrid>;

impl SetSplit<PitchGrid> {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: &Path) -> crate::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_json(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn sample_dataset() -> Dataset {
        Dataset {
            train: vec![PitchGrid::new(vec![
                vec![Some(60), Some(0), None, None],
                vec![None, None, None, None],
            ])],
            test: vec![PitchGrid::default()],
            valid: vec![],
        }
    }

    #[test]
    fn absent_and_pitch_zero_stay_distinct() {
        let dataset = sample_dataset();
        let json = dataset.to_json().unwrap();
        assert!(json.contains("[60,0,null,null]"));
        assert_eq!(Dataset::from_json(&json).unwrap(), dataset);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.json");
        let dataset = sample_dataset();
        dataset.save_json(&path).unwrap();
        assert_eq!(Dataset::load_json(&path).unwrap(), dataset);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dataset::load_json(&dir.path().join("nope.json")),
            Err(crate::Error::Io { .. })
        ));
    }

    #[test]
    fn split_covers_every_item_once() {
        let mut rng = Pcg64::seed_from_u64(7);
        let split = split_sets((0..10).collect::<Vec<u32>>(), &mut rng);
        assert_eq!(split.train.len(), 4);
        assert_eq!(split.test.len(), 4);
        assert_eq!(split.valid.len(), 2);

        let mut all: Vec<u32> = split
            .named()
            .iter()
            .flat_map(|(_, items)| items.iter().copied())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<u32>>());
    }

    #[test]
    fn split_is_reproducible_for_a_seed() {
        let a = split_sets((0..30).collect::<Vec<u32>>(), &mut Pcg64::seed_from_u64(42));
        let b = split_sets((0..30).collect::<Vec<u32>>(), &mut Pcg64::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_inputs_leave_empty_groups() {
        let mut rng = Pcg64::seed_from_u64(1);
        let split = split_sets(vec!["only"], &mut rng);
        assert_eq!(split.train, vec!["only"]);
        assert!(split.test.is_empty());
        assert!(split.valid.is_empty());
        assert!(split_sets(Vec::<u8>::new(), &mut rng).is_empty());
    }
}
