//! Synthetic sensor rows used as benchmark payload.
//!
//! A row is a pure function of its index: the index becomes the device id
//! and seeds the generator for the nine readings, so the same index always
//! yields the same row and distinct indices never collide on the id column.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of readings per row (every column except the device id).
pub const READINGS: usize = 9;

/// `[min, max)` for each reading column, by position.
pub const READING_RANGES: [(f64, f64); READINGS] = [
    (25.0, 26.0),   // temperature
    (40.0, 60.0),   // humidity
    (500.0, 600.0), // co2
    (0.9, 1.1),     // co
    (23.0, 25.0),   // lpg
    (50.0, 60.0),   // smoke
    (0.0, 1.0),     // presence
    (600.0, 800.0), // light
    (400.0, 500.0), // sound
];

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub device_id: i64,
    pub readings: [f64; READINGS],
}

/// Returns the row for global index `idx`.
pub fn row(idx: u64) -> Row {
    let mut rng = StdRng::seed_from_u64(idx);
    let mut readings = [0.0; READINGS];
    for (value, (min, max)) in readings.iter_mut().zip(READING_RANGES) {
        *value = rng.gen_range(min..max);
    }
    Row {
        device_id: idx as i64,
        readings,
    }
}

/// Returns `size` rows for block `block`, covering the global indices
/// `block*size .. block*size+size`.
pub fn rows(block: usize, size: usize) -> Vec<Row> {
    let start = (block * size) as u64;
    (start..start + size as u64).map(row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn row_is_deterministic() {
        assert_eq!(row(42), row(42));
        assert_ne!(row(42).readings, row(43).readings);
    }

    #[test]
    fn readings_stay_in_range() {
        for idx in 0..500 {
            let r = row(idx);
            for (value, (min, max)) in r.readings.iter().zip(READING_RANGES) {
                assert!(*value >= min && *value < max, "{value} not in [{min}, {max})");
            }
        }
    }

    #[test]
    fn blocks_cover_their_index_range() {
        let block = rows(3, 7);
        assert_eq!(block.len(), 7);
        let ids: Vec<i64> = block.iter().map(|r| r.device_id).collect();
        assert_eq!(ids, (21..28).collect::<Vec<_>>());
    }

    #[test]
    fn blocks_never_overlap() {
        let mut seen = HashSet::new();
        for block in 0..10 {
            for r in rows(block, 25) {
                assert!(seen.insert(r.device_id), "duplicate id {}", r.device_id);
            }
        }
        assert_eq!(seen.len(), 250);
    }

    #[test]
    fn empty_block() {
        assert!(rows(5, 0).is_empty());
    }
}
