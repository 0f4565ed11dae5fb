/// A `(key, value)` pair. The key selects the bucket, the value rides along.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct Record {
    pub key: i64,
    pub value: i64,
}

impl Record {
    #[inline(always)]
    pub const fn new(key: i64, value: i64) -> Self {
        Self { key, value }
    }
}

/// Maps a key onto `[0, num_buckets)` by modulo.
///
/// Negative keys wrap the Euclidean way so the index is always in range.
/// `num_buckets` must be non-zero; configurations are validated before this
/// is ever reached.
#[inline(always)]
pub fn bucket_of(key: i64, num_buckets: usize) -> usize {
    debug_assert!(num_buckets > 0);
    key.rem_euclid(num_buckets as i64) as usize
}

/// Synthetic input: `n` records with `key == value`, numbered from 1.
pub fn sequential(n: usize) -> Vec<Record> {
    (1..=n as i64).map(|i| Record::new(i, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_is_one_based() {
        let data = sequential(4);
        assert_eq!(
            data,
            vec![
                Record::new(1, 1),
                Record::new(2, 2),
                Record::new(3, 3),
                Record::new(4, 4)
            ]
        );
        assert!(sequential(0).is_empty());
    }

    #[test]
    fn bucket_is_modulo() {
        assert_eq!(bucket_of(8, 8), 0);
        assert_eq!(bucket_of(9, 8), 1);
        assert_eq!(bucket_of(17, 8), 1);
        assert_eq!(bucket_of(5, 1), 0);
        // Not limited to powers of two.
        assert_eq!(bucket_of(10, 3), 1);
    }

    #[test]
    fn bucket_negative_keys_stay_in_range() {
        for key in -100..0 {
            let b = bucket_of(key, 7);
            assert!(b < 7, "key {key} -> {b}");
        }
        assert_eq!(bucket_of(-1, 8), 7);
    }
}
