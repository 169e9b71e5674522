// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Division of the body population among workers
//!
//! Both engines split `[0, n)` into `p` contiguous ranges, one per worker.
//! Every worker but the last gets `floor(n / p)` bodies and the last one
//! absorbs the remainder. The two schemes phrase the last range
//! differently but must produce the same cover:
//!
//! ```text
//! Broadcast:  last = [start, n)
//! Pipeline:   last = [start, start + floor(n / p) + n mod p)
//! ```
//!
//! Partitions are fixed for the lifetime of an engine. They are checked
//! once at construction with [`PartitionScheme::validate`].

use std::ops::Range;

use crate::error::{EngineError, Result};

/// Remainder rule used to size the last partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionScheme {
    /// Last worker's range runs to the end of the population
    Broadcast,
    /// Last worker's range is the base size plus the remainder
    Pipeline,
}

impl PartitionScheme {
    /// Index range owned by worker `id` out of `workers`
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero or `id >= workers`
    pub fn range(&self, bodies: usize, workers: usize, id: usize) -> Range<usize> {
        assert!(workers > 0, "Worker count must be positive");
        assert!(id < workers, "Worker id {} out of range for {} workers", id, workers);

        let base = bodies / workers;
        let start = base * id;
        let last = id == workers - 1;
        let end = match self {
            PartitionScheme::Broadcast if last => bodies,
            PartitionScheme::Pipeline if last => start + base + bodies % workers,
            _ => start + base,
        };
        start..end
    }

    /// Ranges for every worker, in worker order
    pub fn ranges(&self, bodies: usize, workers: usize) -> Vec<Range<usize>> {
        (0..workers).map(|id| self.range(bodies, workers, id)).collect()
    }

    /// Compute the ranges and check they cover `[0, bodies)` exactly once
    pub fn validate(&self, bodies: usize, workers: usize) -> Result<Vec<Range<usize>>> {
        if workers == 0 {
            return Err(EngineError::InvalidWorkerCount);
        }
        let ranges = self.ranges(bodies, workers);
        check_cover(&ranges, bodies).map_err(|detail| EngineError::PartitionCoverage {
            bodies,
            workers,
            detail,
        })?;
        Ok(ranges)
    }
}

fn check_cover(ranges: &[Range<usize>], bodies: usize) -> std::result::Result<(), String> {
    let mut next = 0;
    for (id, range) in ranges.iter().enumerate() {
        if range.start != next {
            return Err(format!(
                "worker {} starts at {} but previous range ended at {}",
                id, range.start, next
            ));
        }
        if range.end < range.start {
            return Err(format!("worker {} has inverted range {:?}", id, range));
        }
        next = range.end;
    }
    if next != bodies {
        return Err(format!("ranges end at {} instead of {}", next, bodies));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMES: [PartitionScheme; 2] = [PartitionScheme::Broadcast, PartitionScheme::Pipeline];

    #[test]
    fn test_single_worker_owns_everything() {
        for scheme in SCHEMES {
            assert_eq!(scheme.range(17, 1, 0), 0..17);
        }
    }

    #[test]
    fn test_last_worker_absorbs_remainder() {
        for scheme in SCHEMES {
            assert_eq!(scheme.ranges(10, 3), vec![0..3, 3..6, 6..10]);
        }
    }

    #[test]
    fn test_more_workers_than_bodies() {
        for scheme in SCHEMES {
            let ranges = scheme.ranges(3, 5);
            assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..0, 0..3]);
            assert!(scheme.validate(3, 5).is_ok());
        }
    }

    #[test]
    fn test_coverage_exhaustive() {
        for scheme in SCHEMES {
            for bodies in 1..=40 {
                for workers in 1..=12 {
                    let ranges = scheme.validate(bodies, workers).unwrap();
                    let mut owner = vec![0usize; bodies];
                    for range in &ranges {
                        for i in range.clone() {
                            owner[i] += 1;
                        }
                    }
                    assert!(
                        owner.iter().all(|&count| count == 1),
                        "{:?} n={} p={} covers unevenly",
                        scheme,
                        bodies,
                        workers
                    );
                }
            }
        }
    }

    #[test]
    fn test_schemes_agree() {
        for bodies in 1..=30 {
            for workers in 1..=8 {
                assert_eq!(
                    PartitionScheme::Broadcast.ranges(bodies, workers),
                    PartitionScheme::Pipeline.ranges(bodies, workers)
                );
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let scheme = PartitionScheme::Broadcast;
        assert_eq!(scheme.range(100, 7, 3), scheme.range(100, 7, 3));
        assert_eq!(scheme.range(100, 7, 3), 42..56);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert_eq!(
            PartitionScheme::Broadcast.validate(10, 0),
            Err(EngineError::InvalidWorkerCount)
        );
    }

    #[test]
    fn test_check_cover_detects_gap_and_short_cover() {
        assert!(check_cover(&[0..3, 4..6], 6).is_err());
        assert!(check_cover(&[0..3, 3..5], 6).is_err());
        assert!(check_cover(&[0..3, 3..6], 6).is_ok());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_range_id_out_of_bounds() {
        PartitionScheme::Broadcast.range(10, 2, 2);
    }
}
