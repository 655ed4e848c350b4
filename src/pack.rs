// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Batch packing - turns leveled stages into size-bounded CI jobs
//!
//! Small consecutive stages are merged into one batch to cut the number of
//! jobs; a batch runs its packages in order, so merging only ever pushes
//! work later. Oversized stages are split into parallel chunks. Packages
//! listed as always-isolated get a job of their own.

use crate::error::{Result, SchedulerError};
use crate::types::{Batch, PackageName, PackedStage, Stage};
use std::collections::HashSet;

/// Packer settings
#[derive(Debug, Clone)]
pub struct PackOptions<'a> {
    /// Maximum packages per batch, must be positive
    pub max_batch_size: usize,
    /// Packages that always run alone
    pub always_isolated: &'a [String],
}

/// Accumulates packed stages and the pending merge carry-over
struct Packer {
    max: usize,
    packed: Vec<PackedStage>,
    carry: Vec<PackageName>,
}

impl Packer {
    fn flush(&mut self) {
        if !self.carry.is_empty() {
            let batch = Batch(std::mem::take(&mut self.carry));
            tracing::trace!("Flushing merged batch: {}", batch.joined());
            self.packed.push(PackedStage(vec![batch]));
        }
    }

    fn isolate(&mut self, pkg: PackageName) {
        tracing::debug!("{} builds in its own job", pkg);
        self.packed.push(PackedStage(vec![Batch(vec![pkg])]));
    }

    fn push_stage(&mut self, remainder: Vec<PackageName>) {
        if remainder.is_empty() {
            return;
        }

        if remainder.len() + self.carry.len() < self.max {
            self.carry.extend(remainder);
            return;
        }

        self.flush();
        if remainder.len() < self.max {
            self.carry = remainder;
        } else {
            let chunks = remainder
                .chunks(self.max)
                .map(|chunk| Batch(chunk.to_vec()))
                .collect();
            self.packed.push(PackedStage(chunks));
        }
    }
}

/// Pack leveled stages into CI stages of bounded batches
///
/// Every input package appears in exactly one output batch. A package is
/// always either in a later packed stage than its dependencies or in the
/// same batch after them.
pub fn pack(stages: &[Stage], options: &PackOptions<'_>) -> Result<Vec<PackedStage>> {
    if options.max_batch_size == 0 {
        return Err(SchedulerError::InvalidBatchSize(options.max_batch_size));
    }

    let isolated: HashSet<&str> = options.always_isolated.iter().map(String::as_str).collect();
    let mut packer = Packer {
        max: options.max_batch_size,
        packed: Vec::new(),
        carry: Vec::new(),
    };

    for stage in stages {
        let (alone, remainder): (Vec<_>, Vec<_>) = stage
            .iter()
            .cloned()
            .partition(|pkg| isolated.contains(pkg.as_str()));

        if !alone.is_empty() {
            // Isolated packages may depend on the pending carry-over.
            packer.flush();
            for pkg in alone {
                packer.isolate(pkg);
            }
        }

        packer.push_stage(remainder);
    }

    packer.flush();
    Ok(packer.packed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(names: &[&str]) -> Stage {
        names.iter().map(|n| PackageName::from(*n)).collect()
    }

    fn shape(packed: &[PackedStage]) -> Vec<Vec<Vec<&str>>> {
        packed
            .iter()
            .map(|s| {
                s.batches()
                    .iter()
                    .map(|b| b.packages().iter().map(PackageName::as_str).collect())
                    .collect()
            })
            .collect()
    }

    fn opts(max: usize, isolated: &[String]) -> PackOptions<'_> {
        PackOptions {
            max_batch_size: max,
            always_isolated: isolated,
        }
    }

    #[test]
    fn test_oversized_stage_is_chunked() {
        let packed = pack(&[stage(&["p1", "p2", "p3"])], &opts(2, &[])).unwrap();
        assert_eq!(shape(&packed), vec![vec![vec!["p1", "p2"], vec!["p3"]]]);
    }

    #[test]
    fn test_isolated_package_gets_own_batch() {
        let isolated = vec!["p2".to_string()];
        let packed = pack(&[stage(&["p1", "p2", "p3"])], &opts(5, &isolated)).unwrap();
        assert_eq!(shape(&packed), vec![vec![vec!["p2"]], vec![vec!["p1", "p3"]]]);
    }

    #[test]
    fn test_small_stages_merge() {
        let packed = pack(
            &[stage(&["a"]), stage(&["b"]), stage(&["c"])],
            &opts(5, &[]),
        )
        .unwrap();
        assert_eq!(shape(&packed), vec![vec![vec!["a", "b", "c"]]]);
    }

    #[test]
    fn test_merge_stops_at_bound() {
        let packed = pack(
            &[stage(&["a", "b"]), stage(&["c", "d"]), stage(&["e"])],
            &opts(4, &[]),
        )
        .unwrap();
        // a,b + c,d would reach 4, so the carry flushes first
        assert_eq!(
            shape(&packed),
            vec![vec![vec!["a", "b"]], vec![vec!["c", "d", "e"]]]
        );
    }

    #[test]
    fn test_exact_size_stage_is_its_own_batch() {
        let packed = pack(&[stage(&["a"]), stage(&["b", "c"])], &opts(2, &[])).unwrap();
        assert_eq!(shape(&packed), vec![vec![vec!["a"]], vec![vec!["b", "c"]]]);
    }

    #[test]
    fn test_isolation_flushes_pending_carry_first() {
        let isolated = vec!["big".to_string()];
        let packed = pack(
            &[stage(&["base"]), stage(&["big", "small"])],
            &opts(5, &isolated),
        )
        .unwrap();
        assert_eq!(
            shape(&packed),
            vec![vec![vec!["base"]], vec![vec!["big"]], vec![vec!["small"]]]
        );
    }

    #[test]
    fn test_fully_isolated_stage_emits_no_empty_batch() {
        let isolated = vec!["solo".to_string()];
        let packed = pack(&[stage(&["solo"])], &opts(5, &isolated)).unwrap();
        assert_eq!(shape(&packed), vec![vec![vec!["solo"]]]);
    }

    #[test]
    fn test_zero_batch_size_fails_fast() {
        let err = pack(&[stage(&["a"])], &opts(0, &[])).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidBatchSize(0)));
    }

    #[test]
    fn test_empty_input() {
        assert!(pack(&[], &opts(3, &[])).unwrap().is_empty());
    }
}
