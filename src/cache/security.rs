//! Security Gate Module
//!
//! Size and collision-chain accounting consulted before an insert commits.

use std::collections::HashMap;
use std::fmt;

use crate::cache::SecurityPolicy;

// == Rejection ==
/// Why an insert was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Value exceeds the per-entry cap
    EntryTooLarge { size: usize, limit: usize },
    /// Value alone exceeds the aggregate budget
    ExceedsTotalBudget { size: usize, limit: usize },
    /// Hash bucket already holds the maximum number of live keys
    CollisionChainFull { bucket: u64, limit: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EntryTooLarge { size, limit } => write!(
                f,
                "value of {} bytes exceeds per-entry limit of {} bytes",
                size, limit
            ),
            Rejection::ExceedsTotalBudget { size, limit } => write!(
                f,
                "value of {} bytes exceeds total cache budget of {} bytes",
                size, limit
            ),
            Rejection::CollisionChainFull { bucket, limit } => write!(
                f,
                "hash bucket {:#018x} already holds {} live entries",
                bucket, limit
            ),
        }
    }
}

// == Security Gate ==
/// Tracks per-bucket occupancy and enforces the configured limits.
#[derive(Debug)]
pub struct SecurityGate {
    max_content_size: Option<usize>,
    max_total_bytes: Option<usize>,
    max_collision_chain: Option<usize>,
    buckets: HashMap<u64, usize>,
}

impl SecurityGate {
    pub fn new(policy: &SecurityPolicy, max_total_bytes: Option<usize>) -> Self {
        Self {
            max_content_size: policy.max_content_size,
            max_total_bytes,
            max_collision_chain: policy.max_collision_chain,
            buckets: HashMap::new(),
        }
    }

    /// Checks a single value's size against both byte limits.
    ///
    /// Passing does not mean the value fits right now, only that eviction
    /// can make room for it.
    pub fn check_size(&self, size: usize) -> Result<(), Rejection> {
        if let Some(limit) = self.max_content_size {
            if size > limit {
                return Err(Rejection::EntryTooLarge { size, limit });
            }
        }
        if let Some(limit) = self.max_total_bytes {
            if size > limit {
                return Err(Rejection::ExceedsTotalBudget { size, limit });
            }
        }
        Ok(())
    }

    /// Checks whether a new key may join `bucket`.
    pub fn check_bucket(&self, bucket: u64) -> Result<(), Rejection> {
        match self.max_collision_chain {
            Some(limit) if self.chain_len(bucket) >= limit => {
                Err(Rejection::CollisionChainFull { bucket, limit })
            }
            _ => Ok(()),
        }
    }

    /// Bytes that must be freed for `current + incoming` to fit the budget.
    pub fn overflow(&self, current: usize, incoming: usize) -> usize {
        match self.max_total_bytes {
            Some(limit) => (current + incoming).saturating_sub(limit),
            None => 0,
        }
    }

    pub fn occupy(&mut self, bucket: u64) {
        *self.buckets.entry(bucket).or_insert(0) += 1;
    }

    pub fn release(&mut self, bucket: u64) {
        if let Some(count) = self.buckets.get_mut(&bucket) {
            *count -= 1;
            if *count == 0 {
                self.buckets.remove(&bucket);
            }
        }
    }

    /// Live entries currently sharing `bucket`.
    pub fn chain_len(&self, bucket: u64) -> usize {
        self.buckets.get(&bucket).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
