use std::collections::VecDeque;

use crate::models::config::OverflowPolicy;

/// Growable, append-only sample store for a single channel.
///
/// Unbounded unless built with [`ChannelAccumulator::with_limit`]. Reads
/// always hand out copies, so a snapshot taken for an export never aliases
/// the live buffer that keeps growing behind it.
#[derive(Debug, Clone, Default)]
pub struct ChannelAccumulator {
    samples: VecDeque<f32>,
    limit: Option<usize>,
    policy: OverflowPolicy,
}

impl ChannelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the store at `limit` samples, applying `policy` on overflow.
    pub fn with_limit(limit: usize, policy: OverflowPolicy) -> Self {
        Self {
            samples: VecDeque::with_capacity(limit.min(1 << 20)),
            limit: Some(limit.max(1)),
            policy,
        }
    }

    /// Append samples to the end of the channel.
    ///
    /// Returns how many samples were discarded to respect the limit: the
    /// oldest buffered ones under `DropOldest`, the incoming tail under
    /// `Reject`. Always 0 for an unbounded accumulator.
    pub fn append(&mut self, samples: &[f32]) -> usize {
        let Some(limit) = self.limit else {
            self.samples.extend(samples.iter().copied());
            return 0;
        };

        match self.policy {
            OverflowPolicy::DropOldest => {
                // If more data than the limit, only keep the tail
                let (skipped, samples) = if samples.len() > limit {
                    (samples.len() - limit, &samples[samples.len() - limit..])
                } else {
                    (0, samples)
                };

                let overflow = (self.samples.len() + samples.len()).saturating_sub(limit);
                self.samples.drain(..overflow);
                self.samples.extend(samples.iter().copied());
                overflow + skipped
            }
            OverflowPolicy::Reject => {
                let room = limit.saturating_sub(self.samples.len());
                let kept = samples.len().min(room);
                self.samples.extend(samples[..kept].iter().copied());
                samples.len() - kept
            }
        }
    }

    /// Whether appending `incoming` more samples would exceed the limit.
    pub fn would_overflow(&self, incoming: usize) -> bool {
        self.limit
            .is_some_and(|limit| self.samples.len() + incoming > limit)
    }

    /// Return every buffered sample and leave the channel empty.
    pub fn drain(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    /// Copy of the samples at positions `cursor..len`.
    ///
    /// A cursor past the end yields an empty snapshot.
    pub fn snapshot_from(&self, cursor: usize) -> Vec<f32> {
        if cursor >= self.samples.len() {
            return Vec::new();
        }
        self.samples.range(cursor..).copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_drain() {
        let mut acc = ChannelAccumulator::new();
        assert_eq!(acc.append(&[1.0, 2.0]), 0);
        assert_eq!(acc.append(&[3.0]), 0);

        assert_eq!(acc.len(), 3);
        assert_eq!(acc.drain(), vec![1.0, 2.0, 3.0]);
        assert!(acc.is_empty());
        assert!(acc.drain().is_empty());
    }

    #[test]
    fn snapshot_does_not_consume() {
        let mut acc = ChannelAccumulator::new();
        acc.append(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(acc.snapshot_from(0), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(acc.snapshot_from(2), vec![3.0, 4.0]);
        assert!(acc.snapshot_from(4).is_empty());
        assert!(acc.snapshot_from(10).is_empty());
        assert_eq!(acc.len(), 4);
    }

    #[test]
    fn snapshot_is_detached_from_live_buffer() {
        let mut acc = ChannelAccumulator::new();
        acc.append(&[1.0, 2.0]);
        let snapshot = acc.snapshot_from(0);

        acc.append(&[3.0]);
        acc.clear();

        assert_eq!(snapshot, vec![1.0, 2.0]);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut acc = ChannelAccumulator::new();
        acc.append(&[1.0, 2.0]);
        acc.clear();
        acc.clear();
        assert!(acc.is_empty());
    }

    #[test]
    fn drop_oldest_keeps_newest() {
        let mut acc = ChannelAccumulator::with_limit(4, OverflowPolicy::DropOldest);
        acc.append(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(acc.append(&[5.0, 6.0]), 2);

        assert_eq!(acc.len(), 4);
        assert_eq!(acc.drain(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn drop_oldest_with_oversized_append() {
        let mut acc = ChannelAccumulator::with_limit(3, OverflowPolicy::DropOldest);
        acc.append(&[9.0]);
        assert_eq!(acc.append(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);
        assert_eq!(acc.drain(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn reject_policy_reports_overflow() {
        let mut acc = ChannelAccumulator::with_limit(4, OverflowPolicy::Reject);
        acc.append(&[1.0, 2.0, 3.0]);

        assert!(!acc.would_overflow(1));
        assert!(acc.would_overflow(2));
        assert_eq!(acc.append(&[4.0, 5.0]), 1);
        assert_eq!(acc.drain(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn unbounded_never_overflows() {
        let mut acc = ChannelAccumulator::new();
        assert!(!acc.would_overflow(usize::MAX / 2));
        assert_eq!(acc.limit(), None);
    }
}
