use tracing::{debug, info};

use super::diff::{DiffScore, FrameDiffer, LumaFrame};
use super::threshold::Threshold;
use crate::error::{Error, Result};
use crate::keyframes::{IndexBuilder, KeyframeIndex};

/// Result of a segmentation pass.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub index: KeyframeIndex,
    /// Score of each frame against the keyframe that was its anchor when it
    /// was classified. `None` for frame 0.
    pub anchor_scores: Vec<Option<DiffScore>>,
}

/// Splits a frame sequence into keyframe groups in a single forward pass.
///
/// Each frame is scored against the most recent keyframe rather than its
/// predecessor, so slow continuous drift eventually crosses the threshold
/// instead of hiding in small frame-to-frame steps.
pub struct KeyframeSegmenter {
    differ: FrameDiffer,
    threshold: Threshold,
    max_group_size: usize,
}

impl KeyframeSegmenter {
    /// A frame is promoted once its anchor already holds more than
    /// `max_group_size` children, so a group tops out at `max_group_size + 1`.
    pub fn new(differ: FrameDiffer, threshold: Threshold, max_group_size: usize) -> Self {
        Self {
            differ,
            threshold,
            max_group_size,
        }
    }

    /// Classify `frames`, which must be the whole sequence in order.
    pub fn segment(&self, frames: &[LumaFrame]) -> Result<Segmentation> {
        let Some((first, rest)) = frames.split_first() else {
            return Err(Error::InsufficientFrames(0));
        };

        let combined_threshold = self.threshold.combined();
        let mut builder = IndexBuilder::seed();
        let mut anchor = first;
        let mut anchor_scores = Vec::with_capacity(frames.len());
        anchor_scores.push(None);

        for (offset, frame) in rest.iter().enumerate() {
            let frame_index = offset + 1;
            let score = self.differ.diff(frame, anchor)?;
            let group_size = builder.anchor().children().len();

            let over_threshold = score.combined() > combined_threshold;
            let group_full = group_size > self.max_group_size;

            if over_threshold || group_full {
                let keyframe_index = builder.promote(frame_index);
                anchor = frame;
                debug!(
                    frame_index,
                    keyframe_index,
                    score = score.combined(),
                    over_threshold,
                    group_full,
                    "new keyframe"
                );
            } else {
                builder.attach(frame_index);
                debug!(
                    frame_index,
                    anchor = builder.anchor().frame_index(),
                    score = score.combined(),
                    "child frame"
                );
            }

            anchor_scores.push(Some(score));
        }

        let index = builder.finish();
        info!(
            frame_count = index.frame_count(),
            keyframe_count = index.len(),
            combined_threshold,
            max_group_size = self.max_group_size,
            "segmentation complete"
        );

        Ok(Segmentation {
            index,
            anchor_scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stats::SequenceStatistics;
    use image::{GrayImage, Luma};
    use tracing_test::traced_test;

    fn single_pixel_frames(values: &[u8]) -> Vec<LumaFrame> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| LumaFrame::new(i, GrayImage::from_pixel(1, 1, Luma([v]))))
            .collect()
    }

    /// Deterministic 4x4 frames with a mix of small jitter and large jumps.
    fn noisy_frames(count: usize, seed: u64) -> Vec<LumaFrame> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u32
        };
        let mut base = 128u8;
        (0..count)
            .map(|i| {
                if next() % 7 == 0 {
                    base = (next() % 256) as u8;
                }
                let pixels = (0..16)
                    .map(|_| base.saturating_add((next() % 12) as u8))
                    .collect();
                LumaFrame::new(i, GrayImage::from_raw(4, 4, pixels).unwrap())
            })
            .collect()
    }

    fn threshold(combined: f64) -> Threshold {
        Threshold {
            motion: combined,
            color: 0.0,
        }
    }

    fn keyframe_set(index: &KeyframeIndex) -> Vec<usize> {
        index.original_indices()
    }

    fn assert_invariants(index: &KeyframeIndex, frame_count: usize, max_group_size: usize) {
        let keyframes = index.keyframes();
        assert_eq!(keyframes[0].frame_index(), 0, "frame 0 must be the first keyframe");

        let mut covered = vec![0usize; frame_count];
        for (position, kf) in keyframes.iter().enumerate() {
            assert_eq!(kf.keyframe_index(), position);
            covered[kf.frame_index()] += 1;
            assert!(kf.children().len() <= max_group_size + 1);
            for pair in kf.children().windows(2) {
                assert!(pair[0] < pair[1], "children must be strictly increasing");
            }
            for &child in kf.children() {
                assert!(child > kf.frame_index(), "owner must precede its children");
                covered[child] += 1;
            }
            if let Some(next) = keyframes.get(position + 1) {
                assert!(kf.children().iter().all(|&c| c < next.frame_index()));
            }
        }
        assert!(covered.iter().all(|&n| n == 1), "coverage: {covered:?}");
    }

    #[test]
    #[traced_test]
    fn jump_relative_to_anchor_starts_new_group() {
        // Adjacent diffs are [10, 10, 100, 10]; against the anchor frame 2
        // returns to 0 and only frame 3 departs from it.
        let frames = single_pixel_frames(&[0, 10, 0, 100, 110]);
        let differ = FrameDiffer::new(1.0, 0.0);
        let stats = SequenceStatistics::compute(&frames, &differ).unwrap();
        let threshold = Threshold::compute(&stats, 0.5, 0.0).unwrap();
        assert_eq!(threshold.combined(), 11.25);

        let result = KeyframeSegmenter::new(differ, threshold, 10)
            .segment(&frames)
            .unwrap();

        assert_eq!(keyframe_set(&result.index), [0, 3]);
        assert_eq!(result.index.keyframes()[0].children(), [1, 2]);
        assert_eq!(result.index.keyframes()[1].children(), [4]);
        assert_eq!(result.anchor_scores[0], None);
        assert_eq!(result.anchor_scores[2].unwrap().motion, 0.0);
        assert_eq!(result.anchor_scores[3].unwrap().motion, 100.0);
        assert_eq!(result.anchor_scores[4].unwrap().motion, 10.0);
        assert!(logs_contain("new keyframe"));
        assert!(logs_contain("segmentation complete"));
    }

    #[test]
    fn slow_drift_accumulates_against_anchor() {
        // Every step is 5, below the threshold, but drift from the anchor is not.
        let frames = single_pixel_frames(&[0, 5, 10, 15, 20, 25, 30]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 0.0), threshold(12.0), 100)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0, 3, 6]);
    }

    #[test]
    fn score_equal_to_threshold_stays_child() {
        let frames = single_pixel_frames(&[0, 12, 13]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 0.0), threshold(12.0), 100)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0, 2]);
    }

    #[test]
    fn zero_threshold_makes_every_changed_frame_a_keyframe() {
        let frames = single_pixel_frames(&[0, 1, 2, 3, 4]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(0.0), 100)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0, 1, 2, 3, 4]);
    }

    #[test]
    fn identical_frames_tie_at_zero_threshold() {
        let frames = single_pixel_frames(&[7, 7, 7]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(0.0), 100)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0]);
        assert_eq!(result.index.keyframes()[0].children(), [1, 2]);
    }

    #[test]
    fn zero_group_size_still_takes_one_child() {
        // The anchor starts empty and 0 > 0 is false, so each keyframe keeps
        // exactly one child before the cap promotes the next frame.
        let frames = single_pixel_frames(&[9, 9, 9, 9, 9]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(1e9), 0)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0, 2, 4]);
        assert_eq!(result.index.keyframes()[0].children(), [1]);
        assert_eq!(result.index.keyframes()[1].children(), [3]);
        assert!(result.index.keyframes()[2].children().is_empty());
    }

    #[test]
    fn group_cap_splits_static_content() {
        let frames = single_pixel_frames(&[3; 10]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(1e9), 3)
            .segment(&frames)
            .unwrap();
        // Promotion happens when the anchor already holds more than 3 children.
        assert_eq!(keyframe_set(&result.index), [0, 5]);
        assert_eq!(result.index.keyframes()[0].children(), [1, 2, 3, 4]);
        assert_eq!(result.index.keyframes()[1].children(), [6, 7, 8, 9]);
        assert_invariants(&result.index, frames.len(), 3);
    }

    #[test]
    fn invariants_hold_on_noisy_sequences() {
        for seed in 1..20u64 {
            let frames = noisy_frames(60, seed);
            let differ = FrameDiffer::new(0.01, 1.0);
            let stats = SequenceStatistics::compute(&frames, &differ).unwrap();
            for (weight, cap) in [(0.0, 5), (0.3, 12), (0.9, 2), (1.0, 1)] {
                let threshold = Threshold::compute(&stats, weight, weight).unwrap();
                let result = KeyframeSegmenter::new(differ, threshold, cap)
                    .segment(&frames)
                    .unwrap();
                assert_eq!(result.index.frame_count(), frames.len());
                assert_eq!(result.anchor_scores.len(), frames.len());
                assert_invariants(&result.index, frames.len(), cap);

                let marked: Vec<usize> = result
                    .index
                    .classes()
                    .enumerate()
                    .filter(|(_, class)| class.is_keyframe())
                    .map(|(i, _)| i)
                    .collect();
                assert_eq!(marked, result.index.original_indices());
            }
        }
    }

    #[test]
    fn single_frame_is_its_own_keyframe() {
        let frames = single_pixel_frames(&[1]);
        let result = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(0.0), 4)
            .segment(&frames)
            .unwrap();
        assert_eq!(keyframe_set(&result.index), [0]);
        assert_eq!(result.index.frame_count(), 1);
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let err = KeyframeSegmenter::new(FrameDiffer::new(1.0, 1.0), threshold(0.0), 4)
            .segment(&[])
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFrames(0)), "got {err:?}");
    }
}
