//! Retained sample index for key-frame replay.

use crate::demux::EncodedSample;

/// Every sample seen so far, in decode order, with a presentation-order view
/// and a key-frame index on top.
#[derive(Debug, Default)]
pub struct SampleIndex {
    samples: Vec<EncodedSample>,
    /// Decode indices sorted by presentation timestamp.
    presentation: Vec<usize>,
    /// Decode indices of key frames.
    key_frames: Vec<usize>,
    /// Most negative `pts - dts` seen; bounds how early a later sample can present.
    min_composition_offset: i64,
    end_pts: i64,
}

impl SampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: EncodedSample) {
        let index = self.samples.len();
        let pts = sample.presentation_timestamp;
        let position = self
            .presentation
            .partition_point(|&i| self.samples[i].presentation_timestamp <= pts);
        self.presentation.insert(position, index);
        if sample.is_key_frame {
            self.key_frames.push(index);
        }
        self.min_composition_offset = self
            .min_composition_offset
            .min(pts - sample.decode_timestamp);
        self.end_pts = self.end_pts.max(pts + sample.duration as i64);
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EncodedSample> {
        self.samples.get(index)
    }

    pub fn pts(&self, index: usize) -> Option<i64> {
        self.samples.get(index).map(|s| s.presentation_timestamp)
    }

    pub fn key_frame_count(&self) -> usize {
        self.key_frames.len()
    }

    /// Key frame presentation timestamps in order.
    pub fn key_frame_times(&self) -> Vec<i64> {
        let mut times: Vec<i64> = self
            .key_frames
            .iter()
            .map(|&i| self.samples[i].presentation_timestamp)
            .collect();
        times.sort_unstable();
        times
    }

    /// End of the last presented sample, in ticks.
    pub fn end_pts(&self) -> i64 {
        self.end_pts
    }

    /// Decode index of the earliest-presented sample with pts >= `ticks`.
    pub fn first_at_or_after(&self, ticks: i64) -> Option<usize> {
        let position = self
            .presentation
            .partition_point(|&i| self.samples[i].presentation_timestamp < ticks);
        self.presentation.get(position).copied()
    }

    /// Decode index of the latest-presented sample with pts < `ticks`.
    pub fn presentation_before(&self, ticks: i64) -> Option<usize> {
        let position = self
            .presentation
            .partition_point(|&i| self.samples[i].presentation_timestamp < ticks);
        position
            .checked_sub(1)
            .and_then(|p| self.presentation.get(p).copied())
    }

    /// Decode index of the `n`-th sample in presentation order.
    pub fn nth_presentation(&self, n: usize) -> Option<usize> {
        self.presentation.get(n).copied()
    }

    /// Decode index of the key frame replay must start from to reach
    /// `target`: the nearest key frame at or before it in decode order.
    pub fn key_frame_for(&self, target: usize) -> Option<usize> {
        if target >= self.samples.len() {
            return None;
        }
        let candidates = self.key_frames.partition_point(|&index| index <= target);
        candidates.checked_sub(1).map(|c| self.key_frames[c])
    }

    /// Smallest pts above `watermark` among samples from `cursor` on.
    pub fn min_undecoded_pts(&self, cursor: usize, watermark: Option<i64>) -> Option<i64> {
        let mut best: Option<i64> = None;
        for sample in self.samples.iter().skip(cursor) {
            if let Some(b) = best {
                // Decode times only grow, so nothing later can present earlier.
                if sample.decode_timestamp + self.min_composition_offset > b {
                    break;
                }
            }
            let pts = sample.presentation_timestamp;
            if watermark.is_some_and(|w| pts <= w) {
                continue;
            }
            best = Some(best.map_or(pts, |b| b.min(pts)));
        }
        best
    }

    /// Whether samples not yet indexed are known to present after `ticks`.
    pub fn covers(&self, ticks: i64) -> bool {
        self.samples
            .last()
            .is_some_and(|last| last.decode_timestamp + self.min_composition_offset > ticks)
    }
}
