//! Turning per-frame scores into counts, block votes and time segments.

use serde::Serialize;

/// Frames whose score is strictly above `threshold`.
pub fn count_detections(scores: &[f64], threshold: f64) -> usize {
    scores.iter().filter(|&&score| score > threshold).count()
}

/// Result of voting over consecutive blocks of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct BlockVotes {
    pub blocks: usize,
    pub positive: usize,
}

/// Group scores into blocks of `block_frames`; a block is positive when its summed score
/// exceeds `threshold * len` (its mean exceeds the threshold). The last block may be short.
/// `block_frames == 0` disables voting.
pub fn block_votes(scores: &[f64], block_frames: usize, threshold: f64) -> BlockVotes {
    if block_frames == 0 {
        return BlockVotes::default();
    }
    let mut votes = BlockVotes::default();
    for block in scores.chunks(block_frames) {
        votes.blocks += 1;
        let sum: f64 = block.iter().sum();
        if sum > threshold * block.len() as f64 {
            votes.positive += 1;
        }
    }
    votes
}

/// A maximal run of frames scoring above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSegment {
    pub start_frame: usize,
    /// Exclusive.
    pub end_frame: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub peak_score: f64,
}

pub fn detection_segments(
    scores: &[f64],
    threshold: f64,
    frame_duration_seconds: f64,
) -> Vec<DetectionSegment> {
    let mut segments = Vec::new();
    let mut open: Option<(usize, f64)> = None;
    for (frame, &score) in scores.iter().enumerate() {
        if score > threshold {
            match open.as_mut() {
                Some((_, peak)) => *peak = peak.max(score),
                None => open = Some((frame, score)),
            }
        } else if let Some((start, peak)) = open.take() {
            segments.push(segment(start, frame, peak, frame_duration_seconds));
        }
    }
    if let Some((start, peak)) = open {
        segments.push(segment(start, scores.len(), peak, frame_duration_seconds));
    }
    segments
}

fn segment(start: usize, end: usize, peak: f64, frame_duration_seconds: f64) -> DetectionSegment {
    DetectionSegment {
        start_frame: start,
        end_frame: end,
        start_seconds: start as f64 * frame_duration_seconds,
        end_seconds: end as f64 * frame_duration_seconds,
        peak_score: peak,
    }
}

/// Everything derived from one signal's score sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub detections: usize,
    pub frames: usize,
    pub frame_duration_seconds: f64,
    pub threshold: f64,
    pub blocks: BlockVotes,
    pub segments: Vec<DetectionSegment>,
    #[serde(skip)]
    pub scores: Vec<f64>,
}

impl DetectionSummary {
    pub fn from_scores(
        scores: Vec<f64>,
        threshold: f64,
        frame_duration_seconds: f64,
        block_frames: usize,
    ) -> Self {
        Self {
            detections: count_detections(&scores, threshold),
            frames: scores.len(),
            frame_duration_seconds,
            threshold,
            blocks: block_votes(&scores, block_frames, threshold),
            segments: detection_segments(&scores, threshold, frame_duration_seconds),
            scores,
        }
    }

    /// Padded duration covered by the frames.
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 * self.frame_duration_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_uses_strict_comparison() {
        assert_eq!(count_detections(&[0.5, 0.51, 0.49, 0.9], 0.5), 2);
        assert_eq!(count_detections(&[], 0.5), 0);
    }

    #[test]
    fn blocks_vote_on_mean_score() {
        let scores = [0.9, 0.9, 0.0, 0.0, 0.6, 0.6, 0.6, 0.6, 0.7];
        let votes = block_votes(&scores, 4, 0.4);
        assert_eq!(votes, BlockVotes { blocks: 3, positive: 2 });
        assert_eq!(block_votes(&scores, 0, 0.4), BlockVotes::default());
    }

    #[test]
    fn segments_cover_runs_above_threshold() {
        let scores = [0.1, 0.8, 0.9, 0.2, 0.7, 0.6];
        let segments = detection_segments(&scores, 0.5, 0.032);
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_frame, segments[0].end_frame), (1, 3));
        assert_eq!(segments[0].peak_score, 0.9);
        assert!((segments[0].end_seconds - 0.096).abs() < 1e-12);
        assert_eq!((segments[1].start_frame, segments[1].end_frame), (4, 6));
        assert_eq!(segments[1].peak_score, 0.7);
    }

    #[test]
    fn summary_collects_every_view() {
        let summary = DetectionSummary::from_scores(vec![0.6, 0.7, 0.1, 0.2], 0.5, 0.5, 2);
        assert_eq!(summary.detections, 2);
        assert_eq!(summary.frames, 4);
        assert_eq!(summary.blocks, BlockVotes { blocks: 2, positive: 1 });
        assert_eq!(summary.segments.len(), 1);
        assert_eq!(summary.duration_seconds(), 2.0);
    }
}
