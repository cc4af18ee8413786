//! Stereo chunk accumulator.

/// Left/right accumulators for one render window.
///
/// The first `frames` samples belong to the window. Contributions written
/// past the window end grow an overflow region, which the pipeline moves
/// into the next window with [`StereoChunk::split_tail`] and
/// [`StereoChunk::absorb`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoChunk {
    frames: usize,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoChunk {
    /// A silent window of `frames` frames.
    pub fn new(frames: usize) -> Self {
        StereoChunk {
            frames,
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Window length in frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Frames held past the window end.
    pub fn overflow_len(&self) -> usize {
        self.left.len().saturating_sub(self.frames)
    }

    /// Sum a stereo frame into position `frame`, growing the overflow when
    /// it lies past the window.
    pub fn add(&mut self, frame: usize, left: f32, right: f32) {
        if frame >= self.left.len() {
            self.left.resize(frame + 1, 0.0);
            self.right.resize(frame + 1, 0.0);
        }
        self.left[frame] += left;
        self.right[frame] += right;
    }

    pub fn left(&self) -> &[f32] {
        &self.left[..self.frames]
    }

    pub fn right(&self) -> &[f32] {
        &self.right[..self.frames]
    }

    /// Detach the overflow as its own chunk, leaving only the window.
    pub fn split_tail(&mut self) -> StereoChunk {
        let left = self.left.split_off(self.frames);
        let right = self.right.split_off(self.frames);
        StereoChunk {
            frames: left.len(),
            left,
            right,
        }
    }

    /// Sum `tail` into this chunk starting at frame 0.
    pub fn absorb(&mut self, tail: StereoChunk) {
        for (i, (l, r)) in tail.left.into_iter().zip(tail.right).enumerate() {
            self.add(i, l, r);
        }
    }

    /// Largest absolute sample inside the window.
    pub fn peak(&self) -> f32 {
        self.left()
            .iter()
            .chain(self.right())
            .fold(0.0_f32, |m, &s| m.max(s.abs()))
    }
}
