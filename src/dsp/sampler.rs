//! Sample buffers and one-shot sample playback.
//!
//! A [`SampleBuffer`] holds decoded audio as planar f32 channels at its
//! native rate. [`SamplePlayback`] reads one buffer for one hap: linear
//! interpolation at a playback rate, gain, and short fades at both ends
//! so hard sample edges never click.

/// Decoded mono or stereo audio at its native sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// One vector per channel, all the same length.
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build from planar channels. Extra channels beyond the shortest
    /// length are truncated so every channel has the same length.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in channels.iter_mut() {
            ch.truncate(len);
        }
        SampleBuffer {
            channels,
            sample_rate,
        }
    }

    pub fn mono(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer::new(vec![data], sample_rate)
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer::new(vec![left, right], sample_rate)
    }

    /// Split interleaved samples into planar channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        SampleBuffer::new(channels, sample_rate)
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Duration in seconds at the native rate.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value across channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flatten()
            .fold(0.0_f32, |m, &s| m.max(s.abs()))
    }

    /// Read one channel at a fractional frame position. Past the last
    /// frame the final sample is held; before zero or past the end it is 0.
    pub fn read_interpolated(&self, channel: usize, position: f64) -> f32 {
        let data = &self.channels[channel];
        if data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= data.len() {
            return 0.0;
        }
        let s0 = data[idx];
        let s1 = data.get(idx + 1).copied().unwrap_or(s0);
        let frac = (position - idx as f64) as f32;
        s0 + frac * (s1 - s0)
    }
}

/// Fade lengths at the edges of a sample playback, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fades {
    pub fade_in: f64,
    pub fade_out: f64,
}

impl Fades {
    /// Scale both fades down proportionally so they never overlap within
    /// `duration`.
    pub fn fit(self, duration: f64) -> Fades {
        let total = self.fade_in + self.fade_out;
        if total <= duration || total <= 0.0 {
            return self;
        }
        let scale = (duration / total).max(0.0);
        Fades {
            fade_in: self.fade_in * scale,
            fade_out: self.fade_out * scale,
        }
    }

    /// Linear fade gain at `t` seconds into a playback lasting `duration`.
    pub fn gain_at(&self, t: f64, duration: f64) -> f64 {
        let mut g = 1.0;
        if self.fade_in > 0.0 && t < self.fade_in {
            g *= t / self.fade_in;
        }
        let to_end = duration - t;
        if self.fade_out > 0.0 && to_end < self.fade_out {
            g *= (to_end / self.fade_out).max(0.0);
        }
        g
    }
}

/// One hap's worth of sample playback.
#[derive(Debug, Clone)]
pub struct SamplePlayback<'a> {
    buffer: &'a SampleBuffer,
    /// Source frames advanced per output second.
    frames_per_sec: f64,
    /// Playback length in seconds.
    duration: f64,
    fades: Fades,
}

impl<'a> SamplePlayback<'a> {
    /// Plan a playback of `buffer` at `rate` (1.0 = native speed).
    ///
    /// With `ring` set the sample plays to its natural end; otherwise it
    /// stops at `hap_duration` or the natural end, whichever is sooner.
    pub fn new(
        buffer: &'a SampleBuffer,
        rate: f64,
        hap_duration: f64,
        ring: bool,
        fades: Fades,
    ) -> Self {
        let frames_per_sec = buffer.sample_rate() as f64 * rate;
        let natural = if frames_per_sec > 0.0 {
            buffer.len() as f64 / frames_per_sec
        } else {
            0.0
        };
        let duration = if ring {
            natural
        } else {
            natural.min(hap_duration.max(0.0))
        };
        SamplePlayback {
            buffer,
            frames_per_sec,
            duration,
            fades: fades.fit(duration),
        }
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of output frames at `output_rate`.
    pub fn frames(&self, output_rate: u32) -> usize {
        (self.duration * output_rate as f64).ceil() as usize
    }

    /// Left/right source signal at `t` seconds after the onset, faded but
    /// not yet gained or panned. `None` once the source is exhausted.
    pub fn frame_at(&self, t: f64) -> Option<(f32, f32)> {
        let pos = t * self.frames_per_sec;
        if pos as usize >= self.buffer.len() {
            return None;
        }
        let fade = self.fades.gain_at(t, self.duration) as f32;
        let left = self.buffer.read_interpolated(0, pos);
        let right = if self.buffer.channel_count() > 1 {
            self.buffer.read_interpolated(1, pos)
        } else {
            left
        };
        Some((left * fade, right * fade))
    }
}
