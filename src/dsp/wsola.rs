//! WSOLA (waveform-similarity overlap-add) time stretching.
//!
//! Hann-windowed grains are read from the input at an analysis hop and
//! written to the output at a fixed synthesis hop. Each grain's read
//! position is nudged within a tolerance to best line up with what is
//! already in the output, which keeps periodic material phase-coherent.

use std::f64::consts::PI;

/// Grain length in seconds.
pub const GRAIN_SECS: f64 = 0.08;

/// Output positions whose accumulated window weight is at or below this are
/// left unnormalized.
const WEIGHT_FLOOR: f32 = 0.001;

/// Grain and hop sizes for one stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsolaParams {
    pub grain: usize,
    pub synthesis_hop: usize,
    pub analysis_hop: usize,
    pub tolerance: usize,
}

impl WsolaParams {
    /// Parameters for stretching `input_len` samples to `target_len`.
    pub fn new(input_len: usize, target_len: usize, sample_rate: u32) -> Self {
        let grain = ((sample_rate as f64 * GRAIN_SECS).round() as usize).max(4);
        let synthesis_hop = ((grain as f64 / 4.0).round() as usize).max(1);
        let stretch = target_len as f64 / input_len.max(1) as f64;
        let analysis_hop = ((synthesis_hop as f64 / stretch).round() as usize).max(1);
        let tolerance = (grain as f64 / 4.0).round() as usize;
        WsolaParams {
            grain,
            synthesis_hop,
            analysis_hop,
            tolerance,
        }
    }
}

fn hann(len: usize) -> Vec<f32> {
    let denom = (len - 1) as f64;
    (0..len)
        .map(|i| (0.5 * (1.0 - (2.0 * PI * i as f64 / denom).cos())) as f32)
        .collect()
}

/// Stretch `input` to exactly `target_len` samples without changing pitch.
///
/// The overlap-add output is divided by the summed window weight, so a
/// steady input keeps its level all the way to the buffer edges.
/// Empty input yields silence; a length difference under two samples is a
/// plain truncate or zero-pad.
pub fn wsola_stretch(input: &[f32], target_len: usize, sample_rate: u32) -> Vec<f32> {
    if input.is_empty() {
        return vec![0.0; target_len];
    }
    if input.len().abs_diff(target_len) < 2 {
        let mut out = vec![0.0; target_len];
        let n = input.len().min(target_len);
        out[..n].copy_from_slice(&input[..n]);
        return out;
    }

    let params = WsolaParams::new(input.len(), target_len, sample_rate);
    let grain = params.grain;
    let hop = params.synthesis_hop;
    let tol = params.tolerance as isize;
    let window = hann(grain);
    let in_len = input.len() as isize;

    let mut output = vec![0.0_f32; target_len];
    let mut weight = vec![0.0_f32; target_len];
    let mut read_pos: isize = 0;
    let mut write_pos = 0;

    while write_pos < target_len {
        let mut best_offset = 0;
        if write_pos >= hop {
            let min_off = (-tol).max(-read_pos);
            let max_off = tol.min(in_len - read_pos - grain as isize);
            let prev_start = write_pos - hop;
            let check_len = hop.min(grain);
            let mut best_corr = f64::NEG_INFINITY;

            for off in min_off..=max_off {
                let start = read_pos + off;
                let mut corr = 0.0_f64;
                for j in 0..check_len {
                    let in_idx = start + j as isize;
                    let out_idx = prev_start + j;
                    if in_idx < 0 || in_idx >= in_len || out_idx >= target_len {
                        continue;
                    }
                    let w = weight[out_idx];
                    if w > WEIGHT_FLOOR {
                        corr += input[in_idx as usize] as f64 * (output[out_idx] / w) as f64;
                    }
                }
                if corr > best_corr {
                    best_corr = corr;
                    best_offset = off;
                }
            }
        }

        let actual_read = read_pos + best_offset;
        for (i, &w) in window.iter().enumerate() {
            let wi = write_pos + i;
            if wi >= target_len {
                break;
            }
            let idx = actual_read + i as isize;
            let sample = if idx >= 0 && idx < in_len {
                input[idx as usize]
            } else {
                0.0
            };
            output[wi] += sample * w;
            weight[wi] += w;
        }

        read_pos += params.analysis_hop as isize;
        write_pos += hop;
    }

    for (out, &w) in output.iter_mut().zip(&weight) {
        if w > WEIGHT_FLOOR {
            *out /= w;
        }
    }
    output
}
