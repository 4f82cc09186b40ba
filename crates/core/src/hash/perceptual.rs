//! Perceptual image hashing (spec.md §4.5): ahash, dhash, phash, each
//! producing a 64-bit fingerprint with bit 0 = most significant,
//! position (0,0). Built on the `image` crate, the same dependency the
//! teacher's `app`/`viewers` crates carry for image decode/resize; no
//! DCT crate appears anywhere in the retrieval pack, so `phash`'s 2-D
//! DCT is implemented directly from the textbook type-II formula.

use crate::error::Result;
use image::imageops::FilterType;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PHashResult {
    pub value: u64,
    pub method: String,
}

/// Contract for a perceptual-hash algorithm.
pub trait PerceptualHasher: Send + Sync {
    fn name(&self) -> &str;
    /// Compute a 64-bit fingerprint for the image at `path`, or `None`
    /// when the file is not a format `image` can decode.
    fn compute(&self, path: &Path) -> Result<Option<PHashResult>>;
}

fn decode_gray(path: &Path, width: u32, height: u32) -> Option<Vec<f64>> {
    let img = image::open(path).ok()?;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3);
    let gray = resized.to_luma8();
    Some(gray.pixels().map(|p| p[0] as f64).collect())
}

fn pack_bits(bits: impl Iterator<Item = bool>) -> u64 {
    let mut value: u64 = 0;
    for bit in bits {
        value <<= 1;
        if bit {
            value |= 1;
        }
    }
    value
}

pub struct AHasher;

impl PerceptualHasher for AHasher {
    fn name(&self) -> &str {
        "ahash"
    }

    fn compute(&self, path: &Path) -> Result<Option<PHashResult>> {
        let Some(pixels) = decode_gray(path, 8, 8) else {
            return Ok(None);
        };
        let mean: f64 = pixels.iter().sum::<f64>() / pixels.len() as f64;
        let value = pack_bits(pixels.iter().map(|&p| p >= mean));
        Ok(Some(PHashResult {
            value,
            method: self.name().to_string(),
        }))
    }
}

pub struct DHasher;

impl PerceptualHasher for DHasher {
    fn name(&self) -> &str {
        "dhash"
    }

    fn compute(&self, path: &Path) -> Result<Option<PHashResult>> {
        let Some(pixels) = decode_gray(path, 9, 8) else {
            return Ok(None);
        };
        // 9 columns x 8 rows, row-major: bit(row,col) = pixel[row,col] > pixel[row,col+1]
        let mut bits = Vec::with_capacity(64);
        for row in 0..8usize {
            for col in 0..8usize {
                let left = pixels[row * 9 + col];
                let right = pixels[row * 9 + col + 1];
                bits.push(left > right);
            }
        }
        let value = pack_bits(bits.into_iter());
        Ok(Some(PHashResult {
            value,
            method: self.name().to_string(),
        }))
    }
}

pub struct PHasher;

impl PerceptualHasher for PHasher {
    fn name(&self) -> &str {
        "phash"
    }

    fn compute(&self, path: &Path) -> Result<Option<PHashResult>> {
        let Some(pixels) = decode_gray(path, 32, 32) else {
            return Ok(None);
        };
        let dct = dct_2d(&pixels, 32);

        // Top-left 8x8 block, excluding the DC term at (0,0).
        let mut block = Vec::with_capacity(63);
        for row in 0..8usize {
            for col in 0..8usize {
                if row == 0 && col == 0 {
                    continue;
                }
                block.push(dct[row * 32 + col]);
            }
        }
        let median = median_of(&block);

        let mut bits = Vec::with_capacity(64);
        for row in 0..8usize {
            for col in 0..8usize {
                bits.push(dct[row * 32 + col] >= median);
            }
        }
        let value = pack_bits(bits.into_iter());
        Ok(Some(PHashResult {
            value,
            method: self.name().to_string(),
        }))
    }
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Separable 2-D type-II DCT of an `n x n` row-major matrix.
fn dct_2d(data: &[f64], n: usize) -> Vec<f64> {
    let rows = dct_rows(data, n);
    dct_columns(&rows, n)
}

fn dct_rows(data: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for row in 0..n {
        let src = &data[row * n..row * n + n];
        let dst = &mut out[row * n..row * n + n];
        dct_1d(src, dst, n);
    }
    out
}

fn dct_columns(data: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    let mut col_buf = vec![0.0; n];
    let mut col_out = vec![0.0; n];
    for col in 0..n {
        for row in 0..n {
            col_buf[row] = data[row * n + col];
        }
        dct_1d(&col_buf, &mut col_out, n);
        for row in 0..n {
            out[row * n + col] = col_out[row];
        }
    }
    out
}

fn dct_1d(src: &[f64], dst: &mut [f64], n: usize) {
    let nf = n as f64;
    for (u, out) in dst.iter_mut().enumerate().take(n) {
        let scale = if u == 0 {
            (1.0 / nf).sqrt()
        } else {
            (2.0 / nf).sqrt()
        };
        let mut sum = 0.0;
        for (x, &value) in src.iter().enumerate() {
            sum += value * (std::f64::consts::PI / nf * (x as f64 + 0.5) * u as f64).cos();
        }
        *out = scale * sum;
    }
}

/// Hamming distance between two 64-bit fingerprints.
pub fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_is_symmetric_and_zero_on_equal() {
        let a = 0x00ffu64;
        let b = 0x0f0fu64;
        assert_eq!(hamming(a, b), hamming(b, a));
        assert_eq!(hamming(a, a), 0);
    }

    #[test]
    fn dct_of_flat_image_has_zero_ac_terms() {
        let flat = vec![128.0; 8 * 8];
        let out = dct_2d(&flat, 8);
        // DC term nonzero, every other coefficient ~0 for a constant signal.
        assert!(out[0].abs() > 0.0);
        for &v in &out[1..] {
            assert!(v.abs() < 1e-6, "expected ~0, got {v}");
        }
    }

    #[test]
    fn median_of_handles_even_and_odd_lengths() {
        assert_eq!(median_of(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median_of(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }
}
