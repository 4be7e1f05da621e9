//! Perceptual image hashing
//!
//! Hash keys are 64-bit difference hashes (dHash) rendered as binary-digit
//! strings: decode, grayscale, resize to 9x8, then compare each pixel with
//! its right neighbor. The rendering must stay stable because the hashes
//! are persisted keys, not transient fingerprints.

use image::imageops::{self, FilterType};

/// Bits in a hash, and characters in its rendered form.
pub const DHASH_BITS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The fetched bytes are not a decodable image
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Compute the dHash of an encoded image.
///
/// Returns a string of exactly [`DHASH_BITS`] binary digits; bit `(x, y)`
/// is `1` when pixel `(x, y)` is darker than pixel `(x + 1, y)` in the
/// 9x8 grayscale reduction.
///
/// # Errors
///
/// [`HashError::Decode`] when the bytes are not a supported image format.
pub fn dhash(bytes: &[u8]) -> Result<String, HashError> {
    let gray = image::load_from_memory(bytes)?.to_luma8();
    let small = imageops::resize(&gray, 9, 8, FilterType::Lanczos3);

    let mut out = String::with_capacity(DHASH_BITS);
    for y in 0..8 {
        for x in 0..8 {
            let left = small.get_pixel(x, y)[0];
            let right = small.get_pixel(x + 1, y)[0];
            out.push(if left < right { '1' } else { '0' });
        }
    }
    Ok(out)
}

/// Whether a string is a well-formed rendered dHash.
pub fn is_valid_dhash(hash: &str) -> bool {
    hash.len() == DHASH_BITS && hash.bytes().all(|b| b == b'0' || b == b'1')
}

/// Bit distance between two rendered hashes, or `None` when either is not
/// a well-formed hash.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if !is_valid_dhash(a) || !is_valid_dhash(b) {
        return None;
    }
    Some(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count() as u32)
}
