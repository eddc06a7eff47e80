//! OS-backed secure random source.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use rand::rngs::OsRng;

/// Fills `buf` from the operating system CSPRNG.
///
/// Unlike `RngCore::fill_bytes`, a missing or failing entropy source is
/// reported as [`CryptoError::Unavailable`] instead of panicking.
pub fn fill_secure(buf: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::Unavailable(e.to_string()))
}

/// Returns `N` fresh random bytes.
pub fn random_array<const N: usize>() -> CryptoResult<[u8; N]> {
    let mut out = [0u8; N];
    fill_secure(&mut out)?;
    Ok(out)
}
