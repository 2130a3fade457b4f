//! Window name to resource key derivation.
//!
//! The key is the only discovery mechanism: any process that hashes the same
//! name reaches the same segment and semaphore. It must therefore be stable
//! across processes, builds and restarts, which rules out `DefaultHasher`.

use sha2::{Digest, Sha256};

/// Derive the 64-bit resource key for a window name.
///
/// The key is the first 8 bytes of SHA-256(name), read little-endian.
pub fn derive_key(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Narrow a resource key to a SysV IPC key.
///
/// SysV keys are 32 bits wide, so only the low half is used. A zero key would
/// be `IPC_PRIVATE` and never shared, so it is moved to 1.
pub fn ipc_key(key: u64) -> libc::key_t {
    match key as u32 {
        0 => 1,
        low => low as libc::key_t,
    }
}
