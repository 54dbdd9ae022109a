//! Deterministic fingerprints for datasets and artefacts.

/// 64-bit FNV-1a hash used to tie a model artefact to the data it was trained on.
#[derive(Copy, Clone, Debug)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Create a new hash state with the FNV offset basis.
    pub fn new() -> Self {
        Self(0xcbf2_9ce4_8422_2325)
    }

    /// Feed bytes into the hash function.
    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3);
        }
    }

    /// Finalise the hash and return a 16-character lowercase hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    /// Hash a complete byte slice in one go.
    pub fn of(bytes: &[u8]) -> String {
        let mut hasher = Self::new();
        hasher.update(bytes);
        hasher.finish_hex()
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::new()
    }
}
