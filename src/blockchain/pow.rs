/// Difficulty used when nothing else is configured: three leading zero hex digits
pub const DEFAULT_DIFFICULTY: usize = 3;

/// A SHA-256 hex digest has 64 digits; more leading zeros can never be met
pub const MAX_DIFFICULTY: usize = 64;

/// A proof-of-work target, judged on the hex digest of a candidate block
pub trait ProofOfWork {
    fn is_satisfied_by(&self, hash: &str) -> bool;
}

/// Requires the hex digest to start with this many `'0'` characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingZeros(pub usize);

impl Default for LeadingZeros {
    fn default() -> Self {
        LeadingZeros(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork for LeadingZeros {
    fn is_satisfied_by(&self, hash: &str) -> bool {
        hash.len() >= self.0 && hash.bytes().take(self.0).all(|b| b == b'0')
    }
}

/// Finds the first nonce, counting up from zero, whose digest meets `target`.
///
/// `digest_for` hashes the candidate with a given nonce. The search is
/// unbounded and only returns early if hashing itself fails.
pub fn search_nonce<T, F, E>(target: &T, mut digest_for: F) -> Result<(u64, String), E>
where
    T: ProofOfWork + ?Sized,
    F: FnMut(u64) -> Result<String, E>,
{
    let mut nonce = 0u64;
    loop {
        let hash = digest_for(nonce)?;
        if target.is_satisfied_by(&hash) {
            return Ok((nonce, hash));
        }
        nonce = nonce.wrapping_add(1);
    }
}
