use anyhow::Context;

/// Cost used when `BCRYPT_COST` is not configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// bcrypt password hashing.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> anyhow::Result<String> {
        bcrypt::hash(password, self.cost).context("bcrypt hashing failed")
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
