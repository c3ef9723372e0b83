//! Non-sensitive credential metadata (spec §9c's verification join needs
//! only enough of this to decide verified/unverified, not the teacher's
//! full rotation-tracking record).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping about a stored credential, independent of its secret
/// value.
///
/// Rotation policy, version history, and TTL tracking are the teacher's
/// rotation subsystem's concern (`crates/credential/src/rotation`), an
/// external collaborator this crate has no counterpart for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialMetadata {
    /// When the credential was stored.
    pub created_at: DateTime<Utc>,
    /// When the credential was last used to authenticate a call.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the owner's verification of this credential against the
    /// provider last succeeded, if ever.
    pub verified_at: Option<DateTime<Utc>>,
}

impl CredentialMetadata {
    /// A freshly created, unverified credential.
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            last_used_at: None,
            verified_at: None,
        }
    }

    /// Returns `true` if this credential has a recorded successful
    /// verification against its provider.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

impl Default for CredentialMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metadata_is_unverified() {
        assert!(!CredentialMetadata::new().is_verified());
    }

    #[test]
    fn verified_at_marks_it_verified() {
        let mut meta = CredentialMetadata::new();
        meta.verified_at = Some(Utc::now());
        assert!(meta.is_verified());
    }
}
