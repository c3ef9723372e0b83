//! Request context for a credential resolution call, carried through for
//! audit logging (spec §7: errors should be attributable to a tenant and
//! user, not just a bare message).

use moduly_core::{ScopeLevel, UserId};

/// Who is asking for a credential to be resolved, and within what scope.
#[derive(Debug, Clone)]
pub struct CredentialContext {
    /// The user whose workflow run is requesting the credential.
    pub owner_id: UserId,
    /// The tenant/global scope the credential must be visible in.
    pub scope: ScopeLevel,
}

impl CredentialContext {
    /// Build a context for a given owner and scope.
    #[must_use]
    pub fn new(owner_id: UserId, scope: ScopeLevel) -> Self {
        Self { owner_id, scope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_global_context() {
        let ctx = CredentialContext::new(UserId::v4(), ScopeLevel::Global);
        assert_eq!(ctx.scope, ScopeLevel::Global);
    }
}
