//! Fail-closed credential resolution for the `LLMService` node type
//! (spec §9c).
//!
//! `apps/shared/shared/services/llm_service.py` has two call sites that
//! resolve a model's credential: the gateway's permissive variant (falls
//! back to any credential the user owns) and workflow_engine's variant
//! (joins through the model's verification row, fails closed). Only the
//! latter has a spec-named counterpart (§4.1's node execution path); the
//! gateway's CRUD surface is a Non-goal per spec §1, so this crate
//! implements only the fail-closed join.

use moduly_core::ModelId;
use moduly_error::Error;

use crate::verification::VerificationRepo;

/// Resolve the credential id verified for `model_id`, or a
/// [`Error::ProviderAuth`] if no verified row exists.
///
/// This is deliberately the entire resolution rule: there is no
/// secondary fallback to an unverified or merely-owned credential. A
/// verification row disappearing (revoked, expired, never created) must
/// surface as an auth failure rather than silently substituting a
/// different credential.
///
/// # Errors
///
/// Returns [`Error::ProviderAuth`] if `model_id` has no verified
/// credential on record.
pub async fn resolve_credential(
    repo: &dyn VerificationRepo,
    model_id: ModelId,
) -> Result<moduly_core::CredentialId, Error> {
    repo.find_verified(model_id)
        .await
        .map(|verification| verification.credential_id)
        .ok_or_else(|| {
            Error::ProviderAuth(format!("model {model_id} has no verified credential"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::ModelVerification;
    use async_trait::async_trait;
    use moduly_core::CredentialId;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct FakeRepo(Mutex<HashMap<ModelId, ModelVerification>>);

    #[async_trait]
    impl VerificationRepo for FakeRepo {
        async fn find_verified(&self, model_id: ModelId) -> Option<ModelVerification> {
            self.0.lock().await.get(&model_id).cloned()
        }
    }

    #[tokio::test]
    async fn resolves_to_verified_credential() {
        let model_id = ModelId::v4();
        let credential_id = CredentialId::v4();
        let mut map = HashMap::new();
        map.insert(
            model_id,
            ModelVerification {
                model_id,
                credential_id,
            },
        );
        let repo = FakeRepo(Mutex::new(map));
        let resolved = resolve_credential(&repo, model_id).await.unwrap();
        assert_eq!(resolved, credential_id);
    }

    #[tokio::test]
    async fn fails_closed_when_unverified() {
        let repo = FakeRepo(Mutex::new(HashMap::new()));
        let err = resolve_credential(&repo, ModelId::v4()).await.unwrap_err();
        assert!(matches!(err, Error::ProviderAuth(_)));
    }
}
