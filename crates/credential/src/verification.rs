//! The model verification record the fail-closed resolver joins through
//! (spec §9c, grounded on `apps/shared/shared/services/llm_service.py`'s
//! workflow_engine variant: "a model's credential must have a verified
//! row before it can be used, unverified or missing rows fail closed").

use async_trait::async_trait;
use moduly_core::{CredentialId, ModelId};

/// One verified pairing of a model with the credential that authenticates
/// calls to its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVerification {
    /// The model this verification applies to.
    pub model_id: ModelId,
    /// The credential verified against that model's provider.
    pub credential_id: CredentialId,
}

/// Looks up the verified credential for a model, if any.
///
/// A driver backs this with whatever table stores verification rows;
/// this crate only consumes the join, it never writes verification rows
/// itself (that's the gateway's credential-verification flow, a Non-goal
/// here per spec §1).
#[async_trait]
pub trait VerificationRepo: Send + Sync {
    /// Return the verified credential for `model_id`, or `None` if the
    /// model has never been successfully verified.
    async fn find_verified(&self, model_id: ModelId) -> Option<ModelVerification>;
}
