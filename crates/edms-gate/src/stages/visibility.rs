use crate::error::GateError;
use crate::stage::{AccessRequest, AccessStage, DenialKind, GateContext, StageDecision};

/// Hides locked, hidden objects from everyone but the lock holder and
/// participants acting for the owning domain.
///
/// Applies to reads only; writes against a locked object are handled by
/// [`crate::LockStage`].
pub struct VisibilityStage;

impl AccessStage for VisibilityStage {
    fn name(&self) -> &str {
        "visibility"
    }

    fn evaluate(
        &self,
        request: &AccessRequest,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if request.operation.is_write() || !request.hidden {
            return Ok(StageDecision::Pass);
        }
        let holds_owner = request
            .owner
            .as_ref()
            .is_some_and(|domain| context.actor.holds_domain(domain));
        match request.locked_by {
            Some(holder) if holder != context.actor.person && !holds_owner => Ok(StageDecision::deny(
                DenialKind::Hidden,
                format!("{} {} is hidden", request.class_kind, request.target),
            )),
            _ => Ok(StageDecision::Pass),
        }
    }
}
