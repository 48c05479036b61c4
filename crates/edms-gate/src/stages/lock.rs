use crate::error::GateError;
use crate::stage::{AccessRequest, AccessStage, DenialKind, GateContext, StageDecision};

/// Refuses writes to an object locked by someone other than the actor.
///
/// For a create the request carries the container's lock.
pub struct LockStage;

impl AccessStage for LockStage {
    fn name(&self) -> &str {
        "lock"
    }

    fn evaluate(
        &self,
        request: &AccessRequest,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if !request.operation.is_write() {
            return Ok(StageDecision::Pass);
        }
        match request.locked_by {
            Some(holder) if holder != context.actor.person => Ok(StageDecision::deny(
                DenialKind::Locked,
                format!(
                    "{} {} is locked by {holder}",
                    request.class_kind, request.target
                ),
            )),
            _ => Ok(StageDecision::Pass),
        }
    }
}
