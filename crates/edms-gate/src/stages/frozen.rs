use crate::error::GateError;
use crate::stage::{AccessRequest, AccessStage, DenialKind, GateContext, StageDecision};

/// Refuses every write into an iteration whose setup is frozen.
///
/// Reads of frozen iterations are always allowed.
pub struct FrozenIterationStage;

impl AccessStage for FrozenIterationStage {
    fn name(&self) -> &str {
        "frozen-iteration"
    }

    fn evaluate(
        &self,
        request: &AccessRequest,
        _context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if request.operation.is_write() && request.iteration_frozen {
            return Ok(StageDecision::deny(
                DenialKind::FrozenIteration,
                format!(
                    "{} {} belongs to a frozen iteration",
                    request.class_kind, request.target
                ),
            ));
        }
        Ok(StageDecision::Pass)
    }
}
