use edms_types::PartitionKind;

use crate::error::GateError;
use crate::stage::{AccessRequest, AccessStage, DenialKind, GateContext, StageDecision};

/// Checks the actor's per-class access right.
///
/// Site directory data is readable by every authenticated person and
/// writable by site administrators. Model data requires participation;
/// under `MODIFY_IF_OWNER` a write to an owned object requires the actor to
/// act for the owning domain, while unowned objects are writable.
pub struct PermissionStage;

impl AccessStage for PermissionStage {
    fn name(&self) -> &str {
        "permission"
    }

    fn evaluate(
        &self,
        request: &AccessRequest,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let actor = context.actor;
        if request.partition == PartitionKind::SiteDirectory {
            if !request.operation.is_write() || actor.is_site_admin {
                return Ok(StageDecision::Pass);
            }
            return Ok(StageDecision::deny(
                DenialKind::Unauthorized,
                format!("only site administrators may write {}", request.class_kind),
            ));
        }

        let Some(right) = context.access_right(request.class_kind) else {
            return Ok(StageDecision::deny(
                DenialKind::Unauthorized,
                format!("person {} does not participate in this model", actor.person),
            ));
        };

        let allowed = if request.operation.is_write() {
            let is_owner = request
                .owner
                .as_ref()
                .map_or(true, |domain| actor.holds_domain(domain));
            right.can_write(is_owner)
        } else {
            right.can_read()
        };

        if allowed {
            Ok(StageDecision::Pass)
        } else {
            Ok(StageDecision::deny(
                DenialKind::Unauthorized,
                format!(
                    "{right} does not permit {:?} on {} {}",
                    request.operation, request.class_kind, request.target
                ),
            ))
        }
    }
}
