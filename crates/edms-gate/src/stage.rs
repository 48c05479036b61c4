use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use edms_types::{AccessRight, ClassKind, Iid, PartitionKind};

use crate::error::GateError;

// ---------------------------------------------------------------------------
// Operation / AccessRequest
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// Everything the pipeline needs to know about the object being accessed.
///
/// For a create, `target` is the new Thing and the ownership and lock fields
/// describe it as it will be once inserted under its container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessRequest {
    pub operation: Operation,
    pub partition: PartitionKind,
    pub class_kind: ClassKind,
    pub target: Iid,
    /// Nearest owning domain up the containment chain.
    pub owner: Option<Iid>,
    /// `isHidden` together with a lock.
    pub hidden: bool,
    pub locked_by: Option<Iid>,
    /// The enclosing iteration's setup has `frozenOn` set.
    pub iteration_frozen: bool,
}

impl AccessRequest {
    /// A request on an unowned, unlocked object of an unfrozen model.
    pub fn new(operation: Operation, class_kind: ClassKind, target: Iid) -> Self {
        Self {
            operation,
            partition: class_kind.partition(),
            class_kind,
            target,
            owner: None,
            hidden: false,
            locked_by: None,
            iteration_frozen: false,
        }
    }

    pub fn owned_by(mut self, owner: Option<Iid>) -> Self {
        self.owner = owner;
        self
    }

    pub fn locked_by(mut self, person: Option<Iid>) -> Self {
        self.locked_by = person;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn frozen(mut self, frozen: bool) -> Self {
        self.iteration_frozen = frozen;
        self
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// An actor's membership in one engineering model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Participation {
    /// Domains the participant acts for.
    pub domains: Vec<Iid>,
    /// Per-class grants; missing classes fall back to the configured default.
    pub permissions: BTreeMap<ClassKind, AccessRight>,
}

/// The authenticated person performing a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub person: Iid,
    pub is_site_admin: bool,
    /// `None` when the person does not participate in the model addressed.
    pub participation: Option<Participation>,
}

impl Actor {
    pub fn new(person: Iid) -> Self {
        Self {
            person,
            is_site_admin: false,
            participation: None,
        }
    }

    pub fn site_admin(mut self) -> Self {
        self.is_site_admin = true;
        self
    }

    pub fn participating(mut self, participation: Participation) -> Self {
        self.participation = Some(participation);
        self
    }

    /// Whether the actor acts for `domain` in the current model.
    pub fn holds_domain(&self, domain: &Iid) -> bool {
        self.participation
            .as_ref()
            .is_some_and(|p| p.domains.contains(domain))
    }
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DenialKind {
    FrozenIteration,
    Hidden,
    Locked,
    Unauthorized,
}

/// The outcome of a single stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage refused the request.
    Deny { kind: DenialKind, reason: String },
}

impl StageDecision {
    pub fn deny(kind: DenialKind, reason: impl Into<String>) -> Self {
        Self::Deny {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    pub reason: Option<String>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Contextual information available to every stage.
pub struct GateContext<'a> {
    pub actor: &'a Actor,
    /// Right assumed for classes without an explicit grant.
    pub default_access_right: AccessRight,
    /// Results from stages that have already run in this evaluation.
    pub previous_stages: Vec<StageResult>,
}

impl GateContext<'_> {
    /// The actor's grant for `class_kind`, `None` for non-participants.
    pub fn access_right(&self, class_kind: ClassKind) -> Option<AccessRight> {
        self.actor.participation.as_ref().map(|p| {
            p.permissions
                .get(&class_kind)
                .copied()
                .unwrap_or(self.default_access_right)
        })
    }
}

// ---------------------------------------------------------------------------
// AccessStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the access pipeline.
///
/// The trait is object-safe and `Send + Sync` so stages can be stored in
/// a `Vec<Box<dyn AccessStage>>`.
pub trait AccessStage: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        request: &AccessRequest,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError>;
}
