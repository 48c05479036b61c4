use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{
    AccessRequest, AccessStage, Actor, DenialKind, GateContext, StageDecision, StageResult,
};
use crate::stages::{FrozenIterationStage, LockStage, PermissionStage, VisibilityStage};

// ---------------------------------------------------------------------------
// AccessResult
// ---------------------------------------------------------------------------

/// The outcome of running a request through the full pipeline.
#[derive(Clone, Debug)]
pub struct AccessResult {
    /// The first denial, or `Pass`.
    pub decision: StageDecision,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the pipeline evaluation.
    pub elapsed: Duration,
}

impl AccessResult {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_pass()
    }

    /// The denial kind and reason, if the request was refused.
    pub fn denial(&self) -> Option<(DenialKind, &str)> {
        match &self.decision {
            StageDecision::Pass => None,
            StageDecision::Deny { kind, reason } => Some((*kind, reason.as_str())),
        }
    }
}

// ---------------------------------------------------------------------------
// AccessGate
// ---------------------------------------------------------------------------

/// A configurable pipeline of stages that every read and write passes
/// through before it touches a partition.
pub struct AccessGate {
    stages: Vec<Box<dyn AccessStage>>,
    config: GateConfig,
}

impl AccessGate {
    /// Create a gate with an empty pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the default stage pipeline:
    /// FrozenIteration -> Visibility -> Lock -> Permission
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(FrozenIterationStage));
        gate.add_stage(Box::new(VisibilityStage));
        gate.add_stage(Box::new(LockStage));
        gate.add_stage(Box::new(PermissionStage));
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn AccessStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate a request through the full pipeline.
    ///
    /// The pipeline is **fail-fast**: the first stage that denies stops
    /// evaluation.
    pub fn evaluate(&self, actor: &Actor, request: &AccessRequest) -> Result<AccessResult, GateError> {
        let pipeline_start = Instant::now();

        if self.config.permissive {
            return Ok(AccessResult {
                decision: StageDecision::Pass,
                stage_results: Vec::new(),
                elapsed: pipeline_start.elapsed(),
            });
        }

        let mut context = GateContext {
            actor,
            default_access_right: self.config.default_access_right,
            previous_stages: Vec::with_capacity(self.stages.len()),
        };

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(request, &context)?;
            let reason = match &decision {
                StageDecision::Pass => None,
                StageDecision::Deny { reason, .. } => Some(reason.clone()),
            };
            context.previous_stages.push(StageResult {
                stage_name: stage.name().to_string(),
                passed: reason.is_none(),
                reason,
                elapsed: stage_start.elapsed(),
            });

            if !decision.is_pass() {
                debug!(
                    stage = stage.name(),
                    target = %request.target,
                    person = %actor.person,
                    "access denied"
                );
                return Ok(AccessResult {
                    decision,
                    stage_results: context.previous_stages,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(AccessResult {
            decision: StageDecision::Pass,
            stage_results: context.previous_stages,
            elapsed: pipeline_start.elapsed(),
        })
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("stage_count", &self.stages.len())
            .field("config", &self.config)
            .finish()
    }
}
