//! Orchestrator — drives one candidate through the stage state machine.
//!
//! States: Extraction → Analysis → Scoring → (Recommendation | Skipped) → Done,
//! with Halted (adaptive gate closed after a usable extraction) and Failed
//! (abort-on-failure stage failed) as the other terminals.
//!
//! Algorithm:
//! 1. Run a stage through `run_stage` (timeout + error-to-data boundary)
//! 2. Commit `data` of successful results into the context
//! 3. Pick the next state from the result and the `PipelinePolicy`
//! 4. Outcome confidence = min over stages that ran (failures count as 0);
//!    the synthesized below-threshold recommendation is not counted

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::llm_client::InferenceBackend;
use crate::pipeline::analysis::AnalysisStage;
use crate::pipeline::context::AgentContext;
use crate::pipeline::extraction::ExtractionStage;
use crate::pipeline::progress::{ProgressEvent, ProgressReporter};
use crate::pipeline::recommendation::{RecommendationOutput, RecommendationStage};
use crate::pipeline::scoring::{ScoringOutput, ScoringStage};
use crate::pipeline::stage::{run_stage, AgentResult, Stage, StageKind, StageSettings};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Fixed,
    Adaptive,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Fixed => "fixed",
            ExecutionMode::Adaptive => "adaptive",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(ExecutionMode::Fixed),
            "adaptive" => Ok(ExecutionMode::Adaptive),
            other => Err(format!("unknown pipeline mode '{other}' (expected fixed or adaptive)")),
        }
    }
}

/// Transition rules for one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePolicy {
    pub mode: ExecutionMode,
    /// Analysis runs only when extraction confidence is strictly above this value.
    pub analysis_gate: Option<f64>,
    /// Recommendation runs only when the overall score is at least this value.
    pub recommendation_threshold: f64,
    /// A failure of any of these stages ends the run as Failed.
    pub abort_on_failure: Vec<StageKind>,
    pub stage_timeout: Duration,
}

impl PipelinePolicy {
    pub fn fixed() -> Self {
        Self {
            mode: ExecutionMode::Fixed,
            analysis_gate: None,
            recommendation_threshold: 40.0,
            abort_on_failure: vec![StageKind::Scoring],
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn adaptive() -> Self {
        Self {
            mode: ExecutionMode::Adaptive,
            analysis_gate: Some(0.5),
            recommendation_threshold: 50.0,
            abort_on_failure: vec![StageKind::Scoring],
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn for_mode(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Fixed => Self::fixed(),
            ExecutionMode::Adaptive => Self::adaptive(),
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    fn aborts_on(&self, kind: StageKind) -> bool {
        self.abort_on_failure.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Extraction,
    Analysis,
    Scoring,
    Recommendation,
    Skipped,
    Halted,
    Failed,
    Done,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub mode: ExecutionMode,
    pub final_state: PipelineState,
    pub results: BTreeMap<StageKind, AgentResult>,
    pub skipped: Vec<StageKind>,
    pub confidence: f64,
    pub workflow_log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub context: AgentContext,
}

impl PipelineOutcome {
    /// Data a stage left in the context (real or synthesized).
    pub fn data(&self, kind: StageKind) -> Option<&Value> {
        self.context.previous(kind)
    }
}

/// The four stages an orchestrator drives.
#[derive(Clone)]
pub struct StageSet {
    pub extraction: Arc<dyn Stage>,
    pub analysis: Arc<dyn Stage>,
    pub scoring: Arc<dyn Stage>,
    pub recommendation: Arc<dyn Stage>,
}

impl StageSet {
    /// The LLM-backed stages sharing one backend.
    pub fn llm(backend: Arc<dyn InferenceBackend>, settings: StageSettings) -> Self {
        Self {
            extraction: Arc::new(ExtractionStage::new(backend.clone(), settings)),
            analysis: Arc::new(AnalysisStage::new(backend.clone(), settings)),
            scoring: Arc::new(ScoringStage::new(backend.clone(), settings)),
            recommendation: Arc::new(RecommendationStage::new(backend, settings)),
        }
    }

    pub fn get(&self, kind: StageKind) -> &Arc<dyn Stage> {
        match kind {
            StageKind::Extraction => &self.extraction,
            StageKind::Analysis => &self.analysis,
            StageKind::Scoring => &self.scoring,
            StageKind::Recommendation => &self.recommendation,
        }
    }
}

/// Progress percentages reported when a stage starts and when it finishes.
fn stage_progress(kind: StageKind) -> (u8, u8) {
    match kind {
        StageKind::Extraction => (5, 25),
        StageKind::Analysis => (30, 50),
        StageKind::Scoring => (55, 75),
        StageKind::Recommendation => (80, 90),
    }
}

/// Mutable bookkeeping for one run.
struct RunState {
    ctx: AgentContext,
    results: BTreeMap<StageKind, AgentResult>,
    skipped: Vec<StageKind>,
    log: Vec<String>,
    error: Option<String>,
}

pub struct Orchestrator {
    stages: StageSet,
    policy: PipelinePolicy,
}

impl Orchestrator {
    pub fn new(stages: StageSet, policy: PipelinePolicy) -> Self {
        Self { stages, policy }
    }

    pub fn policy(&self) -> &PipelinePolicy {
        &self.policy
    }

    /// Runs one candidate to a terminal state. Never returns an error: every
    /// failure is recorded in the outcome.
    pub async fn run(&self, ctx: AgentContext, progress: &dyn ProgressReporter) -> PipelineOutcome {
        let mut run = RunState {
            ctx,
            results: BTreeMap::new(),
            skipped: Vec::new(),
            log: Vec::new(),
            error: None,
        };
        run.log.push(format!("Pipeline started in {} mode", self.policy.mode.as_str()));

        let mut state = PipelineState::Extraction;
        loop {
            state = match state {
                PipelineState::Extraction => {
                    let result = self.invoke(StageKind::Extraction, &mut run, progress).await;
                    self.after_extraction(&result, &mut run)
                }
                PipelineState::Analysis => {
                    let result = self.invoke(StageKind::Analysis, &mut run, progress).await;
                    self.abort_or(StageKind::Analysis, &result, &mut run, PipelineState::Scoring)
                }
                PipelineState::Scoring => {
                    let result = self.invoke(StageKind::Scoring, &mut run, progress).await;
                    match self.abort_or(StageKind::Scoring, &result, &mut run, PipelineState::Recommendation) {
                        PipelineState::Failed => PipelineState::Failed,
                        _ => self.after_scoring(&run),
                    }
                }
                PipelineState::Recommendation => {
                    let result = self.invoke(StageKind::Recommendation, &mut run, progress).await;
                    self.abort_or(StageKind::Recommendation, &result, &mut run, PipelineState::Done)
                }
                PipelineState::Skipped => {
                    let score = overall_score(&run.ctx).unwrap_or(0.0);
                    let threshold = self.policy.recommendation_threshold;
                    let fallback = RecommendationOutput::below_threshold(score, threshold);
                    match serde_json::to_value(&fallback) {
                        Ok(data) => run.ctx.commit(StageKind::Recommendation, data),
                        Err(e) => warn!("Could not serialize below-threshold recommendation: {}", e),
                    }
                    run.skipped.push(StageKind::Recommendation);
                    run.log.push(format!(
                        "recommendation skipped: score {score:.1} below threshold {threshold:.0}"
                    ));
                    PipelineState::Done
                }
                PipelineState::Halted | PipelineState::Failed | PipelineState::Done => break,
            };
        }

        let confidence = run
            .results
            .values()
            .map(|r| r.confidence)
            .fold(None, |min: Option<f64>, c| Some(min.map_or(c, |m| m.min(c))))
            .unwrap_or(0.0);
        let success = state != PipelineState::Failed;

        let message = match state {
            PipelineState::Done => "Pipeline complete",
            PipelineState::Halted => "Pipeline halted after extraction",
            _ => "Pipeline failed",
        };
        progress.report(ProgressEvent::new(100, message, None));
        run.log.push(format!("{message} (confidence {confidence:.2})"));

        if success {
            info!("{} with confidence {:.2}", message, confidence);
        } else {
            error!(
                "{}: {}",
                message,
                run.error.as_deref().unwrap_or("unknown error")
            );
        }

        PipelineOutcome {
            success,
            mode: self.policy.mode,
            final_state: state,
            results: run.results,
            skipped: run.skipped,
            confidence,
            workflow_log: run.log,
            error: run.error,
            context: run.ctx,
        }
    }

    /// Runs the requested stages concurrently against one shared, read-only
    /// context. Results come back in request order; no stage sees another's output.
    pub async fn run_collaborative(
        &self,
        ctx: Arc<AgentContext>,
        kinds: &[StageKind],
    ) -> Vec<(StageKind, AgentResult)> {
        let mut set = JoinSet::new();
        for (idx, kind) in kinds.iter().copied().enumerate() {
            let stage = Arc::clone(self.stages.get(kind));
            let ctx = Arc::clone(&ctx);
            let timeout = self.policy.stage_timeout;
            set.spawn(async move { (idx, run_stage(stage.as_ref(), &ctx, timeout).await) });
        }

        let mut slots: Vec<Option<AgentResult>> = vec![None; kinds.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => error!("Collaborative stage task aborted: {}", e),
            }
        }

        kinds
            .iter()
            .copied()
            .zip(slots)
            .map(|(kind, slot)| {
                let result = slot.unwrap_or_else(|| {
                    AgentResult::failure(format!("{kind} task aborted before completing"))
                });
                (kind, result)
            })
            .collect()
    }

    async fn invoke(
        &self,
        kind: StageKind,
        run: &mut RunState,
        progress: &dyn ProgressReporter,
    ) -> AgentResult {
        let (start, end) = stage_progress(kind);
        progress.report(ProgressEvent::new(start, format!("Running {kind}"), Some(kind)));

        let stage = self.stages.get(kind);
        let result = run_stage(stage.as_ref(), &run.ctx, self.policy.stage_timeout).await;

        if result.success {
            run.ctx.commit(kind, result.data.clone());
            run.log.push(format!(
                "{kind} succeeded (confidence {:.2})",
                result.confidence
            ));
        } else {
            let reason = result.reasoning.as_deref().unwrap_or("no reason given");
            run.log.push(format!("{kind} failed: {reason}"));
        }

        progress.report(ProgressEvent::new(end, format!("Finished {kind}"), Some(kind)));
        run.results.insert(kind, result.clone());
        result
    }

    fn abort_or(
        &self,
        kind: StageKind,
        result: &AgentResult,
        run: &mut RunState,
        next: PipelineState,
    ) -> PipelineState {
        if !result.success && self.policy.aborts_on(kind) {
            let reason = result.reasoning.as_deref().unwrap_or("no reason given");
            run.error = Some(format!("{kind} stage failed: {reason}"));
            PipelineState::Failed
        } else {
            next
        }
    }

    fn after_extraction(&self, result: &AgentResult, run: &mut RunState) -> PipelineState {
        let next = self.abort_or(StageKind::Extraction, result, run, PipelineState::Analysis);
        if next == PipelineState::Failed {
            return next;
        }

        let Some(gate) = self.policy.analysis_gate else {
            return PipelineState::Analysis;
        };
        if result.confidence > gate {
            return PipelineState::Analysis;
        }

        if result.success {
            run.log.push(format!(
                "analysis gated: extraction confidence {:.2} not above {gate:.2}",
                result.confidence
            ));
            run.skipped.extend([
                StageKind::Analysis,
                StageKind::Scoring,
                StageKind::Recommendation,
            ]);
            PipelineState::Halted
        } else {
            let reason = result.reasoning.as_deref().unwrap_or("no reason given");
            run.error = Some(format!("extraction stage failed: {reason}"));
            PipelineState::Failed
        }
    }

    fn after_scoring(&self, run: &RunState) -> PipelineState {
        match overall_score(&run.ctx) {
            Some(score) if score >= self.policy.recommendation_threshold => {
                PipelineState::Recommendation
            }
            _ => PipelineState::Skipped,
        }
    }
}

fn overall_score(ctx: &AgentContext) -> Option<f64> {
    ctx.previous_as::<ScoringOutput>(StageKind::Scoring)
        .map(|s| s.overall_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::fixtures::react_template;
    use crate::pipeline::analysis::RecommendationTier;
    use crate::pipeline::progress::{ChannelProgress, NoopProgress};
    use crate::pipeline::scoring::ScoreBreakdown;
    use crate::pipeline::test_support::{
        analysis_reply, extraction_reply, recommendation_reply, scoring_reply, FakeBackend,
        Scripted,
    };
    use tokio::sync::mpsc;

    fn orchestrator(backend: FakeBackend, policy: PipelinePolicy) -> (Orchestrator, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        let stages = StageSet::llm(backend.clone(), StageSettings::default());
        (Orchestrator::new(stages, policy), backend)
    }

    fn happy_backend(score: f64) -> FakeBackend {
        FakeBackend::new()
            .with(StageKind::Extraction, extraction_reply(0.9))
            .with(StageKind::Analysis, analysis_reply(0.8))
            .with(StageKind::Scoring, scoring_reply(score))
            .with(StageKind::Recommendation, recommendation_reply(0.7))
    }

    fn ctx() -> AgentContext {
        AgentContext::new(
            "Jane Doe\nReact developer since 2019-01\nSkills: React",
            "Frontend engineer with React",
            Some(Arc::new(react_template())),
        )
    }

    #[tokio::test]
    async fn test_fixed_mode_runs_all_stages_above_threshold() {
        let (orch, backend) = orchestrator(happy_backend(80.0), PipelinePolicy::fixed());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(outcome.success);
        assert_eq!(outcome.final_state, PipelineState::Done);
        assert_eq!(backend.calls(), StageKind::ALL.to_vec());
        assert!(outcome.skipped.is_empty());
        assert!((outcome.confidence - 0.7).abs() < 1e-9);
        assert_eq!(outcome.results.len(), 4);
    }

    #[tokio::test]
    async fn test_score_below_threshold_skips_recommendation() {
        let (orch, backend) = orchestrator(happy_backend(35.0), PipelinePolicy::fixed());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(outcome.success);
        assert_eq!(outcome.final_state, PipelineState::Done);
        assert!(!backend.calls().contains(&StageKind::Recommendation));
        assert_eq!(outcome.skipped, vec![StageKind::Recommendation]);
        assert!(!outcome.results.contains_key(&StageKind::Recommendation));

        let recommendation: RecommendationOutput =
            serde_json::from_value(outcome.data(StageKind::Recommendation).unwrap().clone()).unwrap();
        assert_eq!(recommendation.recommendation, RecommendationTier::NotRecommended);
        assert!(!recommendation.next_steps.is_empty());
        // min(0.9, 0.8, 0.75): the synthesized recommendation is not counted
        assert!((outcome.confidence - 0.75).abs() < 1e-9);
        assert!(outcome
            .workflow_log
            .iter()
            .any(|line| line.contains("recommendation skipped")));
    }

    #[tokio::test]
    async fn test_score_exactly_at_threshold_recommends() {
        let breakdown = ScoreBreakdown {
            skill: 40.0,
            experience: 40.0,
            education: 40.0,
            cultural_fit: 40.0,
            additional_value: 40.0,
        };
        let policy = PipelinePolicy {
            recommendation_threshold: breakdown.overall(),
            ..PipelinePolicy::fixed()
        };
        let (orch, backend) = orchestrator(happy_backend(40.0), policy);
        let outcome = orch.run(ctx(), &NoopProgress).await;
        assert!(backend.calls().contains(&StageKind::Recommendation));
        assert!(outcome.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_adaptive_threshold_is_fifty() {
        let (orch, backend) = orchestrator(happy_backend(45.0), PipelinePolicy::adaptive());
        let outcome = orch.run(ctx(), &NoopProgress).await;
        assert!(outcome.success);
        assert!(!backend.calls().contains(&StageKind::Recommendation));
    }

    #[tokio::test]
    async fn test_adaptive_low_extraction_confidence_halts() {
        let backend = happy_backend(80.0).with(StageKind::Extraction, extraction_reply(0.4));
        let (orch, backend) = orchestrator(backend, PipelinePolicy::adaptive());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(outcome.success);
        assert_eq!(outcome.final_state, PipelineState::Halted);
        assert_eq!(backend.calls(), vec![StageKind::Extraction]);
        assert_eq!(
            outcome.skipped,
            vec![StageKind::Analysis, StageKind::Scoring, StageKind::Recommendation]
        );
        assert!((outcome.confidence - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_adaptive_gate_is_strict() {
        let backend = happy_backend(80.0).with(StageKind::Extraction, extraction_reply(0.5));
        let (orch, _) = orchestrator(backend, PipelinePolicy::adaptive());
        let outcome = orch.run(ctx(), &NoopProgress).await;
        assert_eq!(outcome.final_state, PipelineState::Halted);
    }

    #[tokio::test]
    async fn test_adaptive_failed_extraction_fails_pipeline() {
        let backend = happy_backend(80.0)
            .with(StageKind::Extraction, Scripted::Fail("overloaded".to_string()));
        let (orch, _) = orchestrator(backend, PipelinePolicy::adaptive());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(!outcome.success);
        assert_eq!(outcome.final_state, PipelineState::Failed);
        assert!(outcome.error.unwrap().contains("extraction"));
        assert_eq!(outcome.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_fixed_mode_continues_past_failed_analysis() {
        let backend = happy_backend(80.0).with(StageKind::Analysis, Scripted::Malformed);
        let (orch, backend) = orchestrator(backend, PipelinePolicy::fixed());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(outcome.success);
        assert_eq!(backend.calls(), StageKind::ALL.to_vec());
        assert!(!outcome.results[&StageKind::Analysis].success);
        assert!(outcome.data(StageKind::Analysis).is_none());
        assert_eq!(outcome.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_scoring_failure_aborts() {
        let backend = happy_backend(80.0).with(StageKind::Scoring, Scripted::Fail("500".to_string()));
        let (orch, backend) = orchestrator(backend, PipelinePolicy::fixed());
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(!outcome.success);
        assert_eq!(outcome.final_state, PipelineState::Failed);
        assert!(!backend.calls().contains(&StageKind::Recommendation));
        assert!(outcome.error.unwrap().starts_with("scoring stage failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_is_a_failure() {
        let backend = happy_backend(80.0).with(StageKind::Scoring, Scripted::Hang);
        let policy = PipelinePolicy::fixed().with_stage_timeout(Duration::from_secs(3));
        let (orch, _) = orchestrator(backend, policy);
        let outcome = orch.run(ctx(), &NoopProgress).await;

        assert!(!outcome.success);
        let scoring = &outcome.results[&StageKind::Scoring];
        assert!(scoring.reasoning.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_ends_at_100() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (orch, _) = orchestrator(happy_backend(80.0), PipelinePolicy::fixed());
        orch.run(ctx(), &ChannelProgress::new(tx)).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.windows(2).all(|w| w[0].percentage <= w[1].percentage));
        assert_eq!(events.last().unwrap().percentage, 100);
        assert_eq!(events.first().unwrap().stage, Some(StageKind::Extraction));
    }

    #[tokio::test]
    async fn test_run_collaborative_returns_request_order() {
        let (orch, _) = orchestrator(happy_backend(80.0), PipelinePolicy::fixed());
        let kinds = [StageKind::Scoring, StageKind::Extraction, StageKind::Analysis];
        let results = orch.run_collaborative(Arc::new(ctx()), &kinds).await;

        let order: Vec<StageKind> = results.iter().map(|(k, _)| *k).collect();
        assert_eq!(order, kinds.to_vec());
        assert!(results.iter().all(|(_, r)| r.success));
    }

    #[test]
    fn test_execution_mode_parses() {
        assert_eq!("Adaptive".parse::<ExecutionMode>(), Ok(ExecutionMode::Adaptive));
        assert_eq!(" fixed ".parse::<ExecutionMode>(), Ok(ExecutionMode::Fixed));
        assert!("turbo".parse::<ExecutionMode>().is_err());
    }
}
