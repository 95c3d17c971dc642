//! Batch screening — independent candidate pipelines run concurrently, bounded by
//! a semaphore, then ranked.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::checklist::JdTemplate;
use crate::pipeline::{AgentContext, Orchestrator, TracingProgress};
use crate::screening::candidate::{build_candidate, rank_candidates, Candidate};

pub const DEFAULT_MAX_CONCURRENT_CANDIDATES: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeInput {
    pub file_name: String,
    pub text: String,
}

/// Evaluates every resume against the same JD. One candidate's failure or panic
/// becomes its placeholder and never affects the others.
pub async fn screen_batch(
    orchestrator: Arc<Orchestrator>,
    template: Option<Arc<JdTemplate>>,
    jd_text: &str,
    resumes: Vec<ResumeInput>,
    max_concurrent: usize,
) -> Vec<Candidate> {
    let total = resumes.len();
    info!(
        "Screening {} resumes with up to {} in flight",
        total,
        max_concurrent.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let jd_text: Arc<str> = Arc::from(jd_text);
    let file_names: Vec<String> = resumes.iter().map(|r| r.file_name.clone()).collect();

    let mut set = JoinSet::new();
    for (idx, resume) in resumes.into_iter().enumerate() {
        let orchestrator = Arc::clone(&orchestrator);
        let semaphore = Arc::clone(&semaphore);
        let template = template.clone();
        let jd_text = Arc::clone(&jd_text);

        set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        idx,
                        Candidate::placeholder(&resume.file_name, "Screening was cancelled"),
                    )
                }
            };
            let ctx = AgentContext::new(resume.text, jd_text.as_ref(), template);
            let progress = TracingProgress::new(&resume.file_name);
            let outcome = orchestrator.run(ctx, &progress).await;
            (idx, build_candidate(&resume.file_name, &outcome))
        });
    }

    let mut slots: Vec<Option<Candidate>> = vec![None; total];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, candidate)) => slots[idx] = Some(candidate),
            Err(e) => error!("Candidate task aborted: {}", e),
        }
    }

    let mut candidates: Vec<Candidate> = slots
        .into_iter()
        .zip(file_names)
        .map(|(slot, file_name)| {
            slot.unwrap_or_else(|| {
                Candidate::placeholder(file_name, "Evaluation aborted unexpectedly")
            })
        })
        .collect();

    rank_candidates(&mut candidates);
    candidates
}
