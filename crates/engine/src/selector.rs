// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability-driven engine selection.
//!
//! A pure function of Registry and Catalog snapshots: the same inputs
//! always pick the same engine. Hard requirements (language containment,
//! streaming) reject; survivors are ranked by a total order; failure
//! produces a structured error carrying a per-candidate reason and
//! catalog alternatives that could satisfy the requirements if started.

use dalston_catalog::Catalog;
use dalston_core::{
    CandidateMismatch, CatalogAlternative, EngineCapabilities, EngineId, NoCapableEngineError,
    Requirements, Stage,
};
use std::cmp::Ordering;

/// A chosen engine with the capability snapshot it was chosen from.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEngine {
    pub engine_id: EngineId,
    pub capabilities: EngineCapabilities,
}

impl From<EngineCapabilities> for SelectedEngine {
    fn from(capabilities: EngineCapabilities) -> Self {
        Self {
            engine_id: capabilities.engine_id.clone(),
            capabilities,
        }
    }
}

/// The engines chosen for a job, one per stage the pipeline will contain.
///
/// Which optional stages exist is itself a selection outcome: `align` and
/// `diarize` appear only when the chosen transcriber cannot cover the
/// request natively.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePlan {
    pub prepare: SelectedEngine,
    pub transcribe: SelectedEngine,
    pub align: Option<SelectedEngine>,
    pub diarize: Option<SelectedEngine>,
    pub merge: SelectedEngine,
    /// Optional enrichment stages, in request order.
    pub enrichment: Vec<(Stage, SelectedEngine)>,
}

/// Total order over qualifying engines. Earlier is better:
/// native word timestamps, then native diarization, then language
/// specificity (a declared set beats "all"), then lower `rtf_gpu`, with a
/// deterministic tie-break on engine id.
fn rank(a: &EngineCapabilities, b: &EngineCapabilities) -> Ordering {
    b.word_timestamps
        .cmp(&a.word_timestamps)
        .then(b.includes_diarization.cmp(&a.includes_diarization))
        .then_with(|| {
            let a_specific = !a.languages.is_empty();
            let b_specific = !b.languages.is_empty();
            b_specific.cmp(&a_specific)
        })
        .then_with(|| match (a.rtf_gpu, b.rtf_gpu) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.engine_id.cmp(&b.engine_id))
}

fn no_capable_engine(
    stage: &Stage,
    requirements: &Requirements,
    running_engines: Vec<CandidateMismatch>,
    catalog: &Catalog,
) -> NoCapableEngineError {
    let catalog_alternatives = catalog
        .find_engines(stage, requirements)
        .into_iter()
        .map(|entry| CatalogAlternative {
            engine_id: entry.engine_id().clone(),
            image: entry.image.clone(),
        })
        .collect();
    NoCapableEngineError {
        stage: stage.clone(),
        requirements: requirements.clone(),
        running_engines,
        catalog_alternatives,
    }
}

/// Map `(stage, requirements, preference)` to a concrete engine.
///
/// `live` is the Registry snapshot for the stage; `catalog` only feeds the
/// alternatives of the error path.
pub fn select_engine(
    stage: &Stage,
    requirements: &Requirements,
    user_preference: Option<&EngineId>,
    live: &[EngineCapabilities],
    catalog: &Catalog,
) -> Result<SelectedEngine, NoCapableEngineError> {
    if let Some(preferred) = user_preference {
        let Some(candidate) = live.iter().find(|c| &c.engine_id == preferred) else {
            let mismatch = CandidateMismatch {
                engine_id: preferred.clone(),
                reason: "not running (no live heartbeat)".to_string(),
            };
            return Err(no_capable_engine(stage, requirements, vec![mismatch], catalog));
        };
        if let Some(reason) = candidate.mismatch_reason(requirements) {
            let mismatch = CandidateMismatch {
                engine_id: preferred.clone(),
                reason,
            };
            return Err(no_capable_engine(stage, requirements, vec![mismatch], catalog));
        }
        return Ok(SelectedEngine::from(candidate.clone()));
    }

    let mut survivors = Vec::new();
    let mut rejected = Vec::new();
    for candidate in live {
        match candidate.mismatch_reason(requirements) {
            None => survivors.push(candidate.clone()),
            Some(reason) => rejected.push(CandidateMismatch {
                engine_id: candidate.engine_id.clone(),
                reason,
            }),
        }
    }
    survivors.sort_by(rank);

    match survivors.into_iter().next() {
        Some(winner) => Ok(SelectedEngine::from(winner)),
        None => Err(no_capable_engine(stage, requirements, rejected, catalog)),
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
