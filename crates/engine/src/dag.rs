// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG construction: job parameters + selected engines → task records.
//!
//! The builder is pure — it returns the task list and persists nothing.
//! Shapes:
//!
//! ```text
//! default:      prepare → transcribe → [align] → merge
//!                  └────────→ [diarize] ────────↗
//! per-channel:  prepare → transcribe_chK → [align_chK] ─┐ (×N)
//!                                                       merge
//! ```
//!
//! Enrichment stages hang off `merge` with `required=false`.

use crate::selector::{PipelinePlan, SelectedEngine};
use chrono::{DateTime, Utc};
use dalston_core::{IdGen, Job, Knobs, Stage, Task, TaskId, TaskStatus};
use serde_json::json;

fn task_config(job: &Job, engine: &SelectedEngine, knobs: &Knobs) -> serde_json::Value {
    let timeout = knobs.stage_timeout(
        engine.capabilities.rtf_gpu,
        job.params.audio_duration_secs,
    );
    let mut config = json!({
        "language": job.params.language,
        "timeout_secs": timeout.as_secs(),
    });
    if let Some(model_id) = &engine.capabilities.model_id {
        config["runtime_model_id"] = json!(model_id);
    }
    config
}

#[allow(clippy::too_many_arguments)]
fn push_task(
    tasks: &mut Vec<Task>,
    id_gen: &impl IdGen,
    job: &Job,
    stage: Stage,
    engine: &SelectedEngine,
    dependencies: Vec<TaskId>,
    config: serde_json::Value,
    input_uri: Option<String>,
    knobs: &Knobs,
    now: DateTime<Utc>,
) -> TaskId {
    let id = TaskId::new(id_gen.next());
    let required = !stage.is_enrichment();
    tasks.push(Task {
        id: id.clone(),
        job_id: job.id.clone(),
        stage: stage.clone(),
        engine_id: engine.engine_id.clone(),
        status: TaskStatus::Pending,
        dependencies,
        config,
        input_uri,
        output_uri: None,
        retries: 0,
        max_retries: knobs.max_retries_for(&stage),
        required,
        delivery_count: 0,
        reselections: 0,
        error: None,
        created_at: now,
        started_at: None,
        completed_at: None,
    });
    id
}

/// Build the task list for a job from its pipeline plan.
pub fn build_dag(
    job: &Job,
    plan: &PipelinePlan,
    id_gen: &impl IdGen,
    knobs: &Knobs,
    now: DateTime<Utc>,
) -> Vec<Task> {
    let mut tasks = Vec::new();
    let params = &job.params;

    // prepare reads the source audio; everything downstream addresses
    // artifacts by (job_id, task_id) in object storage.
    let mut prepare_config = task_config(job, &plan.prepare, knobs);
    if params.split_channels() {
        prepare_config["channels"] = json!(params.channel_count());
    }
    let prepare_id = push_task(
        &mut tasks,
        id_gen,
        job,
        Stage::prepare(),
        &plan.prepare,
        vec![],
        prepare_config,
        Some(job.audio_uri.clone()),
        knobs,
        now,
    );

    let mut merge_deps = Vec::new();

    if params.split_channels() {
        for channel in 0..params.channel_count() {
            let mut transcribe_config = task_config(job, &plan.transcribe, knobs);
            transcribe_config["channel"] = json!(channel);
            let transcribe_id = push_task(
                &mut tasks,
                id_gen,
                job,
                Stage::transcribe().with_channel(channel),
                &plan.transcribe,
                vec![prepare_id.clone()],
                transcribe_config,
                None,
                knobs,
                now,
            );

            let tail = match &plan.align {
                Some(align) => {
                    let mut align_config = task_config(job, align, knobs);
                    align_config["channel"] = json!(channel);
                    push_task(
                        &mut tasks,
                        id_gen,
                        job,
                        Stage::align().with_channel(channel),
                        align,
                        vec![transcribe_id],
                        align_config,
                        None,
                        knobs,
                        now,
                    )
                }
                None => transcribe_id,
            };
            merge_deps.push(tail);
        }
    } else {
        let transcribe_id = push_task(
            &mut tasks,
            id_gen,
            job,
            Stage::transcribe(),
            &plan.transcribe,
            vec![prepare_id.clone()],
            task_config(job, &plan.transcribe, knobs),
            None,
            knobs,
            now,
        );

        let tail = match &plan.align {
            Some(align) => push_task(
                &mut tasks,
                id_gen,
                job,
                Stage::align(),
                align,
                vec![transcribe_id],
                task_config(job, align, knobs),
                None,
                knobs,
                now,
            ),
            None => transcribe_id,
        };
        merge_deps.push(tail);

        // diarize needs only the prepared audio; it runs in parallel with
        // transcription and joins again at merge.
        if let Some(diarize) = &plan.diarize {
            let diarize_id = push_task(
                &mut tasks,
                id_gen,
                job,
                Stage::diarize(),
                diarize,
                vec![prepare_id.clone()],
                task_config(job, diarize, knobs),
                None,
                knobs,
                now,
            );
            merge_deps.push(diarize_id);
        }
    }

    let merge_id = push_task(
        &mut tasks,
        id_gen,
        job,
        Stage::merge(),
        &plan.merge,
        merge_deps,
        task_config(job, &plan.merge, knobs),
        None,
        knobs,
        now,
    );

    for (stage, engine) in &plan.enrichment {
        push_task(
            &mut tasks,
            id_gen,
            job,
            stage.clone(),
            engine,
            vec![merge_id.clone()],
            task_config(job, engine, knobs),
            None,
            knobs,
            now,
        );
    }

    tasks
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
