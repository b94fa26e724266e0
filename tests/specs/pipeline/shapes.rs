//! S2 and the per-channel shape: which stages exist follows the chosen
//! transcriber's capabilities and the job's speaker-detection mode.

use crate::prelude::*;
use dalston_core::{JobParams, JobStatus, SpeakerDetection};

#[tokio::test]
async fn align_inserted_when_transcriber_lacks_timestamps() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("quartznet", &["en"], false), Script::Succeed);
    world.start_engine(engine("wav2vec-align", "align"), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    let mut params = JobParams::new("en");
    params.word_timestamps = true;
    world.submit("job-1", params).await;

    assert_eq!(
        world.stages("job-1"),
        ["align", "merge", "prepare", "transcribe"]
    );
    assert_eq!(world.job("job-1").status, JobStatus::Completed);

    // align runs between transcribe and merge.
    let transcribe = world.task("job-1", "transcribe");
    let align = world.task("job-1", "align");
    assert_eq!(align.dependencies, vec![transcribe.id]);
}

#[tokio::test]
async fn per_channel_split_fans_out_per_channel() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);
    // A diarizer is live but must not be used for per-channel jobs.
    world.start_engine(engine("pyannote", "diarize"), Script::Succeed);

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::PerChannel;
    params.channels = Some(2);
    world.submit("job-1", params).await;

    assert_eq!(
        world.stages("job-1"),
        ["merge", "prepare", "transcribe_ch0", "transcribe_ch1"]
    );
    assert_eq!(world.job("job-1").status, JobStatus::Completed);

    // Channel tasks carried their channel index to the engine.
    assert_eq!(world.task("job-1", "transcribe_ch0").config["channel"], 0);
    assert_eq!(world.task("job-1", "transcribe_ch1").config["channel"], 1);
}

#[tokio::test]
async fn auto_speaker_detection_diarizes_in_parallel() {
    let mut world = World::with_defaults();
    world.start_engine(engine("prep", "prepare"), Script::Succeed);
    world.start_engine(transcriber("parakeet-en", &["en"], true), Script::Succeed);
    world.start_engine(engine("pyannote", "diarize"), Script::Succeed);
    world.start_engine(engine("merger", "merge"), Script::Succeed);

    let mut params = JobParams::new("en");
    params.speaker_detection = SpeakerDetection::Auto;
    world.submit("job-1", params).await;

    assert_eq!(
        world.stages("job-1"),
        ["diarize", "merge", "prepare", "transcribe"]
    );
    assert_eq!(world.job("job-1").status, JobStatus::Completed);

    // diarize depends on prepare, not on the transcript.
    let prepare = world.task("job-1", "prepare");
    assert_eq!(world.task("job-1", "diarize").dependencies, vec![prepare.id]);
}
