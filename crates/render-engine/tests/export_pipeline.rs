use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clipforge_common::ExportDefaults;
use clipforge_project_model::{Caption, PlacedClip, SourceClip, Timeline, Track};
use clipforge_render_engine::{
    CancelToken, ExportCompositor, ExportError, ExportJob, ExportProgress, ProgressCallback,
    Resolution, Transcoder,
};

/// Scripted stand-in for ffmpeg: records each invocation, emits canned
/// status lines, writes the output path (last argument) unless told not to.
#[derive(Default)]
struct ScriptedTranscoder {
    calls: Mutex<Vec<Vec<String>>>,
    manifests: Mutex<Vec<String>>,
    staged_at_call: Mutex<Vec<usize>>,
    scratch: PathBuf,
    status_lines: Vec<String>,
    fail_on: Option<usize>,
    skip_output_on: Option<usize>,
    hang: bool,
}

impl ScriptedTranscoder {
    fn new(scratch: &Path) -> Self {
        Self {
            scratch: scratch.to_path_buf(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn run(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'a> FnMut(&'a str) + Send),
        cancel: &CancelToken,
    ) -> Result<(), ExportError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(args.to_vec());
            calls.len() - 1
        };
        self.staged_at_call
            .lock()
            .unwrap()
            .push(staged_files(&self.scratch).len());

        if let Some(pos) = args.iter().position(|a| a == "concat") {
            let manifest = &args[pos + 4];
            let content = std::fs::read_to_string(manifest).unwrap_or_default();
            self.manifests.lock().unwrap().push(content);
        }

        for line in &self.status_lines {
            on_line(line);
        }

        if self.hang {
            cancel.cancelled().await;
            return Err(ExportError::Cancelled);
        }
        if self.fail_on == Some(index) {
            return Err(ExportError::NonZeroExit {
                code: Some(1),
                stderr_tail: "Conversion failed!".to_string(),
            });
        }
        if self.skip_output_on != Some(index) {
            let output = args.last().expect("output path is the last argument");
            std::fs::write(output, b"fake media").expect("fake output should be writable");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Sandbox {
    root: PathBuf,
    scratch: PathBuf,
    output: PathBuf,
}

impl Sandbox {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("clipforge-test-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let scratch = root.join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        Self {
            output: root.join("out").join("final.mp4"),
            root,
            scratch,
        }
    }

    fn defaults(&self) -> ExportDefaults {
        ExportDefaults {
            scratch_dir: Some(self.scratch.clone()),
            ..ExportDefaults::default()
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn staged_files(scratch: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(scratch)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| {
                    path.file_name()
                        .is_some_and(|name| name.to_string_lossy().starts_with("clipforge-"))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn source(name: &str, duration: f64) -> SourceClip {
    SourceClip::new(format!("/media/{name}.mp4"), duration, None)
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ExportProgress>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: ProgressCallback = Box::new(move |event| sink.lock().unwrap().push(event));
    (callback, events)
}

#[tokio::test]
async fn two_untrimmed_clips_concat_end_to_end() {
    let sandbox = Sandbox::new("concat-e2e");
    let mut timeline = Timeline::new();
    timeline.place(source("a", 10.0), Track::Main).unwrap();
    timeline.place(source("b", 10.0), Track::Main).unwrap();
    assert_eq!(timeline.total_duration(), 20.0);

    let fake = Arc::new(ScriptedTranscoder {
        status_lines: vec![
            "frame=  120 fps= 60 q=28.0 size=512kB time=00:00:05.00 bitrate=838.9kbits/s".to_string(),
            "frame=  480 fps= 60 q=28.0 size=2048kB time=00:00:20.00 bitrate=838.9kbits/s".to_string(),
        ],
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());
    let (callback, events) = recorder();

    let job = ExportJob::new(timeline.snapshot(), &sandbox.output);
    let outcome = compositor.run(&job, Some(callback), &CancelToken::new()).await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output_path.as_deref(), Some(sandbox.output.as_path()));
    assert!(sandbox.output.exists());

    // untrimmed clips are referenced directly: only the concat invocation runs
    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0][..4], ["-f", "concat", "-safe", "0"]);
    assert_eq!(
        fake.manifests.lock().unwrap()[0],
        "file '/media/a.mp4'\nfile '/media/b.mp4'"
    );

    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.total_duration == 20.0));
    assert!(events.iter().any(|e| e.percentage == 25));
    assert_eq!(events.last().map(|e| e.percentage), Some(100));

    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn concat_failure_at_every_invocation_leaves_no_staged_files() {
    // two trimmed clips and one untrimmed: trim, trim, concat
    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 10.0), Track::Main).unwrap();
    let b = timeline.place(source("b", 8.0), Track::Main).unwrap();
    timeline.place(source("c", 6.0), Track::Main).unwrap();
    timeline.set_trim(&a, 2.0, 9.0).unwrap();
    timeline.set_trim(&b, 0.0, 5.0).unwrap();

    for fail_on in 0..3 {
        let sandbox = Sandbox::new(&format!("concat-fail-{fail_on}"));
        let fake = Arc::new(ScriptedTranscoder {
            fail_on: Some(fail_on),
            ..ScriptedTranscoder::new(&sandbox.scratch)
        });
        let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());

        let job = ExportJob::new(timeline.snapshot(), &sandbox.output);
        let result = compositor.export(&job, None, &CancelToken::new()).await;

        match result {
            Err(ExportError::NonZeroExit { code, stderr_tail }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr_tail, "Conversion failed!");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
        assert_eq!(fake.calls().len(), fail_on + 1, "later phases must not run");
        assert!(
            staged_files(&sandbox.scratch).is_empty(),
            "staged files left behind after failure at invocation {fail_on}"
        );
    }
}

#[tokio::test]
async fn concat_intermediates_feed_the_manifest() {
    let sandbox = Sandbox::new("concat-trimmed");
    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 10.0), Track::Main).unwrap();
    timeline.place(source("b", 4.0), Track::Main).unwrap();
    timeline.set_trim(&a, 5.0, 10.0).unwrap();

    let fake = Arc::new(ScriptedTranscoder::new(&sandbox.scratch));
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());
    let job = ExportJob::new(timeline.snapshot(), &sandbox.output).with_resolution(Resolution::HD_720P);
    compositor
        .export(&job, None, &CancelToken::new())
        .await
        .unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 2);
    let trim = &calls[0];
    assert_eq!(&trim[..4], ["-ss", "5", "-i", "/media/a.mp4"]);
    assert!(!trim.contains(&"-vf".to_string()), "intermediates keep source size");
    assert!(calls[1].contains(&"-vf".to_string()));

    let manifest = &fake.manifests.lock().unwrap()[0];
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("clipforge-trim-"));
    assert_eq!(lines[1], "file '/media/b.mp4'");

    // intermediate + manifest existed while concat ran
    assert_eq!(fake.staged_at_call.lock().unwrap()[1], 2);
    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn relative_scratch_dir_writes_absolute_manifest_entries() {
    let sandbox = Sandbox::new("relative-scratch");
    let relative = PathBuf::from(format!("clipforge-relative-scratch-{}", std::process::id()));
    let absolute_scratch = std::env::current_dir().unwrap().join(&relative);

    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 10.0), Track::Main).unwrap();
    timeline.place(source("b", 4.0), Track::Main).unwrap();
    timeline.set_trim(&a, 2.0, 10.0).unwrap();

    let fake = Arc::new(ScriptedTranscoder::new(&absolute_scratch));
    let defaults = ExportDefaults {
        scratch_dir: Some(relative.clone()),
        ..ExportDefaults::default()
    };
    let compositor = ExportCompositor::new(fake.clone(), &defaults);
    let job = ExportJob::new(timeline.snapshot(), &sandbox.output);
    let result = compositor.export(&job, None, &CancelToken::new()).await;

    let calls = fake.calls();
    let manifests = fake.manifests.lock().unwrap().clone();
    let leftovers = staged_files(&absolute_scratch);
    let _ = std::fs::remove_dir_all(&absolute_scratch);

    result.unwrap();
    assert_eq!(calls.len(), 2);
    assert!(Path::new(calls[0].last().unwrap()).is_absolute());
    let manifest_at = calls[1].iter().position(|a| a == "concat").unwrap() + 4;
    assert!(Path::new(&calls[1][manifest_at]).is_absolute());

    for line in manifests[0].lines() {
        let path = line
            .strip_prefix("file '")
            .and_then(|rest| rest.strip_suffix('\''))
            .unwrap();
        assert!(Path::new(path).is_absolute(), "relative manifest entry: {line}");
    }
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn missing_output_is_an_error_and_cleans_up() {
    let sandbox = Sandbox::new("missing-output");
    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 10.0), Track::Main).unwrap();
    timeline.place(source("b", 4.0), Track::Main).unwrap();
    timeline.set_trim(&a, 1.0, 10.0).unwrap();

    let fake = Arc::new(ScriptedTranscoder {
        skip_output_on: Some(0),
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());
    let job = ExportJob::new(timeline.snapshot(), &sandbox.output);

    let err = compositor
        .export(&job, None, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::OutputMissing { .. }));
    assert_eq!(fake.calls().len(), 1);
    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn single_clip_encodes_directly() {
    let sandbox = Sandbox::new("single");
    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 30.0), Track::Main).unwrap();
    timeline.set_trim(&a, 5.0, 25.0).unwrap();

    let fake = Arc::new(ScriptedTranscoder {
        status_lines: vec!["size=1kB time=00:00:10.00 bitrate=1.0kbits/s".to_string()],
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());
    let (callback, events) = recorder();

    let job = ExportJob::new(timeline.snapshot(), &sandbox.output);
    compositor
        .export(&job, Some(callback), &CancelToken::new())
        .await
        .unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert_eq!(&args[..4], ["-ss", "5", "-i", "/media/a.mp4"]);
    assert_eq!(&args[4..6], ["-t", "20"]);

    let percentages: Vec<u8> = events.lock().unwrap().iter().map(|e| e.percentage).collect();
    assert_eq!(percentages, vec![0, 50, 100]);
}

#[tokio::test]
async fn composite_burns_captions_and_removes_subtitle_files() {
    let sandbox = Sandbox::new("composite");
    let mut timeline = Timeline::new();

    let mut talk = source("talk", 12.0);
    talk.set_captions(vec![Caption::new(1.0, 2.0, "welcome")]);
    let mut cam = source("cam", 4.0);
    cam.set_captions(vec![Caption::new(0.0, 1.0, "hi from the corner")]);

    timeline.place(talk, Track::Main).unwrap();
    let cam_id = timeline.place(cam, Track::Overlay).unwrap();
    timeline.move_clip(&cam_id, 10.0, Track::Overlay).unwrap();

    let fake = Arc::new(ScriptedTranscoder {
        status_lines: vec!["time=00:00:07.00".to_string()],
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());
    let (callback, events) = recorder();

    let job = ExportJob::new(timeline.snapshot(), &sandbox.output).with_resolution(Resolution::FHD_1080P);
    compositor
        .export(&job, Some(callback), &CancelToken::new())
        .await
        .unwrap();

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    let graph_at = args.iter().position(|a| a == "-filter_complex").unwrap();
    let graph = &args[graph_at + 1];
    assert!(graph.contains("enable='between(t,10,14)'"));
    assert!(graph.contains("force_style='Alignment=8'"));
    assert!(graph.contains("force_style='Alignment=2'"));
    assert!(args.windows(2).any(|w| w == ["-map", "[vout]"]));
    assert!(args.windows(2).any(|w| w == ["-map", "[aout]"]));

    // both subtitle files existed during the run and are gone afterwards
    assert_eq!(fake.staged_at_call.lock().unwrap()[0], 2);
    assert!(staged_files(&sandbox.scratch).is_empty());

    // denominator is the latest clip end (overlay ends at 14)
    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.total_duration == 14.0));
    assert!(events.iter().any(|e| e.percentage == 50));
}

#[tokio::test]
async fn validation_errors_spawn_nothing() {
    let sandbox = Sandbox::new("validation");
    let fake = Arc::new(ScriptedTranscoder::new(&sandbox.scratch));
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());

    let empty = ExportJob::new(Vec::new(), &sandbox.output);
    assert!(matches!(
        compositor.export(&empty, None, &CancelToken::new()).await,
        Err(ExportError::NoClips)
    ));

    let overlay_only = ExportJob::new(
        vec![PlacedClip::full(source("cam", 3.0), 0.0, Track::Overlay)],
        &sandbox.output,
    );
    let outcome = compositor
        .run(&overlay_only, None, &CancelToken::new())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("main track"));

    assert!(fake.calls().is_empty());
    assert!(!sandbox.output.exists());
}

#[tokio::test]
async fn cancelling_a_spawned_export_kills_and_cleans_up() {
    let sandbox = Sandbox::new("cancel");
    let mut timeline = Timeline::new();
    let a = timeline.place(source("a", 10.0), Track::Main).unwrap();
    timeline.place(source("b", 10.0), Track::Main).unwrap();
    timeline.set_trim(&a, 0.0, 6.0).unwrap();

    let fake = Arc::new(ScriptedTranscoder {
        hang: true,
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = Arc::new(ExportCompositor::new(fake.clone(), &sandbox.defaults()));
    let job = ExportJob::new(timeline.snapshot(), &sandbox.output);

    let task = compositor.spawn(job);
    while fake.calls().is_empty() {
        tokio::task::yield_now().await;
    }
    task.cancel.cancel();
    let outcome = task.wait().await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Export cancelled"));
    assert_eq!(fake.calls().len(), 1);
    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn spawned_export_streams_progress() {
    let sandbox = Sandbox::new("stream");
    let mut timeline = Timeline::new();
    timeline.place(source("a", 8.0), Track::Main).unwrap();

    let fake = Arc::new(ScriptedTranscoder {
        status_lines: vec!["time=00:00:02.00".to_string()],
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = Arc::new(ExportCompositor::new(fake, &sandbox.defaults()));
    let mut task = compositor.spawn(ExportJob::new(timeline.snapshot(), &sandbox.output));

    let mut seen = Vec::new();
    while let Some(event) = task.progress.recv().await {
        seen.push(event.percentage);
    }
    let outcome = task.wait().await;

    assert!(outcome.success);
    assert_eq!(seen, vec![0, 25, 100]);
}

#[tokio::test]
async fn thumbnail_grabs_one_frame_as_data_url() {
    let sandbox = Sandbox::new("thumbnail");
    let fake = Arc::new(ScriptedTranscoder::new(&sandbox.scratch));
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());

    let url = compositor
        .thumbnail(&source("a", 12.0), &CancelToken::new())
        .await
        .unwrap();
    // "fake media" is what the scripted engine writes
    assert_eq!(url, "data:image/jpeg;base64,ZmFrZSBtZWRpYQ==");

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0][..4], ["-ss", "1", "-i", "/media/a.mp4"]);
    assert!(calls[0].windows(2).any(|w| w == ["-vframes", "1"]));
    assert!(calls[0].last().unwrap().ends_with(".jpg"));
    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn failed_thumbnail_cleans_up() {
    let sandbox = Sandbox::new("thumbnail-fail");
    let fake = Arc::new(ScriptedTranscoder {
        skip_output_on: Some(0),
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());

    let err = compositor
        .thumbnail(&source("short", 0.4), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::OutputMissing { .. }));
    assert_eq!(&fake.calls()[0][..2], ["-ss", "0.2"]);
    assert!(staged_files(&sandbox.scratch).is_empty());
}

#[tokio::test]
async fn engine_version_reports_first_banner_line() {
    let sandbox = Sandbox::new("version");
    let fake = Arc::new(ScriptedTranscoder {
        status_lines: vec![
            "ffmpeg version 7.0.1 Copyright (c) 2000-2024 the FFmpeg developers".to_string(),
            "built with gcc 13".to_string(),
        ],
        skip_output_on: Some(0),
        ..ScriptedTranscoder::new(&sandbox.scratch)
    });
    let compositor = ExportCompositor::new(fake.clone(), &sandbox.defaults());

    let version = compositor.engine_version().await.unwrap();
    assert_eq!(
        version,
        "ffmpeg version 7.0.1 Copyright (c) 2000-2024 the FFmpeg developers"
    );
    assert_eq!(fake.calls(), vec![vec!["-version".to_string()]]);
}
