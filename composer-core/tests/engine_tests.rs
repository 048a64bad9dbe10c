// composer-core/tests/engine_tests.rs

mod common;

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::{MockFfmpegSpawner, MockRun, create_dummy_file, files_in};
use composer_core::{
    ConcatInput, ConcatRequest, CoreConfigBuilder, CoreError, Dimension, EncoderEngine, EncodingProfile, MediaKind,
    ParameterMap, TrimConcatRequest,
};
use tempfile::tempdir;

fn engine(spawner: &MockFfmpegSpawner) -> EncoderEngine<MockFfmpegSpawner> {
    EncoderEngine::with_spawner(CoreConfigBuilder::new().build(), spawner.clone())
}

fn delivery(id: &str, command: &str) -> EncodingProfile {
    EncodingProfile::new(id, MediaKind::Visual, MediaKind::Visual, command).with_suffix(format!("-{id}.mp4"))
}

const OUT: &str = "#{out.dir}/#{out.name}#{out.suffix}";

#[test]
fn test_two_clips_compile_to_trims_and_concat() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "lecture.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery("h264", &format!("-c:v libx264 -c:a aac {OUT}"));

    let request = TrimConcatRequest::new(vec![input.clone()])
        .with_edits(vec![0, 10_000, 3_000, 0, 14_000, 2_000])
        .with_transition(Duration::from_millis(1000));
    let outputs = engine.multi_trim_concat(&request, &[&profile])?;

    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    let graph_at = args.iter().position(|a| a == "-filter_complex").expect("no filter graph");
    assert_eq!(
        args[graph_at + 1],
        "[0:v]trim=10.00:duration=3.00,setpts=PTS-STARTPTS,fade=t=in:st=0:d=1.00,fade=t=out:st=2.00:d=1.00[v0];\
         [0:a]atrim=10.00:duration=3.00,asetpts=PTS-STARTPTS,afade=t=in:st=0:d=1.00,afade=t=out:st=2.00:d=1.00[a0];\
         [0:v]trim=14.00:duration=2.00,setpts=PTS-STARTPTS,fade=t=in:st=0:d=1.00,fade=t=out:st=1.00:d=1.00[v1];\
         [0:a]atrim=14.00:duration=2.00,asetpts=PTS-STARTPTS,afade=t=in:st=0:d=1.00,afade=t=out:st=1.00:d=1.00[a1];\
         [v0][v1]concat=n=2:unsafe=1[ov];\
         [a0][a1]concat=n=2:v=0:a=1[oa]"
    );
    assert_eq!(args[graph_at - 1], input.to_string_lossy());
    assert_eq!(&args[graph_at + 2..graph_at + 6], ["-map", "[ov]", "-map", "[oa]"]);

    assert_eq!(outputs.len(), 1);
    let output = outputs[0].as_ref().expect("missing output");
    assert!(output.exists());
    assert!(output.file_name().unwrap().to_string_lossy().starts_with("lecture_"));
    assert!(output.to_string_lossy().ends_with("-h264.mp4"));
    Ok(())
}

#[test]
fn test_profile_order_is_preserved_with_empty_slot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);

    let a = delivery("a", &format!("-vf scale=640:-2 -c:v libx264 {OUT}"));
    let b = delivery("b", "-vf scale=160:-2 -f null -");
    let c = delivery("c", &format!("-c:v libvpx-vp9 -c:a libopus {OUT}"));

    let outputs = engine.multi_encode(&input, &[&a, &b, &c])?;

    assert_eq!(outputs.len(), 3);
    assert!(outputs[0].as_ref().is_some_and(|p| p.to_string_lossy().ends_with("-a.mp4")));
    assert!(outputs[1].is_none());
    assert!(outputs[2].as_ref().is_some_and(|p| p.to_string_lossy().ends_with("-c.mp4")));
    assert_ne!(outputs[0], outputs[2]);

    let args = &spawner.get_received_calls()[0];
    let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert!(graph.starts_with("[0:a]asplit=3[oa0][oa1][oa2];[0:v]split=3[ov00][ov01][ov2];"));
    Ok(())
}

#[test]
fn test_paths_with_spaces_stay_single_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "My Lecture.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);

    let a = delivery("a", &format!("-vf scale=640:-2 -c:v libx264 {OUT}"));
    let b = delivery("b", &format!("-i #{{in.video.path}} -c:v libx264 {OUT}"));
    let command = engine.compile_multi_encode(&input, &[&a, &b])?;

    assert_eq!(command.outputs().len(), 2);
    for output in command.outputs() {
        let output = output.as_ref().expect("missing output");
        assert!(output.is_absolute());
        assert_eq!(output.parent(), Some(dir.path()));
        assert!(output.file_name().unwrap().to_string_lossy().starts_with("My Lecture_"));
        assert!(command.arguments().contains(&output.to_string_lossy().into_owned()));
    }
    assert!(!command.arguments().iter().any(|arg| arg == "Lecture" || arg.ends_with("/My")));
    Ok(())
}

#[test]
fn test_paths_with_apostrophes_are_not_quotes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "it's.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);

    let a = delivery("a", &format!("-c:v libx264 {OUT}"));
    let b = delivery("b", &format!("-c:v libvpx-vp9 {OUT}"));
    let outputs = engine.multi_encode(&input, &[&a, &b])?;

    let args = &spawner.get_received_calls()[0];
    assert_eq!(outputs.len(), 2);
    for output in &outputs {
        let output = output.as_ref().expect("missing output");
        assert!(output.is_absolute());
        assert_eq!(output.parent(), Some(dir.path()));
        assert!(output.file_name().unwrap().to_string_lossy().starts_with("it's_"));
        assert!(args.contains(&output.to_string_lossy().into_owned()));
        assert!(output.exists());
    }
    Ok(())
}

#[test]
fn test_nested_graph_is_rejected_without_artifacts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);

    let complex = delivery("complex", &format!("-filter_complex [0:v]scale=320:-2[x] -map [x] {OUT}"));
    let plain = delivery("plain", &format!("-c:v libx264 {OUT}"));

    let err = engine.multi_encode(&input, &[&plain, &complex]).unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedGraph(_)));
    assert!(spawner.get_received_calls().is_empty());
    assert_eq!(files_in(dir.path()), vec![input]);
    Ok(())
}

#[test]
fn test_failed_run_removes_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun::failure(1));
    let engine = engine(&spawner);
    let profile = delivery("mp4", &format!("-i #{{in.video.path}} -c:v libx264 {OUT}"));

    let err = engine.encode(&input, &profile, &ParameterMap::new()).unwrap_err();
    match err {
        CoreError::ExternalProcess { output, status, .. } => {
            assert!(!status.success());
            assert!(output.contains("Conversion failed!"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(files_in(dir.path()), vec![input]);
    Ok(())
}

#[test]
fn test_lost_output_stream_kills_and_reaps_encoder() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun::broken_stream());
    let engine = engine(&spawner);
    let profile = delivery("mp4", &format!("-i #{{in.video.path}} -c:v libx264 {OUT}"));

    let err = engine.encode(&input, &profile, &ParameterMap::new()).unwrap_err();
    assert!(err.to_string().contains("encoder output stream closed"));
    assert_eq!(spawner.get_lifecycle(), vec!["kill", "wait"]);
    assert_eq!(files_in(dir.path()), vec![input]);
    Ok(())
}

#[test]
fn test_encode_expects_exactly_one_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun::silent());
    let engine = engine(&spawner);
    let profile = delivery("mp4", &format!("-i #{{in.video.path}} {OUT}"));

    let err = engine.encode(&input, &profile, &ParameterMap::new()).unwrap_err();
    assert!(err.to_string().contains("Encode expects one output file (0 found)"));
    Ok(())
}

#[test]
fn test_extract_images_cleans_up_on_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun::success());
    spawner.push_run(MockRun::failure(1));
    let engine = engine(&spawner);
    let profile = EncodingProfile::new(
        "still",
        MediaKind::Visual,
        MediaKind::Image,
        "-ss #{time} -i #{in.video.path} -frames:v 1 #{out.dir}/#{out.name}#{out.suffix}",
    )
    .with_suffix(".jpg");

    let err = engine.extract_images(&input, &profile, &ParameterMap::new(), &[1.5, 3.0]);
    assert!(err.is_err());

    let calls = spawner.get_received_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].contains(&"1.50000".to_string()));
    assert!(calls[1].contains(&"3.00000".to_string()));
    assert_eq!(files_in(dir.path()), vec![input]);
    Ok(())
}

#[test]
fn test_extract_images_at_times() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = EncodingProfile::new(
        "still",
        MediaKind::Visual,
        MediaKind::Image,
        "-ss #{time} -i #{in.video.path} -frames:v 1 #{out.dir}/#{out.name}#{out.suffix}",
    )
    .with_suffix(".jpg");

    let images = engine.extract_images(&input, &profile, &ParameterMap::new(), &[0.0, 2.0, 4.0])?;
    assert_eq!(images.len(), 3);
    assert!(images.iter().all(|image| image.exists()));
    Ok(())
}

#[test]
fn test_concat_backfills_silence() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let first = create_dummy_file(dir.path(), "part1.mp4");
    let second = create_dummy_file(dir.path(), "part2.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery("concat", &format!("#{{concatCommand}} -c:v libx264 {OUT}"));

    let request = ConcatRequest {
        inputs: vec![
            ConcatInput::new(&first, true, true),
            ConcatInput::new(&second, true, false),
        ],
        dimension: Some(Dimension::new(1280, 720)),
        frame_rate: None,
        same_codec: false,
    };
    let output = engine.concat(&request, &profile, &ParameterMap::new())?;
    assert!(output.exists());

    let args = &spawner.get_received_calls()[0];
    let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
    assert_eq!(graph.matches("aevalsrc=0::d=1").count(), 1);
    assert!(graph.contains("aevalsrc=0::d=1[silent2]"));
    assert!(graph.ends_with("concat=n=2:v=1:a=1[v][a]"));
    let inputs: Vec<&String> = args
        .iter()
        .zip(args.iter().skip(1))
        .filter(|(flag, _)| *flag == "-i")
        .map(|(_, path)| path)
        .collect();
    assert_eq!(inputs, [&first.to_string_lossy().into_owned(), &second.to_string_lossy().into_owned()]);
    Ok(())
}

#[test]
fn test_same_codec_concat_uses_list_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let first = create_dummy_file(dir.path(), "part1.mp4");
    let second = create_dummy_file(dir.path(), "part2.mp4");
    let spawner = MockFfmpegSpawner::new();
    let engine = EncoderEngine::with_spawner(
        CoreConfigBuilder::new().temp_dir(dir.path().join("tmp")).build(),
        spawner.clone(),
    );
    let profile = delivery("copy", &format!("#{{concatCommand}} -c copy {OUT}"));
    let request = ConcatRequest {
        inputs: vec![
            ConcatInput::new(&first, true, true),
            ConcatInput::new(&second, true, true),
        ],
        dimension: None,
        frame_rate: None,
        same_codec: true,
    };

    let job = engine.compile_concat(&request, &profile, &ParameterMap::new())?;
    let list = job.list_file().expect("no list file").to_path_buf();
    assert_eq!(job.command.value_of("-f"), Some("concat"));
    assert_eq!(job.command.value_of("-i"), Some(list.to_str().unwrap()));
    assert!(std::fs::read_to_string(&list)?.contains(&format!("file '{}'", first.display())));

    drop(job);
    assert!(!list.exists());
    Ok(())
}

#[test]
fn test_concat_rejects_single_input() {
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery("concat", &format!("#{{concatCommand}} {OUT}"));
    let request = ConcatRequest {
        inputs: vec![ConcatInput::new("/in/a.mp4", true, true)],
        dimension: Some(Dimension::new(640, 360)),
        frame_rate: None,
        same_codec: false,
    };
    let err = engine.compile_concat(&request, &profile, &ParameterMap::new()).unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)));
}

#[test]
fn test_mux_fills_both_roles() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let video = create_dummy_file(dir.path(), "camera.mp4");
    let audio = create_dummy_file(dir.path(), "mic.wav");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery(
        "mux",
        &format!("-i #{{in.video.path}} -i #{{in.audio.path}} -map 0:v -map 1:a -c copy {OUT}"),
    );

    let output = engine.mux(&video, &audio, &profile, &ParameterMap::new())?;
    assert!(output.file_name().unwrap().to_string_lossy().starts_with("camera_"));

    let args = &spawner.get_received_calls()[0];
    assert!(args.contains(&audio.to_string_lossy().into_owned()));
    Ok(())
}

#[test]
fn test_watermark_property_holds_image_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let logo = create_dummy_file(dir.path(), "logo.png");
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery(
        "wm",
        &format!("-i #{{in.video.path}} -vf movie=#{{watermark}}[wm];[in][wm]overlay=10:10 {OUT}"),
    );

    let output = engine.watermark(&input, &logo, &profile, &ParameterMap::new())?;
    assert!(output.exists());

    let args = &spawner.get_received_calls()[0];
    assert!(args.contains(&format!("movie={}[wm];[in][wm]overlay=10:10", logo.display())));
    // finished processes leave the registry
    assert!(engine.registry().is_empty());
    engine.close();
    Ok(())
}

#[test]
fn test_hls_group_renames_segments() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let out_dir = dir.path().display().to_string();
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun {
        exit_code: 0,
        write_outputs: false,
        lines: vec![
            format!("[hls @ 0x1] Opening '{out_dir}/talk_0.mp4.tmp' for writing"),
            format!("[hls @ 0x1] Opening '{out_dir}/talk_1.mp4.tmp' for writing"),
            format!("[hls @ 0x1] Opening '{out_dir}/talk_0.m3u8' for writing"),
        ],
        break_stream: false,
    });
    for (name, content) in [
        ("talk_0.mp4", "x".to_string()),
        ("talk_1.mp4", "y".to_string()),
        ("talk_0.m3u8", "#EXTM3U\n#EXT-X-MAP:URI=\"talk_0.mp4\"\ntalk_0.mp4\n".to_string()),
    ] {
        std::fs::write(dir.path().join(name), content)?;
    }
    let engine = engine(&spawner);

    let low = delivery("low", &format!("-c:v libx264 -b:v 500k -c:a aac {OUT}"));
    let high = delivery("high", &format!("-c:v libx264 -b:v 2000k -c:a aac {OUT}"));
    let hls = EncodingProfile::new(
        "hls",
        MediaKind::Visual,
        MediaKind::Stream,
        "-f hls -hls_segment_type fmp4 -master_pl_name master.m3u8 #{out.dir}/#{out.name}_%v.m3u8",
    )
    .with_extension("adaptive.type", "HLS");

    let outputs = engine.multi_encode(&input, &[&low, &hls, &high])?;

    let args = &spawner.get_received_calls()[0];
    assert!(args.contains(&"-var_stream_map".to_string()));
    assert!(args.contains(&"v:0,a:0 v:1,a:1".to_string()));

    let outputs: Vec<PathBuf> = outputs.into_iter().flatten().collect();
    assert!(outputs.contains(&dir.path().join("talk_0-low.mp4")));
    assert!(outputs.contains(&dir.path().join("talk_1-high.mp4")));
    let playlist = std::fs::read_to_string(dir.path().join("talk_0.m3u8"))?;
    assert!(playlist.contains("talk_0-low.mp4"));
    Ok(())
}

#[test]
fn test_failed_segment_rename_removes_moved_segments() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = create_dummy_file(dir.path(), "talk.mp4");
    let out_dir = dir.path().display().to_string();
    let spawner = MockFfmpegSpawner::new();
    spawner.push_run(MockRun {
        exit_code: 0,
        write_outputs: false,
        lines: vec![
            format!("[hls @ 0x1] Opening '{out_dir}/talk_0.mp4.tmp' for writing"),
            format!("[hls @ 0x1] Opening '{out_dir}/talk_1.mp4.tmp' for writing"),
            format!("[hls @ 0x1] Opening '{out_dir}/talk_0.m3u8' for writing"),
        ],
        break_stream: false,
    });
    // talk_1.mp4 never shows up, so its rename fails after talk_0 moved
    std::fs::write(dir.path().join("talk_0.mp4"), "x")?;
    std::fs::write(dir.path().join("talk_0.m3u8"), "#EXTM3U\ntalk_0.mp4\n")?;
    let engine = engine(&spawner);

    let low = delivery("low", &format!("-c:v libx264 -b:v 500k {OUT}"));
    let high = delivery("high", &format!("-c:v libx264 -b:v 2000k {OUT}"));
    let hls = EncodingProfile::new("hls", MediaKind::Visual, MediaKind::Stream, "-f hls #{out.dir}/#{out.name}_%v.m3u8")
        .with_extension("adaptive.type", "HLS");

    assert!(engine.multi_encode(&input, &[&low, &high, &hls]).is_err());
    assert_eq!(files_in(dir.path()), vec![input]);
    Ok(())
}

#[test]
fn test_compile_composite_sets_roles() {
    let spawner = MockFfmpegSpawner::new();
    let engine = engine(&spawner);
    let profile = delivery("composite", &format!("-i #{{in.video.path}} #{{compositeCommand}} -c:v libx264 {OUT}"));
    let request = composer_core::CompositeRequest {
        output: Dimension::new(1920, 1080),
        lower: composer_core::LaidOutTrack {
            path: PathBuf::from("/in/presenter.mp4"),
            layout: composer_core::Layout::new(0, 0, 1280, 720),
            has_audio: true,
        },
        upper: Some(composer_core::LaidOutTrack {
            path: PathBuf::from("/in/slides.mp4"),
            layout: composer_core::Layout::new(1280, 0, 640, 360),
            has_audio: false,
        }),
        watermark: None,
        background: "black".to_string(),
    };

    let command = engine.compile_composite(&request, &profile, &ParameterMap::new()).unwrap();
    let args = command.tokens();
    assert_eq!(command.value_of("-i"), Some("/in/presenter.mp4"));
    assert!(args.contains(&"/in/slides.mp4".to_string()));
    assert!(command.value_of("-filter_complex").unwrap().ends_with("overlay=1280:0[out]"));
    assert_eq!(&args[args.len() - 7..args.len() - 3], ["-map", "[out]", "-map", "0:a"]);
    assert!(spawner.get_received_calls().is_empty());
    assert!(Path::new(args.last().unwrap()).starts_with("/in"));
}
