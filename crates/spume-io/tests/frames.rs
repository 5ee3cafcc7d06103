use std::{fs, path::PathBuf, time::{SystemTime, UNIX_EPOCH}};

use glam::{UVec3, Vec3};
use spume_fluids::{dispatch::Serial, params::SphParams, scene::SphScene};
use spume_io::{
    decode::{DecodingError, FluidDataDecoder},
    encode::{EncodingError, FluidDataEncoder},
};

fn scratch_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("spume-{name}-{}-{nanos}", std::process::id()))
}

fn small_scene() -> SphScene<Serial> {
    let params = SphParams {
        num_to_spawn: UVec3::new(4, 3, 2),
        spawn_center: Vec3::new(-0.3, -0.2, -0.1),
        ..Default::default()
    };
    SphScene::from_params(params, Serial::default()).unwrap()
}

#[test]
fn test_frames_read_back_as_written() {
    let dir = scratch_dir("frames");
    let mut scene = small_scene();
    let mut encoder = FluidDataEncoder::new(dir.clone(), 3).unwrap();
    encoder.encode_metadata(&scene).unwrap();

    let mut written = Vec::new();
    for frame in 0..3 {
        scene.set_box_size(Vec3::new(4.0 - frame as f32 * 0.5, 10.0, 3.0));
        scene.advance().unwrap();
        encoder.encode_frame(&scene).unwrap();
        written.push((scene.box_size(), scene.fluid.particles().records()));
    }
    assert_eq!(encoder.frames_written(), 3);
    assert!(matches!(encoder.encode_frame(&scene), Err(EncodingError::TooManyFrames(3))));

    let mut decoder = FluidDataDecoder::new(dir.clone());
    let meta = decoder.decode_metadata().unwrap();
    assert_eq!(meta.num_particles, 24);
    assert_eq!(meta.num_frames, 3);
    assert_eq!(meta.timestep, scene.params().timestep);
    assert_eq!(meta.particle_radius, 0.1);
    assert_eq!(meta.box_size, Vec3::new(4.0, 10.0, 3.0));

    for (box_size, records) in &written {
        let frame = decoder.decode_frame().unwrap().unwrap();
        assert_eq!(frame.box_size, *box_size);
        assert_eq!(&frame.particles, records);
    }
    assert!(decoder.decode_frame().unwrap().is_none());

    decoder.reset();
    let first = decoder.decode_frame().unwrap().unwrap();
    assert_eq!(first.positions().count(), 24);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_foreign_directory_is_rejected() {
    let dir = scratch_dir("foreign");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("_meta"), b"NOPE\x01\x00").unwrap();

    let mut decoder = FluidDataDecoder::new(dir.clone());
    assert!(matches!(decoder.decode_metadata(), Err(DecodingError::BadMagic(magic)) if &magic == b"NOPE"));

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_oversized_particle_count_is_rejected() {
    let dir = scratch_dir("oversized");
    fs::create_dir_all(&dir).unwrap();

    let mut meta = b"SPUM".to_vec();
    meta.extend_from_slice(&1u16.to_ne_bytes());
    meta.extend_from_slice(&u64::MAX.to_ne_bytes());
    meta.extend_from_slice(&1u64.to_ne_bytes());
    fs::write(dir.join("_meta"), meta).unwrap();

    let mut decoder = FluidDataDecoder::new(dir.clone());
    assert!(matches!(
        decoder.decode_metadata(),
        Err(DecodingError::TooManyParticles { count: u64::MAX, .. })
    ));

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_frame_shorter_than_its_records_is_rejected() {
    let dir = scratch_dir("short");
    let scene = small_scene();
    let mut encoder = FluidDataEncoder::new(dir.clone(), 1).unwrap();
    encoder.encode_metadata(&scene).unwrap();

    // Only the box size and a section length claiming every record.
    let mut frame = bytemuck::bytes_of(&Vec3::ONE).to_vec();
    frame.extend_from_slice(&24u64.to_ne_bytes());
    fs::write(dir.join("0.dat"), frame).unwrap();

    let mut decoder = FluidDataDecoder::new(dir.clone());
    decoder.decode_metadata().unwrap();
    assert!(matches!(decoder.decode_frame(), Err(DecodingError::Truncated { found: 20, .. })));

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_truncated_frame_is_an_error() {
    let dir = scratch_dir("truncated");
    let scene = small_scene();
    let mut encoder = FluidDataEncoder::new(dir.clone(), 1).unwrap();
    encoder.encode_metadata(&scene).unwrap();
    encoder.encode_frame(&scene).unwrap();

    let frame = dir.join("0.dat");
    let bytes = fs::read(&frame).unwrap();
    fs::write(&frame, &bytes[..bytes.len() - 10]).unwrap();

    let mut decoder = FluidDataDecoder::new(dir.clone());
    decoder.decode_metadata().unwrap();
    assert!(matches!(
        decoder.decode_frame(),
        Err(DecodingError::Truncated { expected, found }) if found + 10 == expected
    ));

    fs::remove_dir_all(dir).unwrap();
}
