use std::{fs::File, io::{BufReader, Read}, mem::size_of, path::PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use spume_fluids::{params::MAX_PARTICLES, particle::{Particle, PARTICLE_RECORD_SIZE}};
use thiserror::Error;

use crate::{frame_path, MAGIC, META_FILE, VERSION};

/// Reads back a directory written by [`FluidDataEncoder`](crate::encode::FluidDataEncoder).
pub struct FluidDataDecoder {
    /// The path to the directory into which the fluid data resides.
    path: PathBuf,
    num_particles: u64,
    num_frames: u64,
    current_frame: u64,
}

impl FluidDataDecoder {
    pub fn new(path: PathBuf) -> FluidDataDecoder {
        Self {
            path,
            num_particles: 0,
            num_frames: 0,
            current_frame: 0,
        }
    }

    fn read_value<T: Pod, R: Read>(reader: &mut R) -> Result<T, DecodingError> {
        let mut value = T::zeroed();
        reader.read_exact(bytemuck::bytes_of_mut(&mut value))?;

        Ok(value)
    }

    fn read_section<T: Pod, R: Read>(reader: &mut R, expected: u64) -> Result<Vec<T>, DecodingError> {
        let found = Self::read_value::<u64, _>(reader)?;
        if found != expected {
            return Err(DecodingError::RecordCount { expected, found });
        }

        let mut values = vec![T::zeroed(); found as usize];
        reader.read_exact(bytemuck::cast_slice_mut(&mut values))?;

        Ok(values)
    }

    pub fn decode_metadata(&mut self) -> Result<FluidMetadata, DecodingError> {
        let path = self.path.join(META_FILE);
        let mut reader = BufReader::new(File::open(path)?);

        let magic = Self::read_value::<[u8; 4], _>(&mut reader)?;
        if magic != MAGIC {
            return Err(DecodingError::BadMagic(magic));
        }

        let version = Self::read_value::<u16, _>(&mut reader)?;
        if version != VERSION {
            return Err(DecodingError::UnsupportedVersion(version));
        }

        let num_particles = Self::read_value::<u64, _>(&mut reader)?;
        if num_particles > MAX_PARTICLES {
            return Err(DecodingError::TooManyParticles { count: num_particles, max: MAX_PARTICLES });
        }

        let num_frames = Self::read_value::<u64, _>(&mut reader)?;
        let timestep = Self::read_value::<f32, _>(&mut reader)?;
        let particle_radius = Self::read_value::<f32, _>(&mut reader)?;
        let box_size = Self::read_value::<Vec3, _>(&mut reader)?;

        self.num_particles = num_particles;
        self.num_frames = num_frames;

        Ok(FluidMetadata {
            num_particles,
            num_frames,
            timestep,
            particle_radius,
            box_size,
        })
    }

    /// Reads the next frame, or `None` once every frame has been read.
    pub fn decode_frame(&mut self) -> Result<Option<FluidFrameData>, DecodingError> {
        if self.current_frame >= self.num_frames {
            return Ok(None)
        }

        let path = frame_path(&self.path, self.num_frames, self.current_frame);
        let file = File::open(path)?;

        // Box size, section length, then the records.
        let expected = (size_of::<Vec3>() + size_of::<u64>()) as u64
            + self.num_particles * PARTICLE_RECORD_SIZE as u64;
        let found = file.metadata()?.len();
        if found < expected {
            return Err(DecodingError::Truncated { expected, found });
        }

        let mut reader = BufReader::new(file);

        let box_size = Self::read_value::<Vec3, _>(&mut reader)?;
        let particles = Self::read_section::<Particle, _>(&mut reader, self.num_particles)?;

        self.current_frame += 1;

        Ok(Some(FluidFrameData {
            box_size,
            particles,
        }))
    }

    pub fn reset(&mut self) {
        self.current_frame = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidMetadata {
    pub num_particles: u64,
    pub num_frames: u64,
    pub timestep: f32,
    pub particle_radius: f32,
    /// Box extents when the run started.
    pub box_size: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluidFrameData {
    pub box_size: Vec3,
    pub particles: Vec<Particle>,
}

impl FluidFrameData {
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.particles.iter().map(|p| p.position)
    }
}

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a fluid data directory (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("{count} particles exceed the supported maximum of {max}")]
    TooManyParticles { count: u64, max: u64 },
    #[error("frame file holds {found} bytes, expected at least {expected}")]
    Truncated { expected: u64, found: u64 },
    #[error("expected {expected} particle records, found {found}")]
    RecordCount { expected: u64, found: u64 },
}
