use std::{fs::File, io::{BufWriter, Write}, path::PathBuf};

use bytemuck::Pod;
use thiserror::Error;

use spume_fluids::{dispatch::Dispatch, scene::{Scene, SphScene}, Fluid};

use crate::{frame_path, EncodeFluid, MAGIC, META_FILE, VERSION};

/// Writes a simulation run as a directory of frame files.
pub struct FluidDataEncoder {
    /// The path to the directory into which the fluid data will be placed.
    path: PathBuf,
    num_frames: u64,
    current_frame: u64,
}

impl FluidDataEncoder {
    pub fn new(path: PathBuf, num_frames: u64) -> Result<FluidDataEncoder, EncodingError> {
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            num_frames,
            current_frame: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.current_frame
    }

    pub fn encode_metadata<X: Dispatch>(&mut self, scene: &SphScene<X>) -> Result<(), EncodingError> {
        let path = self.path.join(META_FILE);
        let mut writer = BufWriter::new(File::create(path)?);

        writer.write_all(&MAGIC)?;
        writer.write_all(&VERSION.to_ne_bytes())?;
        writer.write_all(&(scene.fluid.len() as u64).to_ne_bytes())?;
        writer.write_all(&self.num_frames.to_ne_bytes())?;
        writer.write_all(&scene.params().timestep.to_ne_bytes())?;
        writer.write_all(&scene.fluid.particle_radius().to_ne_bytes())?;
        writer.write_all(bytemuck::bytes_of(&scene.box_size()))?;
        writer.flush()?;

        log::info!("writing {} frames to {}", self.num_frames, self.path.display());

        Ok(())
    }

    pub fn encode_frame<F, P>(&mut self, scene: &Scene<F, P>) -> Result<(), EncodingError>
    where 
        F: Fluid<Params = P> + EncodeFluid,
    {
        if self.current_frame >= self.num_frames {
            return Err(EncodingError::TooManyFrames(self.num_frames));
        }

        let path = frame_path(&self.path, self.num_frames, self.current_frame);
        let mut encoder = FluidFrameEncoder::new(File::create(path)?);

        encoder.encode_value(&scene.box_size())?;
        scene.fluid.encode_state(&mut encoder)?;
        encoder.finish()?;

        self.current_frame += 1;

        Ok(())
    }
}

pub struct FluidFrameEncoder<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FluidFrameEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: BufWriter::new(writer) }
    }

    pub fn encode_value<T: Pod>(&mut self, value: &T) -> Result<(), EncodingError> {
        self.writer.write_all(bytemuck::bytes_of(value))?;

        Ok(())
    }

    /// Writes a length prefix followed by the raw values.
    pub fn encode_section<T: Pod>(&mut self, values: &[T]) -> Result<(), EncodingError> {
        self.writer.write_all(&(values.len() as u64).to_ne_bytes())?;
        self.writer.write_all(bytemuck::cast_slice(values))?;

        Ok(())
    }

    pub fn finish(mut self) -> Result<(), EncodingError> {
        self.writer.flush()?;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("all {0} frames have already been written")]
    TooManyFrames(u64),
}
