use std::{io::Write, path::{Path, PathBuf}};

use encode::{EncodingError, FluidFrameEncoder};
use spume_fluids::{dispatch::Dispatch, sph::SphFluid};

pub mod encode;
pub mod decode;

/// First bytes of every metadata file.
pub const MAGIC: [u8; 4] = *b"SPUM";
pub const VERSION: u16 = 1;

const META_FILE: &str = "_meta";

pub trait EncodeFluid {
    fn encode_state<W: Write>(&self, encoder: &mut FluidFrameEncoder<W>) -> Result<(), EncodingError>;
}

impl<X: Dispatch> EncodeFluid for SphFluid<X> {
    fn encode_state<W: Write>(&self, encoder: &mut FluidFrameEncoder<W>) -> Result<(), EncodingError> {
        encoder.encode_section(&self.particles().records())
    }
}

/// Frame files are numbered from zero and padded to the width of the last frame number.
fn frame_path(dir: &Path, num_frames: u64, frame: u64) -> PathBuf {
    let max_digits = num_frames.saturating_sub(1).checked_ilog10().unwrap_or(0) + 1;
    let digits = frame.checked_ilog10().unwrap_or(0) + 1;
    let zeros = max_digits.saturating_sub(digits);

    dir.join(format!("{}{frame}.dat", "0".repeat(zeros as usize)))
}
