use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::Parser;
use glam::{UVec3, Vec3};
use run::{run_sph, Controller, RunError};
use spume_fluids::{
    dispatch::{Serial, ThreadPool, DEFAULT_GROUP_SIZE},
    obstacle::sphere::Sphere,
    params::SphParams,
};
use spume_io::encode::FluidDataEncoder;

mod run;

/// Simulates an SPH fluid in a box and optionally writes every step to disk.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of steps to simulate.
    #[arg(short, long, default_value_t = 1000)]
    steps: u64,
    /// Directory to write frames into.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Particles per axis of the spawn lattice, as `x,y,z`.
    #[arg(long, value_parser = parse_uvec3)]
    lattice: Option<UVec3>,
    #[arg(long, value_parser = parse_vec3)]
    box_size: Option<Vec3>,
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    spawn_center: Option<Vec3>,
    #[arg(long)]
    radius: Option<f32>,
    #[arg(long)]
    jitter: Option<f32>,
    #[arg(long)]
    damping: Option<f32>,
    #[arg(long)]
    viscosity: Option<f32>,
    #[arg(long)]
    mass: Option<f32>,
    #[arg(long)]
    gas_constant: Option<f32>,
    #[arg(long)]
    rest_density: Option<f32>,
    #[arg(long)]
    timestep: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    gravity: Option<f32>,
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads. `0` uses one per logical core.
    #[arg(long, default_value_t = 0)]
    threads: usize,
    #[arg(long, default_value_t = DEFAULT_GROUP_SIZE)]
    group_size: usize,
    /// Run every stage on the calling thread.
    #[arg(long)]
    serial: bool,

    /// Centre of a collision sphere, as `x,y,z`.
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    sphere_center: Option<Vec3>,
    #[arg(long, default_value_t = 1.0)]
    sphere_radius: f32,
    /// Change in box width per step.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    box_rate: f32,
    /// Sphere displacement per step, as `x,y,z`.
    #[arg(long, value_parser = parse_vec3, default_value = "0,0,0", allow_hyphen_values = true)]
    sphere_velocity: Vec3,
}

impl Args {
    fn params(&self) -> SphParams {
        let defaults = SphParams::default();

        SphParams {
            num_to_spawn: self.lattice.unwrap_or(defaults.num_to_spawn),
            box_size: self.box_size.unwrap_or(defaults.box_size),
            spawn_center: self.spawn_center.unwrap_or(defaults.spawn_center),
            particle_radius: self.radius.unwrap_or(defaults.particle_radius),
            spawn_jitter: self.jitter.unwrap_or(defaults.spawn_jitter),
            bound_damping: self.damping.unwrap_or(defaults.bound_damping),
            viscosity: self.viscosity.unwrap_or(defaults.viscosity),
            particle_mass: self.mass.unwrap_or(defaults.particle_mass),
            gas_constant: self.gas_constant.unwrap_or(defaults.gas_constant),
            rest_density: self.rest_density.unwrap_or(defaults.rest_density),
            timestep: self.timestep.unwrap_or(defaults.timestep),
            gravity_y: self.gravity.unwrap_or(defaults.gravity_y),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }

    fn controller(&self) -> Controller {
        Controller {
            box_rate: self.box_rate,
            sphere: self.sphere_center.map(|center| Sphere::new(center, self.sphere_radius)),
            sphere_velocity: self.sphere_velocity,
        }
    }
}

fn parse_components<T: std::str::FromStr>(s: &str) -> Result<[T; 3], String> {
    let parts = s.split(',')
        .map(|part| part.trim().parse::<T>().map_err(|_| format!("invalid component `{part}`")))
        .collect::<Result<Vec<_>, _>>()?;

    <[T; 3]>::try_from(parts).map_err(|parts| format!("expected 3 components, got {}", parts.len()))
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    parse_components::<f32>(s).map(Vec3::from_array)
}

fn parse_uvec3(s: &str) -> Result<UVec3, String> {
    parse_components::<u32>(s).map(UVec3::from_array)
}

fn run(args: Args) -> Result<(), RunError> {
    let params = args.params();
    params.validate()?;

    let controller = args.controller();
    let encoder = args.output.clone()
        .map(|path| FluidDataEncoder::new(path, args.steps))
        .transpose()?;

    if args.serial {
        run_sph(params, Serial::new(args.group_size)?, args.steps, controller, encoder)
    } else {
        run_sph(params, ThreadPool::new(args.threads, args.group_size)?, args.steps, controller, encoder)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut message = err.to_string();
            let mut source = err.source();
            while let Some(cause) = source {
                message.push_str(&format!(": {cause}"));
                source = cause.source();
            }

            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1,-2.5, 3"), Ok(Vec3::new(1.0, -2.5, 3.0)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,x").is_err());
        assert_eq!(parse_uvec3("10,4,2"), Ok(UVec3::new(10, 4, 2)));
    }

    #[test]
    fn test_overrides_apply_to_defaults() {
        let args = Args::parse_from(["spume", "--lattice", "2,3,4", "--gravity", "-1", "--serial"]);
        let params = args.params();

        assert_eq!(params.num_to_spawn, UVec3::new(2, 3, 4));
        assert_eq!(params.gravity_y, -1.0);
        assert_eq!(params.box_size, SphParams::default().box_size);
        assert!(args.serial);
        assert!(args.controller().sphere.is_none());
    }
}
