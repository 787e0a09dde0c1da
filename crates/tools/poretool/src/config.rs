//! Recipe files
//!
//! A recipe names the grid shape, an optional seed and one generator:
//!
//! ```toml
//! shape = [200, 200]
//! seed = 7
//!
//! [generator]
//! kind = "rsa"
//! radius = 5
//! volume_fraction = 0.3
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use poregen::{
    BlobParams, ChunkOptions, CylinderParams, FiberTarget, GravityParams, Lattice, LatticeParams, NoiseParams,
    Normal, OverlappingParams, PolydisperseParams, RsaMode, RsaParams, Uniform, VoronoiParams,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Recipe {
    pub shape: Vec<usize>,
    /// Seed for the generator; a random seed is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Rsa {
        radius: usize,
        #[serde(default = "default_volume_fraction")]
        volume_fraction: f64,
        #[serde(default = "default_n_max")]
        n_max: usize,
        #[serde(default = "default_rsa_mode")]
        mode: String,
    },
    Overlapping {
        radius: f64,
        porosity: f64,
        #[serde(default = "default_iter_max")]
        iter_max: usize,
        #[serde(default = "default_tol")]
        tol: f64,
    },
    Polydisperse {
        porosity: f64,
        distribution: DistributionConfig,
        #[serde(default = "default_nbins")]
        nbins: usize,
        #[serde(default = "default_r_min")]
        r_min: f64,
    },
    Cylinders {
        radius: f64,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        porosity: Option<f64>,
        #[serde(default = "default_fiber_batches")]
        max_iter: usize,
        #[serde(default)]
        phi_max: f64,
        #[serde(default = "default_theta_max")]
        theta_max: f64,
        #[serde(default)]
        length: Option<f64>,
    },
    Voronoi {
        radius: f64,
        ncells: usize,
        #[serde(default = "default_flat_faces")]
        flat_faces: bool,
    },
    Gravity {
        radius: usize,
        #[serde(default)]
        clearance: isize,
        #[serde(default = "default_gravity_max_iter")]
        max_iter: usize,
    },
    Noise {
        #[serde(default)]
        porosity: Option<f64>,
        #[serde(default = "default_octaves")]
        octaves: u32,
        #[serde(default = "default_frequency")]
        frequency: Vec<usize>,
        #[serde(default = "default_persistence")]
        persistence: f64,
    },
    Blobs {
        /// Omit for the greyscale field
        #[serde(default)]
        porosity: Option<f64>,
        #[serde(default = "default_blobiness")]
        blobiness: Vec<f64>,
        /// Smooth in parallel blocks when set
        #[serde(default)]
        divs: Option<Vec<usize>>,
        #[serde(default)]
        cores: Option<usize>,
    },
    Lattice {
        radius: usize,
        #[serde(default)]
        spacing: Option<Vec<usize>>,
        #[serde(default)]
        offset: Option<Vec<usize>>,
        #[serde(default = "default_smooth")]
        smooth: bool,
        #[serde(default = "default_lattice")]
        lattice: String,
    },
    Tubes {
        #[serde(default = "default_tube_spacing")]
        spacing: usize,
    },
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionConfig {
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
}

fn default_volume_fraction() -> f64 {
    1.0
}

fn default_n_max() -> usize {
    10_000
}

fn default_rsa_mode() -> String {
    "contained".to_string()
}

fn default_iter_max() -> usize {
    10
}

fn default_tol() -> f64 {
    0.01
}

fn default_nbins() -> usize {
    5
}

fn default_r_min() -> f64 {
    5.0
}

fn default_fiber_batches() -> usize {
    3
}

fn default_theta_max() -> f64 {
    90.0
}

fn default_gravity_max_iter() -> usize {
    1000
}

fn default_octaves() -> u32 {
    3
}

fn default_frequency() -> Vec<usize> {
    vec![2]
}

fn default_persistence() -> f64 {
    0.5
}

fn default_blobiness() -> Vec<f64> {
    vec![1.0]
}

fn default_smooth() -> bool {
    true
}

fn default_flat_faces() -> bool {
    true
}

fn default_lattice() -> String {
    "sc".to_string()
}

fn default_tube_spacing() -> usize {
    25
}

/// Radius distribution for polydisperse packings.
#[derive(Debug, Clone, Copy)]
pub enum Distribution {
    Normal(Normal),
    Uniform(Uniform),
}

/// A recipe resolved into generator parameters.
#[derive(Debug, Clone)]
pub enum Plan {
    Rsa(RsaParams),
    Overlapping(OverlappingParams),
    Polydisperse(PolydisperseParams, Distribution),
    Cylinders(FiberTarget, CylinderParams),
    Voronoi(VoronoiParams),
    Gravity(GravityParams),
    Noise(NoiseParams),
    Blobs(BlobParams),
    Lattice(LatticeParams),
    Tubes(usize),
}

impl Plan {
    pub fn name(&self) -> &'static str {
        match self {
            Plan::Rsa(_) => "rsa",
            Plan::Overlapping(_) => "overlapping",
            Plan::Polydisperse(..) => "polydisperse",
            Plan::Cylinders(..) => "cylinders",
            Plan::Voronoi(_) => "voronoi",
            Plan::Gravity(_) => "gravity",
            Plan::Noise(_) => "noise",
            Plan::Blobs(_) => "blobs",
            Plan::Lattice(_) => "lattice",
            Plan::Tubes(_) => "tubes",
        }
    }
}

impl Recipe {
    /// Resolve names and optional fields into typed parameters.
    ///
    /// Only string-valued and either/or options are checked here; numeric
    /// ranges are left to the generators, which reject them before doing
    /// any work.
    pub fn plan(&self) -> Result<Plan> {
        if !(2..=3).contains(&self.shape.len()) {
            bail!("shape must have 2 or 3 entries, got {:?}", self.shape);
        }
        if self.shape.contains(&0) {
            bail!("shape {:?} has an empty axis", self.shape);
        }

        let plan = match self.generator.clone() {
            GeneratorConfig::Rsa {
                radius,
                volume_fraction,
                n_max,
                mode,
            } => Plan::Rsa(RsaParams {
                radius,
                volume_fraction,
                n_max,
                mode: mode.parse::<RsaMode>()?,
            }),
            GeneratorConfig::Overlapping {
                radius,
                porosity,
                iter_max,
                tol,
            } => Plan::Overlapping(OverlappingParams {
                radius,
                porosity,
                iter_max,
                tol,
            }),
            GeneratorConfig::Polydisperse {
                porosity,
                distribution,
                nbins,
                r_min,
            } => {
                let dist = match distribution {
                    DistributionConfig::Normal { mean, std_dev } => {
                        Distribution::Normal(Normal { mean, std_dev })
                    }
                    DistributionConfig::Uniform { low, high } => {
                        Distribution::Uniform(Uniform { low, high })
                    }
                };
                Plan::Polydisperse(
                    PolydisperseParams {
                        porosity,
                        nbins,
                        r_min,
                    },
                    dist,
                )
            }
            GeneratorConfig::Cylinders {
                radius,
                count,
                porosity,
                max_iter,
                phi_max,
                theta_max,
                length,
            } => {
                if self.shape.len() != 3 {
                    bail!("cylinders need a 3-D shape");
                }
                let target = FiberTarget::from_options(count, porosity, max_iter)?;
                Plan::Cylinders(
                    target,
                    CylinderParams {
                        radius,
                        phi_max,
                        theta_max,
                        length,
                    },
                )
            }
            GeneratorConfig::Voronoi {
                radius,
                ncells,
                flat_faces,
            } => {
                if self.shape.len() != 3 {
                    bail!("voronoi edges need a 3-D shape");
                }
                Plan::Voronoi(VoronoiParams {
                    radius,
                    ncells,
                    flat_faces,
                })
            }
            GeneratorConfig::Gravity {
                radius,
                clearance,
                max_iter,
            } => Plan::Gravity(GravityParams {
                radius,
                clearance,
                max_iter,
            }),
            GeneratorConfig::Noise {
                porosity,
                octaves,
                frequency,
                persistence,
            } => Plan::Noise(NoiseParams {
                porosity,
                octaves,
                frequency,
                persistence,
            }),
            GeneratorConfig::Blobs {
                porosity,
                blobiness,
                divs,
                cores,
            } => Plan::Blobs(BlobParams {
                porosity,
                blobiness,
                chunks: divs.map(|divs| ChunkOptions { divs, cores }),
            }),
            GeneratorConfig::Lattice {
                radius,
                spacing,
                offset,
                smooth,
                lattice,
            } => Plan::Lattice(LatticeParams {
                radius,
                spacing,
                offset,
                smooth,
                lattice: Lattice::parse(&lattice, self.shape.len())?,
            }),
            GeneratorConfig::Tubes { spacing } => Plan::Tubes(spacing),
        };
        Ok(plan)
    }
}

/// Load a recipe from a TOML file.
pub fn load_recipe(path: &Path) -> Result<Recipe> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read recipe {}", path.display()))?;
    parse_recipe(&text).with_context(|| format!("invalid recipe {}", path.display()))
}

pub fn parse_recipe(text: &str) -> Result<Recipe> {
    Ok(toml::from_str(text)?)
}
