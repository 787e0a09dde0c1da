//! poretool - generate synthetic porous media from TOML recipes

mod config;
mod preview;
mod progress;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use poregen::{NoiseField, Progress};
use voxel::Grid;

use crate::config::{Distribution, Plan, Recipe, load_recipe};
use crate::progress::BarProgress;

#[derive(Parser)]
#[command(name = "poretool")]
#[command(about = "Synthetic porous-media generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the image described by a recipe
    Run {
        /// Recipe file (.toml)
        recipe: PathBuf,

        /// Seed override; takes precedence over the recipe
        #[arg(long)]
        seed: Option<u64>,

        /// Print the middle slice as ASCII art
        #[arg(long)]
        preview: bool,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse and validate a recipe without generating
    Check {
        /// Recipe file (.toml)
        recipe: PathBuf,
    },
}

/// Generated image plus generator-specific counters for the summary.
struct Outcome {
    image: NoiseField,
    counters: Vec<(&'static str, String)>,
}

impl Outcome {
    fn binary(image: Grid<bool>) -> Self {
        Self {
            image: NoiseField::Binary(image),
            counters: Vec::new(),
        }
    }

    fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.counters.push((name, value.to_string()));
        self
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            recipe,
            seed,
            preview,
            quiet,
        } => {
            run_command(recipe, seed, preview, quiet)?;
        }
        Commands::Check { recipe } => {
            check_command(recipe)?;
        }
    }

    Ok(())
}

fn check_command(path: PathBuf) -> Result<()> {
    let recipe = load_recipe(&path)?;
    let plan = recipe.plan()?;
    println!(
        "{}: {} generator on a {:?} grid",
        path.display(),
        plan.name(),
        recipe.shape
    );
    Ok(())
}

fn run_command(path: PathBuf, seed: Option<u64>, preview: bool, quiet: bool) -> Result<()> {
    let recipe = load_recipe(&path)?;
    let plan = recipe.plan()?;
    let seed = seed
        .or(recipe.seed)
        .unwrap_or_else(|| rand::rng().random());
    info!(
        "Running {} on {:?} with seed {}",
        plan.name(),
        recipe.shape,
        seed
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut bar = if quiet {
        BarProgress::hidden()
    } else {
        BarProgress::new()
    };
    let started = Instant::now();
    let outcome = generate(&recipe, &plan, &mut rng, &mut bar);
    bar.finish();
    let outcome = outcome?;

    let porosity = match &outcome.image {
        NoiseField::Binary(image) => format!("{:.4}", image.fraction_true()),
        NoiseField::Raw(_) => "n/a (greyscale)".to_string(),
    };
    info!(
        "{} finished in {:.2?}: shape {:?}, porosity {}",
        plan.name(),
        started.elapsed(),
        outcome.image.shape(),
        porosity
    );
    for (name, value) in &outcome.counters {
        info!("  {}: {}", name, value);
    }

    if preview {
        let text = match &outcome.image {
            NoiseField::Binary(image) => preview::binary_preview(image),
            NoiseField::Raw(field) => preview::field_preview(field),
        };
        println!("{}", text);
    }
    Ok(())
}

fn generate(recipe: &Recipe, plan: &Plan, rng: &mut StdRng, bar: &mut dyn Progress) -> Result<Outcome> {
    let shape = recipe.shape.as_slice();
    let outcome = match plan {
        Plan::Rsa(params) => {
            let empty = Grid::new(shape, false);
            let packing = poregen::rsa_with_progress(&empty, params, rng, bar)?;
            // The packing marks spheres as `true`; report them as solid
            Outcome::binary(!&packing.image)
                .with("spheres", packing.inserted)
                .with("volume fraction", format!("{:.4}", packing.volume_fraction))
        }
        Plan::Overlapping(params) => {
            let out = poregen::overlapping_spheres_with_progress(shape, params, rng, bar)?;
            let cal = out.calibration;
            Outcome::binary(out.image)
                .with("seeds", cal.parameter)
                .with("rounds", cal.iterations)
                .with("converged", cal.converged)
        }
        Plan::Polydisperse(params, dist) => {
            let out = match dist {
                Distribution::Normal(d) => poregen::polydisperse_spheres(shape, d, params, rng)?,
                Distribution::Uniform(d) => poregen::polydisperse_spheres(shape, d, params, rng)?,
            };
            let radii: Vec<String> = out.radii.iter().map(|r| format!("{:.2}", r)).collect();
            Outcome::binary(out.image).with("radii", radii.join(", "))
        }
        Plan::Cylinders(target, params) => {
            let mat = poregen::cylinders_with_progress(shape, target, params, rng, bar)?;
            Outcome::binary(mat.image)
                .with("fibers", mat.fibers)
                .with("batches", mat.batches.len())
        }
        Plan::Voronoi(params) => {
            let out = poregen::voronoi_edges_with_progress(shape, params, rng, bar)?;
            Outcome::binary(out.image)
                .with("voronoi vertices", out.tessellation.vertices.len())
                .with("edges drawn", out.drawn)
        }
        Plan::Gravity(params) => {
            let open = Grid::new(shape, true);
            let packing = poregen::pseudo_gravity_packing_with_progress(&open, params, rng, bar)?;
            Outcome::binary(packing.image).with("spheres", packing.inserted)
        }
        Plan::Noise(params) => Outcome {
            image: poregen::perlin_noise_with_progress(shape, params, rng, bar)?,
            counters: Vec::new(),
        }
        .with("octaves", params.octaves),
        Plan::Blobs(params) => Outcome {
            image: poregen::blobs(shape, params, rng)?,
            counters: Vec::new(),
        },
        Plan::Lattice(params) => {
            Outcome::binary(poregen::lattice_spheres(shape, params)?).with("lattice", params.lattice)
        }
        Plan::Tubes(spacing) => {
            Outcome::binary(poregen::bundle_of_tubes(shape, *spacing, rng)?).with("spacing", spacing)
        }
    };
    Ok(outcome)
}
