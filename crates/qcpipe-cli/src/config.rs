use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use qcpipe::solver::{OptimizationPolicy, SolverSettings};
use qcpipe::viz::grid::GridSpec;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Partial configuration loaded from a TOML file. Every field is
/// optional; precedence is CLI flag > config file > built-in default.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub solver: SolverSection,
    #[serde(default)]
    pub optimize: OptimizeSection,
    #[serde(default)]
    pub grid: GridSection,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct SolverSection {
    pub functional: Option<String>,
    pub basis: Option<String>,
    pub charge: Option<i32>,
    pub spin: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptimizeSection {
    pub max_iterations: Option<usize>,
    pub grad_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct GridSection {
    pub resolution: Option<usize>,
    pub padding: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }
}

/// Fully resolved run parameters.
#[derive(Debug, Clone)]
pub struct ResolvedRun {
    pub settings: SolverSettings,
    pub policy: OptimizationPolicy,
    pub grid: GridSpec,
}

pub fn resolve(args: &RunArgs) -> Result<ResolvedRun> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let mut settings = SolverSettings::default();
    if let Some(functional) = file.solver.functional {
        settings.functional = functional;
    }
    if let Some(basis) = file.solver.basis {
        settings.basis = basis;
    }
    if let Some(charge) = file.solver.charge {
        settings.charge = charge;
    }
    if let Some(spin) = file.solver.spin {
        settings.spin = spin;
    }
    if let Some(functional) = &args.functional {
        settings.functional = functional.clone();
    }
    if let Some(basis) = &args.basis {
        settings.basis = basis.clone();
    }
    if let Some(charge) = args.charge {
        settings.charge = charge;
    }
    if let Some(spin) = args.spin {
        settings.spin = spin;
    }

    let mut policy = OptimizationPolicy::default();
    if let Some(max_iterations) = file.optimize.max_iterations {
        policy.max_iterations = max_iterations;
    }
    if let Some(grad_tolerance) = file.optimize.grad_tolerance {
        policy.grad_tolerance = grad_tolerance;
    }
    if let Some(max_iterations) = args.max_iterations {
        policy.max_iterations = max_iterations;
    }
    if let Some(grad_tolerance) = args.grad_tolerance {
        policy.grad_tolerance = grad_tolerance;
    }
    if policy.max_iterations == 0 {
        return Err(CliError::Argument(
            "max-iterations must be positive".to_string(),
        ));
    }
    if !(policy.grad_tolerance > 0.0) {
        return Err(CliError::Argument(
            "grad-tolerance must be positive".to_string(),
        ));
    }

    let mut grid = GridSpec::default();
    if let Some(resolution) = file.grid.resolution {
        grid.resolution = resolution;
    }
    if let Some(padding) = file.grid.padding {
        grid.padding = padding;
    }
    if let Some(resolution) = args.grid_resolution {
        grid.resolution = resolution;
    }
    if grid.resolution < 2 {
        return Err(CliError::Argument(
            "grid resolution must be at least 2".to_string(),
        ));
    }

    Ok(ResolvedRun {
        settings,
        policy,
        grid,
    })
}
