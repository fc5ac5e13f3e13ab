use crate::cli::RunArgs;
use crate::config;
use crate::error::{CliError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use qcpipe::core::io::parse_structure;
use qcpipe::core::models::ids::CalculationId;
use qcpipe::engine::progress::{DEFAULT_IDLE_TIMEOUT, ProgressEvent};
use qcpipe::engine::registry::{CalculationMethod, CalculationRecord, CalculationStatus};
use qcpipe::solver::model::ModelSolver;
use qcpipe::viz::grid::VolumetricGrid;
use qcpipe::workflows::service::{CalculationRequest, CalculationService};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub async fn run(args: RunArgs) -> Result<()> {
    let resolved = config::resolve(&args)?;

    let content = std::fs::read_to_string(&args.input)?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.xyz");
    let molecule = parse_structure(filename, &content).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;
    info!(molecule = %molecule.name, atoms = molecule.num_atoms(), "structure loaded");

    let service = CalculationService::new(ModelSolver);
    let molecule_id = service.add_molecule(molecule);
    let method: CalculationMethod = args.method.into();

    let record = service.submit(CalculationRequest {
        molecule_id,
        method,
        settings: resolved.settings,
        policy: resolved.policy,
    })?;

    let record = if method == CalculationMethod::Optimize {
        watch_progress(&service, record.id, resolved.policy.max_iterations).await?
    } else {
        wait_terminal(&service, record.id).await?
    };

    if record.status == CalculationStatus::Failed {
        return Err(CliError::Calculation(
            record
                .error
                .unwrap_or_else(|| "no failure message recorded".to_string()),
        ));
    }

    write_record(&record, args.output.as_deref())?;

    if let Some(index) = args.orbital {
        let grid = service
            .orbital_grid(record.id, index, resolved.grid.clone())
            .await?;
        write_grid(&grid, args.grid_output.as_deref())?;
    } else if args.density {
        let grid = service.density_grid(record.id, resolved.grid).await?;
        write_grid(&grid, args.grid_output.as_deref())?;
    }

    Ok(())
}

/// Drives the progress stream, mirroring optimizer iterations onto a
/// progress bar, then returns the terminal record.
async fn watch_progress(
    service: &CalculationService<ModelSolver>,
    id: CalculationId,
    max_iterations: usize,
) -> Result<CalculationRecord> {
    let mut stream = service.subscribe(id, DEFAULT_IDLE_TIMEOUT)?;

    let pb = ProgressBar::new(max_iterations as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] iteration {pos}/{len} {msg}",
        )
        .unwrap()
        .progress_chars("#>-"),
    );
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr_with_hz(10));

    while let Some(event) = stream.next().await {
        match event {
            ProgressEvent::Progress {
                iteration,
                energy,
                grad_norm,
                ..
            } => {
                pb.set_position(iteration as u64);
                pb.set_message(format!("E = {energy:.6} Ha, |g| = {grad_norm:.2e}"));
            }
            ProgressEvent::Completed {
                converged,
                iterations,
                final_energy,
                ..
            } => {
                if converged {
                    pb.finish_with_message(format!(
                        "✓ Converged in {iterations} iterations, E = {final_energy:.6} Ha"
                    ));
                } else {
                    pb.finish_with_message(format!(
                        "✗ Not converged after {iterations} iterations"
                    ));
                }
            }
            ProgressEvent::Error { .. } => {
                pb.finish_with_message("✗ Calculation failed.");
            }
            ProgressEvent::Heartbeat => {
                pb.tick();
            }
        }
    }

    wait_terminal(service, id).await
}

async fn wait_terminal(
    service: &CalculationService<ModelSolver>,
    id: CalculationId,
) -> Result<CalculationRecord> {
    loop {
        let record = service.get(id)?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

fn write_record(record: &CalculationRecord, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(record).map_err(anyhow::Error::from)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Result written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn write_grid(grid: &VolumetricGrid, output: Option<&Path>) -> Result<()> {
    // clap guarantees a grid path whenever an export flag is set.
    let Some(path) = output else {
        return Err(CliError::Argument(
            "volumetric export requires --grid-output".to_string(),
        ));
    };
    let json = serde_json::to_string(grid).map_err(anyhow::Error::from)?;
    std::fs::write(path, json)?;
    println!("Volumetric grid written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MethodArg;
    use std::path::PathBuf;

    const WATER_XYZ: &str = "3\nwater\nO 0.0 0.0 0.117\nH 0.0 0.757 -0.467\nH 0.0 -0.757 -0.467\n";

    fn run_args(input: PathBuf) -> RunArgs {
        RunArgs {
            input,
            method: MethodArg::Energy,
            config: None,
            output: None,
            functional: None,
            basis: None,
            charge: None,
            spin: None,
            max_iterations: None,
            grad_tolerance: None,
            orbital: None,
            density: false,
            grid_output: None,
            grid_resolution: None,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn energy_run_writes_a_completed_record() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("water.xyz");
        std::fs::write(&input, WATER_XYZ).unwrap();
        let output = dir.path().join("result.json");

        let mut args = run_args(input);
        args.output = Some(output.clone());
        run(args).await.unwrap();

        let json = std::fs::read_to_string(output).unwrap();
        let record: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(record["status"], "completed");
        assert!(record["energy"].as_f64().unwrap() < 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn density_export_writes_a_grid_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("water.xyz");
        std::fs::write(&input, WATER_XYZ).unwrap();
        let output = dir.path().join("result.json");
        let grid_output = dir.path().join("density.json");

        let mut args = run_args(input);
        args.output = Some(output);
        args.density = true;
        args.grid_output = Some(grid_output.clone());
        args.grid_resolution = Some(8);
        run(args).await.unwrap();

        let json = std::fs::read_to_string(grid_output).unwrap();
        let grid: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(grid["nx"], 8);
        assert!(!grid["field_base64"].as_str().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn missing_input_file_reports_io_error() {
        let args = run_args(PathBuf::from("/nonexistent/molecule.xyz"));
        assert!(matches!(run(args).await, Err(CliError::Io(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn optimize_run_records_the_relaxed_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("water.xyz");
        std::fs::write(&input, WATER_XYZ).unwrap();
        let output = dir.path().join("result.json");

        let mut args = run_args(input);
        args.method = MethodArg::Optimize;
        args.output = Some(output.clone());
        run(args).await.unwrap();

        let json = std::fs::read_to_string(output).unwrap();
        let record: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(record["status"], "completed");
        assert_eq!(record["converged"], true);
        assert_eq!(record["optimized_positions"].as_array().unwrap().len(), 9);
    }
}
