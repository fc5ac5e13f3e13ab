//! The calculation orchestration service.
//!
//! Owns the process-wide state (molecule store, registry, result cache,
//! progress hub) and the two worker pools, and wires the pipeline
//! stages to them. Submission is fire-and-forget; results are observed
//! through the registry, the progress stream, or a visualization query.

use crate::core::models::ids::{CalculationId, MoleculeId};
use crate::core::models::molecule::Molecule;
use crate::engine::cache::{CachedResult, ResultCache};
use crate::engine::error::EngineError;
use crate::engine::pool::WorkerPool;
use crate::engine::progress::{ProgressEvent, ProgressHub, ProgressStream};
use crate::engine::registry::{CalculationMethod, CalculationRecord, CalculationRegistry};
use crate::engine::store::MoleculeStore;
use crate::solver::{OptimizationPolicy, ScfSolver, SolverSettings};
use crate::viz::grid::{GridSpec, VolumetricGrid};
use crate::viz::sampler;
use crate::workflows::{energy, frequency, optimize};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Submission payload for a new calculation. `policy` only applies to
/// the optimize method.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculationRequest {
    pub molecule_id: MoleculeId,
    pub method: CalculationMethod,
    #[serde(default)]
    pub settings: SolverSettings,
    #[serde(default)]
    pub policy: OptimizationPolicy,
}

pub struct CalculationService<S: ScfSolver> {
    solver: Arc<S>,
    molecules: Arc<MoleculeStore>,
    registry: Arc<CalculationRegistry>,
    results: Arc<ResultCache<S::Context>>,
    progress: Arc<ProgressHub>,
    solver_pool: WorkerPool,
    viz_pool: WorkerPool,
}

impl<S: ScfSolver> CalculationService<S> {
    /// Must be constructed inside a tokio runtime; submission dispatches
    /// onto it.
    pub fn new(solver: S) -> Self {
        Self {
            solver: Arc::new(solver),
            molecules: Arc::new(MoleculeStore::new()),
            registry: Arc::new(CalculationRegistry::new()),
            results: Arc::new(ResultCache::new()),
            progress: Arc::new(ProgressHub::new()),
            solver_pool: WorkerPool::new("solver", 1),
            viz_pool: WorkerPool::new("viz", 2),
        }
    }

    pub fn add_molecule(&self, molecule: Molecule) -> MoleculeId {
        self.molecules.add(molecule)
    }

    pub fn molecule(&self, id: MoleculeId) -> Result<Arc<Molecule>, EngineError> {
        self.molecules.get(id).ok_or(EngineError::MoleculeNotFound(id))
    }

    /// Creates a PENDING record and dispatches the calculation onto the
    /// solver pool. An unknown molecule id is reported here, before any
    /// record exists.
    pub fn submit(&self, request: CalculationRequest) -> Result<CalculationRecord, EngineError> {
        let molecule = self
            .molecules
            .get(request.molecule_id)
            .ok_or(EngineError::MoleculeNotFound(request.molecule_id))?;

        let id = CalculationId::new();
        let record = self.registry.create(id, request.molecule_id, request.method)?;
        if request.method == CalculationMethod::Optimize {
            self.progress.open(id);
        }
        info!(%id, method = ?request.method, molecule = %molecule.name, "calculation submitted");

        let solver = Arc::clone(&self.solver);
        let registry = Arc::clone(&self.registry);
        let results = Arc::clone(&self.results);
        let progress = Arc::clone(&self.progress);
        let abort_registry = Arc::clone(&self.registry);
        let abort_progress = Arc::clone(&self.progress);

        self.solver_pool.dispatch(
            move || execute(&*solver, &molecule, &registry, &results, &progress, id, &request),
            move |message| {
                abort_registry.update(id, |r| r.mark_running());
                abort_registry.update(id, |r| r.mark_failed(message.clone()));
                if let Some(sink) = abort_progress.sink(id) {
                    sink.send(ProgressEvent::Error { message });
                }
            },
        );
        Ok(record)
    }

    /// Snapshot of a calculation record.
    pub fn get(&self, id: CalculationId) -> Result<CalculationRecord, EngineError> {
        self.registry
            .get(id)
            .ok_or(EngineError::CalculationNotFound(id))
    }

    /// Claims the progress stream for an optimize calculation.
    pub fn subscribe(
        &self,
        id: CalculationId,
        idle_timeout: Duration,
    ) -> Result<ProgressStream, EngineError> {
        if self.registry.get(id).is_none() {
            return Err(EngineError::CalculationNotFound(id));
        }
        self.progress.subscribe(id, idle_timeout).ok_or_else(|| {
            EngineError::InvalidInput(format!("no live progress stream for calculation {id}"))
        })
    }

    /// Samples one molecular orbital over the cached result. Runs on the
    /// visualization pool, so it never waits behind a dispatched
    /// calculation.
    pub async fn orbital_grid(
        &self,
        id: CalculationId,
        orbital_index: usize,
        spec: GridSpec,
    ) -> Result<VolumetricGrid, EngineError> {
        let entry = self.cached(id)?;
        // Bounds check before dispatch, so a bad index never occupies a
        // pool slot.
        let num_orbitals = entry.solution.orbital_coeffs.ncols();
        if orbital_index >= num_orbitals {
            return Err(EngineError::InvalidInput(format!(
                "orbital index {orbital_index} out of range (have {num_orbitals} orbitals)"
            )));
        }
        let solver = Arc::clone(&self.solver);
        self.viz_pool
            .run(move || {
                sampler::orbital_field(&*solver, &entry.context, &entry.solution, orbital_index, &spec)
            })
            .await?
    }

    /// Samples the electron density over the cached result.
    pub async fn density_grid(
        &self,
        id: CalculationId,
        spec: GridSpec,
    ) -> Result<VolumetricGrid, EngineError> {
        let entry = self.cached(id)?;
        let solver = Arc::clone(&self.solver);
        self.viz_pool
            .run(move || sampler::density_field(&*solver, &entry.context, &entry.solution, &spec))
            .await?
    }

    fn cached(&self, id: CalculationId) -> Result<CachedResult<S::Context>, EngineError> {
        self.results.get(id).ok_or_else(|| {
            if self.registry.get(id).is_some() {
                EngineError::ResultNotCached(id)
            } else {
                EngineError::CalculationNotFound(id)
            }
        })
    }
}

/// Runs one calculation end to end on the worker thread. Every failure
/// path lands in the registry; nothing propagates out of the pool.
fn execute<S: ScfSolver>(
    solver: &S,
    molecule: &Molecule,
    registry: &CalculationRegistry,
    results: &ResultCache<S::Context>,
    progress: &ProgressHub,
    id: CalculationId,
    request: &CalculationRequest,
) {
    registry.update(id, |r| r.mark_running());

    match request.method {
        CalculationMethod::Energy => match energy::run(solver, molecule, &request.settings) {
            Ok(stage) => {
                let energy = stage.solution.energy;
                let properties = stage.properties;
                results.insert(id, stage.context, stage.solution);
                registry.update(id, move |r| {
                    r.energy = Some(energy);
                    r.properties = Some(properties);
                    r.mark_completed();
                });
            }
            Err(err) => fail(registry, progress, id, err.to_string()),
        },

        CalculationMethod::Frequency => match frequency::run(solver, molecule, &request.settings) {
            Ok(stage) => {
                let energy = stage.solution.energy;
                let properties = stage.properties;
                let analysis = stage.analysis;
                results.insert(id, stage.context, stage.solution);
                registry.update(id, move |r| {
                    r.energy = Some(energy);
                    r.properties = Some(properties);
                    r.frequencies = Some(analysis);
                    r.mark_completed();
                });
            }
            Err(err) => fail(registry, progress, id, err.to_string()),
        },

        CalculationMethod::Optimize => {
            let sink = progress.sink(id);
            let mut emit = |event: ProgressEvent| {
                if let Some(sink) = &sink {
                    sink.send(event);
                }
            };

            match optimize::run(solver, molecule, &request.settings, &request.policy, &mut emit) {
                Ok(stage) => {
                    let optimize::OptimizeStage {
                        context,
                        solution,
                        properties,
                        converged,
                        iterations,
                        final_grad_norm,
                        positions_angstrom,
                    } = stage;
                    let final_energy = solution.energy;
                    results.insert(id, context, solution);

                    let completed = ProgressEvent::Completed {
                        converged,
                        iterations,
                        final_energy,
                        final_grad_norm,
                        properties: properties.clone(),
                        positions: positions_angstrom.clone(),
                    };
                    registry.update(id, move |r| {
                        r.energy = Some(final_energy);
                        r.properties = Some(properties);
                        r.converged = Some(converged);
                        r.iterations = Some(iterations);
                        r.final_grad_norm = Some(final_grad_norm);
                        r.optimized_positions = Some(positions_angstrom);
                        r.mark_completed();
                    });
                    emit(completed);
                }
                Err(err) => fail(registry, progress, id, err.to_string()),
            }
        }
    }
}

fn fail(
    registry: &CalculationRegistry,
    progress: &ProgressHub,
    id: CalculationId,
    message: String,
) {
    error!(%id, %message, "calculation failed");
    registry.update(id, |r| r.mark_failed(message.clone()));
    if let Some(sink) = progress.sink(id) {
        sink.send(ProgressEvent::Error { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::xyz::parse_xyz;
    use crate::engine::registry::CalculationStatus;
    use crate::solver::model::ModelSolver;

    fn water() -> Molecule {
        parse_xyz("3\nwater\nO 0.0 0.0 0.117\nH 0.0 0.757 -0.467\nH 0.0 -0.757 -0.467\n").unwrap()
    }

    fn hydrogen() -> Molecule {
        parse_xyz("2\nhydrogen\nH 0.0 0.0 0.0\nH 0.0 0.0 0.9\n").unwrap()
    }

    fn request(molecule_id: MoleculeId, method: CalculationMethod) -> CalculationRequest {
        CalculationRequest {
            molecule_id,
            method,
            settings: SolverSettings::default(),
            policy: OptimizationPolicy::default(),
        }
    }

    async fn wait_terminal(
        service: &CalculationService<ModelSolver>,
        id: CalculationId,
    ) -> CalculationRecord {
        for _ in 0..1000 {
            let record = service.get(id).unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("calculation never reached a terminal state");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn energy_calculation_runs_to_completion() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(water());

        let record = service
            .submit(request(molecule_id, CalculationMethod::Energy))
            .unwrap();
        assert_eq!(record.status, CalculationStatus::Pending);

        let done = wait_terminal(&service, record.id).await;
        assert_eq!(done.status, CalculationStatus::Completed);
        let energy = done.energy.unwrap();
        assert!(energy.is_finite() && energy < 0.0);

        let properties = done.properties.unwrap();
        assert!(properties.dipole_magnitude > 0.0);
        assert!(done.error.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unknown_molecule_is_rejected_before_dispatch() {
        let service = CalculationService::new(ModelSolver);
        let err = service
            .submit(request(MoleculeId::new(), CalculationMethod::Energy))
            .unwrap_err();
        assert!(matches!(err, EngineError::MoleculeNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn unknown_calculation_id_is_not_found() {
        let service = CalculationService::new(ModelSolver);
        let err = service.get(CalculationId::new()).unwrap_err();
        assert!(matches!(err, EngineError::CalculationNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failing_build_lands_in_the_failed_state() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(Molecule::new("empty"));

        let record = service
            .submit(request(molecule_id, CalculationMethod::Energy))
            .unwrap();
        let done = wait_terminal(&service, record.id).await;

        assert_eq!(done.status, CalculationStatus::Failed);
        assert!(done.error.is_some());
        assert!(done.energy.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn optimize_streams_progress_then_exactly_one_terminal_event() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(water());

        let record = service
            .submit(request(molecule_id, CalculationMethod::Optimize))
            .unwrap();
        let mut stream = service
            .subscribe(record.id, Duration::from_secs(10))
            .unwrap();

        let mut progress_events = 0;
        let mut completed = None;
        while let Some(event) = stream.next().await {
            match event {
                ProgressEvent::Progress { iteration, positions, .. } => {
                    progress_events += 1;
                    assert_eq!(iteration, progress_events);
                    assert_eq!(positions.len(), 9);
                }
                ProgressEvent::Completed { converged, positions, .. } => {
                    assert!(completed.is_none(), "second terminal event");
                    completed = Some((converged, positions));
                }
                ProgressEvent::Error { message } => panic!("unexpected failure: {message}"),
                ProgressEvent::Heartbeat => {}
            }
        }

        assert!(progress_events >= 1);
        let (converged, positions) = completed.expect("no terminal event");
        assert!(converged);
        assert_eq!(positions.len(), 9);

        let done = wait_terminal(&service, record.id).await;
        assert_eq!(done.status, CalculationStatus::Completed);
        let start = water().positions_flat();
        for (a, b) in start.iter().zip(done.optimized_positions.unwrap()) {
            assert!((a - b).abs() < 5.0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn back_to_back_optimizations_do_not_share_streams() {
        let service = CalculationService::new(ModelSolver);
        let water_id = service.add_molecule(water());
        let hydrogen_id = service.add_molecule(hydrogen());

        let first = service
            .submit(request(water_id, CalculationMethod::Optimize))
            .unwrap();
        let second = service
            .submit(request(hydrogen_id, CalculationMethod::Optimize))
            .unwrap();

        let mut first_stream = service.subscribe(first.id, Duration::from_secs(10)).unwrap();
        let mut second_stream = service
            .subscribe(second.id, Duration::from_secs(10))
            .unwrap();

        // Every event on each stream must carry that molecule's 3N
        // coordinates.
        while let Some(event) = first_stream.next().await {
            match event {
                ProgressEvent::Progress { positions, .. }
                | ProgressEvent::Completed { positions, .. } => assert_eq!(positions.len(), 9),
                ProgressEvent::Error { message } => panic!("unexpected failure: {message}"),
                ProgressEvent::Heartbeat => {}
            }
        }
        while let Some(event) = second_stream.next().await {
            match event {
                ProgressEvent::Progress { positions, .. }
                | ProgressEvent::Completed { positions, .. } => assert_eq!(positions.len(), 6),
                ProgressEvent::Error { message } => panic!("unexpected failure: {message}"),
                ProgressEvent::Heartbeat => {}
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn frequency_calculation_records_one_mode_per_degree_of_freedom() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(water());

        let record = service
            .submit(request(molecule_id, CalculationMethod::Frequency))
            .unwrap();
        let done = wait_terminal(&service, record.id).await;

        assert_eq!(done.status, CalculationStatus::Completed);
        let analysis = done.frequencies.unwrap();
        assert_eq!(analysis.num_frequencies, 9);
        assert_eq!(analysis.normal_modes.len(), 9);

        // The single-point solve behind the Hessian is reported too.
        assert!(done.energy.is_some());
        let properties = done.properties.unwrap();
        assert_eq!(properties.orbital_energies_ev.len(), 3);
        assert!(properties.dipole_magnitude > 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn visualization_reads_the_cached_result() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(water());

        let record = service
            .submit(request(molecule_id, CalculationMethod::Energy))
            .unwrap();
        wait_terminal(&service, record.id).await;

        let spec = GridSpec {
            resolution: 6,
            padding: 4.0,
        };
        let grid = service
            .orbital_grid(record.id, 0, spec.clone())
            .await
            .unwrap();
        assert_eq!((grid.nx, grid.ny, grid.nz), (6, 6, 6));
        assert_eq!(grid.field.len(), 216);

        let density = service.density_grid(record.id, spec).await.unwrap();
        assert!(density.field.iter().all(|v| *v >= -1e-6));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn out_of_range_orbital_index_is_invalid_input() {
        let service = CalculationService::new(ModelSolver);
        let molecule_id = service.add_molecule(water());

        let record = service
            .submit(request(molecule_id, CalculationMethod::Energy))
            .unwrap();
        wait_terminal(&service, record.id).await;

        let err = service
            .orbital_grid(record.id, 99, GridSpec { resolution: 6, padding: 4.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn visualization_for_unknown_calculation_is_not_found() {
        let service = CalculationService::new(ModelSolver);
        let err = service
            .density_grid(CalculationId::new(), GridSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::CalculationNotFound(_)));
    }
}
