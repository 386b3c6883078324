use crate::core::io::directive::{Directive, DirectiveFile};
use crate::core::io::fragment::FragmentLibrary;
use crate::core::io::topfile::{TopologyDocument, TopologyFile};
use crate::core::io::traits::{TextInput, TextOutput};
use crate::core::models::atom::State;
use crate::core::topology::index::AtomIndex;
use crate::core::topology::reference::{REFERENCE_FILE_NAME, reference_topology};
use crate::core::topology::softcore::{DecayRegistry, SoftCore};
use crate::core::topology::tables::{SoftCoreTable, TableFile, table_file_name};
use crate::core::topology::transitions::Transitions;
use crate::core::topology::writer::{EvbBlock, WindowTopology, edit_base, window_file_name};
use crate::core::topology::{TopologyWarning, nonbonded, pairs, parameters, reconcile, softcore};
use crate::engine::config::BuildConfig;
use crate::engine::error::{EvbError, Stage, require_input};
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Term and pair counts of a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub bonds: usize,
    pub angles: usize,
    pub torsions: usize,
    pub impropers: usize,
    pub classified_pairs: usize,
    pub soft_core: usize,
    pub nonbonded_pairs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    pub windows: Vec<PathBuf>,
    pub reference: PathBuf,
    pub tables: Vec<PathBuf>,
    pub summary: BuildSummary,
    pub warnings: Vec<TopologyWarning>,
}

impl BuildResult {
    pub fn written_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.windows
            .iter()
            .chain(std::iter::once(&self.reference))
            .chain(&self.tables)
    }
}

struct Inputs {
    directive: Directive,
    base: TopologyDocument,
    library: FragmentLibrary,
}

/// Writes the per-window EVB topologies, the reference topology and the soft-core tables.
///
/// # Errors
///
/// Returns [`EvbError::InputNotFound`] for a missing input, [`EvbError::Parse`] for an
/// unreadable directive, topology or fragment file, and [`EvbError::Stage`] naming the
/// pipeline stage that rejected the system.
#[instrument(skip_all, name = "build_workflow")]
pub fn run(config: &BuildConfig, reporter: &ProgressReporter) -> Result<BuildResult, EvbError> {
    let mut warnings = Vec::new();

    // === Phase 1: Parsing ===
    let phase = reporter.phase(Phase::Parsing);
    let inputs = load_inputs(config)?;
    let index = AtomIndex::build(
        &inputs.directive.atoms,
        &config.reactant_residues,
        &config.product_residues,
    )
    .map_err(|e| EvbError::topology(Stage::Parsing, e))?;
    info!(
        atoms = index.atoms().len(),
        fragments = inputs.library.fragments().len(),
        "Inputs parsed."
    );
    phase.finish();

    // === Phase 2: Term reconciliation ===
    let phase = reporter.phase(Phase::Reconciling);
    let (reactant, found) = parameters::collect(
        &index,
        &inputs.library,
        State::Reactant,
        &config.reactant_residues,
    );
    push_unique(&mut warnings, found);
    let (product, found) = parameters::collect(
        &index,
        &inputs.library,
        State::Product,
        &config.product_residues,
    );
    push_unique(&mut warnings, found);
    let merged = reconcile::reconcile(&reactant, &product, &inputs.directive);
    info!(
        bonds = merged.bonds.len(),
        angles = merged.angles.len(),
        torsions = merged.torsions.len(),
        impropers = merged.impropers.len(),
        "Reactant and product terms merged."
    );
    phase.finish();

    // === Phase 3: Pair classification ===
    let phase = reporter.phase(Phase::PairClassification);
    let classified = pairs::classify(index.atoms(), &reactant.connectivity, &product.connectivity);
    let transitions = Transitions::derive(&merged, &classified);
    debug!(
        pairs = classified.len(),
        solo_bonds = transitions.bonds.len(),
        solo_angles = transitions.angles.len(),
        donor_acceptor = transitions.donor_acceptor.len(),
        restored = transitions.restored.len(),
        "Pairs classified."
    );
    phase.finish();

    // === Phase 4: Soft-core assignment ===
    let phase = reporter.phase(Phase::SoftCoreAssignment);
    let mut registry = DecayRegistry::new();
    let entries = softcore::assign(
        &transitions,
        &inputs.directive.soft_core,
        &inputs.directive.soft_pairs,
        &mut registry,
    );
    let soft = SoftCore { entries, registry };
    let (plan, found) = nonbonded::plan(
        &index,
        &transitions,
        &classified,
        &soft.entries,
        &reactant,
        &product,
    )
    .map_err(|e| EvbError::topology(Stage::SoftCore, e))?;
    push_unique(&mut warnings, found);
    info!(
        soft_core = soft.entries.len(),
        tables = soft.registry.len(),
        pairs = plan.entries.len(),
        "Soft-core and pair interactions assigned."
    );
    phase.finish();

    // === Phase 5: Window topologies ===
    let phase = reporter.phase(Phase::WindowRendering);
    fs::create_dir_all(&config.output_dir)?;
    let edited = edit_base(&inputs.base, &index, &merged, &classified)
        .map_err(|e| EvbError::topology(Stage::Windows, e))?;
    let block = EvbBlock::build(&merged, &soft.entries, &inputs.directive.constraints, &plan);
    let summary = BuildSummary {
        bonds: merged.bonds.len(),
        angles: merged.angles.len(),
        torsions: merged.torsions.len(),
        impropers: merged.impropers.len(),
        classified_pairs: classified.len(),
        soft_core: soft.entries.len(),
        nonbonded_pairs: plan.entries.len(),
    };
    let mut topology = WindowTopology::assemble(edited, block, plan, config.window_count)
        .map_err(|e| EvbError::topology(Stage::Windows, e))?;

    let windows = reporter.task(config.window_count, |reporter| {
        (0..config.window_count)
            .map(|window| -> Result<PathBuf, EvbError> {
                let path = config.output_dir.join(window_file_name(window));
                TopologyFile::write_to_path(topology.render(window), &path)?;
                reporter.report(Progress::TaskIncrement);
                Ok(path)
            })
            .collect::<Result<Vec<_>, EvbError>>()
    })?;
    info!(windows = windows.len(), "Window topologies written.");
    phase.finish();

    // === Phase 6: Reference topology ===
    let phase = reporter.phase(Phase::ReferenceState);
    let (reference_lines, found) = reference_topology(topology.body(0), &index)
        .map_err(|e| EvbError::topology(Stage::Reference, e))?;
    push_unique(&mut warnings, found);
    let reference = config.output_dir.join(REFERENCE_FILE_NAME);
    TopologyFile::write_to_path(&reference_lines, &reference)?;
    phase.finish();

    // === Phase 7: Soft-core tables ===
    let phase = reporter.phase(Phase::TableGeneration);
    let betas = soft.registry.betas();
    let tables = reporter.task(betas.len(), |reporter| {
        betas
            .iter()
            .enumerate()
            .map(|(k, &beta)| -> Result<PathBuf, EvbError> {
                let table = SoftCoreTable::new(beta, config.cutoff, config.precision);
                let path = config.output_dir.join(table_file_name(k));
                TableFile::write_to_path(&table, &path)?;
                debug!(table = k, beta, points = table.len(), "Soft-core table written.");
                reporter.report(Progress::TaskIncrement);
                Ok(path)
            })
            .collect::<Result<Vec<_>, EvbError>>()
    })?;
    phase.finish();

    for warning in &warnings {
        warn!("{warning}");
    }
    info!(
        windows = windows.len(),
        tables = tables.len(),
        warnings = warnings.len(),
        "EVB topology build finished."
    );

    Ok(BuildResult {
        windows,
        reference,
        tables,
        summary,
        warnings,
    })
}

fn load_inputs(config: &BuildConfig) -> Result<Inputs, EvbError> {
    for path in [
        &config.directive_path,
        &config.topology_path,
        &config.fragments_dir,
    ] {
        require_input(path)?;
    }

    let directive = DirectiveFile::read_from_path(&config.directive_path)
        .map_err(|e| EvbError::parse(&config.directive_path, e))?;
    let base = TopologyFile::read_from_path(&config.topology_path)
        .map_err(|e| EvbError::parse(&config.topology_path, e))?;
    let library = FragmentLibrary::discover(&config.fragments_dir)
        .map_err(|e| EvbError::parse(&config.fragments_dir, e))?;

    Ok(Inputs {
        directive,
        base,
        library,
    })
}

/// A fragment shared by both states reports its skipped rows twice.
fn push_unique(warnings: &mut Vec<TopologyWarning>, found: Vec<TopologyWarning>) {
    for warning in found {
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::fragment::FragmentKind;
    use crate::core::io::topfile::EVB_MARKER;
    use crate::core::topology::tables::TablePrecision;
    use crate::engine::config::BuildConfigBuilder;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const DIRECTIVE: &str = "\
[ atoms ]
1  DA  -0.50  DB  -0.80  DUM  1
2  HA   0.50  HB   0.50  DUM  1
3  AA   0.00  AB   0.30  DUM  1
[ soft-core ]
1  2500.0  3.5
2  1.0     3.5
3  2500.0  3.5
";

    const BASE: &str = "\
[ moleculetype ]
; name  nrexcl
MOL     3

[ atoms ]
;   nr  type resnr res atom cgnr charge mass
     1  opls_1  1  MOL  D1  1  -0.5  15.999
     2  opls_2  1  MOL  H2  2   0.5   1.008
     3  opls_3  1  MOL  A3  3   0.0  15.999

[ bonds ]
  1  2  1

; Include Position restraint file
#ifdef POSRES
#include \"posre.itp\"
#endif
";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn fixture(dir: &Path) -> BuildConfigBuilder {
        let ff = dir.join("ff");
        fs::create_dir(&ff).unwrap();
        write(&ff, "rsm_bonds.opls", "DA HA 1 0.100 3000.0\n");
        write(&ff, "psm_bonds.opls", "HB AB 1 0.100 3000.0\n");
        write(
            &ff,
            "rsm_vdw.opls",
            "DA 0 0 0 0 0 0.30 0.60\nHA 0 0 0 0 0 0.00 0.00\nAA 0 0 0 0 0 0.30 0.70\n",
        );
        write(
            &ff,
            "psm_vdw.opls",
            "DB 0 0 0 0 0 0.31 0.60\nHB 0 0 0 0 0 0.00 0.00\nAB 0 0 0 0 0 0.29 0.70\n",
        );

        BuildConfigBuilder::new()
            .directive_path(write(dir, "evb.dat", DIRECTIVE))
            .topology_path(write(dir, "topol.top", BASE))
            .fragments_dir(ff)
            .reactant_residues(vec!["rsm".into()])
            .product_residues(vec!["psm".into()])
            .window_count(3)
            .output_dir(dir.join("out"))
    }

    #[test]
    fn build_writes_every_window_reference_and_table() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path()).build().unwrap();
        let result = run(&config, &ProgressReporter::new()).unwrap();

        assert_eq!(result.windows.len(), 3);
        assert!(result.windows[2].ends_with("topol_002.top"));
        assert!(result.reference.ends_with(REFERENCE_FILE_NAME));
        assert!(!result.tables.is_empty());
        for path in result.written_files() {
            assert!(path.exists(), "{} was not written", path.display());
        }

        let middle = fs::read_to_string(&result.windows[1]).unwrap();
        assert!(middle.contains("lambda = 0.5000"));
        assert!(middle.contains(EVB_MARKER));
        assert_eq!(result.summary.bonds, 2);
    }

    #[test]
    fn missing_fragment_categories_are_warnings() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path()).build().unwrap();
        let result = run(&config, &ProgressReporter::new()).unwrap();
        assert!(result.warnings.contains(&TopologyWarning::MissingFragment {
            residue: "rsm".to_string(),
            kind: FragmentKind::Angles,
        }));
    }

    #[test]
    fn double_precision_tables_are_denser() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path())
            .precision(TablePrecision::Double)
            .cutoff(0.5)
            .build()
            .unwrap();
        let result = run(&config, &ProgressReporter::new()).unwrap();
        let rows = fs::read_to_string(&result.tables[0]).unwrap().lines().count();
        assert_eq!(rows, 3001);
    }

    #[test]
    fn phases_are_reported_in_pipeline_order() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path()).build().unwrap();
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { phase } = event {
                phases.lock().unwrap().push(phase);
            }
        }));
        run(&config, &reporter).unwrap();
        drop(reporter);
        assert_eq!(
            phases.into_inner().unwrap(),
            vec![
                Phase::Parsing,
                Phase::Reconciling,
                Phase::PairClassification,
                Phase::SoftCoreAssignment,
                Phase::WindowRendering,
                Phase::ReferenceState,
                Phase::TableGeneration,
            ]
        );
    }

    #[test]
    fn missing_directive_is_reported_by_path() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path())
            .directive_path(dir.path().join("absent.dat"))
            .build()
            .unwrap();
        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EvbError::InputNotFound { ref path } if path.ends_with("absent.dat")));
    }

    #[test]
    fn topology_without_restraint_anchor_fails_in_window_stage() {
        let dir = tempdir().unwrap();
        let config = fixture(dir.path())
            .topology_path(write(dir.path(), "plain.top", "[ atoms ]\n"))
            .build()
            .unwrap();
        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EvbError::Stage {
                stage: Stage::Windows,
                ..
            }
        ));
    }
}
