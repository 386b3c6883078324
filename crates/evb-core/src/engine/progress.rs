use std::fmt;
use tracing::info_span;
use tracing::span::EnteredSpan;

/// Named stages of the toolkit's workflows, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    // build
    Parsing,
    Reconciling,
    PairClassification,
    SoftCoreAssignment,
    WindowRendering,
    ReferenceState,
    TableGeneration,
    // map, qfep, molaris
    EnergyReading,
    ZwanzigAveraging,
    WindowMapping,
    QfepExport,
    GapExport,
    // stats, fit, molaris-stats
    ReplicaBarriers,
    PolynomialFits,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Parsing => "Parsing inputs",
            Phase::Reconciling => "Reconciling terms",
            Phase::PairClassification => "Classifying pairs",
            Phase::SoftCoreAssignment => "Assigning soft-core",
            Phase::WindowRendering => "Rendering windows",
            Phase::ReferenceState => "Writing reference state",
            Phase::TableGeneration => "Generating tables",
            Phase::EnergyReading => "Reading energies",
            Phase::ZwanzigAveraging => "Zwanzig averaging",
            Phase::WindowMapping => "Mapping windows",
            Phase::QfepExport => "Writing qfep files",
            Phase::GapExport => "Writing gap files",
            Phase::ReplicaBarriers => "Reading replica barriers",
            Phase::PolynomialFits => "Fitting profiles",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events emitted by long-running workflows.
///
/// A phase brackets one pipeline stage; tasks inside a phase count discrete steps such as
/// rendered windows or read energy files.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { phase: Phase },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Starts `phase` and enters a `phase` span for it. The phase is reported finished
    /// only through [`PhaseGuard::finish`]; dropping the guard on an error path just
    /// closes the span.
    pub fn phase(&self, phase: Phase) -> PhaseGuard<'_, 'a> {
        let span = info_span!("phase", name = phase.label()).entered();
        self.report(Progress::PhaseStart { phase });
        PhaseGuard {
            reporter: self,
            _span: span,
        }
    }

    /// Runs `work` as one counted task of `total` steps; `work` reports its own increments.
    pub fn task<T>(&self, total: usize, work: impl FnOnce(&Self) -> T) -> T {
        self.report(Progress::TaskStart {
            total_steps: total as u64,
        });
        let result = work(self);
        self.report(Progress::TaskFinish);
        result
    }
}

#[must_use = "a phase is only reported finished through `finish`"]
pub struct PhaseGuard<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
    _span: EnteredSpan,
}

impl PhaseGuard<'_, '_> {
    pub fn finish(self) {
        self.reporter.report(Progress::PhaseFinish);
    }
}
