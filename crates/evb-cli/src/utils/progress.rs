use evbkit::engine::progress::{Phase, Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// What one task step counts while `phase` runs.
fn task_unit(phase: Option<Phase>) -> &'static str {
    match phase {
        Some(
            Phase::WindowRendering
            | Phase::WindowMapping
            | Phase::EnergyReading
            | Phase::QfepExport
            | Phase::GapExport,
        ) => "windows",
        Some(Phase::TableGeneration) => "tables",
        Some(Phase::ReplicaBarriers | Phase::PolynomialFits) => "replicas",
        _ => "steps",
    }
}

struct BarState {
    bar: ProgressBar,
    phase: Option<Phase>,
}

/// Renders workflow progress on stderr: a spinner named after the running phase and, for
/// counted tasks, a bar labelled with the phase and the unit it counts.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A handler that draws nothing, for `--quiet` runs.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        bar.set_draw_target(target);
        bar.disable_steady_tick();
        bar.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState { bar, phase: None })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);
        Box::new(move |event: Progress| match state.lock() {
            Ok(mut state) => Self::render(&mut state, event),
            Err(_) => warn!("Progress bar mutex was poisoned. Cannot update progress."),
        })
    }

    fn render(state: &mut BarState, event: Progress) {
        let bar = &state.bar;
        match event {
            Progress::PhaseStart { phase } => {
                bar.reset();
                bar.set_length(0);
                bar.set_style(Self::spinner_style());
                bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                bar.set_message(phase.label());
                state.phase = Some(phase);
            }
            Progress::PhaseFinish => {
                bar.disable_steady_tick();
                let label = state.phase.take().map_or("Done", Phase::label);
                bar.finish_with_message(format!("✓ {label}"));
            }
            Progress::TaskStart { total_steps } => {
                bar.disable_steady_tick();
                bar.reset();
                bar.set_length(total_steps);
                bar.set_position(0);
                bar.set_style(Self::bar_style());
                bar.set_prefix(state.phase.map_or("Working", Phase::label));
                bar.set_message(task_unit(state.phase));
            }
            Progress::TaskIncrement => bar.inc(1),
            Progress::TaskFinish => {
                // Tasks may end early on error; the bar still closes full.
                let length = bar.length().unwrap_or(0);
                bar.set_position(bar.position().max(length));
                bar.finish();
            }
            Progress::Message(msg) if bar.is_finished() => bar.set_message(msg),
            Progress::Message(msg) => bar.println(format!("  {msg}")),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:<24} [{bar:40.cyan/blue}] {pos}/{len} {msg} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let state = handler.state.lock().unwrap();
        assert_eq!(state.bar.length(), Some(0));
        assert!(state.bar.is_finished());
        assert_eq!(state.phase, None);
    }

    #[test]
    fn callback_tracks_window_rendering() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            phase: Phase::WindowRendering,
        });
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.message(), "Rendering windows");
            assert!(!state.bar.is_finished());
            assert_eq!(state.bar.length(), Some(0));
        }

        callback(Progress::TaskStart { total_steps: 21 });
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.length(), Some(21));
            assert_eq!(state.bar.position(), 0);
            assert_eq!(state.bar.prefix(), "Rendering windows");
            assert_eq!(state.bar.message(), "windows");
        }

        callback(Progress::TaskIncrement);
        assert_eq!(handler.state.lock().unwrap().bar.position(), 1);

        callback(Progress::TaskFinish);
        {
            let state = handler.state.lock().unwrap();
            assert!(state.bar.is_finished());
            assert_eq!(state.bar.position(), 21);
        }

        callback(Progress::PhaseFinish);
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.bar.message(), "✓ Rendering windows");
            assert_eq!(state.phase, None);
        }
    }

    #[test]
    fn tasks_count_the_unit_of_their_phase() {
        assert_eq!(task_unit(Some(Phase::TableGeneration)), "tables");
        assert_eq!(task_unit(Some(Phase::EnergyReading)), "windows");
        assert_eq!(task_unit(Some(Phase::GapExport)), "windows");
        assert_eq!(task_unit(Some(Phase::ReplicaBarriers)), "replicas");
        assert_eq!(task_unit(Some(Phase::Parsing)), "steps");
        assert_eq!(task_unit(None), "steps");
    }

    #[test]
    fn early_task_finish_fills_the_bar() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::TaskStart { total_steps: 4 });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskFinish);
        callback(Progress::Message("Tables written.".to_string()));

        let state = handler.state.lock().unwrap();
        assert_eq!(state.bar.position(), 4);
        assert_eq!(state.bar.prefix(), "Working");
        assert_eq!(state.bar.message(), "Tables written.");
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                phase: Phase::EnergyReading,
            });
            callback(Progress::TaskIncrement);
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        let state = handler.state.lock().unwrap();
        assert!(state.bar.is_finished());
        assert_eq!(state.bar.message(), "✓ Reading energies");
    }
}
