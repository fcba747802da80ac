/// Lifecycle of a single trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum TrialPhase {
    /// Blank frames flushing the render pipeline before the timer runs.
    #[default]
    Priming,
    Running,
    Ended,
}

impl TrialPhase {
    /// Whether stimuli are evaluated and drawn this phase.
    pub fn is_running(&self) -> bool {
        matches!(self, TrialPhase::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TrialPhase::Ended)
    }
}
