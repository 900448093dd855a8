//! Backend commands queued from UI to backend worker.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    LoadDictionary,
    /// Replaces any pending validation; runs after the debounce delay.
    ScheduleValidation {
        revision: u64,
        command_line: String,
    },
    CancelValidation,
    AppendToSequence {
        command_line: String,
    },
}
