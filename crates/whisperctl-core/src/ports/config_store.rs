//! Configuration store port.

/// Read access to the persisted path configuration.
///
/// The supervisor calls these at the start of every `start()` so that the
/// configuration may change between restarts.
pub trait ConfigStore: Send + Sync {
    /// Path (or bare command name) of the interpreter that runs the worker.
    fn interpreter_path(&self) -> String;

    /// Path of the worker script. Empty when unconfigured.
    fn script_path(&self) -> String;

    /// Model selected by the user, used when the caller names none.
    fn selected_model(&self) -> String;
}
