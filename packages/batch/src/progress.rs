//! Progress reporting for batch runs.
//!
//! The pipeline reports through [`ProgressCallback`] so that library use
//! and tests stay silent ([`NullProgress`]) while the CLI renders terminal
//! bars.

/// Receives progress updates for files or records.
///
/// Updates arrive from the pipeline's driving thread only, but
/// implementations are shared behind `Arc` and must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Sets the expected total (files in the run, or records in a file
    /// when known).
    fn set_total(&self, total: u64);

    /// Sets the absolute position. Reset to zero at the start of a file.
    fn set_position(&self, pos: u64);

    /// Advances by `delta`, e.g. the rows of a flushed chunk.
    fn inc(&self, delta: u64);

    /// Replaces the label, e.g. the file being processed.
    fn set_message(&self, msg: String);

    /// Marks the work as done with a closing message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressCallback for Recorder {
        fn set_total(&self, total: u64) {
            self.0.lock().unwrap().push(format!("total {total}"));
        }
        fn set_position(&self, pos: u64) {
            self.0.lock().unwrap().push(format!("pos {pos}"));
        }
        fn inc(&self, delta: u64) {
            self.0.lock().unwrap().push(format!("inc {delta}"));
        }
        fn set_message(&self, msg: String) {
            self.0.lock().unwrap().push(msg);
        }
        fn finish(&self, msg: String) {
            self.0.lock().unwrap().push(format!("finish {msg}"));
        }
    }

    #[test]
    fn callbacks_are_usable_as_trait_objects() {
        let recorder = Recorder::default();
        let targets: [&dyn ProgressCallback; 2] = [&NullProgress, &recorder];

        for target in targets {
            target.set_total(2);
            target.inc(1);
            target.finish("done".to_string());
        }

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["total 2", "inc 1", "finish done"]
        );
    }
}
