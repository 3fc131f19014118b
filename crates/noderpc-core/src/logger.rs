//! Pluggable sink for wire-level diagnostics.
//!
//! The exchange engine never writes dumps or connection traces directly; it
//! hands pre-formatted messages to a [`Logger`]. The default
//! [`TracingLogger`] forwards them as `tracing` events under the
//! `noderpc::wire` target, so they land wherever the installed subscriber
//! writes (stderr for the bundled binary).

use std::fmt;

pub const WIRE_TARGET: &str = "noderpc::wire";

/// Leveled, formatted message sink.
pub trait Logger: Send + Sync {
    fn info(&self, args: fmt::Arguments<'_>);
    fn error(&self, args: fmt::Arguments<'_>);
    fn debug(&self, args: fmt::Arguments<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: WIRE_TARGET, "{args}");
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: WIRE_TARGET, "{args}");
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: WIRE_TARGET, "{args}");
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::fmt;
    use std::sync::Mutex;

    use super::Logger;

    /// Records every message with its level, for asserting on dumps.
    #[derive(Default)]
    pub(crate) struct CaptureLogger {
        pub(crate) lines: Mutex<Vec<(&'static str, String)>>,
    }

    impl CaptureLogger {
        pub(crate) fn messages(&self, level: &str) -> Vec<String> {
            self.lines
                .lock()
                .expect("capture lock must not be poisoned")
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }

        fn push(&self, level: &'static str, args: fmt::Arguments<'_>) {
            self.lines
                .lock()
                .expect("capture lock must not be poisoned")
                .push((level, args.to_string()));
        }
    }

    impl Logger for CaptureLogger {
        fn info(&self, args: fmt::Arguments<'_>) {
            self.push("info", args);
        }

        fn error(&self, args: fmt::Arguments<'_>) {
            self.push("error", args);
        }

        fn debug(&self, args: fmt::Arguments<'_>) {
            self.push("debug", args);
        }
    }
}
