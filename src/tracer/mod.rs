//! Instrumented execution tracer
//!
//! [`SourceTracer`] runs scripting-language source under a [`LineObserver`]
//! and turns every user line into a [`StepRecord`]. The trace it produces
//! always ends in exactly one terminal record:
//!
//! - `Finished` when the program runs to completion
//! - `Error` with origin `Program` for an uncaught exception or syntax error
//! - `Error` with origin `Truncated` when a [`Limit`] is hit, including output
//!   that overflows on the very last line
//!
//! Parsing and execution run on a dedicated thread. A panic there is caught at
//! the join and degrades to an empty trace with a diagnostic.

use crate::config::{Limit, TraceConfig};
use crate::interpreter::{Control, Interpreter, LineEvent, LineObserver, RuntimeError, SourceUnit};
use crate::memory::Environment;
use crate::parser::parse;
use crate::snapshot::capture::{CaptureBuffer, RedirectGuard};
use crate::snapshot::{StepError, StepRecord, Trace, TraceOutcome};

/// Stack reserved for the tracer thread
const TRACER_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Line observer that appends one record per user line
struct Recorder {
    trace: Trace,
    buffer: CaptureBuffer,
    config: TraceConfig,
    limit: Option<Limit>,
}

impl Recorder {
    fn new(buffer: CaptureBuffer, config: TraceConfig) -> Self {
        Recorder {
            trace: Trace::new(),
            buffer,
            config,
            limit: None,
        }
    }

    /// Captured output, cut at the configured byte limit
    fn output(&self) -> String {
        self.config.clip_output(&self.buffer.contents())
    }

    fn last_variables(&self) -> Option<Environment> {
        self.trace.last().map(|record| record.variables.clone())
    }
}

impl LineObserver for Recorder {
    fn on_line(&mut self, event: &LineEvent<'_>) -> Control {
        if event.unit == SourceUnit::Prelude {
            return Control::Continue;
        }

        if let Some(limit) = self.config.limit_reached(&self.trace, self.buffer.len()) {
            self.limit = Some(limit);
            return Control::Halt;
        }

        let record = StepRecord::normal(event.line, event.snapshot(), self.buffer.contents());
        self.trace.push(record);
        Control::Continue
    }
}

/// Runs source programs and records their traces
#[derive(Debug, Clone, Default)]
pub struct SourceTracer {
    config: TraceConfig,
}

impl SourceTracer {
    pub fn new(config: TraceConfig) -> Self {
        SourceTracer { config }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Trace `source` from its first line to its terminal record.
    ///
    /// Whitespace-only source yields an empty trace without running anything.
    /// Parsing and execution run on a worker thread with a large stack; a
    /// panic there becomes an empty trace with a diagnostic.
    pub fn trace(&self, source: &str) -> TraceOutcome {
        if source.trim().is_empty() {
            return TraceOutcome::default();
        }
        tracing::info!(bytes = source.len(), "tracing source program");

        let config = self.config;
        let owned = source.to_string();
        let worker = std::thread::Builder::new()
            .name("steptrace-tracer".to_string())
            .stack_size(TRACER_STACK_BYTES)
            .spawn(move || trace_source(&owned, config));
        let result = match worker {
            Ok(handle) => handle.join().map_err(|payload| panic_message(payload.as_ref())),
            Err(err) => Err(format!("could not start tracer thread: {}", err)),
        };

        match result {
            Ok(outcome) => {
                let last = outcome.trace.last().map(|record| record.kind);
                tracing::info!(steps = outcome.trace.len(), kind = ?last, "trace complete");
                outcome
            }
            Err(message) => {
                tracing::error!(%message, "interpreter fault while tracing");
                TraceOutcome {
                    trace: Trace::new(),
                    diagnostics: vec![format!("internal tracer fault: {}", message)],
                }
            }
        }
    }
}

fn trace_source(source: &str, config: TraceConfig) -> TraceOutcome {
    match parse(source) {
        Ok(program) => record(&program, config),
        Err(err) => {
            let error = RuntimeError::syntax(&err, SourceUnit::User);
            let mut trace = Trace::new();
            trace.push(StepRecord::error(
                Environment::new(),
                "",
                StepError::program(error.traceback_text()),
            ));
            tracing::info!(line = err.location.line, "source failed to parse");
            TraceOutcome::new(trace)
        }
    }
}

fn record(program: &crate::parser::ast::Program, config: TraceConfig) -> TraceOutcome {
    let buffer = CaptureBuffer::new();
    let mut recorder = Recorder::new(buffer.clone(), config);
    let mut diagnostics = Vec::new();

    let (result, final_globals) = {
        let mut interpreter = Interpreter::new(&mut recorder, config);
        let _guard = RedirectGuard::install(interpreter.stdout(), Box::new(buffer));
        let result = match interpreter.load_prelude() {
            Ok(()) => interpreter.run(program),
            Err(err) => {
                diagnostics.push(format!("prelude failed to load: {}", err));
                Err(err)
            }
        };
        let globals = interpreter.global_snapshot();
        (result, globals)
    };

    let output = recorder.output();
    let terminal = match result {
        Ok(()) if recorder.buffer.len() > config.max_output_bytes => {
            let limit = Limit::Output(config.max_output_bytes);
            tracing::warn!(limit = ?limit, steps = recorder.trace.len(), "trace truncated");
            StepRecord::error(final_globals, output, StepError::truncated(limit.message()))
        }
        Ok(()) => StepRecord::finished(final_globals, output),
        Err(RuntimeError::Halted) => {
            let limit = recorder.limit.unwrap_or(Limit::Steps(config.max_steps));
            tracing::warn!(limit = ?limit, steps = recorder.trace.len(), "trace truncated");
            let variables = recorder.last_variables().unwrap_or(final_globals);
            StepRecord::error(variables, output, StepError::truncated(limit.message()))
        }
        Err(err) if !diagnostics.is_empty() => {
            tracing::error!(error = %err, "engine fault while tracing");
            StepRecord::error(final_globals, output, StepError::engine(err.to_string()))
        }
        Err(err) => {
            let variables = recorder.last_variables().unwrap_or(final_globals);
            StepRecord::error(variables, output, StepError::program(err.traceback_text()))
        }
    };

    let mut trace = recorder.trace;
    trace.push(terminal);
    TraceOutcome { trace, diagnostics }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Value;
    use crate::snapshot::{ErrorOrigin, StepKind};

    fn trace(source: &str) -> Trace {
        SourceTracer::default().trace(source).trace
    }

    #[test]
    fn test_records_each_line_before_it_runs() {
        let trace = trace("x = 1\ny = x + 1\n");
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.get(0).map(|r| r.line), Some(Some(1)));
        assert!(trace.get(0).is_some_and(|r| r.variables.is_empty()));
        assert_eq!(
            trace.get(1).and_then(|r| r.variables.get("x").cloned()),
            Some(Value::Int(1))
        );
        let last = trace.last().expect("terminal record");
        assert_eq!(last.kind, StepKind::Finished);
        assert_eq!(last.variables.get("y"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_prelude_names_are_hidden() {
        let trace = trace("total = sum([1, 2, 3])\n");
        let last = trace.last().expect("terminal record");
        assert_eq!(last.variables.get("total"), Some(&Value::Int(6)));
        assert!(!last.variables.contains("sum"));
        // the prelude body generates no records
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_syntax_error_is_single_record() {
        let trace = trace("x = (1\n");
        assert_eq!(trace.len(), 1);
        let record = trace.get(0).expect("error record");
        assert_eq!(record.kind, StepKind::Error);
        let error = record.error.as_ref().expect("error detail");
        assert_eq!(error.origin, ErrorOrigin::Program);
        assert!(error.message.contains("SyntaxError"));
    }

    #[test]
    fn test_output_limit_truncates() {
        let config = TraceConfig::default().with_max_output_bytes(8);
        let outcome = SourceTracer::new(config).trace("while True:\n    print('abcdef')\n");
        let last = outcome.trace.last().expect("terminal record");
        let error = last.error.as_ref().expect("error detail");
        assert_eq!(error.origin, ErrorOrigin::Truncated);
        assert!(last.output.len() <= 8);
    }

    #[test]
    fn test_whitespace_source_is_empty() {
        assert!(trace("  \n\t\n").is_empty());
    }
}
