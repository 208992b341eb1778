//! Trace sequencer
//!
//! [`TraceSequencer`] owns the trace of the current session and a cursor into
//! it. A session comes from one of two backends:
//!
//! - source text, traced by [`SourceTracer`]
//! - a library algorithm, run by [`StepMachine`]
//!
//! # Readiness
//!
//! An algorithm whose required inputs are still unset does not run. The
//! session stays pending and shows its initial state until a preset is
//! selected or the inputs are supplied. Stepping a pending session is a no-op.
//!
//! # Navigation
//!
//! Stepping never fails: moving past either end leaves the cursor where it
//! is. Algorithms marked [`Navigation::ForwardOnly`] ignore [`retreat`].
//!
//! [`retreat`]: TraceSequencer::retreat

use crate::config::TraceConfig;
use crate::machine::{Descriptor, Library, Navigation, StepMachine};
use crate::memory::{Environment, Value};
use crate::snapshot::{StepKind, StepRecord, Trace};
use crate::tracer::SourceTracer;
use thiserror::Error;

/// What to trace
#[derive(Debug, Clone, PartialEq)]
pub enum TraceRequest {
    Source(String),
    Algorithm {
        id: String,
        preset: Option<String>,
        variant: Option<String>,
    },
}

/// Whether a session has produced its trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BeginError {
    #[error("source is empty")]
    EmptySource,

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("algorithm '{id}' has no preset '{preset}'")]
    UnknownPreset { id: String, preset: String },

    #[error("algorithm '{id}' has no variant '{variant}'")]
    UnknownVariant { id: String, variant: String },

    #[error("no algorithm session is active")]
    NoSession,
}

/// Inputs chosen for an algorithm session
#[derive(Debug, Clone)]
struct Selection {
    id: &'static str,
    preset: Option<&'static str>,
    variant: Option<&'static str>,
    bindings: Environment,
}

enum State {
    Idle,
    Pending {
        selection: Selection,
        initial: StepRecord,
        missing: Vec<&'static str>,
    },
    Active {
        selection: Option<Selection>,
        source: Option<String>,
        trace: Trace,
        cursor: usize,
        diagnostics: Vec<String>,
    },
}

/// Cursor over the trace of the current session
pub struct TraceSequencer {
    library: Library,
    config: TraceConfig,
    state: State,
}

impl TraceSequencer {
    pub fn new(library: Library) -> Self {
        TraceSequencer {
            library,
            config: TraceConfig::default(),
            state: State::Idle,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Start a new session, discarding the previous one.
    pub fn begin(
        &mut self,
        request: TraceRequest,
        config: TraceConfig,
    ) -> Result<Readiness, BeginError> {
        self.state = State::Idle;
        self.config = config;

        match request {
            TraceRequest::Source(source) => {
                if source.trim().is_empty() {
                    return Err(BeginError::EmptySource);
                }
                let outcome = SourceTracer::new(config).trace(&source);
                self.state = State::Active {
                    selection: None,
                    source: Some(source),
                    trace: outcome.trace,
                    cursor: 0,
                    diagnostics: outcome.diagnostics,
                };
                Ok(Readiness::Ready)
            }
            TraceRequest::Algorithm {
                id,
                preset,
                variant,
            } => {
                let descriptor = self
                    .library
                    .get(&id)
                    .ok_or_else(|| BeginError::UnknownAlgorithm(id.clone()))?;

                let variant = match variant {
                    Some(name) => Some(
                        descriptor
                            .variant(&name)
                            .map(|v| v.id)
                            .ok_or(BeginError::UnknownVariant { id: id.clone(), variant: name })?,
                    ),
                    None => None,
                };
                let (preset, bindings) = match preset {
                    Some(label) => {
                        let found = descriptor.preset(&label).ok_or(BeginError::UnknownPreset {
                            id: id.clone(),
                            preset: label,
                        })?;
                        (Some(found.label), found.values.clone())
                    }
                    None => (None, Environment::new()),
                };

                tracing::info!(id = descriptor.id, ?preset, ?variant, "begin algorithm session");
                let selection = Selection {
                    id: descriptor.id,
                    preset,
                    variant,
                    bindings,
                };
                Ok(self.refresh(selection))
            }
        }
    }

    /// Load a preset's values into the pending or active algorithm session,
    /// replacing anything supplied before.
    pub fn select_preset(&mut self, label: &str) -> Result<Readiness, BeginError> {
        let mut selection = self.selection().cloned().ok_or(BeginError::NoSession)?;
        let descriptor = self
            .library
            .get(selection.id)
            .ok_or_else(|| BeginError::UnknownAlgorithm(selection.id.to_string()))?;
        let preset = descriptor
            .preset(label)
            .ok_or_else(|| BeginError::UnknownPreset {
                id: selection.id.to_string(),
                preset: label.to_string(),
            })?;
        selection.preset = Some(preset.label);
        selection.bindings = preset.values.clone();
        Ok(self.refresh(selection))
    }

    pub fn select_variant(&mut self, id: &str) -> Result<Readiness, BeginError> {
        let mut selection = self.selection().cloned().ok_or(BeginError::NoSession)?;
        let descriptor = self
            .library
            .get(selection.id)
            .ok_or_else(|| BeginError::UnknownAlgorithm(selection.id.to_string()))?;
        let variant = descriptor
            .variant(id)
            .ok_or_else(|| BeginError::UnknownVariant {
                id: selection.id.to_string(),
                variant: id.to_string(),
            })?;
        selection.variant = Some(variant.id);
        Ok(self.refresh(selection))
    }

    /// Bind one input value by hand
    pub fn supply(&mut self, key: &str, value: Value) -> Result<Readiness, BeginError> {
        let mut selection = self.selection().cloned().ok_or(BeginError::NoSession)?;
        selection.bindings.set(key, value);
        Ok(self.refresh(selection))
    }

    /// Rebuild the session from `selection`, running the machine if every
    /// required input is set.
    fn refresh(&mut self, selection: Selection) -> Readiness {
        let Some(descriptor) = self.library.get(selection.id) else {
            self.state = State::Idle;
            return Readiness::NotReady {
                missing: Vec::new(),
            };
        };

        let mut environment = descriptor.initial.clone();
        environment.merge(&selection.bindings);
        let missing = descriptor.missing(&environment);
        if !missing.is_empty() {
            tracing::info!(id = descriptor.id, ?missing, "algorithm waiting for inputs");
            let initial = StepRecord::normal(descriptor.entry.line, environment, "");
            let names = missing.iter().map(|key| key.to_string()).collect();
            self.state = State::Pending {
                selection,
                initial,
                missing,
            };
            return Readiness::NotReady { missing: names };
        }

        let trace = StepMachine::run(
            descriptor,
            &selection.bindings,
            selection.variant,
            &self.config,
        );
        self.state = State::Active {
            selection: Some(selection),
            source: None,
            trace,
            cursor: 0,
            diagnostics: Vec::new(),
        };
        Readiness::Ready
    }

    fn selection(&self) -> Option<&Selection> {
        match &self.state {
            State::Pending { selection, .. } => Some(selection),
            State::Active { selection, .. } => selection.as_ref(),
            State::Idle => None,
        }
    }

    pub fn current(&self) -> Option<&StepRecord> {
        match &self.state {
            State::Idle => None,
            State::Pending { initial, .. } => Some(initial),
            State::Active { trace, cursor, .. } => trace.get(*cursor),
        }
    }

    pub fn advance(&mut self) -> Option<&StepRecord> {
        if let State::Active { trace, cursor, .. } = &mut self.state {
            if *cursor + 1 < trace.len() {
                *cursor += 1;
            }
        }
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&StepRecord> {
        let navigation = self.navigation();
        if let State::Active { cursor, .. } = &mut self.state {
            if navigation == Navigation::Bidirectional && *cursor > 0 {
                *cursor -= 1;
            }
        }
        self.current()
    }

    pub fn jump_to_end(&mut self) -> Option<&StepRecord> {
        if let State::Active { trace, cursor, .. } = &mut self.state {
            *cursor = trace.len().saturating_sub(1);
        }
        self.current()
    }

    /// Back to the first record of the current trace
    pub fn jump_to_start(&mut self) -> Option<&StepRecord> {
        let navigation = self.navigation();
        if let State::Active { cursor, .. } = &mut self.state {
            if navigation == Navigation::Bidirectional {
                *cursor = 0;
            }
        }
        self.current()
    }

    /// Discard the session, including any preset or variant selection
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    pub fn is_finished(&self) -> bool {
        self.current()
            .is_some_and(|record| record.kind != StepKind::Normal)
    }

    pub fn position(&self) -> usize {
        match &self.state {
            State::Active { cursor, .. } => *cursor,
            _ => 0,
        }
    }

    /// Number of records that can be visited
    pub fn len(&self) -> usize {
        match &self.state {
            State::Idle => 0,
            State::Pending { .. } => 1,
            State::Active { trace, .. } => trace.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn trace(&self) -> Option<&Trace> {
        match &self.state {
            State::Active { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// Out-of-band messages about the session, such as internal tracer faults
    pub fn diagnostics(&self) -> &[String] {
        match &self.state {
            State::Active { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Required inputs still unset in a pending session
    pub fn missing(&self) -> &[&'static str] {
        match &self.state {
            State::Pending { missing, .. } => missing,
            _ => &[],
        }
    }

    /// Descriptor of the current algorithm session
    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.selection().and_then(|s| self.library.get(s.id))
    }

    pub fn preset(&self) -> Option<&'static str> {
        self.selection().and_then(|s| s.preset)
    }

    /// Selected variant, falling back to the descriptor's default
    pub fn variant(&self) -> Option<&'static str> {
        let selection = self.selection()?;
        selection
            .variant
            .or_else(|| self.library.get(selection.id).and_then(|d| d.default_variant))
    }

    pub fn navigation(&self) -> Navigation {
        self.descriptor()
            .map_or(Navigation::Bidirectional, |d| d.navigation)
    }

    /// Lines to display next to the current record
    pub fn program_lines(&self) -> Vec<String> {
        if let State::Active {
            source: Some(source),
            ..
        } = &self.state
        {
            return source.lines().map(str::to_string).collect();
        }
        self.descriptor()
            .map(|d| d.program().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer() -> TraceSequencer {
        TraceSequencer::new(Library::standard().expect("library"))
    }

    fn algorithm(id: &str) -> TraceRequest {
        TraceRequest::Algorithm {
            id: id.to_string(),
            preset: None,
            variant: None,
        }
    }

    #[test]
    fn test_idle_has_no_record() {
        let mut seq = sequencer();
        assert!(seq.current().is_none());
        assert!(seq.advance().is_none());
        assert!(!seq.is_finished());
    }

    #[test]
    fn test_supply_makes_session_ready() {
        let mut seq = sequencer();
        let readiness = seq
            .begin(algorithm("fizz_buzz"), TraceConfig::default())
            .expect("known id");
        assert_eq!(
            readiness,
            Readiness::NotReady {
                missing: vec!["num".to_string()]
            }
        );
        assert_eq!(seq.missing(), &["num"]);

        let readiness = seq.supply("num", Value::Int(9)).expect("session");
        assert_eq!(readiness, Readiness::Ready);
        assert!(seq.is_ready());
        seq.jump_to_end();
        assert!(seq.is_finished());
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let mut seq = sequencer();
        let err = seq
            .begin(
                TraceRequest::Algorithm {
                    id: "fizz_buzz".to_string(),
                    preset: Some("99".to_string()),
                    variant: None,
                },
                TraceConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, BeginError::UnknownPreset { .. }));
    }

    #[test]
    fn test_select_without_session() {
        let mut seq = sequencer();
        assert_eq!(seq.select_preset("3"), Err(BeginError::NoSession));
    }
}
