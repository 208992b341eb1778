// Integration tests for the stepping protocol

use steptrace::config::TraceConfig;
use steptrace::machine::{Library, Navigation};
use steptrace::memory::Value;
use steptrace::sequencer::{BeginError, Readiness, TraceRequest, TraceSequencer};
use steptrace::snapshot::StepKind;

fn sequencer() -> TraceSequencer {
    TraceSequencer::new(Library::standard().expect("standard library validates"))
}

fn algorithm(id: &str, preset: Option<&str>, variant: Option<&str>) -> TraceRequest {
    TraceRequest::Algorithm {
        id: id.to_string(),
        preset: preset.map(str::to_string),
        variant: variant.map(str::to_string),
    }
}

fn begin(seq: &mut TraceSequencer, request: TraceRequest) -> Readiness {
    seq.begin(request, TraceConfig::default())
        .expect("request is valid")
}

#[test]
fn test_source_session_walks_forward_and_back() {
    let mut seq = sequencer();
    let readiness = begin(&mut seq, TraceRequest::Source("x = 1\ny = 2\n".to_string()));
    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.current().and_then(|r| r.line), Some(1));

    assert_eq!(seq.advance().and_then(|r| r.line), Some(2));
    assert_eq!(seq.advance().map(|r| r.kind), Some(StepKind::Finished));
    assert!(seq.is_finished());

    assert_eq!(seq.retreat().and_then(|r| r.line), Some(2));
    assert_eq!(seq.position(), 1);
    assert_eq!(seq.jump_to_start().and_then(|r| r.line), Some(1));
    assert_eq!(seq.retreat().and_then(|r| r.line), Some(1));
    assert_eq!(seq.program_lines(), vec!["x = 1", "y = 2"]);
}

#[test]
fn test_end_is_idempotent() {
    let mut seq = sequencer();
    begin(&mut seq, algorithm("variable_swap", None, None));
    let end = seq.jump_to_end().cloned().expect("terminal record");
    assert_eq!(end.kind, StepKind::Finished);
    let position = seq.position();

    assert_eq!(seq.advance(), Some(&end));
    assert_eq!(seq.jump_to_end(), Some(&end));
    assert_eq!(seq.position(), position);
}

#[test]
fn test_pending_session_cannot_step() {
    let mut seq = sequencer();
    let readiness = begin(&mut seq, algorithm("bin_sort", None, None));
    assert_eq!(
        readiness,
        Readiness::NotReady {
            missing: vec!["data".to_string()]
        }
    );
    assert!(!seq.is_ready());
    assert_eq!(seq.len(), 1);

    let initial = seq.current().cloned().expect("initial record");
    assert_eq!(initial.kind, StepKind::Normal);
    assert_eq!(initial.variables.get("data"), Some(&Value::Unset));
    assert_eq!(seq.advance(), Some(&initial));
    assert_eq!(seq.jump_to_end(), Some(&initial));
    assert_eq!(seq.position(), 0);

    assert_eq!(seq.select_preset("ウ"), Ok(Readiness::Ready));
    assert_eq!(seq.preset(), Some("ウ"));
    assert!(seq.len() > 1);
    let end = seq.jump_to_end().expect("terminal record");
    assert_eq!(end.kind, StepKind::Finished);
}

#[test]
fn test_preset_in_request() {
    let mut seq = sequencer();
    let readiness = begin(&mut seq, algorithm("binary_search", Some("エ"), None));
    assert_eq!(readiness, Readiness::Ready);
    let end = seq.jump_to_end().expect("terminal record");
    assert_eq!(end.variables.get("result"), Some(&Value::Int(3)));
}

#[test]
fn test_variant_switch_reruns() {
    let mut seq = sequencer();
    begin(&mut seq, algorithm("gcd_subtraction", None, None));
    assert_eq!(seq.variant(), Some("エ"));
    let answer = seq
        .jump_to_end()
        .and_then(|r| r.variables.get("result").cloned());
    assert_eq!(answer, Some(Value::Int(12)));

    assert_eq!(seq.select_variant("イ"), Ok(Readiness::Ready));
    assert_eq!(seq.variant(), Some("イ"));
    assert_eq!(seq.position(), 0);
    let wrong = seq
        .jump_to_end()
        .and_then(|r| r.variables.get("result").cloned());
    assert_eq!(wrong, Some(Value::Int(36)));

    let err = seq.select_variant("オ").unwrap_err();
    assert!(matches!(err, BeginError::UnknownVariant { .. }));
}

#[test]
fn test_forward_only_algorithms_ignore_retreat() {
    let mut seq = sequencer();
    begin(&mut seq, algorithm("recursive_factorial", None, None));
    assert_eq!(seq.navigation(), Navigation::ForwardOnly);
    seq.advance();
    seq.advance();
    assert_eq!(seq.position(), 2);
    seq.retreat();
    assert_eq!(seq.position(), 2);
    seq.jump_to_start();
    assert_eq!(seq.position(), 2);
}

#[test]
fn test_reset_discards_session() {
    let mut seq = sequencer();
    begin(&mut seq, algorithm("fizz_buzz", Some("3"), None));
    seq.advance();
    seq.reset();
    assert!(seq.is_idle());
    assert!(seq.current().is_none());
    assert_eq!(seq.len(), 0);
    assert_eq!(seq.preset(), None);
    assert_eq!(seq.supply("num", Value::Int(3)), Err(BeginError::NoSession));
}

#[test]
fn test_begin_errors() {
    let mut seq = sequencer();
    let config = TraceConfig::default();
    assert_eq!(
        seq.begin(TraceRequest::Source("   \n".to_string()), config),
        Err(BeginError::EmptySource)
    );
    assert_eq!(
        seq.begin(algorithm("quick_sort", None, None), config),
        Err(BeginError::UnknownAlgorithm("quick_sort".to_string()))
    );
    assert!(seq.is_idle());
}

#[test]
fn test_begin_replaces_previous_session() {
    let mut seq = sequencer();
    begin(&mut seq, algorithm("variable_swap", None, None));
    seq.jump_to_end();
    begin(&mut seq, TraceRequest::Source("print('hi')\n".to_string()));
    assert_eq!(seq.position(), 0);
    assert!(seq.descriptor().is_none());
    let end = seq.jump_to_end().expect("terminal record");
    assert_eq!(end.output, "hi\n");
}

#[test]
fn test_source_with_error_is_navigable() {
    let mut seq = sequencer();
    begin(&mut seq, TraceRequest::Source("x = 1\nx.foo()\n".to_string()));
    let end = seq.jump_to_end().expect("terminal record");
    assert_eq!(end.kind, StepKind::Error);
    assert!(seq.is_finished());
    assert_eq!(seq.retreat().and_then(|r| r.line), Some(2));
}
