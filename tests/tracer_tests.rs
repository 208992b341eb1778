// Integration tests for tracing scripting-language source

use steptrace::config::TraceConfig;
use steptrace::memory::Value;
use steptrace::snapshot::{ErrorOrigin, StepKind, Trace};
use steptrace::tracer::SourceTracer;

fn trace(source: &str) -> Trace {
    let outcome = SourceTracer::default().trace(source);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    outcome.trace
}

fn lines(trace: &Trace) -> Vec<Option<usize>> {
    trace.iter().map(|record| record.line).collect()
}

#[test]
fn test_function_call_shows_callee_scope() {
    let source = "\
def add(a, b):
    return a + b
x = add(1, 2)
print(x)
";
    let trace = trace(source);
    assert_eq!(lines(&trace), vec![Some(1), Some(3), Some(2), Some(4), None]);

    let inside = trace.get(2).expect("callee record");
    assert_eq!(inside.variables.get("a"), Some(&Value::Int(1)));
    assert_eq!(inside.variables.get("b"), Some(&Value::Int(2)));
    assert!(!inside.variables.contains("x"));

    let end = trace.last().expect("terminal record");
    assert_eq!(end.kind, StepKind::Finished);
    assert_eq!(end.variables.get("x"), Some(&Value::Int(3)));
    assert_eq!(end.output, "3\n");
}

#[test]
fn test_for_header_reported_every_iteration() {
    let source = "\
total = 0
for i in range(3):
    total += i
print(total)
";
    let trace = trace(source);
    assert_eq!(
        lines(&trace),
        vec![
            Some(1),
            Some(2),
            Some(3),
            Some(2),
            Some(3),
            Some(2),
            Some(3),
            Some(2),
            Some(4),
            None
        ]
    );
    assert_eq!(trace.last().map(|r| r.output.as_str()), Some("3\n"));
}

#[test]
fn test_uncaught_exception_ends_trace() {
    let source = "\
x = 1
y = x / 0
print('unreachable')
";
    let trace = trace(source);
    assert_eq!(trace.len(), 3);
    let end = trace.last().expect("terminal record");
    assert_eq!(end.kind, StepKind::Error);
    assert_eq!(end.line, None);
    assert_eq!(end.variables.get("x"), Some(&Value::Int(1)));
    assert!(!end.variables.contains("y"));

    let error = end.error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Program);
    assert!(error.message.starts_with("Traceback (most recent call last):"));
    assert!(error.message.contains("line 2"));
    assert!(error.message.ends_with("ZeroDivisionError: division by zero"));
}

#[test]
fn test_error_inside_function_names_both_frames() {
    let source = "\
def boom(n):
    return n[5]
boom([1, 2])
";
    let trace = trace(source);
    let error = trace
        .last()
        .and_then(|r| r.error.as_ref())
        .expect("error detail");
    assert!(error.message.contains("line 3, in <module>"));
    assert!(error.message.contains("line 2, in boom"));
    assert!(error.message.contains("IndexError"));
}

#[test]
fn test_infinite_loop_is_truncated() {
    let config = TraceConfig::default().with_max_steps(50);
    let outcome = SourceTracer::new(config).trace("n = 0\nwhile True:\n    n += 1\n");
    let trace = outcome.trace;
    assert_eq!(trace.len(), 50);
    let end = trace.last().expect("terminal record");
    assert_eq!(end.kind, StepKind::Error);
    let error = end.error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
    assert!(error.message.contains("50"));
    // The terminal record repeats the state of the last recorded step
    let before = trace.get(48).expect("last normal record");
    assert_eq!(end.variables, before.variables);
}

#[test]
fn test_runaway_recursion() {
    let source = "\
def f(n):
    return f(n + 1)
f(0)
";
    let config = TraceConfig::default().with_max_call_depth(20);
    let trace = SourceTracer::new(config).trace(source).trace;
    let error = trace
        .last()
        .and_then(|r| r.error.as_ref())
        .expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Program);
    assert!(error.message.contains("RecursionError"));
    assert!(error.message.contains("[Previous line repeated"));
}

#[test]
fn test_snapshots_do_not_share_aliased_lists() {
    let source = "\
a = [1]
b = a
a.append(2)
c = 0
";
    let trace = trace(source);
    let before_append = trace.get(2).expect("record before append");
    assert_eq!(before_append.variables.get("a"), Some(&Value::ints(&[1])));
    assert_eq!(before_append.variables.get("b"), Some(&Value::ints(&[1])));

    let end = trace.last().expect("terminal record");
    assert_eq!(end.variables.get("a"), Some(&Value::ints(&[1, 2])));
    assert_eq!(end.variables.get("b"), Some(&Value::ints(&[1, 2])));
}

#[test]
fn test_output_accumulates() {
    let source = "\
for word in ['a', 'b']:
    print(word)
print('done')
";
    let trace = trace(source);
    let outputs: Vec<&str> = trace.iter().map(|r| r.output.as_str()).collect();
    for pair in outputs.windows(2) {
        assert!(pair[1].starts_with(pair[0]), "{:?}", pair);
    }
    assert_eq!(outputs.last(), Some(&"a\nb\ndone\n"));
}

#[test]
fn test_none_is_unset() {
    let trace = trace("x = None\ny = 1\n");
    let end = trace.last().expect("terminal record");
    assert_eq!(end.variables.get("x"), Some(&Value::Unset));
}

#[test]
fn test_json_export_shape() {
    let trace = trace("x = 1\nprint(x)\n");
    let json = serde_json::to_value(&trace).expect("trace serializes");
    let steps = json.as_array().expect("array of steps");
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["line"], 1);
    assert_eq!(steps[0]["event"], "step");
    assert_eq!(steps[2]["line"], -1);
    assert_eq!(steps[2]["event"], "finish");
    assert_eq!(steps[2]["stdout"], "1\n");
    assert_eq!(steps[2]["variables"]["x"], 1);
}

#[test]
fn test_print_output_after_each_step() {
    let trace = trace("print(1)\nprint(2)\n");
    assert_eq!(trace.len(), 3);
    let outputs: Vec<&str> = trace.iter().map(|r| r.output.as_str()).collect();
    assert_eq!(outputs, vec!["", "1\n", "1\n2\n"]);
    assert_eq!(trace.last().map(|r| r.kind), Some(StepKind::Finished));
}

#[test]
fn test_user_variable_may_shadow_library_function() {
    let source = "\
sum = 0
for i in range(3):
    sum = sum + i
print(sum)
";
    let trace = trace(source);
    for record in trace.iter().skip(1) {
        assert!(record.variables.contains("sum"), "{:?}", record.line);
    }
    let end = trace.last().expect("terminal record");
    assert_eq!(end.kind, StepKind::Finished);
    assert_eq!(end.variables.get("sum"), Some(&Value::Int(3)));
    assert_eq!(end.output, "3\n");
    // untouched library functions stay out of view
    assert!(!end.variables.contains("abs"));
}

#[test]
fn test_deeply_nested_list_is_cut_off() {
    let config = TraceConfig::default().with_max_steps(2_000);
    let outcome = SourceTracer::new(config).trace("a = []\nwhile True:\n    a = [a]\n");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let end = outcome.trace.last().expect("terminal record");
    let origin = end.error.as_ref().map(|e| e.origin);
    assert_eq!(origin, Some(ErrorOrigin::Truncated));

    let mut value = end.variables.value("a").clone();
    let mut depth = 0;
    while let Value::List(mut items) = value {
        value = items.pop().unwrap_or(Value::Unset);
        depth += 1;
    }
    assert_eq!(value, Value::Opaque("[...]".to_string()));
    assert!(depth < 500);
}

#[test]
fn test_deeply_nested_parentheses_are_a_syntax_error() {
    let depth = 20_000;
    let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
    let trace = trace(&source);
    assert_eq!(trace.len(), 1);
    let error = trace
        .last()
        .and_then(|r| r.error.as_ref())
        .expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Program);
    assert!(error.message.contains("SyntaxError"));
    assert!(error.message.contains("too many nested levels"));
}

#[test]
fn test_output_overflow_on_last_line_is_truncation() {
    let config = TraceConfig::default().with_max_output_bytes(8);
    let trace = SourceTracer::new(config)
        .trace("print('abcdefghijklmnop')\n")
        .trace;
    assert_eq!(trace.len(), 2);
    let end = trace.last().expect("terminal record");
    assert_eq!(end.kind, StepKind::Error);
    let error = end.error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
    assert!(error.message.contains("8 bytes"));
    assert_eq!(end.output, "abcdefgh");
}

#[test]
fn test_stored_output_is_bounded_across_records() {
    let budget = 1_000_000;
    let config = TraceConfig::default()
        .with_max_steps(1_000)
        .with_max_trace_bytes(budget);
    let source = "print('x' * 100000)\nwhile True:\n    pass\n";
    let trace = SourceTracer::new(config).trace(source).trace;

    let end = trace.last().expect("terminal record");
    let error = end.error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
    assert!(error.message.contains("1000000 bytes"));
    assert_eq!(trace.len(), 11);
    assert!(trace.output_bytes() - end.output.len() <= budget);
}
