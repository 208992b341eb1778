// Integration tests for the algorithm library running on the step machine

use steptrace::config::TraceConfig;
use steptrace::machine::{Library, StepMachine};
use steptrace::memory::{Environment, Value};
use steptrace::snapshot::{ErrorOrigin, StepKind, StepRecord, Trace};

fn library() -> Library {
    Library::standard().expect("standard library validates")
}

fn run(id: &str, preset: Option<&str>, variant: Option<&str>) -> Trace {
    run_with(id, preset, variant, &TraceConfig::default())
}

fn run_with(id: &str, preset: Option<&str>, variant: Option<&str>, config: &TraceConfig) -> Trace {
    let library = library();
    let descriptor = library.get(id).expect("algorithm exists");
    let bindings = match preset {
        Some(label) => descriptor.preset(label).expect("preset exists").values.clone(),
        None => Environment::new(),
    };
    StepMachine::run(descriptor, &bindings, variant, config)
}

fn last(trace: &Trace) -> &StepRecord {
    trace.last().expect("trace has a terminal record")
}

fn lines(trace: &Trace) -> Vec<Option<usize>> {
    trace.iter().map(|record| record.line).collect()
}

fn finished_value(trace: &Trace, name: &str) -> Value {
    let record = last(trace);
    assert_eq!(record.kind, StepKind::Finished, "{:?}", record.error);
    record.variables.value(name).clone()
}

#[test]
fn test_variable_swap() {
    let trace = run("variable_swap", None, None);
    assert_eq!(trace.len(), 8);
    assert_eq!(
        lines(&trace),
        vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(6), Some(7), None]
    );

    // Before line 1 runs nothing is assigned yet
    let first = trace.first().expect("first record");
    assert_eq!(first.variables.get("x"), Some(&Value::Unset));

    let end = last(&trace);
    assert_eq!(end.variables.get("x"), Some(&Value::Int(2)));
    assert_eq!(end.variables.get("y"), Some(&Value::Int(3)));
    assert_eq!(end.variables.get("z"), Some(&Value::Int(2)));
    assert_eq!(end.output, "3,2\n");
}

#[test]
fn test_fizz_buzz_branches() {
    let fifteen = run("fizz_buzz", Some("15"), None);
    assert_eq!(
        lines(&fifteen),
        vec![Some(1), Some(2), Some(3), Some(4), Some(12), None]
    );
    assert_eq!(finished_value(&fifteen, "result"), Value::str("3と5で割り切れる"));

    let nine: Environment = [("num", Value::Int(9))].into_iter().collect();
    let library = library();
    let descriptor = library.get("fizz_buzz").expect("fizz_buzz");
    let trace = StepMachine::run(descriptor, &nine, None, &TraceConfig::default());
    assert_eq!(
        lines(&trace),
        vec![Some(1), Some(2), Some(3), Some(5), Some(6), Some(12), None]
    );
    assert_eq!(finished_value(&trace, "result"), Value::str("3で割り切れる"));

    let seven = run("fizz_buzz", Some("7"), None);
    assert_eq!(finished_value(&seven, "result"), Value::str("3でも5でも割り切れない"));
}

#[test]
fn test_required_input_missing() {
    let trace = run("fizz_buzz", None, None);
    assert_eq!(trace.len(), 1);
    let error = last(&trace).error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Engine);
    assert!(error.message.contains("num"));
}

#[test]
fn test_recursive_factorial() {
    let trace = run("recursive_factorial", None, None);
    let visited = lines(&trace);
    assert_eq!(visited.iter().filter(|&&line| line == Some(3)).count(), 1);
    assert_eq!(visited.iter().filter(|&&line| line == Some(5)).count(), 4);
    assert_eq!(trace.len(), 12);
    assert_eq!(finished_value(&trace, "result"), Value::Int(24));

    // At the base case four calls are stacked on the entry frame
    let base = trace
        .iter()
        .find(|record| record.line == Some(3))
        .expect("base case reached");
    assert_eq!(base.variables.get("n"), Some(&Value::Int(0)));
    let frames = base
        .variables
        .get("callStack")
        .and_then(Value::as_list)
        .expect("call stack is shown");
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[0].field("n"), Some(Value::Int(4)));
}

#[test]
fn test_expression_eval() {
    let trace = run("expression_eval", None, None);
    assert_eq!(finished_value(&trace, "result"), Value::Real(5.0));
}

#[test]
fn test_admission_fee_presets() {
    for (preset, fee) in [("2", 100), ("4", 300), ("9", 300), ("11", 500)] {
        let trace = run("admission_fee", Some(preset), None);
        assert_eq!(finished_value(&trace, "result"), Value::Int(fee), "age {}", preset);
    }
}

#[test]
fn test_array_sum() {
    let trace = run("array_sum", None, None);
    assert_eq!(
        finished_value(&trace, "result"),
        Value::ints(&[3, 5, 6, 12, 17, 21])
    );
}

#[test]
fn test_array_reverse_runs_off_the_end() {
    let trace = run("array_reverse", None, None);
    assert_eq!(finished_value(&trace, "array"), Value::ints(&[5, 4, 3, 2, 1]));
    // The last normal step is the loop header deciding to stop
    let header = trace.get(trace.len() - 2).expect("header record");
    assert_eq!(header.line, Some(5));
}

#[test]
fn test_gcd_variants() {
    let answer = run("gcd_subtraction", None, None);
    assert_eq!(finished_value(&answer, "result"), Value::Int(12));

    // A single subtraction when the loop is read as an if
    let once = run("gcd_subtraction", None, Some("イ"));
    assert_eq!(finished_value(&once, "result"), Value::Int(36));
    assert_eq!(last(&once).variables.get("y"), Some(&Value::Int(24)));
}

#[test]
fn test_gcd_wrong_comparison_never_finishes() {
    let config = TraceConfig::default().with_max_steps(200);
    let trace = run_with("gcd_subtraction", None, Some("ウ"), &config);
    assert_eq!(trace.len(), 200);
    let error = last(&trace).error.as_ref().expect("truncated");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
}

#[test]
fn test_bit_reverse() {
    let trace = run("bit_reverse", None, None);
    assert_eq!(finished_value(&trace, "result"), Value::bits(8, 0b1101_0010));
    let loop_tests = lines(&trace).iter().filter(|&&line| line == Some(5)).count();
    assert_eq!(loop_tests, 9);
}

#[test]
fn test_utf8_encode() {
    let trace = run("utf8_encode", None, None);
    assert_eq!(finished_value(&trace, "result"), Value::ints(&[224, 129, 128]));
}

#[test]
fn test_priority_queue_output() {
    let trace = run("priority_queue", None, None);
    let end = last(&trace);
    assert_eq!(end.kind, StepKind::Finished);
    assert_eq!(end.output, "A\nC\nD\nD\n");
    assert_eq!(end.variables.get("queue"), Some(&Value::List(Vec::new())));
}

#[test]
fn test_binary_tree_in_order() {
    let trace = run("binary_tree_traversal", None, None);
    let end = last(&trace);
    assert_eq!(end.kind, StepKind::Finished);
    let printed: Vec<&str> = end.output.lines().collect();
    assert_eq!(
        printed,
        vec!["8", "4", "9", "2", "10", "5", "11", "1", "12", "6", "13", "3", "14", "7"]
    );
}

#[test]
fn test_linked_list_delete_third() {
    let trace = run("linked_list_delete", None, None);
    let cells = finished_value(&trace, "listData");
    let cells = cells.as_list().expect("cells");
    assert_eq!(cells[1].next_index(), Some(3));
    assert_eq!(cells[0].next_index(), Some(1));
}

#[test]
fn test_linked_list_append_cases() {
    let empty = run("linked_list_append", Some("Case1"), None);
    assert_eq!(finished_value(&empty, "listHead"), Value::Int(0));

    let trace = run("linked_list_append", Some("Case2"), None);
    let cells = finished_value(&trace, "listData");
    let cells = cells.as_list().expect("cells");
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[2].next_index(), Some(3));
    assert_eq!(cells[3].next_index(), None);
}

#[test]
fn test_bin_sort_presets() {
    let full = run("bin_sort", Some("ア"), None);
    assert_eq!(finished_value(&full, "result"), Value::ints(&[1, 2, 3, 4, 5, 6]));

    let gap = run("bin_sort", Some("イ"), None);
    let bins = finished_value(&gap, "result");
    let bins = bins.as_list().expect("bins");
    assert_eq!(bins[5], Value::Unset);
    assert_eq!(bins[3], Value::Int(4));
}

#[test]
fn test_similarity_ratio() {
    let trace = run("similarity_ratio", None, None);
    assert_eq!(finished_value(&trace, "result"), Value::Real(0.6));
}

#[test]
fn test_binary_search_presets() {
    let found = run("binary_search", Some("エ"), None);
    assert_eq!(finished_value(&found, "result"), Value::Int(3));

    let single = run("binary_search", Some("ア"), None);
    assert_eq!(finished_value(&single, "result"), Value::Int(1));
}

#[test]
fn test_binary_search_stalls() {
    let config = TraceConfig::default().with_max_steps(100);
    let trace = run_with("binary_search", Some("ウ"), None, &config);
    assert_eq!(trace.len(), 100);
    let end = last(&trace);
    assert_eq!(end.kind, StepKind::Error);
    let error = end.error.as_ref().expect("error detail");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
    assert!(error.message.contains("100"));
    assert_eq!(end.variables.get("low"), Some(&Value::Int(1)));
}

#[test]
fn test_five_number_summary() {
    let trace = run("five_number_summary", None, None);
    let expected = Value::List(
        [0.1, 0.4, 0.6, 0.8, 1.0]
            .into_iter()
            .map(Value::Real)
            .collect(),
    );
    assert_eq!(finished_value(&trace, "result"), expected);

    // findRank's counter is local and never leaks into summarize's `i`
    let inside = trace
        .iter()
        .find(|record| record.line == Some(4))
        .expect("findRank returns");
    assert_eq!(inside.variables.get("i"), Some(&Value::Int(0)));
    let after = trace
        .iter()
        .find(|record| record.line == Some(12))
        .expect("loop continues");
    assert_eq!(after.variables.get("i"), Some(&Value::Int(1)));
}

#[test]
fn test_minimax_takes_smallest_child() {
    let trace = run("minimax", None, None);
    assert_eq!(trace.len(), 9);
    assert_eq!(finished_value(&trace, "a"), Value::Int(0));
    assert_eq!(finished_value(&trace, "b"), Value::Int(-10));

    // `a` is settled before B's subtree is looked at
    let before_b = trace.get(4).expect("record for line 5");
    assert_eq!(before_b.line, Some(5));
    assert_eq!(before_b.variables.get("a"), Some(&Value::Int(0)));
    assert_eq!(before_b.variables.get("b"), Some(&Value::Unset));
}

#[test]
fn test_stored_output_budget_truncates() {
    let config = TraceConfig::default().with_max_trace_bytes(10);
    let trace = run_with("priority_queue", None, None, &config);
    let end = last(&trace);
    let error = end.error.as_ref().expect("truncated");
    assert_eq!(error.origin, ErrorOrigin::Truncated);
    assert!(error.message.contains("10 bytes"));
    assert!(trace.output_bytes() - end.output.len() <= 10);
}

#[test]
fn test_every_algorithm_ends_in_one_terminal_record() {
    let library = library();
    let config = TraceConfig::default().with_max_steps(500);
    for descriptor in library.iter() {
        let bindings = descriptor
            .presets
            .first()
            .map(|preset| preset.values.clone())
            .unwrap_or_default();
        let trace = StepMachine::run(descriptor, &bindings, None, &config);
        let terminal: Vec<_> = trace.iter().filter(|r| r.kind.is_terminal()).collect();
        assert_eq!(terminal.len(), 1, "{}", descriptor.id);
        assert!(last(&trace).kind.is_terminal(), "{}", descriptor.id);
    }
}
