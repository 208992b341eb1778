// Property-based tests for trace invariants
//
// 1. Every trace ends in exactly one terminal record
// 2. Cumulative output only grows along a trace
// 3. Step limits bound trace length exactly
// 4. Cursor movement never leaves the trace

use proptest::prelude::*;
use steptrace::config::TraceConfig;
use steptrace::machine::{Library, StepMachine};
use steptrace::memory::{Environment, Value};
use steptrace::sequencer::{TraceRequest, TraceSequencer};
use steptrace::snapshot::{ErrorOrigin, Trace};
use steptrace::tracer::SourceTracer;

#[derive(Debug, Clone)]
enum Line {
    Add(i64),
    Print(i64),
    PrintTotal,
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        (-1000i64..1000).prop_map(Line::Add),
        (-1000i64..1000).prop_map(Line::Print),
        Just(Line::PrintTotal),
    ]
}

fn render(lines: &[Line]) -> String {
    let mut source = String::from("total = 0\n");
    for line in lines {
        match line {
            Line::Add(n) => source.push_str(&format!("total = total + {}\n", n)),
            Line::Print(n) => source.push_str(&format!("print({})\n", n)),
            Line::PrintTotal => source.push_str("print(total)\n"),
        }
    }
    source
}

fn assert_well_formed(trace: &Trace) {
    let terminal = trace.iter().filter(|r| r.is_terminal()).count();
    assert_eq!(terminal, 1);
    assert!(trace.last().is_some_and(|r| r.is_terminal()));
    for pair in trace.steps().windows(2) {
        assert!(pair[1].output.starts_with(&pair[0].output));
    }
}

fn factorial(n: i64) -> i64 {
    (1..=n).product()
}

proptest! {
    #[test]
    fn prop_straight_line_programs(lines in prop::collection::vec(line_strategy(), 0..30)) {
        let source = render(&lines);
        let trace = SourceTracer::default().trace(&source).trace;
        assert_well_formed(&trace);
        // One record per line plus the terminal one
        prop_assert_eq!(trace.len(), lines.len() + 2);

        let expected: i64 = lines
            .iter()
            .map(|line| if let Line::Add(n) = line { *n } else { 0 })
            .sum();
        let end = trace.last().expect("terminal record");
        prop_assert_eq!(end.variables.get("total"), Some(&Value::Int(expected)));
    }

    #[test]
    fn prop_step_limit_is_exact(limit in 2usize..300) {
        let config = TraceConfig::default().with_max_steps(limit);
        let trace = SourceTracer::new(config).trace("i = 0\nwhile True:\n    i += 1\n").trace;
        assert_well_formed(&trace);
        prop_assert_eq!(trace.len(), limit);
        let origin = trace.last().and_then(|r| r.error.as_ref()).map(|e| e.origin);
        prop_assert_eq!(origin, Some(ErrorOrigin::Truncated));
    }

    #[test]
    fn prop_factorial_matches(n in 0i64..=12) {
        let library = Library::standard().expect("library");
        let descriptor = library.get("recursive_factorial").expect("factorial");
        let bindings: Environment = [("n", Value::Int(n))].into_iter().collect();
        let trace = StepMachine::run(descriptor, &bindings, None, &TraceConfig::default());
        assert_well_formed(&trace);

        let end = trace.last().expect("terminal record");
        prop_assert_eq!(end.variables.get("result"), Some(&Value::Int(factorial(n))));
        let calls = trace.iter().filter(|r| r.line == Some(5)).count();
        prop_assert_eq!(calls as i64, n);
    }

    #[test]
    fn prop_fizz_buzz_classifies(num in -1000i64..1000) {
        let library = Library::standard().expect("library");
        let descriptor = library.get("fizz_buzz").expect("fizz_buzz");
        let bindings: Environment = [("num", Value::Int(num))].into_iter().collect();
        let trace = StepMachine::run(descriptor, &bindings, None, &TraceConfig::default());
        assert_well_formed(&trace);

        let expected = if num % 15 == 0 {
            "3と5で割り切れる"
        } else if num % 3 == 0 {
            "3で割り切れる"
        } else if num % 5 == 0 {
            "5で割り切れる"
        } else {
            "3でも5でも割り切れない"
        };
        let end = trace.last().expect("terminal record");
        prop_assert_eq!(end.variables.get("result"), Some(&Value::str(expected)));
    }

    #[test]
    fn prop_cursor_stays_in_bounds(moves in prop::collection::vec(0u8..4, 0..60)) {
        let library = Library::standard().expect("library");
        let mut seq = TraceSequencer::new(library);
        seq.begin(
            TraceRequest::Source("a = 1\nfor i in range(4):\n    a = a * 2\n".to_string()),
            TraceConfig::default(),
        )
        .expect("source session");
        let len = seq.len();
        for step in moves {
            let before = seq.position();
            match step {
                0 => {
                    seq.advance();
                    prop_assert_eq!(seq.position(), (before + 1).min(len - 1));
                }
                1 => {
                    seq.retreat();
                    prop_assert_eq!(seq.position(), before.saturating_sub(1));
                }
                2 => {
                    seq.jump_to_end();
                    prop_assert_eq!(seq.position(), len - 1);
                }
                _ => {
                    seq.jump_to_start();
                    prop_assert_eq!(seq.position(), 0);
                }
            }
            prop_assert!(seq.current().is_some());
        }
    }
}
