//! Straight-line code and selection

use crate::machine::descriptor::{Descriptor, Entry, LineRule, Preset};
use crate::memory::Value;

pub fn variable_swap() -> Descriptor {
    let mut d = Descriptor::new(
        "variable_swap",
        "Variable assignment",
        Entry {
            procedure: "main",
            line: 1,
            params: &[],
        },
    );
    d.initial = ["x", "y", "z"].into_iter().map(|n| (n, Value::Unset)).collect();
    d.rules = vec![
        LineRule::new("整数型: x ← 1").mutate(|s| s.set("x", Value::Int(1))),
        LineRule::new("整数型: y ← 2").mutate(|s| s.set("y", Value::Int(2))),
        LineRule::new("整数型: z ← 3").mutate(|s| s.set("z", Value::Int(3))),
        LineRule::new("x ← y").mutate(|s| {
            let y = s.get("y").clone();
            s.set("x", y);
        }),
        LineRule::new("y ← z").mutate(|s| {
            let z = s.get("z").clone();
            s.set("y", z);
        }),
        LineRule::new("z ← x").mutate(|s| {
            let x = s.get("x").clone();
            s.set("z", x);
        }),
        LineRule::new("yとzの値をこの順にコンマ区切りで出力する").mutate(|s| {
            let text = format!("{},{}", s.get("y"), s.get("z"));
            s.print(text);
        }),
    ];
    d
}

pub fn fizz_buzz() -> Descriptor {
    let mut d = Descriptor::new(
        "fizz_buzz",
        "Divisibility by 3 and 5",
        Entry {
            procedure: "fizzBuzz",
            line: 1,
            params: &[],
        },
    );
    d.initial = [("num", Value::Unset), ("result", Value::Unset)]
        .into_iter()
        .collect();
    d.required = vec!["num"];
    d.presets = num_presets(&[("3", 3), ("5", 5), ("15", 15), ("7", 7)]);
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○文字列型: fizzBuzz(整数型: num)"),
        LineRule::new("　文字列型: result").mutate(|s| s.set("result", Value::Unset)),
        LineRule::new("　if (num が 3と5 で割り切れる)").branch(|s| s.int("num") % 15 == 0, 4, 5),
        LineRule::new("　　result ← \"3と5で割り切れる\"")
            .mutate(|s| s.set("result", Value::str("3と5で割り切れる")))
            .goto(12),
        LineRule::new("　elseif (num が 3 で割り切れる)").branch(|s| s.int("num") % 3 == 0, 6, 7),
        LineRule::new("　　result ← \"3で割り切れる\"")
            .mutate(|s| s.set("result", Value::str("3で割り切れる")))
            .goto(12),
        LineRule::new("　elseif (num が 5 で割り切れる)").branch(|s| s.int("num") % 5 == 0, 8, 9),
        LineRule::new("　　result ← \"5で割り切れる\"")
            .mutate(|s| s.set("result", Value::str("5で割り切れる")))
            .goto(12),
        LineRule::new("　else"),
        LineRule::new("　　result ← \"3でも5でも割り切れない\"")
            .mutate(|s| s.set("result", Value::str("3でも5でも割り切れない")))
            .goto(12),
        LineRule::new("　endif"),
        LineRule::new("　return result").returns(|s| s.get("result").clone()),
    ];
    d
}

pub fn expression_eval() -> Descriptor {
    let mut d = Descriptor::new(
        "expression_eval",
        "Distance from the origin",
        Entry {
            procedure: "calc",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("x", Value::Int(3)),
        ("y", Value::Int(4)),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○実数型: calc(実数型: x, 実数型: y)"),
        LineRule::new("　return (x の 2乗 + y の 2乗) の正の平方根").returns(|s| {
            let (x, y) = (s.real("x"), s.real("y"));
            Value::Real((x * x + y * y).sqrt())
        }),
    ];
    d
}

/// Opponent-turn node values: each child of the root takes the smallest
/// value among its own children
pub fn minimax() -> Descriptor {
    let mut d = Descriptor::new(
        "minimax",
        "Minimax evaluation",
        Entry {
            procedure: "evaluate",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("leavesA", Value::ints(&[0, 10])),
        ("leavesB", Value::ints(&[-10, 0])),
        ("a", Value::Unset),
        ("b", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.rules = vec![
        LineRule::new("【評価手順のトレース】"),
        LineRule::new("1. Aが指す子の評価値を計算する"),
        LineRule::new("  - さらにその子(孫)の評価値を確認 (0 と 10)"),
        LineRule::new("  - 「相手の手番」なので、最小値を選択 → 0")
            .mutate(|s| {
                let value = smallest(s.list("leavesA"));
                s.set("a", value);
            }),
        LineRule::new("2. Bが指す子の評価値を計算する"),
        LineRule::new("  - さらにその子(孫)の評価値を確認 (-10 と 0)"),
        LineRule::new("  - 「相手の手番」なので、最小値を選択 → -10")
            .mutate(|s| {
                let value = smallest(s.list("leavesB"));
                s.set("b", value);
            }),
        LineRule::new("3. 計算完了").end(),
    ];
    d
}

fn smallest(values: &[Value]) -> Value {
    values
        .iter()
        .filter_map(Value::as_int)
        .min()
        .map_or(Value::Unset, Value::Int)
}

pub fn admission_fee() -> Descriptor {
    let mut d = Descriptor::new(
        "admission_fee",
        "Admission fee by age",
        Entry {
            procedure: "fee",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("num", Value::Unset),
        ("ret", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.required = vec!["num"];
    d.presets = num_presets(&[("2", 2), ("4", 4), ("9", 9), ("11", 11)]);
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○整数型: fee(整数型: num)"),
        LineRule::new("　整数型: ret").mutate(|s| s.set("ret", Value::Unset)),
        LineRule::new("　if (num が 3 以下)").branch(|s| s.int("num") <= 3, 4, 5),
        LineRule::new("　　ret ← 100")
            .mutate(|s| s.set("ret", Value::Int(100)))
            .goto(9),
        LineRule::new("　elseif (num が 9 以下)").branch(|s| s.int("num") <= 9, 6, 7),
        LineRule::new("　　ret ← 300")
            .mutate(|s| s.set("ret", Value::Int(300)))
            .goto(9),
        LineRule::new("　else"),
        LineRule::new("　　ret ← 500").mutate(|s| s.set("ret", Value::Int(500))),
        LineRule::new("　endif"),
        LineRule::new("　return ret").returns(|s| s.get("ret").clone()),
    ];
    d
}

fn num_presets(values: &[(&'static str, i64)]) -> Vec<Preset> {
    values
        .iter()
        .map(|&(label, n)| Preset::new(label, [("num", Value::Int(n))]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_validate() {
        for descriptor in [variable_swap(), fizz_buzz(), expression_eval(), admission_fee()] {
            assert_eq!(descriptor.validate(), Ok(()), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_fizz_buzz_presets() {
        let labels: Vec<_> = fizz_buzz().presets.iter().map(|p| p.label).collect();
        assert_eq!(labels, vec!["3", "5", "15", "7"]);
    }
}
