//! Array algorithms
//!
//! Arrays in the pseudocode are 1-based; [`Scope::item`] and
//! [`Scope::set_item`] take those indexes directly.

use crate::machine::descriptor::{Descriptor, Entry, LineRule, Navigation, Preset, Resume, PAST_END};
use crate::machine::runner::Scope;
use crate::memory::{Environment, Value};

fn entry(procedure: &'static str, line: usize) -> Entry {
    Entry {
        procedure,
        line,
        params: &[],
    }
}

fn unset(names: &[&'static str]) -> Environment {
    names.iter().map(|&name| (name, Value::Unset)).collect()
}

fn len(s: &Scope<'_>, name: &str) -> i64 {
    s.list(name).len() as i64
}

fn increment(s: &mut Scope<'_>, name: &str) {
    let n = s.int(name);
    s.set(name, Value::Int(n + 1));
}

/// `for` headers bind their counter on first arrival
fn start_counter(s: &mut Scope<'_>, name: &str, from: i64) {
    if !s.is_set(name) {
        s.set(name, Value::Int(from));
    }
}

fn reals(items: &[f64]) -> Value {
    Value::List(items.iter().map(|&x| Value::Real(x)).collect())
}

pub fn array_sum() -> Descriptor {
    let mut d = Descriptor::new("array_sum", "Running sums", entry("makeNewArray", 1));
    d.initial = [
        ("in", Value::ints(&[3, 2, 1, 6, 5, 4])),
        ("out", Value::Unset),
        ("i", Value::Unset),
        ("tail", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○整数型の配列: makeNewArray(整数型の配列: in)"),
        LineRule::new("　整数型の配列: out ← {}").mutate(|s| s.set("out", Value::List(Vec::new()))),
        LineRule::new("　整数型: i, tail"),
        LineRule::new("　outの末尾に in[1] の値 を追加する").mutate(|s| {
            let first = s.item("in", 1);
            s.push("out", first);
        }),
        LineRule::new("　for (i を 2 から inの要素数 まで 1 ずつ増やす)")
            .mutate(|s| start_counter(s, "i", 2))
            .branch(|s| s.int("i") <= len(s, "in"), 6, 9),
        LineRule::new("　　tail ← out[outの要素数]").mutate(|s| {
            let last = s.item("out", len(s, "out"));
            s.set("tail", last);
        }),
        LineRule::new("　　outの末尾に (tail + in[i]) の結果を追加する").mutate(|s| {
            let sum = s.int("tail") + s.item("in", s.int("i")).as_int().unwrap_or(0);
            s.push("out", Value::Int(sum));
        }),
        LineRule::new("　endfor")
            .mutate(|s| increment(s, "i"))
            .goto(5),
        LineRule::new("　return out").returns(|s| s.get("out").clone()),
    ];
    d
}

pub fn array_reverse() -> Descriptor {
    let mut d = Descriptor::new("array_reverse", "Reverse in place", entry("main", 1));
    d.initial = unset(&["array", "right", "left", "tmp"]);
    d.rules = vec![
        LineRule::new("整数型の配列: array ← {1, 2, 3, 4, 5}")
            .mutate(|s| s.set("array", Value::ints(&[1, 2, 3, 4, 5]))),
        LineRule::new("整数型: right, left"),
        LineRule::new("整数型: tmp"),
        LineRule::new(""),
        LineRule::new("for (left を 1 から (arrayの要素数 ÷ 2 の商) まで 1 ずつ増やす)")
            .mutate(|s| start_counter(s, "left", 1))
            .branch(|s| s.int("left") <= len(s, "array") / 2, 6, PAST_END),
        LineRule::new("　right ← arrayの要素数 - left + 1").mutate(|s| {
            let right = len(s, "array") - s.int("left") + 1;
            s.set("right", Value::Int(right));
        }),
        LineRule::new("　tmp ← array[right]").mutate(|s| {
            let value = s.item("array", s.int("right"));
            s.set("tmp", value);
        }),
        LineRule::new("　array[right] ← array[left]").mutate(|s| {
            let value = s.item("array", s.int("left"));
            let right = s.int("right");
            s.set_item("array", right, value);
        }),
        LineRule::new("　array[left] ← tmp").mutate(|s| {
            let value = s.get("tmp").clone();
            let left = s.int("left");
            s.set_item("array", left, value);
        }),
        LineRule::new("endfor")
            .mutate(|s| increment(s, "left"))
            .goto(5),
    ];
    d
}

pub fn bin_sort() -> Descriptor {
    let mut d = Descriptor::new("bin_sort", "Bin sort", entry("binSort", 1));
    d.initial = unset(&["data", "n", "bins", "i", "result"]);
    d.required = vec!["data"];
    d.presets = vec![
        Preset::new("ア", [("data", Value::ints(&[2, 6, 3, 1, 4, 5]))]),
        Preset::new("イ", [("data", Value::ints(&[3, 1, 4, 4, 5, 2]))]),
        Preset::new("ウ", [("data", Value::ints(&[4, 2, 1, 5, 6, 2]))]),
        Preset::new("エ", [("data", Value::ints(&[5, 3, 4, 3, 2, 6]))]),
    ];
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○整数型の配列: binSort(整数型の配列: data)"),
        LineRule::new("　整数型: n ← dataの要素数").mutate(|s| {
            let n = len(s, "data");
            s.set("n", Value::Int(n));
        }),
        LineRule::new("　整数型の配列: bins ← {n個の未定義の値}").mutate(|s| {
            let n = usize::try_from(s.int("n")).unwrap_or(0);
            s.set("bins", Value::List(vec![Value::Unset; n]));
        }),
        LineRule::new("　整数型: i").mutate(|s| s.set("i", Value::Int(1))),
        LineRule::new("　for (i を 1 から n まで 1 ずつ増やす)")
            .branch(|s| s.int("i") <= s.int("n"), 6, 8),
        LineRule::new("　　bins[data[i]] ← data[i]").mutate(|s| {
            let value = s.item("data", s.int("i"));
            if let Some(slot) = value.as_int() {
                s.set_item("bins", slot, value);
            }
        }),
        LineRule::new("　endfor")
            .mutate(|s| increment(s, "i"))
            .goto(5),
        LineRule::new("　return bins").returns(|s| s.get("bins").clone()),
    ];
    d
}

pub fn similarity_ratio() -> Descriptor {
    let mut d = Descriptor::new("similarity_ratio", "Similarity ratio", entry("simRatio", 1));
    d.initial = [
        ("s1", Value::strs(&["a", "p", "p", "l", "e"])),
        ("s2", Value::strs(&["a", "p", "p", "r", "l"])),
        ("i", Value::Unset),
        ("cnt", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○実数型: simRatio(文字列型の配列: s1, 文字列型の配列: s2)"),
        LineRule::new("　整数型: i, cnt ← 0").mutate(|s| s.set("cnt", Value::Int(0))),
        LineRule::new("　if (s1の要素数 ≠ s2の要素数)").branch(|s| len(s, "s1") != len(s, "s2"), 4, 6),
        LineRule::new("　　return -1").returns(|_| Value::Int(-1)),
        LineRule::new("　endif"),
        LineRule::new("　for (i を 1 から s1の要素数 まで 1 ずつ増やす)")
            .mutate(|s| start_counter(s, "i", 1))
            .branch(|s| s.int("i") <= len(s, "s1"), 7, 11),
        LineRule::new("　　if (s1[i] = s2[i])").branch(
            |s| {
                let i = s.int("i");
                s.item("s1", i) == s.item("s2", i)
            },
            8,
            9,
        ),
        LineRule::new("　　　cnt ← cnt + 1").mutate(|s| increment(s, "cnt")),
        LineRule::new("　　endif"),
        LineRule::new("　endfor")
            .mutate(|s| increment(s, "i"))
            .goto(6),
        LineRule::new("　return cnt ÷ s1の要素数 /* 実数として計算する */").returns(|s| {
            let n = len(s, "s1");
            if n == 0 {
                Value::Unset
            } else {
                Value::Real(s.int("cnt") as f64 / n as f64)
            }
        }),
    ];
    d
}

/// Intentionally faulty search: `low ← middle` can stop making progress,
/// so preset `ウ` never leaves the loop.
pub fn binary_search() -> Descriptor {
    let mut d = Descriptor::new("binary_search", "Binary search", entry("search", 1));
    d.initial = unset(&["data", "target", "low", "high", "middle", "result"]);
    d.required = vec!["data", "target"];
    d.presets = vec![
        Preset::new("ア", [("data", Value::ints(&[10])), ("target", Value::Int(10))]),
        Preset::new("イ", [("data", Value::ints(&[10, 20])), ("target", Value::Int(10))]),
        Preset::new("ウ", [("data", Value::ints(&[10, 20])), ("target", Value::Int(20))]),
        Preset::new(
            "エ",
            [("data", Value::ints(&[10, 20, 30, 40])), ("target", Value::Int(30))],
        ),
    ];
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○整数型: search(整数型の配列: data, 整数型: target)"),
        LineRule::new("　整数型: low, high, middle"),
        LineRule::new(""),
        LineRule::new("　low ← 1").mutate(|s| s.set("low", Value::Int(1))),
        LineRule::new("　high ← dataの要素数").mutate(|s| {
            let high = len(s, "data");
            s.set("high", Value::Int(high));
        }),
        LineRule::new(""),
        LineRule::new("　while (low ≦ high)").branch(|s| s.int("low") <= s.int("high"), 8, 18),
        LineRule::new("　　middle ← (low + high) ÷ 2 の商").mutate(|s| {
            let middle = (s.int("low") + s.int("high")).div_euclid(2);
            s.set("middle", Value::Int(middle));
        }),
        LineRule::new("　　if (data[middle] < target)").decide(
            |s| {
                let probe = s.item("data", s.int("middle")).as_int().unwrap_or(0);
                let target = s.int("target");
                if probe < target {
                    10
                } else if probe > target {
                    11
                } else {
                    13
                }
            },
            &[10, 11, 13],
        ),
        LineRule::new("　　　low ← middle")
            .mutate(|s| {
                let middle = s.get("middle").clone();
                s.set("low", middle);
            })
            .goto(16),
        LineRule::new("　　elseif (data[middle] > target)").branch(
            |s| s.item("data", s.int("middle")).as_int().unwrap_or(0) > s.int("target"),
            12,
            13,
        ),
        LineRule::new("　　　high ← middle")
            .mutate(|s| {
                let middle = s.get("middle").clone();
                s.set("high", middle);
            })
            .goto(16),
        LineRule::new("　　else"),
        LineRule::new("　　　return middle").returns(|s| s.get("middle").clone()),
        LineRule::new("　　endif"),
        LineRule::new("　endwhile").goto(7),
        LineRule::new(""),
        LineRule::new("　return -1").returns(|_| Value::Int(-1)),
    ];
    d
}

pub fn five_number_summary() -> Descriptor {
    let mut d = Descriptor::new(
        "five_number_summary",
        "Five-number summary",
        entry("summarize", 6),
    );
    d.initial = [
        (
            "sortedData",
            reals(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        ),
        ("rankData", Value::Unset),
        ("p", Value::Unset),
        ("i", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.result = Some("result");
    d.navigation = Navigation::ForwardOnly;
    d.rules = vec![
        LineRule::new("○実数型: findRank(実数型の配列: sortedData, 実数型: p)"),
        LineRule::new("　整数型: i").mutate(|s| s.set_local("i", Value::Unset)),
        LineRule::new("　i ← (sortedDataの要素数 - 1) × p の小数点以下を切り上げた値").mutate(|s| {
            let rank = ((len(s, "sortedData") - 1) as f64 * s.real("p")).ceil();
            s.set_local("i", Value::Int(rank as i64));
        }),
        LineRule::new("　return sortedData[i + 1]").returns(|s| s.item("sortedData", s.int("i") + 1)),
        LineRule::new(""),
        LineRule::new("○実数型の配列: summarize(実数型の配列: sortedData)"),
        LineRule::new("　実数型の配列: rankData ← {}")
            .mutate(|s| s.set("rankData", Value::List(Vec::new()))),
        LineRule::new("　実数型の配列: p ← {0, 0.25, 0.5, 0.75, 1}")
            .mutate(|s| s.set("p", reals(&[0.0, 0.25, 0.5, 0.75, 1.0]))),
        LineRule::new("　整数型: i"),
        LineRule::new("　for (i を 1 から pの要素数 まで 1 ずつ増やす)")
            .mutate(|s| start_counter(s, "i", 1))
            .branch(|s| s.int("i") <= len(s, "p"), 11, 13),
        LineRule::new("　　rankDataの末尾に findRank(sortedData, p[i])の戻り値 を追加する").call(
            "findRank",
            1,
            |s| [("p", s.item("p", s.int("i")))].into_iter().collect(),
            Resume::receiving(12, |s, value| s.push("rankData", value)),
        ),
        LineRule::new("　endfor")
            .mutate(|s| increment(s, "i"))
            .goto(10),
        LineRule::new("　return rankData").returns(|s| s.get("rankData").clone()),
    ];
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_validate() {
        for descriptor in [
            array_sum(),
            array_reverse(),
            bin_sort(),
            similarity_ratio(),
            binary_search(),
            five_number_summary(),
        ] {
            assert_eq!(descriptor.validate(), Ok(()), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_binary_search_presets_carry_both_inputs() {
        let descriptor = binary_search();
        for preset in &descriptor.presets {
            assert!(descriptor.missing(&preset.values).is_empty(), "{}", preset.label);
        }
    }
}
