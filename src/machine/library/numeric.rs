//! Arithmetic, bit manipulation and recursion

use crate::machine::descriptor::{Descriptor, Entry, LineRule, Navigation, Resume, Variant};
use crate::machine::runner::Scope;
use crate::memory::{Environment, Value};

fn answer_variants() -> Vec<Variant> {
    ["ア", "イ", "ウ", "エ"]
        .into_iter()
        .map(|id| Variant { id, label: id })
        .collect()
}

pub fn gcd_subtraction() -> Descriptor {
    let mut d = Descriptor::new(
        "gcd_subtraction",
        "Greatest common divisor by subtraction",
        Entry {
            procedure: "gcd",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("num1", Value::Int(36)),
        ("num2", Value::Int(60)),
        ("x", Value::Unset),
        ("y", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.variants = answer_variants();
    d.default_variant = Some("エ");
    d.result = Some("result");

    // ア and イ read blank a/c as if ... endif, ウ and エ as while ... endwhile;
    // ア and ウ compare with x < y.
    fn loops(s: &Scope<'_>) -> bool {
        matches!(s.variant(), Some("ウ" | "エ"))
    }
    fn less_than(s: &Scope<'_>) -> bool {
        matches!(s.variant(), Some("ア" | "ウ"))
    }

    d.rules = vec![
        LineRule::new("○整数型: gcd(整数型: num1, 整数型: num2)"),
        LineRule::new("　整数型: x ← num1").mutate(|s| {
            let v = s.get("num1").clone();
            s.set("x", v);
        }),
        LineRule::new("　整数型: y ← num2").mutate(|s| {
            let v = s.get("num2").clone();
            s.set("y", v);
        }),
        LineRule::new("　[   a   ]  (x ≠ y)").branch(|s| s.int("x") != s.int("y"), 5, 11),
        LineRule::new("　　if ( [   b   ] )").branch(
            |s| {
                let (x, y) = (s.int("x"), s.int("y"));
                if less_than(s) {
                    x < y
                } else {
                    x > y
                }
            },
            6,
            7,
        ),
        LineRule::new("　　　x ← x - y")
            .mutate(|s| {
                let x = s.int("x").saturating_sub(s.int("y"));
                s.set("x", Value::Int(x));
            })
            .goto(9),
        LineRule::new("　　else"),
        LineRule::new("　　　y ← y - x").mutate(|s| {
            let y = s.int("y").saturating_sub(s.int("x"));
            s.set("y", Value::Int(y));
        }),
        LineRule::new("　　endif"),
        LineRule::new("　[   c   ]").decide(|s| if loops(s) { 4 } else { 11 }, &[4, 11]),
        LineRule::new("　return x").returns(|s| s.get("x").clone()),
    ];
    d
}

fn byte(s: &Scope<'_>, name: &str) -> u64 {
    match s.get(name) {
        Value::Bits { bits, .. } => *bits,
        other => other.as_int().and_then(|n| u64::try_from(n).ok()).unwrap_or(0),
    }
}

fn reverse_step(s: &mut Scope<'_>) {
    let (r, rbyte) = (byte(s, "r"), byte(s, "rbyte"));
    match s.variant() {
        Some("イ") => {
            s.set("r", Value::bits(8, (r << 7) | (rbyte & 1)));
            s.set("rbyte", Value::bits(8, rbyte >> 7));
        }
        Some("ウ") => {
            let r = Value::bits(8, (rbyte << 1) | (rbyte >> 7));
            s.set("r", r.clone());
            s.set("rbyte", r);
        }
        Some("エ") => {
            let r = Value::bits(8, (rbyte >> 1) | (rbyte << 7));
            s.set("r", r.clone());
            s.set("rbyte", r);
        }
        _ => {
            s.set("r", Value::bits(8, (r << 1) | (rbyte & 1)));
            s.set("rbyte", Value::bits(8, rbyte >> 1));
        }
    }
}

pub fn bit_reverse() -> Descriptor {
    let mut d = Descriptor::new(
        "bit_reverse",
        "Reverse the bits of a byte",
        Entry {
            procedure: "rev",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("byte", Value::bits(8, 0b0100_1011)),
        ("rbyte", Value::Unset),
        ("r", Value::Unset),
        ("i", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.variants = answer_variants();
    d.default_variant = Some("ア");
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○8ビット型: rev(8ビット型: byte)"),
        LineRule::new("　8ビット型: rbyte ← byte").mutate(|s| {
            let v = s.get("byte").clone();
            s.set("rbyte", v);
        }),
        LineRule::new("　8ビット型: r ← 00000000").mutate(|s| s.set("r", Value::bits(8, 0))),
        LineRule::new("　整数型: i"),
        LineRule::new("　for (i を 1 から 8 まで 1 ずつ増やす)")
            .mutate(|s| {
                if !s.is_set("i") {
                    s.set("i", Value::Int(1));
                }
            })
            .branch(|s| s.int("i") <= 8, 6, 8),
        LineRule::new("　　[ r と rbyte の更新 ]").mutate(reverse_step),
        LineRule::new("　endfor")
            .mutate(|s| {
                let i = s.int("i");
                s.set("i", Value::Int(i + 1));
            })
            .goto(5),
        LineRule::new("　return r").returns(|s| s.get("r").clone()),
    ];
    d
}

pub fn utf8_encode() -> Descriptor {
    let mut d = Descriptor::new(
        "utf8_encode",
        "UTF-8 encoding of a code point",
        Entry {
            procedure: "encode",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        ("codePoint", Value::Int(64)),
        ("utf8Bytes", Value::Unset),
        ("cp", Value::Unset),
        ("i", Value::Unset),
        ("result", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.result = Some("result");
    d.rules = vec![
        LineRule::new("○整数型の配列: encode(整数型: codePoint)"),
        LineRule::new("/* utf8Bytesの初期値は, ビットパターンの “x” を全て0に置き換え,"),
        LineRule::new("   8桁ごとに区切って, それぞれを2進数とみなしたときの値 */"),
        LineRule::new("整数型の配列: utf8Bytes ← {224, 128, 128}")
            .mutate(|s| s.set("utf8Bytes", Value::ints(&[224, 128, 128]))),
        LineRule::new("整数型: cp ← codePoint").mutate(|s| {
            let v = s.get("codePoint").clone();
            s.set("cp", v);
        }),
        LineRule::new("整数型: i"),
        LineRule::new("for (i を utf8Bytesの要素数 から 1 まで 1 ずつ減らす)")
            .mutate(|s| {
                if !s.is_set("i") {
                    let n = s.list("utf8Bytes").len() as i64;
                    s.set("i", Value::Int(n));
                }
            })
            .branch(|s| s.int("i") >= 1, 8, 11),
        LineRule::new("　utf8Bytes[i] ← utf8Bytes[i] + (cp ÷ 64 の余り)").mutate(|s| {
            let i = s.int("i");
            let current = s.item("utf8Bytes", i).as_int().unwrap_or(0);
            let updated = current + s.int("cp").rem_euclid(64);
            s.set_item("utf8Bytes", i, Value::Int(updated));
        }),
        LineRule::new("　cp ← cp ÷ 64 の商").mutate(|s| {
            let cp = s.int("cp").div_euclid(64);
            s.set("cp", Value::Int(cp));
        }),
        LineRule::new("endfor")
            .mutate(|s| {
                let i = s.int("i");
                s.set("i", Value::Int(i - 1));
            })
            .goto(7),
        LineRule::new("return utf8Bytes").returns(|s| s.get("utf8Bytes").clone()),
    ];
    d
}

/// `return n * factorial(n - 1)` resumes by folding the callee's value into
/// its own return, so the unwinding records no extra steps.
pub fn recursive_factorial() -> Descriptor {
    let mut d = Descriptor::new(
        "recursive_factorial",
        "Recursive factorial",
        Entry {
            procedure: "factorial",
            line: 1,
            params: &["n"],
        },
    );
    d.initial = [("n", Value::Int(4)), ("result", Value::Unset)]
        .into_iter()
        .collect();
    d.result = Some("result");
    d.navigation = Navigation::ForwardOnly;
    d.rules = vec![
        LineRule::new("○整数型: factorial(整数型: n)"),
        LineRule::new("　if (n = 0)").branch(|s| s.int("n") == 0, 3, 5),
        LineRule::new("　　return 1").returns(|_| Value::Int(1)),
        LineRule::new("　endif"),
        LineRule::new("　return n × factorial(n - 1)").call(
            "factorial",
            2,
            |s| -> Environment { [("n", Value::Int(s.int("n") - 1))].into_iter().collect() },
            Resume::tail(|s, value| {
                let product = value
                    .as_int()
                    .and_then(|v| v.checked_mul(s.int("n")));
                product.map_or(Value::Unset, Value::Int)
            }),
        ),
    ];
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_validate() {
        for descriptor in [
            gcd_subtraction(),
            bit_reverse(),
            utf8_encode(),
            recursive_factorial(),
        ] {
            assert_eq!(descriptor.validate(), Ok(()), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_default_variants_are_the_answers() {
        assert_eq!(gcd_subtraction().default_variant, Some("エ"));
        assert_eq!(bit_reverse().default_variant, Some("ア"));
    }
}
