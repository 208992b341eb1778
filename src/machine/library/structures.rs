//! Queues, linked lists and trees
//!
//! Linked-list cells live in the `listData` array and point at each other by
//! 0-based index; `listHead`, `prev` and `curr` hold such indexes.

use crate::machine::descriptor::{Descriptor, Entry, LineRule, Navigation, Preset, Resume};
use crate::machine::runner::Scope;
use crate::memory::{Environment, Value};

fn enqueue(s: &mut Scope<'_>, value: &str, prio: i64) {
    let item = Value::record([("value", Value::str(value)), ("prio", Value::Int(prio))]);
    s.push("queue", item);
}

/// Remove the first item with the smallest priority
fn dequeue(s: &mut Scope<'_>) -> Value {
    let Some(items) = s.get_mut("queue").and_then(Value::as_list_mut) else {
        return Value::Unset;
    };
    let prio = |item: &Value| item.field("prio").and_then(|p| p.as_int()).unwrap_or(i64::MAX);
    let mut best: Option<(usize, i64)> = None;
    for (index, item) in items.iter().enumerate() {
        let p = prio(item);
        if best.map_or(true, |(_, min)| p < min) {
            best = Some((index, p));
        }
    }
    match best {
        Some((index, _)) => items.remove(index).field("value").unwrap_or_default(),
        None => Value::Unset,
    }
}

pub fn priority_queue() -> Descriptor {
    let mut d = Descriptor::new(
        "priority_queue",
        "Priority queue scheduling",
        Entry {
            procedure: "prioSched",
            line: 1,
            params: &[],
        },
    );
    d.initial = [("queue", Value::Unset)].into_iter().collect();
    d.rules = vec![
        LineRule::new("○prioSched()"),
        LineRule::new("　prioQueue: PrioQueue ← PrioQueue()")
            .mutate(|s| s.set("queue", Value::List(Vec::new()))),
        LineRule::new("　prioQueue.enqueue(\"A\", 1)").mutate(|s| enqueue(s, "A", 1)),
        LineRule::new("　prioQueue.enqueue(\"B\", 2)").mutate(|s| enqueue(s, "B", 2)),
        LineRule::new("　prioQueue.enqueue(\"C\", 2)").mutate(|s| enqueue(s, "C", 2)),
        LineRule::new("　prioQueue.enqueue(\"D\", 3)").mutate(|s| enqueue(s, "D", 3)),
        LineRule::new("　prioQueue.dequeue() /* 戻り値は使用しない */").mutate(|s| {
            dequeue(s);
        }),
        LineRule::new("　prioQueue.dequeue() /* 戻り値は使用しない */").mutate(|s| {
            dequeue(s);
        }),
        LineRule::new("　prioQueue.enqueue(\"D\", 3)").mutate(|s| enqueue(s, "D", 3)),
        LineRule::new("　prioQueue.enqueue(\"B\", 2)").mutate(|s| enqueue(s, "B", 2)),
        LineRule::new("　prioQueue.dequeue() /* 戻り値は使用しない */").mutate(|s| {
            dequeue(s);
        }),
        LineRule::new("　prioQueue.dequeue() /* 戻り値は使用しない */").mutate(|s| {
            dequeue(s);
        }),
        LineRule::new("　prioQueue.enqueue(\"C\", 2)").mutate(|s| enqueue(s, "C", 2)),
        LineRule::new("　prioQueue.enqueue(\"A\", 1)").mutate(|s| enqueue(s, "A", 1)),
        LineRule::new("　while (prioQueue.size() が 0 と等しくない)")
            .branch(|s| !s.list("queue").is_empty(), 16, 17),
        LineRule::new("　　prioQueue.dequeue() の戻り値を出力")
            .mutate(|s| {
                let value = dequeue(s);
                s.print_value(&value);
            })
            .goto(15),
        LineRule::new("　endwhile"),
    ];
    d
}

fn tree_children(s: &Scope<'_>) -> Vec<Value> {
    s.item("tree", s.int("n")).as_list().unwrap_or(&[]).to_vec()
}

fn child_frame(s: &Scope<'_>, child: usize) -> Environment {
    let n = tree_children(s).get(child).cloned().unwrap_or_default();
    [("n", n)].into_iter().collect()
}

/// In-order walk of a 14-node binary tree stored as child-index arrays
pub fn binary_tree_traversal() -> Descriptor {
    let mut d = Descriptor::new(
        "binary_tree_traversal",
        "Binary tree traversal",
        Entry {
            procedure: "order",
            line: 5,
            params: &["n"],
        },
    );
    let tree: [&[i64]; 14] = [
        &[2, 3],
        &[4, 5],
        &[6, 7],
        &[8, 9],
        &[10, 11],
        &[12, 13],
        &[14],
        &[],
        &[],
        &[],
        &[],
        &[],
        &[],
        &[],
    ];
    d.initial = [
        (
            "tree",
            Value::List(tree.iter().map(|children| Value::ints(children)).collect()),
        ),
        ("n", Value::Int(1)),
    ]
    .into_iter()
    .collect();
    d.navigation = Navigation::ForwardOnly;
    d.rules = vec![
        LineRule::new("大域: 整数型配列の配列: tree ← {{2, 3}, {4, 5}, {6, 7}, {8, 9},"),
        LineRule::new("                            {10, 11}, {12, 13}, {14}, {}, {},"),
        LineRule::new("                            {}, {}, {}, {}} // {}は要素数0の配列"),
        LineRule::new(""),
        LineRule::new("○order(整数型: n)"),
        LineRule::new("　if (tree[n]の要素数 が 2 と等しい)")
            .branch(|s| tree_children(s).len() == 2, 7, 10),
        LineRule::new("　　order(tree[n][1])").call(
            "order",
            5,
            |s| child_frame(s, 0),
            Resume::at(8),
        ),
        LineRule::new("　　nを出力").mutate(|s| {
            let n = s.get("n").clone();
            s.print(n);
        }),
        LineRule::new("　　order(tree[n][2])").call(
            "order",
            5,
            |s| child_frame(s, 1),
            Resume::at(15),
        ),
        LineRule::new("　elseif (tree[n]の要素数 が 1 と等しい)")
            .branch(|s| tree_children(s).len() == 1, 11, 13),
        LineRule::new("　　order(tree[n][1])").call(
            "order",
            5,
            |s| child_frame(s, 0),
            Resume::at(12),
        ),
        LineRule::new("　　nを出力")
            .mutate(|s| {
                let n = s.get("n").clone();
                s.print(n);
            })
            .goto(15),
        LineRule::new("　else"),
        LineRule::new("　　nを出力").mutate(|s| {
            let n = s.get("n").clone();
            s.print(n);
        }),
        LineRule::new("　endif").leave(),
    ];
    d
}

fn index(value: &Value) -> Option<usize> {
    value.as_int().and_then(|n| usize::try_from(n).ok())
}

/// Successor of the cell at `at`, as an index value
fn next_of(s: &Scope<'_>, at: &Value) -> Value {
    index(at)
        .and_then(|i| s.list("listData").get(i))
        .and_then(Value::next_index)
        .map_or(Value::Unset, |next| Value::Int(next as i64))
}

fn set_next(s: &mut Scope<'_>, at: &Value, next: &Value) {
    let Some(i) = index(at) else {
        return;
    };
    let next = index(next);
    if let Some(Value::Node { next: link, .. }) = s
        .get_mut("listData")
        .and_then(Value::as_list_mut)
        .and_then(|cells| cells.get_mut(i))
    {
        *link = next;
    }
}

fn cells(items: &[(&str, Option<usize>)]) -> Value {
    Value::List(
        items
            .iter()
            .map(|&(value, next)| Value::node(Value::str(value), next))
            .collect(),
    )
}

pub fn linked_list_delete() -> Descriptor {
    let mut d = Descriptor::new(
        "linked_list_delete",
        "Delete from a singly linked list",
        Entry {
            procedure: "delNode",
            line: 1,
            params: &[],
        },
    );
    d.initial = [
        (
            "listData",
            cells(&[("A", Some(1)), ("B", Some(2)), ("C", Some(3)), ("D", None)]),
        ),
        ("listHead", Value::Int(0)),
        ("pos", Value::Int(3)),
        ("prev", Value::Unset),
        ("i", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.rules = vec![
        LineRule::new("大域: ListElement: listHead // リストの先頭要素が格納されている"),
        LineRule::new(""),
        LineRule::new("○delNode(整数型: pos) /* posは, リストの要素数以下の正の整数 */"),
        LineRule::new("　ListElement: prev"),
        LineRule::new("　整数型: i"),
        LineRule::new("　if (pos が 1 と等しい)").branch(|s| s.int("pos") == 1, 7, 8),
        LineRule::new("　　listHead ← listHead.next")
            .mutate(|s| {
                let next = next_of(s, s.get("listHead"));
                s.set("listHead", next);
            })
            .goto(15),
        LineRule::new("　else"),
        LineRule::new("　　prev ← listHead").mutate(|s| {
            let head = s.get("listHead").clone();
            s.set("prev", head);
        }),
        LineRule::new("　　/* posが2等しいときは繰返し処理を実行しない */"),
        LineRule::new("　　for (i を 2 から pos - 1 まで 1 ずつ増やす)")
            .mutate(|s| {
                if !s.is_set("i") {
                    s.set("i", Value::Int(2));
                }
            })
            .branch(|s| s.int("i") <= s.int("pos") - 1, 12, 14),
        LineRule::new("　　　prev ← prev.next").mutate(|s| {
            let next = next_of(s, s.get("prev"));
            s.set("prev", next);
        }),
        LineRule::new("　　endfor")
            .mutate(|s| {
                let i = s.int("i");
                s.set("i", Value::Int(i + 1));
            })
            .goto(11),
        LineRule::new("　　prev.next ← prev.next.next").mutate(|s| {
            let prev = s.get("prev").clone();
            let skip = next_of(s, &next_of(s, &prev));
            set_next(s, &prev, &skip);
        }),
        LineRule::new("　endif").leave(),
    ];
    d
}

pub fn linked_list_append() -> Descriptor {
    let mut d = Descriptor::new(
        "linked_list_append",
        "Append to a singly linked list",
        Entry {
            procedure: "append",
            line: 3,
            params: &[],
        },
    );
    d.initial = [
        ("listData", Value::Unset),
        ("listHead", Value::Unset),
        ("qVal", Value::Unset),
        ("prev", Value::Unset),
        ("curr", Value::Unset),
    ]
    .into_iter()
    .collect();
    d.required = vec!["listData", "qVal"];
    d.presets = vec![
        Preset::new(
            "Case1",
            [
                ("listData", Value::List(Vec::new())),
                ("listHead", Value::Unset),
                ("qVal", Value::str("A")),
            ],
        ),
        Preset::new(
            "Case2",
            [
                ("listData", cells(&[("A", Some(1)), ("B", Some(2)), ("C", None)])),
                ("listHead", Value::Int(0)),
                ("qVal", Value::str("D")),
            ],
        ),
    ];
    d.rules = vec![
        LineRule::new("大域: ListElement: listHead ← 未定義の値"),
        LineRule::new(""),
        LineRule::new("○append(文字列型: qVal)"),
        LineRule::new("　ListElement: prev, curr"),
        LineRule::new("　curr ← ListElement(qVal)").mutate(|s| {
            let cell = Value::node(s.get("qVal").clone(), None);
            let at = s.list("listData").len() as i64;
            s.push("listData", cell);
            s.set("curr", Value::Int(at));
        }),
        LineRule::new("　if (listHead が 未定義)").branch(|s| !s.is_set("listHead"), 7, 8),
        LineRule::new("　　listHead ← curr")
            .mutate(|s| {
                let curr = s.get("curr").clone();
                s.set("listHead", curr);
            })
            .goto(14),
        LineRule::new("　else"),
        LineRule::new("　　prev ← listHead").mutate(|s| {
            let head = s.get("listHead").clone();
            s.set("prev", head);
        }),
        LineRule::new("　　while (prev.next が 未定義でない)")
            .branch(|s| next_of(s, s.get("prev")).is_set(), 11, 12),
        LineRule::new("　　　prev ← prev.next")
            .mutate(|s| {
                let next = next_of(s, s.get("prev"));
                s.set("prev", next);
            })
            .goto(10),
        LineRule::new("　　endwhile"),
        LineRule::new("　　prev.next ← curr").mutate(|s| {
            let prev = s.get("prev").clone();
            let curr = s.get("curr").clone();
            set_next(s, &prev, &curr);
        }),
        LineRule::new("　endif").leave(),
    ];
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_validate() {
        for descriptor in [
            priority_queue(),
            binary_tree_traversal(),
            linked_list_delete(),
            linked_list_append(),
        ] {
            assert_eq!(descriptor.validate(), Ok(()), "{}", descriptor.id);
        }
    }

    #[test]
    fn test_dequeue_takes_first_lowest_priority() {
        let mut globals = Environment::new();
        let mut output = String::new();
        let mut scope = Scope::new(&mut globals, None, &mut output, None);
        enqueue(&mut scope, "B", 2);
        enqueue(&mut scope, "C", 2);
        enqueue(&mut scope, "A", 1);
        assert_eq!(dequeue(&mut scope), Value::str("A"));
        assert_eq!(dequeue(&mut scope), Value::str("B"));
        assert_eq!(dequeue(&mut scope), Value::str("C"));
        assert_eq!(dequeue(&mut scope), Value::Unset);
    }
}
