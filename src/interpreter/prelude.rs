//! Library functions written in the scripting language itself
//!
//! Loaded into the globals before the user program runs. Their line events are
//! tagged [`SourceUnit::Prelude`](crate::interpreter::observer::SourceUnit) and
//! their names never appear in captured variables.

pub const PRELUDE: &str = r#"
def abs(x):
    if x < 0:
        return -x
    return x

def sum(items, start=0):
    total = start
    for item in items:
        total = total + item
    return total

def reversed(items):
    result = []
    i = len(items) - 1
    while i >= 0:
        result.append(items[i])
        i -= 1
    return result

def any(items):
    for item in items:
        if item:
            return True
    return False

def all(items):
    for item in items:
        if not item:
            return False
    return True

def pow(base, exp):
    return base ** exp

def divmod(a, b):
    return (a // b, a % b)
"#;
