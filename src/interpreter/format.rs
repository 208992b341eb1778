//! Format specifications for f-string fields, `format()` and `str.format`
//!
//! Grammar: `[[fill]align][sign][#][0][width][,][.precision][type]` with types
//! `d b o x X f F e E g G % s`.

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::object::Object;

#[derive(Debug, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: bool,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_spec(spec: &str) -> Result<FormatSpec, RuntimeError> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().is_some_and(|c| is_align(*c)) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(c @ ('+' | '-' | ' ')) = chars.get(i) {
        out.sign = Some(*c);
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        out.width = chars[start..i].iter().collect::<String>().parse().unwrap_or(0);
    }
    if matches!(chars.get(i), Some(',' | '_')) {
        out.grouping = true;
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err(RuntimeError::value_error("Format specifier missing precision"));
        }
        out.precision = chars[start..i].iter().collect::<String>().parse().ok();
    }
    if let Some(c) = chars.get(i) {
        out.kind = Some(*c);
        i += 1;
    }
    if i != chars.len() {
        return Err(RuntimeError::value_error("Invalid format specifier"));
    }
    Ok(out)
}

/// Render `value` according to `spec`
pub fn format_value(value: &Object, spec: &str) -> Result<String, RuntimeError> {
    if spec.is_empty() {
        return Ok(value.to_display());
    }
    let spec = parse_spec(spec)?;

    let (negative, body, numeric) = match spec.kind {
        Some('d') => {
            let n = value.as_int().ok_or_else(|| unknown_code('d', value))?;
            (n < 0, group(&n.unsigned_abs().to_string(), spec.grouping), true)
        }
        Some(code @ ('b' | 'o' | 'x' | 'X')) => {
            let n = value.as_int().ok_or_else(|| unknown_code(code, value))?;
            let magnitude = n.unsigned_abs();
            let (digits, prefix) = match code {
                'b' => (format!("{:b}", magnitude), "0b"),
                'o' => (format!("{:o}", magnitude), "0o"),
                'x' => (format!("{:x}", magnitude), "0x"),
                _ => (format!("{:X}", magnitude), "0X"),
            };
            let body = if spec.alternate {
                format!("{}{}", prefix, digits)
            } else {
                digits
            };
            (n < 0, body, true)
        }
        Some(code @ ('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%')) => {
            let x = value.as_float().ok_or_else(|| unknown_code(code, value))?;
            let precision = spec.precision.unwrap_or(6);
            let magnitude = x.abs();
            let body = match code {
                'f' | 'F' => group_fixed(&format!("{:.*}", precision, magnitude), spec.grouping),
                'e' | 'E' => {
                    let text = exponent(magnitude, precision);
                    if code == 'E' {
                        text.to_uppercase()
                    } else {
                        text
                    }
                }
                'g' | 'G' => general(magnitude, precision.max(1)),
                _ => format!("{:.*}%", precision, magnitude * 100.0),
            };
            (x.is_sign_negative() && x != 0.0, body, true)
        }
        Some('s') => {
            let Object::Str(s) = value else {
                return Err(unknown_code('s', value));
            };
            (false, truncate(s, spec.precision), false)
        }
        Some(code) => return Err(unknown_code(code, value)),
        None => match value {
            Object::Float(x) => {
                let body = match spec.precision {
                    Some(p) => general(x.abs(), p.max(1)),
                    None => value.to_display().trim_start_matches('-').to_string(),
                };
                (x.is_sign_negative() && *x != 0.0, body, true)
            }
            other if other.as_int().is_some() && !matches!(other, Object::Bool(_)) => {
                let n = other.as_int().unwrap_or(0);
                (n < 0, group(&n.unsigned_abs().to_string(), spec.grouping), true)
            }
            other => (false, truncate(&other.to_display(), spec.precision), false),
        },
    };

    let sign = if !numeric {
        ""
    } else if negative {
        "-"
    } else {
        match spec.sign {
            Some('+') => "+",
            Some(' ') => " ",
            _ => "",
        }
    };

    Ok(pad(sign, &body, &spec, numeric))
}

fn pad(sign: &str, body: &str, spec: &FormatSpec, numeric: bool) -> String {
    let len = sign.chars().count() + body.chars().count();
    if len >= spec.width {
        return format!("{}{}", sign, body);
    }
    let padding = spec.width - len;
    let (fill, align) = match (spec.align, spec.zero) {
        (Some(align), _) => (spec.fill.unwrap_or(' '), align),
        (None, true) if numeric => ('0', '='),
        (None, _) => (' ', if numeric { '>' } else { '<' }),
    };
    let fill_str = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();

    match align {
        '<' => format!("{}{}{}", sign, body, fill_str(padding)),
        '^' => {
            let left = padding / 2;
            format!("{}{}{}{}", fill_str(left), sign, body, fill_str(padding - left))
        }
        '=' => format!("{}{}{}", sign, fill_str(padding), body),
        _ => format!("{}{}{}", fill_str(padding), sign, body),
    }
}

fn unknown_code(code: char, value: &Object) -> RuntimeError {
    RuntimeError::value_error(format!(
        "Unknown format code '{}' for object of type '{}'",
        code,
        value.type_name()
    ))
}

fn truncate(s: &str, precision: Option<usize>) -> String {
    match precision {
        Some(p) => s.chars().take(p).collect(),
        None => s.to_string(),
    }
}

/// Insert thousands separators into a run of digits
fn group(digits: &str, grouping: bool) -> String {
    if !grouping {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn group_fixed(text: &str, grouping: bool) -> String {
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group(int_part, grouping), frac),
        None => group(text, grouping),
    }
}

/// `1.500000e+03` style
fn exponent(x: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, x);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            format!(
                "{}e{}{:02}",
                mantissa,
                if exp < 0 { '-' } else { '+' },
                exp.abs()
            )
        }
        None => text,
    }
}

/// `g` presentation: `precision` significant digits, trailing zeros removed
fn general(x: f64, precision: usize) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    if !x.is_finite() {
        return format!("{}", x);
    }
    let exp = x.log10().floor() as i32;
    let p = precision as i32;
    if exp < -4 || exp >= p {
        let text = exponent(x, precision - 1);
        match text.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", strip_zeros(mantissa), exp),
            None => text,
        }
    } else {
        let decimals = usize::try_from(p - 1 - exp).unwrap_or(0);
        strip_zeros(&format!("{:.*}", decimals, x))
    }
}

fn strip_zeros(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: Object, spec: &str) -> String {
        format_value(&value, spec).unwrap()
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(fmt(Object::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Object::Int(5), ".1f"), "5.0");
        assert_eq!(fmt(Object::Float(-2.5), "8.2f"), "   -2.50");
        assert_eq!(fmt(Object::Float(0.256), ".1%"), "25.6%");
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt(Object::Int(42), "5d"), "   42");
        assert_eq!(fmt(Object::Int(-42), "05d"), "-0042");
        assert_eq!(fmt(Object::Int(1234567), ",d"), "1,234,567");
        assert_eq!(fmt(Object::Int(75), "08b"), "01001011");
        assert_eq!(fmt(Object::Int(255), "#x"), "0xff");
    }

    #[test]
    fn test_alignment() {
        assert_eq!(fmt(Object::str("ab"), "<5"), "ab   ");
        assert_eq!(fmt(Object::str("ab"), "^6"), "  ab  ");
        assert_eq!(fmt(Object::str("ab"), "*>4"), "**ab");
        assert_eq!(fmt(Object::str("ab"), "5"), "ab   ");
    }

    #[test]
    fn test_general_and_exponent() {
        assert_eq!(fmt(Object::Float(3.14159), ".3"), "3.14");
        assert_eq!(fmt(Object::Float(1500.0), ".2e"), "1.50e+03");
        assert_eq!(fmt(Object::Float(0.00001234), "g"), "1.234e-05");
    }

    #[test]
    fn test_bad_code() {
        assert!(format_value(&Object::str("x"), "d").is_err());
        assert!(format_value(&Object::Float(1.0), "d").is_err());
    }
}
