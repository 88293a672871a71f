use std::fmt::{self, Write};

use super::extract::Value;

/// One plaintext-protocol record: `prefix.name.suffix value timestamp\n`.
///
/// The prefix and its dot are left out when the prefix is empty.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub suffix: &'a str,
    pub value: Value,
    pub timestamp: i64,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write_key_part(f, self.prefix)?;
            f.write_char('.')?;
        }
        write_key_part(f, self.name)?;
        f.write_char('.')?;
        write_key_part(f, self.suffix)?;
        writeln!(f, " {} {}", self.value, self.timestamp)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            // Display for f64 never switches to exponent notation
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Whitespace would split the record, so it becomes `_`.
fn write_key_part(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    if !part.contains(|c: char| c.is_ascii_whitespace()) {
        return f.write_str(part);
    }
    for c in part.chars() {
        f.write_char(if c.is_ascii_whitespace() { '_' } else { c })?;
    }
    Ok(())
}

/// Append `line` to a cycle's batch buffer.
pub fn push_line(buf: &mut String, line: &Line<'_>) {
    // Writing into a String cannot fail
    let _ = write!(buf, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(prefix: &'static str, value: Value) -> String {
        Line {
            prefix,
            name: "baz",
            suffix: "count",
            value,
            timestamp: 1_700_000_000,
        }
        .to_string()
    }

    #[test]
    fn with_prefix() {
        assert_eq!(line("foobar", Value::Int(5)), "foobar.baz.count 5 1700000000\n");
    }

    #[test]
    fn without_prefix() {
        assert_eq!(line("", Value::Int(5)), "baz.count 5 1700000000\n");
    }

    #[test]
    fn floats_are_plain_decimals() {
        assert_eq!(line("", Value::Float(3000.0)), "baz.count 3000 1700000000\n");
        assert_eq!(line("", Value::Float(2.5)), "baz.count 2.5 1700000000\n");
        assert_eq!(
            line("", Value::Float(1e21)),
            "baz.count 1000000000000000000000 1700000000\n"
        );
        assert_eq!(line("", Value::Float(1e-7)), "baz.count 0.0000001 1700000000\n");
        assert_eq!(line("", Value::Int(-3)), "baz.count -3 1700000000\n");
    }

    #[test]
    fn whitespace_in_keys_is_replaced() {
        let s = Line {
            prefix: "my app",
            name: "GET /users",
            suffix: "count",
            value: Value::Int(1),
            timestamp: 0,
        }
        .to_string();
        assert_eq!(s, "my_app.GET_/users.count 1 0\n");
    }

    #[test]
    fn push_line_appends() {
        let mut buf = String::new();
        for suffix in ["a", "b"] {
            push_line(
                &mut buf,
                &Line {
                    prefix: "",
                    name: "m",
                    suffix,
                    value: Value::Int(0),
                    timestamp: 9,
                },
            );
        }
        assert_eq!(buf, "m.a 0 9\nm.b 0 9\n");
    }
}
