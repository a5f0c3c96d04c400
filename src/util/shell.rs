//! Shell quoting for the regenerate-self rule.
//!
//! The emitted ninja file records the original configure arguments so
//! the `configure` rule can rerun slipway verbatim; arguments carrying
//! shell metacharacters must survive that round trip.

/// Quote a single argument for POSIX shell consumption.
pub fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=+:,@".contains(c))
    {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('\'');
    for c in arg.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Quote and join a sequence of arguments.
pub fn join(args: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    args.into_iter()
        .map(|a| quote(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("--mode=release"), "--mode=release");
        assert_eq!(quote("apps/httpd/httpd"), "apps/httpd/httpd");
    }

    #[test]
    fn test_quote_spaces() {
        assert_eq!(quote("-I /opt/dpdk include"), "'-I /opt/dpdk include'");
    }

    #[test]
    fn test_quote_single_quote() {
        assert_eq!(quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_quote_empty() {
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_join() {
        assert_eq!(
            join(["--mode", "all", "--cflags", "-O3 -g"]),
            "--mode all --cflags '-O3 -g'"
        );
    }
}
