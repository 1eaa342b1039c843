//! Shell quoting for displaying commands.

/// Quote a string for display in a shell command line.
///
/// Only quotes when the string contains characters the shell would
/// interpret; uses single quotes.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    if s.chars().all(|c| {
        c.is_alphanumeric() || matches!(c, '-' | '_' | '=' | '/' | '.' | ':' | ',' | '@' | '+')
    }) {
        return s.to_string();
    }

    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("ripgrep"), "ripgrep");
        assert_eq!(shell_quote("@angular/cli@17"), "@angular/cli@17");
        assert_eq!(shell_quote("foo bar"), "'foo bar'");
        assert_eq!(shell_quote("foo'bar"), "'foo'\\''bar'");
        assert_eq!(shell_quote("--needed"), "--needed");
    }
}
