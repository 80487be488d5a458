/// Replace `${ENV_VAR}` and `${ENV_VAR:-fallback}` placeholders in raw config text.
///
/// Unresolvable variables without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace placeholders using a custom lookup function.
///
/// Separate from [`substitute_env`] so it can be tested without touching the
/// process environment.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut inner = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            inner.push(c);
        }

        if !closed || inner.is_empty() {
            result.push_str("${");
            result.push_str(&inner);
            continue;
        }

        let (name, fallback) = match inner.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (inner.as_str(), None),
        };

        match (lookup(name), fallback) {
            (Some(val), _) if !val.is_empty() => result.push_str(&val),
            (_, Some(fallback)) => result.push_str(fallback),
            (Some(val), None) => result.push_str(&val),
            (None, None) => {
                result.push_str("${");
                result.push_str(&inner);
                result.push('}');
            },
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "MEETBRIDGE_TEST_PORT" => Some("9100".to_string()),
            "MEETBRIDGE_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("port = ${MEETBRIDGE_TEST_PORT}", lookup),
            "port = 9100"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${MEETBRIDGE_NOPE}", lookup),
            "${MEETBRIDGE_NOPE}"
        );
    }

    #[test]
    fn fallback_used_for_missing_or_empty() {
        assert_eq!(substitute_env_with("${MEETBRIDGE_NOPE:-3000}", lookup), "3000");
        assert_eq!(substitute_env_with("${MEETBRIDGE_EMPTY:-x}", lookup), "x");
        assert_eq!(
            substitute_env_with("${MEETBRIDGE_TEST_PORT:-1}", lookup),
            "9100"
        );
    }

    #[test]
    fn malformed_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${open", lookup), "a ${open");
    }
}
