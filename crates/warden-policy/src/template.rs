//! `{placeholder}` interpolation shared by justifications and routing
//! destinations.

/// Replace every `{key}` in `template` for which `lookup` yields a value.
///
/// One left-to-right pass: substituted values are copied verbatim and never
/// rescanned, so request fields containing braces cannot pull in other
/// placeholders. Unknown keys and unmatched braces are kept as written.
pub fn interpolate<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(['{', '}']) {
            Some(close) if after[close..].starts_with('}') => {
                let key = &after[..close];
                match lookup(key) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::interpolate;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "namespace" => Some("web".to_string()),
            "overage" => Some("50.00".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_known_keys_are_replaced() {
        assert_eq!(
            interpolate("over by ${overage} in '{namespace}'", lookup),
            "over by $50.00 in 'web'"
        );
    }

    #[test]
    fn test_unknown_keys_and_stray_braces_are_kept() {
        assert_eq!(interpolate("{mystery} in {namespace}", lookup), "{mystery} in web");
        assert_eq!(interpolate("open { brace", lookup), "open { brace");
        assert_eq!(interpolate("{{namespace}}", lookup), "{web}");
        assert_eq!(interpolate("trailing {", lookup), "trailing {");
    }

    /// A substituted value that itself looks like a placeholder is copied
    /// verbatim.
    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let hostile = |key: &str| match key {
            "namespace" => Some("x{overage}".to_string()),
            "overage" => Some("50.00".to_string()),
            _ => None,
        };
        assert_eq!(
            interpolate("{namespace} then {overage}", hostile),
            "x{overage} then 50.00"
        );
    }
}
