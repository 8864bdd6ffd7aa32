//! `${name}` placeholder substitution
//!
//! A placeholder outside a string literal is replaced by the argument's
//! source text. Inside a string literal the literal is split around it,
//! `"Hello, ${name}!"` becoming `"Hello, " + name + "!"`.

/// Replace every placeholder in `template` with `lookup(name)`.
///
/// Fails with a description when a placeholder is unterminated or `lookup`
/// does not know its name.
pub fn substitute(
    template: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut in_string = false;
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("${") {
            let Some(end) = rest.find('}') else {
                return Err("unterminated placeholder '${'".to_string());
            };
            let name = rest[2..end].trim();
            let value = lookup(name).ok_or_else(|| format!("unknown placeholder '${{{}}}'", name))?;
            if in_string {
                out.push_str("\" + ");
                out.push_str(&value);
                out.push_str(" + \"");
            } else {
                out.push_str(&value);
            }
            rest = &rest[end + 1..];
            continue;
        }

        match c {
            '"' => in_string = !in_string,
            '\\' if in_string => {
                // keep the escape and the escaped character together
                out.push(c);
                rest = &rest[1..];
                if let Some(escaped) = rest.chars().next() {
                    out.push(escaped);
                    rest = &rest[escaped.len_utf8()..];
                }
                continue;
            }
            _ => {}
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str) -> Option<String> {
        match name {
            "name" => Some("user.name".to_string()),
            "a" => Some("(x + 1)".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_splices_into_string_literals() {
        let text = substitute("\"Hello, ${name}!\"", args).unwrap();
        assert_eq!(text, "\"Hello, \" + user.name + \"!\"");
    }

    #[test]
    fn test_substitutes_code_positions() {
        assert_eq!(substitute("${a} * ${a}", args).unwrap(), "(x + 1) * (x + 1)");
        assert_eq!(
            substitute("log(\"a\\\"${name}\")", args).unwrap(),
            "log(\"a\\\"\" + user.name + \"\")"
        );
    }

    #[test]
    fn test_reports_unknown_placeholders() {
        assert!(substitute("${missing}", args).unwrap_err().contains("missing"));
        assert!(substitute("${name", args).is_err());
    }
}
