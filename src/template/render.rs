//! Placeholder substitution for template bodies.
//!
//! Markers look like `{{.Name}}`; whitespace inside the braces and the
//! leading dot are optional, and dotted paths (`{{.User.Name}}`) walk into
//! nested objects. A marker whose name has no binding is an error.

use serde_json::{Map, Value};

use super::types::{Rendered, TemplateError, TemplateResult};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Render a template body and optional subject against `bindings`.
///
/// `bindings` must be a JSON object or null (no bindings).
pub fn render(body: &str, subject: Option<&str>, bindings: &Value) -> TemplateResult<Rendered> {
    let empty = Map::new();
    let vars = match bindings {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            return Err(TemplateError::InvalidData(
                "Variables must be an object".to_string(),
            ))
        }
    };

    let body = substitute(body, vars)?;
    let subject = match subject {
        Some(s) => substitute(s, vars)?,
        None => String::new(),
    };

    Ok(Rendered { body, subject })
}

fn substitute(template: &str, vars: &Map<String, Value>) -> TemplateResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| TemplateError::Malformed(format!("unterminated marker in {:?}", rest)))?;

        let path = after_open[..end].trim();
        let path = path.strip_prefix('.').unwrap_or(path);
        if path.is_empty() || path.split('.').any(|seg| !is_identifier(seg)) {
            return Err(TemplateError::Malformed(format!("{{{{{}}}}}", &after_open[..end])));
        }

        let value = lookup(vars, path).ok_or_else(|| TemplateError::MissingVariable(path.to_string()))?;
        out.push_str(&stringify(value));

        rest = &after_open[end + CLOSE.len()..];
    }

    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(vars: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = vars.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_simple() {
        let rendered = render("Hi {{.Name}}", None, &json!({"Name": "Ada"})).unwrap();
        assert_eq!(rendered.body, "Hi Ada");
        assert_eq!(rendered.subject, "");
    }

    #[test]
    fn test_render_body_and_subject() {
        let bindings = json!({
            "Name": "John Doe",
            "Platform": "Our Platform"
        });

        let rendered = render(
            "Hello {{.Name}},\n\nWelcome to {{.Platform}}!",
            Some("Hello {{.Name}}"),
            &bindings,
        )
        .unwrap();

        assert_eq!(rendered.body, "Hello John Doe,\n\nWelcome to Our Platform!");
        assert_eq!(rendered.subject, "Hello John Doe");
    }

    #[test]
    fn test_render_marker_spellings() {
        let bindings = json!({"name": "World"});
        let rendered = render("{{name}} {{ .name }} {{.name}}", None, &bindings).unwrap();
        assert_eq!(rendered.body, "World World World");
    }

    #[test]
    fn test_render_number_and_nested() {
        let bindings = json!({
            "count": 42,
            "user": {"name": "Alice"}
        });

        let rendered = render("{{.user.name}} has {{.count}} items", None, &bindings).unwrap();
        assert_eq!(rendered.body, "Alice has 42 items");
    }

    #[test]
    fn test_missing_variable_fails_closed() {
        let result = render("Hi {{.Name}}", None, &json!({}));
        assert_eq!(
            result,
            Err(TemplateError::MissingVariable("Name".to_string()))
        );

        let result = render("Hi", Some("Reset for {{.User}}"), &Value::Null);
        assert_eq!(
            result,
            Err(TemplateError::MissingVariable("User".to_string()))
        );
    }

    #[test]
    fn test_malformed_markers() {
        assert!(matches!(
            render("Hi {{.Name", None, &json!({"Name": "x"})),
            Err(TemplateError::Malformed(_))
        ));
        assert!(matches!(
            render("Hi {{.}}", None, &json!({})),
            Err(TemplateError::Malformed(_))
        ));
    }

    #[test]
    fn test_bindings_must_be_object() {
        assert!(matches!(
            render("Hi", None, &json!(["a"])),
            Err(TemplateError::InvalidData(_))
        ));
    }

    #[test]
    fn test_render_is_idempotent() {
        let bindings = json!({"Name": "Ada", "Link": "https://example.com/{{.Name}}"});
        let first = render("{{.Name}} -> {{.Link}}", Some("{{.Name}}"), &bindings).unwrap();
        let second = render("{{.Name}} -> {{.Link}}", Some("{{.Name}}"), &bindings).unwrap();
        assert_eq!(first, second);
        // Substituted values are not re-expanded
        assert_eq!(first.body, "Ada -> https://example.com/{{.Name}}");
    }
}
