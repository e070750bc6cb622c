//! HTML document templates
//!
//! The built-in [`HtmlTemplate`] understands three placeholders:
//!
//! ```text
//! {{ inertia_head }}   head fragment from SSR (empty without SSR)
//! {{ inertia_body }}   root container or SSR body
//! {{ t.some.path }}    HTML-escaped value from the render's extra data
//! ```
//!
//! Any other engine can be plugged in through the [`Template`] trait.

use std::path::Path;

use serde_json::Value;

use crate::error::TemplateError;

/// Inputs to one template execution.
#[derive(Debug, Clone, Copy)]
pub struct TemplateData<'a> {
    /// Trusted HTML for `<head>`.
    pub head: &'a str,
    /// Trusted HTML for the page body.
    pub body: &'a str,
    /// Opaque application data.
    pub t: &'a Value,
}

/// A document template executed once per HTML render.
pub trait Template: Send + Sync {
    fn render(&self, data: &TemplateData<'_>, out: &mut String) -> Result<(), TemplateError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Head,
    Body,
    Data(Vec<String>),
}

/// Placeholder template parsed once at startup.
#[derive(Debug, Clone)]
pub struct HtmlTemplate {
    segments: Vec<Segment>,
}

impl HtmlTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                TemplateError::Parse(format!(
                    "unclosed placeholder at byte {}",
                    source.len() - rest.len() + start
                ))
            })?;

            segments.push(parse_placeholder(after[..end].trim())?);
            rest = &after[end + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&source)
    }
}

fn parse_placeholder(name: &str) -> Result<Segment, TemplateError> {
    match name {
        "inertia_head" => Ok(Segment::Head),
        "inertia_body" => Ok(Segment::Body),
        "t" => Ok(Segment::Data(Vec::new())),
        _ => match name.strip_prefix("t.") {
            Some(path) if !path.is_empty() && path.split('.').all(|p| !p.is_empty()) => {
                Ok(Segment::Data(path.split('.').map(String::from).collect()))
            }
            _ => Err(TemplateError::Parse(format!("unknown placeholder {:?}", name))),
        },
    }
}

impl Template for HtmlTemplate {
    fn render(&self, data: &TemplateData<'_>, out: &mut String) -> Result<(), TemplateError> {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Head => out.push_str(data.head),
                Segment::Body => out.push_str(data.body),
                Segment::Data(path) => {
                    let value = lookup(data.t, path).ok_or_else(|| {
                        TemplateError::Execute(format!("t.{} is not defined", path.join(".")))
                    })?;
                    match value {
                        Value::String(s) => escape_html(out, s),
                        Value::Null => {}
                        other => escape_html(out, &other.to_string()),
                    }
                }
            }
        }

        Ok(())
    }
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Escape text for use in HTML content or a quoted attribute.
pub(crate) fn escape_html(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn render(template: &HtmlTemplate, t: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        template.render(
            &TemplateData {
                head: "<title>Hi</title>",
                body: "<div id=\"app\"></div>",
                t,
            },
            &mut out,
        )?;
        Ok(out)
    }

    #[test]
    fn test_placeholders() {
        let template = HtmlTemplate::parse(
            "<html><head>{{ inertia_head }}</head><body class=\"{{t.theme}}\">{{inertia_body}}</body></html>",
        )
        .unwrap();

        let html = render(&template, &json!({"theme": "dark"})).unwrap();
        assert_eq!(
            html,
            "<html><head><title>Hi</title></head><body class=\"dark\"><div id=\"app\"></div></body></html>"
        );
    }

    #[test]
    fn test_data_is_escaped() {
        let template =
            HtmlTemplate::parse("{{ t.user.name }}|{{ t.items.1 }}|{{ t.count }}").unwrap();
        let t = json!({"user": {"name": "<b>\"Ada\"</b>"}, "items": ["a", "b&c"], "count": 3});

        assert_eq!(
            render(&template, &t).unwrap(),
            "&lt;b&gt;&#34;Ada&#34;&lt;/b&gt;|b&amp;c|3"
        );
    }

    #[test]
    fn test_unknown_placeholder_fails_parse() {
        for source in ["{{ inertia_foot }}", "{{ t. }}", "{{ t..a }}", "{{}}"] {
            assert!(
                matches!(HtmlTemplate::parse(source), Err(TemplateError::Parse(_))),
                "source {:?}",
                source
            );
        }
    }

    #[test]
    fn test_unclosed_placeholder_fails_parse() {
        let err = HtmlTemplate::parse("<body>{{ inertia_body </body>").unwrap_err();
        assert!(err.to_string().contains("unclosed placeholder at byte 6"));
    }

    #[test]
    fn test_missing_data_fails_render() {
        let template = HtmlTemplate::parse("{{ t.missing }}").unwrap();

        let err = render(&template, &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Execute(ref msg) if msg.contains("t.missing")));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<main>{{{{ inertia_body }}}}</main>").unwrap();

        let template = HtmlTemplate::from_file(file.path()).unwrap();
        assert_eq!(
            render(&template, &Value::Null).unwrap(),
            "<main><div id=\"app\"></div></main>"
        );

        let err = HtmlTemplate::from_file("/nonexistent/app.html").unwrap_err();
        assert!(matches!(err, TemplateError::Read { .. }));
    }

    #[test]
    fn test_escape_html() {
        let mut out = String::new();
        escape_html(&mut out, "a&b<c>d\"e'f\0g");
        assert_eq!(out, "a&amp;b&lt;c&gt;d&#34;e&#39;f\u{FFFD}g");
    }
}
