//! Record-to-props extraction
//!
//! A record describes its fields declaratively: a name, an optional tag
//! string and the field value. The tag grammar is
//!
//! ```text
//! <name>,<kind>,<mergeable>,<concurrent|omitempty>
//! ```
//!
//! * `name` - output key; empty keeps the field name, `-` discards the field.
//! * `kind` - `optional`, `deferred`, `always` or empty for a plain prop.
//! * `mergeable` - marks the prop mergeable.
//! * `concurrent` - marks a deferred prop as safe to resolve concurrently.
//! * `omitempty` - checked in the last position, skips zero values.
//!
//! A deferred group is attached separately with [`Field::group`]. Extraction
//! is all-or-nothing: the first malformed field aborts it.

use serde::Serialize;
use serde_json::{Map, Value};

use super::{DeferredOptions, LazyValue, Prop, PropOptions, Props};
use crate::error::{ExtractError, InertiaError};

const KIND_OPTIONAL: &str = "optional";
const KIND_DEFERRED: &str = "deferred";
const KIND_ALWAYS: &str = "always";

const DISCARD: &str = "-";
const OMIT_EMPTY: &str = "omitempty";
const MERGEABLE: &str = "mergeable";
const CONCURRENT: &str = "concurrent";

/// What to do with fields that carry no tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UntaggedPolicy {
    /// Untagged fields are left out.
    #[default]
    Skip,
    /// Untagged fields become plain props under their field name.
    Include,
}

/// The value held by a record field.
#[derive(Clone)]
pub enum FieldValue {
    Value(Value),
    Lazy(LazyValue),
}

impl FieldValue {
    /// Zero values: null, false, 0 and the empty string.
    fn is_zero(&self) -> bool {
        match self {
            FieldValue::Value(Value::Null) => true,
            FieldValue::Value(Value::Bool(b)) => !b,
            FieldValue::Value(Value::Number(n)) => n.as_f64() == Some(0.0),
            FieldValue::Value(Value::String(s)) => s.is_empty(),
            FieldValue::Value(_) | FieldValue::Lazy(_) => false,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<LazyValue> for FieldValue {
    fn from(value: LazyValue) -> Self {
        FieldValue::Lazy(value)
    }
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldValue::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// One declared field of a record.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    tag: Option<String>,
    group: Option<String>,
    exported: bool,
    value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            group: None,
            exported: true,
            value: value.into(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Deferred group; only valid on `deferred` fields.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Mark the field as internal. Private fields are never extracted.
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }
}

/// A value that can describe itself as a list of fields.
pub trait Record {
    fn fields(&self) -> Vec<Field>;
}

impl Record for Vec<Field> {
    fn fields(&self) -> Vec<Field> {
        self.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Record view over any type that serializes to a JSON object.
///
/// Fields come out in serialization order. Tags and groups are attached by
/// field name after the fact.
#[derive(Debug, Clone)]
pub struct JsonRecord {
    fields: Map<String, Value>,
    tags: Vec<(String, String)>,
    groups: Vec<(String, String)>,
}

impl JsonRecord {
    pub fn new<T: Serialize + ?Sized>(value: &T) -> crate::Result<Self> {
        let value = serde_json::to_value(value).map_err(|source| InertiaError::Serialize {
            what: "props record".to_string(),
            source,
        })?;
        Ok(Self::from_value(value)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                tags: Vec::new(),
                groups: Vec::new(),
            }),
            other => Err(ExtractError::NotARecord(json_kind(&other))),
        }
    }

    pub fn tag(mut self, field: impl Into<String>, tag: impl Into<String>) -> Self {
        self.tags.push((field.into(), tag.into()));
        self
    }

    pub fn group(mut self, field: impl Into<String>, group: impl Into<String>) -> Self {
        self.groups.push((field.into(), group.into()));
        self
    }

    fn lookup<'a>(list: &'a [(String, String)], field: &str) -> Option<&'a str> {
        list.iter()
            .rev()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.as_str())
    }
}

impl Record for JsonRecord {
    fn fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .map(|(name, value)| Field {
                name: name.clone(),
                tag: Self::lookup(&self.tags, name).map(String::from),
                group: Self::lookup(&self.groups, name).map(String::from),
                exported: true,
                value: FieldValue::Value(value.clone()),
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Build an ordered props set from a record's tagged fields.
pub fn extract_props<R>(record: &R, policy: UntaggedPolicy) -> Result<Props, ExtractError>
where
    R: Record + ?Sized,
{
    let fields = record.fields();
    let mut props = Props::new();

    for field in fields {
        if !field.exported {
            continue;
        }

        let tag = match field.tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag,
            _ if policy == UntaggedPolicy::Include => "",
            _ => continue,
        };

        let mut parts: Vec<&str> = tag.split(',').collect();
        let omit_empty = parts.len() > 1 && parts.last() == Some(&OMIT_EMPTY);
        if omit_empty {
            parts.pop();
        }

        let key = match parts[0] {
            "" => field.name.as_str(),
            name => name,
        };
        if key == DISCARD {
            continue;
        }

        let kind = parts.get(1).copied().unwrap_or("");
        let merge = parts.get(2) == Some(&MERGEABLE);
        let concurrent = parts.get(3) == Some(&CONCURRENT);

        if omit_empty && field.value.is_zero() {
            continue;
        }

        let group = field.group.as_deref().filter(|g| !g.is_empty());
        if let Some(group) = group {
            if kind != KIND_DEFERRED {
                return Err(ExtractError::GroupOnNonDeferred {
                    field: field.name.clone(),
                    group: group.to_string(),
                });
            }
        }

        let prop = match kind {
            KIND_OPTIONAL => Prop::optional(key, into_lazy(&field, KIND_OPTIONAL)?),
            KIND_DEFERRED => Prop::deferred(
                key,
                into_lazy(&field, KIND_DEFERRED)?,
                DeferredOptions {
                    group: group.map(String::from),
                    merge,
                    concurrent,
                },
            ),
            KIND_ALWAYS => Prop::always(key, into_value(&field)?),
            "" => Prop::new_with(key, into_value(&field)?, PropOptions { merge }),
            other => {
                return Err(ExtractError::UnknownKind {
                    field: field.name.clone(),
                    kind: other.to_string(),
                })
            }
        };

        props.push(prop);
    }

    Ok(props)
}

fn into_lazy(field: &Field, kind: &'static str) -> Result<LazyValue, ExtractError> {
    match &field.value {
        FieldValue::Lazy(lazy) => Ok(lazy.clone()),
        FieldValue::Value(_) => Err(ExtractError::InvalidLazy {
            field: field.name.clone(),
            kind,
        }),
    }
}

fn into_value(field: &Field) -> Result<&Value, ExtractError> {
    match &field.value {
        FieldValue::Value(value) => Ok(value),
        FieldValue::Lazy(_) => Err(ExtractError::UnexpectedLazy {
            field: field.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::{lazy_fn, PropContext, PropKind, Proper};
    use serde_json::json;

    struct Dashboard {
        title: String,
        count: i64,
        stats: LazyValue,
        feed: LazyValue,
        secret: String,
    }

    impl Record for Dashboard {
        fn fields(&self) -> Vec<Field> {
            vec![
                Field::new("Title", json!(self.title)).tag("title,always"),
                Field::new("Count", json!(self.count)).tag("count"),
                Field::new("Stats", self.stats.clone()).tag("stats,optional"),
                Field::new("Feed", self.feed.clone())
                    .tag("feed,deferred,mergeable,concurrent")
                    .group("sidebar"),
                Field::new("Secret", json!(self.secret)).tag("secret").private(),
            ]
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard {
            title: "Home".into(),
            count: 3,
            stats: lazy_fn(|| Ok(json!({"visits": 10}))),
            feed: lazy_fn(|| Ok(json!([]))),
            secret: "hidden".into(),
        }
    }

    #[test]
    fn test_extract_tagged_record() {
        let props = extract_props(&dashboard(), UntaggedPolicy::Skip).unwrap();
        let props: Vec<Prop> = props.into_props();

        let keys: Vec<_> = props.iter().map(|p| p.key()).collect();
        assert_eq!(keys, vec!["title", "count", "stats", "feed"]);

        assert_eq!(props[0].kind(), &PropKind::Always);
        assert_eq!(props[1].kind(), &PropKind::Plain { mergeable: false });
        assert_eq!(props[2].kind(), &PropKind::Optional);
        assert_eq!(
            props[3].kind(),
            &PropKind::Deferred {
                group: "sidebar".into(),
                mergeable: true,
                concurrent: true,
            }
        );
    }

    #[tokio::test]
    async fn test_extracted_values_resolve() {
        let props = extract_props(&dashboard(), UntaggedPolicy::Skip)
            .unwrap()
            .into_props();
        let ctx = PropContext::default();

        assert_eq!(props[0].value(&ctx).await.unwrap(), json!("Home"));
        assert_eq!(props[2].value(&ctx).await.unwrap(), json!({"visits": 10}));
    }

    #[test]
    fn test_empty_name_uses_field_name() {
        let fields = vec![Field::new("Name", json!("x")).tag(",always")];
        let props = extract_props(&fields, UntaggedPolicy::Skip).unwrap().into_props();

        assert_eq!(props[0].key(), "Name");
        assert_eq!(props[0].kind(), &PropKind::Always);
    }

    #[test]
    fn test_discarded_field() {
        let fields = vec![
            Field::new("Gone", json!(1)).tag("-"),
            Field::new("Kept", json!(2)).tag("kept"),
        ];
        let props = extract_props(&fields, UntaggedPolicy::Include).unwrap();

        assert_eq!(props.iter().map(|p| p.key()).collect::<Vec<_>>(), vec!["kept"]);
    }

    #[test]
    fn test_untagged_policy() {
        let fields = vec![
            Field::new("Plain", json!(1)),
            Field::new("Tagged", json!(2)).tag("tagged"),
        ];

        let skipped = extract_props(&fields, UntaggedPolicy::Skip).unwrap();
        assert_eq!(skipped.iter().map(|p| p.key()).collect::<Vec<_>>(), vec!["tagged"]);

        let included = extract_props(&fields, UntaggedPolicy::Include).unwrap();
        assert_eq!(
            included.iter().map(|p| p.key()).collect::<Vec<_>>(),
            vec!["Plain", "tagged"]
        );
    }

    #[test]
    fn test_omitempty_in_last_position() {
        let fields = vec![
            Field::new("A", json!("")).tag("a,omitempty"),
            Field::new("B", json!(0)).tag("b,,,omitempty"),
            Field::new("C", json!(false)).tag("c,always,omitempty"),
            Field::new("D", json!(null)).tag("d,,mergeable,omitempty"),
            Field::new("E", json!("set")).tag("e,omitempty"),
            Field::new("F", json!("")).tag("f"),
            Field::new("G", json!([])).tag("g,omitempty"),
        ];
        let props = extract_props(&fields, UntaggedPolicy::Skip).unwrap();

        assert_eq!(
            props.iter().map(|p| p.key()).collect::<Vec<_>>(),
            vec!["e", "f", "g"]
        );
    }

    #[test]
    fn test_omitempty_does_not_shift_positions() {
        let fields = vec![
            Field::new("Title", json!("Home")).tag("title,always,omitempty"),
            Field::new("Items", json!([1])).tag("items,,mergeable,omitempty"),
            Field::new("Feed", lazy_fn(|| Ok(1))).tag("feed,deferred,omitempty"),
        ];
        let props = extract_props(&fields, UntaggedPolicy::Skip).unwrap().into_props();

        assert_eq!(props[0].kind(), &PropKind::Always);
        assert!(props[1].is_mergeable());
        assert!(props[2].is_deferred());
        assert!(!props[2].is_concurrent());
    }

    #[test]
    fn test_default_deferred_group() {
        let fields = vec![Field::new("Feed", lazy_fn(|| Ok(1))).tag("feed,deferred")];
        let props = extract_props(&fields, UntaggedPolicy::Skip).unwrap().into_props();

        assert_eq!(props[0].group(), Some(crate::props::DEFAULT_GROUP));
    }

    #[test]
    fn test_group_on_non_deferred_field() {
        let fields = vec![
            Field::new("Ok", json!(1)).tag("ok"),
            Field::new("Title", json!("x")).tag("title,always").group("sidebar"),
        ];

        let err = extract_props(&fields, UntaggedPolicy::Skip).unwrap_err();
        assert_eq!(
            err,
            ExtractError::GroupOnNonDeferred {
                field: "Title".into(),
                group: "sidebar".into(),
            }
        );
    }

    #[test]
    fn test_unknown_kind() {
        let fields = vec![Field::new("X", json!(1)).tag("x,sometimes")];

        let err = extract_props(&fields, UntaggedPolicy::Skip).unwrap_err();
        assert_eq!(
            err,
            ExtractError::UnknownKind {
                field: "X".into(),
                kind: "sometimes".into(),
            }
        );
    }

    #[test]
    fn test_lazy_kinds_require_lazy_values() {
        for kind in ["optional", "deferred"] {
            let fields = vec![Field::new("X", json!(1)).tag(format!("x,{}", kind))];
            let err = extract_props(&fields, UntaggedPolicy::Skip).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidLazy { .. }), "kind {}", kind);
        }

        let fields = vec![Field::new("X", lazy_fn(|| Ok(1))).tag("x,always")];
        let err = extract_props(&fields, UntaggedPolicy::Skip).unwrap_err();
        assert_eq!(err, ExtractError::UnexpectedLazy { field: "X".into() });
    }

    #[derive(Serialize)]
    struct Profile {
        name: String,
        email: String,
        bio: String,
    }

    #[test]
    fn test_json_record() {
        let profile = Profile {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            bio: String::new(),
        };
        let record = JsonRecord::new(&profile)
            .unwrap()
            .tag("name", "name,always")
            .tag("bio", "bio,,,omitempty");

        let props = extract_props(&record, UntaggedPolicy::Skip).unwrap();
        assert_eq!(props.iter().map(|p| p.key()).collect::<Vec<_>>(), vec!["name"]);

        let props = extract_props(&record, UntaggedPolicy::Include).unwrap();
        assert_eq!(
            props.iter().map(|p| p.key()).collect::<Vec<_>>(),
            vec!["name", "email"]
        );
    }

    #[test]
    fn test_json_record_requires_object() {
        assert_eq!(
            JsonRecord::from_value(json!([1, 2])).unwrap_err(),
            ExtractError::NotARecord("array")
        );
        assert!(matches!(
            JsonRecord::new(&"text").unwrap_err(),
            InertiaError::Extract(ExtractError::NotARecord("string"))
        ));
    }
}
