//! The page object sent to the client runtime

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::props::DeferredGroups;

/// Wire payload of a render, as JSON or embedded in the root container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub component: String,
    pub props: Map<String, Value>,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub encrypt_history: bool,
    #[serde(default)]
    pub clear_history: bool,
    #[serde(default, skip_serializing_if = "is_none_or_empty")]
    pub deferred_props: Option<DeferredGroups>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_props: Vec<String>,
}

fn is_none_or_empty(groups: &Option<DeferredGroups>) -> bool {
    groups.as_ref().map_or(true, DeferredGroups::is_empty)
}

impl Page {
    pub fn to_json(&self) -> crate::Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|source| crate::InertiaError::Serialize {
                what: "page".to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page() -> Page {
        let mut props = Map::new();
        props.insert("key".into(), json!("val"));
        props.insert("errors".into(), json!({}));

        Page {
            component: "Index".into(),
            props,
            url: "/".into(),
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_page_omits_optional_fields() {
        let json: Value = serde_json::from_slice(&page().to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            json!({
                "component": "Index",
                "props": {"key": "val", "errors": {}},
                "url": "/",
                "version": "1.0.0",
                "encryptHistory": false,
                "clearHistory": false,
            })
        );
    }

    #[test]
    fn test_empty_deferred_manifest_is_omitted() {
        let mut p = page();
        p.deferred_props = Some(DeferredGroups::default());

        let json: Value = serde_json::from_slice(&p.to_json().unwrap()).unwrap();
        assert!(json.get("deferredProps").is_none());
    }

    #[test]
    fn test_page_round_trip() {
        let mut groups = DeferredGroups::default();
        groups.push("sidebar", "feed");
        groups.push("default", "stats");

        let source = Page {
            encrypt_history: true,
            clear_history: true,
            deferred_props: Some(groups),
            merge_props: vec!["feed".into()],
            ..page()
        };

        let bytes = source.to_json().unwrap();
        let parsed: Page = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(parsed, source);
        assert_eq!(
            parsed.deferred_props.unwrap().groups().collect::<Vec<_>>(),
            vec!["sidebar", "default"]
        );
    }
}
