use std::collections::BTreeMap;

use modkit::api::{OperationSpec, ResponseSpec};
use serde_json::{json, Map, Value};

pub const OPENAPI_VERSION: &str = "3.1.0";

#[derive(serde::Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "OpenApiComponents::is_empty")]
    pub components: OpenApiComponents,
}

#[derive(serde::Serialize)]
pub struct OpenApiInfo {
    pub title: &'static str,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(serde::Serialize, Default, Clone, Debug)]
pub struct OpenApiComponents {
    pub schemas: BTreeMap<String, Value>,
}

impl OpenApiComponents {
    fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Component schemas keyed by name. Replaced wholesale on every write.
#[derive(Clone, Debug, Default)]
pub struct ComponentsRegistry {
    schemas: BTreeMap<String, Value>,
}

impl ComponentsRegistry {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Copy of `self` with `entries` added. Existing names keep their schema.
    pub fn merged(&self, entries: &[(String, Value)]) -> Self {
        let mut schemas = self.schemas.clone();
        for (name, schema) in entries {
            schemas
                .entry(name.clone())
                .or_insert_with(|| schema.clone());
        }
        Self { schemas }
    }

    pub fn to_components(&self) -> OpenApiComponents {
        OpenApiComponents {
            schemas: self.schemas.clone(),
        }
    }
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn response_obj(resp: &ResponseSpec) -> Value {
    let schema = match (&resp.schema_name, resp.array) {
        (Some(name), true) => json!({ "type": "array", "items": schema_ref(name) }),
        (Some(name), false) => schema_ref(name),
        (None, _) if resp.content_type.starts_with("text/") => json!({ "type": "string" }),
        (None, _) => json!({}),
    };
    json!({
        "description": resp.description,
        "content": { (resp.content_type): { "schema": schema } }
    })
}

/// OpenAPI operation object for one registered spec.
pub fn operation_obj(spec: &OperationSpec) -> Value {
    let mut op = Map::new();
    if let Some(id) = &spec.operation_id {
        op.insert("operationId".into(), json!(id));
    }
    if let Some(s) = &spec.summary {
        op.insert("summary".into(), json!(s));
    }
    if let Some(d) = &spec.description {
        op.insert("description".into(), json!(d));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }

    if !spec.params.is_empty() {
        let params: Vec<Value> = spec
            .params
            .iter()
            .map(|p| {
                let mut param = json!({
                    "name": p.name,
                    "in": "query",
                    "required": p.required,
                    "schema": { "type": p.param_type },
                });
                if let Some(d) = &p.description {
                    param["description"] = json!(d);
                }
                param
            })
            .collect();
        op.insert("parameters".into(), Value::Array(params));
    }

    let responses: Map<String, Value> = spec
        .responses
        .iter()
        .map(|r| (r.status.to_string(), response_obj(r)))
        .collect();
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

pub fn build_document<'a>(
    title: &'static str,
    version: impl Into<String>,
    specs: impl IntoIterator<Item = &'a OperationSpec>,
    components: &ComponentsRegistry,
) -> OpenApi {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for spec in specs {
        paths
            .entry(spec.path.clone())
            .or_default()
            .insert(spec.method.as_str().to_lowercase(), operation_obj(spec));
    }

    OpenApi {
        openapi: OPENAPI_VERSION,
        info: OpenApiInfo {
            title,
            version: version.into(),
            description: Some("Books grouped by owner age category"),
        },
        paths,
        components: components.to_components(),
    }
}
