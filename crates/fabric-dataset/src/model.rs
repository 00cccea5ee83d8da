//! Wire and bookkeeping models shared by the executor, the server and the client

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form properties supplied when an instance is created
pub type DatasetProperties = BTreeMap<String, String>;

/// Everything recorded about one dataset instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSpecification {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub properties: DatasetProperties,
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

fn default_format_version() -> u32 {
    1
}

impl DatasetSpecification {
    pub fn new(name: &str, type_name: &str, properties: DatasetProperties) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            properties,
            format_version: default_format_version(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Body of a `create` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub type_name: String,
    #[serde(default)]
    pub properties: DatasetProperties,
}

impl CreateInstanceRequest {
    pub fn new(type_name: &str, properties: DatasetProperties) -> Self {
        Self {
            type_name: type_name.to_string(),
            properties,
        }
    }
}

/// Body of every administrative response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminOpResponse {
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdminOpResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            result,
            code: None,
            message: None,
        }
    }

    pub fn empty() -> Self {
        Self::success(serde_json::Value::Null)
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            result: serde_json::Value::Null,
            code: Some(code),
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specification_serialization() {
        let mut properties = DatasetProperties::new();
        properties.insert("ttl".to_string(), "3600".to_string());
        let spec = DatasetSpecification::new("fabric.user.bob", "table", properties);

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["typeName"], "table");
        assert_eq!(json["formatVersion"], 1);
        assert_eq!(json["properties"]["ttl"], "3600");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateInstanceRequest =
            serde_json::from_str(r#"{"typeName":"keyValueTable"}"#).unwrap();
        assert_eq!(request.type_name, "keyValueTable");
        assert!(request.properties.is_empty());
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_string(&AdminOpResponse::empty()).unwrap();
        assert_eq!(json, r#"{"result":null}"#);

        let json = serde_json::to_string(&AdminOpResponse::error(24000, "bad op")).unwrap();
        assert_eq!(json, r#"{"result":null,"code":24000,"message":"bad op"}"#);
    }
}
