//! Dataset namespacing
//!
//! Instance names are prefixed with `fabric.<namespace>.` before they are sent
//! over the wire or used as storage keys. The namespace token may not contain a
//! dot, which keeps the mapping injective: the first dot after the root prefix
//! always ends the namespace.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::FabricError;

const ROOT_PREFIX: &str = "fabric";

static NAMESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z0-9_-]+$").expect("Invalid regex pattern"));

/// Maps user-facing dataset names to namespaced names and back
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetNamespace {
    namespace: String,
    prefix: String,
}

impl DatasetNamespace {
    pub fn new(namespace: &str) -> Result<Self, FabricError> {
        if !NAMESPACE_PATTERN.is_match(namespace) {
            return Err(FabricError::IllegalArgument(format!(
                "invalid dataset namespace '{}'",
                namespace
            )));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            prefix: format!("{}.{}.", ROOT_PREFIX, namespace),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix a user-facing name
    pub fn namespaced(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Strip the prefix, returning `None` for names outside this namespace
    pub fn from_namespaced<'a>(&self, namespaced: &'a str) -> Option<&'a str> {
        namespaced.strip_prefix(self.prefix.as_str())
    }

    pub fn contains(&self, namespaced: &str) -> bool {
        namespaced.starts_with(self.prefix.as_str())
    }
}
