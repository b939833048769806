//! Resource identities and the representations the provider echoes back
//!
//! The local program only ever holds handles: a [`ResourceRef`] says *which*
//! resource, a [`Resource`] is what the provider reported about it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a resource lives in the naming hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Inside a resource group
    ResourceGroup(String),
    /// Directly under the subscription (e.g. soft-deleted services)
    Subscription,
}

/// Key of a managed resource: scope, provider namespace and type/name path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub scope: Scope,
    /// Provider namespace, e.g. `Microsoft.DBforMySQL`
    pub namespace: String,
    /// `(type, name)` pairs from the top-level resource down to the target
    pub path: Vec<(String, String)>,
    pub api_version: String,
}

impl ResourceRef {
    /// A top-level resource inside `group`
    pub fn in_group(
        group: impl Into<String>,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            scope: Scope::ResourceGroup(group.into()),
            namespace: namespace.into(),
            path: vec![(resource_type.into(), name.into())],
            api_version: api_version.into(),
        }
    }

    /// A resource addressed from the subscription root
    pub fn in_subscription(
        namespace: impl Into<String>,
        path: Vec<(String, String)>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            scope: Scope::Subscription,
            namespace: namespace.into(),
            path,
            api_version: api_version.into(),
        }
    }

    /// A nested resource below this one (same namespace and api-version)
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.path.push((resource_type.into(), name.into()));
        child
    }

    /// Name of the innermost segment
    pub fn name(&self) -> &str {
        self.path.last().map(|(_, n)| n.as_str()).unwrap_or_default()
    }

    /// Resource group this resource belongs to, if any
    pub fn group(&self) -> Option<&str> {
        match &self.scope {
            Scope::ResourceGroup(g) => Some(g),
            Scope::Subscription => None,
        }
    }

    /// Fully-qualified type, e.g. `Microsoft.Cdn/profiles/endpoints`
    pub fn type_name(&self) -> String {
        let mut out = self.namespace.clone();
        for (t, _) in &self.path {
            out.push('/');
            out.push_str(t);
        }
        out
    }

    /// Render the ARM resource id within `subscription_id`
    pub fn id(&self, subscription_id: &str) -> String {
        let mut id = format!("/subscriptions/{}", subscription_id);
        if let Scope::ResourceGroup(group) = &self.scope {
            id.push_str("/resourceGroups/");
            id.push_str(group);
        }
        id.push_str("/providers/");
        id.push_str(&self.namespace);
        for (t, n) in &self.path {
            id.push('/');
            id.push_str(t);
            id.push('/');
            id.push_str(n);
        }
        id
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.type_name(), self.name())
    }
}

/// A resource group as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl ResourceGroup {
    pub fn id_for(subscription_id: &str, name: &str) -> String {
        format!("/subscriptions/{}/resourceGroups/{}", subscription_id, name)
    }

    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

/// A managed resource as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

impl Resource {
    /// Parse a provider response body
    pub fn from_value(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .get("provisioningState")
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_group_scoped_id() {
        let server = ResourceRef::in_group(
            "rg",
            "Microsoft.DBforMySQL",
            "servers",
            "sample2server",
            "2017-12-01",
        );
        assert_eq!(
            server.id("sub"),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.DBforMySQL/servers/sample2server"
        );
        assert_eq!(server.group(), Some("rg"));
    }

    #[test]
    fn renders_nested_and_subscription_ids() {
        let endpoint = ResourceRef::in_group("rg", "Microsoft.Cdn", "profiles", "p", "2021-06-01")
            .child("endpoints", "e");
        assert_eq!(endpoint.name(), "e");
        assert_eq!(endpoint.type_name(), "Microsoft.Cdn/profiles/endpoints");
        assert!(endpoint.id("s").ends_with("/profiles/p/endpoints/e"));

        let deleted = ResourceRef::in_subscription(
            "Microsoft.ApiManagement",
            vec![
                ("locations".to_string(), "westus".to_string()),
                ("deletedservices".to_string(), "svc".to_string()),
            ],
            "2021-08-01",
        );
        assert_eq!(
            deleted.id("s"),
            "/subscriptions/s/providers/Microsoft.ApiManagement/locations/westus/deletedservices/svc"
        );
        assert_eq!(deleted.group(), None);
    }

    #[test]
    fn parses_arm_resource_body() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v",
            "name": "v",
            "type": "Microsoft.Network/virtualNetworks",
            "location": "westus",
            "properties": {"provisioningState": "Succeeded"}
        });
        let resource = Resource::from_value(body).unwrap();
        assert_eq!(resource.name, "v");
        assert_eq!(resource.provisioning_state(), Some("Succeeded"));
    }

    #[test]
    fn parses_group_body() {
        let group: ResourceGroup = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg",
            "name": "rg",
            "location": "westus",
            "properties": {"provisioningState": "Succeeded"}
        }))
        .unwrap();
        assert_eq!(group.provisioning_state(), Some("Succeeded"));
        assert_eq!(group.id, ResourceGroup::id_for("s", "rg"));
    }
}
