use crate::command::EntityId;
use policies::{PolicyId, ResourceKey};
use serde_json::Value;

/// The answer to a query: a JSON view of (part of) an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    entity_id: EntityId,
    policy_id: PolicyId,
    resource: ResourceKey,
    payload: Value,
}

impl QueryResponse {
    /// `payload` is the JSON found at `resource`.
    pub fn new(entity_id: EntityId, resource: ResourceKey, payload: Value) -> Self {
        Self {
            policy_id: entity_id.default_policy_id(),
            entity_id,
            resource,
            payload,
        }
    }

    pub fn with_policy(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = policy_id;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn resource(&self) -> &ResourceKey {
        &self.resource
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}
