//! Commands as seen by the enforcement gate.

use policies::{permissions, JsonPointer, PolicyError, PolicyId, ResourceKey};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Id of a managed entity, `<namespace>:<name>`.
///
/// Entity ids share the syntax of policy ids, and an entity is governed by
/// the policy with the same id unless a command names another one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(PolicyId);

impl EntityId {
    pub fn parse(value: &str) -> Result<Self, PolicyError> {
        PolicyId::parse(value).map(Self)
    }

    pub fn namespace(&self) -> &str {
        self.0.namespace()
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// The policy governing this entity by default.
    pub fn default_policy_id(&self) -> PolicyId {
        self.0.clone()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Retrieve (part of) an entity; requires `READ`.
    Query,
    /// Create or change (part of) an entity; requires `WRITE`.
    Modify,
    /// Remove (part of) an entity; requires `WRITE`.
    Delete,
    /// Send a message to the entity; requires `WRITE` on the message path.
    Message,
    /// Administrative command guarded by its own permission label.
    Admin { permission: String },
}

/// A command addressed to one entity.
#[derive(Debug, Clone)]
pub struct Command {
    entity_id: EntityId,
    policy_id: PolicyId,
    resource: ResourceKey,
    kind: CommandKind,
    response: Option<Value>,
}

impl Command {
    fn new(entity_id: EntityId, resource: ResourceKey, kind: CommandKind) -> Self {
        Self {
            policy_id: entity_id.default_policy_id(),
            entity_id,
            resource,
            kind,
            response: None,
        }
    }

    pub fn query(entity_id: EntityId, resource: ResourceKey) -> Self {
        Self::new(entity_id, resource, CommandKind::Query)
    }

    pub fn modify(entity_id: EntityId, resource: ResourceKey) -> Self {
        Self::new(entity_id, resource, CommandKind::Modify)
    }

    pub fn delete(entity_id: EntityId, resource: ResourceKey) -> Self {
        Self::new(entity_id, resource, CommandKind::Delete)
    }

    /// A message with `subject` sent to the entity's inbox.
    pub fn message(entity_id: EntityId, subject: &str) -> Result<Self, PolicyError> {
        let path = JsonPointer::from_segments(["inbox", "messages", subject])?;
        let resource = ResourceKey::new("message", path)?;
        Ok(Self::new(entity_id, resource, CommandKind::Message))
    }

    pub fn admin(entity_id: EntityId, resource: ResourceKey, permission: impl Into<String>) -> Self {
        Self::new(
            entity_id,
            resource,
            CommandKind::Admin {
                permission: permission.into(),
            },
        )
    }

    /// Decide against `policy_id` instead of the entity's own policy.
    pub fn with_policy(mut self, policy_id: PolicyId) -> Self {
        self.policy_id = policy_id;
        self
    }

    /// Attach the entity JSON a query answers with; it is pruned to the
    /// caller's view on success.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
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

    pub fn kind(&self) -> &CommandKind {
        &self.kind
    }

    pub fn is_query(&self) -> bool {
        self.kind == CommandKind::Query
    }

    pub fn response(&self) -> Option<&Value> {
        self.response.as_ref()
    }

    pub fn required_permission(&self) -> &str {
        match &self.kind {
            CommandKind::Query => permissions::READ,
            CommandKind::Modify | CommandKind::Delete | CommandKind::Message => permissions::WRITE,
            CommandKind::Admin { permission } => permission,
        }
    }
}
