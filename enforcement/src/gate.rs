use crate::blocklist::{BlockedNamespaces, NamespaceBlocklist};
use crate::command::Command;
use crate::config::EnforcementConfig;
use crate::error::{ConfigError, DenialReason, EnforcementError, Result, TransientReason};
use crate::response::QueryResponse;
use crate::result::AuthorizationResult;
use authz::{prune, AuthorizationContext, Enforcer};
use enforcer_cache::{EnforcerCache, PolicyLoader};
use policies::{PolicyId, ResourceKey, SubjectId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress of one enforcement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    NamespaceChecked,
    EnforcerResolved,
    Decided,
    Pruned,
    Emitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::NamespaceChecked => "namespace-checked",
            Stage::EnforcerResolved => "enforcer-resolved",
            Stage::Decided => "decided",
            Stage::Pruned => "pruned",
            Stage::Emitted => "emitted",
        };
        f.write_str(name)
    }
}

/// Authorizes commands and filters query responses.
///
/// # Authorization Flow
///
/// 1. Namespace blocklist check, before any policy lookup
/// 2. Enforcer lookup through the cache
/// 3. Decision for the command's required permission
/// 4. For queries carrying an entity, pruning of the response
///
/// Queries are allowed when the caller can read anything at or below the
/// addressed resource; the response is then pruned to exactly what is
/// readable. All other commands need the permission at the resource itself.
///
/// # Security Notes
///
/// - Deny-by-default: a missing or deleted policy denies
/// - Decisions are logged with policy id, permission and outcome, never
///   with policy content
pub struct EnforcementGate {
    cache: EnforcerCache,
    blocklist: Arc<dyn NamespaceBlocklist>,
}

impl EnforcementGate {
    pub fn new(cache: EnforcerCache, blocklist: Arc<dyn NamespaceBlocklist>) -> Self {
        Self { cache, blocklist }
    }

    /// Build a gate with its own cache in front of `loader`.
    pub fn from_config(
        config: &EnforcementConfig,
        loader: Arc<dyn PolicyLoader>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let cache = EnforcerCache::new(loader, config.cache.clone())?;
        let blocklist = BlockedNamespaces::new(config.blocked_namespaces.iter().cloned());
        Ok(Self::new(cache, Arc::new(blocklist)))
    }

    pub fn cache(&self) -> &EnforcerCache {
        &self.cache
    }

    /// Decide whether `subjects` may execute `command`.
    pub async fn authorize(&self, command: &Command, subjects: &AuthorizationContext) -> AuthorizationResult {
        let result = self.decide(command, subjects).await;
        self.emit(command, &result);
        result
    }

    async fn decide(&self, command: &Command, subjects: &AuthorizationContext) -> AuthorizationResult {
        let entity = command.entity_id();
        trace_stage(Stage::Received, command);

        if self.blocklist.is_blocked(entity.namespace()) {
            return AuthorizationResult::Denied(DenialReason::NamespaceBlocked);
        }
        trace_stage(Stage::NamespaceChecked, command);

        let enforcer = match self.resolve(command.policy_id()).await {
            Ok(Some(enforcer)) => enforcer,
            Ok(None) => return AuthorizationResult::Denied(DenialReason::NotFound),
            Err(reason) => return AuthorizationResult::Transient(reason),
        };
        trace_stage(Stage::EnforcerResolved, command);

        let scoped = enforcer.scoped(subjects);
        let permission = command.required_permission();
        let allowed = if command.is_query() {
            scoped.has_permission_on_or_below(command.resource(), permission)
        } else {
            scoped.has_permission(command.resource(), permission)
        };
        trace_stage(Stage::Decided, command);

        if !allowed {
            return AuthorizationResult::Denied(DenialReason::InsufficientPermissions);
        }

        match command.response() {
            Some(response) if command.is_query() => {
                let pruned = prune(&enforcer, subjects, command.resource(), response, permission);
                trace_stage(Stage::Pruned, command);
                AuthorizationResult::Allowed(Some(pruned))
            }
            _ => AuthorizationResult::Allowed(None),
        }
    }

    /// Prune a query response that arrives after the query was authorized.
    pub async fn filter_response(
        &self,
        response: QueryResponse,
        subjects: &AuthorizationContext,
    ) -> Result<QueryResponse> {
        let entity = response.entity_id().to_string();
        let enforcer = match self.resolve(response.policy_id()).await {
            Ok(Some(enforcer)) => enforcer,
            Ok(None) => {
                warn!("Response filtering denied: policy={}, reason=not found", response.policy_id());
                return Err(EnforcementError::NotAccessible { entity });
            }
            Err(reason) => {
                warn!(
                    "Response filtering unavailable: policy={}, reason={:?}",
                    response.policy_id(),
                    reason
                );
                return Err(EnforcementError::Unavailable { entity, reason });
            }
        };

        let pruned = prune(
            &enforcer,
            subjects,
            response.resource(),
            response.payload(),
            policies::permissions::READ,
        );
        debug!("Filtered response: entity={}, resource={}", entity, response.resource());
        Ok(response.with_payload(pruned))
    }

    /// Subjects allowed to read `resource` under `policy_id`, e.g. to decide
    /// who receives a change event.
    pub async fn read_subjects(&self, policy_id: &PolicyId, resource: &ResourceKey) -> Result<BTreeSet<SubjectId>> {
        match self.resolve(policy_id).await {
            Ok(Some(enforcer)) => Ok(enforcer.granted_subjects(resource, policies::permissions::READ)),
            Ok(None) => Ok(BTreeSet::new()),
            Err(reason) => Err(EnforcementError::Unavailable {
                entity: policy_id.to_string(),
                reason,
            }),
        }
    }

    async fn resolve(&self, policy_id: &PolicyId) -> std::result::Result<Option<Arc<Enforcer>>, TransientReason> {
        match self.cache.get(policy_id).await {
            Ok(entry) => Ok(entry.into_value()),
            Err(err) => Err(TransientReason::from(&err)),
        }
    }

    fn emit(&self, command: &Command, result: &AuthorizationResult) {
        trace_stage(Stage::Emitted, command);
        match result {
            AuthorizationResult::Allowed(_) => info!(
                "Command allowed: entity={}, policy={}, resource={}, permission={}",
                command.entity_id(),
                command.policy_id(),
                command.resource(),
                command.required_permission()
            ),
            _ => warn!(
                "Command not allowed: entity={}, policy={}, resource={}, permission={}, outcome={}",
                command.entity_id(),
                command.policy_id(),
                command.resource(),
                command.required_permission(),
                result.label()
            ),
        }
    }
}

fn trace_stage(stage: Stage, command: &Command) {
    debug!("Enforcement {}: entity={}", stage, command.entity_id());
}
