use async_trait::async_trait;
use authz::AuthorizationContext;
use enforcement::{
    AuthorizationResult, BlockedNamespaces, Command, DenialReason, EnforcementConfig,
    EnforcementError, EnforcementGate, EntityId, QueryResponse, TransientReason,
};
use enforcer_cache::{CacheConfig, EnforcerCache, InMemoryPolicyStore, LoaderError, PolicyLoader};
use policies::{
    permissions::{READ, WRITE},
    Policy, PolicyEntry, PolicyId, ResourceKey,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingLoader {
    store: Arc<InMemoryPolicyStore>,
    calls: AtomicUsize,
}

#[async_trait]
impl PolicyLoader for CountingLoader {
    async fn load(&self, id: &PolicyId) -> Result<Option<Policy>, LoaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.store.load(id).await
    }
}

struct SlowLoader;

#[async_trait]
impl PolicyLoader for SlowLoader {
    async fn load(&self, _id: &PolicyId) -> Result<Option<Policy>, LoaderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(None)
    }
}

struct BrokenLoader;

#[async_trait]
impl PolicyLoader for BrokenLoader {
    async fn load(&self, _id: &PolicyId) -> Result<Option<Policy>, LoaderError> {
        Err(LoaderError::Unavailable("store offline".into()))
    }
}

fn lamp() -> EntityId {
    EntityId::parse("org.example:lamp").unwrap()
}

fn key(value: &str) -> ResourceKey {
    ResourceKey::parse(value).unwrap()
}

fn sid() -> AuthorizationContext {
    AuthorizationContext::parse(["google:sid"]).unwrap()
}

fn thing() -> Value {
    json!({
        "attributes": { "location": "kitchen", "serial": "A-113" },
        "features": { "power": { "properties": { "on": true } } }
    })
}

/// "all" grants READ and WRITE on everything, "revokeWriteOnPolicy" takes
/// WRITE on the policy back, "hideSerial" hides the serial number.
fn lamp_policy() -> Policy {
    Policy::builder(lamp().default_policy_id())
        .entry(
            PolicyEntry::builder("all")
                .subject("google:sid")
                .grant("thing:/", [READ, WRITE])
                .grant("policy:/", [READ, WRITE])
                .grant("message:/", [WRITE])
                .build()
                .unwrap(),
        )
        .entry(
            PolicyEntry::builder("revokeWriteOnPolicy")
                .subject("google:sid")
                .revoke("policy:/policy", [WRITE])
                .build()
                .unwrap(),
        )
        .entry(
            PolicyEntry::builder("hideSerial")
                .subject("google:sid")
                .revoke("thing:/attributes/serial", [READ])
                .build()
                .unwrap(),
        )
        .entry(
            PolicyEntry::builder("observer")
                .subject("google:observer")
                .grant("thing:/features", [READ])
                .build()
                .unwrap(),
        )
        .build()
}

async fn gate_with(blocked: &[&str]) -> (EnforcementGate, Arc<CountingLoader>) {
    let store = Arc::new(InMemoryPolicyStore::new());
    store.create(lamp_policy()).await.unwrap();
    let loader = Arc::new(CountingLoader {
        store,
        calls: AtomicUsize::new(0),
    });
    let cache = EnforcerCache::new(loader.clone(), CacheConfig::default()).unwrap();
    let blocklist = Arc::new(BlockedNamespaces::new(blocked.iter().copied()));
    (EnforcementGate::new(cache, blocklist), loader)
}

#[tokio::test]
async fn test_policy_write_revoked_read_granted() {
    let (gate, _) = gate_with(&[]).await;

    let read = Command::query(lamp(), key("policy:/policy"));
    assert!(gate.authorize(&read, &sid()).await.is_allowed());

    let write = Command::modify(lamp(), key("policy:/policy"));
    assert_eq!(
        gate.authorize(&write, &sid()).await,
        AuthorizationResult::Denied(DenialReason::InsufficientPermissions)
    );

    let message = Command::message(lamp(), "switch-on").unwrap();
    assert!(gate.authorize(&message, &sid()).await.is_allowed());
}

#[tokio::test]
async fn test_query_response_is_pruned() {
    let (gate, _) = gate_with(&[]).await;

    let query = Command::query(lamp(), key("thing:/")).with_response(thing());
    let result = gate.authorize(&query, &sid()).await;
    assert_eq!(
        result,
        AuthorizationResult::Allowed(Some(json!({
            "attributes": { "location": "kitchen" },
            "features": { "power": { "properties": { "on": true } } }
        })))
    );
}

#[tokio::test]
async fn test_partial_reader_may_query_root() {
    let (gate, _) = gate_with(&[]).await;
    let observer = AuthorizationContext::parse(["google:observer"]).unwrap();

    let query = Command::query(lamp(), key("thing:/")).with_response(thing());
    let result = gate.authorize(&query, &observer).await;
    assert_eq!(
        result,
        AuthorizationResult::Allowed(Some(json!({
            "features": { "power": { "properties": { "on": true } } }
        })))
    );

    let modify = Command::modify(lamp(), key("thing:/features/power"));
    assert!(!gate.authorize(&modify, &observer).await.is_allowed());
}

#[tokio::test]
async fn test_unknown_subject_is_denied() {
    let (gate, _) = gate_with(&[]).await;
    let stranger = AuthorizationContext::parse(["google:stranger"]).unwrap();

    let query = Command::query(lamp(), key("thing:/"));
    assert_eq!(
        gate.authorize(&query, &stranger).await,
        AuthorizationResult::Denied(DenialReason::InsufficientPermissions)
    );
    assert_eq!(
        gate.authorize(&query, &AuthorizationContext::anonymous()).await,
        AuthorizationResult::Denied(DenialReason::InsufficientPermissions)
    );
}

#[tokio::test]
async fn test_missing_policy_is_not_found() {
    let (gate, _) = gate_with(&[]).await;
    let fan = EntityId::parse("org.example:fan").unwrap();

    let result = gate.authorize(&Command::query(fan.clone(), key("thing:/")), &sid()).await;
    assert_eq!(result, AuthorizationResult::Denied(DenialReason::NotFound));

    let err = result.into_result(&fan).unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_blocked_namespace_skips_policy_lookup() {
    let (gate, loader) = gate_with(&["org.example"]).await;

    let result = gate.authorize(&Command::query(lamp(), key("thing:/")), &sid()).await;
    assert_eq!(result, AuthorizationResult::Denied(DenialReason::NamespaceBlocked));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_policy_override() {
    let (gate, _) = gate_with(&[]).await;
    let fan = EntityId::parse("org.example:fan").unwrap();

    let command = Command::modify(fan, key("thing:/features")).with_policy(lamp().default_policy_id());
    assert!(gate.authorize(&command, &sid()).await.is_allowed());
}

#[tokio::test]
async fn test_admin_command_uses_custom_permission() {
    let (gate, _) = gate_with(&[]).await;
    let command = Command::admin(lamp(), key("policy:/"), "ADMINISTRATE");
    assert_eq!(
        gate.authorize(&command, &sid()).await,
        AuthorizationResult::Denied(DenialReason::InsufficientPermissions)
    );
}

#[tokio::test]
async fn test_slow_loader_is_transient() {
    let config = CacheConfig {
        ask_timeout: Duration::from_millis(20),
        ..CacheConfig::default()
    };
    let cache = EnforcerCache::new(Arc::new(SlowLoader), config).unwrap();
    let gate = EnforcementGate::new(cache, Arc::new(BlockedNamespaces::default()));

    let result = gate.authorize(&Command::query(lamp(), key("thing:/")), &sid()).await;
    assert_eq!(result, AuthorizationResult::Transient(TransientReason::Timeout));
    assert!(result.into_result(&lamp()).unwrap_err().is_retryable());
}

#[tokio::test]
async fn test_loader_failure_is_transient() {
    let cache = EnforcerCache::new(Arc::new(BrokenLoader), CacheConfig::default()).unwrap();
    let gate = EnforcementGate::new(cache, Arc::new(BlockedNamespaces::default()));

    let result = gate.authorize(&Command::delete(lamp(), key("thing:/")), &sid()).await;
    assert_eq!(result, AuthorizationResult::Transient(TransientReason::LoaderFailure));
}

#[tokio::test]
async fn test_filter_response() {
    let (gate, _) = gate_with(&[]).await;

    let response = QueryResponse::new(lamp(), key("thing:/attributes"), thing()["attributes"].clone());
    let filtered = gate.filter_response(response, &sid()).await.unwrap();
    assert_eq!(filtered.payload(), &json!({ "location": "kitchen" }));

    let fan = EntityId::parse("org.example:fan").unwrap();
    let response = QueryResponse::new(fan, key("thing:/"), thing());
    let err = gate.filter_response(response, &sid()).await.unwrap_err();
    assert!(matches!(err, EnforcementError::NotAccessible { .. }));
}

#[tokio::test]
async fn test_read_subjects() {
    let (gate, _) = gate_with(&[]).await;
    let policy_id = lamp().default_policy_id();

    let readers = gate.read_subjects(&policy_id, &key("thing:/features/power")).await.unwrap();
    let readers: Vec<String> = readers.iter().map(ToString::to_string).collect();
    assert_eq!(readers, ["google:observer", "google:sid"]);

    let serial = gate.read_subjects(&policy_id, &key("thing:/attributes/serial")).await.unwrap();
    assert!(serial.is_empty());
}

#[tokio::test]
async fn test_gate_from_config() {
    let config = EnforcementConfig::from_yaml(
        r#"
id: enforcement
name: Policy enforcement
provider: enforcement
version: "1.0"
values:
  cache:
    ask_timeout: 1s
  blocked_namespaces: [org.suspended]
"#,
    )
    .unwrap();
    let store = Arc::new(InMemoryPolicyStore::new());
    store.create(lamp_policy()).await.unwrap();
    let gate = EnforcementGate::from_config(&config, store).unwrap();

    assert_eq!(gate.cache().config().ask_timeout, Duration::from_secs(1));
    let suspended = EntityId::parse("org.suspended:lamp").unwrap();
    assert_eq!(
        gate.authorize(&Command::query(suspended, key("thing:/")), &sid()).await,
        AuthorizationResult::Denied(DenialReason::NamespaceBlocked)
    );
    assert!(gate.authorize(&Command::query(lamp(), key("thing:/")), &sid()).await.is_allowed());
}
