//! Common test utilities for federate-connector-service integration tests.
//!
//! Provides a scriptable connector manager, sibling service doubles and a
//! harness that wires them into a [`ServiceContext`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use federate_connector::config::DEFAULT_MANAGER_TYPE;
use federate_connector::crypto::generate_master_key;
use federate_connector_service::prelude::*;
use serde_json::json;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const BINDING: &str = "oracle-prod";
pub const COMPONENT_TYPE: &str = "Oracle Connector";
pub const CLASS_PATH: &str = "extensionjar:oracle-connector.jar;file:///opt/jdbc/ojdbc.jar";
pub const VM_NAME: &str = "test-vm";

/// Knobs and counters shared by the harness and every manager it creates.
#[derive(Default)]
pub struct MockControl {
    pub fail_initialize: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub dead: AtomicBool,
    pub execute_delay_ms: AtomicU64,
    pub stats: Mutex<Option<Vec<WorkerPoolStats>>>,

    pub execute_calls: AtomicUsize,
    pub request_more_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub clear_cache_calls: AtomicUsize,

    pub settings: Mutex<Option<ManagerSettings>>,
    pub initialized_with: Mutex<Option<Properties>>,
    pub environment: Mutex<Option<ServiceEnvironment>>,
}

impl MockControl {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }
}

/// Connector manager double: one batch per execute, the last batch on the
/// first `request_more`.
pub struct MockManager {
    control: Arc<MockControl>,
    connector_id: ConnectorId,
    open: Mutex<HashMap<AtomicRequestId, Arc<dyn ResultsReceiver>>>,
}

impl MockManager {
    pub fn new(control: Arc<MockControl>, settings: ManagerSettings) -> Self {
        let connector_id = settings.connector_id.clone();
        *control.settings.lock().unwrap() = Some(settings);
        Self {
            control,
            connector_id,
            open: Mutex::new(HashMap::new()),
        }
    }

    fn forget(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        self.open
            .lock()
            .unwrap()
            .remove(request_id)
            .map(|_| ())
            .ok_or_else(|| ConnectorError::RequestNotFound {
                request_id: request_id.clone(),
            })
    }
}

#[async_trait]
impl ConnectorManager for MockManager {
    fn name(&self) -> String {
        "MockConnectorManager".to_string()
    }

    fn connector_id(&self) -> ConnectorId {
        self.connector_id.clone()
    }

    async fn initialize(&self, properties: &Properties) -> ConnectorResult<()> {
        if self.control.fail_initialize.load(Ordering::SeqCst) {
            return Err(ConnectorError::Configuration {
                message: "missing URL".to_string(),
            });
        }
        *self.control.initialized_with.lock().unwrap() = Some(properties.clone());
        Ok(())
    }

    async fn start(&self, environment: ServiceEnvironment) -> ConnectorResult<()> {
        if self.control.fail_start.load(Ordering::SeqCst) {
            return Err(ConnectorError::start_failed(self.name(), "listener refused"));
        }
        *self.control.environment.lock().unwrap() = Some(environment);
        Ok(())
    }

    async fn stop(&self) -> ConnectorResult<()> {
        self.control.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.control.fail_stop.load(Ordering::SeqCst) {
            return Err(ConnectorError::execution_failed("pool did not shut down"));
        }
        Ok(())
    }

    async fn execute_request(
        &self,
        receiver: Arc<dyn ResultsReceiver>,
        request: AtomicRequest,
    ) -> ConnectorResult<()> {
        self.control.execute_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.control.execute_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.open
            .lock()
            .unwrap()
            .insert(request.id.clone(), Arc::clone(&receiver));
        receiver.receive_results(AtomicResults::batch(
            request.id,
            vec![vec![json!(1), json!("first")]],
        ));
        Ok(())
    }

    async fn cancel_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        self.forget(request_id)
    }

    async fn close_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        self.forget(request_id)
    }

    async fn request_more(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        self.control.request_more_calls.fetch_add(1, Ordering::SeqCst);
        let receiver = self
            .open
            .lock()
            .unwrap()
            .get(request_id)
            .cloned()
            .ok_or_else(|| ConnectorError::RequestNotFound {
                request_id: request_id.clone(),
            })?;
        receiver.receive_results(
            AtomicResults::batch(request_id.clone(), vec![vec![json!(2), json!("last")]]).last(2),
        );
        Ok(())
    }

    async fn capabilities(
        &self,
        _request_id: &RequestId,
        _payload: &ExecutionPayload,
        _context: &WorkContext,
    ) -> ConnectorResult<SourceCapabilities> {
        Ok(SourceCapabilities::none()
            .with(Capability::OuterJoin)
            .with(Capability::OrderBy)
            .with_max_in_criteria_size(1000))
    }

    async fn status(&self) -> ConnectionStatus {
        if self.control.dead.load(Ordering::SeqCst) {
            ConnectionStatus::Dead
        } else {
            ConnectionStatus::Alive
        }
    }

    fn queue_statistics(&self) -> Option<Vec<WorkerPoolStats>> {
        self.control.stats.lock().unwrap().clone()
    }

    fn queue_statistics_for(&self, name: &str) -> Option<Vec<WorkerPoolStats>> {
        self.control.stats.lock().unwrap().as_ref().map(|stats| {
            stats
                .iter()
                .filter(|s| s.name == name)
                .cloned()
                .collect()
        })
    }

    async fn clear_cache(&self) {
        self.control.clear_cache_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Buffer service double that keeps a running total per group.
#[derive(Default)]
pub struct CountingBuffer {
    groups: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl BufferService for CountingBuffer {
    async fn reserve_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64> {
        let mut groups = self.groups.lock().unwrap();
        let total = groups.entry(group.to_string()).or_default();
        *total += bytes;
        Ok(*total)
    }

    async fn release_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64> {
        let mut groups = self.groups.lock().unwrap();
        let total = groups.entry(group.to_string()).or_default();
        *total = total.saturating_sub(bytes);
        Ok(*total)
    }

    async fn group_memory_used(&self, group: &str) -> ConnectorResult<u64> {
        Ok(self.groups.lock().unwrap().get(group).copied().unwrap_or(0))
    }
}

/// Core query component double.
pub struct TestCore {
    environment: ServiceEnvironment,
}

impl CoreComponent for TestCore {
    fn environment(&self) -> &ServiceEnvironment {
        &self.environment
    }
}

/// Registry whose core component can be started and stopped by the test.
#[derive(Default)]
pub struct TestRegistry {
    core: Mutex<Option<Arc<dyn CoreComponent>>>,
}

impl TestRegistry {
    pub fn start_core(&self, environment: ServiceEnvironment) {
        *self.core.lock().unwrap() = Some(Arc::new(TestCore { environment }));
    }
}

impl ServiceRegistry for TestRegistry {
    fn core_component(&self) -> Option<Arc<dyn CoreComponent>> {
        self.core.lock().unwrap().clone()
    }
}

/// Everything needed to initialize a connector service against doubles.
pub struct Harness {
    pub control: Arc<MockControl>,
    pub cipher: PropertyCipher,
    pub store: Arc<InMemoryConfigurationStore>,
    pub class_cache: Arc<ClassContextCache>,
    pub bus: Arc<LocalEventBus>,
    pub registry: Arc<TestRegistry>,
    pub context: ServiceContext,
    pub controller_id: ControllerId,
}

impl Harness {
    pub async fn new() -> Self {
        init_test_logging();

        let control = Arc::new(MockControl::default());
        let cipher = PropertyCipher::new(generate_master_key()).unwrap();

        let store = Arc::new(InMemoryConfigurationStore::new());
        store.add_binding(BINDING, COMPONENT_TYPE).await;
        store
            .add_component_type(
                COMPONENT_TYPE,
                vec![
                    PropertyDescriptor::plain("user"),
                    PropertyDescriptor::masked("password"),
                    PropertyDescriptor::plain(property_names::CONNECTOR_CLASS_PATH),
                ],
            )
            .await;

        let factories = Arc::new(ManagerFactoryRegistry::new());
        let factory_control = Arc::clone(&control);
        factories
            .register_factory(
                DEFAULT_MANAGER_TYPE,
                move |settings: ManagerSettings| -> ConnectorResult<Arc<dyn ConnectorManager>> {
                    Ok(Arc::new(MockManager::new(Arc::clone(&factory_control), settings)))
                },
            )
            .await;

        let class_cache = Arc::new(ClassContextCache::new(true));
        let bus = Arc::new(LocalEventBus::new());
        let context = ServiceContext::new(
            Arc::clone(&store) as Arc<dyn ConfigurationStore>,
            factories,
            cipher.clone(),
        )
        .with_class_cache(Arc::clone(&class_cache))
        .with_vm_name(VM_NAME)
        .with_event_bus(Arc::clone(&bus) as Arc<dyn EventBus>);

        Self {
            control,
            cipher,
            store,
            class_cache,
            bus,
            registry: Arc::new(TestRegistry::default()),
            context,
            controller_id: ControllerId::new(),
        }
    }

    /// Properties of the test binding with `password` masked.
    pub fn properties(&self) -> Properties {
        Properties::new()
            .with(property_names::SERVICE_NAME, BINDING)
            .with(property_names::CONNECTOR_CLASS_PATH, CLASS_PATH)
            .with("user", "scott")
            .with("password", self.cipher.encrypt_property("secret").unwrap())
    }

    pub fn service_id(&self, instance_id: u64) -> ServiceId {
        ServiceId::new(self.controller_id, instance_id)
    }

    pub async fn init_with(
        &self,
        instance_id: u64,
        properties: Properties,
    ) -> ConnectorResult<ConnectorService> {
        ConnectorService::init(
            &self.context,
            self.service_id(instance_id),
            DeployedComponentId::new(),
            properties,
            Arc::clone(&self.registry) as Arc<dyn ServiceRegistry>,
        )
        .await
    }

    pub async fn init(&self) -> ConnectorService {
        self.init_with(1, self.properties()).await.unwrap()
    }
}

pub fn request_id(execution_id: i64) -> AtomicRequestId {
    AtomicRequestId::new(RequestId::new("conn-1", execution_id), 1, 0)
}

pub fn request(service: &ConnectorService, execution_id: i64) -> AtomicRequest {
    AtomicRequest::new(
        request_id(execution_id),
        service.connector_id().clone(),
        json!({"sql": "SELECT id, name FROM accounts"}),
    )
}
