//! Deployment registry and lifecycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::application::DeploymentHandler;
use super::{Application, DeploymentState};
use crate::cookie::SessionCookieConfig;
use crate::error::RouterError;
use crate::handler::{normalize_prefix, Chain, Handler, PathRouter};
use crate::session::{
    IdGenerator, RandomIdGenerator, SessionManager, SessionStore, DEFAULT_IDLE_TIMEOUT,
};
use crate::Result;

/// Counter for deployment handle identity.
static NEXT_DEPLOYMENT: AtomicU64 = AtomicU64::new(1);

/// Everything needed to deploy an application.
pub struct DeploymentConfig {
    name: Option<String>,
    context_path: String,
    application: Arc<dyn Application>,
    cookie: SessionCookieConfig,
    session_timeout: Duration,
    id_generator: Option<Box<dyn IdGenerator>>,
}

impl DeploymentConfig {
    pub fn new(context_path: impl Into<String>, application: impl Application + 'static) -> Self {
        Self::with_shared_application(context_path, Arc::new(application))
    }

    pub fn with_shared_application(
        context_path: impl Into<String>,
        application: Arc<dyn Application>,
    ) -> Self {
        Self {
            name: None,
            context_path: context_path.into(),
            application,
            cookie: SessionCookieConfig::new(),
            session_timeout: DEFAULT_IDLE_TIMEOUT,
            id_generator: None,
        }
    }

    /// Human-readable deployment name. Defaults to the context path.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Idle timeout for sessions of this deployment.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_cookie_config(mut self, cookie: SessionCookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    /// Replace the CSPRNG-backed identifier generator.
    pub fn with_id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Box::new(generator));
        self
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    pub fn session_cookie_config(&self) -> &SessionCookieConfig {
        &self.cookie
    }
}

/// Reference to a deployment held by the application layer.
#[derive(Debug, Clone)]
pub struct DeploymentHandle {
    id: u64,
    name: String,
    context_path: String,
    cookie: SessionCookieConfig,
}

impl DeploymentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// The deployment's live session cookie configuration.
    ///
    /// Changes apply to every `Set-Cookie` emitted afterwards.
    pub fn session_cookie_config(&self) -> &SessionCookieConfig {
        &self.cookie
    }
}

impl PartialEq for DeploymentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeploymentHandle {}

impl fmt::Display for DeploymentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.context_path)
    }
}

struct Deployment {
    handle: DeploymentHandle,
    state: DeploymentState,
    handler: Arc<DeploymentHandler>,
    store: Arc<SessionStore>,
}

/// Owns deployments and binds started ones into the [`PathRouter`].
pub struct Registry {
    router: Arc<PathRouter>,
    deployments: RwLock<HashMap<String, Deployment>>,
}

impl Registry {
    pub fn new(router: Arc<PathRouter>) -> Self {
        Self {
            router,
            deployments: RwLock::new(HashMap::new()),
        }
    }

    pub fn router(&self) -> &Arc<PathRouter> {
        &self.router
    }

    /// The standard chain (cookie extraction, then routing) over this
    /// registry's router.
    pub fn chain(&self) -> Chain {
        Chain::standard(Arc::clone(&self.router))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Deployment>>> {
        self.deployments.read().map_err(|_| RouterError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Deployment>>> {
        self.deployments.write().map_err(|_| RouterError::LockPoisoned)
    }

    /// Register a deployment in the `Deployed` state.
    ///
    /// A context path that is already taken fails with `DuplicateDeployment`.
    /// An empty or malformed one fails with `InvalidContextPath` instead, so
    /// callers can tell a bad path from a clash.
    pub fn add_deployment(&self, config: DeploymentConfig) -> Result<DeploymentHandle> {
        let context_path = normalize_prefix(&config.context_path)?;
        let mut deployments = self.write()?;

        if deployments.contains_key(&context_path) {
            return Err(RouterError::DuplicateDeployment(context_path));
        }

        let generator = config
            .id_generator
            .unwrap_or_else(|| Box::new(RandomIdGenerator));
        let store = Arc::new(SessionStore::with_generator(config.session_timeout, generator));
        let sessions = SessionManager::new(
            Arc::clone(&store),
            config.cookie.clone(),
            context_path.clone(),
        );
        let handler = Arc::new(DeploymentHandler::new(
            context_path.clone(),
            config.application,
            sessions,
        ));

        let handle = DeploymentHandle {
            id: NEXT_DEPLOYMENT.fetch_add(1, Ordering::Relaxed),
            name: config.name.unwrap_or_else(|| context_path.clone()),
            context_path: context_path.clone(),
            cookie: config.cookie,
        };

        let mut state = DeploymentState::Undeployed;
        state.transition_to(DeploymentState::Deployed, &context_path, "deploy")?;

        deployments.insert(
            context_path,
            Deployment {
                handle: handle.clone(),
                state,
                handler,
                store,
            },
        );

        tracing::info!(deployment = %handle, "deployed");
        Ok(handle)
    }

    /// Start serving: `Deployed`/`Stopped` -> `Started`.
    pub fn start(&self, handle: &DeploymentHandle) -> Result<()> {
        let mut deployments = self.write()?;
        let deployment = find_mut(&mut deployments, handle)?;

        let mut next = deployment.state;
        next.transition_to(DeploymentState::Started, handle.context_path(), "start")?;

        let handler: Arc<dyn Handler> = deployment.handler.clone();
        self.router.register(handle.context_path(), handler)?;
        deployment.state = next;

        tracing::info!(deployment = %handle, "started");
        Ok(())
    }

    /// Stop serving: `Started` -> `Stopped`.
    ///
    /// Requests already routed to the deployment run to completion.
    pub fn stop(&self, handle: &DeploymentHandle) -> Result<()> {
        let mut deployments = self.write()?;
        let deployment = find_mut(&mut deployments, handle)?;

        let mut next = deployment.state;
        next.transition_to(DeploymentState::Stopped, handle.context_path(), "stop")?;

        self.router.unregister(handle.context_path())?;
        deployment.state = next;

        tracing::info!(deployment = %handle, "stopped");
        Ok(())
    }

    /// Remove a deployment that is not serving, dropping its sessions.
    ///
    /// The context path becomes available to new deployments.
    pub fn undeploy(&self, handle: &DeploymentHandle) -> Result<()> {
        let mut deployments = self.write()?;
        let deployment = find_mut(&mut deployments, handle)?;

        deployment
            .state
            .transition_to(DeploymentState::Undeployed, handle.context_path(), "undeploy")?;

        if let Some(removed) = deployments.remove(handle.context_path()) {
            tracing::info!(
                deployment = %handle,
                sessions = removed.store.count(),
                "undeployed"
            );
        }
        Ok(())
    }

    /// Current lifecycle state. Unknown handles report `Undeployed`.
    pub fn state(&self, handle: &DeploymentHandle) -> Result<DeploymentState> {
        let deployments = self.read()?;
        Ok(deployments
            .get(handle.context_path())
            .filter(|d| d.handle == *handle)
            .map(|d| d.state)
            .unwrap_or(DeploymentState::Undeployed))
    }

    /// Handle of the deployment at `context_path`, if any.
    pub fn handle(&self, context_path: &str) -> Option<DeploymentHandle> {
        let context_path = normalize_prefix(context_path).ok()?;
        self.read()
            .ok()?
            .get(&context_path)
            .map(|d| d.handle.clone())
    }

    /// Number of live sessions in a deployment.
    pub fn session_count(&self, handle: &DeploymentHandle) -> Result<usize> {
        let deployments = self.read()?;
        deployments
            .get(handle.context_path())
            .filter(|d| d.handle == *handle)
            .map(|d| d.store.count())
            .ok_or_else(|| RouterError::UnknownDeployment(handle.to_string()))
    }

    /// Sweep expired sessions of every deployment.
    ///
    /// Returns the total number of sessions removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        let stores: Vec<Arc<SessionStore>> = self
            .read()?
            .values()
            .map(|d| Arc::clone(&d.store))
            .collect();

        Ok(stores.iter().map(|store| store.sweep_expired()).sum())
    }

    /// Number of deployments in any state.
    pub fn count(&self) -> usize {
        self.read().map(|d| d.len()).unwrap_or(0)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(PathRouter::new()))
    }
}

fn find_mut<'m>(
    deployments: &'m mut HashMap<String, Deployment>,
    handle: &DeploymentHandle,
) -> Result<&'m mut Deployment> {
    deployments
        .get_mut(handle.context_path())
        .filter(|d| d.handle == *handle)
        .ok_or_else(|| RouterError::UnknownDeployment(handle.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::Exchange;
    use crate::handler::{Next, Request, RequestContext, Response};
    use axum::http::StatusCode;

    fn hello(_: &Request, _: &mut Exchange<'_>) -> Result<Response> {
        Ok(Response::ok("hello"))
    }

    #[test]
    fn test_add_deployment() {
        let registry = Registry::default();
        let handle = registry
            .add_deployment(
                DeploymentConfig::new("/servletContext", hello).with_name("servletContext.war"),
            )
            .unwrap();

        assert_eq!(handle.name(), "servletContext.war");
        assert_eq!(handle.context_path(), "/servletContext");
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Deployed);
        assert_eq!(registry.handle("/servletContext/"), Some(handle));
        // Not routed until started
        assert!(!registry.router().contains("/servletContext"));
    }

    #[test]
    fn test_duplicate_and_invalid_context_path() {
        let registry = Registry::default();
        registry.add_deployment(DeploymentConfig::new("/app", hello)).unwrap();

        let err = registry
            .add_deployment(DeploymentConfig::new("/app/", hello))
            .unwrap_err();
        assert!(matches!(err, RouterError::DuplicateDeployment(_)));

        let err = registry.add_deployment(DeploymentConfig::new("", hello)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidContextPath(_)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let registry = Registry::default();
        let handle = registry.add_deployment(DeploymentConfig::new("/app", hello)).unwrap();
        let chain = registry.chain();

        assert_eq!(chain.dispatch(&Request::get("/app/x")).status(), StatusCode::NOT_FOUND);

        registry.start(&handle).unwrap();
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Started);
        assert_eq!(chain.dispatch(&Request::get("/app/x")).body_text(), "hello");

        let err = registry.start(&handle).unwrap_err();
        assert!(matches!(err, RouterError::IllegalState { .. }));

        registry.stop(&handle).unwrap();
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Stopped);
        assert_eq!(chain.dispatch(&Request::get("/app/x")).status(), StatusCode::NOT_FOUND);

        let err = registry.stop(&handle).unwrap_err();
        assert!(matches!(err, RouterError::IllegalState { .. }));

        // Restart after stop
        registry.start(&handle).unwrap();
        assert_eq!(chain.dispatch(&Request::get("/app")).body_text(), "hello");
    }

    #[test]
    fn test_start_conflicts_with_foreign_route() {
        let registry = Registry::default();
        registry
            .router()
            .register(
                "/taken",
                Arc::new(|_: &Request, _: &mut RequestContext, _: Next<'_>| {
                    Response::ok("other")
                }),
            )
            .unwrap();

        let handle = registry.add_deployment(DeploymentConfig::new("/taken", hello)).unwrap();
        let err = registry.start(&handle).unwrap_err();
        assert!(matches!(err, RouterError::Conflict(_)));
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Deployed);
    }

    #[test]
    fn test_undeploy() {
        let registry = Registry::default();
        let handle = registry.add_deployment(DeploymentConfig::new("/app", hello)).unwrap();
        registry.start(&handle).unwrap();

        // Must stop first
        let err = registry.undeploy(&handle).unwrap_err();
        assert!(matches!(err, RouterError::IllegalState { .. }));

        registry.stop(&handle).unwrap();
        registry.undeploy(&handle).unwrap();
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Undeployed);
        assert_eq!(registry.count(), 0);

        let err = registry.start(&handle).unwrap_err();
        assert!(matches!(err, RouterError::UnknownDeployment(_)));

        // Path can be reused; the stale handle does not refer to the new deployment
        let fresh = registry.add_deployment(DeploymentConfig::new("/app", hello)).unwrap();
        assert_ne!(fresh, handle);
        assert!(registry.session_count(&handle).is_err());
        assert_eq!(registry.session_count(&fresh).unwrap(), 0);
    }

    #[test]
    fn test_cookie_config_shared_with_handle() {
        let registry = Registry::default();
        let config = DeploymentConfig::new("/app", hello);
        config.session_cookie_config().set_name("Early").unwrap();
        let handle = registry.add_deployment(config).unwrap();

        assert_eq!(handle.session_cookie_config().name(), "Early");
        let again = registry.handle("/app").unwrap();
        again.session_cookie_config().set_name("Later").unwrap();
        assert_eq!(handle.session_cookie_config().name(), "Later");
    }

    #[test]
    fn test_sweep_expired_across_deployments() {
        let registry = Registry::default();
        let app = |_: &Request, ex: &mut Exchange<'_>| -> Result<Response> {
            ex.session()?;
            Ok(Response::ok(""))
        };
        let timeout = Duration::from_millis(10);
        let a = registry
            .add_deployment(DeploymentConfig::new("/a", app).with_session_timeout(timeout))
            .unwrap();
        let b = registry
            .add_deployment(DeploymentConfig::new("/b", app).with_session_timeout(timeout))
            .unwrap();
        registry.start(&a).unwrap();
        registry.start(&b).unwrap();

        let chain = registry.chain();
        chain.dispatch(&Request::get("/a"));
        chain.dispatch(&Request::get("/b"));
        assert_eq!(registry.session_count(&a).unwrap(), 1);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(registry.sweep_expired().unwrap(), 2);
        assert_eq!(registry.session_count(&b).unwrap(), 0);
    }

    #[test]
    fn test_failed_stop_keeps_deployment_started() {
        let registry = Registry::default();
        let handle = registry.add_deployment(DeploymentConfig::new("/app", hello)).unwrap();
        registry.start(&handle).unwrap();

        registry.router().poison();

        let err = registry.stop(&handle).unwrap_err();
        assert!(matches!(err, RouterError::LockPoisoned));
        assert_eq!(registry.state(&handle).unwrap(), DeploymentState::Started);
    }
}
