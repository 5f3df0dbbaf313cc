//! Binds a session store to a deployment's cookie configuration.

use std::sync::Arc;

use super::{Resolved, SessionHandle, SessionId, SessionStore};
use crate::cookie::{self, CookieSettings, SessionCookieConfig};
use crate::handler::RequestContext;
use crate::Result;

/// Resolves sessions for requests routed to one deployment.
///
/// The identifier is read from the request cookie named by the current
/// [`SessionCookieConfig`], and `Set-Cookie` headers are queued on the
/// [`RequestContext`] under that same name.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<SessionStore>,
    cookie: SessionCookieConfig,
    context_path: String,
}

impl SessionManager {
    pub fn new(
        store: Arc<SessionStore>,
        cookie: SessionCookieConfig,
        context_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cookie,
            context_path: context_path.into(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn cookie_config(&self) -> &SessionCookieConfig {
        &self.cookie
    }

    /// Resolve the request's session, creating one if needed.
    ///
    /// A `Set-Cookie` header is queued when the session is new, or on the
    /// first resolution in a request when refresh-on-access is enabled.
    pub fn session(&self, ctx: &mut RequestContext) -> Result<SessionHandle> {
        let settings = self.settings();
        let requested = self.requested_id(ctx, &settings);

        let Resolved { session, is_new } = self.store.resolve(requested.as_deref())?;

        let already_bound = ctx.session_id() == Some(session.id());
        if !already_bound && (is_new || settings.refresh_on_access) {
            ctx.add_set_cookie(set_cookie(&settings, &session));
        }
        ctx.set_session_id(session.id().clone());

        Ok(session)
    }

    /// Resolve the request's session without creating one.
    pub fn existing_session(&self, ctx: &mut RequestContext) -> Result<Option<SessionHandle>> {
        let settings = self.settings();
        let session = self.find(ctx, &settings)?;
        if let Some(ref session) = session {
            if settings.refresh_on_access && ctx.session_id() != Some(session.id()) {
                ctx.add_set_cookie(set_cookie(&settings, session));
            }
            ctx.set_session_id(session.id().clone());
        }
        Ok(session)
    }

    /// Invalidate the request's session and tell the client to drop the
    /// cookie.
    ///
    /// Returns `true` if a live session was removed.
    ///
    /// The removal cookie replaces any `Set-Cookie` for the session cookie
    /// queued earlier in the same request.
    pub fn invalidate(&self, ctx: &mut RequestContext) -> Result<bool> {
        let settings = self.settings();
        let Some(session) = self.find(ctx, &settings)? else {
            return Ok(false);
        };

        ctx.take_session_id();
        let removed = self.store.invalidate(session.id());
        ctx.remove_set_cookies(&settings.name);
        ctx.add_set_cookie(cookie::serialize_removal(&settings.name, &settings));
        Ok(removed)
    }

    /// Look up the requested session without binding it or queuing cookies.
    fn find(
        &self,
        ctx: &RequestContext,
        settings: &CookieSettings,
    ) -> Result<Option<SessionHandle>> {
        let Some(requested) = self.requested_id(ctx, settings) else {
            return Ok(None);
        };
        let Some(id) = SessionId::parse(&requested) else {
            return Ok(None);
        };
        self.store.lookup(&id)
    }

    /// Current cookie settings with the path defaulted to the context path.
    fn settings(&self) -> CookieSettings {
        let mut settings = self.cookie.snapshot();
        if settings.path.is_none() {
            settings.path = Some(self.context_path.clone());
        }
        settings
    }

    fn requested_id(&self, ctx: &RequestContext, settings: &CookieSettings) -> Option<String> {
        match ctx.session_id() {
            Some(id) => Some(id.to_string()),
            None => ctx.cookie(&settings.name).map(str::to_string),
        }
    }
}

fn set_cookie(settings: &CookieSettings, session: &SessionHandle) -> String {
    cookie::serialize(&settings.name, session.id().as_str(), settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SeededIdGenerator, DEFAULT_IDLE_TIMEOUT};

    fn manager() -> SessionManager {
        let store = Arc::new(SessionStore::with_generator(
            DEFAULT_IDLE_TIMEOUT,
            Box::new(SeededIdGenerator::new(42)),
        ));
        SessionManager::new(store, SessionCookieConfig::new(), "/servletContext")
    }

    fn cookie_jar_from(ctx: &RequestContext) -> RequestContext {
        let mut next = RequestContext::new();
        for header in ctx.set_cookies() {
            let pair = header.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            next.insert_cookie(name, value);
        }
        next
    }

    #[test]
    fn test_new_session_emits_cookie_once() {
        let manager = manager();
        let mut ctx = RequestContext::new();

        let first = manager.session(&mut ctx).unwrap();
        let again = manager.session(&mut ctx).unwrap();

        assert_eq!(first.id(), again.id());
        assert_eq!(ctx.set_cookies().len(), 1);
        let header = &ctx.set_cookies()[0];
        assert!(header.starts_with(&format!("JSESSIONID={}", first.id())));
        assert!(header.contains("Path=/servletContext"));
    }

    #[test]
    fn test_existing_session_no_reemission() {
        let manager = manager();
        let mut first_ctx = RequestContext::new();
        let first = manager.session(&mut first_ctx).unwrap();

        let mut second_ctx = cookie_jar_from(&first_ctx);
        let second = manager.session(&mut second_ctx).unwrap();

        assert_eq!(first.id(), second.id());
        assert!(second_ctx.set_cookies().is_empty());
    }

    #[test]
    fn test_refresh_on_access_reemits() {
        let manager = manager();
        manager.cookie_config().set_refresh_on_access(true);

        let mut first_ctx = RequestContext::new();
        manager.session(&mut first_ctx).unwrap();

        let mut second_ctx = cookie_jar_from(&first_ctx);
        manager.session(&mut second_ctx).unwrap();
        manager.session(&mut second_ctx).unwrap();
        assert_eq!(second_ctx.set_cookies().len(), 1);
    }

    #[test]
    fn test_renamed_cookie_used_for_lookup_and_emission() {
        let manager = manager();
        manager.cookie_config().set_name("MySessionCookie").unwrap();

        let mut first_ctx = RequestContext::new();
        let first = manager.session(&mut first_ctx).unwrap();
        assert!(first_ctx.set_cookies()[0].starts_with("MySessionCookie="));

        let mut second_ctx = cookie_jar_from(&first_ctx);
        assert_eq!(manager.session(&mut second_ctx).unwrap().id(), first.id());

        // A cookie under the old name is not consulted
        let mut stale = RequestContext::new();
        stale.insert_cookie("JSESSIONID", first.id().as_str());
        assert!(manager.existing_session(&mut stale).unwrap().is_none());
    }

    #[test]
    fn test_existing_session_never_creates() {
        let manager = manager();
        let mut ctx = RequestContext::new();

        assert!(manager.existing_session(&mut ctx).unwrap().is_none());
        assert!(ctx.set_cookies().is_empty());
        assert_eq!(manager.store().count(), 0);
    }

    #[test]
    fn test_invalidate_clears_cookie() {
        let manager = manager();
        let mut first_ctx = RequestContext::new();
        let first = manager.session(&mut first_ctx).unwrap();

        let mut ctx = cookie_jar_from(&first_ctx);
        assert!(manager.invalidate(&mut ctx).unwrap());
        assert!(ctx.session_id().is_none());
        assert_eq!(
            ctx.set_cookies().last().map(String::as_str),
            Some("JSESSIONID=; Path=/servletContext; Max-Age=0; HttpOnly")
        );
        assert!(!manager.store().contains(first.id()));

        // A later session() in the same request creates a fresh session
        let fresh = manager.session(&mut ctx).unwrap();
        assert_ne!(fresh.id(), first.id());
    }

    #[test]
    fn test_invalidate_with_refresh_emits_only_removal() {
        let manager = manager();
        manager.cookie_config().set_refresh_on_access(true);
        let mut first_ctx = RequestContext::new();
        manager.session(&mut first_ctx).unwrap();

        let mut ctx = cookie_jar_from(&first_ctx);
        assert!(manager.invalidate(&mut ctx).unwrap());
        assert_eq!(
            ctx.set_cookies(),
            ["JSESSIONID=; Path=/servletContext; Max-Age=0; HttpOnly"]
        );
    }

    #[test]
    fn test_invalidate_replaces_cookie_queued_in_same_request() {
        let manager = manager();
        let mut ctx = RequestContext::new();
        manager.session(&mut ctx).unwrap();
        assert_eq!(ctx.set_cookies().len(), 1);

        assert!(manager.invalidate(&mut ctx).unwrap());
        assert_eq!(ctx.set_cookies().len(), 1);
        assert!(ctx.set_cookies()[0].contains("Max-Age=0"));
        assert_eq!(manager.store().count(), 0);
    }
}
