// ============================================================================
// SESSION STATE - SessionManager: única fuente de verdad de la autenticación
// ============================================================================
// UNINITIALIZED → LOADING → {AUTHENTICATED, ANONYMOUS}
// AUTHENTICATED → ANONYMOUS   (logout / cierre externo / token inválido)
// ANONYMOUS → AUTHENTICATED   (login correcto)
//
// Es el único componente que escribe el registro persistido {authToken, userData}.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::Utc;

use crate::error::AppError;
use crate::models::{Credentials, IdentityUser, Role, Session};
use crate::services::auth_service::{IdentityEvent, IdentityProvider, RoleService};
use crate::services::session_store::{SessionStore, StoredSession};
use crate::state::reactivity::{Listeners, Subscription};

/// Estado de autenticación
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

impl AuthStatus {
    /// Todavía no se sabe quién es el usuario
    pub fn is_pending(&self) -> bool {
        matches!(self, AuthStatus::Uninitialized | AuthStatus::Loading)
    }
}

/// Origen del token para requests protegidos
pub trait TokenSource {
    fn token(&self) -> Option<String>;

    /// El backend rechazó `token`. Por defecto no hace nada.
    fn reject(&self, _token: &str, _error: &AppError) {}

    /// Sin token la llamada no se emite: es una precondición, no un error reintentable
    fn require_token(&self) -> Result<String, AppError> {
        self.token().ok_or(AppError::Unauthenticated)
    }
}

/// Resultado de una llamada protegida hecha con `token`: si el backend lo
/// rechazó, se avisa a la fuente para que revoque la sesión.
pub fn checked<T>(tokens: &dyn TokenSource, token: &str, result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(e) = &result {
        if e.is_token_rejection() {
            tokens.reject(token, e);
        }
    }
    result
}

struct Inner {
    status: Cell<AuthStatus>,
    session: RefCell<Option<Session>>,
    error: RefCell<Option<AppError>>,
    signing_in: Cell<bool>,
    store: SessionStore,
    identity: Rc<dyn IdentityProvider>,
    roles: Option<RoleService>,
    listeners: Listeners<AuthStatus>,
    provider_subscription: RefCell<Option<Subscription>>,
}

impl Inner {
    fn set_status(&self, status: AuthStatus) {
        let previous = self.status.replace(status);
        if previous != status {
            log::info!("🔐 [SESSION] {:?} → {:?}", previous, status);
            self.listeners.emit(&status);
        }
    }

    fn start_session(&self, session: Session) {
        if let Err(e) = self.store.save(&session) {
            log::error!("❌ [SESSION] Error persistiendo sesión: {}", e);
        }
        *self.session.borrow_mut() = Some(session);
        *self.error.borrow_mut() = None;
        self.set_status(AuthStatus::Authenticated);
    }

    fn end_session(&self, reason: &str) {
        let had_session = self.session.borrow_mut().take().is_some();
        self.store.clear();
        if had_session {
            log::info!("👋 [SESSION] Sesión cerrada: {}", reason);
        }
        self.set_status(AuthStatus::Anonymous);
    }

    fn current_token(&self) -> Option<String> {
        self.session.borrow().as_ref().map(|s| s.token.clone())
    }

    /// Token vigente. Un token expirado destruye la sesión.
    fn valid_token(&self) -> Option<String> {
        let (token, expired) = {
            let slot = self.session.borrow();
            let session = slot.as_ref()?;
            (session.token.clone(), session.is_expired_at(Utc::now()))
        };
        if expired {
            log::info!("⌛ [SESSION] Token expirado durante la sesión");
            *self.error.borrow_mut() = Some(AppError::Auth("la sesión expiró".to_string()));
            self.end_session("token expirado");
            return None;
        }
        Some(token)
    }

    /// Revocar solo si el token rechazado sigue siendo el actual
    fn revoke(&self, token: &str, error: &AppError) {
        if self.current_token().as_deref() != Some(token) {
            log::debug!("[SESSION] Rechazo de un token ya reemplazado, ignorado");
            return;
        }
        log::warn!("🔒 [SESSION] Token rechazado por el backend: {}", error);
        *self.error.borrow_mut() = Some(error.clone());
        self.end_session("token rechazado por el backend");
    }

    /// Refrescar token/perfil si el evento corresponde al usuario actual
    fn refresh_from_provider(&self, user: &IdentityUser) {
        let updated = {
            let mut slot = self.session.borrow_mut();
            match slot.as_mut() {
                Some(session) if session.user_id == user.uid => {
                    session.token = user.token.clone();
                    if user.token_expiry.is_some() {
                        session.token_expiry = user.token_expiry;
                    }
                    if !user.email.is_empty() {
                        session.email = user.email.clone();
                    }
                    if user.display_name.is_some() {
                        session.display_name = user.display_name.clone();
                    }
                    Some(session.clone())
                }
                _ => None,
            }
        };
        if let Some(session) = updated {
            if let Err(e) = self.store.save(&session) {
                log::error!("❌ [SESSION] Error persistiendo token refrescado: {}", e);
            }
        }
    }

    fn on_identity_event(&self, event: &IdentityEvent) {
        match event {
            IdentityEvent::SignedIn(user) => self.refresh_from_provider(user),
            IdentityEvent::SignedOut => {
                if self.status.get() == AuthStatus::Authenticated {
                    self.end_session("cierre de sesión externo");
                }
            }
            IdentityEvent::Failed(reason) => {
                if self.status.get() == AuthStatus::Authenticated {
                    log::warn!("⚠️ [SESSION] Proveedor de identidad falló ({}), cerrando sesión", reason);
                    *self.error.borrow_mut() = Some(AppError::Auth(reason.clone()));
                    self.end_session("proveedor de identidad no confirmó la sesión");
                }
            }
        }
    }
}

/// Gestor de sesión. Clonar comparte el mismo estado.
#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<Inner>,
}

impl SessionManager {
    /// Construye el gestor y se suscribe una sola vez al proveedor de identidad.
    /// `roles` es `None` cuando no hay backend configurado (rol por defecto).
    pub fn new(
        store: SessionStore,
        identity: Rc<dyn IdentityProvider>,
        roles: Option<RoleService>,
    ) -> Self {
        let inner = Rc::new(Inner {
            status: Cell::new(AuthStatus::Uninitialized),
            session: RefCell::new(None),
            error: RefCell::new(None),
            signing_in: Cell::new(false),
            store,
            identity: identity.clone(),
            roles,
            listeners: Listeners::new(),
            provider_subscription: RefCell::new(None),
        });

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let subscription = identity.subscribe(Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_identity_event(event);
            }
        }));
        *inner.provider_subscription.borrow_mut() = Some(subscription);

        Self { inner }
    }

    pub fn status(&self) -> AuthStatus {
        self.inner.status.get()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.session.borrow().clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.session.borrow().as_ref().map(|s| s.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == AuthStatus::Authenticated
    }

    /// Último error de login/confirmación (para mostrar en el formulario)
    pub fn last_error(&self) -> Option<AppError> {
        self.inner.error.borrow().clone()
    }

    pub fn is_signing_in(&self) -> bool {
        self.inner.signing_in.get()
    }

    /// Suscribirse a cambios de `AuthStatus`
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuthStatus) + 'static,
    {
        self.inner.listeners.subscribe(callback)
    }

    /// Restauración optimista desde el almacenamiento (síncrona).
    /// La confirmación con el proveedor se hace después con [`Self::confirm`].
    pub fn initialize(&self) -> AuthStatus {
        let status = self.status();
        if status != AuthStatus::Uninitialized {
            log::debug!("[SESSION] initialize() repetido, estado actual {:?}", status);
            return status;
        }
        self.inner.set_status(AuthStatus::Loading);

        match self.inner.store.load() {
            StoredSession::Valid(session) if session.is_expired_at(Utc::now()) => {
                log::info!("⌛ [SESSION] Token persistido expirado");
                self.inner.end_session("token expirado");
            }
            StoredSession::Valid(session) => {
                log::info!("💾 [SESSION] Sesión restaurada desde storage: {}", session.email);
                *self.inner.session.borrow_mut() = Some(session);
                self.inner.set_status(AuthStatus::Authenticated);
            }
            StoredSession::Malformed(reason) => {
                log::warn!("⚠️ [SESSION] Registro persistido inválido ({}), descartando", reason);
                self.inner.end_session("registro inválido");
            }
            StoredSession::Missing => {
                self.inner.set_status(AuthStatus::Anonymous);
            }
        }
        self.status()
    }

    /// Confirmación en segundo plano del token restaurado. Falla cerrado:
    /// si el proveedor no lo confirma, la sesión se destruye.
    pub async fn confirm(&self) -> AuthStatus {
        let Some(token) = self.inner.current_token() else {
            return self.status();
        };

        match self.inner.identity.verify(&token).await {
            Ok(user) => {
                self.inner.refresh_from_provider(&user);
                if let Some(roles) = &self.inner.roles {
                    match roles.fetch_role(&user.token).await {
                        Ok(role) => self.update_role(&user.token, role),
                        Err(e) => log::warn!("⚠️ [SESSION] No se pudo refrescar el rol: {}", e),
                    }
                }
                log::info!("✅ [SESSION] Sesión confirmada por el proveedor");
            }
            Err(e) => {
                if self.inner.current_token().as_deref() == Some(token.as_str()) {
                    log::warn!("⚠️ [SESSION] Token no confirmado: {}", e);
                    *self.inner.error.borrow_mut() = Some(e);
                    self.inner.end_session("token no confirmado");
                } else {
                    // El evento `Failed` del proveedor ya revocó la sesión y dejó el motivo
                    log::warn!("⚠️ [SESSION] Verificación fallida de un token ya retirado: {}", e);
                }
            }
        }
        self.status()
    }

    fn update_role(&self, token: &str, role: Role) {
        let updated = {
            let mut slot = self.inner.session.borrow_mut();
            match slot.as_mut() {
                Some(session) if session.token == token && session.role != role => {
                    session.role = role;
                    Some(session.clone())
                }
                _ => None,
            }
        };
        if let Some(session) = updated {
            if let Err(e) = self.inner.store.save(&session) {
                log::error!("❌ [SESSION] Error persistiendo rol: {}", e);
            }
        }
    }

    /// Login con email/contraseña. Nunca lanza: el error se devuelve y se guarda
    /// en `last_error` para que la vista lo muestre.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        if self.inner.signing_in.get() {
            return Err(AppError::SaveInProgress);
        }
        let result = self.try_login(credentials).await;
        self.inner.signing_in.set(false);

        match result {
            Ok(session) => {
                log::info!("✅ [SESSION] Login correcto: {} ({})", session.email, session.role.as_str());
                self.inner.start_session(session.clone());
                Ok(session)
            }
            Err(e) => {
                log::warn!("⚠️ [SESSION] Login fallido: {}", e);
                *self.inner.error.borrow_mut() = Some(e.clone());
                if self.status() != AuthStatus::Authenticated {
                    self.inner.set_status(AuthStatus::Anonymous);
                }
                Err(e)
            }
        }
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let email = credentials.email.trim();
        if email.is_empty() {
            return Err(AppError::validation("email", "es obligatorio"));
        }
        if credentials.password.is_empty() {
            return Err(AppError::validation("password", "es obligatoria"));
        }
        self.inner.signing_in.set(true);

        let user = self
            .inner
            .identity
            .sign_in(email, &credentials.password)
            .await
            .map_err(|e| match e {
                AppError::Auth(_) => e,
                other => AppError::Auth(other.to_string()),
            })?;
        let role = self.resolve_role(&user.token).await;

        Ok(Session {
            user_id: user.uid,
            email: user.email,
            display_name: user.display_name,
            role,
            token: user.token,
            token_expiry: user.token_expiry,
        })
    }

    /// Consulta lateral de rol. Nunca bloquea la autenticación:
    /// ante cualquier fallo devuelve `Role::User`.
    pub async fn resolve_role(&self, token: &str) -> Role {
        let Some(roles) = &self.inner.roles else {
            log::warn!("⚠️ [SESSION] Sin backend para roles, usando rol 'user'");
            return Role::User;
        };
        match roles.fetch_role(token).await {
            Ok(role) => role,
            Err(e) => {
                log::warn!("⚠️ [SESSION] Error obteniendo roles ({}), usando rol 'user'", e);
                Role::User
            }
        }
    }

    /// Cerrar sesión. Idempotente.
    pub async fn logout(&self) {
        if self.inner.session.borrow().is_some() {
            if let Err(e) = self.inner.identity.sign_out().await {
                log::warn!("⚠️ [SESSION] Error cerrando sesión en el proveedor: {}", e);
            }
        }
        *self.inner.error.borrow_mut() = None;
        self.inner.end_session("logout");
    }

    /// Liberar la suscripción al proveedor (teardown explícito)
    pub fn dispose(&self) {
        if let Some(subscription) = self.inner.provider_subscription.borrow_mut().take() {
            subscription.unsubscribe();
            log::info!("🔌 [SESSION] Suscripción al proveedor liberada");
        }
    }
}

impl TokenSource for SessionManager {
    fn token(&self) -> Option<String> {
        self.inner.valid_token()
    }

    fn reject(&self, token: &str, error: &AppError) {
        self.inner.revoke(token, error);
    }
}
