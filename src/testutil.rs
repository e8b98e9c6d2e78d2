// ============================================================================
// TEST UTILS - Backend, transportes y proveedor de identidad en memoria
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::IdentityUser;
use crate::services::api_client::ApiClient;
use crate::services::auth_service::{IdentityEvent, IdentityProvider};
use crate::services::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::state::reactivity::{Listeners, Subscription};
use crate::state::session_state::TokenSource;
use crate::utils::encoding::percent_decode;

pub const BACKEND: &str = "http://backend.test";

struct PathFailure {
    method: Option<Method>,
    path: String,
    status: u16,
}

#[derive(Default)]
struct BackendState {
    collections: RefCell<BTreeMap<String, Vec<Value>>>,
    documents: RefCell<BTreeMap<String, Value>>,
    queued: RefCell<VecDeque<HttpResponse>>,
    path_failures: RefCell<Vec<PathFailure>>,
    offline: Cell<bool>,
    requests: RefCell<Vec<HttpRequest>>,
}

/// Backend REST en memoria con las rutas de la API real
#[derive(Clone)]
pub struct FakeBackend {
    state: Rc<BackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self { state: Rc::new(BackendState::default()) };
        {
            let mut collections = backend.state.collections.borrow_mut();
            collections.insert("/master-data/products".into(), Vec::new());
            collections.insert("/almacenes".into(), Vec::new());
        }
        {
            let mut documents = backend.state.documents.borrow_mut();
            documents.insert("/auth/getRoles".into(), json!(["USER"]));
            documents.insert(
                "/master-data/config".into(),
                json!({"percentage": "10", "minDistance": "50"}),
            );
            documents.insert(
                "/almacen-virtual".into(),
                json!({"id": 1, "name": "Almacén virtual", "products": []}),
            );
        }
        backend
    }

    pub fn transport(&self) -> Rc<dyn HttpTransport> {
        Rc::new(self.clone())
    }

    pub fn api_client(&self) -> ApiClient {
        match ApiClient::new(self.transport(), &AppConfig::with_backend(BACKEND)) {
            Ok(api) => api,
            Err(e) => panic!("config de test inválida: {}", e),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.borrow().clone()
    }

    pub fn clear_requests(&self) {
        self.state.requests.borrow_mut().clear();
    }

    /// Requests que no son GET
    pub fn mutations(&self) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(|r| r.method != Method::Get).collect()
    }

    pub fn set_roles(&self, roles: Value) {
        self.state.documents.borrow_mut().insert("/auth/getRoles".into(), roles);
    }

    pub fn set_config(&self, config: Value) {
        self.state.documents.borrow_mut().insert("/master-data/config".into(), config);
    }

    pub fn config(&self) -> Value {
        self.state.documents.borrow().get("/master-data/config").cloned().unwrap_or(Value::Null)
    }

    pub fn set_virtual_warehouse(&self, value: Value) {
        self.state.documents.borrow_mut().insert("/almacen-virtual".into(), value);
    }

    /// Sembrar una colección (`/master-data/products`, `/almacenes/1/productos`...)
    pub fn seed(&self, path: &str, items: Vec<Value>) {
        self.state.collections.borrow_mut().insert(path.to_string(), items);
    }

    pub fn items(&self, path: &str) -> Vec<Value> {
        self.state.collections.borrow().get(path).cloned().unwrap_or_default()
    }

    /// Respuesta cruda para una ruta fuera de las colecciones (p. ej. un escalar)
    pub fn set_raw(&self, path: &str, value: Value) {
        self.state.collections.borrow_mut().remove(path);
        self.state.documents.borrow_mut().insert(path.to_string(), value);
    }

    /// La próxima request (cualquiera) recibe esta respuesta
    pub fn fail_next(&self, status: u16, body: &str) {
        self.state.queued.borrow_mut().push_back(HttpResponse::new(status, body));
    }

    /// Toda request a `path` falla con `status` hasta `clear_failures`
    pub fn fail_path(&self, path: &str, status: u16) {
        self.state.path_failures.borrow_mut().push(PathFailure {
            method: None,
            path: path.to_string(),
            status,
        });
    }

    pub fn fail_request(&self, method: Method, path: &str, status: u16) {
        self.state.path_failures.borrow_mut().push(PathFailure {
            method: Some(method),
            path: path.to_string(),
            status,
        });
    }

    pub fn clear_failures(&self) {
        self.state.path_failures.borrow_mut().clear();
        self.state.queued.borrow_mut().clear();
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.offline.set(offline);
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        let Some(rest) = request.url.strip_prefix(BACKEND) else {
            return HttpResponse::new(404, "host desconocido");
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (rest, HashMap::new()),
        };

        for failure in self.state.path_failures.borrow().iter() {
            let method_matches = failure.method.map_or(true, |m| m == request.method);
            let path_matches =
                path == failure.path || path.strip_prefix("/api") == Some(failure.path.as_str());
            if method_matches && path_matches {
                return HttpResponse::new(failure.status, "fallo simulado");
            }
        }

        if path.starts_with("/auth/") {
            return match self.state.documents.borrow().get(path) {
                Some(value) if request.method == Method::Get => {
                    HttpResponse::new(200, value.to_string())
                }
                _ => HttpResponse::new(404, "no encontrado"),
            };
        }

        let Some(path) = path.strip_prefix("/api") else {
            return HttpResponse::new(404, "no encontrado");
        };
        match request.method {
            Method::Get => self.get(path),
            Method::Post => self.post(path, request.body.as_deref()),
            Method::Put => self.put(path, &query, request.body.as_deref()),
            Method::Delete => self.delete(path),
        }
    }

    /// Colección que contiene `path` y los segmentos restantes
    fn locate(&self, path: &str) -> Option<(String, Vec<String>)> {
        let collections = self.state.collections.borrow();
        collections
            .keys()
            .filter(|key| path.starts_with(&format!("{}/", key)))
            .max_by_key(|key| key.len())
            .map(|key| {
                let rest = &path[key.len() + 1..];
                (key.clone(), rest.split('/').map(percent_decode).collect())
            })
    }

    fn get(&self, path: &str) -> HttpResponse {
        if let Some(items) = self.state.collections.borrow().get(path) {
            return HttpResponse::new(200, Value::Array(items.clone()).to_string());
        }
        if let Some(doc) = self.state.documents.borrow().get(path) {
            return HttpResponse::new(200, doc.to_string());
        }
        if let Some((collection, segments)) = self.locate(path) {
            if segments.len() == 1 {
                let collections = self.state.collections.borrow();
                if let Some(item) = collections
                    .get(&collection)
                    .and_then(|items| items.iter().find(|i| id_of(i) == segments[0]))
                {
                    return HttpResponse::new(200, item.to_string());
                }
            }
        }
        HttpResponse::new(404, "no encontrado")
    }

    fn post(&self, path: &str, body: Option<&str>) -> HttpResponse {
        let Some(item) = body.and_then(|b| serde_json::from_str::<Value>(b).ok()) else {
            return HttpResponse::new(400, "cuerpo inválido");
        };
        let mut collections = self.state.collections.borrow_mut();
        let Some(items) = collections.get_mut(path) else {
            return HttpResponse::new(404, "no encontrado");
        };
        let id = id_of(&item);
        if items.iter().any(|existing| id_of(existing) == id) {
            return HttpResponse::new(409, format!("id {} duplicado", id));
        }
        items.push(item.clone());
        HttpResponse::new(201, item.to_string())
    }

    fn put(&self, path: &str, query: &HashMap<String, String>, body: Option<&str>) -> HttpResponse {
        if let Some(segment) = path.strip_prefix("/master-data/config/") {
            let key = match segment {
                "percentage" => "percentage",
                "min-distance" => "minDistance",
                _ => return HttpResponse::new(404, "no encontrado"),
            };
            let Some(value) = query.get(key) else {
                return HttpResponse::new(400, "falta parámetro");
            };
            let mut documents = self.state.documents.borrow_mut();
            if let Some(Value::Object(config)) = documents.get_mut("/master-data/config") {
                config.insert(key.to_string(), Value::String(value.clone()));
            }
            return HttpResponse::new(200, "");
        }

        let Some((collection, segments)) = self.locate(path) else {
            return HttpResponse::new(404, "no encontrado");
        };
        let mut collections = self.state.collections.borrow_mut();
        let Some(items) = collections.get_mut(&collection) else {
            return HttpResponse::new(404, "no encontrado");
        };
        let Some(item) = items.iter_mut().find(|i| id_of(i) == segments[0]) else {
            return HttpResponse::new(404, "no encontrado");
        };

        match segments.as_slice() {
            [_] => match body.and_then(|b| serde_json::from_str::<Value>(b).ok()) {
                Some(replacement) => {
                    *item = replacement;
                    HttpResponse::new(200, item.to_string())
                }
                None => HttpResponse::new(400, "cuerpo inválido"),
            },
            [_, field] => match (query.get(field.as_str()), item.as_object_mut()) {
                (Some(value), Some(object)) => {
                    object.insert(field.clone(), scalar(value));
                    HttpResponse::new(200, "")
                }
                _ => HttpResponse::new(400, "falta parámetro"),
            },
            _ => HttpResponse::new(404, "no encontrado"),
        }
    }

    fn delete(&self, path: &str) -> HttpResponse {
        let Some((collection, segments)) = self.locate(path) else {
            return HttpResponse::new(404, "no encontrado");
        };
        let mut collections = self.state.collections.borrow_mut();
        let Some(items) = collections.get_mut(&collection) else {
            return HttpResponse::new(404, "no encontrado");
        };
        let before = items.len();
        items.retain(|i| id_of(i) != segments[0]);
        if items.len() == before {
            return HttpResponse::new(404, "no encontrado");
        }
        HttpResponse::new(204, "")
    }
}

#[async_trait(?Send)]
impl HttpTransport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        self.state.requests.borrow_mut().push(request.clone());
        if self.state.offline.get() {
            return Err(AppError::Network("sin conexión".to_string()));
        }
        if let Some(response) = self.state.queued.borrow_mut().pop_front() {
            return Ok(response);
        }
        Ok(self.route(&request))
    }
}

fn id_of(item: &Value) -> String {
    match item.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return json!(n);
    }
    Value::String(raw.to_string())
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), percent_decode(v)))
        .collect()
}

/// Respuestas programadas en orden
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| AppError::Network("sin respuestas programadas".to_string()))
    }
}

/// Transporte cuyas respuestas se liberan a mano (carreras entre fetches)
#[derive(Clone, Default)]
pub struct GatedTransport {
    pending: Rc<RefCell<Vec<Option<oneshot::Sender<Result<HttpResponse, AppError>>>>>>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl GatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_client(&self) -> ApiClient {
        match ApiClient::new(Rc::new(self.clone()), &AppConfig::with_backend(BACKEND)) {
            Ok(api) => api,
            Err(e) => panic!("config de test inválida: {}", e),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.borrow().iter().filter(|s| s.is_some()).count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// Liberar la request número `index` (orden de llegada)
    pub fn respond(&self, index: usize, result: Result<HttpResponse, AppError>) {
        let sender = self.pending.borrow_mut().get_mut(index).and_then(Option::take);
        match sender {
            Some(sender) => {
                let _ = sender.send(result);
            }
            None => panic!("no hay request pendiente #{}", index),
        }
    }
}

#[async_trait(?Send)]
impl HttpTransport for GatedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, AppError> {
        let (tx, rx) = oneshot::channel();
        self.requests.borrow_mut().push(request);
        self.pending.borrow_mut().push(Some(tx));
        rx.await
            .unwrap_or_else(|_| Err(AppError::Network("request cancelada".to_string())))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SignInMode {
    Accept,
    RejectCredentials,
    Offline,
}

/// Proveedor de identidad programable
pub struct FakeIdentity {
    mode: Cell<SignInMode>,
    reject_tokens: Cell<bool>,
    users: RefCell<HashMap<String, IdentityUser>>,
    verify_calls: Cell<usize>,
    sign_out_calls: Cell<usize>,
    listeners: Listeners<IdentityEvent>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            mode: Cell::new(SignInMode::Accept),
            reject_tokens: Cell::new(false),
            users: RefCell::new(HashMap::new()),
            verify_calls: Cell::new(0),
            sign_out_calls: Cell::new(0),
            listeners: Listeners::new(),
        }
    }

    pub fn reject_credentials(&self) {
        self.mode.set(SignInMode::RejectCredentials);
    }

    pub fn go_offline(&self) {
        self.mode.set(SignInMode::Offline);
    }

    pub fn reject_tokens(&self) {
        self.reject_tokens.set(true);
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.get()
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.get()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// `verify(token)` devolverá `user` (p. ej. con un token refrescado)
    pub fn register(&self, token: &str, user: IdentityUser) {
        self.users.borrow_mut().insert(token.to_string(), user);
    }

    /// Simular un cambio de estado originado en el proveedor
    pub fn emit(&self, event: IdentityEvent) {
        self.listeners.emit(&event);
    }
}

#[async_trait(?Send)]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<IdentityUser, AppError> {
        match self.mode.get() {
            SignInMode::RejectCredentials => {
                Err(AppError::Auth("Credenciales incorrectas".to_string()))
            }
            SignInMode::Offline => Err(AppError::Network("sin conexión".to_string())),
            SignInMode::Accept => {
                let local = email.split('@').next().unwrap_or(email);
                let user = IdentityUser {
                    uid: format!("u-{}", local),
                    email: email.to_string(),
                    display_name: None,
                    token: format!("token-{}", local),
                    token_expiry: None,
                };
                self.users.borrow_mut().insert(user.token.clone(), user.clone());
                self.listeners.emit(&IdentityEvent::SignedIn(user.clone()));
                Ok(user)
            }
        }
    }

    async fn verify(&self, token: &str) -> Result<IdentityUser, AppError> {
        self.verify_calls.set(self.verify_calls.get() + 1);
        if self.reject_tokens.get() {
            let err = AppError::Auth("La sesión ha expirado.".to_string());
            self.listeners.emit(&IdentityEvent::Failed(err.to_string()));
            return Err(err);
        }
        Ok(self.users.borrow().get(token).cloned().unwrap_or(IdentityUser {
            uid: String::new(),
            email: String::new(),
            display_name: None,
            token: token.to_string(),
            token_expiry: None,
        }))
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.sign_out_calls.set(self.sign_out_calls.get() + 1);
        self.listeners.emit(&IdentityEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(&IdentityEvent)>) -> Subscription {
        self.listeners.subscribe(move |event| listener(event))
    }
}

/// Token fijo para viewmodels probados sin `SessionManager`
pub struct StaticToken(pub Option<String>);

impl StaticToken {
    pub fn signed_in(token: &str) -> Rc<dyn TokenSource> {
        Rc::new(Self(Some(token.to_string())))
    }

    pub fn none() -> Rc<dyn TokenSource> {
        Rc::new(Self(None))
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}
