// ============================================================================
// RESOURCE VIEWMODEL - Sincronizador genérico de colecciones (CRUD)
// ============================================================================
// Un `ResourceSynchronizer<R>` por colección del backend. Todos los fallos de
// I/O se convierten en `AppError`, se guardan en el estado local y se devuelven
// al llamador; ninguno deja la colección en un estado inconsistente.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::AppError;
use crate::models::resource::validate_fields;
use crate::models::{ItemId, Resource};
use crate::services::api_client::ApiClient;
use crate::services::resource_service::ResourceService;
use crate::state::collection_state::CollectionState;
use crate::state::form_state::{Draft, EditFormState, FormMode, ModalState};
use crate::state::reactivity::{Listeners, Subscription};
use crate::state::session_state::{checked, TokenSource};

/// Estrategia de actualización
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Un único PUT con el objeto completo
    #[default]
    Atomic,
    /// Saga ordenada de `PUT {item}/{campo}?{campo}=valor`, no atómica
    PerField(Vec<&'static str>),
}

/// Resultado de un `fetch_all`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Colección reemplazada con `n` ítems
    Applied(usize),
    /// Respuesta descartada: había un fetch más reciente en vuelo
    Discarded,
}

/// Siguiente id libre: `max(ids numéricos) + 1`, o "1" si no hay ninguno.
/// Si el máximo ya es `u64::MAX` no hay id que sugerir.
pub fn next_id<R: Resource>(items: &[R]) -> Result<ItemId, AppError> {
    let max = items.iter().filter_map(|item| item.id().as_number()).max();
    match max {
        Some(n) => n
            .checked_add(1)
            .map(ItemId::from)
            .ok_or_else(|| AppError::validation("id", "no quedan ids numéricos libres; escribe uno")),
        None => Ok(ItemId::from(1u64)),
    }
}

struct Shared {
    form: RefCell<EditFormState>,
    listeners: Listeners<()>,
}

/// Sincronizador de una colección remota
pub struct ResourceSynchronizer<R: Resource> {
    service: ResourceService<R>,
    tokens: Rc<dyn TokenSource>,
    state: CollectionState<R>,
    shared: Rc<Shared>,
    update_mode: UpdateMode,
}

impl<R: Resource> Clone for ResourceSynchronizer<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            tokens: self.tokens.clone(),
            state: self.state.clone(),
            shared: self.shared.clone(),
            update_mode: self.update_mode.clone(),
        }
    }
}

impl<R: Resource> ResourceSynchronizer<R> {
    pub fn new(api: ApiClient, tokens: Rc<dyn TokenSource>) -> Self {
        Self {
            service: ResourceService::new(api),
            tokens,
            state: CollectionState::new(),
            shared: Rc::new(Shared {
                form: RefCell::new(EditFormState::new()),
                listeners: Listeners::new(),
            }),
            update_mode: UpdateMode::Atomic,
        }
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn update_mode(&self) -> &UpdateMode {
        &self.update_mode
    }

    /// Notificación tras cualquier cambio de colección o formulario
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&()) + 'static,
    {
        self.shared.listeners.subscribe(callback)
    }

    fn notify(&self) {
        self.shared.listeners.emit(&());
    }

    // ========================================================================
    // LECTURA
    // ========================================================================

    pub fn items(&self) -> Vec<R> {
        self.state.items()
    }

    pub fn find(&self, id: &ItemId) -> Option<R> {
        self.state.find(id)
    }

    pub fn error(&self) -> Option<AppError> {
        self.state.error()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Último fetch fallido: mutaciones bloqueadas hasta recargar
    pub fn is_suspended(&self) -> bool {
        self.state.is_suspended()
    }

    /// Ítems cuyo id contiene `query` (vacío → todos)
    pub fn filtered(&self, query: &str) -> Vec<R> {
        let query = query.trim();
        self.state.with_items(|items| {
            items
                .iter()
                .filter(|item| query.is_empty() || item.id().as_str().contains(query))
                .cloned()
                .collect()
        })
    }

    pub fn generate_next_id(&self) -> Result<ItemId, AppError> {
        self.state.with_items(next_id)
    }

    pub fn selection(&self) -> Option<ItemId> {
        self.state.selection()
    }

    pub fn select(&self, id: Option<ItemId>) {
        self.state.select(id);
        self.notify();
    }

    // ========================================================================
    // FETCH
    // ========================================================================

    /// GET de la colección completa. Gana siempre la última request emitida.
    pub async fn fetch_all(&self) -> Result<FetchOutcome, AppError> {
        let token = self.tokens.require_token()?;
        let sequence = self.state.next_sequence();
        log::info!("📥 [SYNC] Cargando {} (#{})", R::LABEL, sequence);

        let result = checked(self.tokens.as_ref(), &token, self.service.list(&token).await);
        if !self.state.is_latest(sequence) {
            log::debug!("[SYNC] Respuesta #{} de {} descartada (obsoleta)", sequence, R::LABEL);
            return Ok(FetchOutcome::Discarded);
        }

        match result {
            Ok(items) => {
                let count = items.len();
                self.state.apply(sequence, items);
                log::info!("✅ [SYNC] {} {} cargados", count, R::LABEL);
                self.notify();
                Ok(FetchOutcome::Applied(count))
            }
            Err(e) => {
                log::error!("❌ [SYNC] Error cargando {}: {}", R::LABEL, e);
                self.state.fail(sequence, e.clone());
                self.notify();
                Err(e)
            }
        }
    }

    /// Resincronizar tras una mutación correcta. Un fallo aquí no invalida la
    /// mutación: queda registrado en el estado de la colección.
    async fn resync(&self) {
        if let Err(e) = self.fetch_all().await {
            log::warn!("⚠️ [SYNC] Mutación aplicada pero la recarga falló: {}", e);
        }
    }

    fn ensure_writable(&self) -> Result<(), AppError> {
        if self.state.is_suspended() {
            return Err(AppError::SyncSuspended);
        }
        Ok(())
    }

    /// Ejecuta `action` en estado `Saving`; el resultado queda en el formulario
    async fn guarded<T, F>(&self, action: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, AppError>>,
    {
        self.shared.form.borrow_mut().begin_save()?;
        self.notify();
        let result = action.await;
        {
            let mut form = self.shared.form.borrow_mut();
            form.finish_save();
            match &result {
                Ok(_) => form.close(),
                Err(e) => form.set_error(Some(e.clone())),
            }
        }
        self.notify();
        result
    }

    // ========================================================================
    // MUTACIONES
    // ========================================================================

    /// Crear un ítem. Devuelve el id usado (generado o el del borrador).
    pub async fn create(&self, draft: &Draft) -> Result<ItemId, AppError> {
        self.guarded(self.create_inner(draft)).await
    }

    async fn create_inner(&self, draft: &Draft) -> Result<ItemId, AppError> {
        self.ensure_writable()?;
        let token = self.tokens.require_token()?;
        validate_fields(R::fields(), &draft.fields)?;

        let id = if draft.auto_generate_id {
            self.generate_next_id()?
        } else {
            let id = ItemId::new(draft.id.as_str());
            if id.is_empty() {
                return Err(AppError::validation("id", "es obligatorio"));
            }
            if self.state.contains(&id) {
                return Err(AppError::validation("id", format!("ya existe un ítem con id {}", id)));
            }
            id
        };
        let item = R::from_form(id.clone(), &draft.fields)?;

        checked(self.tokens.as_ref(), &token, self.service.create(&token, &item).await)?;
        log::info!("➕ [SYNC] Creado {} en {}", id, R::LABEL);
        self.resync().await;
        Ok(id)
    }

    /// Actualizar un ítem existente según `update_mode`
    pub async fn update(&self, id: &ItemId, draft: &Draft) -> Result<(), AppError> {
        self.guarded(self.update_inner(id, draft)).await
    }

    async fn update_inner(&self, id: &ItemId, draft: &Draft) -> Result<(), AppError> {
        self.ensure_writable()?;
        let token = self.tokens.require_token()?;
        validate_fields(R::fields(), &draft.fields)?;
        let item = R::from_form(id.clone(), &draft.fields)?;

        let result = match &self.update_mode {
            UpdateMode::Atomic => self.service.replace(&token, &item).await,
            UpdateMode::PerField(fields) => self.update_fields(&token, &item, fields).await,
        };
        checked(self.tokens.as_ref(), &token, result)?;
        log::info!("✏️ [SYNC] Actualizado {} en {}", id, R::LABEL);
        self.resync().await;
        Ok(())
    }

    /// Saga campo a campo: se detiene en el primer paso fallido y reporta
    /// qué campos llegaron a aplicarse.
    async fn update_fields(&self, token: &str, item: &R, fields: &[&'static str]) -> Result<(), AppError> {
        let values = item.to_form();
        let mut applied: Vec<String> = Vec::new();
        for field in fields {
            let value = values.get(*field).map(String::as_str).unwrap_or("");
            if let Err(e) = self.service.update_field(token, item.id(), field, value).await {
                log::error!(
                    "❌ [SYNC] Actualización parcial de {}: falló '{}' tras {:?}",
                    item.id(),
                    field,
                    applied
                );
                return Err(AppError::PartialUpdate {
                    failed_field: field.to_string(),
                    applied,
                    reason: Box::new(e),
                });
            }
            applied.push(field.to_string());
        }
        Ok(())
    }

    /// DELETE por id; limpia la selección que apunte a él. Lleva su propio
    /// estado de ocupado y de error: el formulario abierto no se toca.
    pub async fn delete_item(&self, id: &ItemId) -> Result<(), AppError> {
        self.state.begin_delete()?;
        self.notify();
        let result = self.delete_inner(id).await;
        self.state.finish_delete(result.as_ref().err().cloned());
        self.notify();
        result
    }

    async fn delete_inner(&self, id: &ItemId) -> Result<(), AppError> {
        self.ensure_writable()?;
        let token = self.tokens.require_token()?;
        checked(self.tokens.as_ref(), &token, self.service.delete(&token, id).await)?;
        log::info!("🗑️ [SYNC] Eliminado {} de {}", id, R::LABEL);
        self.state.forget(id);
        self.resync().await;
        Ok(())
    }

    // ========================================================================
    // CONFIRMACIÓN DE BORRADO
    // ========================================================================

    /// Abrir la confirmación (no se emite ninguna request)
    pub fn request_delete(&self, id: ItemId) {
        self.state.set_pending_delete(Some(id));
        self.notify();
    }

    pub fn pending_delete(&self) -> Option<ItemId> {
        self.state.pending_delete()
    }

    pub fn is_deleting(&self) -> bool {
        self.state.is_deleting()
    }

    /// Error del último intento de borrado (se muestra en la confirmación)
    pub fn delete_error(&self) -> Option<AppError> {
        self.state.delete_error()
    }

    pub fn cancel_delete(&self) {
        if self.state.is_deleting() {
            return;
        }
        self.state.set_pending_delete(None);
        self.notify();
    }

    /// Confirmar el borrado pendiente. Sin borrado pendiente no hace nada.
    pub async fn confirm_delete(&self) -> Result<Option<ItemId>, AppError> {
        let Some(id) = self.state.pending_delete() else {
            return Ok(None);
        };
        self.delete_item(&id).await?;
        self.state.set_pending_delete(None);
        Ok(Some(id))
    }

    // ========================================================================
    // FORMULARIO
    // ========================================================================

    pub fn open_create(&self) {
        let suggested = self.generate_next_id();
        {
            let mut form = self.shared.form.borrow_mut();
            match suggested {
                Ok(id) => form.open_create(&id),
                Err(e) => {
                    log::warn!("⚠️ [SYNC] Sin id automático para {}: {}", R::LABEL, e);
                    form.open_create(&ItemId::new(""));
                    form.set_auto_generate(false);
                }
            }
        }
        self.notify();
    }

    pub fn open_edit(&self, id: &ItemId) -> Result<(), AppError> {
        let item = self
            .state
            .find(id)
            .ok_or_else(|| AppError::validation("id", format!("no existe el ítem {}", id)))?;
        self.shared.form.borrow_mut().open_edit(id.clone(), item.to_form());
        self.notify();
        Ok(())
    }

    pub fn close_form(&self) {
        let mut form = self.shared.form.borrow_mut();
        if form.is_saving() {
            return;
        }
        form.close();
        drop(form);
        self.notify();
    }

    pub fn set_form_field(&self, name: &str, value: &str) {
        self.shared.form.borrow_mut().set_field(name, value);
    }

    pub fn set_form_id(&self, id: &str) {
        self.shared.form.borrow_mut().set_id(id);
    }

    pub fn set_auto_generate(&self, enabled: bool) {
        self.shared.form.borrow_mut().set_auto_generate(enabled);
    }

    pub fn form(&self) -> EditFormState {
        self.shared.form.borrow().clone()
    }

    /// Estado del modal (incluye `Saving` durante cualquier mutación)
    pub fn modal(&self) -> ModalState {
        self.shared.form.borrow().modal()
    }

    /// Confirmar el formulario abierto (crear o editar según el modo)
    pub async fn submit_form(&self) -> Result<ItemId, AppError> {
        let (mode, draft) = {
            let form = self.shared.form.borrow();
            (form.mode().cloned(), form.draft().clone())
        };
        match mode {
            Some(FormMode::Create) => self.create(&draft).await,
            Some(FormMode::Edit(id)) => self.update(&id, &draft).await.map(|_| id),
            None => Err(AppError::validation("form", "no hay formulario abierto")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credentials, Product};
    use crate::services::auth_service::RoleService;
    use crate::services::http::{HttpResponse, Method};
    use crate::services::session_store::SessionStore;
    use crate::state::session_state::{AuthStatus, SessionManager};
    use crate::testutil::{FakeBackend, FakeIdentity, GatedTransport, StaticToken};
    use crate::utils::storage::MemoryStorage;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use serde_json::{json, Value};

    const PRODUCTS: &str = "/master-data/products";

    fn product_json(id: Value, name: &str) -> Value {
        json!({"id": id, "name": name, "category": "Granos", "price": 3500, "stock": 10})
    }

    fn synchronizer(backend: &FakeBackend) -> ResourceSynchronizer<Product> {
        ResourceSynchronizer::new(backend.api_client(), StaticToken::signed_in("tok"))
    }

    fn draft(id: &str, name: &str) -> Draft {
        Draft::new(id)
            .with("name", name)
            .with("category", "Granos")
            .with("price", "4200")
            .with("stock", "7")
    }

    #[test]
    fn next_id_over_numeric_subset() {
        let products = |ids: &[&str]| -> Vec<Product> {
            ids.iter()
                .map(|id| Product::from_form(ItemId::from(*id), &draft(id, "x").fields).unwrap())
                .collect()
        };
        assert_eq!(next_id::<Product>(&[]).unwrap().as_str(), "1");
        assert_eq!(next_id(&products(&["3", "1", "7"])).unwrap().as_str(), "8");
        assert_eq!(next_id(&products(&["3", "abc", "7"])).unwrap().as_str(), "8");
        assert_eq!(next_id(&products(&["abc"])).unwrap().as_str(), "1");
    }

    #[test]
    fn next_id_at_u64_max_is_a_validation_error() {
        let max = Product::from_form(ItemId::from("18446744073709551615"), &draft("", "x").fields).unwrap();
        let err = next_id(&[max]).unwrap_err();
        assert_eq!(err.field(), Some("id"));
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn exhausted_ids_disable_auto_generation() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!("18446744073709551615"), "Tope")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        sync.open_create();
        assert_eq!(sync.modal(), ModalState::Open);
        assert!(!sync.form().draft().auto_generate_id);
        assert_eq!(sync.form().draft().id, "");

        backend.clear_requests();
        let err = block_on(sync.create(&Draft { auto_generate_id: true, ..draft("", "Maíz") })).unwrap_err();
        assert_eq!(err.field(), Some("id"));
        assert!(backend.requests().is_empty());

        let id = block_on(sync.create(&draft("A-1", "Maíz"))).unwrap();
        assert_eq!(id.as_str(), "A-1");
    }

    #[test]
    fn fetch_all_replaces_collection() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz"), product_json(json!("2"), "Sal")]);
        let sync = synchronizer(&backend);

        assert_eq!(block_on(sync.fetch_all()).unwrap(), FetchOutcome::Applied(2));
        assert_eq!(sync.items().len(), 2);
        assert_eq!(sync.generate_next_id().unwrap().as_str(), "3");
    }

    #[test]
    fn fetch_all_normalizes_single_object() {
        let backend = FakeBackend::new();
        backend.set_raw(PRODUCTS, product_json(json!(5), "Aceite"));
        let sync = synchronizer(&backend);

        assert_eq!(block_on(sync.fetch_all()).unwrap(), FetchOutcome::Applied(1));
        assert_eq!(sync.items()[0].name, "Aceite");
    }

    #[test]
    fn failed_fetch_keeps_items_and_suspends_mutations() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        backend.fail_next(503, "mantenimiento");
        let err = block_on(sync.fetch_all()).unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(sync.items().len(), 1);
        assert_eq!(sync.error(), Some(err));
        assert!(sync.is_suspended());

        backend.clear_requests();
        let blocked = block_on(sync.create(&draft("9", "Sal"))).unwrap_err();
        assert_eq!(blocked, AppError::SyncSuspended);
        assert!(backend.requests().is_empty());

        block_on(sync.fetch_all()).unwrap();
        assert!(!sync.is_suspended());
        assert_eq!(sync.error(), None);
    }

    #[test]
    fn data_shape_error_is_reported_not_fatal() {
        let backend = FakeBackend::new();
        backend.set_raw(PRODUCTS, json!(42));
        let sync = synchronizer(&backend);
        let err = block_on(sync.fetch_all()).unwrap_err();
        assert!(matches!(err, AppError::DataShape(_)));
        assert!(sync.items().is_empty());
    }

    #[test]
    fn missing_token_issues_no_request() {
        let backend = FakeBackend::new();
        let sync = ResourceSynchronizer::<Product>::new(backend.api_client(), StaticToken::none());
        assert_eq!(block_on(sync.fetch_all()), Err(AppError::Unauthenticated));
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let gate = GatedTransport::new();
        let sync = ResourceSynchronizer::<Product>::new(gate.api_client(), StaticToken::signed_in("tok"));
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let outcomes = Rc::new(RefCell::new(Vec::new()));
        for label in ["A", "B"] {
            let sync = sync.clone();
            let outcomes = outcomes.clone();
            spawner
                .spawn_local(async move {
                    let outcome = sync.fetch_all().await;
                    outcomes.borrow_mut().push((label, outcome));
                })
                .unwrap();
            pool.run_until_stalled();
        }
        assert_eq!(gate.in_flight(), 2);

        let newer = json!([{"id": 2, "name": "Nuevo", "price": 1, "stock": 1}]).to_string();
        let older = json!([{"id": 1, "name": "Viejo", "price": 1, "stock": 1}]).to_string();
        gate.respond(1, Ok(HttpResponse::new(200, newer)));
        pool.run_until_stalled();
        gate.respond(0, Ok(HttpResponse::new(200, older)));
        pool.run_until_stalled();

        assert_eq!(sync.items().len(), 1);
        assert_eq!(sync.items()[0].name, "Nuevo");
        assert_eq!(
            *outcomes.borrow(),
            vec![("B", Ok(FetchOutcome::Applied(1))), ("A", Ok(FetchOutcome::Discarded))]
        );
    }

    #[test]
    fn stale_failure_does_not_overwrite_newer_result() {
        let gate = GatedTransport::new();
        let sync = ResourceSynchronizer::<Product>::new(gate.api_client(), StaticToken::signed_in("tok"));
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for _ in 0..2 {
            let sync = sync.clone();
            spawner.spawn_local(async move { let _ = sync.fetch_all().await; }).unwrap();
            pool.run_until_stalled();
        }

        gate.respond(1, Ok(HttpResponse::new(200, "[]")));
        pool.run_until_stalled();
        gate.respond(0, Err(AppError::Network("caída".into())));
        pool.run_until_stalled();

        assert_eq!(sync.error(), None);
        assert!(!sync.is_suspended());
    }

    #[test]
    fn create_posts_then_resyncs_and_clears_form() {
        let backend = FakeBackend::new();
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        sync.open_create();
        sync.set_auto_generate(false);
        sync.set_form_id("10");
        for (name, value) in [("name", "Panela"), ("category", "Dulces"), ("price", "2500"), ("stock", "12")] {
            sync.set_form_field(name, value);
        }
        let id = block_on(sync.submit_form()).unwrap();

        assert_eq!(id.as_str(), "10");
        assert_eq!(sync.items().len(), 1);
        assert_eq!(sync.items()[0].name, "Panela");
        assert_eq!(sync.modal(), ModalState::Closed);
        assert_eq!(sync.form().draft(), &Draft::default());

        let posts: Vec<_> = backend.mutations();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].method, Method::Post);
        let body: Value = serde_json::from_str(posts[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["id"], json!(10));
        assert_eq!(body["price"], json!(2500.0));
    }

    #[test]
    fn create_with_auto_generated_id() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(3), "A"), product_json(json!(7), "B")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        let id = block_on(sync.create(&Draft { auto_generate_id: true, ..draft("", "Maíz") })).unwrap();
        assert_eq!(id.as_str(), "8");
        assert!(sync.find(&id).is_some());
    }

    #[test]
    fn duplicate_id_is_rejected_without_network_call() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        backend.clear_requests();

        let err = block_on(sync.create(&draft("1", "Otro arroz"))).unwrap_err();
        assert_eq!(err.field(), Some("id"));
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(backend.requests().len(), 0);
    }

    #[test]
    fn invalid_fields_fail_before_any_request() {
        let backend = FakeBackend::new();
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        backend.clear_requests();

        let err = block_on(sync.create(&draft("2", "Sal").with("price", "caro"))).unwrap_err();
        assert_eq!(err.field(), Some("price"));
        let err = block_on(sync.create(&draft("2", "  "))).unwrap_err();
        assert_eq!(err.field(), Some("name"));
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn backend_rejection_surfaces_body_and_keeps_form_open() {
        let backend = FakeBackend::new();
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        sync.open_create();
        backend.fail_request(Method::Post, PRODUCTS, 400);

        let err = block_on(sync.create(&draft("5", "Sal"))).unwrap_err();
        assert_eq!(err, AppError::Http { status: 400, body: "fallo simulado".into() });
        assert_eq!(sync.modal(), ModalState::Open);
        assert_eq!(sync.form().error(), Some(&err));
        assert!(sync.items().is_empty());
    }

    #[test]
    fn atomic_update_sends_single_put() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(4), "Arroz")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        sync.open_edit(&ItemId::from("4")).unwrap();
        sync.set_form_field("name", "Arroz premium");
        block_on(sync.submit_form()).unwrap();

        let puts = backend.mutations();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].url, "http://backend.test/api/master-data/products/4");
        assert_eq!(sync.find(&ItemId::from("4")).unwrap().name, "Arroz premium");
    }

    #[test]
    fn per_field_update_runs_ordered_saga() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(4), "Arroz")]);
        let sync = synchronizer(&backend)
            .with_update_mode(UpdateMode::PerField(vec!["name", "category", "price", "stock"]));
        block_on(sync.fetch_all()).unwrap();

        block_on(sync.update(&ItemId::from("4"), &draft("4", "Arroz blanco"))).unwrap();

        let urls: Vec<String> = backend.mutations().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://backend.test/api/master-data/products/4/name?name=Arroz%20blanco",
                "http://backend.test/api/master-data/products/4/category?category=Granos",
                "http://backend.test/api/master-data/products/4/price?price=4200",
                "http://backend.test/api/master-data/products/4/stock?stock=7",
            ]
        );
        let updated = sync.find(&ItemId::from("4")).unwrap();
        assert_eq!(updated.name, "Arroz blanco");
        assert_eq!(updated.stock, 7);
    }

    #[test]
    fn per_field_failure_reports_exact_field() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(4), "Arroz")]);
        let sync = synchronizer(&backend)
            .with_update_mode(UpdateMode::PerField(vec!["name", "category", "price", "stock"]));
        block_on(sync.fetch_all()).unwrap();
        backend.fail_path("/master-data/products/4/price", 500);

        let err = block_on(sync.update(&ItemId::from("4"), &draft("4", "Arroz blanco"))).unwrap_err();
        match err {
            AppError::PartialUpdate { failed_field, applied, reason } => {
                assert_eq!(failed_field, "price");
                assert_eq!(applied, vec!["name".to_string(), "category".to_string()]);
                assert_eq!(reason.status(), Some(500));
            }
            other => panic!("se esperaba PartialUpdate, llegó {:?}", other),
        }
        assert_eq!(backend.mutations().len(), 3);
    }

    #[test]
    fn delete_requires_confirmation() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz"), product_json(json!(2), "Sal")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        sync.select(Some(ItemId::from("2")));

        sync.request_delete(ItemId::from("2"));
        assert!(backend.mutations().is_empty());
        sync.cancel_delete();
        assert_eq!(block_on(sync.confirm_delete()).unwrap(), None);
        assert!(backend.mutations().is_empty());

        sync.request_delete(ItemId::from("2"));
        assert_eq!(block_on(sync.confirm_delete()).unwrap(), Some(ItemId::from("2")));
        assert_eq!(backend.mutations()[0].method, Method::Delete);
        assert_eq!(sync.items().len(), 1);
        assert_eq!(sync.selection(), None);
        assert_eq!(sync.pending_delete(), None);
    }

    #[test]
    fn failed_delete_keeps_confirmation_pending() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        backend.fail_request(Method::Delete, "/master-data/products/1", 409);

        sync.request_delete(ItemId::from("1"));
        assert!(block_on(sync.confirm_delete()).is_err());
        assert_eq!(sync.pending_delete(), Some(ItemId::from("1")));
        assert_eq!(sync.items().len(), 1);
    }

    #[test]
    fn ids_with_reserved_characters_are_escaped_in_paths() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!("A/1"), "Arroz"), product_json(json!("B 2"), "Sal")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        block_on(sync.update(&ItemId::from("B 2"), &draft("B 2", "Sal marina"))).unwrap();
        block_on(sync.delete_item(&ItemId::from("A/1"))).unwrap();

        let urls: Vec<String> = backend.mutations().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://backend.test/api/master-data/products/B%202",
                "http://backend.test/api/master-data/products/A%2F1",
            ]
        );
        assert_eq!(sync.items().len(), 1);
        assert_eq!(sync.find(&ItemId::from("B 2")).unwrap().name, "Sal marina");
    }

    #[test]
    fn delete_leaves_open_edit_form_untouched() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz"), product_json(json!(2), "Sal")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        sync.open_edit(&ItemId::from("1")).unwrap();
        sync.set_form_field("name", "Arroz integral");
        sync.request_delete(ItemId::from("2"));
        block_on(sync.confirm_delete()).unwrap();

        assert_eq!(sync.modal(), ModalState::Open);
        assert_eq!(sync.form().mode(), Some(&FormMode::Edit(ItemId::from("1"))));
        assert_eq!(sync.form().draft().fields.get("name").map(String::as_str), Some("Arroz integral"));
        assert!(!sync.is_deleting());
    }

    #[test]
    fn failed_delete_reports_in_its_own_slot() {
        let backend = FakeBackend::new();
        backend.seed(PRODUCTS, vec![product_json(json!(1), "Arroz"), product_json(json!(2), "Sal")]);
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();
        backend.fail_request(Method::Delete, "/master-data/products/2", 409);

        sync.open_edit(&ItemId::from("1")).unwrap();
        sync.request_delete(ItemId::from("2"));
        let err = block_on(sync.confirm_delete()).unwrap_err();

        assert_eq!(sync.delete_error(), Some(err));
        assert_eq!(sync.form().error(), None);
        assert_eq!(sync.modal(), ModalState::Open);

        sync.cancel_delete();
        assert_eq!(sync.pending_delete(), None);
        assert_eq!(sync.delete_error(), None);
    }

    #[test]
    fn delete_in_flight_blocks_cancel_and_second_confirm() {
        let gate = GatedTransport::new();
        let sync = ResourceSynchronizer::<Product>::new(gate.api_client(), StaticToken::signed_in("tok"));
        let mut pool = LocalPool::new();

        sync.request_delete(ItemId::from("1"));
        let first = sync.clone();
        pool.spawner()
            .spawn_local(async move { let _ = first.confirm_delete().await; })
            .unwrap();
        pool.run_until_stalled();
        assert!(sync.is_deleting());
        assert_eq!(sync.modal(), ModalState::Closed);

        assert_eq!(block_on(sync.confirm_delete()), Err(AppError::SaveInProgress));
        sync.cancel_delete();
        assert_eq!(sync.pending_delete(), Some(ItemId::from("1")));
        assert_eq!(gate.requests().len(), 1);

        gate.respond(0, Ok(HttpResponse::new(204, "")));
        pool.run_until_stalled();
        gate.respond(1, Ok(HttpResponse::new(200, "[]")));
        pool.run_until_stalled();
        assert!(!sync.is_deleting());
        assert_eq!(sync.pending_delete(), None);
    }

    #[test]
    fn backend_401_ends_the_session() {
        let backend = FakeBackend::new();
        let manager = SessionManager::new(
            SessionStore::new(Rc::new(MemoryStorage::new())),
            Rc::new(FakeIdentity::new()),
            Some(RoleService::new(backend.api_client())),
        );
        manager.initialize();
        let credentials = Credentials { email: "ana@almacen.co".into(), password: "secreto".into() };
        block_on(manager.login(&credentials)).unwrap();
        assert_eq!(manager.status(), AuthStatus::Authenticated);

        let sync = ResourceSynchronizer::<Product>::new(backend.api_client(), Rc::new(manager.clone()));
        backend.fail_next(401, "token expirado");
        let err = block_on(sync.fetch_all()).unwrap_err();

        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(manager.status(), AuthStatus::Anonymous);
        assert_eq!(manager.token(), None);
        backend.clear_requests();
        assert_eq!(block_on(sync.fetch_all()), Err(AppError::Unauthenticated));
        assert!(backend.requests().is_empty());
    }

    #[test]
    fn second_confirm_while_saving_is_rejected() {
        let gate = GatedTransport::new();
        let sync = ResourceSynchronizer::<Product>::new(gate.api_client(), StaticToken::signed_in("tok"));
        let mut pool = LocalPool::new();
        let spawner = pool.spawner();

        let first = sync.clone();
        spawner
            .spawn_local(async move { let _ = first.create(&draft("1", "Arroz")).await; })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(sync.modal(), ModalState::Saving);

        let err = block_on(sync.create(&draft("2", "Sal"))).unwrap_err();
        assert_eq!(err, AppError::SaveInProgress);
        assert_eq!(gate.requests().len(), 1);

        gate.respond(0, Ok(HttpResponse::new(201, "")));
        pool.run_until_stalled();
        gate.respond(1, Ok(HttpResponse::new(200, "[]")));
        pool.run_until_stalled();
        assert_eq!(sync.modal(), ModalState::Closed);
    }

    #[test]
    fn filter_by_id() {
        let backend = FakeBackend::new();
        backend.seed(
            PRODUCTS,
            vec![product_json(json!(1), "A"), product_json(json!(12), "B"), product_json(json!(3), "C")],
        );
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        let ids: Vec<String> = sync.filtered(" 1 ").iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "12"]);
        assert_eq!(sync.filtered("").len(), 3);
    }

    #[test]
    fn round_trip_reflects_each_mutation() {
        let backend = FakeBackend::new();
        let sync = synchronizer(&backend);
        block_on(sync.fetch_all()).unwrap();

        block_on(sync.create(&draft("1", "Arroz"))).unwrap();
        block_on(sync.create(&draft("2", "Sal"))).unwrap();
        assert_eq!(sync.items().len(), 2);

        block_on(sync.update(&ItemId::from("2"), &draft("2", "Sal marina").with("stock", "99"))).unwrap();
        let updated = sync.find(&ItemId::from("2")).unwrap();
        assert_eq!((updated.name.as_str(), updated.stock), ("Sal marina", 99));

        block_on(sync.delete_item(&ItemId::from("1"))).unwrap();
        assert_eq!(sync.items().len(), 1);
        assert_eq!(backend.items(PRODUCTS).len(), 1);
    }

    #[test]
    fn subscribers_are_notified_on_fetch() {
        let backend = FakeBackend::new();
        let sync = synchronizer(&backend);
        let hits = Rc::new(std::cell::Cell::new(0));
        let counter = hits.clone();
        let sub = sync.subscribe(move |_| counter.set(counter.get() + 1));

        block_on(sync.fetch_all()).unwrap();
        assert_eq!(hits.get(), 1);
        drop(sub);
        block_on(sync.fetch_all()).unwrap();
        assert_eq!(hits.get(), 1);
    }
}
