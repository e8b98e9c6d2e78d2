// ============================================================================
// APP - Shell del navegador
// ============================================================================
// Construye los colaboradores de forma explícita (sin globales de sesión),
// evalúa la guardia de rutas en cada render y enlaza los eventos por
// delegación sobre `#app` (`data-action`, `data-field`, `data-setting`).
// ============================================================================

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Event, EventTarget, HtmlInputElement};

use crate::config::CONFIG;
use crate::dom::{self, EventHandle};
use crate::error::AppError;
use crate::models::{ConfigField, Credentials, ItemId, Product, Resource, Store};
use crate::router::{GuardDecision, HashNavigator, Navigator, Route, RouteGuard};
use crate::services::{
    ApiClient, FetchTransport, FirebaseIdentityProvider, HttpTransport, RoleService, SessionStore,
};
use crate::state::{SessionManager, Subscription, TokenSource};
use crate::utils::LocalStorageBackend;
use crate::viewmodels::{ResourceSynchronizer, SettingsViewModel, WarehouseViewModel};
use crate::views;

/// Páginas que necesitan backend
struct Pages {
    products: ResourceSynchronizer<Product>,
    stores: ResourceSynchronizer<Store>,
    settings: SettingsViewModel,
    warehouse: WarehouseViewModel,
}

/// Estado puramente visual, no persistido
#[derive(Default)]
struct UiState {
    filter: String,
    login_email: String,
    confirming_settings: bool,
    /// Última ruta cuyos datos se pidieron
    loaded_route: Option<Route>,
}

pub struct App {
    root: Element,
    session: SessionManager,
    guard: RouteGuard,
    /// `Err` si falta `BACKEND_URL`: las páginas muestran el error de configuración
    pages: Result<Pages, AppError>,
    ui: RefCell<UiState>,
    render_scheduled: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
    handles: RefCell<Vec<EventHandle>>,
}

impl App {
    /// Montar la app en `#app`, restaurar la sesión y lanzar la verificación
    pub fn start() -> Result<Rc<Self>, JsValue> {
        let root = dom::get_element_by_id("app")
            .ok_or_else(|| JsValue::from_str("No #app element found"))?;

        let transport: Rc<dyn HttpTransport> =
            Rc::new(FetchTransport::new(CONFIG.request_timeout_ms()));
        let api = ApiClient::new(transport.clone(), &CONFIG);
        if let Err(e) = &api {
            log::error!("❌ [APP] {}", e);
        }

        let identity = Rc::new(FirebaseIdentityProvider::new(transport, &CONFIG.identity));
        let store = SessionStore::new(Rc::new(LocalStorageBackend));
        let roles = api.as_ref().ok().cloned().map(RoleService::new);
        let session = SessionManager::new(store, identity, roles);

        let tokens: Rc<dyn TokenSource> = Rc::new(session.clone());
        let pages = api.map(|api| Pages {
            products: ResourceSynchronizer::new(api.clone(), tokens.clone()),
            stores: ResourceSynchronizer::new(api.clone(), tokens.clone()),
            settings: SettingsViewModel::new(api.clone(), tokens.clone()),
            warehouse: WarehouseViewModel::new(api, tokens, CONFIG.maps.clone()),
        });

        let app = Rc::new(Self {
            root,
            session,
            guard: RouteGuard::new(Rc::new(HashNavigator)),
            pages,
            ui: RefCell::new(UiState::default()),
            render_scheduled: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
            handles: RefCell::new(Vec::new()),
        });

        app.subscribe_all();
        app.attach_listeners()?;

        let status = app.session.initialize();
        log::info!("🔐 [APP] Sesión inicial: {:?}", status);
        app.render();

        // Verificación en segundo plano; la vista ya se pintó con la sesión local
        let session = app.session.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let status = session.confirm().await;
            log::info!("🔐 [APP] Sesión verificada: {:?}", status);
        });

        Ok(app)
    }

    // ========================================================================
    // SUSCRIPCIONES Y EVENTOS
    // ========================================================================

    fn subscribe_all(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let mut subscriptions = vec![self.session.subscribe(schedule_on(&weak))];
        if let Ok(pages) = &self.pages {
            subscriptions.push(pages.products.subscribe(schedule_on(&weak)));
            subscriptions.push(pages.stores.subscribe(schedule_on(&weak)));
            subscriptions.push(pages.settings.subscribe(schedule_on(&weak)));
            subscriptions.push(pages.warehouse.subscribe(schedule_on(&weak)));
        }
        *self.subscriptions.borrow_mut() = subscriptions;
    }

    fn attach_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let weak = Rc::downgrade(self);
        let root: &EventTarget = self.root.as_ref();
        let mut handles = vec![
            dom::listen(root, "click", with_app(&weak, App::on_click))?,
            dom::listen(root, "submit", with_app(&weak, App::on_submit))?,
            dom::listen(root, "input", with_app(&weak, App::on_input))?,
            dom::listen(root, "change", with_app(&weak, App::on_change))?,
        ];
        if let Some(window) = dom::window() {
            let target: &EventTarget = window.as_ref();
            handles.push(dom::listen(
                target,
                "hashchange",
                with_app(&weak, |app, _| app.schedule_render()),
            )?);
        }
        *self.handles.borrow_mut() = handles;
        Ok(())
    }

    fn on_click(self: &Rc<Self>, event: Event) {
        let Some(button) = dom::closest(event.target(), "button[data-action]") else {
            return;
        };
        let action = button.get_attribute("data-action").unwrap_or_default();
        let id = button.get_attribute("data-id").map(|id| ItemId::from(id.as_str()));
        log::debug!("[APP] Acción '{}' ({:?})", action, id);

        match action.as_str() {
            "logout" => {
                let session = self.session.clone();
                wasm_bindgen_futures::spawn_local(async move { session.logout().await });
                return;
            }
            "retry" => {
                self.ui.borrow_mut().loaded_route = None;
                self.schedule_render();
                return;
            }
            _ => {}
        }

        let Ok(pages) = &self.pages else {
            return;
        };
        match HashNavigator::current() {
            Route::Products => self.collection_action(&pages.products, &action, id),
            Route::Management => self.collection_action(&pages.stores, &action, id),
            Route::Settings => self.settings_action(&pages.settings, &action),
            _ => {}
        }
    }

    fn on_submit(self: &Rc<Self>, event: Event) {
        event.prevent_default();
        let Some(form) = dom::closest(event.target(), "form[data-action]") else {
            return;
        };
        match form.get_attribute("data-action").as_deref() {
            Some("login") => self.submit_login(),
            Some("submit-form") => {
                let Ok(pages) = &self.pages else {
                    return;
                };
                match HashNavigator::current() {
                    Route::Products => self.submit_collection(&pages.products),
                    Route::Management => self.submit_collection(&pages.stores),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn on_input(self: &Rc<Self>, event: Event) {
        let Some(input) = input_target(&event) else {
            return;
        };
        if input.type_() == "checkbox" {
            return;
        }
        let value = input.value();

        if let Some(name) = input.get_attribute("data-setting") {
            let field = ConfigField::ALL.into_iter().find(|f| f.name() == name);
            if let (Ok(pages), Some(field)) = (&self.pages, field) {
                pages.settings.set_field(field, &value);
            }
            return;
        }

        let Some(name) = input.get_attribute("data-field") else {
            return;
        };
        if name == "filter" {
            self.ui.borrow_mut().filter = value;
            self.schedule_render();
            return;
        }
        let Ok(pages) = &self.pages else {
            return;
        };
        match HashNavigator::current() {
            Route::Products => edit_field(&pages.products, &name, &value),
            Route::Management => edit_field(&pages.stores, &name, &value),
            _ => {}
        }
    }

    fn on_change(self: &Rc<Self>, event: Event) {
        let Some(input) = input_target(&event) else {
            return;
        };
        if input.get_attribute("data-field").as_deref() != Some("autoId") {
            return;
        }
        let Ok(pages) = &self.pages else {
            return;
        };
        match HashNavigator::current() {
            Route::Products => pages.products.set_auto_generate(input.checked()),
            Route::Management => pages.stores.set_auto_generate(input.checked()),
            _ => return,
        }
        self.schedule_render();
    }

    // ========================================================================
    // ACCIONES
    // ========================================================================

    fn submit_login(self: &Rc<Self>) {
        let credentials = Credentials {
            email: dom::input_value("email").unwrap_or_default().trim().to_string(),
            password: dom::input_value("password").unwrap_or_default(),
        };
        self.ui.borrow_mut().login_email = credentials.email.clone();

        let session = self.session.clone();
        let weak = Rc::downgrade(self);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = session.login(&credentials).await {
                log::warn!("⚠️ [APP] Login fallido: {}", e);
            }
            if let Some(app) = weak.upgrade() {
                app.schedule_render();
            }
        });
        self.schedule_render();
    }

    fn collection_action<R: Resource>(
        self: &Rc<Self>,
        sync: &ResourceSynchronizer<R>,
        action: &str,
        id: Option<ItemId>,
    ) {
        match (action, id) {
            ("new", _) => sync.open_create(),
            ("edit", Some(id)) => {
                if let Err(e) = sync.open_edit(&id) {
                    log::warn!("⚠️ [APP] No se pudo editar {}: {}", id, e);
                }
            }
            ("delete", Some(id)) => sync.request_delete(id),
            ("cancel", _) => sync.cancel_delete(),
            ("close-form", _) => sync.close_form(),
            ("confirm", _) => {
                let sync = sync.clone();
                self.spawn(async move { sync.confirm_delete().await.map(|_| ()) });
            }
            _ => {}
        }
        self.schedule_render();
    }

    fn submit_collection<R: Resource>(self: &Rc<Self>, sync: &ResourceSynchronizer<R>) {
        let sync = sync.clone();
        self.spawn(async move { sync.submit_form().await.map(|_| ()) });
    }

    fn settings_action(self: &Rc<Self>, settings: &SettingsViewModel, action: &str) {
        match action {
            "confirm-settings" => self.ui.borrow_mut().confirming_settings = true,
            "cancel" => {
                if !settings.is_saving() {
                    self.ui.borrow_mut().confirming_settings = false;
                }
            }
            "confirm" => {
                let settings = settings.clone();
                let weak = Rc::downgrade(self);
                self.spawn(async move {
                    let result = settings.save().await;
                    if let Some(app) = weak.upgrade() {
                        app.ui.borrow_mut().confirming_settings = false;
                    }
                    result
                });
            }
            _ => return,
        }
        self.schedule_render();
    }

    /// Pedir los datos de la ruta recién entrada
    fn load_route(self: &Rc<Self>, route: &Route) {
        let Ok(pages) = &self.pages else {
            return;
        };
        match route {
            Route::Products => {
                let sync = pages.products.clone();
                self.spawn(async move { sync.fetch_all().await.map(|_| ()) });
            }
            Route::Management => {
                let sync = pages.stores.clone();
                self.spawn(async move { sync.fetch_all().await.map(|_| ()) });
            }
            Route::Store(id) => {
                // Nombre y coordenadas salen de la colección de almacenes
                if pages.stores.find(id).is_none() {
                    let sync = pages.stores.clone();
                    self.spawn(async move { sync.fetch_all().await.map(|_| ()) });
                }
                let vm = pages.warehouse.clone();
                let id = id.clone();
                self.spawn(async move { vm.load_store(&id).await.map(|_| ()) });
            }
            Route::VirtualWarehouse => {
                let vm = pages.warehouse.clone();
                self.spawn(async move { vm.load_virtual().await.map(|_| ()) });
            }
            Route::Settings => {
                let vm = pages.settings.clone();
                self.spawn(async move { vm.load().await.map(|_| ()) });
            }
            _ => {}
        }
    }

    fn spawn<F>(self: &Rc<Self>, task: F)
    where
        F: Future<Output = Result<(), AppError>> + 'static,
    {
        let weak = Rc::downgrade(self);
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = task.await {
                if let Some(app) = weak.upgrade() {
                    app.report(e);
                }
            }
        });
    }

    /// Los errores ya viven en el estado de cada página; aquí solo se registran
    fn report(self: &Rc<Self>, error: AppError) {
        match error {
            AppError::Unauthenticated => {
                log::warn!("🔒 [APP] Sin sesión activa, redirigiendo a login");
                HashNavigator.navigate(&Route::Login);
            }
            AppError::SaveInProgress | AppError::Validation { .. } => {
                log::warn!("⚠️ [APP] {}", error);
            }
            other => log::error!("❌ [APP] {}", other),
        }
        self.schedule_render();
    }

    // ========================================================================
    // RENDER
    // ========================================================================

    /// Agrupa varias notificaciones en un solo render
    fn schedule_render(self: &Rc<Self>) {
        if self.render_scheduled.replace(true) {
            return;
        }
        let weak = Rc::downgrade(self);
        Timeout::new(0, move || {
            if let Some(app) = weak.upgrade() {
                app.render_scheduled.set(false);
                app.render();
            }
        })
        .forget();
    }

    pub fn render(self: &Rc<Self>) {
        let route = HashNavigator::current();
        let html = match self.guard.evaluate(self.session.status(), &route) {
            GuardDecision::Waiting => {
                self.ui.borrow_mut().loaded_route = None;
                views::render_loading("Verificando sesión...")
            }
            GuardDecision::Redirect(_) => {
                self.ui.borrow_mut().loaded_route = None;
                views::render_loading("Redirigiendo...")
            }
            GuardDecision::Render(route) => {
                self.enter_route(&route);
                if let Some(document) = dom::document() {
                    document.set_title(&route.title());
                }
                self.render_route(&route)
            }
        };

        let focused = dom::focused_id();
        dom::set_inner_html(&self.root, &html);
        if let Some(id) = focused {
            dom::restore_focus(&id);
        }
    }

    fn enter_route(self: &Rc<Self>, route: &Route) {
        let entered = {
            let mut ui = self.ui.borrow_mut();
            if ui.loaded_route.as_ref() == Some(route) {
                false
            } else {
                ui.loaded_route = Some(route.clone());
                ui.filter.clear();
                ui.confirming_settings = false;
                true
            }
        };
        if entered {
            self.load_route(route);
        }
    }

    fn render_route(&self, route: &Route) -> String {
        if *route == Route::Login {
            let ui = self.ui.borrow();
            return views::render_login(
                &ui.login_email,
                self.session.is_signing_in(),
                self.session.last_error().as_ref(),
            );
        }

        let session = self.session.session();
        let content = match route {
            Route::Home => session.as_ref().map(views::render_home).unwrap_or_default(),
            Route::NotFound => views::render_not_found(),
            _ => match &self.pages {
                Ok(pages) => self.render_page(pages, route),
                Err(e) => views::render_error(e),
            },
        };
        match session {
            Some(session) => format!(
                r#"{}<main class="container">{}</main>"#,
                views::render_nav(&session, route),
                content
            ),
            None => content,
        }
    }

    fn render_page(&self, pages: &Pages, route: &Route) -> String {
        let ui = self.ui.borrow();
        match route {
            Route::Products => {
                views::render_collection_page("Productos", &pages.products, &ui.filter, None)
            }
            Route::Management => views::render_collection_page(
                "Almacenes",
                &pages.stores,
                &ui.filter,
                Some("#/almacenes/"),
            ),
            Route::Store(id) => {
                let store = pages.stores.find(id);
                views::render_store(&pages.warehouse, store.as_ref())
            }
            Route::VirtualWarehouse => views::render_virtual_warehouse(&pages.warehouse),
            Route::Settings => views::render_settings(&pages.settings, ui.confirming_settings),
            _ => views::render_not_found(),
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        log::info!("👋 [APP] Desmontando app");
        self.handles.borrow_mut().clear();
        self.subscriptions.borrow_mut().clear();
        self.session.dispose();
    }
}

/// Callback de suscripción que agenda un render mientras la app viva
fn schedule_on<E: 'static>(app: &Weak<App>) -> impl Fn(&E) + 'static {
    let weak = app.clone();
    move |_| {
        if let Some(app) = weak.upgrade() {
            app.schedule_render();
        }
    }
}

fn with_app<F>(app: &Weak<App>, handler: F) -> impl FnMut(Event) + 'static
where
    F: Fn(&Rc<App>, Event) + 'static,
{
    let weak = app.clone();
    move |event| {
        if let Some(app) = weak.upgrade() {
            handler(&app, event);
        }
    }
}

fn input_target(event: &Event) -> Option<HtmlInputElement> {
    event.target()?.dyn_into::<HtmlInputElement>().ok()
}

fn edit_field<R: Resource>(sync: &ResourceSynchronizer<R>, name: &str, value: &str) {
    match name {
        "id" => sync.set_form_id(value),
        _ => sync.set_form_field(name, value),
    }
}
