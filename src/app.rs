//! Screen state and the event plumbing between the UI loop and the backend.
//!
//! Every backend call is spawned on the tokio runtime and reports back as an
//! [`AppEvent`] on an unbounded channel. The draw loop drains that channel
//! between key presses, so a slow request never freezes input.

use std::future::Future;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tracing::{debug, info, warn};

use crate::api_client::{ApiClient, Navigator};
use crate::auth_api::{AuthApi, AuthResponse, SignUpRequest};
use crate::error::ApiError;
use crate::guard::{Route, RouteGuard};
use crate::task::Task;
use crate::task_list::TaskList;
use crate::validation::TaskForm;

#[derive(Debug)]
pub enum AppEvent {
    Navigate(String),
    Authenticated(Result<AuthResponse, ApiError>),
    TasksLoaded(Result<Vec<Task>, ApiError>),
    TaskSaved(Result<Task, ApiError>),
    TaskDeleted(String, Result<(), ApiError>),
}

/// Forced navigation delivered through the app's event channel.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: UnboundedSender<AppEvent>,
}

impl ChannelNavigator {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, path: &str) {
        // The receiver only goes away on shutdown.
        let _ = self.tx.send(AppEvent::Navigate(path.to_string()));
    }
}

pub fn event_channel() -> (UnboundedSender<AppEvent>, UnboundedReceiver<AppEvent>) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub password: String,
    pub focus: usize,
    pub error: Option<String>,
}

impl Credentials {
    fn field_mut(&mut self, route: Route) -> &mut String {
        match (route, self.focus) {
            (Route::SignUp, 0) => &mut self.name,
            (Route::SignUp, 1) | (_, 0) => &mut self.email,
            _ => &mut self.password,
        }
    }

    pub fn field_count(route: Route) -> usize {
        if route == Route::SignUp {
            3
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(Task),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Description,
}

#[derive(Debug, Clone)]
pub struct Editor {
    pub mode: EditorMode,
    pub form: TaskForm,
    pub focus: EditorField,
    pub error: Option<String>,
}

impl Editor {
    fn create() -> Self {
        Self {
            mode: EditorMode::Create,
            form: TaskForm::new(),
            focus: EditorField::Title,
            error: None,
        }
    }

    fn edit(task: &Task) -> Self {
        Self {
            mode: EditorMode::Edit(task.clone()),
            form: TaskForm::for_task(task),
            focus: EditorField::Title,
            error: None,
        }
    }
}

pub struct App {
    pub route: Route,
    pub auth_form: Credentials,
    pub tasks: TaskList,
    pub load_state: LoadState,
    pub editor: Option<Editor>,
    pub confirm_delete: Option<String>,
    pub banner: Option<Banner>,
    pub pending: usize,
    pub should_quit: bool,
    guard: RouteGuard,
    client: ApiClient,
    auth: AuthApi,
    runtime: Handle,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
}

impl App {
    /// `tx` must be the sender paired with `rx` and the one the client's
    /// navigator reports through.
    pub fn new(
        client: ApiClient,
        runtime: Handle,
        tx: UnboundedSender<AppEvent>,
        rx: UnboundedReceiver<AppEvent>,
    ) -> Self {
        let guard = RouteGuard::new(client.credentials().clone());
        let auth = AuthApi::new(client.clone());
        Self {
            route: Route::SignIn,
            auth_form: Credentials::default(),
            tasks: TaskList::new(),
            load_state: LoadState::Idle,
            editor: None,
            confirm_delete: None,
            banner: None,
            pending: 0,
            should_quit: false,
            guard,
            client,
            auth,
            runtime,
            tx,
            rx,
        }
    }

    /// Runs `path` through the route guard and switches to the screen it lands on.
    pub fn navigate(&mut self, path: &str) {
        let route = self.guard.resolve(path);
        debug!("Navigate {path} -> {}", route.path());
        let entering_dashboard = route == Route::Dashboard && self.route != Route::Dashboard;
        if route != self.route {
            self.auth_form = Credentials::default();
            self.editor = None;
            self.confirm_delete = None;
        }
        if route != Route::Dashboard {
            self.tasks = TaskList::new();
            self.load_state = LoadState::Idle;
        }
        self.route = route;
        if entering_dashboard {
            self.load_tasks();
        }
    }

    fn spawn<F>(&mut self, call: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(call.await);
        });
    }

    pub fn load_tasks(&mut self) {
        self.load_state = LoadState::Loading;
        let client = self.client.clone();
        self.spawn(async move { AppEvent::TasksLoaded(client.list_tasks().await) });
    }

    /// Applies every event that has arrived since the last frame.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        if !matches!(event, AppEvent::Navigate(_)) {
            self.pending = self.pending.saturating_sub(1);
        }
        match event {
            AppEvent::Navigate(path) => self.navigate(&path),
            AppEvent::Authenticated(Ok(auth)) => {
                let who = auth
                    .user
                    .map(|u| u.name.filter(|n| !n.is_empty()).unwrap_or(u.email));
                info!("Authenticated as {}", who.as_deref().unwrap_or("unknown user"));
                self.banner = who.map(|name| Banner {
                    kind: BannerKind::Info,
                    message: format!("Signed in as {name}"),
                });
                self.navigate(Route::Dashboard.path());
            }
            AppEvent::Authenticated(Err(err)) => {
                self.auth_form.error = Some(err.to_string());
            }
            AppEvent::TasksLoaded(Ok(tasks)) if self.route == Route::Dashboard => {
                self.tasks.replace_all(tasks);
                self.load_state = LoadState::Loaded;
            }
            AppEvent::TasksLoaded(Err(err)) if self.route == Route::Dashboard => {
                self.load_state = LoadState::Failed(err.to_string());
                self.report(err);
            }
            // The 401 redirect is queued ahead of the failed load.
            AppEvent::TasksLoaded(Err(ApiError::Unauthorized)) => {
                self.report(ApiError::Unauthorized);
            }
            AppEvent::TasksLoaded(_) => {
                debug!("Dropping task list that arrived after leaving the dashboard");
            }
            AppEvent::TaskSaved(Ok(task)) => {
                self.editor = None;
                self.tasks.upsert(task);
            }
            AppEvent::TaskSaved(Err(err)) => {
                let inline = !matches!(err, ApiError::Unauthorized);
                match self.editor.as_mut() {
                    Some(editor) if inline => editor.error = Some(err.to_string()),
                    _ => self.report(err),
                }
            }
            AppEvent::TaskDeleted(task_id, Ok(())) => {
                self.tasks.remove(&task_id);
            }
            AppEvent::TaskDeleted(_, Err(err)) => self.report(err),
        }
    }

    fn report(&mut self, err: ApiError) {
        warn!("{err}");
        let message = match err {
            ApiError::Unauthorized => "Session expired, please sign in again".to_string(),
            other => other.to_string(),
        };
        self.banner = Some(Banner {
            kind: BannerKind::Error,
            message,
        });
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.route {
            Route::SignIn | Route::SignUp => self.on_auth_key(key),
            Route::Dashboard => {
                if self.confirm_delete.is_some() {
                    self.on_confirm_key(key);
                } else if self.editor.is_some() {
                    self.on_editor_key(key);
                } else {
                    self.on_list_key(key);
                }
            }
        }
    }

    fn on_auth_key(&mut self, key: KeyEvent) {
        let route = self.route;
        let fields = Credentials::field_count(route);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(2) => {
                let other = if route == Route::SignIn {
                    Route::SignUp
                } else {
                    Route::SignIn
                };
                self.navigate(other.path());
            }
            KeyCode::Tab | KeyCode::Down => {
                self.auth_form.focus = (self.auth_form.focus + 1) % fields;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.auth_form.focus = (self.auth_form.focus + fields - 1) % fields;
            }
            KeyCode::Backspace => {
                self.auth_form.field_mut(route).pop();
            }
            KeyCode::Char(c) => self.auth_form.field_mut(route).push(c),
            KeyCode::Enter => self.submit_auth(),
            _ => {}
        }
    }

    fn submit_auth(&mut self) {
        let email = self.auth_form.email.trim().to_string();
        let password = self.auth_form.password.clone();
        if email.is_empty() || password.is_empty() {
            self.auth_form.error = Some("Email and password are required".to_string());
            return;
        }
        self.auth_form.error = None;
        let auth = self.auth.clone();
        if self.route == Route::SignUp {
            let name = self.auth_form.name.trim();
            let request = SignUpRequest {
                email,
                password,
                name: (!name.is_empty()).then(|| name.to_string()),
            };
            self.spawn(async move { AppEvent::Authenticated(auth.sign_up(&request).await) });
        } else {
            self.spawn(async move { AppEvent::Authenticated(auth.sign_in(&email, &password).await) });
        }
    }

    fn on_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.tasks.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.tasks.select_previous(),
            KeyCode::Char('f') | KeyCode::Tab => self.tasks.set_filter(self.tasks.filter.next()),
            KeyCode::Char('r') => {
                self.banner = None;
                self.load_tasks();
            }
            KeyCode::Char('n') | KeyCode::Char('a') => self.editor = Some(Editor::create()),
            KeyCode::Char('e') => {
                if let Some(task) = self.tasks.selected_task() {
                    self.editor = Some(Editor::edit(task));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                self.confirm_delete = self.tasks.selected_task().map(|t| t.id.clone());
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Char('s') => {
                if let Err(err) = self.auth.sign_out() {
                    self.report(err);
                }
            }
            _ => {}
        }
    }

    fn toggle_selected(&mut self) {
        let Some(task_id) = self.tasks.selected_task().map(|t| t.id.clone()) else {
            return;
        };
        let client = self.client.clone();
        self.spawn(async move { AppEvent::TaskSaved(client.toggle_task_completion(&task_id).await) });
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(task_id) = self.confirm_delete.take() {
                    let client = self.client.clone();
                    self.spawn(async move {
                        let result = client.delete_task(&task_id).await;
                        AppEvent::TaskDeleted(task_id, result)
                    });
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => self.confirm_delete = None,
            _ => {}
        }
    }

    fn on_editor_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.editor = None,
            KeyCode::Tab | KeyCode::BackTab => {
                editor.focus = match editor.focus {
                    EditorField::Title => EditorField::Description,
                    EditorField::Description => EditorField::Title,
                };
            }
            KeyCode::Backspace => edit_field(editor, |s| {
                s.pop();
            }),
            KeyCode::Char(c) => edit_field(editor, |s| s.push(c)),
            KeyCode::Enter => self.submit_editor(),
            _ => {}
        }
    }

    fn submit_editor(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        editor.form.revalidate();
        editor.error = None;
        let client = self.client.clone();
        match editor.mode.clone() {
            EditorMode::Create => match editor.form.to_create_request() {
                Ok(request) => {
                    self.spawn(async move { AppEvent::TaskSaved(client.create_task(&request).await) })
                }
                Err(err) => editor.error = Some(err.to_string()),
            },
            EditorMode::Edit(original) => match editor.form.to_update_request(&original) {
                Ok(request) if request.is_empty() => self.editor = None,
                Ok(request) => self.spawn(async move {
                    AppEvent::TaskSaved(client.update_task(&original.id, &request).await)
                }),
                Err(err) => editor.error = Some(err.to_string()),
            },
        }
    }
}

fn edit_field(editor: &mut Editor, change: impl FnOnce(&mut String)) {
    match editor.focus {
        EditorField::Title => {
            let mut title = editor.form.title.clone();
            change(&mut title);
            editor.form.set_title(title);
        }
        EditorField::Description => {
            let mut description = editor.form.description.clone();
            change(&mut description);
            editor.form.set_description(description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{HttpRequest, HttpResponse, HttpTransport};
    use crate::error::TransportError;
    use crate::session::{CredentialStore, MemoryCookieStore};
    use async_trait::async_trait;
    use reqwest::Url;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl HttpTransport for Unreachable {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Other("connection refused".to_string()))
        }
    }

    fn app(store: Arc<MemoryCookieStore>, runtime: &tokio::runtime::Runtime) -> App {
        let (tx, rx) = event_channel();
        let client = ApiClient::new(
            Url::parse("http://localhost:8000").unwrap(),
            Arc::new(Unreachable),
            store,
            Arc::new(ChannelNavigator::new(tx.clone())),
        );
        App::new(client, runtime.handle().clone(), tx, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn signed_out_user_cannot_reach_dashboard() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(Arc::new(MemoryCookieStore::new()), &runtime);
        app.navigate("/dashboard");
        assert_eq!(app.route, Route::SignIn);
        assert_eq!(app.pending, 0);
    }

    #[test]
    fn entering_dashboard_starts_a_load() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(Arc::new(MemoryCookieStore::with_credential("tok")), &runtime);
        app.navigate("/signin");
        assert_eq!(app.route, Route::Dashboard);
        assert_eq!(app.load_state, LoadState::Loading);
        assert_eq!(app.pending, 1);
    }

    #[test]
    fn failed_load_is_reported_with_retry_state() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(Arc::new(MemoryCookieStore::with_credential("tok")), &runtime);
        app.navigate("/dashboard");
        let down = TransportError::Other("down".into());
        app.handle_event(AppEvent::TasksLoaded(Err(ApiError::Network(down))));
        assert_eq!(app.load_state, LoadState::Failed("Network error: down".into()));
        assert_eq!(app.banner.as_ref().map(|b| b.kind), Some(BannerKind::Error));
        assert_eq!(app.pending, 0);
    }

    #[test]
    fn rejected_list_load_explains_the_redirect() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(MemoryCookieStore::with_credential("tok"));
        let mut app = app(store.clone(), &runtime);
        app.navigate("/dashboard");

        // What the client does on 401: clear the slot, queue the redirect, then fail.
        store.remove().unwrap();
        app.handle_event(AppEvent::Navigate("/signin".into()));
        app.handle_event(AppEvent::TasksLoaded(Err(ApiError::Unauthorized)));

        assert_eq!(app.route, Route::SignIn);
        assert_eq!(app.load_state, LoadState::Idle);
        let banner = app.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Session expired, please sign in again");
    }

    #[test]
    fn late_failure_after_sign_out_is_dropped() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(MemoryCookieStore::with_credential("tok"));
        let mut app = app(store.clone(), &runtime);
        app.navigate("/dashboard");
        store.remove().unwrap();
        app.navigate("/signin");

        let down = TransportError::Other("down".into());
        app.handle_event(AppEvent::TasksLoaded(Err(ApiError::Network(down))));
        assert!(app.banner.is_none());
    }

    #[test]
    fn invalid_task_form_never_spawns_a_request() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(Arc::new(MemoryCookieStore::with_credential("tok")), &runtime);
        app.navigate("/dashboard");
        app.handle_event(AppEvent::TasksLoaded(Ok(Vec::new())));

        app.on_key(key(KeyCode::Char('n')));
        app.on_key(key(KeyCode::Char(' ')));
        app.on_key(key(KeyCode::Enter));
        let editor = app.editor.as_ref().unwrap();
        assert_eq!(editor.error.as_deref(), Some("Title is required"));
        assert_eq!(app.pending, 0);
    }

    #[test]
    fn auth_form_requires_email_and_password() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(Arc::new(MemoryCookieStore::new()), &runtime);
        app.navigate("/signin");
        app.on_key(key(KeyCode::Char('a')));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.auth_form.email, "a");
        assert_eq!(
            app.auth_form.error.as_deref(),
            Some("Email and password are required")
        );
        app.on_key(key(KeyCode::F(2)));
        assert_eq!(app.route, Route::SignUp);
        assert!(app.auth_form.email.is_empty());
    }

    #[test]
    fn sign_out_clears_session_and_returns_to_sign_in() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(MemoryCookieStore::with_credential("tok"));
        let mut app = app(store.clone(), &runtime);
        app.navigate("/dashboard");
        app.handle_event(AppEvent::TasksLoaded(Ok(Vec::new())));
        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(store.get(), None);
        app.drain_events();
        assert_eq!(app.route, Route::SignIn);
    }
}
