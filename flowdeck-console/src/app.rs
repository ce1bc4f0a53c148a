//! Application state and event handling
//!
//! The event loop owns one `App`. Key presses mutate it directly; network
//! calls run on spawned tasks and report back as `AppEvent`s over the
//! channel, so view state only ever changes on the loop.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use flowdeck_client::{
    ApiClient, ClientConfig, ClientError, ClientResult, Credentials, DagQuery, DagRunQuery,
    Session, TaskInstanceQuery,
};
use ratatui::widgets::TableState;
use shared::models::role::{
    can_control_tasks, can_modify_dags, can_run_dags, can_view_task_logs,
};
use shared::models::{
    ALL_ACTION_TYPES, ActionLog, ActionType, Dag, DagCollection, DagRun, DagRunClearRequest,
    DagRunCollection, DagRunCreate, DagRunState, TaskInstance, TaskInstanceCollection,
};
use tokio::sync::mpsc;
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler;
use tui_logger::{TuiWidgetEvent, TuiWidgetState};

pub const DAG_PAGE_SIZE: u32 = 10;
pub const LOG_PAGE_SIZE: u32 = 20;

const NO_PERMISSION: &str = "You do not have permission to perform this action.";

const RUN_STATE_FILTERS: [Option<DagRunState>; 5] = [
    None,
    Some(DagRunState::Queued),
    Some(DagRunState::Running),
    Some(DagRunState::Success),
    Some(DagRunState::Failed),
];

const INSTANCE_STATE_FILTERS: [Option<&'static str>; 5] = [
    None,
    Some("queued"),
    Some("running"),
    Some("success"),
    Some("failed"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dags,
    Runs,
    TaskInstances,
    TaskLog,
    ActionLogs,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Editing,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Server,
    #[default]
    Username,
    Password,
}

impl LoginField {
    fn next(self) -> Self {
        match self {
            LoginField::Server => LoginField::Username,
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Server,
        }
    }

    fn prev(self) -> Self {
        match self {
            LoginField::Server => LoginField::Password,
            LoginField::Username => LoginField::Server,
            LoginField::Password => LoginField::Username,
        }
    }
}

/// Active audit-log filter
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum LogFilter {
    #[default]
    All,
    Dag(String),
    Type(ActionType),
}

impl LogFilter {
    pub fn describe(&self) -> String {
        match self {
            LogFilter::All => "all actions".to_string(),
            LogFilter::Dag(dag_id) => format!("dag {}", dag_id),
            LogFilter::Type(action_type) => format!("type {}", action_type),
        }
    }
}

/// Results sent back from spawned network tasks
pub enum AppEvent {
    LoggedIn(Credentials),
    LoginFailed(String),
    Dags(DagCollection),
    DagRefreshed(Dag),
    Runs(DagRunCollection),
    TaskInstances(TaskInstanceCollection),
    ActionLogs { logs: Vec<ActionLog>, total: i64 },
    TaskLog { task_id: String, text: String },
    /// A mutation completed; the message lands on the status line and the
    /// current view refetches
    Mutated(String),
    /// Informational result, status line only
    Status(String),
    Failed(ClientError),
}

pub struct App {
    pub session: Session,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub should_quit: bool,
    pub is_loading: bool,
    pub status: Option<String>,
    pub logger_state: TuiWidgetState,

    // Login form
    pub login_field: LoginField,
    pub server_input: Input,
    pub username_input: Input,
    pub password_input: Input,
    pub login_error: Option<String>,
    pub logging_in: bool,

    // DAG list
    pub dags: Vec<Dag>,
    pub dag_total: i64,
    pub dag_page: u32,
    pub search_input: Input,
    pub active_filter: Option<bool>,
    pub paused_filter: Option<bool>,
    pub dag_table: TableState,

    // Runs of the opened DAG
    pub selected_dag: Option<String>,
    pub runs: Vec<DagRun>,
    pub run_state_filter: Option<DagRunState>,
    pub run_table: TableState,
    pub note_input: Input,

    // Task instances of the opened run
    pub selected_run: Option<String>,
    pub instances: Vec<TaskInstance>,
    pub instance_state_filter: Option<&'static str>,
    pub instance_table: TableState,

    // Task log
    pub task_log_task: Option<String>,
    pub task_log_try: u32,
    pub task_log: String,
    pub task_log_scroll: u16,

    // Audit page
    pub action_logs: Vec<ActionLog>,
    pub log_total: i64,
    pub log_page: u32,
    pub log_filter: LogFilter,
    pub log_table: TableState,

    events: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(config: ClientConfig, events: mpsc::Sender<AppEvent>) -> Self {
        let server_input = Input::new(config.server_url.clone());
        let session = Session::new(config);
        let mut app = Self {
            session,
            screen: Screen::Login,
            input_mode: InputMode::Normal,
            should_quit: false,
            is_loading: false,
            status: None,
            logger_state: TuiWidgetState::new(),
            login_field: LoginField::default(),
            server_input,
            username_input: Input::default(),
            password_input: Input::default(),
            login_error: None,
            logging_in: false,
            dags: Vec::new(),
            dag_total: 0,
            dag_page: 0,
            search_input: Input::default(),
            active_filter: None,
            paused_filter: None,
            dag_table: TableState::default(),
            selected_dag: None,
            runs: Vec::new(),
            run_state_filter: None,
            run_table: TableState::default(),
            note_input: Input::default(),
            selected_run: None,
            instances: Vec::new(),
            instance_state_filter: None,
            instance_table: TableState::default(),
            task_log_task: None,
            task_log_try: 1,
            task_log: String::new(),
            task_log_scroll: 0,
            action_logs: Vec::new(),
            log_total: 0,
            log_page: 0,
            log_filter: LogFilter::All,
            log_table: TableState::default(),
            events,
        };

        if app.session.is_authenticated() {
            tracing::info!(
                "Resuming stored session for {}",
                app.session.username().unwrap_or_default()
            );
            app.screen = Screen::Dags;
            app.refresh_dags();
        }
        app
    }

    // ========== Input Handling ==========

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Login => self.handle_login_key(key),
            Screen::Dags => match self.input_mode {
                InputMode::Normal => self.handle_dags_key(key),
                InputMode::Editing => self.handle_search_key(key),
            },
            Screen::Runs => match self.input_mode {
                InputMode::Normal => self.handle_runs_key(key),
                InputMode::Editing => self.handle_note_key(key),
            },
            Screen::TaskInstances => self.handle_instances_key(key),
            Screen::TaskLog => self.handle_task_log_key(key),
            Screen::ActionLogs => self.handle_action_logs_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Down => self.login_field = self.login_field.next(),
            KeyCode::BackTab | KeyCode::Up => self.login_field = self.login_field.prev(),
            KeyCode::Enter => self.submit_login(),
            _ => {
                let input = match self.login_field {
                    LoginField::Server => &mut self.server_input,
                    LoginField::Username => &mut self.username_input,
                    LoginField::Password => &mut self.password_input,
                };
                input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_dags_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                move_selection(&mut self.dag_table, self.dags.len(), 1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_selection(&mut self.dag_table, self.dags.len(), -1)
            }
            KeyCode::Right => self.next_dag_page(),
            KeyCode::Left => self.prev_dag_page(),
            KeyCode::Char('/') => self.input_mode = InputMode::Editing,
            KeyCode::Char('a') => self.cycle_active_filter(),
            KeyCode::Char('f') => self.cycle_paused_filter(),
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('D') => self.delete_dag(),
            KeyCode::Char('t') => {
                if let Some(dag_id) = self.selected_dag_record().map(|d| d.dag_id.clone()) {
                    self.trigger_dag(dag_id);
                }
            }
            KeyCode::Char('i') => self.inspect_dag(),
            KeyCode::Char('A') => self.open_action_logs(),
            KeyCode::Char('r') => self.refresh_dags(),
            KeyCode::Char('o') => self.logout(),
            KeyCode::Enter => self.open_runs(),
            KeyCode::PageUp => self.logger_state.transition(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => self.logger_state.transition(TuiWidgetEvent::NextPageKey),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.dag_page = 0;
                self.refresh_dags();
            }
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {
                self.search_input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_runs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.screen = Screen::Dags,
            KeyCode::Char('j') | KeyCode::Down => {
                move_selection(&mut self.run_table, self.runs.len(), 1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_selection(&mut self.run_table, self.runs.len(), -1)
            }
            KeyCode::Char('s') => self.cycle_run_state_filter(),
            KeyCode::Char('t') => {
                if let Some(dag_id) = self.selected_dag.clone() {
                    self.trigger_dag(dag_id);
                }
            }
            KeyCode::Char('c') => self.clear_run(),
            KeyCode::Char('m') => self.mark_run(DagRunState::Success),
            KeyCode::Char('M') => self.mark_run(DagRunState::Failed),
            KeyCode::Char('u') => self.mark_run(DagRunState::Queued),
            KeyCode::Char('N') => self.start_note_edit(),
            KeyCode::Char('D') => self.delete_run(),
            KeyCode::Char('e') => self.fetch_dataset_events(),
            KeyCode::Char('i') => self.inspect_run(),
            KeyCode::Char('r') => self.refresh_runs(),
            KeyCode::Enter => self.open_instances(),
            KeyCode::PageUp => self.logger_state.transition(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => self.logger_state.transition(TuiWidgetEvent::NextPageKey),
            _ => {}
        }
    }

    fn handle_note_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.submit_note();
            }
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {
                self.note_input.handle_event(&Event::Key(key));
            }
        }
    }

    fn handle_instances_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.screen = Screen::Runs,
            KeyCode::Char('j') | KeyCode::Down => {
                move_selection(&mut self.instance_table, self.instances.len(), 1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_selection(&mut self.instance_table, self.instances.len(), -1)
            }
            KeyCode::Char('s') => self.cycle_instance_state_filter(),
            KeyCode::Char('v') | KeyCode::Enter => self.open_task_log(),
            KeyCode::Char('i') => self.inspect_instance(),
            KeyCode::Char('r') => self.refresh_instances(),
            KeyCode::PageUp => self.logger_state.transition(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => self.logger_state.transition(TuiWidgetEvent::NextPageKey),
            _ => {}
        }
    }

    fn handle_task_log_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.screen = Screen::TaskInstances,
            KeyCode::Char('j') | KeyCode::Down => {
                self.task_log_scroll = self.task_log_scroll.saturating_add(1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.task_log_scroll = self.task_log_scroll.saturating_sub(1)
            }
            KeyCode::Char('[') => self.adjust_try_number(-1),
            KeyCode::Char(']') => self.adjust_try_number(1),
            KeyCode::Char('r') => self.fetch_task_log(),
            _ => {}
        }
    }

    fn handle_action_logs_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.screen = Screen::Dags,
            KeyCode::Char('j') | KeyCode::Down => {
                move_selection(&mut self.log_table, self.action_logs.len(), 1)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                move_selection(&mut self.log_table, self.action_logs.len(), -1)
            }
            KeyCode::Right => self.next_log_page(),
            KeyCode::Left => self.prev_log_page(),
            KeyCode::Char('t') => self.cycle_type_filter(),
            KeyCode::Char('d') => self.toggle_dag_log_filter(),
            KeyCode::Char('r') => self.refresh_action_logs(),
            KeyCode::PageUp => self.logger_state.transition(TuiWidgetEvent::PrevPageKey),
            KeyCode::PageDown => self.logger_state.transition(TuiWidgetEvent::NextPageKey),
            _ => {}
        }
    }

    // ========== Background Results ==========

    pub fn on_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::LoggedIn(credentials) => {
                self.logging_in = false;
                if let Err(e) = self.session.adopt(&credentials) {
                    self.login_error = Some(e.user_message());
                    return;
                }
                self.login_error = None;
                self.password_input.reset();
                self.status = Some(format!("Signed in as {}", credentials.username));
                self.screen = Screen::Dags;
                self.refresh_dags();
            }
            AppEvent::LoginFailed(message) => {
                self.logging_in = false;
                self.login_error = Some(message);
            }
            AppEvent::Dags(collection) => {
                self.is_loading = false;
                self.dags = collection.dags;
                self.dag_total = collection.total_entries;
                reselect(&mut self.dag_table, self.dags.len());
            }
            AppEvent::DagRefreshed(dag) => {
                if let Some(existing) = self.dags.iter_mut().find(|d| d.dag_id == dag.dag_id) {
                    *existing = dag;
                }
            }
            AppEvent::Runs(collection) => {
                self.is_loading = false;
                self.runs = collection.dag_runs;
                reselect(&mut self.run_table, self.runs.len());
            }
            AppEvent::TaskInstances(collection) => {
                self.is_loading = false;
                self.instances = collection.task_instances;
                reselect(&mut self.instance_table, self.instances.len());
            }
            AppEvent::ActionLogs { logs, total } => {
                self.is_loading = false;
                self.action_logs = logs;
                self.log_total = total;
                reselect(&mut self.log_table, self.action_logs.len());
            }
            AppEvent::TaskLog { task_id, text } => {
                self.is_loading = false;
                if self.task_log_task.as_deref() == Some(task_id.as_str()) {
                    self.task_log = text;
                    self.task_log_scroll = 0;
                }
            }
            AppEvent::Mutated(message) => {
                self.is_loading = false;
                self.status = Some(message);
                self.refresh_current();
            }
            AppEvent::Status(message) => {
                self.is_loading = false;
                self.status = Some(message);
            }
            AppEvent::Failed(e) => {
                self.is_loading = false;
                self.fail(e);
            }
        }
    }

    fn fail(&mut self, e: ClientError) {
        match e {
            ClientError::Unauthorized => {
                tracing::warn!("Session expired, signing out");
                self.session.logout();
                self.password_input.reset();
                self.login_error = Some(e.user_message());
                self.input_mode = InputMode::Normal;
                self.screen = Screen::Login;
            }
            other => self.status = Some(other.user_message()),
        }
    }

    fn deny(&mut self) {
        self.status = Some(NO_PERMISSION.to_string());
    }

    /// Clone of the bound client for a spawned task. A failure here means
    /// no usable credentials; the session has already been torn down.
    fn api(&mut self) -> Option<ApiClient> {
        match self.session.client() {
            Ok(api) => Some(api.clone()),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    // ========== Auth ==========

    fn submit_login(&mut self) {
        if self.logging_in {
            return;
        }
        let username = self.username_input.value().trim().to_string();
        let password = self.password_input.value().to_string();
        let mut server_url = self.server_input.value().trim().trim_end_matches('/').to_string();
        if server_url.is_empty() {
            server_url = self.session.config().server_url.clone();
        }
        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password are required".to_string());
            return;
        }

        self.logging_in = true;
        self.login_error = None;
        let timeout = self.session.config().timeout;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let event = match Session::authenticate(&username, &password, &server_url, timeout)
                .await
            {
                Ok(credentials) => AppEvent::LoggedIn(credentials),
                Err(e) => AppEvent::LoginFailed(login_error_message(&e)),
            };
            tx.send(event).await.ok();
        });
    }

    fn logout(&mut self) {
        self.session.logout();
        self.password_input.reset();
        self.login_error = None;
        self.status = None;
        self.screen = Screen::Login;
    }

    // ========== DAG List ==========

    fn refresh_dags(&mut self) {
        let Some(api) = self.api() else { return };
        let mut query = DagQuery::page(self.dag_page, DAG_PAGE_SIZE);
        let search = self.search_input.value().trim();
        if !search.is_empty() {
            query = query.with_search(search);
        }
        if let Some(active) = self.active_filter {
            query = query.with_active(active);
        }
        if let Some(paused) = self.paused_filter {
            query = query.with_paused(paused);
        }
        self.is_loading = true;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_dags(&query).await.map(AppEvent::Dags);
            send_result(tx, result).await;
        });
    }

    fn next_dag_page(&mut self) {
        if i64::from((self.dag_page + 1) * DAG_PAGE_SIZE) < self.dag_total {
            self.dag_page += 1;
            self.refresh_dags();
        }
    }

    fn prev_dag_page(&mut self) {
        if self.dag_page > 0 {
            self.dag_page -= 1;
            self.refresh_dags();
        }
    }

    fn cycle_active_filter(&mut self) {
        self.active_filter = match self.active_filter {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
        self.dag_page = 0;
        self.refresh_dags();
    }

    fn cycle_paused_filter(&mut self) {
        self.paused_filter = match self.paused_filter {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
        self.dag_page = 0;
        self.refresh_dags();
    }

    fn toggle_pause(&mut self) {
        if !can_modify_dags(self.session.role()) {
            self.deny();
            return;
        }
        let Some((dag_id, is_paused)) = self
            .selected_dag_record()
            .map(|d| (d.dag_id.clone(), d.is_paused))
        else {
            return;
        };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.set_dag_paused(&dag_id, !is_paused).await.map(|dag| {
                AppEvent::Mutated(format!(
                    "{} {}",
                    if dag.is_paused { "Paused" } else { "Unpaused" },
                    dag.dag_id
                ))
            });
            send_result(tx, result).await;
        });
    }

    fn delete_dag(&mut self) {
        if !can_modify_dags(self.session.role()) {
            self.deny();
            return;
        }
        let Some(dag_id) = self.selected_dag_record().map(|d| d.dag_id.clone()) else {
            return;
        };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .delete_dag(&dag_id)
                .await
                .map(|_| AppEvent::Mutated(format!("Deleted {}", dag_id)));
            send_result(tx, result).await;
        });
    }

    fn trigger_dag(&mut self, dag_id: String) {
        if !can_run_dags(self.session.role()) {
            self.deny();
            return;
        }
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let create = DagRunCreate::default();
            let result = api.trigger_dag_run(&dag_id, &create).await.map(|run| {
                AppEvent::Mutated(format!("Triggered {} ({})", run.dag_id, run.dag_run_id))
            });
            send_result(tx, result).await;
        });
    }

    fn inspect_dag(&mut self) {
        let Some(dag_id) = self.selected_dag_record().map(|d| d.dag_id.clone()) else {
            return;
        };
        let Some(api) = self.api() else { return };
        self.is_loading = true;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result: ClientResult<AppEvent> = async {
                let detail = api.get_dag_details(&dag_id).await?;
                let tasks = api.get_dag_tasks(&dag_id).await?;
                for task in &tasks.tasks {
                    tracing::info!(
                        "Task {} ({})",
                        task.task_id,
                        task.class_ref
                            .as_ref()
                            .and_then(|c| c.class_name.as_deref())
                            .unwrap_or("unknown operator")
                    );
                }
                Ok(AppEvent::Status(format!(
                    "{}: {} tasks, next run {}, max active {}",
                    dag_id,
                    tasks.tasks.len(),
                    detail.next_dagrun.as_deref().unwrap_or("-"),
                    detail
                        .max_active_runs
                        .map_or("-".to_string(), |n| n.to_string()),
                )))
            }
            .await;
            send_result(tx, result).await;
        });
    }

    fn open_runs(&mut self) {
        let Some(dag_id) = self.selected_dag_record().map(|d| d.dag_id.clone()) else {
            return;
        };
        self.selected_dag = Some(dag_id.clone());
        self.runs.clear();
        self.run_table.select(None);
        self.run_state_filter = None;
        self.screen = Screen::Runs;
        self.refresh_runs();

        // Refetch the DAG itself so the list row is fresh when we return
        if let Some(api) = self.api() {
            let tx = self.events.clone();
            tokio::spawn(async move {
                let result = api.get_dag(&dag_id).await.map(AppEvent::DagRefreshed);
                send_result(tx, result).await;
            });
        }
    }

    fn open_action_logs(&mut self) {
        self.screen = Screen::ActionLogs;
        self.log_filter = LogFilter::All;
        self.log_page = 0;
        self.log_table.select(None);
        self.refresh_action_logs();
    }

    // ========== Runs ==========

    fn refresh_runs(&mut self) {
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let query = DagRunQuery {
            state: self.run_state_filter,
            dag_run_id: None,
        };
        self.is_loading = true;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.list_dag_runs(&dag_id, &query).await.map(AppEvent::Runs);
            send_result(tx, result).await;
        });
    }

    fn cycle_run_state_filter(&mut self) {
        let i = RUN_STATE_FILTERS
            .iter()
            .position(|s| *s == self.run_state_filter)
            .unwrap_or(0);
        self.run_state_filter = RUN_STATE_FILTERS[(i + 1) % RUN_STATE_FILTERS.len()];
        self.refresh_runs();
    }

    fn clear_run(&mut self) {
        if !can_control_tasks(self.session.role()) {
            self.deny();
            return;
        }
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let request = DagRunClearRequest {
                dry_run: false,
                reset_dag_runs: Some(true),
                task_ids: None,
            };
            let result = api
                .clear_dag_run(&dag_id, &run_id, &request)
                .await
                .map(|run| AppEvent::Mutated(format!("Cleared {}", run.dag_run_id)));
            send_result(tx, result).await;
        });
    }

    fn mark_run(&mut self, state: DagRunState) {
        if !can_control_tasks(self.session.role()) {
            self.deny();
            return;
        }
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .update_dag_run_state(&dag_id, &run_id, state)
                .await
                .map(|run| AppEvent::Mutated(format!("Marked {} as {}", run.dag_run_id, state)));
            send_result(tx, result).await;
        });
    }

    fn delete_run(&mut self) {
        if !can_modify_dags(self.session.role()) {
            self.deny();
            return;
        }
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .delete_dag_run(&dag_id, &run_id)
                .await
                .map(|_| AppEvent::Mutated(format!("Deleted run {}", run_id)));
            send_result(tx, result).await;
        });
    }

    fn start_note_edit(&mut self) {
        if !can_run_dags(self.session.role()) {
            self.deny();
            return;
        }
        let Some(note) = self
            .selected_run_record()
            .map(|r| r.note.clone().unwrap_or_default())
        else {
            return;
        };
        self.note_input = Input::new(note);
        self.input_mode = InputMode::Editing;
    }

    fn submit_note(&mut self) {
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let value = self.note_input.value().trim().to_string();
        let note = if value.is_empty() { None } else { Some(value) };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .set_dag_run_note(&dag_id, &run_id, note)
                .await
                .map(|run| AppEvent::Mutated(format!("Updated note on {}", run.dag_run_id)));
            send_result(tx, result).await;
        });
    }

    fn fetch_dataset_events(&mut self) {
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .get_upstream_dataset_events(&dag_id, &run_id)
                .await
                .map(|events| {
                    for event in &events.dataset_events {
                        tracing::info!(
                            "Dataset event {} from {} at {}",
                            event.dataset_uri.as_deref().unwrap_or("-"),
                            event.source_dag_id.as_deref().unwrap_or("-"),
                            event.timestamp.as_deref().unwrap_or("-")
                        );
                    }
                    AppEvent::Status(format!(
                        "{} upstream dataset events for {}",
                        events.dataset_events.len(),
                        run_id
                    ))
                });
            send_result(tx, result).await;
        });
    }

    fn inspect_run(&mut self) {
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        let Some(dag_id) = self.selected_dag.clone() else { return };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api.get_dag_run(&dag_id, &run_id).await.map(|run| {
                AppEvent::Status(format!(
                    "{}: {}, started {}, note {}",
                    run.dag_run_id,
                    run.state.map_or("unknown".to_string(), |s| s.to_string()),
                    run.start_date.as_deref().unwrap_or("-"),
                    run.note.as_deref().unwrap_or("-"),
                ))
            });
            send_result(tx, result).await;
        });
    }

    fn open_instances(&mut self) {
        let Some(run_id) = self.selected_run_record().map(|r| r.dag_run_id.clone()) else {
            return;
        };
        self.selected_run = Some(run_id);
        self.instances.clear();
        self.instance_table.select(None);
        self.instance_state_filter = None;
        self.screen = Screen::TaskInstances;
        self.refresh_instances();
    }

    // ========== Task Instances ==========

    fn refresh_instances(&mut self) {
        let (Some(dag_id), Some(run_id)) = (self.selected_dag.clone(), self.selected_run.clone())
        else {
            return;
        };
        let Some(api) = self.api() else { return };
        let query = TaskInstanceQuery {
            state: self.instance_state_filter.map(str::to_string),
        };
        self.is_loading = true;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .list_task_instances(&dag_id, &run_id, &query)
                .await
                .map(AppEvent::TaskInstances);
            send_result(tx, result).await;
        });
    }

    fn cycle_instance_state_filter(&mut self) {
        let i = INSTANCE_STATE_FILTERS
            .iter()
            .position(|s| *s == self.instance_state_filter)
            .unwrap_or(0);
        self.instance_state_filter = INSTANCE_STATE_FILTERS[(i + 1) % INSTANCE_STATE_FILTERS.len()];
        self.refresh_instances();
    }

    fn inspect_instance(&mut self) {
        let (Some(dag_id), Some(run_id)) = (self.selected_dag.clone(), self.selected_run.clone())
        else {
            return;
        };
        let Some(task_id) = self.selected_instance().map(|t| t.task_id.clone()) else {
            return;
        };
        let Some(api) = self.api() else { return };
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .get_task_instance(&dag_id, &run_id, &task_id)
                .await
                .map(|instance| {
                    AppEvent::Status(format!(
                        "{}: {} (try {}, {} on {})",
                        instance.task_id,
                        instance.state.as_deref().unwrap_or("none"),
                        instance.try_number.unwrap_or(0),
                        instance
                            .duration
                            .map_or("-".to_string(), |d| format!("{:.1}s", d)),
                        instance.hostname.as_deref().unwrap_or("-"),
                    ))
                });
            send_result(tx, result).await;
        });
    }

    // ========== Task Log ==========

    fn open_task_log(&mut self) {
        if !can_view_task_logs(self.session.role()) {
            self.deny();
            return;
        }
        let Some((task_id, try_number)) = self
            .selected_instance()
            .map(|t| (t.task_id.clone(), t.try_number.unwrap_or(1).max(1) as u32))
        else {
            return;
        };
        self.task_log_task = Some(task_id);
        self.task_log_try = try_number;
        self.task_log.clear();
        self.task_log_scroll = 0;
        self.screen = Screen::TaskLog;
        self.fetch_task_log();
    }

    fn fetch_task_log(&mut self) {
        let (Some(dag_id), Some(run_id), Some(task_id)) = (
            self.selected_dag.clone(),
            self.selected_run.clone(),
            self.task_log_task.clone(),
        ) else {
            return;
        };
        let try_number = self.task_log_try;
        let Some(api) = self.api() else { return };
        self.is_loading = true;
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = api
                .get_task_log(&dag_id, &run_id, &task_id, try_number)
                .await
                .map(|text| AppEvent::TaskLog { task_id, text });
            send_result(tx, result).await;
        });
    }

    fn adjust_try_number(&mut self, delta: i32) {
        let next = self.task_log_try.saturating_add_signed(delta).max(1);
        if next != self.task_log_try {
            self.task_log_try = next;
            self.fetch_task_log();
        }
    }

    // ========== Audit Logs ==========

    fn refresh_action_logs(&mut self) {
        let Some(api) = self.api() else { return };
        self.is_loading = true;
        let tx = self.events.clone();
        match self.log_filter.clone() {
            LogFilter::All => {
                let page = self.log_page;
                tokio::spawn(async move {
                    let result = api.get_action_logs(page, LOG_PAGE_SIZE).await.map(|p| {
                        AppEvent::ActionLogs {
                            logs: p.logs,
                            total: p.total_count,
                        }
                    });
                    send_result(tx, result).await;
                });
            }
            LogFilter::Dag(dag_id) => {
                tokio::spawn(async move {
                    let result = api.get_action_logs_for_dag(&dag_id).await.map(|logs| {
                        let total = logs.len() as i64;
                        AppEvent::ActionLogs { logs, total }
                    });
                    send_result(tx, result).await;
                });
            }
            LogFilter::Type(action_type) => {
                tokio::spawn(async move {
                    let result = api.get_action_logs_by_type(action_type).await.map(|logs| {
                        let total = logs.len() as i64;
                        AppEvent::ActionLogs { logs, total }
                    });
                    send_result(tx, result).await;
                });
            }
        }
    }

    fn next_log_page(&mut self) {
        if self.log_filter != LogFilter::All {
            return;
        }
        if i64::from((self.log_page + 1) * LOG_PAGE_SIZE) < self.log_total {
            self.log_page += 1;
            self.refresh_action_logs();
        }
    }

    fn prev_log_page(&mut self) {
        if self.log_filter != LogFilter::All {
            return;
        }
        if self.log_page > 0 {
            self.log_page -= 1;
            self.refresh_action_logs();
        }
    }

    fn cycle_type_filter(&mut self) {
        self.log_filter = match &self.log_filter {
            LogFilter::Type(current) => {
                match ALL_ACTION_TYPES.iter().position(|t| t == current) {
                    Some(i) if i + 1 < ALL_ACTION_TYPES.len() => {
                        LogFilter::Type(ALL_ACTION_TYPES[i + 1])
                    }
                    _ => LogFilter::All,
                }
            }
            _ => LogFilter::Type(ALL_ACTION_TYPES[0]),
        };
        self.log_page = 0;
        self.refresh_action_logs();
    }

    fn toggle_dag_log_filter(&mut self) {
        match &self.log_filter {
            LogFilter::Dag(_) => self.log_filter = LogFilter::All,
            _ => {
                let dag_id = self
                    .selected_dag
                    .clone()
                    .or_else(|| self.selected_dag_record().map(|d| d.dag_id.clone()));
                match dag_id {
                    Some(dag_id) => self.log_filter = LogFilter::Dag(dag_id),
                    None => {
                        self.status = Some("Select a DAG first to filter by it".to_string());
                        return;
                    }
                }
            }
        }
        self.log_page = 0;
        self.refresh_action_logs();
    }

    // ========== Shared Helpers ==========

    fn refresh_current(&mut self) {
        match self.screen {
            Screen::Dags => self.refresh_dags(),
            Screen::Runs => self.refresh_runs(),
            Screen::TaskInstances => self.refresh_instances(),
            Screen::ActionLogs => self.refresh_action_logs(),
            Screen::Login | Screen::TaskLog => {}
        }
    }

    pub fn selected_dag_record(&self) -> Option<&Dag> {
        self.dag_table.selected().and_then(|i| self.dags.get(i))
    }

    pub fn selected_run_record(&self) -> Option<&DagRun> {
        self.run_table.selected().and_then(|i| self.runs.get(i))
    }

    pub fn selected_instance(&self) -> Option<&TaskInstance> {
        self.instance_table
            .selected()
            .and_then(|i| self.instances.get(i))
    }
}

async fn send_result(tx: mpsc::Sender<AppEvent>, result: ClientResult<AppEvent>) {
    let event = match result {
        Ok(event) => event,
        Err(e) => AppEvent::Failed(e),
    };
    tx.send(event).await.ok();
}

fn move_selection(state: &mut TableState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(len as isize) as usize;
    state.select(Some(next));
}

fn reselect(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        let keep = state.selected().map_or(0, |i| i.min(len - 1));
        state.select(Some(keep));
    }
}

fn login_error_message(e: &ClientError) -> String {
    match e {
        ClientError::Unauthorized => "Invalid username or password".to_string(),
        ClientError::Http(_) => {
            "Could not connect to server. Please check the server URL.".to_string()
        }
        _ => "Login failed. Please try again later.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let config = ClientConfig::new("http://localhost:8008").with_auth_dir(dir.path());
        (App::new(config, tx), rx)
    }

    #[test]
    fn test_starts_on_login_without_stored_credentials() {
        let dir = TempDir::new().unwrap();
        let (app, _rx) = test_app(&dir);
        assert_eq!(app.screen, Screen::Login);
        assert!(!app.session.is_authenticated());
    }

    #[test]
    fn test_unauthorized_failure_returns_to_login() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        app.screen = Screen::Dags;

        app.on_event(AppEvent::Failed(ClientError::Unauthorized));

        assert_eq!(app.screen, Screen::Login);
        assert_eq!(
            app.login_error.as_deref(),
            Some("Authentication failed. Please log in again.")
        );
    }

    #[test]
    fn test_other_failures_stay_on_the_current_screen() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        app.screen = Screen::Dags;

        app.on_event(AppEvent::Failed(ClientError::Forbidden("nope".to_string())));

        assert_eq!(app.screen, Screen::Dags);
        assert_eq!(
            app.status.as_deref(),
            Some("You do not have permission to perform this action.")
        );
    }

    #[test]
    fn test_login_error_messages() {
        assert_eq!(
            login_error_message(&ClientError::Unauthorized),
            "Invalid username or password"
        );
        assert_eq!(
            login_error_message(&ClientError::Internal("boom".to_string())),
            "Login failed. Please try again later."
        );
    }

    #[test]
    fn test_run_state_filter_cycles_back_to_none() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        // No DAG opened, so cycling never reaches the network
        assert_eq!(app.run_state_filter, None);

        app.cycle_run_state_filter();
        assert_eq!(app.run_state_filter, Some(DagRunState::Queued));

        for _ in 0..4 {
            app.cycle_run_state_filter();
        }
        assert_eq!(app.run_state_filter, None);
    }

    #[test]
    fn test_type_filter_cycle_covers_every_type() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);

        let mut seen = vec![app.log_filter.clone()];
        for _ in 0..=ALL_ACTION_TYPES.len() {
            app.cycle_type_filter();
            seen.push(app.log_filter.clone());
        }

        assert_eq!(seen.first(), Some(&LogFilter::All));
        assert_eq!(seen.last(), Some(&LogFilter::All));
        for action_type in ALL_ACTION_TYPES {
            assert!(seen.contains(&LogFilter::Type(action_type)));
        }
    }

    #[test]
    fn test_dag_paging_respects_total() {
        let dir = TempDir::new().unwrap();
        let (mut app, _rx) = test_app(&dir);
        app.dag_total = 25;

        app.next_dag_page();
        app.next_dag_page();
        assert_eq!(app.dag_page, 2);

        // 3 pages of 10 cover 25 entries, no fourth page
        app.next_dag_page();
        assert_eq!(app.dag_page, 2);

        app.prev_dag_page();
        assert_eq!(app.dag_page, 1);
    }

    #[test]
    fn test_move_selection_wraps_both_ways() {
        let mut state = TableState::default();
        move_selection(&mut state, 3, 1);
        assert_eq!(state.selected(), Some(1));

        state.select(Some(2));
        move_selection(&mut state, 3, 1);
        assert_eq!(state.selected(), Some(0));

        move_selection(&mut state, 3, -1);
        assert_eq!(state.selected(), Some(2));

        move_selection(&mut state, 0, 1);
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_reselect_clamps_to_shrunken_list() {
        let mut state = TableState::default();
        state.select(Some(9));
        reselect(&mut state, 4);
        assert_eq!(state.selected(), Some(3));

        reselect(&mut state, 0);
        assert_eq!(state.selected(), None);
    }
}
