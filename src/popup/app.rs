use super::events::PopupEvent;
use super::state::{PopupMode, PopupState};
use crate::app::state::AppState;
use crate::coordinator::{Command, CommandResponse};
use crate::store::keys;
use crate::sync::pause::{ToggleIntent, parse_prompted_duration};
use crate::sync::{ItemAction, QueueSyncEngine, RenderOutcome, ReorderOutcome, RowToggle, reorder};
use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures_util::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Re-read the store at least this often even without a change notification
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// The queue popup
pub struct PopupApp {
    pub state: PopupState,
    pub engine: QueueSyncEngine,
    pub app_state: AppState,
    pub enable_graph: bool,
    pub should_quit: bool,
    revision: watch::Receiver<u64>,
    last_render: Instant,
}

impl PopupApp {
    pub async fn new(app_state: AppState) -> Self {
        let (bound, enable_graph, message_timeout) = {
            let config = app_state.config.read().await;
            (
                config.reorder.suppress_duration(),
                config.general.enable_graph,
                Duration::from_secs(config.general.notification_timeout),
            )
        };
        let engine = QueueSyncEngine::new(
            app_state.store.clone(),
            app_state.coordinator.clone(),
            bound,
        );

        let mut state = PopupState::new(message_timeout);
        state.profile_name = app_state.profiles.active_name().await;
        state.active_category = app_state
            .store
            .get_string(keys::ACTIVE_CATEGORY)
            .await
            .filter(|c| !c.is_empty() && c != "*");

        Self {
            state,
            engine,
            revision: app_state.store.subscribe(),
            app_state,
            enable_graph,
            should_quit: false,
            last_render: Instant::now(),
        }
    }

    /// Rebuild the view from the store
    pub async fn render(&mut self) {
        self.last_render = Instant::now();
        if self.engine.render().await == RenderOutcome::Rendered {
            self.state.clamp_selection(self.engine.view().rows.len());
            self.state.mark_dirty();
        }
    }

    pub async fn handle_event(&mut self, event: PopupEvent) -> Result<()> {
        match event {
            PopupEvent::Tick => {
                let changed = matches!(self.revision.has_changed(), Ok(true));
                if changed {
                    let _ = self.revision.borrow_and_update();
                }
                if changed || self.last_render.elapsed() >= RENDER_INTERVAL {
                    self.render().await;
                }
                self.state.expire_message();
            }
            PopupEvent::Input(Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            })) => {
                // Only key presses; release and repeat are ignored
                if kind == KeyEventKind::Press {
                    self.handle_key(code, modifiers).await?;
                    self.state.mark_dirty();
                }
            }
            PopupEvent::Input(Event::Resize(..)) => self.state.mark_dirty(),
            PopupEvent::Input(_) => {}
        }
        Ok(())
    }

    pub async fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.quit().await;
            return Ok(());
        }

        match self.state.mode {
            PopupMode::Normal => self.handle_normal_mode(code).await,
            PopupMode::Moving => self.handle_moving_mode(code).await,
            PopupMode::ConfirmDelete => self.handle_confirm_delete_mode(code).await,
            PopupMode::Help => {
                self.state.mode = PopupMode::Normal;
            }
            PopupMode::SpeedInput
            | PopupMode::DurationInput
            | PopupMode::AddUrl => self.handle_input_mode(code).await,
        }
        Ok(())
    }

    fn selected_row_id(&self) -> Option<String> {
        self.engine
            .view()
            .rows
            .get(self.state.selected)
            .map(|row| row.id.clone())
    }

    async fn handle_normal_mode(&mut self, code: KeyCode) {
        let len = self.engine.view().rows.len();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit().await,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(len),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_previous(),
            KeyCode::Char('p') => self.toggle_selected().await,
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.selected_row_id().is_some() {
                    self.state.mode = PopupMode::ConfirmDelete;
                }
            }
            KeyCode::Char('m') => self.begin_move().await,
            KeyCode::Char(' ') => self.toggle_queue().await,
            KeyCode::Left => self.engine.pause_control_mut().select_previous(),
            KeyCode::Right => self.engine.pause_control_mut().select_next(),
            KeyCode::Char('s') => self.state.enter_input(PopupMode::SpeedInput),
            KeyCode::Char('a') => self.state.enter_input(PopupMode::AddUrl),
            KeyCode::Char('r') => {
                let response = self.engine.refresh().await;
                self.report(&response, "Queue refreshed");
            }
            KeyCode::Tab => self.cycle_profile().await,
            KeyCode::Char('c') => self.cycle_category().await,
            KeyCode::Char('?') => self.state.mode = PopupMode::Help,
            _ => {}
        }
    }

    async fn toggle_selected(&mut self) {
        let Some(row) = self.engine.view().rows.get(self.state.selected) else {
            return;
        };
        let id = row.id.clone();
        let (action, done) = match row.toggle {
            RowToggle::Pause => (ItemAction::Pause, "Item paused"),
            RowToggle::Resume => (ItemAction::Resume, "Item resumed"),
        };
        let response = self.engine.apply_action(action, &id).await;
        self.report(&response, done);
    }

    async fn begin_move(&mut self) {
        let Some(id) = self.selected_row_id() else {
            return;
        };
        match self.engine.begin_reorder(&id).await {
            Ok(true) => {
                self.state.moving_id = Some(id);
                self.state.mode = PopupMode::Moving;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to start move: {}", e);
                self.state.notify_error(format!("Failed to start move: {e}"));
            }
        }
    }

    async fn handle_moving_mode(&mut self, code: KeyCode) {
        let delta = match code {
            KeyCode::Char('j') | KeyCode::Down => 1,
            KeyCode::Char('k') | KeyCode::Up => -1,
            KeyCode::Enter | KeyCode::Char('m') => {
                self.finish_move().await;
                return;
            }
            KeyCode::Esc => {
                self.state.mode = PopupMode::Normal;
                if let Some(id) = self.state.moving_id.take() {
                    self.engine.cancel_reorder().await;
                    if let Some(index) = self.engine.view().position_of(&id) {
                        self.state.selected = index;
                    }
                }
                self.state.clamp_selection(self.engine.view().rows.len());
                return;
            }
            _ => return,
        };
        if let Some(to) = self.engine.move_during_reorder(delta) {
            self.state.selected = to;
        }
    }

    async fn finish_move(&mut self) {
        self.state.mode = PopupMode::Normal;
        let Some(id) = self.state.moving_id.take() else {
            return;
        };
        match self.engine.end_reorder(&id).await {
            ReorderOutcome::Moved { position, response } => {
                self.report(&response, format!("Moved to position {}", position + 1));
            }
            ReorderOutcome::Unchanged | ReorderOutcome::NotActive => {}
        }
        if let Some(index) = self.engine.view().position_of(&id) {
            self.state.selected = index;
        }
        self.state.clamp_selection(self.engine.view().rows.len());
    }

    async fn handle_confirm_delete_mode(&mut self, code: KeyCode) {
        self.state.mode = PopupMode::Normal;
        if !matches!(code, KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter) {
            return;
        }
        if let Some(id) = self.selected_row_id() {
            let response = self.engine.apply_action(ItemAction::Delete, &id).await;
            self.report(&response, "Item removed");
            self.state.clamp_selection(self.engine.view().rows.len());
        }
    }

    async fn toggle_queue(&mut self) {
        match self.engine.pause_control().activate() {
            ToggleIntent::Pause(duration) => {
                let response = self.engine.pause_queue(duration).await;
                self.report(&response, "Queue paused");
            }
            ToggleIntent::Resume => {
                let response = self.engine.resume_queue().await;
                self.report(&response, "Queue resumed");
            }
            ToggleIntent::PromptForDuration => self.state.enter_input(PopupMode::DurationInput),
        }
    }

    async fn handle_input_mode(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.state.take_input();
            }
            KeyCode::Backspace => {
                self.state.input_buffer.pop();
            }
            KeyCode::Char(c) => self.state.push_char(c),
            KeyCode::Enter => self.submit_input().await,
            _ => {}
        }
    }

    async fn submit_input(&mut self) {
        let mode = self.state.mode;
        let input = self.state.take_input();
        match mode {
            PopupMode::SpeedInput => {
                let response = self.engine.set_speed_limit(input.trim()).await;
                self.report(&response, "Speed limit set");
            }
            PopupMode::DurationInput => match parse_prompted_duration(&input) {
                Ok(duration) => {
                    let response = self.engine.pause_queue(duration).await;
                    self.report(&response, "Queue paused");
                }
                Err(e) => self.state.notify_error(e.to_string()),
            },
            PopupMode::AddUrl => self.add_url(input.trim()).await,
            _ => {}
        }
    }

    async fn add_url(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            self.state.enter_input(PopupMode::AddUrl);
            self.state.input_buffer = url.to_string();
            self.state.input_error = Some("Only http(s) URLs can be added".to_string());
            return;
        }
        let response = self
            .app_state
            .coordinator
            .send(Command::AddUrl {
                url: url.to_string(),
                nzbname: None,
                category: self.state.active_category.clone(),
            })
            .await;
        self.report(&response, "URL added");
        self.render().await;
    }

    async fn cycle_profile(&mut self) {
        let names = self.app_state.profiles.names().await;
        if names.is_empty() {
            self.state.notify_error("No profiles configured");
            return;
        }
        let current = self.app_state.profiles.active_name().await;
        let next = match current.and_then(|c| names.iter().position(|n| *n == c)) {
            Some(i) => names[(i + 1) % names.len()].clone(),
            None => names[0].clone(),
        };
        if let Err(e) = self.app_state.profiles.set_active(&next).await {
            self.state.notify_error(e.to_string());
            return;
        }
        tracing::info!("Active profile switched to '{}'", next);
        self.state.profile_name = Some(next.clone());
        let response = self.engine.refresh().await;
        self.report(&response, format!("Profile: {next}"));
    }

    /// Step through the category list; one step past the end clears the choice
    async fn cycle_category(&mut self) {
        let response = self.app_state.coordinator.send(Command::GetCategories).await;
        let categories: Vec<String> = response
            .get("categories")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        if categories.is_empty() {
            return;
        }
        let next = match self
            .state
            .active_category
            .as_ref()
            .and_then(|c| categories.iter().position(|n| n == c))
        {
            Some(i) if i + 1 < categories.len() => Some(categories[i + 1].clone()),
            Some(_) => None,
            None => Some(categories[0].clone()),
        };

        let stored = next.clone().unwrap_or_else(|| "*".to_string());
        if let Err(e) = self.app_state.store.set(keys::ACTIVE_CATEGORY, stored).await {
            self.state.notify_error(e.to_string());
            return;
        }
        self.state.notify(format!(
            "Category: {}",
            next.as_deref().unwrap_or("(none)")
        ));
        self.state.active_category = next;
    }

    fn report(&mut self, response: &CommandResponse, success: impl Into<String>) {
        if response.is_success() {
            self.state.notify(success);
        } else {
            self.state.notify_error(response.error_message());
        }
    }

    /// Leave the popup. Any gesture is dropped and the suppress flag lowered.
    pub async fn quit(&mut self) {
        if self.engine.reorder_active() {
            self.engine.cancel_reorder().await;
        }
        if let Err(e) = reorder::release(&self.app_state.store).await {
            tracing::error!("Failed to clear skip_redraw on exit: {}", e);
        }
        self.state.moving_id = None;
        self.should_quit = true;
    }
}

/// Run the popup until the user quits
pub async fn run_popup(app_state: AppState) -> Result<()> {
    app_state.ensure_ready().await?;

    let mut app = PopupApp::new(app_state).await;
    app.render().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::channel(100);

    let input_tx = tx.clone();
    tokio::spawn(async move {
        let mut reader = crossterm::event::EventStream::new();
        while let Some(Ok(event)) = reader.next().await {
            if input_tx.send(PopupEvent::Input(event)).await.is_err() {
                break;
            }
        }
    });

    let tick_tx = tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if tick_tx.send(PopupEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    let result = async {
        while !app.should_quit {
            if app.state.needs_redraw() {
                terminal.draw(|f| super::ui::render(&app, f))?;
                app.state.clear_dirty();
            }

            if let Ok(Some(event)) =
                tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
            {
                app.handle_event(event).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    if !app.should_quit {
        app.quit().await;
    }

    // Cleanup terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
