use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::board::BoardState;
use crate::model::config::BoardConfig;
use crate::model::form::StageFormField;
use crate::model::stage::PipelineKind;
use crate::ops::refetch;
use crate::ops::side_effects::SideEffectOutcome;
use crate::ops::transition::{CommitOutcome, Coordinator};
use crate::store::{JsonStore, PipelineStore};

use super::input;
use super::render;
use super::theme::Theme;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// A ghost of the entity follows the cursor; nothing is mutated
    /// until the drop is confirmed.
    Move,
    /// The stage form modal is collecting required fields.
    Form,
}

/// Cursor within one pipeline's board: a stage column (display order)
/// and a row in its lane.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub stage: usize,
    pub row: usize,
}

/// An in-progress drag: where the entity came from and where the ghost
/// currently hovers.
#[derive(Debug, Clone)]
pub struct MoveState {
    pub entity_id: String,
    pub from_stage: usize,
    pub from_row: usize,
    pub stage: usize,
    pub row: usize,
}

/// One input of the collection form.
#[derive(Debug, Clone)]
pub struct FormInput {
    pub field: StageFormField,
    pub buffer: String,
}

/// The open collection form: buffers per field plus a validation error
/// line.
#[derive(Debug, Clone)]
pub struct FormState {
    pub title: String,
    pub inputs: Vec<FormInput>,
    pub focus: usize,
    pub error: Option<String>,
}

/// A status-row message. Transition results and side-effect results are
/// separate notices so partial failure reads as two outcomes.
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub error: bool,
}

/// Main application state
pub struct App {
    pub store: JsonStore,
    pub config: BoardConfig,
    pub quotes: BoardState,
    pub projects: BoardState,
    pub view: PipelineKind,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    pub cursors: [Cursor; 2],
    pub coordinator: Coordinator,
    pub move_state: Option<MoveState>,
    pub form: Option<FormState>,
    pub notices: Vec<Notice>,
    pub show_help: bool,
}

impl App {
    pub fn new(store: JsonStore) -> Result<Self, Box<dyn std::error::Error>> {
        let config = store.config().clone();
        let quotes = BoardState::new(
            PipelineKind::Quotes,
            store.list_stages(PipelineKind::Quotes)?,
            store.list_entities(PipelineKind::Quotes)?,
        );
        let projects = BoardState::new(
            PipelineKind::Projects,
            store.list_stages(PipelineKind::Projects)?,
            store.list_entities(PipelineKind::Projects)?,
        );
        Ok(App {
            store,
            config,
            quotes,
            projects,
            view: PipelineKind::Quotes,
            mode: Mode::Navigate,
            should_quit: false,
            theme: Theme::default(),
            cursors: [Cursor::default(), Cursor::default()],
            coordinator: Coordinator::new(),
            move_state: None,
            form: None,
            notices: Vec::new(),
            show_help: false,
        })
    }

    fn view_index(&self) -> usize {
        match self.view {
            PipelineKind::Quotes => 0,
            PipelineKind::Projects => 1,
        }
    }

    pub fn board(&self) -> &BoardState {
        match self.view {
            PipelineKind::Quotes => &self.quotes,
            PipelineKind::Projects => &self.projects,
        }
    }

    pub fn board_mut(&mut self) -> &mut BoardState {
        match self.view {
            PipelineKind::Quotes => &mut self.quotes,
            PipelineKind::Projects => &mut self.projects,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursors[self.view_index()]
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        let idx = self.view_index();
        &mut self.cursors[idx]
    }

    /// Stage ids of the current board in display order.
    pub fn visible_stage_ids(&self) -> Vec<String> {
        self.board()
            .display_stages()
            .into_iter()
            .map(|s| s.id.clone())
            .collect()
    }

    /// Entity id under the cursor, if the cursor's lane has one.
    pub fn entity_under_cursor(&self) -> Option<String> {
        let cursor = self.cursor();
        let stage_ids = self.visible_stage_ids();
        let stage_id = stage_ids.get(cursor.stage)?;
        self.board().lane(stage_id).get(cursor.row).cloned()
    }

    /// Keep the cursor inside the board after any mutation.
    pub fn clamp_cursor(&mut self) {
        let stage_count = self.visible_stage_ids().len();
        let cursor = self.cursor();
        let stage = cursor.stage.min(stage_count.saturating_sub(1));
        let lane_len = self
            .visible_stage_ids()
            .get(stage)
            .map(|id| self.board().lane(id).len())
            .unwrap_or(0);
        let row = cursor.row.min(lane_len.saturating_sub(1));
        *self.cursor_mut() = Cursor { stage, row };
    }

    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.notices.push(Notice {
            text: text.into(),
            error: false,
        });
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.notices.push(Notice {
            text: text.into(),
            error: true,
        });
    }

    pub fn last_notices(&self, n: usize) -> &[Notice] {
        let start = self.notices.len().saturating_sub(n);
        &self.notices[start..]
    }

    pub fn refetch_view(&mut self, kind: PipelineKind) {
        let result = match kind {
            PipelineKind::Quotes => refetch(&mut self.quotes, &self.store),
            PipelineKind::Projects => refetch(&mut self.projects, &self.store),
        };
        if let Err(e) = result {
            self.push_error(format!("refresh failed: {e}"));
        }
        self.clamp_cursor();
    }

    pub fn refetch_all(&mut self) {
        self.refetch_view(PipelineKind::Quotes);
        self.refetch_view(PipelineKind::Projects);
    }

    /// Report a committed transition: the move itself, then the
    /// side-effect outcome as its own notice, and refresh whichever
    /// board a cross-pipeline effect touched.
    pub fn report_commit(&mut self, outcome: &CommitOutcome) {
        let from = self.stage_display_name(&outcome.from);
        let to = self.stage_display_name(&outcome.to);
        self.push_notice(format!("moved {}: {} -> {}", outcome.entity_id, from, to));
        match &outcome.side_effect {
            SideEffectOutcome::None => {}
            SideEffectOutcome::SpawnedProject { project_id } => {
                let project_id = project_id.clone();
                self.push_notice(format!("spawned project {project_id}"));
                self.refetch_view(PipelineKind::Projects);
            }
            SideEffectOutcome::QuoteFinished { quote_id } => {
                let quote_id = quote_id.clone();
                self.push_notice(format!("finished source quote {quote_id}"));
                self.refetch_view(PipelineKind::Quotes);
            }
            SideEffectOutcome::Failed { effect, message } => {
                self.push_error(format!("{effect} failed: {message}"));
            }
        }
    }

    pub fn stage_display_name(&self, stage_id: &str) -> String {
        self.config
            .find_stage(stage_id)
            .map(|(_, sc)| sc.stage.name.clone())
            .unwrap_or_else(|| stage_id.to_string())
    }
}

/// Launch the TUI against the discovered (or given) board directory.
pub fn run(board_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root: PathBuf = match board_dir {
        Some(dir) => std::fs::canonicalize(dir)?,
        None => JsonStore::discover(&std::env::current_dir()?)?,
    };
    let store = JsonStore::open(&root)?;
    let mut app = App::new(store)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| render::draw(frame, app))?;
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
        }
        if app.should_quit {
            return Ok(());
        }
    }
}
