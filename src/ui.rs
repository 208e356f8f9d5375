use crate::form::{FieldValue, Modal, TaskField};
use crate::model::Priority;
use crate::storage::StoreLocation;
use crate::view::{BoardView, Confirm, DropEffect, Submission, Synchronizer, TaskView};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::block::{Position, Title};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::debug;

const CARD_HEIGHT: u16 = 4;

pub fn run(sync: Synchronizer, location: StoreLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(sync, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    sync: Synchronizer,
    location: StoreLocation,
    selected_column: usize,
    /// Index among the visible tasks of the selected column.
    selected_task: usize,
    scroll_offsets: Vec<usize>,
    last_save: Instant,
    status: String,
    mode: Mode,
    pending: Option<PendingDelete>,
    hits: HitMap,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Mode {
    Normal,
    Search,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PendingDelete {
    Column(String),
    Task { column_id: String, task_id: String },
}

/// Screen regions from the last draw, used to resolve mouse positions.
#[derive(Clone, Debug, Default)]
struct HitMap {
    columns: Vec<Rect>,
    add_buttons: Vec<Rect>,
    cards: Vec<(Rect, String)>,
}

impl HitMap {
    fn column_at(&self, x: u16, y: u16) -> Option<usize> {
        self.columns.iter().position(|r| contains(*r, x, y))
    }

    fn add_button_at(&self, x: u16, y: u16) -> Option<usize> {
        self.add_buttons.iter().position(|r| contains(*r, x, y))
    }

    fn card_at(&self, x: u16, y: u16) -> Option<&str> {
        self.cards
            .iter()
            .find(|(r, _)| contains(*r, x, y))
            .map(|(_, id)| id.as_str())
    }
}

/// Frozen copy of the board drawn behind the confirmation dialog.
struct Backdrop {
    view: BoardView,
    focus: Option<(usize, usize)>,
    offsets: Vec<usize>,
}

/// Blocking yes/no dialog drawn over the board.
struct TerminalConfirm<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    backdrop: Backdrop,
}

impl<B: Backend> Confirm for TerminalConfirm<'_, B> {
    fn confirm(&mut self, message: &str) -> bool {
        loop {
            let backdrop = &mut self.backdrop;
            let drawn = self.terminal.draw(|f| {
                let area = f.size();
                draw_columns(
                    f,
                    area,
                    &backdrop.view,
                    backdrop.focus,
                    &mut backdrop.offsets,
                );
                draw_confirm(f, message);
            });
            if drawn.is_err() {
                return false;
            }
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => return true,
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return false,
                    _ => {}
                },
                Ok(_) => {}
                Err(_) => return false,
            }
        }
    }
}

impl App {
    fn new(sync: Synchronizer, location: StoreLocation) -> Self {
        let status = format!("Loaded board from {}", location.dir.display());
        let column_count = sync.view().columns.len();
        App {
            sync,
            location,
            selected_column: 0,
            selected_task: 0,
            scroll_offsets: vec![0; column_count],
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
            pending: None,
            hits: HitMap::default(),
        }
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if !event::poll(Duration::from_millis(200))? {
                continue;
            }
            let quit = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key)?,
                Event::Mouse(mouse) => {
                    self.handle_mouse(mouse)?;
                    false
                }
                _ => false,
            };
            if quit {
                break;
            }
            if self.pending.is_some() {
                let mut prompt = TerminalConfirm {
                    terminal: &mut *terminal,
                    backdrop: self.backdrop(),
                };
                self.resolve_pending(&mut prompt)?;
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        if self.sync.modal().is_some() {
            self.handle_form_key(key)?;
            return Ok(false);
        }
        match self.mode {
            Mode::Search => {
                self.handle_search_key(key);
                Ok(false)
            }
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        let dragging = self.sync.drag().current().is_some();
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Left | KeyCode::Char('h') => {
                self.prev_column();
                if dragging {
                    self.report_drag_over();
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.next_column();
                if dragging {
                    self.report_drag_over();
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.prev_task(),
            KeyCode::Down | KeyCode::Char('j') => self.next_task(),
            KeyCode::Char(' ') => {
                if dragging {
                    self.drop_on_focused()?;
                } else {
                    self.grab_selected();
                }
            }
            KeyCode::Esc if dragging => {
                self.sync.drag_end();
                self.status = "Drag canceled".into();
            }
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.status = "Search: type to filter, Enter/Esc to finish, Ctrl+U to clear".into();
            }
            KeyCode::Char('n') => match self.current_column_id() {
                Some(column_id) => {
                    self.sync.open_task_form(None, &column_id);
                    self.status = "Creating task (Tab moves, Enter saves, Esc cancels)".into();
                }
                None => self.status = "Add a column first (C)".into(),
            },
            KeyCode::Char('e') => match self.current_task().cloned() {
                Some(task) => {
                    self.sync.open_task_form(Some(&task.id), &task.column_id);
                    self.status = format!("Editing {}", task.title);
                }
                None => self.status = "No task selected to edit".into(),
            },
            KeyCode::Char('d') => match self.current_task() {
                Some(task) => {
                    self.pending = Some(PendingDelete::Task {
                        column_id: task.column_id.clone(),
                        task_id: task.id.clone(),
                    });
                }
                None => self.status = "No task selected to delete".into(),
            },
            KeyCode::Char('C') => {
                self.sync.open_column_form(None);
                self.status = "Creating column (Enter saves, Esc cancels)".into();
            }
            KeyCode::Char('R') => match self.current_column_id() {
                Some(column_id) => {
                    self.sync.open_column_form(Some(&column_id));
                    self.status = "Renaming column (Enter saves, Esc cancels)".into();
                }
                None => self.status = "No column selected".into(),
            },
            KeyCode::Char('X') => match self.current_column_id() {
                Some(column_id) => self.pending = Some(PendingDelete::Column(column_id)),
                None => self.status = "No column selected".into(),
            },
            KeyCode::Char('r') => {
                self.sync.reload()?;
                self.clamp_selection();
                self.status = format!("Reloaded from {}", self.location.dir.display());
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let mut text = self.sync.search().to_string();
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = if text.is_empty() {
                    "Showing all tasks".into()
                } else {
                    format!("Filtering by \"{}\"", text)
                };
                return;
            }
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => text.clear(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                text.push(c)
            }
            _ => return,
        }
        self.sync.set_search(text);
        self.clamp_selection();
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.sync.close_modal();
                self.status = "Canceled".into();
            }
            KeyCode::Enter => self.submit_form()?,
            _ => {
                if let Some(modal) = self.sync.modal_mut() {
                    edit_modal(modal, key);
                }
            }
        }
        Ok(())
    }

    fn submit_form(&mut self) -> Result<()> {
        let (heading, new_task_column) = match self.sync.modal() {
            Some(Modal::Task(form)) if form.edit_id.is_empty() => {
                (form.heading(), Some(form.column_id.clone()))
            }
            Some(modal) => (modal.heading(), None),
            None => return Ok(()),
        };
        match self.sync.submit_modal()? {
            Submission::Applied => {
                self.last_save = Instant::now();
                self.status = format!("{}: saved", heading);
                if let Some(column_id) = new_task_column {
                    self.focus_last_in(&column_id);
                }
                self.clamp_selection();
            }
            Submission::Ignored => {
                self.status = format!("{}: nothing to update", heading);
                self.clamp_selection();
            }
            Submission::Rejected(reason) => {
                self.status = format!("{}: {}", heading, reason);
            }
            Submission::NoModal => {}
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if self.sync.modal().is_some() || self.mode == Mode::Search {
            return Ok(());
        }
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(task_id) = self.hits.card_at(x, y).map(str::to_string) {
                    self.focus_task(&task_id);
                    self.grab_selected();
                } else if let Some(idx) = self.hits.add_button_at(x, y) {
                    self.selected_column = idx;
                    if let Some(column_id) = self.current_column_id() {
                        self.sync.open_task_form(None, &column_id);
                        self.status = "Creating task (Tab moves, Enter saves, Esc cancels)".into();
                    }
                } else if let Some(idx) = self.hits.column_at(x, y) {
                    self.selected_column = idx;
                    self.clamp_selection();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if self.sync.drag().current().is_some() {
                    if let Some(idx) = self.hits.column_at(x, y) {
                        if idx != self.selected_column {
                            self.selected_column = idx;
                            self.clamp_selection();
                        }
                        self.report_drag_over();
                    }
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.sync.drag().current().is_some() {
                    match self.hits.column_at(x, y) {
                        Some(idx) => {
                            self.selected_column = idx;
                            self.drop_on_focused()?;
                        }
                        None => {
                            self.sync.drag_end();
                            self.status = "Drag canceled".into();
                        }
                    }
                }
            }
            MouseEventKind::ScrollDown => self.next_task(),
            MouseEventKind::ScrollUp => self.prev_task(),
            _ => {}
        }
        Ok(())
    }

    fn grab_selected(&mut self) {
        let Some(task) = self.current_task().cloned() else {
            self.status = "No task selected to move".into();
            return;
        };
        if self.sync.drag_start(&task.id).is_some() {
            debug!(task_id = %task.id, "drag started");
            self.status = format!(
                "Moving \"{}\": pick a column with ←/→, Space drops, Esc cancels",
                task.title
            );
        }
    }

    fn report_drag_over(&mut self) {
        let Some(column) = self.sync.view().columns.get(self.selected_column) else {
            return;
        };
        self.status = match self.sync.drag_over(&column.id) {
            DropEffect::Move => format!("Drop into {} (move)", column.title),
            DropEffect::None => "Cannot drop here".into(),
        };
    }

    fn drop_on_focused(&mut self) -> Result<()> {
        let target = match self.sync.view().columns.get(self.selected_column) {
            Some(column) => (column.id.clone(), column.title.clone()),
            None => {
                self.sync.drag_end();
                return Ok(());
            }
        };
        let moved = self.sync.drop_on(&target.0)?;
        let ended = self.sync.drag_end();
        match ended {
            Some(source) if moved => {
                self.last_save = Instant::now();
                let title = self
                    .sync
                    .view()
                    .task(&source.task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_default();
                self.status = format!("Moved \"{}\" to {}", title, target.1);
                self.focus_task(&source.task_id);
            }
            Some(source) => {
                self.status = format!("Task stays in {}", target.1);
                self.focus_task(&source.task_id);
            }
            None => {}
        }
        self.clamp_selection();
        Ok(())
    }

    fn resolve_pending(&mut self, confirm: &mut dyn Confirm) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let deleted = match &pending {
            PendingDelete::Column(column_id) => self.sync.delete_column(column_id, confirm)?,
            PendingDelete::Task { column_id, task_id } => {
                self.sync.delete_task(column_id, task_id, confirm)?
            }
        };
        self.status = match (&pending, deleted) {
            (PendingDelete::Column(_), true) => "Deleted column".into(),
            (PendingDelete::Task { .. }, true) => "Deleted task".into(),
            (_, false) => "Delete canceled".into(),
        };
        if deleted {
            self.last_save = Instant::now();
        }
        self.clamp_selection();
        Ok(())
    }

    fn backdrop(&self) -> Backdrop {
        Backdrop {
            view: self.sync.view().clone(),
            focus: self.focus(),
            offsets: self.scroll_offsets.clone(),
        }
    }

    fn focus(&self) -> Option<(usize, usize)> {
        if self.sync.view().columns.is_empty() {
            None
        } else {
            Some((self.selected_column, self.selected_task))
        }
    }

    fn current_column_id(&self) -> Option<String> {
        self.sync
            .view()
            .columns
            .get(self.selected_column)
            .map(|c| c.id.clone())
    }

    fn current_task(&self) -> Option<&TaskView> {
        self.sync
            .view()
            .columns
            .get(self.selected_column)?
            .visible_tasks()
            .nth(self.selected_task)
    }

    fn visible_len(&self, column_idx: usize) -> usize {
        self.sync
            .view()
            .columns
            .get(column_idx)
            .map(|c| c.visible_tasks().count())
            .unwrap_or(0)
    }

    fn focus_task(&mut self, task_id: &str) {
        for (c_idx, column) in self.sync.view().columns.iter().enumerate() {
            if let Some(t_idx) = column.visible_tasks().position(|t| t.id == task_id) {
                self.selected_column = c_idx;
                self.selected_task = t_idx;
                return;
            }
        }
    }

    fn focus_last_in(&mut self, column_id: &str) {
        if let Some(c_idx) = self.sync.view().column_index(column_id) {
            self.selected_column = c_idx;
            self.selected_task = self.visible_len(c_idx).saturating_sub(1);
        }
    }

    fn clamp_selection(&mut self) {
        let columns = self.sync.view().columns.len();
        self.selected_column = self.selected_column.min(columns.saturating_sub(1));
        self.selected_task = self
            .selected_task
            .min(self.visible_len(self.selected_column).saturating_sub(1));
    }

    fn prev_column(&mut self) {
        if self.selected_column > 0 {
            self.selected_column -= 1;
            self.selected_task = 0;
        }
    }

    fn next_column(&mut self) {
        if self.selected_column + 1 < self.sync.view().columns.len() {
            self.selected_column += 1;
            self.selected_task = 0;
        }
    }

    fn prev_task(&mut self) {
        if self.selected_task > 0 {
            self.selected_task -= 1;
        }
    }

    fn next_task(&mut self) {
        if self.selected_task + 1 < self.visible_len(self.selected_column) {
            self.selected_task += 1;
        }
    }

    fn draw(&mut self, f: &mut Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let focus = self.focus();
        self.hits = draw_columns(
            f,
            layout[1],
            self.sync.view(),
            focus,
            &mut self.scroll_offsets,
        );
        self.draw_footer(f, layout[2]);

        if let Some(modal) = self.sync.modal() {
            draw_form(f, modal);
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let mut spans = vec![
            Span::styled(
                "taskboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(self.location.scope.label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.dir.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ];
        let search = self.sync.search();
        if !search.is_empty() || self.mode == Mode::Search {
            let caret = if self.mode == Mode::Search { "▌" } else { "" };
            let text = format!(
                "search: {}{} ({}/{})",
                search,
                caret,
                self.sync.view().visible_count(),
                self.sync.board().task_count()
            );
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(text, Style::default().fg(Color::LightYellow)));
        }
        if self.sync.drag().current().is_some() {
            spans.push(Span::raw("  •  "));
            spans.push(Span::styled(
                "moving",
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail_line = match self.current_task() {
            Some(task) => selected_task_detail(task),
            None => Line::from("No task selected"),
        };
        let detail = Paragraph::new(detail_line)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }
}

fn edit_modal(modal: &mut Modal, key: KeyEvent) {
    match modal {
        Modal::Task(form) => match key.code {
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left | KeyCode::Char('h') if form.field == TaskField::Priority => {
                form.priority = form.priority.prev()
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ')
                if form.field == TaskField::Priority =>
            {
                form.priority = form.priority.next()
            }
            _ => {
                if let Some(field) = form.active_text_mut() {
                    edit_text(field, key);
                }
            }
        },
        Modal::Column(form) => edit_text(&mut form.title, key),
    }
}

fn edit_text(field: &mut FieldValue, key: KeyEvent) {
    match key.code {
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => field.clear(),
        KeyCode::Char(c) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                field.insert_char(c);
            }
        }
        _ => {}
    }
}

fn draw_columns(
    f: &mut Frame<'_>,
    area: Rect,
    view: &BoardView,
    focus: Option<(usize, usize)>,
    offsets: &mut Vec<usize>,
) -> HitMap {
    let mut hits = HitMap::default();
    if view.columns.is_empty() {
        let msg = Paragraph::new("No columns yet. Press C to add one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("taskboard"));
        f.render_widget(Clear, area);
        f.render_widget(msg, area);
        return hits;
    }

    if offsets.len() < view.columns.len() {
        offsets.resize(view.columns.len(), 0);
    }
    let dragging = view
        .columns
        .iter()
        .flat_map(|c| c.tasks.iter())
        .any(|t| t.dragging);

    let count = view.columns.len() as u32;
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            view.columns
                .iter()
                .map(|_| Constraint::Ratio(1, count))
                .collect::<Vec<_>>(),
        )
        .split(area);

    for (idx, column) in view.columns.iter().enumerate() {
        let chunk = chunks[idx];
        let accent = color_for_index(idx);
        let focused = focus.map(|(c, _)| c == idx).unwrap_or(false);
        let visible: Vec<&TaskView> = column.visible_tasks().collect();
        let card_width = chunk.width.saturating_sub(2);
        let selected = focus
            .filter(|(c, _)| *c == idx)
            .map(|(_, t)| t)
            .filter(|t| *t < visible.len());

        let items = visible
            .iter()
            .enumerate()
            .map(|(t_idx, task)| task_card(task, card_width, Some(t_idx) == selected))
            .collect::<Vec<_>>();
        let viewport = (chunk.height.saturating_sub(2) / CARD_HEIGHT) as usize;
        let offset = match selected {
            Some(sel) => adjust_offset(sel, offsets[idx], viewport, 0, visible.len()),
            None => offsets[idx].min(visible.len().saturating_sub(viewport)),
        };
        offsets[idx] = offset;
        let mut state = ListState::default();
        *state.offset_mut() = offset;
        state.select(selected);

        let mut title = if visible.len() == column.tasks.len() {
            format!("{} ({})", column.title, column.tasks.len())
        } else {
            format!("{} ({}/{})", column.title, visible.len(), column.tasks.len())
        };
        if dragging && focused {
            title.push_str(" ⇣ drop here");
        }
        let add_label = if focused {
            " + Add Task (n) · R rename · X delete "
        } else {
            " + Add Task "
        };

        let block = Block::default()
            .title(Span::styled(
                title,
                Style::default().fg(accent).add_modifier(if focused {
                    Modifier::BOLD | Modifier::UNDERLINED
                } else {
                    Modifier::BOLD
                }),
            ))
            .title(
                Title::from(Span::styled(add_label, Style::default().fg(Color::DarkGray)))
                    .position(Position::Bottom),
            )
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent).add_modifier(
                if dragging && focused {
                    Modifier::BOLD
                } else {
                    Modifier::empty()
                },
            ))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));

        f.render_stateful_widget(List::new(items).block(block), chunk, &mut state);

        hits.columns.push(chunk);
        hits.add_buttons.push(Rect {
            x: chunk.x,
            y: chunk.y + chunk.height.saturating_sub(1),
            width: chunk.width,
            height: 1,
        });
        for (row, task) in visible.iter().enumerate().skip(offset).take(viewport) {
            let y = chunk.y + 1 + (row - offset) as u16 * CARD_HEIGHT;
            hits.cards.push((
                Rect {
                    x: chunk.x + 1,
                    y,
                    width: card_width,
                    height: CARD_HEIGHT,
                },
                task.id.clone(),
            ));
        }
    }
    hits
}

fn draw_form(f: &mut Frame<'_>, modal: &Modal) {
    let area = centered_rect(60, 40, f.size());
    let mut lines = Vec::new();
    match modal {
        Modal::Task(form) => {
            lines.push(field_line("Title", &form.title, form.field == TaskField::Title));
            lines.push(priority_line(form.priority, form.field == TaskField::Priority));
            lines.push(field_line(
                "Due (YYYY-MM-DD)",
                &form.due,
                form.field == TaskField::Due,
            ));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter to save • Esc to cancel • Tab/Shift-Tab to move • ←/→ change priority",
                Style::default().fg(Color::Gray),
            )));
        }
        Modal::Column(form) => {
            lines.push(field_line("Title", &form.title, true));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enter to save • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }
    }
    let dialog = Paragraph::new(lines)
        .block(
            Block::default()
                .title(Span::styled(
                    modal.heading(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_confirm(f: &mut Frame<'_>, message: &str) {
    let area = centered_rect(50, 30, f.size());
    let body = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Press y to confirm, n or Esc to cancel"),
    ];
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn footer_help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
        Span::raw(" select  "),
        Span::styled("space", Style::default().fg(Color::LightGreen)),
        Span::raw(" grab/drop  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("e", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("d", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("C/R/X", Style::default().fg(Color::LightBlue)),
        Span::raw(" column add/rename/delete  "),
        Span::styled("/", Style::default().fg(Color::LightYellow)),
        Span::raw(" search  "),
        Span::styled("r", Style::default().fg(Color::LightGreen)),
        Span::raw(" reload  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn contains(r: Rect, x: u16, y: u16) -> bool {
    x >= r.x && x < r.x.saturating_add(r.width) && y >= r.y && y < r.y.saturating_add(r.height)
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Low => Color::Green,
        Priority::Medium => Color::Yellow,
        Priority::High => Color::LightRed,
    }
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return ".".repeat(max);
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn task_card(task: &TaskView, width: u16, selected: bool) -> ListItem<'static> {
    let inner_width = width.saturating_sub(4).max(10) as usize;
    let border_char = if task.dragging {
        "~"
    } else if selected {
        "="
    } else {
        "-"
    };
    let edge = format!("+{}+", border_char.repeat(inner_width + 2));
    let title = truncate_text(&task.title, inner_width);
    let meta = match &task.due {
        Some(due) => format!("[{}] due {}", task.badge, due),
        None => format!("[{}]", task.badge),
    };
    let meta = truncate_text(&meta, inner_width);
    let lines = vec![
        Line::from(edge.clone()),
        Line::from(format!("| {:width$} |", title, width = inner_width)),
        Line::from(format!("| {:width$} |", meta, width = inner_width)),
        Line::from(edge),
    ];
    let style = if task.dragging {
        Style::default()
            .bg(Color::Rgb(40, 24, 48))
            .fg(Color::LightMagenta)
            .add_modifier(Modifier::ITALIC)
    } else if selected {
        Style::default()
            .bg(Color::Rgb(252, 214, 112))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .bg(Color::Rgb(22, 24, 30))
            .fg(priority_color(task.priority))
    };
    ListItem::new(lines).style(style)
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn priority_line(priority: Priority, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value = if active {
        format!("◀ {} ▶", priority.label())
    } else {
        priority.label().to_string()
    };
    Line::from(vec![
        Span::styled("Priority: ", label_style),
        Span::styled(value, Style::default().fg(priority_color(priority))),
    ])
}

fn selected_task_detail(task: &TaskView) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            task.title.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            task.badge,
            Style::default().fg(priority_color(task.priority)),
        ),
    ];
    if let Some(due) = &task.due {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("due {}", due),
            Style::default().fg(Color::LightRed),
        ));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        task.id.clone(),
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Persistence, StoreScope};
    use crate::store::{tests::memory_store, STATE_KEY};
    use ratatui::backend::TestBackend;
    use std::path::PathBuf;

    struct Answer(bool);

    impl Confirm for Answer {
        fn confirm(&mut self, _message: &str) -> bool {
            self.0
        }
    }

    fn app() -> App {
        app_with_store().0
    }

    fn app_with_store() -> (App, MemoryStore) {
        let (store, mem, _) = memory_store();
        let sync = Synchronizer::new(store, "%Y-%m-%d");
        let app = App::new(
            sync,
            StoreLocation {
                dir: PathBuf::from("/tmp/taskboard-test"),
                scope: StoreScope::Explicit,
            },
        );
        (app, mem)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn add_task(app: &mut App, title: &str) {
        press(app, KeyCode::Char('n'));
        type_text(app, title);
        press(app, KeyCode::Enter);
    }

    fn column_titles(app: &App, idx: usize) -> Vec<String> {
        app.sync.view().columns[idx]
            .tasks
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }

    fn screen(app: &mut App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_draws_default_columns() {
        let mut app = app();
        let text = screen(&mut app);
        assert!(text.contains("To Do (0)"));
        assert!(text.contains("In Progress (0)"));
        assert!(text.contains("Done (0)"));
        assert!(text.contains("+ Add Task"));
    }

    #[test]
    fn test_create_task_through_form() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert!(app.sync.modal().is_some());
        // empty title keeps the form open
        press(&mut app, KeyCode::Enter);
        assert!(app.sync.modal().is_some());
        assert!(app.status.contains("title is required"));

        type_text(&mut app, "Write report");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Enter);
        assert!(app.sync.modal().is_none());

        let task = app.current_task().unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.badge, "High");
        assert!(screen(&mut app).contains("[High]"));
    }

    #[test]
    fn test_escape_cancels_form() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Nope");
        press(&mut app, KeyCode::Esc);
        assert!(app.sync.modal().is_none());
        assert_eq!(app.sync.board().task_count(), 0);
    }

    #[test]
    fn test_keyboard_drag_and_drop() {
        let mut app = app();
        add_task(&mut app, "A");
        add_task(&mut app, "B");
        app.selected_task = 0;

        press(&mut app, KeyCode::Char(' '));
        assert!(app.sync.view().columns[0].tasks[0].dragging);
        press(&mut app, KeyCode::Char('l'));
        assert!(app.status.contains("Drop into In Progress"));
        press(&mut app, KeyCode::Char(' '));

        assert_eq!(column_titles(&app, 0), vec!["B"]);
        assert_eq!(column_titles(&app, 1), vec!["A"]);
        assert!(app.sync.drag().current().is_none());
        assert_eq!(app.current_task().map(|t| t.title.as_str()), Some("A"));
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut app = app();
        add_task(&mut app, "A");
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('l'));
        press(&mut app, KeyCode::Esc);
        assert!(app.sync.drag().current().is_none());
        assert_eq!(column_titles(&app, 0), vec!["A"]);
    }

    #[test]
    fn test_mouse_drag_between_columns() {
        let mut app = app();
        add_task(&mut app, "A");
        screen(&mut app);
        let (card, _) = app.hits.cards[0].clone();
        let target = app.hits.columns[2];

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), card.x + 2, card.y + 1))
            .unwrap();
        assert!(app.sync.drag().current().is_some());
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), target.x + 2, target.y + 3))
            .unwrap();
        assert!(app.status.contains("Drop into Done"));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), target.x + 2, target.y + 3))
            .unwrap();

        assert!(app.sync.drag().current().is_none());
        assert_eq!(column_titles(&app, 2), vec!["A"]);
        assert!(column_titles(&app, 0).is_empty());
    }

    #[test]
    fn test_mouse_release_outside_columns_cancels() {
        let mut app = app();
        add_task(&mut app, "A");
        screen(&mut app);
        let (card, _) = app.hits.cards[0].clone();
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), card.x + 2, card.y + 1))
            .unwrap();
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0))
            .unwrap();
        assert!(app.sync.drag().current().is_none());
        assert_eq!(column_titles(&app, 0), vec!["A"]);
    }

    #[test]
    fn test_search_hides_tasks_and_skips_cursor() {
        let mut app = app();
        add_task(&mut app, "Buy Milk");
        add_task(&mut app, "Walk dog");
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "DOG");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.sync.search(), "DOG");
        assert_eq!(app.visible_len(0), 1);
        assert_eq!(app.current_task().map(|t| t.title.as_str()), Some("Walk dog"));
        let text = screen(&mut app);
        assert!(text.contains("To Do (1/2)"));
        assert!(!text.contains("Buy Milk"));
    }

    #[test]
    fn test_delete_task_waits_for_confirmation() {
        let mut app = app();
        add_task(&mut app, "Temp");
        press(&mut app, KeyCode::Char('d'));
        assert!(app.pending.is_some());

        app.resolve_pending(&mut Answer(false)).unwrap();
        assert_eq!(app.sync.board().task_count(), 1);
        assert_eq!(app.status, "Delete canceled");

        press(&mut app, KeyCode::Char('d'));
        app.resolve_pending(&mut Answer(true)).unwrap();
        assert_eq!(app.sync.board().task_count(), 0);
        assert!(app.pending.is_none());
    }

    #[test]
    fn test_column_add_rename_delete() {
        let mut app = app();
        press(&mut app, KeyCode::Char('C'));
        type_text(&mut app, "Backlog");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.sync.view().columns[3].title, "Backlog");

        app.selected_column = 3;
        press(&mut app, KeyCode::Char('R'));
        for _ in 0.."Backlog".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "Icebox");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.sync.view().columns[3].title, "Icebox");

        press(&mut app, KeyCode::Char('X'));
        app.resolve_pending(&mut Answer(true)).unwrap();
        assert_eq!(app.sync.view().columns.len(), 3);
        assert_eq!(app.selected_column, 2);
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let (mut app, mut mem) = app_with_store();
        add_task(&mut app, "Local");
        mem.set(
            STATE_KEY,
            r#"{"columns":[{"id":"x","title":"Elsewhere","tasks":[{"id":"t","title":"Remote","priority":"low","dueDate":""}]}]}"#,
        )
        .unwrap();

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.sync.view().columns.len(), 1);
        assert_eq!(column_titles(&app, 0), vec!["Remote"]);
        assert_eq!(app.selected_column, 0);
        assert!(app.status.starts_with("Reloaded"));

        let help: String = footer_help_line()
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert!(help.contains("r reload"));
    }

    #[test]
    fn test_truncate_and_offsets() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title here", 10), "a long ...");
        assert_eq!(truncate_text("abcdef", 2), "..");
        assert_eq!(adjust_offset(5, 0, 3, 0, 10), 3);
        assert_eq!(adjust_offset(0, 4, 3, 0, 10), 0);
        assert_eq!(adjust_offset(2, 0, 0, 0, 10), 0);
    }
}
