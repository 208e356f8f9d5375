//! Projection of the board into a renderable tree, plus the interaction
//! rules that turn drags, form submissions and deletions into store calls.
//!
//! Every successful mutation ends the same way: the store persists, the
//! whole view is rebuilt from the board and the search filter is applied
//! again. Visibility does not survive a rebuild on its own.

use crate::form::{ColumnForm, Modal, TaskForm};
use crate::model::{Board, ColumnId, DueDate, Priority, TaskId};
use crate::store::Store;
use anyhow::Result;
use chrono::NaiveDate;
use std::fmt::Write as _;
use tracing::{debug, info};

pub const DELETE_COLUMN_PROMPT: &str =
    "Are you sure you want to delete this column and all its tasks?";
pub const DELETE_TASK_PROMPT: &str = "Are you sure you want to delete this task?";

/// Yes/no gate in front of destructive operations.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnView {
    pub id: ColumnId,
    pub title: String,
    pub tasks: Vec<TaskView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub column_id: ColumnId,
    pub title: String,
    pub priority: Priority,
    pub badge: &'static str,
    pub due: Option<String>,
    pub dragging: bool,
    pub visible: bool,
}

impl BoardView {
    /// Rebuilds the full tree. Output depends only on the arguments.
    pub fn render(board: &Board, drag: &DragController, date_format: &str) -> Self {
        let columns = board
            .columns
            .iter()
            .map(|column| ColumnView {
                id: column.id.clone(),
                title: column.title.clone(),
                tasks: column
                    .tasks
                    .iter()
                    .map(|task| TaskView {
                        id: task.id.clone(),
                        column_id: column.id.clone(),
                        title: task.title.clone(),
                        priority: task.priority,
                        badge: task.priority.label(),
                        due: task.due_date.as_ref().map(|d| due_label(d, date_format)),
                        dragging: drag.is_dragging(&task.id),
                        visible: true,
                    })
                    .collect(),
            })
            .collect();
        BoardView { columns }
    }

    /// Case-insensitive substring match on titles; empty text shows all.
    pub fn apply_search_filter(&mut self, search: &str) {
        let needle = search.to_lowercase();
        for task in self.columns.iter_mut().flat_map(|c| c.tasks.iter_mut()) {
            task.visible = task.title.to_lowercase().contains(&needle);
        }
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&TaskView> {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .find(|t| t.id == id)
    }

    pub fn visible_count(&self) -> usize {
        self.columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .filter(|t| t.visible)
            .count()
    }
}

impl ColumnView {
    pub fn visible_tasks(&self) -> impl Iterator<Item = &TaskView> {
        self.tasks.iter().filter(|t| t.visible)
    }
}

/// Display form of a due date. Falls back to ISO when the configured
/// format cannot be rendered.
pub fn format_due(date: NaiveDate, date_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(date_format)).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

/// Stored text that is not a date is shown as written.
fn due_label(due: &DueDate, date_format: &str) -> String {
    match due.date() {
        Some(date) => format_due(date, date_format),
        None => due.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragSource {
    pub task_id: TaskId,
    pub column_id: ColumnId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DropEffect {
    Move,
    None,
}

/// At most one drag in flight.
#[derive(Debug, Default)]
pub struct DragController {
    current: Option<DragSource>,
}

impl DragController {
    /// Records the drag and returns the payload carried with it.
    pub fn start(&mut self, source: DragSource) -> &str {
        &self.current.insert(source).task_id
    }

    pub fn end(&mut self) -> Option<DragSource> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&DragSource> {
        self.current.as_ref()
    }

    pub fn is_dragging(&self, task_id: &str) -> bool {
        self.current
            .as_ref()
            .map(|d| d.task_id == task_id)
            .unwrap_or(false)
    }
}

/// Result of submitting a modal form.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// The store accepted the form and the modal closed.
    Applied,
    /// The form passed validation but referred to something that no longer
    /// exists; the modal closed without changes.
    Ignored,
    /// Validation failed; the modal stays open.
    Rejected(Rejection),
    NoModal,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Rejection {
    #[error("title is required")]
    EmptyTitle,
    #[error("the task's column does not exist")]
    MissingColumn,
    #[error("invalid due date {0:?} (use YYYY-MM-DD)")]
    InvalidDueDate(String),
}

pub struct Synchronizer {
    store: Store,
    drag: DragController,
    search: String,
    date_format: String,
    modal: Option<Modal>,
    view: BoardView,
}

impl Synchronizer {
    pub fn new(store: Store, date_format: impl Into<String>) -> Self {
        let mut sync = Synchronizer {
            store,
            drag: DragController::default(),
            search: String::new(),
            date_format: date_format.into(),
            modal: None,
            view: BoardView { columns: Vec::new() },
        };
        sync.refresh();
        sync
    }

    pub fn board(&self) -> &Board {
        self.store.board()
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn modal_mut(&mut self) -> Option<&mut Modal> {
        self.modal.as_mut()
    }

    pub fn render_board(&mut self) {
        self.view = BoardView::render(self.store.board(), &self.drag, &self.date_format);
    }

    pub fn apply_search_filter(&mut self) {
        self.view.apply_search_filter(&self.search);
    }

    /// Full rebuild followed by the filter.
    pub fn refresh(&mut self) {
        self.render_board();
        self.apply_search_filter();
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
        self.apply_search_filter();
    }

    /// Re-reads persisted state, replacing the in-memory board.
    pub fn reload(&mut self) -> Result<()> {
        self.store.load()?;
        self.drag.end();
        self.refresh();
        Ok(())
    }

    pub fn open_task_form(&mut self, task_id: Option<&str>, column_id: &str) {
        let form = task_id
            .and_then(|id| self.store.board().task(id))
            .map(|task| TaskForm::for_task(task, column_id))
            .unwrap_or_else(|| TaskForm::blank(column_id));
        self.modal = Some(Modal::Task(form));
    }

    pub fn open_column_form(&mut self, column_id: Option<&str>) {
        let form = column_id
            .and_then(|id| self.store.board().column(id))
            .map(ColumnForm::for_column)
            .unwrap_or_else(ColumnForm::blank);
        self.modal = Some(Modal::Column(form));
    }

    pub fn close_modal(&mut self) -> Option<Modal> {
        self.modal.take()
    }

    /// Submits whichever form is open. Closes it unless validation fails.
    pub fn submit_modal(&mut self) -> Result<Submission> {
        let outcome = match &self.modal {
            Some(Modal::Task(form)) => {
                let form = form.clone();
                self.submit_task_form(&form)?
            }
            Some(Modal::Column(form)) => {
                let form = form.clone();
                self.submit_column_form(&form)?
            }
            None => return Ok(Submission::NoModal),
        };
        if !matches!(outcome, Submission::Rejected(_)) {
            self.modal = None;
        }
        Ok(outcome)
    }

    pub fn submit_task_form(&mut self, form: &TaskForm) -> Result<Submission> {
        let title = form.title.value.trim();
        if title.is_empty() {
            return Ok(Submission::Rejected(Rejection::EmptyTitle));
        }
        if self.store.board().column(&form.column_id).is_none() {
            return Ok(Submission::Rejected(Rejection::MissingColumn));
        }
        let due = match form.due_date() {
            Ok(due) => due,
            Err(_) => {
                return Ok(Submission::Rejected(Rejection::InvalidDueDate(
                    form.due.value.trim().to_string(),
                )))
            }
        };
        let applied = if form.edit_id.is_empty() {
            self.store
                .add_task(&form.column_id, title, form.priority, due)?
        } else {
            self.store
                .edit_task(&form.edit_id, title, form.priority, due)?
        };
        Ok(self.after_submit(applied))
    }

    pub fn submit_column_form(&mut self, form: &ColumnForm) -> Result<Submission> {
        let title = form.title.value.trim();
        if title.is_empty() {
            return Ok(Submission::Rejected(Rejection::EmptyTitle));
        }
        let applied = if form.edit_id.is_empty() {
            self.store.add_column(title)?
        } else {
            self.store.rename_column(&form.edit_id, title)?
        };
        Ok(self.after_submit(applied))
    }

    fn after_submit(&mut self, applied: bool) -> Submission {
        self.refresh();
        if applied {
            Submission::Applied
        } else {
            Submission::Ignored
        }
    }

    /// Asks first; only a confirmed delete of an existing column mutates.
    pub fn delete_column(&mut self, column_id: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        if self.store.board().column(column_id).is_none() {
            return Ok(false);
        }
        if !confirm.confirm(DELETE_COLUMN_PROMPT) {
            debug!(column_id, "column delete declined");
            return Ok(false);
        }
        let applied = self.store.delete_column(column_id)?;
        self.refresh();
        Ok(applied)
    }

    pub fn delete_task(
        &mut self,
        column_id: &str,
        task_id: &str,
        confirm: &mut dyn Confirm,
    ) -> Result<bool> {
        let exists = self
            .store
            .board()
            .column(column_id)
            .map(|c| c.tasks.iter().any(|t| t.id == task_id))
            .unwrap_or(false);
        if !exists {
            return Ok(false);
        }
        if !confirm.confirm(DELETE_TASK_PROMPT) {
            debug!(task_id, "task delete declined");
            return Ok(false);
        }
        let applied = self.store.delete_task(column_id, task_id)?;
        self.refresh();
        Ok(applied)
    }

    /// Begins dragging a task. Returns the payload, or `None` if the task
    /// is not on the board. The dragging marker shows on the next render.
    pub fn drag_start(&mut self, task_id: &str) -> Option<String> {
        let (c_idx, _) = self.store.board().find_task(task_id)?;
        let source = DragSource {
            task_id: task_id.to_string(),
            column_id: self.store.board().columns[c_idx].id.clone(),
        };
        let payload = self.drag.start(source).to_string();
        self.refresh();
        Some(payload)
    }

    /// Clears the drag whether or not a drop happened.
    pub fn drag_end(&mut self) -> Option<DragSource> {
        let ended = self.drag.end();
        if ended.is_some() {
            self.refresh();
        }
        ended
    }

    /// Task lists accept drops; anything else does not.
    pub fn drag_over(&self, column_id: &str) -> DropEffect {
        if self.store.board().column(column_id).is_some() {
            DropEffect::Move
        } else {
            DropEffect::None
        }
    }

    /// Moves the dragged task to the end of `column_id`. Ignored when
    /// nothing is being dragged.
    pub fn drop_on(&mut self, column_id: &str) -> Result<bool> {
        let source = match self.drag.current() {
            Some(source) => source.clone(),
            None => return Ok(false),
        };
        let moved = self
            .store
            .move_task(&source.task_id, &source.column_id, column_id)?;
        if moved {
            info!(task_id = %source.task_id, to = column_id, "task dropped");
            if let Some(current) = self.drag.end() {
                self.drag.start(DragSource {
                    column_id: column_id.to_string(),
                    ..current
                });
            }
            self.refresh();
        }
        Ok(moved)
    }
}
