use crate::model::{normalize_title, Board, BoardError, Column, DueDate, Priority, Task};
use crate::storage::Persistence;
use anyhow::{Context, Result};
use rand::Rng;
use tracing::{debug, info, warn};

/// Key the serialized board lives under.
pub const STATE_KEY: &str = "kanbanState";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// `_` followed by nine random base-36 characters. Not collision checked.
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> String {
        let mut rng = rand::thread_rng();
        let body: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        format!("_{}", body)
    }
}

/// Owns the board and writes it through to persistence after every change.
///
/// Mutations never fail on bad input: an empty title, an unknown id or a
/// same-column move leaves the board untouched and returns `Ok(false)`.
/// Only persistence failures surface as errors.
pub struct Store {
    board: Board,
    persistence: Box<dyn Persistence>,
    ids: Box<dyn IdSource>,
}

impl Store {
    pub fn open(persistence: Box<dyn Persistence>, ids: Box<dyn IdSource>) -> Result<Self> {
        let mut store = Store {
            board: Board::default(),
            persistence,
            ids,
        };
        store.load()?;
        Ok(store)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Replaces the board with the persisted one. Missing or unparseable
    /// data yields the default three columns.
    pub fn load(&mut self) -> Result<()> {
        let saved = self
            .persistence
            .get(STATE_KEY)
            .context("reading persisted board")?;
        let parsed = saved.and_then(|blob| match serde_json::from_str::<Board>(&blob) {
            Ok(board) => Some(board),
            Err(err) => {
                warn!(error = %err, "discarding unreadable board state");
                None
            }
        });
        self.board = match parsed {
            Some(board) => {
                debug!(columns = board.columns.len(), "loaded board");
                board
            }
            None => {
                let ids = &mut self.ids;
                info!("starting with default columns");
                Board::with_default_columns(|| ids.next_id())
            }
        };
        Ok(())
    }

    pub fn save(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.board).context("serializing board")?;
        self.persistence
            .set(STATE_KEY, &blob)
            .context("writing board state")?;
        Ok(())
    }

    pub fn add_column(&mut self, title: &str) -> Result<bool> {
        let outcome = normalize_title(title).map(|title| {
            let column = Column::new(self.ids.next_id(), title);
            self.board.push_column(column);
        });
        self.commit("add column", outcome)
    }

    pub fn rename_column(&mut self, id: &str, title: &str) -> Result<bool> {
        let outcome =
            normalize_title(title).and_then(|title| self.board.rename_column(id, title));
        self.commit("rename column", outcome)
    }

    pub fn delete_column(&mut self, id: &str) -> Result<bool> {
        let outcome = self.board.remove_column(id).map(|_| ());
        self.commit("delete column", outcome)
    }

    pub fn add_task(
        &mut self,
        column_id: &str,
        title: &str,
        priority: Priority,
        due_date: Option<DueDate>,
    ) -> Result<bool> {
        let outcome = normalize_title(title).and_then(|title| {
            if self.board.column(column_id).is_none() {
                return Err(BoardError::ColumnNotFound(column_id.to_string()));
            }
            let task = Task::new(self.ids.next_id(), title, priority, due_date);
            self.board.add_task(task, column_id)
        });
        self.commit("add task", outcome)
    }

    pub fn edit_task(
        &mut self,
        task_id: &str,
        title: &str,
        priority: Priority,
        due_date: Option<DueDate>,
    ) -> Result<bool> {
        let outcome = normalize_title(title).and_then(|title| {
            self.board.update_task(task_id, |task| {
                task.title = title;
                task.priority = priority;
                task.due_date = due_date;
            })
        });
        self.commit("edit task", outcome)
    }

    pub fn delete_task(&mut self, column_id: &str, task_id: &str) -> Result<bool> {
        let outcome = self.board.remove_task(column_id, task_id).map(|_| ());
        self.commit("delete task", outcome)
    }

    pub fn move_task(&mut self, task_id: &str, from_column_id: &str, to_column_id: &str) -> Result<bool> {
        let outcome = self.board.move_task(task_id, from_column_id, to_column_id);
        self.commit("move task", outcome)
    }

    fn commit(&mut self, action: &str, outcome: Result<(), BoardError>) -> Result<bool> {
        match outcome {
            Ok(()) => {
                self.save()?;
                info!(action, "board updated");
                Ok(true)
            }
            Err(err) => {
                debug!(action, reason = %err, "ignored");
                Ok(false)
            }
        }
    }
}
