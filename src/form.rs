use crate::model::{Column, ColumnId, DueDate, Priority, Task, DUE_DATE_FORMAT};
use chrono::NaiveDate;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    cursor: usize,
}

impl FieldValue {
    pub fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    pub fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskField {
    Title,
    Priority,
    Due,
}

/// Task modal. `edit_id` empty means the form creates a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskForm {
    pub edit_id: String,
    pub column_id: ColumnId,
    pub title: FieldValue,
    pub priority: Priority,
    pub due: FieldValue,
    pub field: TaskField,
    /// Due date the task had when the form opened.
    stored_due: Option<DueDate>,
}

/// Column modal. `edit_id` empty means the form creates a column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnForm {
    pub edit_id: String,
    pub title: FieldValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    Task(TaskForm),
    Column(ColumnForm),
}

impl TaskForm {
    pub fn blank(column_id: &str) -> Self {
        TaskForm {
            edit_id: String::new(),
            column_id: column_id.to_string(),
            title: FieldValue::default(),
            priority: Priority::Medium,
            due: FieldValue::default(),
            field: TaskField::Title,
            stored_due: None,
        }
    }

    pub fn for_task(task: &Task, column_id: &str) -> Self {
        TaskForm {
            edit_id: task.id.clone(),
            column_id: column_id.to_string(),
            title: FieldValue::new(&task.title),
            priority: task.priority,
            due: FieldValue::new(
                &task
                    .due_date
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            ),
            field: TaskField::Title,
            stored_due: task.due_date.clone(),
        }
    }

    pub fn heading(&self) -> &'static str {
        if self.edit_id.is_empty() {
            "Add Task"
        } else {
            "Edit Task"
        }
    }

    /// Empty input means no due date. Stored text that is not a
    /// `YYYY-MM-DD` date is accepted only while left untouched.
    pub fn due_date(&self) -> Result<Option<DueDate>, chrono::ParseError> {
        let raw = self.due.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Some(DueDate::Text(text)) = &self.stored_due {
            if text.trim() == raw {
                return Ok(self.stored_due.clone());
            }
        }
        NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT).map(|date| Some(DueDate::Date(date)))
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            TaskField::Title => TaskField::Priority,
            TaskField::Priority => TaskField::Due,
            TaskField::Due => TaskField::Title,
        };
    }

    pub fn prev_field(&mut self) {
        self.field = match self.field {
            TaskField::Title => TaskField::Due,
            TaskField::Priority => TaskField::Title,
            TaskField::Due => TaskField::Priority,
        };
    }

    /// Text field under focus; `None` while the priority selector is active.
    pub fn active_text_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            TaskField::Title => Some(&mut self.title),
            TaskField::Due => Some(&mut self.due),
            TaskField::Priority => None,
        }
    }
}

impl ColumnForm {
    pub fn blank() -> Self {
        ColumnForm {
            edit_id: String::new(),
            title: FieldValue::default(),
        }
    }

    pub fn for_column(column: &Column) -> Self {
        ColumnForm {
            edit_id: column.id.clone(),
            title: FieldValue::new(&column.title),
        }
    }

    pub fn heading(&self) -> &'static str {
        if self.edit_id.is_empty() {
            "Add Column"
        } else {
            "Edit Column"
        }
    }
}

impl Modal {
    pub fn heading(&self) -> &'static str {
        match self {
            Modal::Task(form) => form.heading(),
            Modal::Column(form) => form.heading(),
        }
    }
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(cursor)
}
