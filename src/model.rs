use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ColumnId = String;
pub type TaskId = String;

pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Input and storage format for due dates.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Board {
    pub columns: Vec<Column>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "dueDate", default, with = "due_date_format")]
    pub due_date: Option<DueDate>,
}

/// A stored due date. Text that is not `YYYY-MM-DD` is kept verbatim so
/// it is written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueDate {
    Date(NaiveDate),
    Text(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("title is required")]
    EmptyTitle,
    #[error("task {0} is already in column {1}")]
    SameColumn(String, String),
    #[error("unknown priority: {0} (expected low, medium or high)")]
    UnknownPriority(String),
}

/// Trims a user-supplied title, rejecting it when nothing is left.
pub fn normalize_title(raw: &str) -> Result<String, BoardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BoardError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

impl Board {
    /// Builds the first-run board: three empty columns with fresh ids.
    pub fn with_default_columns(mut next_id: impl FnMut() -> String) -> Self {
        Board {
            columns: DEFAULT_COLUMNS
                .iter()
                .map(|title| Column::new(next_id(), title.to_string()))
                .collect(),
        }
    }

    pub fn find_column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Locates a task anywhere on the board as `(column index, task index)`.
    pub fn find_task(&self, task_id: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(c_idx, column)| {
            column
                .tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|t_idx| (c_idx, t_idx))
        })
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.find_task(task_id)
            .map(|(c_idx, t_idx)| &self.columns[c_idx].tasks[t_idx])
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn rename_column(&mut self, id: &str, title: String) -> Result<(), BoardError> {
        let idx = self
            .find_column_index(id)
            .ok_or_else(|| BoardError::ColumnNotFound(id.to_string()))?;
        self.columns[idx].title = title;
        Ok(())
    }

    pub fn remove_column(&mut self, id: &str) -> Result<Column, BoardError> {
        let idx = self
            .find_column_index(id)
            .ok_or_else(|| BoardError::ColumnNotFound(id.to_string()))?;
        Ok(self.columns.remove(idx))
    }

    pub fn add_task(&mut self, task: Task, column_id: &str) -> Result<(), BoardError> {
        let idx = self
            .find_column_index(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        self.columns[idx].tasks.push(task);
        Ok(())
    }

    pub fn update_task<F>(&mut self, task_id: &str, f: F) -> Result<(), BoardError>
    where
        F: FnOnce(&mut Task),
    {
        let (c_idx, t_idx) = self
            .find_task(task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;
        f(&mut self.columns[c_idx].tasks[t_idx]);
        Ok(())
    }

    pub fn remove_task(&mut self, column_id: &str, task_id: &str) -> Result<Task, BoardError> {
        let c_idx = self
            .find_column_index(column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(column_id.to_string()))?;
        let tasks = &mut self.columns[c_idx].tasks;
        let t_idx = tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;
        Ok(tasks.remove(t_idx))
    }

    /// Moves a task to the end of another column. Reordering inside one
    /// column is not supported.
    pub fn move_task(
        &mut self,
        task_id: &str,
        from_column_id: &str,
        to_column_id: &str,
    ) -> Result<(), BoardError> {
        if from_column_id == to_column_id {
            return Err(BoardError::SameColumn(
                task_id.to_string(),
                to_column_id.to_string(),
            ));
        }
        let src_idx = self
            .find_column_index(from_column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(from_column_id.to_string()))?;
        let dest_idx = self
            .find_column_index(to_column_id)
            .ok_or_else(|| BoardError::ColumnNotFound(to_column_id.to_string()))?;
        let t_idx = self.columns[src_idx]
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| BoardError::TaskNotFound(task_id.to_string()))?;
        let task = self.columns[src_idx].tasks.remove(t_idx);
        self.columns[dest_idx].tasks.push(task);
        Ok(())
    }
}

impl Column {
    pub fn new(id: ColumnId, title: String) -> Self {
        Column {
            id,
            title,
            tasks: Vec::new(),
        }
    }
}

impl Task {
    pub fn new(id: TaskId, title: String, priority: Priority, due_date: Option<DueDate>) -> Self {
        Task {
            id,
            title,
            priority,
            due_date,
        }
    }
}

impl DueDate {
    /// Blank input means no due date.
    pub fn parse(raw: &str) -> Option<DueDate> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match NaiveDate::parse_from_str(trimmed, DUE_DATE_FORMAT) {
            Ok(date) => DueDate::Date(date),
            Err(_) => DueDate::Text(raw.to_string()),
        })
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DueDate::Date(date) => Some(*date),
            DueDate::Text(_) => None,
        }
    }
}

impl From<NaiveDate> for DueDate {
    fn from(date: NaiveDate) -> Self {
        DueDate::Date(date)
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Date(date) => write!(f, "{}", date.format(DUE_DATE_FORMAT)),
            DueDate::Text(text) => f.write_str(text),
        }
    }
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Badge text shown on a task card.
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn next(&self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }

    pub fn prev(&self) -> Priority {
        match self {
            Priority::Low => Priority::High,
            Priority::Medium => Priority::Low,
            Priority::High => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BoardError::UnknownPriority(s.to_string()))
    }
}

/// `dueDate` is a string, with `""` meaning unset.
mod due_date_format {
    use super::DueDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(due: &Option<DueDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match due {
            Some(due) => serializer.collect_str(due),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DueDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(DueDate::parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(columns: &[(&str, &[&str])]) -> Board {
        Board {
            columns: columns
                .iter()
                .map(|(id, tasks)| Column {
                    id: id.to_string(),
                    title: id.to_uppercase(),
                    tasks: tasks
                        .iter()
                        .map(|t| Task::new(t.to_string(), t.to_string(), Priority::Medium, None))
                        .collect(),
                })
                .collect(),
        }
    }

    fn titles(board: &Board, column: &str) -> Vec<String> {
        board
            .column(column)
            .map(|c| c.tasks.iter().map(|t| t.title.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_default_columns() {
        let mut n = 0;
        let board = Board::with_default_columns(|| {
            n += 1;
            format!("c{}", n)
        });
        let names: Vec<_> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(names, vec!["To Do", "In Progress", "Done"]);
        assert!(board.columns.iter().all(|c| c.tasks.is_empty()));
        assert_eq!(board.columns[2].id, "c3");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Write report \n").unwrap(), "Write report");
        assert_eq!(normalize_title("   "), Err(BoardError::EmptyTitle));
        assert_eq!(normalize_title(""), Err(BoardError::EmptyTitle));
    }

    #[test]
    fn test_move_appends_to_destination() {
        let mut board = board_with(&[("x", &["A", "B"]), ("y", &["C"])]);
        board.move_task("A", "x", "y").unwrap();
        assert_eq!(titles(&board, "x"), vec!["B"]);
        assert_eq!(titles(&board, "y"), vec!["C", "A"]);
        assert_eq!(board.task_count(), 3);
    }

    #[test]
    fn test_move_same_column_rejected() {
        let mut board = board_with(&[("x", &["A", "B"])]);
        let before = board.clone();
        assert!(matches!(
            board.move_task("A", "x", "x"),
            Err(BoardError::SameColumn(_, _))
        ));
        assert_eq!(board, before);
    }

    #[test]
    fn test_move_missing_references() {
        let mut board = board_with(&[("x", &["A"]), ("y", &[])]);
        let before = board.clone();
        assert_eq!(
            board.move_task("A", "nope", "y"),
            Err(BoardError::ColumnNotFound("nope".into()))
        );
        assert_eq!(
            board.move_task("A", "x", "nope"),
            Err(BoardError::ColumnNotFound("nope".into()))
        );
        assert_eq!(
            board.move_task("Z", "x", "y"),
            Err(BoardError::TaskNotFound("Z".into()))
        );
        // task exists but not in the named source column
        assert_eq!(
            board.move_task("A", "y", "x"),
            Err(BoardError::TaskNotFound("A".into()))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_update_task_keeps_position() {
        let mut board = board_with(&[("x", &["A", "B", "C"])]);
        board
            .update_task("B", |t| {
                t.title = "Beta".into();
                t.priority = Priority::High;
            })
            .unwrap();
        assert_eq!(titles(&board, "x"), vec!["A", "Beta", "C"]);
        assert_eq!(board.task("B").unwrap().priority, Priority::High);
    }

    #[test]
    fn test_remove_task_requires_matching_column() {
        let mut board = board_with(&[("x", &["A"]), ("y", &[])]);
        assert!(board.remove_task("y", "A").is_err());
        let removed = board.remove_task("x", "A").unwrap();
        assert_eq!(removed.id, "A");
        assert_eq!(board.task_count(), 0);
    }

    #[test]
    fn test_priority_parsing_and_labels() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::Medium.label(), "Medium");
        assert_eq!(Priority::High.next(), Priority::Low);
        assert_eq!(Priority::Low.prev(), Priority::High);
    }

    #[test]
    fn test_wire_format() {
        let mut board = board_with(&[("col", &[])]);
        board
            .add_task(
                Task::new(
                    "_abc".into(),
                    "Ship".into(),
                    Priority::High,
                    NaiveDate::from_ymd_opt(2026, 3, 9).map(DueDate::from),
                ),
                "col",
            )
            .unwrap();
        board
            .add_task(Task::new("_def".into(), "Plan".into(), Priority::Low, None), "col")
            .unwrap();
        let value = serde_json::to_value(&board).unwrap();
        let tasks = &value["columns"][0]["tasks"];
        assert_eq!(tasks[0]["priority"], "high");
        assert_eq!(tasks[0]["dueDate"], "2026-03-09");
        assert_eq!(tasks[1]["dueDate"], "");
    }

    #[test]
    fn test_lenient_optional_fields() {
        let json = r#"{"columns":[{"id":"a","title":"A","tasks":[
            {"id":"t1","title":"One"},
            {"id":"t2","title":"Two","priority":"low","dueDate":null},
            {"id":"t3","title":"Three","priority":"high","dueDate":"2025-12-31"}
        ]}]}"#;
        let board: Board = serde_json::from_str(json).unwrap();
        let tasks = &board.columns[0].tasks;
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].due_date, None);
        assert_eq!(tasks[1].due_date, None);
        assert_eq!(
            tasks[2].due_date.as_ref().and_then(DueDate::date),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn test_non_iso_due_date_kept_verbatim() {
        let json = r#"{"columns":[{"id":"a","title":"A","tasks":[
            {"id":"t1","title":"One","dueDate":"2026-03-09T00:00"},
            {"id":"t2","title":"Two","dueDate":"next week"}
        ]}]}"#;
        let board: Board = serde_json::from_str(json).unwrap();
        let tasks = &board.columns[0].tasks;
        assert_eq!(
            tasks[0].due_date,
            Some(DueDate::Text("2026-03-09T00:00".into()))
        );
        assert_eq!(tasks[1].due_date.as_ref().and_then(DueDate::date), None);

        let value = serde_json::to_value(&board).unwrap();
        assert_eq!(value["columns"][0]["tasks"][0]["dueDate"], "2026-03-09T00:00");
        assert_eq!(value["columns"][0]["tasks"][1]["dueDate"], "next week");
    }

    #[test]
    fn test_due_date_parse() {
        assert_eq!(DueDate::parse("  "), None);
        assert_eq!(
            DueDate::parse(" 2026-01-05 "),
            NaiveDate::from_ymd_opt(2026, 1, 5).map(DueDate::from)
        );
        assert_eq!(DueDate::parse("soon"), Some(DueDate::Text("soon".into())));
        assert_eq!(
            DueDate::from(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()).to_string(),
            "2026-01-05"
        );
    }
}
