use crate::model::Priority;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "Terminal kanban task board")]
pub struct Cli {
    /// Directory holding the board state (overrides project/global discovery)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project board store in the current directory
    Init,
    /// List columns and their tasks
    List {
        /// Only show this column id
        #[arg(long)]
        column: Option<String>,
        /// Only show tasks whose title contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Append a column
    AddColumn {
        title: String,
    },
    /// Rename a column
    RenameColumn {
        column_id: String,
        title: String,
    },
    /// Delete a column and all of its tasks
    DeleteColumn {
        column_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Add a task
    Add {
        /// Title of the task
        title: String,
        /// Column id to place the task (defaults to first column)
        #[arg(long)]
        column: Option<String>,
        /// low, medium or high
        #[arg(long, short = 'p', default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due date in YYYY-MM-DD format
        #[arg(long)]
        due: Option<String>,
    },
    /// Edit an existing task
    Edit {
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short = 'p')]
        priority: Option<Priority>,
        /// Set due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Clear due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Delete a task
    Delete {
        task_id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Move a task to the end of another column
    Move {
        task_id: String,
        column_id: String,
    },
    /// Launch the interactive board
    Tui,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_priority() {
        let cli = Cli::try_parse_from([
            "taskboard", "add", "Write report", "--priority", "HIGH", "--due", "2026-01-31",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Add {
                title,
                priority,
                due,
                column,
            }) => {
                assert_eq!(title, "Write report");
                assert_eq!(priority, Priority::High);
                assert_eq!(due.as_deref(), Some("2026-01-31"));
                assert!(column.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_store_flag_and_default_command() {
        let cli = Cli::try_parse_from(["taskboard", "--store", "/tmp/board"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/board")));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["taskboard", "list", "--store", "/tmp/b"]).unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/b")));
    }

    #[test]
    fn test_rejects_unknown_priority_and_conflicting_due() {
        assert!(Cli::try_parse_from(["taskboard", "add", "X", "-p", "urgent"]).is_err());
        assert!(Cli::try_parse_from([
            "taskboard", "edit", "_a", "--due", "2026-01-01", "--clear-due"
        ])
        .is_err());
    }
}
