use crate::config::Config;
use crate::model::{DueDate, Priority, DUE_DATE_FORMAT};
use crate::storage::{init_project_store, locate_store, FileStore, Persistence, StoreLocation};
use crate::store::{RandomIds, Store, STATE_KEY};
use crate::ui;
use crate::view::{BoardView, Confirm, Synchronizer};
use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use std::env;
use std::io::{self, BufRead, Write};

/// Confirmation read from stdin, or granted up front with `--yes`.
pub struct StdinConfirm {
    assume_yes: bool,
}

impl StdinConfirm {
    pub fn new(assume_yes: bool) -> Self {
        StdinConfirm { assume_yes }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn init(config: &Config) -> Result<()> {
    let location = match &config.store_dir {
        Some(_) => current_location(config)?,
        None => init_project_store()?,
    };
    let mut store = open_store(&location)?;
    if FileStore::new(&location.dir).get(STATE_KEY)?.is_none() {
        store.save()?;
    }
    println!("Initialized board at {}", location.dir.display());
    Ok(())
}

pub fn list(config: &Config, column: Option<String>, search: Option<String>) -> Result<()> {
    let (sync, location) = load_current(config)?;
    println!(
        "Board: {} ({})",
        location.dir.display(),
        location.scope.label()
    );
    let mut view = BoardView::render(sync.board(), sync.drag(), &config.date_format);
    view.apply_search_filter(search.as_deref().unwrap_or_default());
    print!("{}", render_listing(&view, column.as_deref()));
    Ok(())
}

pub fn add_column(config: &Config, title: String) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    if !sync.store_mut().add_column(&title)? {
        bail!("column title is required");
    }
    let id = sync
        .board()
        .columns
        .last()
        .map(|c| c.id.clone())
        .unwrap_or_default();
    println!("Added column {} ({})", title.trim(), id);
    Ok(())
}

pub fn rename_column(config: &Config, column_id: String, title: String) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    if !sync.store_mut().rename_column(&column_id, &title)? {
        bail!("could not rename column {} (unknown id or empty title)", column_id);
    }
    println!("Renamed column {}", column_id);
    Ok(())
}

pub fn delete_column(config: &Config, column_id: String, yes: bool) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    if sync.board().column(&column_id).is_none() {
        bail!("column not found: {}", column_id);
    }
    if sync.delete_column(&column_id, &mut StdinConfirm::new(yes))? {
        println!("Deleted column {}", column_id);
    } else {
        println!("Kept column {}", column_id);
    }
    Ok(())
}

pub fn add(
    config: &Config,
    title: String,
    column: Option<String>,
    priority: Priority,
    due: Option<String>,
) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    let column_id = column
        .or_else(|| sync.board().columns.first().map(|c| c.id.clone()))
        .ok_or_else(|| anyhow!("board has no columns"))?;
    let due_date = parse_due(due.as_deref())?.map(DueDate::from);
    let added = sync
        .store_mut()
        .add_task(&column_id, &title, priority, due_date)
        .with_context(|| format!("adding task to column {}", column_id))?;
    if !added {
        bail!("could not add task to {} (unknown column or empty title)", column_id);
    }
    let id = sync
        .board()
        .column(&column_id)
        .and_then(|c| c.tasks.last())
        .map(|t| t.id.clone())
        .unwrap_or_default();
    println!("Added task {} to {}", id, column_id);
    Ok(())
}

pub fn edit(
    config: &Config,
    task_id: String,
    title: Option<String>,
    priority: Option<Priority>,
    due: Option<String>,
    clear_due: bool,
) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    let current = sync
        .board()
        .task(&task_id)
        .cloned()
        .ok_or_else(|| anyhow!("task {} not found", task_id))?;
    let due_date = if clear_due {
        None
    } else {
        parse_due(due.as_deref())?
            .map(DueDate::from)
            .or(current.due_date)
    };
    let title = title.unwrap_or(current.title);
    let priority = priority.unwrap_or(current.priority);
    if !sync
        .store_mut()
        .edit_task(&task_id, &title, priority, due_date)?
    {
        bail!("title is required");
    }
    println!("Updated task {}", task_id);
    Ok(())
}

pub fn delete(config: &Config, task_id: String, yes: bool) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    let (c_idx, _) = sync
        .board()
        .find_task(&task_id)
        .ok_or_else(|| anyhow!("task {} not found", task_id))?;
    let column_id = sync.board().columns[c_idx].id.clone();
    if sync.delete_task(&column_id, &task_id, &mut StdinConfirm::new(yes))? {
        println!("Deleted task {}", task_id);
    } else {
        println!("Kept task {}", task_id);
    }
    Ok(())
}

pub fn move_task(config: &Config, task_id: String, column_id: String) -> Result<()> {
    let (mut sync, _) = load_current(config)?;
    let (c_idx, _) = sync
        .board()
        .find_task(&task_id)
        .ok_or_else(|| anyhow!("task {} not found", task_id))?;
    let from = sync.board().columns[c_idx].id.clone();
    if from == column_id {
        println!("Task {} is already in {}", task_id, column_id);
        return Ok(());
    }
    if !sync.store_mut().move_task(&task_id, &from, &column_id)? {
        bail!("column not found: {}", column_id);
    }
    println!("Moved task {} to {}", task_id, column_id);
    Ok(())
}

pub fn tui(config: &Config) -> Result<()> {
    let (sync, location) = load_current(config)?;
    ui::run(sync, location)
}

pub fn current_location(config: &Config) -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    locate_store(&cwd, config.store_dir.as_deref())
}

fn open_store(location: &StoreLocation) -> Result<Store> {
    Store::open(
        Box::new(FileStore::new(&location.dir)),
        Box::new(RandomIds),
    )
}

fn load_current(config: &Config) -> Result<(Synchronizer, StoreLocation)> {
    let location = current_location(config)?;
    let store = open_store(&location)?;
    Ok((Synchronizer::new(store, config.date_format.clone()), location))
}

fn parse_due(input: Option<&str>) -> Result<Option<NaiveDate>> {
    let raw = match input {
        Some(r) => r.trim(),
        None => return Ok(None),
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw, DUE_DATE_FORMAT)
        .map_err(|_| anyhow!("invalid date format (use YYYY-MM-DD): {}", raw))?;
    Ok(Some(date))
}

fn render_listing(view: &BoardView, only_column: Option<&str>) -> String {
    let mut out = String::new();
    for column in &view.columns {
        if only_column.is_some_and(|filter| filter != column.id) {
            continue;
        }
        out.push_str(&format!("{} [{}]\n", column.title, column.id));
        let mut shown = 0;
        for task in column.visible_tasks() {
            shown += 1;
            out.push_str(&format!("  - {}: {} ({})", task.id, task.title, task.badge));
            if let Some(due) = &task.due {
                out.push_str(&format!(" due {}", due));
            }
            out.push('\n');
        }
        if shown == 0 {
            out.push_str("  (empty)\n");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::memory_store;

    #[test]
    fn test_parse_due() {
        assert_eq!(parse_due(None).unwrap(), None);
        assert_eq!(parse_due(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_due(Some("2026-02-28")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28)
        );
        assert!(parse_due(Some("2026-02-30")).is_err());
    }

    #[test]
    fn test_yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
        assert!(StdinConfirm::new(true).confirm("delete?"));
    }

    #[test]
    fn test_listing_applies_filter_and_column() {
        let (mut store, _, _) = memory_store();
        let todo = store.board().columns[0].id.clone();
        store
            .add_task(
                &todo,
                "Buy Milk",
                Priority::High,
                NaiveDate::from_ymd_opt(2026, 6, 1).map(DueDate::from),
            )
            .unwrap();
        store.add_task(&todo, "Call mum", Priority::Low, None).unwrap();
        let sync = Synchronizer::new(store, "%Y-%m-%d");

        let mut view = BoardView::render(sync.board(), sync.drag(), "%Y-%m-%d");
        view.apply_search_filter("MILK");
        let listing = render_listing(&view, Some(&todo));
        assert!(listing.starts_with(&format!("To Do [{}]\n", todo)));
        assert!(listing.contains("Buy Milk (High) due 2026-06-01"));
        assert!(!listing.contains("Call mum"));
        assert!(!listing.contains("In Progress"));

        view.apply_search_filter("");
        let listing = render_listing(&view, None);
        assert!(listing.contains("Call mum (Low)\n"));
        assert!(listing.contains("Done ["));
        assert!(listing.contains("  (empty)\n"));
    }
}
