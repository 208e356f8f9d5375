mod cli;
mod commands;
mod config;
mod form;
mod logging;
mod model;
mod storage;
mod store;
mod ui;
mod view;

use anyhow::Result;
use clap::Parser;
use cli::Command;
use config::Config;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = Config::from_env(args.store);
    let command = args.command.unwrap_or(Command::Tui);

    if matches!(command, Command::Tui) {
        let location = commands::current_location(&config)?;
        logging::init_file(&config.log_filter, &location.dir)?;
    } else {
        logging::init_stderr(&config.log_filter);
    }

    match command {
        Command::Init => commands::init(&config),
        Command::List { column, search } => commands::list(&config, column, search),
        Command::AddColumn { title } => commands::add_column(&config, title),
        Command::RenameColumn { column_id, title } => {
            commands::rename_column(&config, column_id, title)
        }
        Command::DeleteColumn { column_id, yes } => {
            commands::delete_column(&config, column_id, yes)
        }
        Command::Add {
            title,
            column,
            priority,
            due,
        } => commands::add(&config, title, column, priority, due),
        Command::Edit {
            task_id,
            title,
            priority,
            due,
            clear_due,
        } => commands::edit(&config, task_id, title, priority, due, clear_due),
        Command::Delete { task_id, yes } => commands::delete(&config, task_id, yes),
        Command::Move { task_id, column_id } => commands::move_task(&config, task_id, column_id),
        Command::Tui => commands::tui(&config),
    }
}
