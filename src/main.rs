// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, connect, run one
//   command.
// - Returns `anyhow::Result` so every failure exits non-zero with a message.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use joplin_cli::{ui, Client, ClientConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "joplin-cli", version, about = "Manage Joplin notes from the command line")]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Retrieve a note with a given ID. Optionally specify which fields to return.
    #[command(name = "getnote", alias = "get")]
    GetNote {
        id: String,
        fields: Vec<String>,
    },

    /// Retrieve all the notes. Optionally specify which fields and in which order.
    #[command(name = "getallnotes", alias = "getall")]
    GetAllNotes {
        fields: Vec<String>,
        /// Order by field
        #[arg(long)]
        order_by: Option<String>,
        /// Order direction (asc/desc)
        #[arg(long)]
        order_dir: Option<String>,
    },

    /// Create a new note from an existing file. Optionally specify the format.
    #[command(name = "createnote", alias = "new")]
    CreateNote {
        path: PathBuf,
        /// Format of the note (markdown/html)
        #[arg(short, long, default_value = "markdown")]
        format: String,
        /// Delete the source file afterward
        #[arg(short, long)]
        delete: bool,
    },

    /// Update a note with a given ID: field1 value1 [... fieldN valueN].
    #[command(name = "updatenote", alias = "update")]
    UpdateNote {
        id: String,
        #[arg(required = true, num_args = 2..)]
        properties: Vec<String>,
    },

    /// Delete a note.
    #[command(name = "deletenote", alias = "del")]
    DeleteNote {
        id: String,
        /// Permanently delete the note
        #[arg(short, long)]
        permanent: bool,
        /// Skip the confirmation for permanent deletes
        #[arg(short, long)]
        yes: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,joplin_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ClientConfig::from_env();
    let mut spinner = ui::ApprovalSpinner::new();
    let client =
        Client::connect_with(&config, &mut spinner).context("Error initializing client")?;
    drop(spinner);

    run(&client, cli.command, cli.verbose)
}

fn run(client: &Client, command: Command, verbose: bool) -> Result<()> {
    let notes = client.notes();
    match command {
        Command::GetNote { id, fields } => {
            let note = notes.get(&id, &fields.join(","))?;
            ui::print_json(&note)?;
        }
        Command::GetAllNotes {
            fields,
            order_by,
            order_dir,
        } => {
            let all = notes.get_all(&fields.join(","), order_by.as_deref(), order_dir.as_deref())?;
            ui::print_json(&all)?;
        }
        Command::CreateNote {
            path,
            format,
            delete,
        } => {
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let note = notes.create(&ui::title_from_path(&path), &format, &body)?;
            if verbose {
                ui::print_json(&note)?;
            }
            if delete {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Command::UpdateNote { id, properties } => {
            let note = notes.update(&id, &properties)?;
            if verbose {
                ui::print_json(&note)?;
            }
        }
        Command::DeleteNote { id, permanent, yes } => {
            if permanent && !yes && !ui::confirm_permanent_delete(&id)? {
                anyhow::bail!("Deletion of note {id} cancelled");
            }
            let id = notes.delete(&id, permanent)?;
            if verbose {
                println!("Removed note with ID: {id}");
            }
        }
    }
    Ok(())
}
