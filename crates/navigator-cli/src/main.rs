use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use navigator::{
    default_data_dir, FileEntry, SessionId, SortCriterion, Workspace, WorkspaceState,
};

#[derive(Parser)]
#[command(
    name = "navigator-cli",
    about = "Headless front end for the file navigator workspace",
    version
)]
struct Cli {
    /// Data directory holding navigator.json and workspace.json.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one directory the way a browser shows it.
    #[command(alias = "ls")]
    List { path: Option<PathBuf> },
    /// Open a browser on PATH and keep it in the saved workspace.
    Open { path: PathBuf },
    /// Close saved browsers (all of them without an index).
    Close { index: Option<usize> },
    /// Move a saved browser through its directories.
    Nav {
        index: usize,
        #[command(subcommand)]
        step: NavStep,
    },
    /// Show saved browsers and pin lists.
    Status {
        /// Print the raw saved document instead.
        #[arg(long)]
        json: bool,
    },
    /// Search open browsers and pins, printing matches as they arrive.
    Search(SearchArgs),
    /// Manage pin lists.
    #[command(subcommand)]
    Pins(PinsCommand),
}

#[derive(Subcommand)]
enum NavStep {
    /// Go to PATH, recording it in the history.
    To { path: PathBuf },
    Back,
    Forward,
    Up,
    Refresh,
}

#[derive(Args)]
struct SearchArgs {
    query: String,
    /// Extra directories to search besides the saved browsers.
    #[arg(long = "root", value_name = "PATH")]
    roots: Vec<PathBuf>,
    /// Give up after this many seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand)]
enum PinsCommand {
    /// Print every list and its pins.
    List,
    /// Pin paths to a list (the active one by default).
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        list: Option<usize>,
    },
    /// Unpin paths from a list.
    Remove {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        list: Option<usize>,
    },
    /// Reorder a list.
    Sort {
        by: SortChoice,
        #[arg(long)]
        list: Option<usize>,
    },
    /// Set or clear the label of a pin.
    Label {
        path: String,
        label: Option<String>,
        #[arg(long)]
        list: Option<usize>,
    },
    /// Create a list and make it active.
    NewList { name: Option<String> },
    /// Rename a list.
    RenameList { index: usize, name: String },
    /// Delete a list.
    DropList { index: usize },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortChoice {
    Name,
    #[value(alias = "type")]
    FileType,
    Usage,
    Size,
    #[value(alias = "added")]
    DateAdded,
}

impl From<SortChoice> for SortCriterion {
    fn from(choice: SortChoice) -> Self {
        match choice {
            SortChoice::Name => SortCriterion::Name,
            SortChoice::FileType => SortCriterion::FileType,
            SortChoice::Usage => SortCriterion::Usage,
            SortChoice::Size => SortCriterion::Size,
            SortChoice::DateAdded => SortCriterion::DateAdded,
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    log::debug!("using data directory {}", data_dir.display());
    let mut workspace = Workspace::open(&data_dir)
        .with_context(|| format!("failed to open workspace in {}", data_dir.display()))?;

    match cli.command {
        Commands::List { path } => list(&mut workspace, path),
        Commands::Open { path } => {
            let id = workspace.registry_mut().add_session(&path)?;
            workspace.save_state()?;
            println!("opened {id} at {}", path.display());
            Ok(())
        }
        Commands::Close { index } => close(&mut workspace, index),
        Commands::Nav { index, step } => nav(&mut workspace, index, step),
        Commands::Status { json } => status(&workspace, json),
        Commands::Search(args) => search(&mut workspace, args),
        Commands::Pins(command) => {
            pins(&mut workspace, command)?;
            workspace.save_state()?;
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn list(workspace: &mut Workspace, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let id = workspace.registry_mut().add_session(&path)?;
    let session = workspace.registry().session(id)?;
    println!("{}", session.current_path().unwrap_or_default());
    for entry in session.entries() {
        print_entry(entry);
    }
    Ok(())
}

fn browser_ids(workspace: &Workspace) -> Vec<SessionId> {
    workspace
        .registry()
        .sessions()
        .iter()
        .filter(|session| !session.is_results())
        .map(|session| session.id())
        .collect()
}

fn nav(workspace: &mut Workspace, index: usize, step: NavStep) -> Result<()> {
    let Some(id) = browser_ids(workspace).get(index).copied() else {
        bail!("no browser at index {index}");
    };
    let registry = workspace.registry_mut();
    let moved = match step {
        NavStep::To { path } => registry.navigate(id, &path).map(|()| true)?,
        NavStep::Back => registry.back(id)?,
        NavStep::Forward => registry.forward(id)?,
        NavStep::Up => registry.up(id)?,
        NavStep::Refresh => registry.refresh(id).map(|()| true)?,
    };
    if !moved {
        println!("already at the end of the history");
    }
    registry.set_active(id)?;

    let session = workspace.registry().session(id)?;
    println!(
        "{} [{}/{}]",
        session.current_path().unwrap_or_default(),
        session.history_index() + 1,
        session.history().len()
    );
    for entry in session.entries() {
        print_entry(entry);
    }
    workspace.save_state()?;
    Ok(())
}

fn close(workspace: &mut Workspace, index: Option<usize>) -> Result<()> {
    let ids = browser_ids(workspace);
    let targets = match index {
        Some(index) => match ids.get(index) {
            Some(id) => vec![*id],
            None => bail!("no browser at index {index}"),
        },
        None => ids,
    };
    for id in targets {
        let session = workspace.registry_mut().remove_session(id)?;
        println!("closed {}", session.current_path().unwrap_or_default());
    }
    workspace.save_state()?;
    Ok(())
}

fn status(workspace: &Workspace, json: bool) -> Result<()> {
    let state = WorkspaceState::capture(workspace.registry());
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let active = workspace.registry().get_active();
    println!("browsers:");
    for (index, session) in workspace
        .registry()
        .sessions()
        .iter()
        .filter(|session| !session.is_results())
        .enumerate()
    {
        let marker = if Some(session.id()) == active { "*" } else { " " };
        println!(
            " {marker} [{index}] {} ({} entries, {} visits)",
            session.current_path().unwrap_or_default(),
            session.entries().len(),
            session.history().len()
        );
    }
    print_pins(workspace);
    Ok(())
}

fn search(workspace: &mut Workspace, args: SearchArgs) -> Result<()> {
    for root in &args.roots {
        workspace
            .registry_mut()
            .add_session(root)
            .with_context(|| format!("cannot search {}", root.display()))?;
    }
    if workspace.registry().is_empty() {
        workspace.registry_mut().add_session(std::env::current_dir()?)?;
    }

    let Some(generation) = workspace.request_search(&args.query)? else {
        println!("empty query, nothing to search");
        return Ok(());
    };
    log::debug!("search generation {generation} started");

    let deadline = Instant::now() + Duration::from_secs(args.timeout);
    let poll = workspace.controller().settings().poll_interval;
    let mut printed = 0;
    loop {
        // Read idleness first so the final pump sees every update sent before it.
        let finished = !workspace.is_searching();
        workspace.pump_search_updates();
        let results = workspace.results();
        for entry in results.iter().skip(printed) {
            print_entry(entry);
        }
        printed = results.len();

        if finished {
            if let Some(summary) = workspace.controller().engine().last_summary() {
                let capped = if summary.capped { " (capped)" } else { "" };
                println!(
                    "{} matches in {} directories, {} errors, {}ms{capped}",
                    summary.emitted, summary.scanned_dirs, summary.errors, summary.elapsed_ms
                );
            }
            return Ok(());
        }
        if Instant::now() >= deadline {
            workspace.cancel_search();
            bail!("search did not finish within {}s", args.timeout);
        }
        thread::sleep(poll);
    }
}

fn pins(workspace: &mut Workspace, command: PinsCommand) -> Result<()> {
    if let PinsCommand::List = command {
        print_pins(workspace);
        return Ok(());
    }

    let registry = workspace.registry_mut();
    let active = registry.pins().active_index().unwrap_or(0);
    match command {
        PinsCommand::List => {}
        PinsCommand::Add { paths, list } => {
            let entries = paths
                .iter()
                .map(FileEntry::from_path)
                .collect::<navigator::Result<Vec<_>>>()?;
            let added = registry.update_pins(list.unwrap_or(active), |pins| {
                entries
                    .into_iter()
                    .filter(|entry| pins.add_pin(entry.clone()))
                    .count()
            })?;
            println!("pinned {added}");
        }
        PinsCommand::Remove { paths, list } => {
            let removed = registry.update_pins(list.unwrap_or(active), |pins| {
                pins.remove_pins(paths.as_slice())
            })?;
            println!("unpinned {removed}");
        }
        PinsCommand::Sort { by, list } => {
            registry.update_pins(list.unwrap_or(active), |pins| pins.sort(by.into()))?;
        }
        PinsCommand::Label { path, label, list } => {
            registry.update_pins(list.unwrap_or(active), |pins| pins.rename_pin(&path, label))??;
        }
        PinsCommand::NewList { name } => {
            let index = registry.update_shelf(|shelf| shelf.add_list(name));
            println!("created list {index}");
        }
        PinsCommand::RenameList { index, name } => {
            registry.update_shelf(|shelf| shelf.rename_list(index, name))?;
        }
        PinsCommand::DropList { index } => {
            let removed = registry.update_shelf(|shelf| {
                let removed = shelf.remove_list(index);
                shelf.ensure_default();
                removed
            })?;
            println!("dropped {}", removed.name());
        }
    }
    Ok(())
}

fn print_pins(workspace: &Workspace) {
    let shelf = workspace.registry().pins();
    for (index, list) in shelf.lists().iter().enumerate() {
        let marker = if Some(index) == shelf.active_index() { "*" } else { " " };
        println!("{marker} [{index}] {} ({} pins)", list.name(), list.len());
        for pin in list.pins() {
            println!(
                "      {} -> {} (clicks: {})",
                pin.display_name(),
                pin.full_path(),
                pin.click_count()
            );
        }
    }
}

fn print_entry(entry: &FileEntry) {
    let kind = if entry.is_dir() { "dir " } else { "file" };
    match entry.size() {
        Some(size) => println!("{kind} {:>10} {}", size, entry.full_path()),
        None => println!("{kind} {:>10} {}", "-", entry.full_path()),
    }
}
