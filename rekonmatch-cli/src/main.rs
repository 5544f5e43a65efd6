mod render;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rekonmatch::{
    config::ConfigOverrides,
    query::{QueryOptions, SearchOperator, TermSplit},
    session::StoredDataset,
    Dataset, MoveDirection, QueryConfig, QueryError, Session, Side, Workspace,
};
use std::{env, num::NonZeroUsize, path::PathBuf};
use tracing::debug;

type Result<T> = std::result::Result<T, QueryError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to look for the workspace in (default: current directory)
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short = 'j', long, global = true)]
    threads: Option<NonZeroUsize>,

    /// Log filter, e.g. info or rekonmatch=debug
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct QueryArgs {
    /// Dataset to query (primary|secondary)
    #[arg(short, long, default_value = "primary")]
    side: Side,

    /// Criterion as COLUMN[:OPERATOR]=TERMS (can be specified multiple times)
    #[arg(short = 'c', long = "criterion", required = true)]
    criteria: Vec<String>,

    /// Report term positions whose terms are all blank
    #[arg(long, conflicts_with = "no_empty")]
    include_empty: bool,

    /// Drop term positions whose terms are all blank
    #[arg(long)]
    no_empty: bool,

    /// How to cut criterion text into terms (compact|positional)
    #[arg(long)]
    split: Option<TermSplit>,

    /// Show related rows of the other dataset, as SOURCE_KEY=TARGET_KEY
    #[arg(short, long)]
    link: Option<String>,

    /// Columns to show, comma separated (kept for later queries)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Store the current display columns under a name
    Save { name: String },
    /// Show the columns stored under a name
    Load { name: String },
    /// Remove a stored template
    Delete { name: String },
    /// List stored templates
    List,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file or spreadsheet workbook as one of the two datasets
    Load {
        /// Side to load into (primary|secondary)
        #[arg(short, long, default_value = "primary")]
        side: Side,

        /// CSV or workbook (xlsx, xlsm, xlsb, xls, ods) with a header row
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Exchange the primary and secondary datasets
    Swap,

    /// Forget both datasets and all settings
    Reset,

    /// Expand numbers written in exponent notation
    ConvertScientific {
        /// Side to convert (primary|secondary)
        #[arg(short, long, default_value = "primary")]
        side: Side,

        /// Column to convert (can be specified multiple times; default: all)
        #[arg(long = "column")]
        columns: Vec<String>,
    },

    /// Run a multi-term query against a dataset
    Query(Box<QueryArgs>),

    /// Write the effective configuration to a YAML file
    InitConfig {
        /// Destination file
        #[arg(default_value = ".rekonmatch.yaml")]
        path: PathBuf,
    },

    /// List the columns of a dataset
    Headers {
        /// Side to list (primary|secondary)
        #[arg(short, long, default_value = "primary")]
        side: Side,
    },

    /// Show or change which columns results display
    Columns {
        /// Side to change (primary|secondary)
        #[arg(short, long, default_value = "primary")]
        side: Side,

        /// Show every column
        #[arg(long, conflicts_with_all = ["set", "move_up", "move_down"])]
        all: bool,

        /// Show exactly these columns, comma separated
        #[arg(long, value_delimiter = ',')]
        set: Option<Vec<String>>,

        /// Move a column one place towards the front
        #[arg(long)]
        move_up: Option<String>,

        /// Move a column one place towards the back
        #[arg(long, conflicts_with = "move_up")]
        move_down: Option<String>,
    },

    /// Manage named display column selections
    Template {
        /// Side the template belongs to (primary|secondary)
        #[arg(short, long, default_value = "primary", global = true)]
        side: Side,

        #[command(subcommand)]
        action: TemplateAction,
    },
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides = ConfigOverrides {
        thread_count: cli.threads,
        log_level: cli.log_level.clone(),
        workspace_dir: cli.workspace.clone(),
        ..Default::default()
    };
    if let Commands::Query(args) = &cli.command {
        overrides.term_split = args.split;
        if args.include_empty {
            overrides.include_empty_rows = Some(true);
        } else if args.no_empty {
            overrides.include_empty_rows = Some(false);
        }
    }

    let config = QueryConfig::load_from(cli.config.as_deref())?.merge_with_cli(overrides);
    config.init_tracing();
    debug!("Effective configuration: {:?}", config);

    let start_dir = match &config.workspace_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    let workspace = Workspace::detect(&start_dir);
    let mut session = workspace
        .load_session()?
        .with_options(QueryOptions::from(&config));

    match cli.command {
        Commands::Load { side, file } => {
            let dataset = Dataset::from_path(&file)?;
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            println!(
                "Loaded {} as {} dataset ({} rows, {} columns)",
                file_name.blue(),
                side,
                dataset.len(),
                dataset.headers.len()
            );
            session.load(side, StoredDataset::new(file_name, dataset));
            workspace.save_session(&session)
        }
        Commands::Swap => {
            session.swap()?;
            workspace.save_session(&session)?;
            println!("Swapped primary and secondary datasets");
            Ok(())
        }
        Commands::Reset => {
            session.reset();
            workspace.clear()?;
            println!("Cleared workspace {}", workspace.dir().display());
            Ok(())
        }
        Commands::ConvertScientific { side, columns } => {
            let converted = session.convert_scientific(side, &columns)?;
            workspace.save_session(&session)?;
            println!("Converted {} cells in the {} dataset", converted, side);
            Ok(())
        }
        Commands::Query(args) => {
            let side = args.side;
            session.clear_query(side);
            for raw in &args.criteria {
                let (column, operator, terms) = parse_criterion(raw)?;
                session.toggle_search_column(side, &column, true);
                session.set_criterion_value(side, &column, terms);
                session.set_criterion_operator(side, &column, operator);
            }
            if let Some(columns) = &args.columns {
                let columns = columns.iter().map(|c| c.trim().to_string()).collect();
                session.set_display_columns(side, columns)?;
            }
            if let Some(link) = &args.link {
                let (source_key, target_key) = link.split_once('=').ok_or_else(|| {
                    QueryError::config_error("Link must be given as SOURCE_KEY=TARGET_KEY")
                })?;
                session.set_link_column(side, source_key.trim());
                session.set_link_column(side.other(), target_key.trim());
            }

            let output = session.run_query(side)?;
            let links = if args.link.is_some() {
                let mut links = Vec::with_capacity(output.len());
                for row in output.iter() {
                    links.push(session.resolve_links(side, row)?);
                }
                Some(links)
            } else {
                None
            };

            let headers = shown_columns(&session, side);
            let companion_headers = shown_columns(&session, side.other());
            if args.json {
                render::print_json(&output, headers, links.as_deref(), companion_headers)?;
            } else {
                render::print_rows(&output, headers, links.as_deref(), companion_headers);
            }

            workspace.save_settings(session.settings())
        }
        Commands::InitConfig { path } => {
            config.save_to(&path)?;
            println!("Wrote configuration to {}", path.display());
            Ok(())
        }
        Commands::Headers { side } => {
            let stored = session
                .dataset(side)
                .ok_or_else(|| QueryError::no_target_data(format!("{} dataset", side)))?;
            println!("{} ({} rows)", stored.file_name.blue(), stored.dataset.len());
            for header in &stored.dataset.headers {
                println!("{}", header);
            }
            Ok(())
        }
        Commands::Columns {
            side,
            all,
            set,
            move_up,
            move_down,
        } => {
            if session.dataset(side).is_none() {
                return Err(QueryError::no_target_data(format!("{} dataset", side)));
            }
            if all {
                session.select_all_display_columns(side, true);
            }
            if let Some(columns) = set {
                let columns = columns.iter().map(|c| c.trim().to_string()).collect();
                session.set_display_columns(side, columns)?;
            }
            let moves = [(move_up, MoveDirection::Up), (move_down, MoveDirection::Down)];
            for (column, direction) in moves {
                let Some(column) = column else { continue };
                let index = session
                    .display_columns(side)
                    .iter()
                    .position(|c| *c == column)
                    .ok_or_else(|| {
                        QueryError::config_error(format!("'{}' is not a display column", column))
                    })?;
                if !session.move_display_column(side, index, direction) {
                    debug!("'{}' is already at the edge", column);
                }
            }
            workspace.save_settings(session.settings())?;
            for column in session.display_columns(side) {
                println!("{}", column);
            }
            Ok(())
        }
        Commands::Template { side, action } => {
            match action {
                TemplateAction::Save { name } => {
                    session.save_template(side, &name)?;
                    println!("Saved template {}", name.trim().blue());
                }
                TemplateAction::Load { name } => {
                    session.load_template(side, &name)?;
                    println!("Loaded template {}", name.trim().blue());
                    for column in session.display_columns(side) {
                        println!("{}", column);
                    }
                }
                TemplateAction::Delete { name } => {
                    if !session.delete_template(side, &name) {
                        return Err(QueryError::config_error(format!(
                            "No template named '{}'",
                            name
                        )));
                    }
                    println!("Deleted template {}", name.trim().blue());
                }
                TemplateAction::List => {
                    for (name, columns) in session.templates(side) {
                        println!("{}\t{}", name, columns.join(","));
                    }
                }
            }
            workspace.save_settings(session.settings())
        }
    }
}

/// Display columns of one side, or every header when none are selected
fn shown_columns(session: &Session, side: Side) -> &[String] {
    let selected = session.display_columns(side);
    if !selected.is_empty() {
        return selected;
    }
    session
        .dataset(side)
        .map(|stored| stored.dataset.headers.as_slice())
        .unwrap_or_default()
}

/// Splits `COLUMN[:OPERATOR]=TERMS`. A literal `\n` in TERMS stands for a
/// line break so positional term lists can be typed on one line.
fn parse_criterion(raw: &str) -> Result<(String, SearchOperator, String)> {
    let (target, terms) = raw.split_once('=').ok_or_else(|| {
        QueryError::config_error(format!(
            "Invalid criterion '{}', expected COLUMN[:OPERATOR]=TERMS",
            raw
        ))
    })?;

    // A suffix that is not an operator name is part of the column name
    let (column, operator) = target
        .rsplit_once(':')
        .and_then(|(column, suffix)| {
            SearchOperator::from_name(suffix).map(|operator| (column, operator))
        })
        .unwrap_or((target, SearchOperator::Contains));
    let column = column.trim();
    if column.is_empty() {
        return Err(QueryError::config_error(format!(
            "Invalid criterion '{}', column name is empty",
            raw
        )));
    }

    Ok((column.to_string(), operator, terms.replace("\\n", "\n")))
}
