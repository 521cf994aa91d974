use bookquery::bulk::{self, BulkOperation};
use bookquery::filter::{self, Filter};
use bookquery::{compile, config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Where to read the filter JSON from.
#[derive(clap::Args, Clone)]
struct FilterArgs {
    /// Filter JSON file (reads stdin when omitted)
    file: Option<PathBuf>,
}

/// Exactly one change to apply in a bulk edit.
#[derive(clap::Args, Clone)]
#[group(required = true, multiple = false)]
struct OperationArgs {
    /// Add a tag to every matching book
    #[arg(long)]
    add_tag: Option<String>,
    /// Remove a tag from every matching book
    #[arg(long)]
    remove_tag: Option<String>,
    /// Set the publisher of every matching book
    #[arg(long)]
    set_publisher: Option<String>,
    /// Set the original publisher of every matching book
    #[arg(long)]
    set_original_publisher: Option<String>,
    /// Add every matching book to a bookshelf
    #[arg(long)]
    add_to_bookshelf: Option<String>,
    /// Set inCirculation on every matching book
    #[arg(long)]
    set_in_circulation: Option<bool>,
}

impl OperationArgs {
    fn into_operation(self) -> Option<BulkOperation> {
        self.add_tag
            .map(BulkOperation::AddTag)
            .or(self.remove_tag.map(BulkOperation::RemoveTag))
            .or(self.set_publisher.map(BulkOperation::SetPublisher))
            .or(self
                .set_original_publisher
                .map(BulkOperation::SetOriginalPublisher))
            .or(self.add_to_bookshelf.map(BulkOperation::AddToBookshelf))
            .or(self.set_in_circulation.map(BulkOperation::SetInCirculation))
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "bookquery")]
#[command(about = "Compile library catalog filters into Parse-server queries")]
#[command(long_about = "\
Compile library catalog filters into Parse-server queries

Filters are JSON objects in the shape the catalog UI produces:

  {
    \"publisher\": \"Pratham\",
    \"otherTags\": \"list:Bible*\",
    \"inCirculation\": \"All\",
    \"anyOfThese\": [{ \"topic\": \"Math\" }, { \"topic\": \"Science\" }]
  }

Tag wildcards:
  list:Bible*   prefix match      → {\"$regex\":\"^list:Bible\"}
  *Bible        suffix match      → {\"$regex\":\"Bible$\"}
  *Bible*       substring match   → {\"$regex\":\"Bible\"}

Run 'bookquery gen-config' to generate a documented bookquery.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Log compiler decisions (dropped facets, folded topics)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a filter into a catalog grid query
    Compile {
        #[command(flatten)]
        filter: FilterArgs,
        /// Grid page to request (0-based)
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Extra literal tag ANDed into the query (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
        /// Print query-string parameters instead of JSON
        #[arg(long, conflicts_with = "pretty")]
        query_string: bool,
    },
    /// Show the lookup and update requests for a moderator bulk edit
    BulkPlan {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        operation: OperationArgs,
    },
    /// Parse a filter and summarize it without compiling
    Check(FilterArgs),
    /// Print a stock bookquery.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compile {
            filter,
            page,
            tags,
            pretty,
            query_string,
        } => {
            let config = config::load_config(&cli.config)?;
            let filter = read_filter_arg(filter.file.as_deref())?;
            let mut extra_tags = config.tags.extra.clone();
            extra_tags.extend(tags);
            let query = compile::compile(&config.grid_params(page), &filter, &extra_tags);
            if query_string {
                output::print_query_string(&query);
            } else if pretty {
                println!("{}", serde_json::to_string_pretty(&query)?);
            } else {
                println!("{}", serde_json::to_string(&query)?);
            }
        }
        Command::BulkPlan { filter, operation } => {
            let config = config::load_config(&cli.config)?;
            let filter = read_filter_arg(filter.file.as_deref())?;
            let operation = operation
                .into_operation()
                .ok_or("no bulk edit operation given")?;
            let plan = bulk::plan(&filter, operation, &config)?;
            output::print_bulk_plan(&plan);
        }
        Command::Check(args) => {
            let filter = read_filter_arg(args.file.as_deref())?;
            output::print_filter_summary(&filter);
            println!("==> Filter is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the `log` backend. `RUST_LOG` still overrides the level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn read_filter_arg(file: Option<&Path>) -> Result<Filter, filter::FilterError> {
    match file {
        Some(path) => filter::load_filter(path),
        None => filter::read_filter(std::io::stdin().lock()),
    }
}
