use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use raidloca_lib::{
    disable_ansi_colors, emit_reports, extract, ignore_key, load_tables, localize, render_blocks,
    replace_dir, rewrite_all, set_min_confidence, set_min_severity, set_output_file,
    validate_config_file, Confidence, Config, ErrorKey, Fetcher, Ingestor, NameKind,
    ReservedValues, Resolver, Rewriter, Severity, TableStore, Tables, TimelinePair,
};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[clap(flatten)]
    global: GlobalArgs,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to custom .json config file.
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// Output the reports in JSON format
    #[clap(long, global = true)]
    json: bool,
    /// Omit color from the output. False by default.
    #[clap(long, global = true)]
    no_color: bool,
    /// Show tips in addition to warnings and errors
    #[clap(long, global = true)]
    advice: bool,
    /// Only show reports of at least this confidence: weak, reasonable or strong.
    #[clap(long, global = true)]
    min_confidence: Option<Confidence>,
    /// Never show reports with this key. Can be given more than once.
    #[clap(long = "ignore", global = true, value_name = "KEY")]
    ignored: Vec<ErrorKey>,
    /// Write the reports to this file instead of to stdout.
    #[clap(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TableArgs {
    /// Directory holding the merged tables.
    #[clap(long, default_value = "data")]
    data_dir: PathBuf,
    /// Reserved value registry to fill in placeholders with.
    #[clap(long)]
    rsv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured sheet for every locale and save the merged tables.
    Scrape {
        /// Directory to save the merged tables in.
        #[clap(long, default_value = "data")]
        save_dir: PathBuf,
    },
    /// Collect reserved values from network logs into a registry file.
    Rsv {
        /// Log files to read, in order. Later records override earlier ones.
        #[clap(required = true)]
        logs: Vec<PathBuf>,
        /// Where to write the registry.
        #[clap(short, long, default_value = "rsv.json")]
        output: PathBuf,
    },
    /// Replace reserved value placeholders in all saved tables.
    Replace {
        /// Directory holding the merged tables.
        #[clap(long, default_value = "data")]
        data_dir: PathBuf,
        /// The registry made by the rsv command.
        #[clap(long, default_value = "rsv.json")]
        rsv: PathBuf,
    },
    /// Fill in the values of `'key': 'value',` lines in a translation file.
    Rewrite {
        /// Which kind of names the keys are. Defaults to action.
        #[clap(short, long, conflicts_with = "all")]
        kind: Option<NameKind>,
        /// Do actions, then monster names, then place names.
        #[clap(short, long)]
        all: bool,
        /// Target locale.
        #[clap(short, long, default_value = "ko")]
        locale: String,
        #[clap(short, long, default_value = "input.txt")]
        input: PathBuf,
        #[clap(short, long, default_value = "output.txt")]
        output: PathBuf,
        #[clap(flatten)]
        tables: TableArgs,
    },
    /// Print the translation blocks for a raidboss timeline, given the url or path of its
    /// trigger file or its timeline text.
    Timeline {
        resource: String,
        #[clap(flatten)]
        tables: TableArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    if global.no_color {
        disable_ansi_colors();
    }
    if global.advice {
        set_min_severity(Severity::Tips);
    }
    if let Some(confidence) = global.min_confidence {
        set_min_confidence(confidence);
    }
    for &key in &global.ignored {
        ignore_key(key);
    }
    if let Some(path) = &global.output {
        set_output_file(path).with_context(|| format!("creating report file {}", path.display()))?;
        disable_ansi_colors();
    }

    let config = match validate_config_file(global.config.clone()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let result = run(cli.command, &config);
    emit_reports(global.json);
    result
}

fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Scrape { save_dir } => {
            let fetcher = Fetcher::new();
            let store = TableStore::new(save_dir);
            let (sheets, locales) = (config.sheets.len(), config.locales.len());
            eprintln!("Fetching {sheets} sheets for {locales} locales.");
            let tables = Ingestor::new(config, &fetcher).scrape(&store)?;
            eprintln!("Saved {} tables in {}", tables.len(), store.root().display());
        }
        Commands::Rsv { logs, output } => {
            let registry = ReservedValues::parse_logs(&logs, &config.reserved)?;
            if registry.is_empty() {
                bail!("No reserved values found in the given logs.");
            }
            registry.save(&output)?;
            eprintln!("Saved {} reserved values to {}", registry.len(), output.display());
        }
        Commands::Replace { data_dir, rsv } => {
            let progress = AtomicUsize::new(0);
            let done = AtomicBool::new(false);
            let summary = thread::scope(|s| {
                s.spawn(|| {
                    while !done.load(Ordering::Relaxed) {
                        let count = progress.load(Ordering::Relaxed);
                        eprint!("\rReplacing reserved values: {count} tables");
                        thread::sleep(Duration::from_millis(200));
                    }
                });
                let summary = replace_dir(&data_dir, &rsv, &progress);
                done.store(true, Ordering::Relaxed);
                summary
            })?;
            eprintln!("\rReplaced {} cells in {} tables.", summary.cells, summary.files);
        }
        Commands::Rewrite { kind, all, locale, input, output, tables } => {
            let (table_map, registry) = load_resolver_data(config, &tables)?;
            let mut resolver = Resolver::new(config, &table_map);
            if let Some(registry) = &registry {
                resolver = resolver.with_registry(registry);
            }
            let stats = if all {
                rewrite_all(&resolver, &locale, &input, &output)?
            } else {
                let kind = kind.unwrap_or(NameKind::Action);
                Rewriter::new(&resolver, kind, &locale).rewrite_file(&input, &output)?
            };
            eprintln!(
                "Rewrote {} of {} entries in {} lines. Output is in {}",
                stats.rewritten,
                stats.entries,
                stats.lines,
                output.display()
            );
        }
        Commands::Timeline { resource, tables } => {
            let (table_map, registry) = load_resolver_data(config, &tables)?;
            let mut resolver = Resolver::new(config, &table_map);
            if let Some(registry) = &registry {
                resolver = resolver.with_registry(registry);
            }
            let pair = TimelinePair::fetch(&Fetcher::new(), &resource)
                .with_context(|| format!("fetching timeline {resource}"))?;
            let entities = extract(&pair);
            let (actions, npcs) = (entities.actions.len(), entities.npcs.len());
            eprintln!("Found {actions} actions and {npcs} monster names.");
            print!("{}", render_blocks(&localize(&entities, &resolver)));
        }
    }
    Ok(())
}

type ResolverData = (Tables, Option<ReservedValues>);

fn load_resolver_data(config: &Config, args: &TableArgs) -> Result<ResolverData> {
    if !args.data_dir.is_dir() {
        let dir = args.data_dir.display();
        bail!("Cannot find the tables in {dir}. Run the scrape command first.");
    }
    let tables = load_tables(config, &TableStore::new(&args.data_dir))?;
    let registry = args.rsv.as_deref().map(load_registry).transpose()?;
    Ok((tables, registry))
}

fn load_registry(path: &Path) -> Result<ReservedValues> {
    eprintln!("Using reserved values from {}", path.display());
    Ok(ReservedValues::load(path)?)
}
