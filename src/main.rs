use clap::{Parser, Subcommand};
use colored::Colorize;
use excel_aria::config::{Config, DEFAULT_CONFIG_FILE};
use excel_aria::report;
use excel_aria::scanner::{ExcelScanner, ScanCache};
use excel_aria::tools::{TOOLS, ToolArgs, Toolbox};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Excel file tools behind the Aria assistant", long_about = None)]
struct Args {
    /// Directory holding the Excel files
    #[arg(long, short = 'd')]
    data_dir: Option<PathBuf>,

    /// Seconds a scan result stays cached
    #[arg(long)]
    ttl: Option<u64>,

    /// KEY=value config file (DATA_DIR, CACHE_TTL_SECS)
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the Excel files in the data directory
    List,
    /// Show size and modification time of each Excel file
    Metadata,
    /// Analyze a file: "<file.xlsx>: <instruction>"
    Analyze { command: String },
    /// Analyze and save: "<in.xlsx>: <instruction>; guardar como <out.xlsx>"
    Save { command: String },
    /// List the tools exposed to the agent
    Tools,
    /// Invoke a tool by its agent-facing name
    Tool {
        name: String,
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg.merge(args.data_dir, args.ttl),
        Err(e) => {
            eprintln!("{} {e}", "Error:".red());
            std::process::exit(1);
        }
    };
    debug!("using {config:?}");

    let cache = Arc::new(ScanCache::new(config.cache_ttl));
    let scanner = ExcelScanner::new(cache);
    let toolbox = Toolbox::new(scanner.clone(), &config.data_dir);

    match args.command {
        Command::List => {
            let files = scanner.list_excel_files(&config.data_dir);
            report::print_file_list(&config.data_dir, &files);
        }
        Command::Metadata => {
            let records = scanner.get_excel_files_metadata(&config.data_dir);
            report::print_metadata(&config.data_dir, &records);
        }
        Command::Tools => {
            for t in &TOOLS {
                println!("{}  {}", t.name.green(), t.description);
            }
        }
        Command::Analyze { command } => println!("{}", toolbox.analyze(&command)),
        Command::Save { command } => println!("{}", toolbox.analyze_and_save(&command)),
        Command::Tool {
            name,
            filename,
            query,
            output,
        } => {
            let tool_args = ToolArgs {
                filename,
                query,
                output_filename: output,
            };
            println!("{}", toolbox.dispatch(&name, &tool_args));
        }
    }
}
