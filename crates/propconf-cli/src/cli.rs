//! propconf CLI - load, merge and resolve `.properties` files
//!
//! Usage:
//!   propconf resolve base.properties app.properties --sort
//!   propconf get app.properties database.url
//!   propconf check conf/*.properties

use clap::{Parser, Subcommand};
use colored::Colorize;
use propconf_core::{
    set_system_property, validate_output, write_properties, Properties, PropertiesReader,
    ReadOptions, Resource, WriteOptions,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// propconf - Property files with ${key} placeholder resolution
#[derive(Parser)]
#[command(name = "propconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set a system property before resolving (repeatable)
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE", value_parser = parse_definition)]
    define: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load property resources and print them with placeholders resolved
    Resolve {
        /// Property file(s), later files override earlier ones
        files: Vec<PathBuf>,

        /// URL to load after the files (repeatable)
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// Ant path pattern to load last (repeatable)
        #[arg(short, long = "include", value_name = "PATTERN")]
        includes: Vec<String>,

        /// Prefix prepended to every loaded key
        #[arg(short, long)]
        prefix: Option<String>,

        /// Skip missing files and URLs
        #[arg(short, long)]
        quiet: bool,

        /// Order entries by key
        #[arg(short, long)]
        sort: bool,

        /// Output format: properties, json
        #[arg(short, long, default_value = "properties")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get a single value
    Get {
        /// Property file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Key to look up (e.g., database.url)
        key: String,

        /// Print the value without resolving placeholders
        #[arg(long)]
        raw: bool,

        /// Default value if key not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Quick syntax check of property files
    Check {
        /// Property file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    for (key, value) in cli.define {
        set_system_property(key, value);
    }

    match cli.command {
        Commands::Resolve {
            files,
            urls,
            includes,
            prefix,
            quiet,
            sort,
            format,
            output,
        } => {
            let mut options = ReadOptions::new().with_quiet(quiet);
            options.files = files;
            options.urls = urls;
            options.includes = includes;
            options.key_prefix = prefix;
            cmd_resolve(options, sort, &format, output)
        }

        Commands::Get {
            files,
            key,
            raw,
            default,
        } => cmd_get(files, &key, raw, default),

        Commands::Check { files } => cmd_check(files),
    }
}

/// Parse a `-D key=value` definition
fn parse_definition(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid definition '{}': expected KEY=VALUE", s))?;
    if key.is_empty() {
        return Err(format!("invalid definition '{}': key is empty", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn load(reader: &PropertiesReader) -> Result<Properties, String> {
    let mut props = Properties::new();
    reader
        .load_into(&mut props)
        .map_err(|e| format!("Failed to load properties: {}", e))?;
    Ok(props)
}

fn render(props: &Properties, sort: bool, format: &str) -> Result<String, String> {
    match format {
        "json" => {
            let ordered: Properties = if sort {
                let mut entries: Vec<_> = props.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                entries.into_iter().collect()
            } else {
                props.clone()
            };
            serde_json::to_string_pretty(&ordered)
                .map(|json| json + "\n")
                .map_err(|e| e.to_string())
        }
        "properties" => Ok(props.to_properties_string(sort)),
        other => Err(format!("Unknown format '{}'", other)),
    }
}

fn cmd_resolve(
    options: ReadOptions,
    sort: bool,
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let reader = PropertiesReader::new(options);

    let props = match load(&reader) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let resolved = match reader.resolve(&props) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} Resolution failed\n", "✗".red());
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let content = match render(&resolved, sort, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(2);
        }
    };

    let Some(output_path) = output else {
        print!("{}", content);
        return ExitCode::SUCCESS;
    };

    let written = if format == "properties" {
        write_properties(&resolved, &WriteOptions::new(&output_path).with_sort(sort))
    } else {
        validate_output(&output_path).and_then(|_| {
            std::fs::write(&output_path, &content)
                .map_err(|e| propconf_core::Error::io(output_path.display().to_string(), &e))
        })
    };

    match written {
        Ok(()) => {
            eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error writing file".red(), e);
            ExitCode::from(2)
        }
    }
}

fn cmd_get(files: Vec<PathBuf>, key: &str, raw: bool, default: Option<String>) -> ExitCode {
    let mut options = ReadOptions::new();
    options.files = files;
    let reader = PropertiesReader::new(options);

    let props = match load(&reader) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let value = if raw {
        props.get(key).map(str::to_string)
    } else {
        match reader.resolve_key(key, &props) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{} Resolution failed\n", "✗".red());
                eprintln!("{}", e);
                return ExitCode::from(1);
            }
        }
    };

    match value.or(default) {
        Some(v) => {
            println!("{}", v);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("{}: Key '{}' not found", "Error".red(), key);
            ExitCode::from(1)
        }
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match Resource::file(&file).load() {
            Ok(props) => {
                println!(
                    "{} {}: valid properties ({} entries)",
                    "✓".green(),
                    file.display(),
                    props.len()
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
