mod build_report;

use dexcarve::{BuildConfig, FetchError, NormalizedTable, SinkError, SourceFetcher, TableHandle, TableSink, build_with};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUT: &str = "tables";
const LOG_ENV: &str = "DEXCARVE_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let build_config = match &cli.config {
        Some(path) => BuildConfig::from_toml(&fs::read_to_string(path)?)?,
        None => BuildConfig::default(),
    };

    let fetcher = DirFetcher { root: cli.source_dir.clone() };
    let mut sink = JsonSink::create(&cli.out_dir)?;
    let summary = build_with(&fetcher, &mut sink, &build_config)?;

    sink.write_json("catalog.json", &summary.catalog)?;
    sink.write_json("report.json", &summary)?;

    build_report::print_build(
        &cli.source_dir.display().to_string(),
        &cli.out_dir.display().to_string(),
        &summary,
        cli.color,
    );
    Ok(())
}

/// Reads sources as files under one directory; collections are
/// subdirectories.
struct DirFetcher {
    root: PathBuf,
}

impl SourceFetcher for DirFetcher {
    fn fetch(&self, name: &str) -> Result<Option<String>, FetchError> {
        let path = self.root.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FetchError::Io { name: name.to_string(), source }),
        };
        String::from_utf8(bytes).map(Some).map_err(|_| FetchError::Encoding(name.to_string()))
    }

    /// `.txt` files directly under `<root>/<name>`, sorted by file name.
    fn list(&self, name: &str) -> Result<Option<Vec<String>>, FetchError> {
        let entries = match fs::read_dir(self.root.join(name)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(FetchError::Io { name: name.to_string(), source }),
        };

        let mut members = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| FetchError::Io { name: name.to_string(), source })?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "txt") {
                continue;
            }
            if let Some(file) = path.file_name().and_then(|f| f.to_str()) {
                members.push(format!("{name}/{file}"));
            }
        }
        members.sort();
        Ok(Some(members))
    }
}

/// Writes each table as `<out>/<table>.json`, an array of row objects.
struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    fn create(dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(dir)?;
        Ok(JsonSink { dir: dir.to_path_buf() })
    }

    fn write_json<T: serde::Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)
            .map_err(|err| SinkError::Serialize { table: file.to_string(), reason: err.to_string() })?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

impl TableSink for JsonSink {
    fn accept(&mut self, table: NormalizedTable) -> Result<TableHandle, SinkError> {
        let path = self.write_json(&format!("{}.json", table.name), &table.rows)?;
        tracing::debug!(table = %table.name, path = %path.display(), rows = table.len(), "table written");
        Ok(TableHandle(format!("file://{}", path.display())))
    }
}

struct CliConfig {
    source_dir: PathBuf,
    out_dir: PathBuf,
    config: Option<PathBuf>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut source_dir: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from(DEFAULT_OUT);
    let mut config: Option<PathBuf> = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("dexcarve {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--out" | "-o" => {
                let value = args.next().ok_or_else(|| "error: --out expects a value".to_string())?;
                out_dir = PathBuf::from(value);
            }
            "--config" | "-c" => {
                let value = args.next().ok_or_else(|| "error: --config expects a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--source-dir" | "-s" => {
                let value = args.next().ok_or_else(|| "error: --source-dir expects a value".to_string())?;
                set_source_dir(&mut source_dir, value)?;
            }
            _ if arg.starts_with("--out=") => out_dir = PathBuf::from(arg.trim_start_matches("--out=")),
            _ if arg.starts_with("--config=") => config = Some(PathBuf::from(arg.trim_start_matches("--config="))),
            _ if arg.starts_with("--source-dir=") => {
                set_source_dir(&mut source_dir, arg.trim_start_matches("--source-dir=").to_string())?;
            }
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => set_source_dir(&mut source_dir, arg)?,
        }
    }

    let Some(source_dir) = source_dir else {
        return Err(format!("error: no source directory provided\n\n{}", help_text()));
    };
    if !source_dir.is_dir() {
        return Err(format!("error: '{}' is not a directory", source_dir.display()));
    }

    Ok(CliConfig { source_dir, out_dir, config, color })
}

fn set_source_dir(slot: &mut Option<PathBuf>, value: String) -> Result<(), String> {
    if slot.is_some() {
        return Err("error: source directory provided multiple times".to_string());
    }
    *slot = Some(PathBuf::from(value));
    Ok(())
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "dexcarve {version}

Carve struct-literal data dumps into normalized JSON tables.

Usage:
  dexcarve [OPTIONS] <source-dir>
  dexcarve [OPTIONS] --source-dir <dir>

Options:
  -s, --source-dir <dir>     Directory holding the source files.
  -o, --out <dir>            Output directory for tables, catalog.json and
                             report.json. Default: {default_out}
  -c, --config <file>        TOML build configuration (source names, skipped
                             kinds, rule overrides, symbol tables).
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}                Log filter, e.g. dexcarve=debug. Default: warn

Exit codes:
  0  Success.
  1  Build failed (bad configuration or output write error).
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        default_out = DEFAULT_OUT,
        log_env = LOG_ENV,
    )
}
