use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use wbdata::{CacheConfig, Client, DataQuery, Dates, FetchResult, FileCache, Frequency, TransportConfig};
use wbdata::storage;

#[derive(Parser, Debug)]
#[command(
    name = "wbdata",
    version,
    about = "Fetch and cache World Bank API data"
)]
struct Cli {
    #[command(flatten)]
    cache: CacheArgs,
    #[command(subcommand)]
    cmd: Command,
}

/// Overrides for the `WBDATA_CACHE_*` environment variables.
#[derive(Args, Debug)]
struct CacheArgs {
    /// Cache directory.
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,
    /// Days to keep cached responses.
    #[arg(long, global = true)]
    cache_ttl_days: Option<u32>,
    /// Maximum number of cached responses.
    #[arg(long, global = true)]
    cache_max_size: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch observations for one indicator.
    Data(DataArgs),
    /// List data sources.
    Sources(IdArgs),
    /// List topics.
    Topics(IdArgs),
    /// List income level aggregates.
    IncomeLevels(IdArgs),
    /// List lending type aggregates.
    LendingTypes(IdArgs),
    /// List countries and aggregates.
    Countries(CountryArgs),
    /// List indicators.
    Indicators(IndicatorArgs),
    /// Inspect or clear the response cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Save results as JSON instead of printing them.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Bypass the cache (the fresh response is still cached).
    #[arg(long, default_value_t = false)]
    skip_cache: bool,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Indicator code (e.g., SP.POP.TOTL)
    #[arg(short, long)]
    indicator: String,
    /// Country/region codes separated by comma or semicolon (default: all)
    #[arg(short, long)]
    countries: Option<String>,
    /// Date or range (e.g., 2010, 2010:2020, 2019Q1:2020Q4, "May 2018")
    #[arg(short = 'd', long)]
    date: Option<String>,
    /// Frequency of the date parameter: Y, M or Q
    #[arg(long, default_value = "Y", value_parser = parse_freq)]
    freq: Frequency,
    /// Source id (e.g., 2 for WDI)
    #[arg(long)]
    source: Option<String>,
    /// Rewrite row dates as YYYY-MM-DD.
    #[arg(long, default_value_t = false)]
    parse_dates: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct IdArgs {
    /// Ids separated by comma or semicolon (default: all)
    ids: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct CountryArgs {
    /// Country ids separated by comma or semicolon
    ids: Option<String>,
    /// Filter by income level id(s)
    #[arg(long)]
    income_level: Option<String>,
    /// Filter by lending type id(s)
    #[arg(long)]
    lending_type: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct IndicatorArgs {
    /// Indicator ids separated by comma or semicolon
    ids: Option<String>,
    /// List indicators of these source id(s)
    #[arg(long)]
    source: Option<String>,
    /// List indicators of these topic id(s)
    #[arg(long)]
    topic: Option<String>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show cache location and entry count.
    Info,
    /// Remove every cached response.
    Clear,
}

fn parse_freq(s: &str) -> Result<Frequency, String> {
    s.to_ascii_uppercase().parse().map_err(|e| format!("{e}"))
}

fn parse_list(s: Option<&str>) -> Vec<String> {
    s.unwrap_or_default()
        .split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

impl CacheArgs {
    fn config(&self) -> CacheConfig {
        let mut cfg = CacheConfig::from_env();
        if let Some(p) = &self.cache_path {
            cfg.path = p.clone();
        }
        if let Some(d) = self.cache_ttl_days {
            cfg.ttl_days = d;
        }
        if let Some(n) = self.cache_max_size {
            cfg.max_size = n;
        }
        cfg
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cache = cli.cache.config();

    let mut client = Client::with_config(&cache, TransportConfig::default())?;
    let (result, output) = match &cli.cmd {
        Command::Data(args) => {
            let mut query = DataQuery::new(args.indicator.trim())
                .countries(parse_list(args.countries.as_deref()))
                .freq(args.freq)
                .parse_dates(args.parse_dates)
                .skip_cache(args.output.skip_cache);
            if let Some(d) = &args.date {
                query = query.date(Dates::from_arg(d));
            }
            if let Some(s) = &args.source {
                query = query.source(parse_list(Some(s)));
            }
            let data = client
                .get_data(&query)
                .with_context(|| format!("fetch indicator {}", args.indicator))?;
            (data, &args.output)
        }
        Command::Sources(a) => (client.get_sources(&parse_list(a.ids.as_deref()), a.output.skip_cache)?, &a.output),
        Command::Topics(a) => (client.get_topics(&parse_list(a.ids.as_deref()), a.output.skip_cache)?, &a.output),
        Command::IncomeLevels(a) => (
            client.get_incomelevels(&parse_list(a.ids.as_deref()), a.output.skip_cache)?,
            &a.output,
        ),
        Command::LendingTypes(a) => (
            client.get_lendingtypes(&parse_list(a.ids.as_deref()), a.output.skip_cache)?,
            &a.output,
        ),
        Command::Countries(a) => (
            client.get_countries(
                &parse_list(a.ids.as_deref()),
                &parse_list(a.income_level.as_deref()),
                &parse_list(a.lending_type.as_deref()),
                a.output.skip_cache,
            )?,
            &a.output,
        ),
        Command::Indicators(a) => (
            client.get_indicators(
                &parse_list(a.ids.as_deref()),
                &parse_list(a.source.as_deref()),
                &parse_list(a.topic.as_deref()),
                a.output.skip_cache,
            )?,
            &a.output,
        ),
        Command::Cache(cmd) => return cmd_cache(cmd, &cache),
    };
    emit(&result, output)
}

fn emit(result: &FetchResult, output: &OutputArgs) -> Result<()> {
    match &output.out {
        Some(path) => {
            storage::save_json(result, path)
                .with_context(|| format!("write {}", path.display()))?;
            eprintln!("Saved {} rows to {}", result.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

fn cmd_cache(cmd: &CacheCommand, config: &CacheConfig) -> Result<()> {
    let mut cache = FileCache::open(config);
    match cmd {
        CacheCommand::Info => {
            println!("path: {}", cache.path().display());
            println!("entries: {}", cache.len());
            println!("ttl_days: {}", config.ttl_days);
            println!("max_size: {}", config.max_size);
        }
        CacheCommand::Clear => {
            let n = cache.len();
            cache.clear();
            eprintln!("Removed {} cached responses from {}", n, cache.path().display());
        }
    }
    Ok(())
}
