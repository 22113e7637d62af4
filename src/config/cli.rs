use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::application::content::{ParamValue, QueryParams, parse_param};

/// Command-line arguments for the FunGuy binary.
#[derive(Debug, Parser)]
#[command(name = "funguy", version, about = "Mycelial FunGuy content site")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FUNGUY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the site over HTTP.
    Serve(Box<ServeArgs>),
    /// Run a single GROQ query against the content store and print the result.
    Query(QueryArgs),
}

/// Content store overrides shared by every subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content store project id.
    #[arg(
        long = "content-project-id",
        env = "SANITY_PROJECT_ID",
        value_name = "ID",
        global = true
    )]
    pub project_id: Option<String>,

    /// Override the content store dataset.
    #[arg(
        long = "content-dataset",
        env = "SANITY_DATASET",
        value_name = "NAME",
        global = true
    )]
    pub dataset: Option<String>,

    /// Override the content store API version (e.g. 2023-05-03).
    #[arg(
        long = "content-api-version",
        env = "SANITY_API_VERSION",
        value_name = "DATE",
        global = true
    )]
    pub api_version: Option<String>,

    /// Query through the API CDN.
    #[arg(
        long = "content-use-cdn",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub use_cdn: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the default revalidation window for page fetches.
    #[arg(long = "cache-revalidate-seconds", value_name = "SECONDS")]
    pub cache_revalidate_seconds: Option<u64>,

    /// Toggle the in-process query cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the absolute site URL used for canonical links and the sitemap.
    #[arg(long = "site-public-url", value_name = "URL")]
    pub site_public_url: Option<String>,

    /// Fetch every listing once before accepting traffic.
    #[arg(
        long = "site-warm-on-startup",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub site_warm_on_startup: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    /// GROQ query text.
    #[arg(value_name = "GROQ")]
    pub query: String,

    /// Bind a `$name` parameter; integer values are sent as numbers.
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Print the result on a single line.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub compact: bool,
}

impl QueryArgs {
    pub fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        for (name, value) in self.params.iter().cloned() {
            params.insert(name, value);
        }
        params
    }
}
