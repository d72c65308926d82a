use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use distmerge_engine::AnnotationScheme;

#[derive(Parser)]
#[command(
    name = "distmerge",
    about = "Merge client and server jars into one, marking side-exclusive code",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge a client and a server jar
    Merge(MergeArgs),
    /// Remove side markers from listed classes and members
    Strip(StripArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    #[arg(long)]
    pub client: PathBuf,
    #[arg(long)]
    pub server: PathBuf,
    #[arg(long)]
    pub output: PathBuf,
    /// Marker scheme (CPW, NMF, API) or game version; API when given without a value
    #[arg(long, num_args = 0..=1, default_missing_value = "API")]
    pub ann: Option<AnnotationScheme>,
    /// Add the marker types to the output (default)
    #[arg(long, overrides_with = "no_inject")]
    pub inject: bool,
    #[arg(long, overrides_with = "inject")]
    pub no_inject: bool,
    /// Copy the client's non-class entries
    #[arg(long)]
    pub keep_data: bool,
    /// Copy META-INF entries too
    #[arg(long)]
    pub keep_meta: bool,
    /// The server jar is a bundler container
    #[arg(long)]
    pub bundled: bool,
    #[arg(long)]
    pub whitelist: Vec<String>,
    #[arg(long = "whitelist-pkg")]
    pub whitelist_pkg: Vec<String>,
    #[arg(long = "whitelist-map")]
    pub whitelist_map: Vec<PathBuf>,
    #[arg(long)]
    pub blacklist: Vec<String>,
    #[arg(long = "blacklist-pkg")]
    pub blacklist_pkg: Vec<String>,
    #[arg(long = "blacklist-map")]
    pub blacklist_map: Vec<PathBuf>,
    /// TOML run configuration; flags are applied on top
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct StripArgs {
    #[arg(long)]
    pub input: PathBuf,
    #[arg(long)]
    pub output: PathBuf,
    /// Directive files listing classes and members to strip
    #[arg(long, required = true)]
    pub data: Vec<PathBuf>,
}
