use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// geoconvert - Vector geospatial format conversion
#[derive(Parser, Debug)]
#[command(name = "geoconvert")]
#[command(about = "Convert and inspect vector geospatial datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./geoconvert.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Scratch-store root used for staging payloads
    #[arg(long, global = true, value_name = "PATH")]
    pub scratch_root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a dataset to another format
    Convert(ConvertArgs),

    /// Show a preview of a dataset's first layer
    Info(InfoArgs),

    /// Show version, engine, and configuration information
    Version,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input dataset (shapefiles are read from a .zip archive)
    pub input: PathBuf,

    /// Output path
    pub output: PathBuf,

    /// Input format (inferred from the input extension when omitted)
    #[arg(long, value_name = "FORMAT")]
    pub from: Option<String>,

    /// Output format (inferred from the output extension when omitted)
    #[arg(long, value_name = "FORMAT")]
    pub to: Option<String>,

    /// Source CRS, overriding the dataset's own
    #[arg(long, value_name = "CRS")]
    pub s_srs: Option<String>,

    /// Target CRS to reproject to
    #[arg(long, value_name = "CRS")]
    pub t_srs: Option<String>,

    /// Attribute filter, e.g. "population > 1000"
    #[arg(long = "where", value_name = "CLAUSE")]
    pub where_clause: Option<String>,

    /// Comma-separated fields to keep
    #[arg(long, value_delimiter = ',', value_name = "FIELDS")]
    pub select: Vec<String>,

    /// Simplification tolerance in layer units (0 disables)
    #[arg(long, default_value = "0")]
    pub simplify: f64,

    /// Split multi-part geometries into single features
    #[arg(long)]
    pub explode: bool,

    /// Keep Z coordinates
    #[arg(long)]
    pub keep_z: bool,

    /// CSV geometry encoding (AS_WKT or AS_XY)
    #[arg(long, value_name = "MODE")]
    pub csv_geometry: Option<String>,

    /// Number of decimals for coordinate-precision aware drivers
    #[arg(long, value_name = "N")]
    pub precision: Option<u8>,

    /// Output layer name
    #[arg(long, value_name = "NAME")]
    pub layer_name: Option<String>,

    /// Only keep one geometry family (point, multipoint, line, polygon)
    #[arg(long, value_name = "FAMILY")]
    pub family: Option<String>,

    /// Skip features that fail to convert instead of aborting
    #[arg(long)]
    pub skip_failures: bool,

    /// Overwrite the output file if it exists
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Input dataset
    pub input: PathBuf,

    /// Input format (inferred from the input extension when omitted)
    #[arg(long, value_name = "FORMAT")]
    pub from: Option<String>,

    /// CRS to display and to estimate the WGS84 extent from
    #[arg(long, value_name = "CRS")]
    pub s_srs: Option<String>,
}
