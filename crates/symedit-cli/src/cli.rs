use crate::utils::parser;
use clap::{Args, Parser, Subcommand};
use nalgebra::Point3;
use std::path::PathBuf;
use symedit::core::models::cell::UnitCell;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "SymEdit CLI - Inspect space groups, site symmetries and setting pathways, and try out symmetry-constrained edits.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to an engine configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S tolerances.pathway=1e-8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the built-in space groups and named settings.
    Groups,
    /// Print every operation of a space group.
    Ops(GroupArgs),
    /// Show the site symmetry and constraint of a fractional position.
    Site(PositionArgs),
    /// List the distinct symmetry images of a fractional position.
    Orbit(PositionArgs),
    /// Compose a '>'-separated group/subgroup/setting chain into one transform.
    Pathway(PathwayArgs),
    /// Place an atom with all its images, then drag it and report where the images went.
    Drag(DragArgs),
}

/// Arguments naming a single group.
#[derive(Args, Debug)]
pub struct GroupArgs {
    /// Group number, symbol, named setting or bracketed generators (e.g. 'P 21/c', '14:c,a,b').
    #[arg(required = true)]
    pub group: String,
}

/// Arguments for the `site` and `orbit` subcommands.
#[derive(Args, Debug)]
pub struct PositionArgs {
    /// Group number, symbol, named setting or bracketed generators.
    #[arg(required = true)]
    pub group: String,

    /// Fractional position as 'x,y,z'; fractions such as '1/4' are accepted.
    #[arg(required = true, value_parser = parser::parse_point, allow_hyphen_values = true)]
    pub position: Point3<f64>,

    /// Cell parameters as 'a,b,c,alpha,beta,gamma' (Angstrom and degrees).
    /// Defaults to a unit cube.
    #[arg(long, value_name = "PARAMS", value_parser = parser::parse_cell)]
    pub cell: Option<UnitCell>,
}

/// Arguments for the `pathway` subcommand.
#[derive(Args, Debug)]
pub struct PathwayArgs {
    /// The chain, e.g. '225>sub>139' or '14>c,a,b>P 1 1 21/a'.
    #[arg(required = true, allow_hyphen_values = true)]
    pub chain: String,

    /// Cell parameters of the first group as 'a,b,c,alpha,beta,gamma'.
    #[arg(long, value_name = "PARAMS", value_parser = parser::parse_cell)]
    pub cell: Option<UnitCell>,
}

/// Arguments for the `drag` subcommand.
#[derive(Args, Debug)]
pub struct DragArgs {
    /// Group number, symbol, named setting or bracketed generators.
    #[arg(required = true)]
    pub group: String,

    /// Fractional start position as 'x,y,z'.
    #[arg(long, required = true, value_parser = parser::parse_point, allow_hyphen_values = true)]
    pub from: Point3<f64>,

    /// Fractional target position as 'x,y,z'.
    #[arg(long, required = true, value_parser = parser::parse_point, allow_hyphen_values = true)]
    pub to: Point3<f64>,

    /// Cell parameters as 'a,b,c,alpha,beta,gamma'. Defaults to a unit cube.
    #[arg(long, value_name = "PARAMS", value_parser = parser::parse_cell)]
    pub cell: Option<UnitCell>,

    /// Reject drags off a line or plane constraint instead of projecting onto it.
    #[arg(long)]
    pub no_projection: bool,
}
