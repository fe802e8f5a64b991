//! Command Line Interface (CLI) arguments.

use clap::{Args, Parser, Subcommand};

/// Wellbore provider command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    /// Path to the dotenv file holding tenant, client and backend configuration
    #[arg(long, default_value = "~/.omniaapi", env = "WELLBORE_ENV_FILE")]
    pub env_file: String,
    /// Directory holding the token cache files. Tokens are stored as plain JSON readable by the
    /// owner only, not encrypted.
    #[arg(long, default_value = "~", env = "WELLBORE_CACHE_DIR")]
    pub cache_dir: String,
    /// Identifier of the provider instance
    #[arg(long, default_value = "wellbore-provider", env = "WELLBORE_PROVIDER_ID")]
    pub provider_id: String,
    #[command(subcommand)]
    pub command: Command,
}

/// Field or license selecting a set of drilled wellbores
#[derive(Args, Clone, Debug, PartialEq)]
pub struct Scope {
    /// Field name, e.g. "JOHAN SVERDRUP"
    #[arg(long)]
    pub field: Option<String>,
    /// License name, e.g. "PL265"
    #[arg(long)]
    pub license: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Print the names of the drilled wellbores in a field or license
    Names(Scope),
    /// Print the metadata of the drilled wellbores in a field or license
    Metadata(Scope),
    /// Print the trajectory of a drilled wellbore
    Trajectory {
        /// Unique wellbore identifier, e.g. "NO 16/2-D-5"
        #[arg(long)]
        wellbore: String,
        /// Start of the measured depth interval. Not applied unless positive.
        #[arg(long, default_value_t = 0.0)]
        md_min: f64,
        /// End of the measured depth interval
        #[arg(long)]
        md_max: Option<f64>,
    },
    /// Extract daily production and injection volumes
    ExtractPdm {
        /// Field to extract, may be repeated
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        /// Directory receiving the volume files and update marker
        #[arg(long, default_value = "production")]
        production_dir: String,
    },
    /// Extract outlines, faultlines, completions and perforations
    ExtractSsdl {
        /// Field to extract, may be repeated
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        /// Directory receiving completion and perforation files
        #[arg(long, default_value = "wells")]
        well_dir: String,
        /// Directory receiving outline and faultline files
        #[arg(long, default_value = "polygons")]
        polygon_dir: String,
    },
    /// Extract planned well overview and trajectories
    ExtractPlanned {
        /// Field to extract, may be repeated
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        /// Directory receiving the overview and the planned well directory
        #[arg(long, default_value = "wells")]
        well_dir: String,
    },
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
