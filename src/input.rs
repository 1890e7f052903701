//! Provides a means to read, parse and hold configuration options for runs.
use clap::Parser;
use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dispatcher::{SelectionPolicy, DEFAULT_TARGET};
use crate::ranges::DEFAULT_RANGES;

/// Where the addresses of a run come from, and how they are selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every address of the given range text is probed.
    Exhaustive { ranges: String },
    /// Addresses of the bundled ranges are sampled until `target` are good.
    RandomSample { target: usize },
}

impl RunMode {
    /// The range text this mode draws its pool from.
    #[must_use]
    pub fn ranges(&self) -> &str {
        match self {
            Self::Exhaustive { ranges } => ranges,
            Self::RandomSample { .. } => DEFAULT_RANGES,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> SelectionPolicy {
        match self {
            Self::Exhaustive { .. } => SelectionPolicy::Exhaustive,
            Self::RandomSample { target } => SelectionPolicy::RandomSample { target: *target },
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "frontprobe",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Finds addresses that answer like a TLS frontend.
/// Without --iprange, random addresses from the bundled ranges are probed
/// until --randtest good ones are found.
pub struct Opts {
    /// CIDRs, octet ranges (1.2.3-4.5-200) or domains to probe exhaustively,
    /// separated by commas, whitespace or newlines. May also name a file
    /// holding such text.
    #[arg(short, long)]
    pub iprange: Option<String>,

    /// How many good addresses to find when sampling the bundled ranges.
    /// 0 means the default of 20.
    #[arg(short, long, default_value = "0")]
    pub randtest: usize,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,

    /// Greppable mode. Only output the final line of good addresses.
    #[arg(short, long)]
    pub greppable: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// A comma-delimited list or file of DNS resolvers.
    #[arg(long)]
    pub resolver: Option<String>,

    /// How many probes may wait in the job queue at once.
    #[arg(short, long, default_value = "100")]
    pub batch_size: usize,

    /// The timeout in milliseconds for connecting to a candidate.
    #[arg(short, long, default_value = "1500")]
    pub timeout: u32,

    /// The number of tries before a candidate is given up.
    /// If set to 0, frontprobe will correct it to 1.
    #[arg(long, default_value = "3")]
    pub tries: u8,

    /// Automatically ups the ULIMIT with the value you provided.
    #[arg(short, long)]
    pub ulimit: Option<u64>,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    pub fn read() -> Self {
        Self::parse()
    }

    /// Reads the command line arguments into an Opts struct and merge
    /// values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(randtest, greppable, accessible, batch_size, timeout, tries);
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(iprange, resolver, ulimit);
    }

    /// Picks the run mode. Range text wins over sampling; when it names an
    /// existing file the file's contents are used instead.
    pub fn mode(&self) -> std::io::Result<RunMode> {
        match &self.iprange {
            Some(ranges) if Path::new(ranges).is_file() => Ok(RunMode::Exhaustive {
                ranges: fs::read_to_string(ranges)?,
            }),
            Some(ranges) => Ok(RunMode::Exhaustive {
                ranges: ranges.clone(),
            }),
            None => Ok(RunMode::RandomSample {
                target: if self.randtest == 0 {
                    DEFAULT_TARGET
                } else {
                    self.randtest
                },
            }),
        }
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            iprange: None,
            randtest: 0,
            greppable: true,
            batch_size: 0,
            timeout: 0,
            tries: 0,
            ulimit: None,
            accessible: false,
            resolver: None,
            no_config: true,
            config_path: None,
        }
    }
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Deserialize)]
pub struct Config {
    iprange: Option<String>,
    randtest: Option<usize>,
    greppable: Option<bool>,
    accessible: Option<bool>,
    batch_size: Option<usize>,
    timeout: Option<u32>,
    tries: Option<u8>,
    ulimit: Option<u64>,
    resolver: Option<String>,
}

#[cfg(not(tarpaulin_include))]
#[allow(clippy::doc_link_with_quotes)]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct.
    ///
    /// # Format
    ///
    /// iprange = "142.250-251.0-255.0-255, 216.58.192.0/19"
    /// randtest = 10
    /// batch_size = 200
    /// timeout = 1000
    /// tries = 2
    /// greppable = true
    ///
    pub fn read(custom_config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = match custom_config_path {
            Some(path) => path,
            None => default_config_path()?,
        };

        let content = if config_path.exists() {
            fs::read_to_string(&config_path).unwrap_or_default()
        } else {
            String::new()
        };

        toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Found {e} in configuration file {}", config_path.display())
        })
    }
}

/// Constructs default path to config toml
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let Some(mut config_path) = dirs::home_dir() else {
        anyhow::bail!("Could not infer config file path.");
    };
    config_path.push(".frontprobe.toml");
    Ok(config_path)
}
