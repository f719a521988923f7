use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::{
    ffi::OsString,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};
use wxcast_core::{Config, WeatherQuery, WxClient};

use crate::{
    commands::{self, Output},
    render::{colors, render_styled},
};

pub const LICENSE: &str = "wxcast Copyright (C) wxcast contributors. (MIT License)\n\n\
                           See LICENSE for more information.";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "wxcast",
    version,
    about = "Retrieve the latest weather information.",
    long_about = "Retrieve the latest weather information.\n\n\
                  Data provided by the NWS and aviationweather.gov APIs."
)]
pub struct Cli {
    /// Display license information and exit.
    #[arg(long)]
    pub license: bool,

    /// Remove ANSI color and styling from output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print directly instead of through $PAGER.
    #[arg(long, global = true)]
    pub no_pager: bool,

    /// Print the fetched data as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file with named locations.
    #[arg(long, global = true, env = "WXCAST_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Retrieve the latest METAR for an airport.
    ///
    /// Example: wxcast metar -d KSLC
    Metar {
        /// ICAO airport code.
        icao: String,

        /// Decode the raw METAR into named fields.
        #[arg(short, long)]
        decoded: bool,
    },

    /// Retrieve an NWS text product.
    ///
    /// Example: wxcast text slc afd
    Text {
        /// Weather forecast office code.
        office: String,
        /// Product code, e.g. AFD.
        product: String,
    },

    /// List the text products available for an office.
    ///
    /// Example: wxcast products slc
    Products {
        office: String,
    },

    /// List all NWS weather forecast offices.
    Offices,

    /// Show information about a weather forecast office.
    ///
    /// Example: wxcast office slc
    Office {
        office: String,
    },

    /// List the observation stations of an office.
    ///
    /// Example: wxcast stations slc
    Stations {
        office: String,
    },

    /// Show information about an observation station.
    ///
    /// Example: wxcast station kslc
    Station {
        station_id: String,
    },

    /// Retrieve the 7 day forecast for a location.
    ///
    /// The location is a name from the config file or any place the
    /// geocoder knows. Without one the config's [default] location is used.
    ///
    /// Example: wxcast forecast denver, co
    Forecast {
        #[arg(num_args = 0..)]
        location: Vec<String>,
    },
}

impl Command {
    /// The code, id or place the command is about.
    pub fn identifier(&self) -> String {
        match self {
            Command::Metar { icao, .. } => icao.clone(),
            Command::Text { office, .. }
            | Command::Products { office }
            | Command::Office { office }
            | Command::Stations { office } => office.clone(),
            Command::Offices => String::new(),
            Command::Station { station_id } => station_id.clone(),
            Command::Forecast { location } => location.join(" "),
        }
    }

    fn decode(&self) -> bool {
        matches!(self, Command::Metar { decoded: true, .. })
    }
}

impl Cli {
    /// Color is on unless `--no-color` or `NO_COLOR` says otherwise.
    pub fn color_enabled(&self) -> bool {
        color_allowed(self.no_color, std::env::var_os("NO_COLOR"))
    }

    pub async fn run(self) -> anyhow::Result<ExitCode> {
        if self.license {
            println!("{LICENSE}");
            return Ok(ExitCode::SUCCESS);
        }

        let Some(command) = self.command.clone() else {
            Cli::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        };

        let config = Config::load(self.config.as_deref())?;
        let client = WxClient::new(config)?;

        self.run_command(&command, &client, &mut io::stdout(), &mut io::stderr())
            .await
    }

    /// Execute `command` against `client`. Output goes to `out`, a failure
    /// message to `err`.
    async fn run_command(
        &self,
        command: &Command,
        client: &WxClient,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> anyhow::Result<ExitCode> {
        let color = self.color_enabled();
        let query = WeatherQuery::new(command.identifier())
            .decoded(command.decode())
            .json(self.json)
            .color(color);

        tracing::debug!(?command, ?query, "running command");

        match commands::execute(command, client, &query).await {
            Ok(Output::Plain(text)) => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
                Ok(ExitCode::SUCCESS)
            }
            Ok(Output::Paged(text)) => {
                crate::pager::page(&text, !self.no_pager, out)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                tracing::debug!(kind = %e.kind(), "command failed");
                writeln!(err, "{}", render_styled(&e.to_string(), color, colors::ERROR))?;
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// An empty `NO_COLOR` does not disable color.
fn color_allowed(no_color_flag: bool, no_color_env: Option<OsString>) -> bool {
    !no_color_flag && no_color_env.is_none_or(|v| v.is_empty())
}
