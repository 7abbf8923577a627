//! Robot addressing.
//!
//! The robot controller of team `TEAM` lives at `10.TE.AM.2`, where `TE` is
//! `TEAM / 100` and `AM` is `TEAM % 100`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Address of the robot controller for a team number.
#[must_use]
pub fn robot_host(team: u32) -> String {
    format!("10.{}.{}.2", team / 100, team % 100)
}

/// Where the dashboard connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAddr {
    /// The real robot, addressed by team number
    Real,
    /// A simulator on this machine
    Sim,
    /// Any other host, used verbatim
    Custom(String),
}

impl ServerAddr {
    /// Host to connect to for `team`.
    #[must_use]
    pub fn host(&self, team: u32) -> String {
        match self {
            ServerAddr::Real => robot_host(team),
            ServerAddr::Sim => "127.0.0.1".to_string(),
            ServerAddr::Custom(host) => host.clone(),
        }
    }

    /// Whether no address was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, ServerAddr::Custom(host) if host.trim().is_empty())
    }
}

impl FromStr for ServerAddr {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "real" => ServerAddr::Real,
            "sim" => ServerAddr::Sim,
            other => ServerAddr::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerAddr::Real => f.write_str("real"),
            ServerAddr::Sim => f.write_str("sim"),
            ServerAddr::Custom(host) => f.write_str(host),
        }
    }
}
