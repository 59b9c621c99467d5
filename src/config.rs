use clap::{arg, value_parser, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use crate::kalah::{Player, Position};
use crate::network::DEFAULT_PORT;
use crate::search::Strategy;
use crate::session::SessionConfig;

// 2 * 127 houses * 255 seeds still fits the u16 seed counters of the board
const MAX_HOUSES: u8 = 127;
const MAX_SEEDS: u16 = 255;
// roughly eleven days, keeps the millisecond clock far from overflowing
const MAX_TIME_LIMIT_SECS: u64 = 1_000_000;

/// Value of `-p`: a bare port to listen on, or somebody to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Listen(u16),
    Dial { host: String, port: u16 },
}

// "[host:][port]"
fn parse_endpoint(s: &str) -> Result<Endpoint, String> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse()
            .map(Endpoint::Listen)
            .map_err(|_| format!("invalid port \"{}\"", s));
    }

    let (host, port) = match s.rsplit_once(':') {
        Some((host, "")) => (host, DEFAULT_PORT),
        Some((host, port)) => (host, port.parse().map_err(|_| format!("invalid port \"{}\"", port))?),
        None => (s, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(format!("missing host in \"{}\"", s));
    }

    Ok(Endpoint::Dial {
        host: host.to_owned(),
        port,
    })
}

/*====================================================================================================================*/

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub side: Player,
    /// 0 lets the strategy pick its depth
    pub depth: u32,
    pub strategy: Strategy,
    pub rotate_evaluation: bool,
    pub max_moves: Option<u32>,

    pub listen_port: u16,
    pub remote: Option<(String, u16)>,

    pub verbosity: u8,

    pub start: bool,
    pub houses: u8,
    pub seeds: u16,
    pub time_limit_ms: u64,
}

impl PlayerConfig {
    pub fn command() -> Command {
        Command::new("kalah-player")
            .author(clap::crate_authors!())
            .version(clap::crate_version!())
            .about(concat!(
                "Computer player for Kalah on a broadcast channel. ",
                "Searches a move on receiving a position in which it is expected to draw."
            ))
            .after_help(format!("Available search strategies for '--strategy':\n{}", Strategy::listing()))
            .arg(arg!([side] "Side to play: O (default, moves first) or X").value_parser(["O", "X"]))
            .arg(
                arg!([strength] "Playing strength (search depth), depending on strategy")
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(-s --strategy <strategy> "Number or name of the search strategy")
                    .value_parser(|s: &str| s.parse::<Strategy>()),
            )
            .arg(arg!(-n --"no-eval-change" "Do not change evaluation function after own moves"))
            .arg(
                arg!(-m --"max-moves" <n> "Maximal number of own moves before terminating")
                    .value_parser(value_parser!(u32).range(1..)),
            )
            .arg(
                arg!(-p --port <endpoint> "Connection to the broadcast channel: [host:][port]. A bare port is listened on")
                    .value_parser(parse_endpoint)
                    .action(ArgAction::Append),
            )
            .arg(arg!(-v --verbose "Be verbose, repeat to be more verbose").action(ArgAction::Count))
            .arg(arg!(--start "Open the game instead of waiting for a position"))
            .arg(
                arg!(--houses <h> "Houses per side of the opening position")
                    .value_parser(value_parser!(u8).range(1..=MAX_HOUSES as i64))
                    .default_value("6"),
            )
            .arg(
                arg!(--seeds <s> "Seeds per house of the opening position")
                    .value_parser(value_parser!(u16).range(1..=MAX_SEEDS as i64))
                    .default_value("4"),
            )
            .arg(
                arg!(--"time-limit" <secs> "Time limit per side of the opening position, 0 for none")
                    .value_parser(value_parser!(u64).range(..=MAX_TIME_LIMIT_SECS))
                    .default_value("0"),
            )
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        let side = match matches.get_one::<String>("side").map(String::as_str) {
            Some("X") => Player::Black,
            _ => Player::White,
        };

        let mut listen_port = DEFAULT_PORT;
        let mut remote = None;

        // later values win, like repeated options usually do
        for endpoint in matches.get_many::<Endpoint>("port").into_iter().flatten() {
            match endpoint {
                Endpoint::Listen(port) => listen_port = *port,
                Endpoint::Dial { host, port } => remote = Some((host.clone(), *port)),
            }
        }

        PlayerConfig {
            side,
            depth: matches.get_one::<u32>("strength").copied().unwrap_or(0),
            strategy: matches.get_one::<Strategy>("strategy").copied().unwrap_or_default(),
            rotate_evaluation: !matches.get_flag("no-eval-change"),
            max_moves: matches.get_one::<u32>("max-moves").copied(),
            listen_port,
            remote,
            verbosity: matches.get_count("verbose"),
            start: matches.get_flag("start"),
            houses: matches.get_one::<u8>("houses").copied().unwrap_or(6),
            seeds: matches.get_one::<u16>("seeds").copied().unwrap_or(4),
            time_limit_ms: matches.get_one::<u64>("time-limit").copied().unwrap_or(0).saturating_mul(1000),
        }
    }

    pub fn parse() -> Self {
        PlayerConfig::from_matches(&PlayerConfig::command().get_matches())
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            local_color: self.side,
            max_moves: self.max_moves,
            rotate_evaluation: self.rotate_evaluation,
        }
    }

    pub fn opening_position(&self) -> Position {
        Position::new(self.houses, self.seeds, self.time_limit_ms)
    }
}

/*====================================================================================================================*/
