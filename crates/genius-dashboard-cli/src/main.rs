//! # Genius Dashboard CLI
//!
//! Command-line utilities for robot addresses, topic paths and bridge topics.

use anyhow::{Context, Result};
use genius_dashboard_core::TopicPath;
use genius_dashboard_proto::{FrameKind, ServerAddr, TopicScheme};
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "address" => {
            if args.len() < 3 {
                eprintln!("Usage: genius-dashboard address <team> [real|sim|host]");
                std::process::exit(1);
            }
            let team = parse_team(&args[2])?;
            let server = match args.get(3) {
                Some(addr) => addr.parse::<ServerAddr>()?,
                None => ServerAddr::Real,
            };
            println!("{}", server.host(team));
        }
        "segments" => {
            if args.len() < 3 {
                eprintln!("Usage: genius-dashboard segments <path>");
                std::process::exit(1);
            }
            let path = TopicPath::parse(&args[2]).context("Invalid topic path")?;
            for segment in path.segments() {
                println!("{segment}");
            }
        }
        "topic" => {
            if args.len() < 4 {
                eprintln!("Usage: genius-dashboard topic <team> <path> [value|announce|publish]");
                std::process::exit(1);
            }
            let team = parse_team(&args[2])?;
            let path = TopicPath::parse(&args[3]).context("Invalid topic path")?;
            let kind = match args.get(4).map(String::as_str) {
                None | Some("value") => FrameKind::Value,
                Some("announce") => FrameKind::Announce,
                Some("publish") => FrameKind::Publish,
                Some(other) => anyhow::bail!("Unknown frame kind: {other}"),
            };
            println!("{}", TopicScheme::new(team).topic(kind, &path));
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_team(input: &str) -> Result<u32> {
    let team: u32 = input
        .parse()
        .with_context(|| format!("Invalid team number: {input}"))?;
    anyhow::ensure!(team > 0, "Team number must be positive");
    Ok(team)
}

fn print_help() {
    println!(
        r#"Genius Dashboard CLI

USAGE:
    genius-dashboard <COMMAND> [OPTIONS]

COMMANDS:
    address <team> [server]    Print the host to connect to (server: real, sim or a host)
    segments <path>            Split a topic path into its segments
    topic <team> <path> [kind] Print the bridge MQTT topic for a path (kind: value, announce, publish)
    help                       Show this help message

EXAMPLES:
    genius-dashboard address 1678
    genius-dashboard segments /SmartDashboard/Auto/selected
    genius-dashboard topic 1678 "/SmartDashboard/Shooter Speed" publish
"#
    );
}
