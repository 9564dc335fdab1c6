//! twt CLI Client
//!
//! Command-line interface for reading and posting to a twtd server.

use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use twtstore::network::Client;
use twtstore::protocol::{Response, Status};
use twtstore::service::FEED_MEDIA_TYPE;

/// twt CLI
#[derive(Parser, Debug)]
#[command(name = "twt-cli")]
#[command(about = "CLI for a twtd feed server")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the feed
    Fetch {
        /// User agent to announce, e.g. "twtxt/1.2.3 (+https://example.com/twtxt.txt; @me)"
        #[arg(short, long, default_value = "")]
        user_agent: String,
    },

    /// Post a status line
    Post {
        /// The status text
        text: String,

        /// RFC 3339 timestamp (defaults to now)
        #[arg(short, long)]
        timestamp: Option<String>,

        #[arg(long, env = "TWTD_USR", hide_env_values = true, default_value = "")]
        user: String,

        #[arg(long, env = "TWTD_PWD", hide_env_values = true, default_value = "")]
        password: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Fetch { user_agent } => client.fetch(&user_agent),
        Commands::Post {
            text,
            timestamp,
            user,
            password,
        } => {
            let line = status_line(timestamp.as_deref(), &text);
            client.post(&user, &password, FEED_MEDIA_TYPE, line.as_bytes())
        }
        Commands::Ping => client.ping(),
    };

    match result {
        Ok(response) => std::process::exit(report(&response)),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Format a twtxt status line: `<timestamp>\t<text>\n`
fn status_line(timestamp: Option<&str>, text: &str) -> String {
    let timestamp = timestamp
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    let text = text.replace(['\r', '\n'], " ");
    format!("{timestamp}\t{text}\n")
}

/// Print a response and return the process exit code
fn report(response: &Response) -> i32 {
    match response.status {
        Status::Ok => {
            print!("{}", response.text());
            0
        }
        Status::NoContent => 0,
        status => {
            eprintln!("error ({:?}): {}", status, response.text());
            1
        }
    }
}
