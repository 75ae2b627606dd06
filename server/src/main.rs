use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use eventease_server::cli_error::CliError;
use log::{error, warn};

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run_command(args.command) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve => eventease_server::web::serve(),
        Command::MigrateDb => eventease_server::cli::database_migration::run_migrations(),
        Command::ListBookings { search } => {
            eventease_server::cli::manage_bookings::print_booking_list(search.as_deref())
        }
    }
}

/// Venue, event and booking management for EventEase
#[derive(Debug, Parser)]
#[clap(name = "eventease", version)]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the EventEase web API
    Serve,
    /// Apply pending database schema migrations
    MigrateDb,
    /// Print the list of bookings
    ListBookings {
        /// Only list bookings whose event name, venue name or date contains this text
        #[clap(long, short)]
        search: Option<String>,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
