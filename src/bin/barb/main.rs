mod commands;
mod display;

use barb::parse_args;

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn exit_with_error(err: &anyhow::Error) -> ! {
    eprintln!("{err:#}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.downcast_ref::<clap::Error>() {
            Some(clap_err) => handle_clap_help_version(clap_err),
            None => exit_with_error(&err),
        },
    };

    if let Err(err) = commands::run(cli).await {
        exit_with_error(&err);
    }
}
