use anyhow::Result;
use clap::Parser;
use client_core::{connect_store, RootState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod console;
mod view;

use console::ConsoleCommand;

#[derive(Parser, Debug)]
#[command(about = "Console client for the todo and command demos")]
struct Args {
    #[arg(long, env = "APP__SERVER_URL", default_value = "http://localhost:4000")]
    server_url: String,
    /// Start with the two sample local todos.
    #[arg(long)]
    sample: bool,
    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Logs go to stderr so they do not interleave with the rendered view.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut initial = RootState::default();
    if args.sample {
        initial.todo = client_core::ducks::todo::TodoState::sample();
    }
    let mut store = connect_store(&args.server_url, initial)?;
    info!(server_url = %args.server_url, "playground: ready");
    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_view = view::render(store.state());
    print!("{last_view}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match console::parse(&line) {
                    Ok(Some(ConsoleCommand::Dispatch(action))) => store.dispatch(action),
                    Ok(Some(ConsoleCommand::State)) => println!("{:#?}", store.state()),
                    Ok(Some(ConsoleCommand::Help)) => println!("{}", console::HELP),
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            Some(_) = store.step() => {
                let rendered = view::render(store.state());
                if rendered != last_view {
                    print!("{rendered}");
                    last_view = rendered;
                }
            }
        }
    }

    store.deps().subscriptions.reset().await;
    if let Err(err) = std::io::Write::flush(&mut std::io::stdout()) {
        error!(%err, "playground: failed to flush stdout");
    }
    Ok(())
}
