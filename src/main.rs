//! clips-driver - interactive console for stepping a CLIPS rule script
//!
//! Loads the script given on the command line, prints every lifecycle
//! notification as a JSON line on stdout and reads commands from stdin.

use clips_driver::{
    CadenceMode, Controller, DriverConfig, Notification, ProcessLoader, QuiescenceDomain,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
commands:
  resume | r | <enter>   release the worker for one turn
  mode RUN|RUN_ONE|STEP  change the cadence
  facts                  print the fact list
  agenda                 print the agenda
  state                  print the controller state
  stop                   cancel at the next turn boundary
  quit                   stop and exit
  help                   this text";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries notifications
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clips_driver=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let Some(script) = std::env::args().nth(1) else {
        eprintln!("usage: clips-driver <script.clp>");
        std::process::exit(2);
    };

    let config = DriverConfig::from_env();
    let loader = ProcessLoader::locate(config.clips_binary.as_deref())?;
    tracing::info!(binary = %loader.binary().display(), mode = %config.initial_mode, "Using CLIPS executable");

    let controller = Controller::new(loader, QuiescenceDomain::default(), config);
    let mut events = controller.subscribe_channel();

    {
        let controller = controller.clone();
        tokio::task::spawn_blocking(move || controller.start_engine(script.as_str())).await??;
    }
    controller.execute()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(notification) => {
                    println!("{}", serde_json::to_string(&notification)?);
                    if notification.is_terminal() {
                        break;
                    }
                    if notification == Notification::SetupDone && controller.mode().is_gated() {
                        eprintln!("suspended; type `resume` to advance, `help` for commands");
                    }
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !handle_command(&controller, line.trim()).await? {
                        break;
                    }
                }
                None => {
                    // Piped input ran out; let the run finish in RUN mode
                    stdin_open = false;
                    controller.set_mode(CadenceMode::Run);
                    controller.resume();
                }
            },
        }
    }

    // A worker waiting on a full channel gives up once the receiver is gone
    drop(events);
    {
        let controller = controller.clone();
        tokio::task::spawn_blocking(move || controller.join()).await??;
    }

    tracing::info!(state = %controller.state(), turns = controller.turns(), "Run ended");
    if let Some(report) = controller.with_domain(|d| d.report().cloned()) {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

/// Returns `false` when the console should exit
async fn handle_command(
    controller: &Controller<QuiescenceDomain>,
    command: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let (verb, arg) = match command.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (command, ""),
    };

    match verb {
        "" | "r" | "resume" => {
            if !controller.resume() {
                eprintln!("worker is not suspended");
            }
        }
        "mode" => match controller.set_mode_str(arg) {
            Ok(mode) => eprintln!("mode set to {mode}"),
            Err(e) => eprintln!("{e}"),
        },
        "facts" | "agenda" => {
            let controller = controller.clone();
            let want_facts = verb == "facts";
            let text = tokio::task::spawn_blocking(move || {
                if want_facts {
                    controller.get_fact_list()
                } else {
                    controller.get_agenda()
                }
            })
            .await?;
            match text {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("{e}"),
            }
        }
        "state" => eprintln!("{} ({} turns)", controller.state(), controller.turns()),
        "stop" => controller.stop(),
        "quit" | "q" | "exit" => {
            controller.stop();
            return Ok(false);
        }
        "help" | "?" => eprintln!("{HELP}"),
        other => eprintln!("unknown command `{other}`; type `help`"),
    }
    Ok(true)
}
