// steptrace: step-by-step program tracer with a terminal viewer

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use steptrace::config::TraceConfig;
use steptrace::machine::Library;
use steptrace::memory::Value;
use steptrace::sequencer::{Readiness, TraceRequest, TraceSequencer};
use steptrace::ui::App;

#[derive(Debug, Parser)]
#[command(name = "steptrace", version, about = "Step through programs one line at a time")]
struct Cli {
    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Trace a scripting-language source file
    Run {
        file: PathBuf,

        /// Stop recording after this many steps
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print the trace as JSON instead of opening the viewer
        #[arg(long)]
        json: bool,
    },
    /// Trace an algorithm from the built-in library
    Algo {
        id: String,

        #[arg(long)]
        preset: Option<String>,

        #[arg(long)]
        variant: Option<String>,

        /// Bind an input, e.g. `--set num=15` or `--set 'data=[3,1,2]'`
        #[arg(long = "set", value_name = "KEY=JSON", value_parser = parse_binding)]
        bindings: Vec<(String, Value)>,

        #[arg(long)]
        max_steps: Option<usize>,

        #[arg(long)]
        json: bool,
    },
    /// List the algorithm library
    List,
}

fn parse_binding(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got '{}'", arg))?;
    if key.is_empty() {
        return Err("binding name is empty".to_string());
    }
    // Bare words are taken as strings so `--set qVal=A` works unquoted
    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(&json),
        Err(_) => Value::str(raw),
    };
    Ok((key.to_string(), value))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "steptrace=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let library = Library::standard()?;

    let (request, config, bindings, json) = match cli.command {
        Command::List => {
            for descriptor in library.iter() {
                let mut extras = Vec::new();
                if !descriptor.presets.is_empty() {
                    let labels: Vec<&str> = descriptor.presets.iter().map(|p| p.label).collect();
                    extras.push(format!("presets: {}", labels.join(" ")));
                }
                if !descriptor.variants.is_empty() {
                    let ids: Vec<&str> = descriptor.variants.iter().map(|v| v.id).collect();
                    extras.push(format!("variants: {}", ids.join(" ")));
                }
                println!("{:<24} {}", descriptor.id, descriptor.title);
                if !extras.is_empty() {
                    println!("{:<24} {}", "", extras.join("; "));
                }
            }
            return Ok(());
        }
        Command::Run {
            file,
            max_steps,
            json,
        } => {
            let source = fs::read_to_string(&file)
                .map_err(|e| format!("cannot read '{}': {}", file.display(), e))?;
            let config = config_with(max_steps);
            (TraceRequest::Source(source), config, Vec::new(), json)
        }
        Command::Algo {
            id,
            preset,
            variant,
            bindings,
            max_steps,
            json,
        } => {
            let request = TraceRequest::Algorithm {
                id,
                preset,
                variant,
            };
            (request, config_with(max_steps), bindings, json)
        }
    };

    let mut sequencer = TraceSequencer::new(library);
    let mut readiness = sequencer.begin(request.clone(), config)?;
    for (key, value) in bindings {
        readiness = sequencer.supply(&key, value)?;
    }

    if json {
        if let Readiness::NotReady { missing } = readiness {
            eprintln!("Error: missing inputs: {}", missing.join(", "));
            eprintln!("Supply them with --set KEY=JSON or pick a --preset");
            std::process::exit(1);
        }
        for diagnostic in sequencer.diagnostics() {
            eprintln!("warning: {}", diagnostic);
        }
        let trace = sequencer.trace().ok_or("no trace was recorded")?;
        println!("{}", serde_json::to_string_pretty(trace)?);
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(sequencer, request, config);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn config_with(max_steps: Option<usize>) -> TraceConfig {
    match max_steps {
        Some(n) => TraceConfig::default().with_max_steps(n),
        None => TraceConfig::default(),
    }
}
