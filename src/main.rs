use std::env;
use std::path::PathBuf;

use daily_quest::chart::{ChartConfig, ChartController, ChartMode, SvgBackend};
use daily_quest::controller::ViewController;
use daily_quest::export::resolve_export_dir;
use daily_quest::ui::TerminalView;
use daily_quest::{Result, TaskStore};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "usage: daily-quest <command>

commands:
  tasks                         list both users' tasks with the progress summary
  add <user> <content...>       create a task for user G/A (or 1/2)
  toggle <id>                   flip a task's completed state
  delete <id>                   delete a task
  progress [days] [--snapshot]  render the chart for a trailing window
  export [days]                 download the export payload to a file

environment:
  DAILY_QUEST_API         base URL of the tracker API (default http://127.0.0.1:8080)
  DAILY_QUEST_CHART       chart output path (default progress-chart.svg)
  DAILY_QUEST_EXPORT_DIR  directory for export downloads (default .)
";

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bad_usage();
    };

    let store = TaskStore::from_env()?;
    info!(base_url = store.base_url(), "daily quest client starting");

    let chart_path = resolve_chart_path();
    let chart = ChartController::new(SvgBackend::new(&chart_path), ChartConfig::default());
    let mut controller = ViewController::new(store, chart, TerminalView);
    controller.set_export_dir(resolve_export_dir());

    let outcome: Result<()> = match command.as_str() {
        "tasks" => controller.refresh().await,
        "add" => {
            let Some(user_id) = args.get(1).and_then(|raw| parse_user(raw)) else {
                bad_usage();
            };
            let content = args[2..].join(" ");
            match controller.load_tasks().await {
                Ok(()) => controller.on_create(user_id, &content).await.map(|_| ()),
                Err(err) => Err(err),
            }
        }
        "toggle" => {
            let Some(task_id) = args.get(1).and_then(|raw| raw.parse().ok()) else {
                bad_usage();
            };
            match controller.load_tasks().await {
                Ok(()) => controller.on_toggle(task_id).await.map(|_| ()),
                Err(err) => Err(err),
            }
        }
        "delete" => {
            let Some(task_id) = args.get(1).and_then(|raw| raw.parse().ok()) else {
                bad_usage();
            };
            match controller.load_tasks().await {
                Ok(()) => controller.on_delete(task_id).await,
                Err(err) => Err(err),
            }
        }
        "progress" => {
            let mut timeframe_days = None;
            let mut mode = ChartMode::TimeSeries;
            for arg in &args[1..] {
                if arg == "--snapshot" {
                    mode = ChartMode::Snapshot;
                } else if let Ok(days) = arg.parse() {
                    timeframe_days = Some(days);
                } else {
                    bad_usage();
                }
            }
            controller.set_chart_mode(mode);
            let outcome = match timeframe_days {
                Some(days) => controller.on_timeframe_change(days).await,
                None => controller.refresh_progress().await,
            };
            if outcome.is_ok() && controller.chart().is_rendered() {
                println!("chart written to {}", chart_path.display());
            }
            outcome
        }
        "export" => {
            if let Some(days) = args.get(1) {
                let Ok(days) = days.parse() else {
                    bad_usage();
                };
                controller.set_timeframe(days);
            }
            controller.on_export().await.map(|path| {
                println!("export written to {}", path.display());
            })
        }
        _ => bad_usage(),
    };

    // Failures were already rendered through the view surface.
    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_chart_path() -> PathBuf {
    if let Ok(path) = env::var("DAILY_QUEST_CHART") {
        return PathBuf::from(path);
    }
    PathBuf::from("progress-chart.svg")
}

fn parse_user(raw: &str) -> Option<u8> {
    match raw {
        "1" | "g" | "G" => Some(1),
        "2" | "a" | "A" => Some(2),
        _ => None,
    }
}

fn bad_usage() -> ! {
    eprint!("{USAGE}");
    std::process::exit(2);
}
