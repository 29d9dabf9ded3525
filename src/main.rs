use anyhow::Result;
use nala_core::{Config, Glossary};
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in a local .env
    dotenvy::dotenv().ok();

    match logging::init() {
        Ok(path) => info!(path = %path.display(), "logging started"),
        Err(err) => eprintln!("Logging disabled: {:#}", err),
    }

    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "could not read config, using defaults");
        Config::new()
    });

    let glossary = config.glossary().unwrap_or_else(|err| {
        warn!(error = %err, "could not load glossary, using built-in terms");
        Glossary::builtin(config.plural_matching)
    });

    let mut app = App::new(config, glossary);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Some(task) = app.turn_task.take() {
        task.abort();
    }
    info!("session ended");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }

        app.poll_turn().await;
    }

    Ok(())
}
