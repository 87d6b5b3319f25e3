use std::{fs, io, sync::Arc, time::Duration};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use taskboard::{
    api_client::{ApiClient, ReqwestTransport},
    app::{event_channel, App, ChannelNavigator},
    config::Config,
    guard::LANDING_PATH,
    session::FileCookieStore,
    ui,
};

const TICK: Duration = Duration::from_millis(100);

fn init_tracing(config_dir: &std::path::Path) -> io::Result<()> {
    fs::create_dir_all(config_dir)?;
    let file = fs::File::create(Config::log_path(config_dir))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The terminal belongs to the UI, so logs go to a file.
    init_tracing(&Config::config_dir())?;
    let config = Config::load().inspect_err(|e| error!("{e}"))?;
    info!("Using backend at {}", config.api_base_url);

    let runtime = tokio::runtime::Runtime::new()?;
    let (tx, rx) = event_channel();
    let client = ApiClient::new(
        config.api_base_url.clone(),
        Arc::new(ReqwestTransport::new()),
        Arc::new(FileCookieStore::in_dir(&config.config_dir)),
        Arc::new(ChannelNavigator::new(tx.clone())),
    );
    let mut app = App::new(client, runtime.handle().clone(), tx, rx);
    app.navigate(LANDING_PATH);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("UI loop failed: {err}");
        eprintln!("{:?}", err);
    }
    info!("Shutting down");
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.drain_events();
        terminal.draw(|f| ui::draw(f, app))?;
        if app.should_quit {
            return Ok(());
        }

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }
    }
}
