mod api;
mod app;
mod cli;
mod config;
mod detail;
mod i18n;
mod input;
mod manifest;
mod menu;
mod model;
mod prefs;
mod toast;
mod ui;
mod workload;

use anyhow::{Context, Result};
use api::ApiClient;
use app::{App, AppCommand, AppEvent, InputMode};
use chrono::Utc;
use clap::Parser;
use cli::CliArgs;
use config::{SessionFile, Settings};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
    EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use model::View;
use prefs::PreferenceStore;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const UI_TICK: Duration = Duration::from_millis(100);

/// Session file plus its location; writes are best effort.
struct SessionStore {
    path: Option<PathBuf>,
    session: SessionFile,
}

impl SessionStore {
    fn update(&mut self, change: impl FnOnce(&mut SessionFile)) {
        change(&mut self.session);
        let Some(path) = self.path.as_deref() else {
            return;
        };
        if let Err(error) = self.session.save(path) {
            warn!("failed to persist session: {error:#}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = config::load_discovered_config()?;
    let session_path = config::session_path();
    let session = match session_path.as_deref() {
        Some(path) => SessionFile::load(path)?,
        None => SessionFile::default(),
    };
    let settings = Settings::resolve(&args, config, &session)?;
    let client = ApiClient::new(
        settings.api_url.clone(),
        settings.request_timeout,
        settings.token.clone(),
    )
    .context("failed to build HTTP client")?;
    info!(
        api_url = client.base_url(),
        config = settings.config_source.as_deref().unwrap_or("none"),
        commit = config::commit_hash(),
        "starting stellar-deck"
    );
    let prefs = PreferenceStore::new(settings.preferences);
    let mut app = App::new(
        settings.namespace.clone(),
        prefs.clone(),
        settings.plugins.clone(),
        client.has_token(),
    );
    let store = SessionStore {
        path: session_path,
        session,
    };

    run(&mut app, client, &prefs, store, settings.refresh).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(
    app: &mut App,
    client: ApiClient,
    prefs: &PreferenceStore,
    store: SessionStore,
    refresh: Duration,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, client, prefs, store, refresh).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )
    .context("failed to enter alternate screen")?;
    if keyboard_enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to push keyboard enhancement flags")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    mut client: ApiClient,
    prefs: &PreferenceStore,
    mut store: SessionStore,
    refresh: Duration,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut reader = EventStream::new();
    let mut ticker = interval(UI_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut refresh_ticker = interval(refresh);
    refresh_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    refresh_ticker.reset();
    let mut prefs_rx = prefs.subscribe();

    let initial = app.initial_command();
    dispatch(app, &mut client, &mut store, initial, &tx);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            dispatch(app, &mut client, &mut store, command, &tx);
                        }
                    }
                    Some(Ok(Event::Mouse(mouse))) => {
                        if app.mode() == InputMode::Normal
                            && let Some(action) = input::map_mouse(mouse)
                        {
                            let command = app.apply_action(action);
                            dispatch(app, &mut client, &mut store, command, &tx);
                        }
                    }
                    Some(Ok(Event::Paste(text))) => app.paste(&text),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                app.on_tick(Instant::now());
            }
            _ = refresh_ticker.tick() => {
                if app.mode() != InputMode::Login {
                    let command = app.refresh_command();
                    dispatch(app, &mut client, &mut store, command, &tx);
                }
            }
            Some(event) = rx.recv() => {
                let command = app.handle_event(event);
                dispatch(app, &mut client, &mut store, command, &tx);
            }
            changed = prefs_rx.changed() => {
                if changed.is_ok() {
                    let current = *prefs_rx.borrow_and_update();
                    store.update(|session| {
                        session.theme = Some(current.theme);
                        session.locale = Some(current.locale);
                    });
                }
            }
        }
    }

    Ok(())
}

fn spawn_event(tx: &UnboundedSender<AppEvent>, task: impl Future<Output = AppEvent> + Send + 'static) {
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = task.await;
        if tx.send(event).is_err() {
            debug!("event loop closed before task result arrived");
        }
    });
}

fn dispatch(
    app: &mut App,
    client: &mut ApiClient,
    store: &mut SessionStore,
    command: AppCommand,
    tx: &UnboundedSender<AppEvent>,
) {
    match command {
        AppCommand::None => {}
        AppCommand::CheckSession => {
            let client = client.clone();
            spawn_event(tx, async move {
                AppEvent::SessionChecked(client.current_user().await)
            });
        }
        AppCommand::RefreshView { view, namespace } => {
            spawn_event(tx, load_view(client.clone(), view, namespace));
        }
        AppCommand::FetchResource { target, generation } => {
            let client = client.clone();
            spawn_event(tx, async move {
                AppEvent::ResourceLoaded {
                    generation,
                    result: client.fetch_resource(&target).await,
                }
            });
        }
        AppCommand::FetchGroup {
            namespace,
            generation,
        } => {
            let client = client.clone();
            spawn_event(tx, async move {
                AppEvent::GroupLoaded {
                    generation,
                    result: client.namespace_details(&namespace).await,
                }
            });
        }
        AppCommand::Submit(request) => {
            let client = client.clone();
            spawn_event(tx, async move {
                AppEvent::SubmitFinished(workload::submit_workload(&client, request).await)
            });
        }
        AppCommand::PluginSnapshot { id } => {
            let client = client.clone();
            spawn_event(tx, async move {
                let result = client.plugin_snapshot(&id).await;
                AppEvent::PluginLoaded { id, result }
            });
        }
        AppCommand::Login { username, password } => {
            let client = client.clone();
            spawn_event(tx, async move {
                AppEvent::LoginFinished(client.login(&username, &password).await)
            });
        }
        AppCommand::StoreToken {
            token,
            then_refresh,
        } => {
            client.set_token(Some(token.clone()));
            store.update(|session| session.token = Some(token));
            let next = AppCommand::RefreshView {
                view: then_refresh,
                namespace: app.namespace().to_string(),
            };
            dispatch(app, client, store, next, tx);
        }
        AppCommand::ForgetToken => {
            client.set_token(None);
            store.update(|session| session.token = None);
        }
    }
}

async fn load_view(client: ApiClient, view: View, namespace: String) -> AppEvent {
    let now = Utc::now();
    let result = match view {
        View::Workloads => client
            .list_workloads()
            .await
            .map(|workloads| model::workload_table(workloads, now)),
        View::Services => client
            .list_services(&namespace)
            .await
            .map(|services| model::service_table(services, now)),
        View::Namespaces => client.list_namespaces().await.map(model::namespace_table),
        View::Clusters => client
            .list_clusters()
            .await
            .map(|inventory| model::cluster_table(inventory, now)),
    };
    AppEvent::ViewLoaded {
        view,
        namespace,
        result,
    }
}

