use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::Block;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use sparktui::app::{App, LinkStatus, Pane, View};
use sparktui::config::Config;
use sparktui::signal::{
    EventBus, FileLinkStore, LinkStart, LinkStore, MemoryLinkStore, SignalCli, SignalError,
    Source, Subscription, Supervisor,
};
use sparktui::ui::{
    render_compose, render_compose_help, render_conversation, render_help, render_link_modal,
    render_log, render_sidebar, StatusInfo,
};
use sparktui::logging;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> Result<()> {
    let config = Arc::new(Config::load());
    if let Err(e) = logging::init_file(&config.logging) {
        eprintln!("Logging disabled: {:#}", e);
    }
    log::info!("Starting sparktui for account {:?}", config.self_id());

    let link_store: Box<dyn LinkStore> = match FileLinkStore::default_path() {
        Some(path) => Box::new(FileLinkStore::new(path, config.self_id())),
        None => {
            log::warn!("No data directory, link state will not persist");
            Box::new(MemoryLinkStore::default())
        }
    };
    let cli = SignalCli::new(config.daemon.clone(), config.self_id());
    let mut supervisor = Supervisor::new(cli, EventBus::new(), link_store);
    let events = supervisor.bus().subscribe();

    let mut app = App::new(Arc::clone(&config));
    match supervisor.start_daemon() {
        Ok(()) => app.set_status("Starting daemon..."),
        Err(e) => {
            log::error!("Daemon failed to start: {}", e);
            app.set_status(&format!("Daemon failed: {}", e));
        }
    }
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &mut supervisor, &events);

    supervisor.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    log::info!("Exiting");
    result
}

fn run(
    terminal: &mut Term,
    app: &mut App,
    supervisor: &mut Supervisor,
    events: &Subscription,
) -> Result<()> {
    loop {
        supervisor.poll();
        for event in events.drain() {
            app.handle_event(event);
        }
        // Linking talks to the daemon, so it waits for readiness
        if app.take_auto_link() {
            request_link(app, supervisor);
        }
        app.daemon_state = supervisor.state(Source::Daemon).label();

        terminal.draw(|f| render(app, f))?;

        if app.should_quit {
            return Ok(());
        }

        // Poll with timeout so process output shows up without key presses
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                handle_key(app, supervisor, key);
            }
        }
    }
}

fn handle_key(app: &mut App, supervisor: &mut Supervisor, key: KeyEvent) {
    match app.view {
        View::Compose => match key.code {
            KeyCode::Esc => app.cancel_compose(),
            KeyCode::Tab => app.compose_toggle_field(),
            KeyCode::Backspace => app.compose_backspace(),
            KeyCode::Enter => send(app, supervisor),
            KeyCode::Char(c) => app.compose_input(c),
            _ => {}
        },
        View::Chat if app.link_modal_visible() => match key.code {
            KeyCode::Esc => app.dismiss_link(),
            KeyCode::Char('L') => request_link(app, supervisor),
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        },
        View::Chat => {
            app.clear_status();
            match key.code {
                KeyCode::Char('q') => app.should_quit = true,
                KeyCode::Char('h') | KeyCode::Left => app.focused_pane = Pane::Sidebar,
                KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => {
                    app.focused_pane = Pane::Conversation;
                }
                KeyCode::Tab => app.focused_pane = app.focused_pane.next(),
                KeyCode::Char('j') | KeyCode::Down => match app.focused_pane {
                    Pane::Sidebar => app.next(),
                    Pane::Conversation => app.scroll_down(),
                    Pane::Log => {}
                },
                KeyCode::Char('k') | KeyCode::Up => match app.focused_pane {
                    Pane::Sidebar => app.previous(),
                    Pane::Conversation => app.scroll_up(),
                    Pane::Log => {}
                },
                KeyCode::Char('r') => match supervisor.start_receive() {
                    Ok(()) => {
                        app.begin_receive();
                        app.set_status("Receiving...");
                    }
                    Err(e) => app.set_status(&e.to_string()),
                },
                KeyCode::Char('c') => match supervisor.cli().list_contacts() {
                    Ok(contacts) => {
                        let count = contacts.len();
                        app.set_contacts(contacts);
                        app.set_status(&format!("{} contacts", count));
                    }
                    Err(e) => {
                        log::warn!("listContacts failed: {}", e);
                        app.set_status(&format!("Contacts failed: {}", e));
                    }
                },
                KeyCode::Char('i') => app.start_compose(),
                KeyCode::Char('L') => request_link(app, supervisor),
                _ => {}
            }
        }
    }
}

fn send(app: &mut App, supervisor: &Supervisor) {
    let recipient = app.compose.recipient.trim().to_string();
    let body = app.compose.body.trim().to_string();

    match supervisor.cli().send(&recipient, &body) {
        Ok(()) => {
            app.record_sent(&recipient, &body);
            app.cancel_compose();
            app.set_status("Sent");
        }
        Err(SignalError::EmptyMessage) => app.set_status("Recipient and message are required"),
        Err(e) => {
            log::warn!("Send to {} failed: {}", recipient, e);
            app.set_status(&format!("Send failed: {}", e));
        }
    }
}

fn request_link(app: &mut App, supervisor: &mut Supervisor) {
    match supervisor.start_link() {
        Ok(LinkStart::Started) => app.link = LinkStatus::Pending(None),
        Ok(LinkStart::AlreadyLinked) => app.link = LinkStatus::Linked,
        Ok(LinkStart::InProgress) => app.set_status("Link already in progress"),
        Err(e) => {
            log::error!("Link failed to start: {}", e);
            app.set_status(&format!("Link failed: {}", e));
        }
    }
}

fn render(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let config = app.config.clone();
    let theme = &config.theme;

    f.render_widget(Block::default().style(Style::default().bg(theme.bg())), area);

    // Panes, log, help bar
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(config.layout.log_height),
            Constraint::Length(1),
        ])
        .split(area);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(config.layout.sidebar_width),
            Constraint::Min(20),
        ])
        .split(rows[0]);

    let contacts = app.sidebar_contacts();
    app.sync_list_state();
    render_sidebar(
        f,
        panes[0],
        &contacts,
        &app.store,
        &mut app.list_state,
        app.focused_pane == Pane::Sidebar,
        theme,
    );

    let conversation_area = if app.view == View::Compose {
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(4)])
            .split(panes[1]);
        render_compose(f, split[1], &app.compose, theme);
        split[0]
    } else {
        panes[1]
    };

    let contact = app.selected_contact();
    render_conversation(
        f,
        conversation_area,
        &app.conversation(),
        contact.as_deref(),
        app.conversation_scroll,
        app.focused_pane == Pane::Conversation,
        theme,
    );

    if config.layout.log_height > 0 {
        render_log(f, rows[1], &app.log, app.focused_pane == Pane::Log, theme);
    }

    match app.view {
        View::Compose => render_compose_help(f, rows[2], theme),
        View::Chat => {
            let status = StatusInfo {
                daemon_ready: app.daemon_ready,
                daemon_state: &app.daemon_state,
                receiving: app.receiving,
                message: app.status_message.as_deref(),
            };
            render_help(f, rows[2], &status, theme);
        }
    }

    if app.link_modal_visible() {
        render_link_modal(f, area, &app.link, theme);
    }
}
