//! Terminal shell: mounts one page at a time and re-renders on controller events.

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::DetectorApi;
use crate::config::Config;
use crate::disclosure::DisclosureController;
use crate::events::EventBus;
use crate::feed::FeedStore;
use crate::routes::Route;
use crate::session::SessionController;
use crate::view;

pub const HELP: &str = "Commands: /home /analytics /about | go (start/stop detector) | more (expand/collapse anomalies) | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Navigate(String),
    Go,
    More,
    Help,
    Redraw,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.starts_with('/') {
        return Command::Navigate(line.to_string());
    }
    match line.to_ascii_lowercase().as_str() {
        "" => Command::Redraw,
        "go" => Command::Go,
        "more" | "less" => Command::More,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The mounted page. Replacing it drops the old page's controllers, which cancels
/// their timers.
pub enum Page<A: DetectorApi> {
    Home(SessionController<A>),
    Analytics {
        feed: FeedStore,
        disclosure: DisclosureController,
    },
    About,
    NotFound(String),
}

pub struct App<A: DetectorApi> {
    api: Arc<A>,
    config: Config,
    bus: EventBus,
    route: Route,
    page: Page<A>,
    notice: Option<String>,
}

impl<A: DetectorApi> App<A> {
    /// Build the shell mounted on the root route.
    pub fn new(api: Arc<A>, config: Config, bus: EventBus) -> Self {
        let route = Route::parse("/");
        let page = mount(&route, &api, &config, &bus);
        Self {
            api,
            config,
            bus,
            route,
            page,
            notice: None,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn page(&self) -> &Page<A> {
        &self.page
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn navigate(&mut self, path: &str) {
        let route = Route::parse(path);
        info!(path = route.path(), "Navigating");
        // Unmount before mounting so the old page's timers are gone first.
        self.page = Page::About;
        self.page = mount(&route, &self.api, &self.config, &self.bus);
        self.route = route;
    }

    /// Finish mount-time work for the current page: the one feed fetch on analytics.
    /// Returns true if anything changed.
    pub async fn settle(&mut self) -> bool {
        match &mut self.page {
            Page::Analytics { feed, .. } if feed.is_loading() => {
                feed.load(self.api.as_ref()).await;
                true
            }
            _ => false,
        }
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        self.notice = None;
        match command {
            Command::Navigate(path) => self.navigate(&path),
            Command::Go => match &mut self.page {
                Page::Home(session) => {
                    session.toggle().await;
                }
                _ => self.notice = Some("`go` is only available on /home".to_string()),
            },
            Command::More => match &mut self.page {
                Page::Analytics { feed, disclosure }
                    if DisclosureController::is_available(feed.items().len()) =>
                {
                    disclosure.toggle();
                }
                _ => self.notice = Some("Nothing to expand here".to_string()),
            },
            Command::Help => self.notice = Some(HELP.to_string()),
            Command::Redraw => {}
            Command::Quit => return Flow::Quit,
            Command::Unknown(text) => {
                self.notice = Some(format!("Unknown command '{}'. {}", text, HELP));
            }
        }
        Flow::Continue
    }

    pub fn render(&self) -> String {
        let mut out = view::render_navbar(&self.route);
        out.push_str("\n\n");
        let body = match &self.page {
            Page::Home(session) => view::render_home(&view::home_view(&session.snapshot())),
            Page::Analytics { feed, disclosure } => view::render_analytics(feed, disclosure),
            Page::About => view::render_about(),
            Page::NotFound(path) => view::render_not_found(path),
        };
        out.push_str(&body);
        if let Some(notice) = &self.notice {
            out.push('\n');
            out.push_str(notice);
            out.push('\n');
        }
        out
    }
}

fn mount<A: DetectorApi>(route: &Route, api: &Arc<A>, config: &Config, bus: &EventBus) -> Page<A> {
    match route {
        Route::Home => Page::Home(SessionController::new(
            Arc::clone(api),
            config.poll_interval(),
            bus.clone(),
        )),
        Route::Analytics => Page::Analytics {
            feed: FeedStore::new(),
            disclosure: DisclosureController::new(
                config.frame_interval(),
                config.collapse_delay(),
                bus.clone(),
            ),
        },
        Route::About => Page::About,
        Route::NotFound(path) => Page::NotFound(path.clone()),
    }
}

fn draw<W: Write>(out: &mut W, frame: &str) -> Result<(), String> {
    crossterm::execute!(
        out,
        crossterm::terminal::Clear(crossterm::terminal::ClearType::All),
        crossterm::cursor::MoveTo(0, 0)
    )
    .map_err(|e| e.to_string())?;
    out.write_all(frame.as_bytes()).map_err(|e| e.to_string())?;
    writeln!(out, "\n> ").map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// Line input with a queue for lines typed while a command was still running.
struct Input<R> {
    lines: Lines<R>,
    queued: VecDeque<String>,
    open: bool,
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            queued: VecDeque::new(),
            open: true,
        }
    }

    /// Next line, queued ones first. `None` once input is closed and drained.
    async fn next(&mut self) -> Result<Option<String>, String> {
        if let Some(line) = self.queued.pop_front() {
            return Ok(Some(line));
        }
        if !self.open {
            return Ok(None);
        }
        let line = self.lines.next_line().await.map_err(|e| e.to_string())?;
        if line.is_none() {
            debug!("Input closed");
            self.open = false;
        }
        Ok(line)
    }
}

enum Outcome<T> {
    Done(T),
    Quit,
}

/// Run `work` to completion unless `quit` is typed or `shutdown` fires first.
/// Any other line typed meanwhile is queued for after `work` finishes.
async fn until_quit<T, R, S>(
    work: impl Future<Output = T>,
    input: &mut Input<R>,
    mut shutdown: Pin<&mut S>,
) -> Result<Outcome<T>, String>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(work);
    loop {
        tokio::select! {
            // Finished work wins over input that is already buffered.
            biased;
            output = &mut work => return Ok(Outcome::Done(output)),
            line = input.lines.next_line(), if input.open => {
                match line.map_err(|e| e.to_string())? {
                    Some(line) if parse_command(&line) == Command::Quit => {
                        info!("Quit while a request was pending");
                        return Ok(Outcome::Quit);
                    }
                    Some(line) => input.queued.push_back(line),
                    None => input.open = false,
                }
            }
            _ = shutdown.as_mut() => {
                info!("Interrupted while a request was pending");
                return Ok(Outcome::Quit);
            }
        }
    }
}

/// Drive the shell until `quit`, end of input, or `shutdown`.
///
/// Pending requests never block quitting: a hung start or feed fetch is abandoned
/// when the user quits or `shutdown` fires.
pub async fn drive<A, R, W, S>(
    mut app: App<A>,
    reader: R,
    out: &mut W,
    shutdown: S,
) -> Result<(), String>
where
    A: DetectorApi,
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut events = app.bus().subscribe();
    let mut input = Input::new(reader);

    draw(out, &app.render())?;
    match until_quit(app.settle(), &mut input, shutdown.as_mut()).await? {
        Outcome::Done(true) => draw(out, &app.render())?,
        Outcome::Done(false) => {}
        Outcome::Quit => return Ok(()),
    }

    loop {
        tokio::select! {
            line = input.next() => {
                let Some(line) = line? else {
                    break;
                };
                let command = parse_command(&line);
                match until_quit(app.handle(command), &mut input, shutdown.as_mut()).await? {
                    Outcome::Done(Flow::Continue) => {}
                    Outcome::Done(Flow::Quit) | Outcome::Quit => break,
                }
                draw(out, &app.render())?;
                match until_quit(app.settle(), &mut input, shutdown.as_mut()).await? {
                    Outcome::Done(true) => draw(out, &app.render())?,
                    Outcome::Done(false) => {}
                    Outcome::Quit => break,
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => debug!(event = event.name, "Redrawing"),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event bus lagged"),
                    Err(RecvError::Closed) => break,
                }
                draw(out, &app.render())?;
            }
            _ = shutdown.as_mut() => {
                info!("Interrupted");
                break;
            }
        }
    }
    // Dropping the app disposes the mounted page's controllers.
    drop(app);
    Ok(())
}

/// Run the shell on the process's stdin/stdout with Ctrl-C as shutdown.
pub async fn run_shell<A: DetectorApi>(app: App<A>) -> Result<(), String> {
    let mut stdout = std::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };
    drive(app, BufReader::new(tokio::io::stdin()), &mut stdout, shutdown).await
}
