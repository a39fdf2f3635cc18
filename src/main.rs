mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use hexa::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    game::{Command, Game, GameEvent},
    runtime::{EventSource, HexaEvent, Runner, FRAME_INTERVAL},
    session::{PowerUpKind, SessionConfig, SessionOutcome, Signal, MAX_BOARD_SIZE},
    stats::StatsRecorder,
    store::{KvStore, MemoryStore, SqliteStore},
    theme::Theme,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long a wrong cell keeps shaking
const SHAKE_DURATION: Duration = Duration::from_millis(300);

/// timed hexagonal pattern-matching puzzle
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "Find the highlighted cell before the clock runs out. Correct picks score points and buy time, wrong picks cost time, and power-ups can rescue a session."
)]
pub struct Cli {
    /// number of cells on the board
    #[clap(short = 'b', long, value_parser = clap::value_parser!(u16).range(1..=MAX_BOARD_SIZE as i64))]
    board_size: Option<u16>,

    /// seconds on the clock when a session starts
    #[clap(short = 't', long = "time", value_parser = clap::value_parser!(i64).range(1..))]
    initial_time: Option<i64>,

    /// uses of the +10s power-up per session
    #[clap(long)]
    time_power_ups: Option<u32>,

    /// uses of the skip power-up per session
    #[clap(long)]
    skips: Option<u32>,

    /// uses of the thaw power-up per session
    #[clap(long)]
    thaws: Option<u32>,

    /// seed the board generator for reproducible sessions
    #[clap(long)]
    seed: Option<u64>,

    /// report session length to the stats so a best time is kept
    #[clap(long)]
    track_best_time: bool,

    /// color theme to use (0-3); remembered for next time
    #[clap(long, value_parser = clap::value_parser!(u8).range(0..4))]
    theme: Option<u8>,

    /// skip the home screen and start playing immediately
    #[clap(short = 'p', long)]
    play: bool,
}

impl Cli {
    /// Command line values win over the config file
    fn session_config(&self, base: &Config) -> SessionConfig {
        let mut cfg = SessionConfig::from(base);
        if let Some(size) = self.board_size {
            cfg.board_size = size as usize;
        }
        if let Some(secs) = self.initial_time {
            cfg.initial_time = secs;
        }
        if let Some(n) = self.time_power_ups {
            cfg.initial_power_ups.time = n;
        }
        if let Some(n) = self.skips {
            cfg.initial_power_ups.skip = n;
        }
        if let Some(n) = self.thaws {
            cfg.initial_power_ups.thaw = n;
        }
        cfg.track_best_time |= self.track_best_time;
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Home,
    Play,
    Stats,
    Settings,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Play,
    Stats,
    Settings,
    Help,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 5] = [
        MenuItem::Play,
        MenuItem::Stats,
        MenuItem::Settings,
        MenuItem::Help,
        MenuItem::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::Play => "Play",
            MenuItem::Stats => "Statistics",
            MenuItem::Settings => "Settings",
            MenuItem::Help => "How to play",
            MenuItem::Quit => "Quit",
        }
    }
}

/// Per-cell visual flags; these belong to the screen, never to the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellFlags {
    pub selected: bool,
    pub frozen: bool,
    pub shake: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct BoardView {
    pub flags: Vec<CellFlags>,
    pub cursor: usize,
}

impl BoardView {
    fn reset(&mut self, size: usize) {
        self.flags = vec![CellFlags::default(); size];
        self.cursor = self.cursor.min(size.saturating_sub(1));
    }

    fn clear_pattern_flags(&mut self) {
        for f in &mut self.flags {
            f.selected = false;
            f.frozen = false;
        }
    }

    fn thaw(&mut self) {
        for f in &mut self.flags {
            f.frozen = false;
        }
    }

    fn flag_mut(&mut self, index: usize) -> Option<&mut CellFlags> {
        self.flags.get_mut(index)
    }

    fn age(&mut self, dt: Duration) {
        for f in &mut self.flags {
            f.shake = f
                .shake
                .and_then(|left| left.checked_sub(dt))
                .filter(|left| !left.is_zero());
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.flags.len();
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + delta).rem_euclid(len as isize) as usize;
    }
}

pub struct App {
    pub session_config: SessionConfig,
    pub seed: Option<u64>,
    pub game: Option<Game>,
    pub state: AppState,
    pub menu_selected: usize,
    pub board: BoardView,
    pub recorder: StatsRecorder<Box<dyn KvStore>>,
    pub theme: Theme,
    pub last_outcome: Option<SessionOutcome>,
    pub confirm_reset: bool,
}

impl App {
    pub fn new(session_config: SessionConfig, seed: Option<u64>, store: Box<dyn KvStore>) -> Self {
        let theme = Theme::load(&store);
        Self {
            session_config,
            seed,
            game: None,
            state: AppState::Home,
            menu_selected: 0,
            board: BoardView::default(),
            recorder: StatsRecorder::load(store),
            theme,
            last_outcome: None,
            confirm_reset: false,
        }
    }

    /// Enters the play screen with a fresh session. The previous game, with
    /// its clock and any pending regeneration, is dropped.
    pub fn start_game(&mut self) -> Result<(), Box<dyn Error>> {
        let game = match self.seed {
            Some(seed) => Game::with_seed(self.session_config.clone(), seed)?,
            None => Game::new(self.session_config.clone())?,
        };
        self.game = Some(game);
        self.state = AppState::Play;
        self.restart();
        Ok(())
    }

    /// Starts over inside the current game
    pub fn restart(&mut self) {
        self.last_outcome = None;
        self.board.reset(self.session_config.board_size);
        self.dispatch(Command::Start, None);
    }

    /// Leaving mid-session ends it, so it still counts towards the stats
    pub fn leave_game(&mut self) {
        if let Some(mut game) = self.game.take() {
            if game.end().is_some() {
                info!(score = game.state().score, "session left early");
                let events = game.drain_events();
                self.apply(events, None);
            }
        }
        self.state = AppState::Home;
    }

    pub fn dispatch(&mut self, cmd: Command, cell: Option<usize>) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let events = game.update(cmd);
        self.apply(events, cell);
    }

    fn apply(&mut self, events: Vec<GameEvent>, cell: Option<usize>) {
        for event in events {
            match event {
                GameEvent::Started | GameEvent::PowerUpUsed(_) => {}
                GameEvent::PatternGenerated => self.board.clear_pattern_flags(),
                GameEvent::Signal(signal) => {
                    if let Some(flags) = cell.and_then(|i| self.board.flag_mut(i)) {
                        match signal {
                            Signal::Correct => flags.selected = true,
                            Signal::Incorrect => flags.shake = Some(SHAKE_DURATION),
                        }
                    }
                }
                GameEvent::Thawed => self.board.thaw(),
                GameEvent::Ended(outcome) => {
                    self.recorder.record(&outcome);
                    self.last_outcome = Some(outcome);
                }
            }
        }
    }

    pub fn select(&mut self, cell: usize) {
        self.board.cursor = cell.min(self.board.flags.len().saturating_sub(1));
        self.dispatch(Command::Select(cell), Some(cell));
    }

    pub fn use_power_up(&mut self, kind: PowerUpKind) {
        self.dispatch(Command::UsePowerUp(kind), None);
    }

    pub fn on_frame(&mut self, dt: Duration) {
        self.board.age(dt);
        self.dispatch(Command::Advance(dt), None);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        theme.save(self.recorder.store_mut());
    }

    /// Returns true when the app should exit
    pub fn on_key(&mut self, key: KeyEvent) -> Result<bool, Box<dyn Error>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }

        match self.state {
            AppState::Home => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(true),
                KeyCode::Up | KeyCode::Char('k') => {
                    self.menu_selected =
                        (self.menu_selected + MenuItem::ALL.len() - 1) % MenuItem::ALL.len();
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.menu_selected = (self.menu_selected + 1) % MenuItem::ALL.len();
                }
                KeyCode::Enter => return self.open(MenuItem::ALL[self.menu_selected]),
                KeyCode::Char('p') => return self.open(MenuItem::Play),
                KeyCode::Char('s') => return self.open(MenuItem::Stats),
                KeyCode::Char('o') => return self.open(MenuItem::Settings),
                KeyCode::Char('?') => return self.open(MenuItem::Help),
                _ => {}
            },
            AppState::Play => match key.code {
                KeyCode::Esc => self.leave_game(),
                KeyCode::Char('r') => self.restart(),
                KeyCode::Char('t') => self.use_power_up(PowerUpKind::Time),
                KeyCode::Char('s') => self.use_power_up(PowerUpKind::Skip),
                KeyCode::Char('h') => self.use_power_up(PowerUpKind::Thaw),
                KeyCode::Left => self.board.move_cursor(-1),
                KeyCode::Right => self.board.move_cursor(1),
                KeyCode::Enter | KeyCode::Char(' ') => self.select(self.board.cursor),
                KeyCode::Char(c @ '1'..='9') => {
                    let cell = (c as usize) - ('1' as usize);
                    self.select(cell);
                }
                _ => {}
            },
            AppState::Stats => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.state = AppState::Home
                }
                _ => {}
            },
            AppState::Settings => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.confirm_reset = false;
                    self.state = AppState::Home;
                }
                KeyCode::Left => self.set_theme(self.theme.prev()),
                KeyCode::Right | KeyCode::Tab => self.set_theme(self.theme.next()),
                KeyCode::Char(c @ '1'..='4') => {
                    self.set_theme(Theme::new((c as usize) - ('1' as usize)))
                }
                KeyCode::Char('x') => {
                    if self.confirm_reset {
                        self.recorder.reset();
                        info!("statistics cleared");
                    }
                    self.confirm_reset = !self.confirm_reset;
                }
                _ => self.confirm_reset = false,
            },
            AppState::Help => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.state = AppState::Home
                }
                KeyCode::Enter | KeyCode::Char('p') => return self.open(MenuItem::Play),
                _ => {}
            },
        }
        Ok(false)
    }

    fn open(&mut self, item: MenuItem) -> Result<bool, Box<dyn Error>> {
        match item {
            MenuItem::Play => self.start_game()?,
            MenuItem::Stats => self.state = AppState::Stats,
            MenuItem::Settings => self.state = AppState::Settings,
            MenuItem::Help => self.state = AppState::Help,
            MenuItem::Quit => return Ok(true),
        }
        Ok(false)
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    // stdout belongs to the terminal UI, so logs go to a file
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("HEXA_LOG").unwrap_or_else(|_| "hexa=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
}

fn open_store() -> Box<dyn KvStore> {
    match SqliteStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "stats database unavailable, progress will not be saved");
            Box::new(MemoryStore::new())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config = FileConfigStore::new().load();
    let session_config = cli.session_config(&config);
    if let Err(e) = session_config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
    }

    let mut app = App::new(session_config, cli.seed, open_store());
    if let Some(index) = cli.theme {
        app.set_theme(Theme::new(index as usize));
    }
    if cli.play {
        app.start_game()?;
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(EventSource::crossterm(), FRAME_INTERVAL);
    let mut last_frame = Instant::now();

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        let event = runner.step();

        // feed real elapsed time, key presses cut frames short
        let now = Instant::now();
        app.on_frame(now - last_frame);
        last_frame = now;

        match event {
            HexaEvent::Tick | HexaEvent::Resize => {}
            HexaEvent::Key(key) => {
                if app.on_key(key)? {
                    break;
                }
            }
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
