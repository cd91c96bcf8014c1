use amp_sim::config::SimulatorConfig;
use amp_sim::format;
use amp_sim::framing::CommandFramer;
use amp_sim::panel::{FrontPanel, Gesture};
use amp_sim::{Attribute, Simulator, UpdateMode};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Number of protocol lines kept in the panel's log view.
const LOG_CAPACITY: usize = 200;

/// Integrated amplifier RS-232 simulator.
#[derive(Parser, Debug)]
#[command(name = "simulator_cli", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Type commands on stdin.
    Manual,
    /// Serve commands arriving on a serial port.
    Serial {
        #[arg(short, long)]
        port: Option<String>,
        #[arg(short, long)]
        baud: Option<u32>,
    },
    /// Interactive front panel.
    Panel,
    /// List available serial ports.
    Ports,
}

// The main entry point for the command-line simulator application.
fn main() -> Result<()> {
    // Logs go to stderr so they never mix with protocol output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimulatorConfig::default(),
    };

    match cli.mode {
        Mode::Manual => run_manual_mode(&config),
        Mode::Serial { port, baud } => {
            if port.is_some() {
                config.serial.port = port;
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            config.validate()?;
            run_serial_mode(&config)
        }
        Mode::Panel => run_panel_mode(&config),
        Mode::Ports => list_ports(),
    }
}

// Handles the manual command input mode.
fn run_manual_mode(config: &SimulatorConfig) -> Result<()> {
    let mut simulator = Simulator::with_update_mode(config.device.update_mode);
    info!("manual mode started; type 'quit' to exit");

    print!("> ");
    io::stdout().flush()?;

    for line in io::stdin().lock().lines() {
        let input = line?;
        let command = input.trim();

        if command == "quit" {
            break;
        }

        if !command.is_empty() {
            if let Some(response) = simulator.process_command(command) {
                println!("< {}", response);
            }
        }
        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}

// Handles the serial port listening mode.
fn run_serial_mode(config: &SimulatorConfig) -> Result<()> {
    let Some(port_name) = config.serial.port.as_deref() else {
        bail!("no serial port configured; pass --port or set serial.port");
    };
    let baud_rate = config.serial.baud_rate;

    let mut port = serialport::new(port_name, baud_rate)
        .timeout(Duration::from_millis(10))
        .open()
        .with_context(|| format!("failed to open port '{}'", port_name))?;

    info!(port = port_name, baud_rate, "listening");

    let mut simulator = Simulator::with_update_mode(config.device.update_mode);
    let mut framer = CommandFramer::new();
    let mut serial_buf: Vec<u8> = vec![0; 128];
    loop {
        match port.read(serial_buf.as_mut_slice()) {
            Ok(bytes_read) => {
                for command in framer.push(&serial_buf[..bytes_read]) {
                    info!(%command, "received");
                    if let Some(response) = simulator.process_command(&command) {
                        info!(%response, "sending");
                        if let Err(e) = port.write_all(response.as_bytes()) {
                            warn!(error = %e, "failed to write to serial port");
                        }
                    }
                }
            }
            Err(ref e)
                if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
            Err(e) => {
                return Err(e).with_context(|| format!("serial port '{}' failed", port_name));
            }
        }
    }
}

fn list_ports() -> Result<()> {
    let ports = serialport::available_ports().context("could not enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        println!("{}", port.port_name);
    }
    Ok(())
}

// State behind the interactive front panel.
struct PanelApp {
    simulator: Simulator,
    panel: FrontPanel,
    log: VecDeque<String>,
    started: Instant,
    should_quit: bool,
}

impl PanelApp {
    fn new(config: &SimulatorConfig) -> Self {
        Self {
            simulator: Simulator::with_update_mode(config.device.update_mode),
            panel: FrontPanel::new(&config.panel),
            log: VecDeque::with_capacity(LOG_CAPACITY),
            started: Instant::now(),
            should_quit: false,
        }
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    fn send(&mut self, command: &str) {
        self.push_log(format!("> {}!", command));
        if let Some(response) = self.simulator.process_command(command) {
            self.push_log(format!("< {}", response));
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Right => self.panel.gesture(Gesture::TurnClockwise),
            KeyCode::Left => self.panel.gesture(Gesture::TurnCounterClockwise),
            KeyCode::Char(' ') | KeyCode::Enter => self.panel.gesture(Gesture::PushKnob),
            KeyCode::Char('p') => self.panel.gesture(Gesture::PressPower),
            KeyCode::Char('a') => match self.simulator.state().update_mode() {
                UpdateMode::Auto => self.send("rs232_update_off"),
                UpdateMode::Manual => self.send("rs232_update_on"),
            },
            KeyCode::Char('f') => {
                let labels = format::FREQUENCY_LABELS.len() as i32;
                let next = (self.simulator.state().frequency() + 1) % labels;
                if let Some(response) = self.simulator.set_frequency(next) {
                    self.push_log(format!("< {}", response));
                }
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn tick(&mut self) {
        let now = self.now_ms();
        for command in self.panel.poll(now) {
            self.send(command);
        }
    }
}

// Restores the terminal however the panel exits.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!(error = %e, "failed to disable raw mode");
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
            warn!(error = %e, "failed to leave alternate screen");
        }
    }
}

fn run_panel_mode(config: &SimulatorConfig) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    panel_loop(&mut terminal, config)
}

fn panel_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &SimulatorConfig,
) -> Result<()> {
    let mut app = PanelApp::new(config);
    let tick_rate = Duration::from_millis(config.panel.tick_ms);
    let mut last_tick = Instant::now();

    while !app.should_quit {
        terminal.draw(|f| draw_ui(f, &app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn draw_ui(frame: &mut Frame, app: &PanelApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let state = app.simulator.state();
    let rows = [
        ("Power", Attribute::Power),
        ("Source", Attribute::Source),
        ("Mute", Attribute::Mute),
        ("Tone bypass", Attribute::Bypass),
        ("Bass", Attribute::Bass),
        ("Treble", Attribute::Treble),
        ("Balance", Attribute::Balance),
        ("Sample rate", Attribute::Frequency),
        ("RS-232 feedback", Attribute::UpdateMode),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(label, attribute)| {
            Line::from(format!("{:<16}{}", label, format::value(state, *attribute)))
        })
        .collect();
    let status =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Amplifier"));

    let volume = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Volume"))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(state.volume() as f64 / *amp_sim::VOLUME_RANGE.end() as f64)
        .label(format::value(state, Attribute::Volume));

    let items: Vec<ListItem> = app
        .log
        .iter()
        .rev()
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    let log = List::new(items).block(Block::default().borders(Borders::ALL).title("RS-232"));

    let help = Paragraph::new(
        "←/→ turn knob   space push knob   p power   a feedback   f sample rate   q quit",
    )
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(status, chunks[0]);
    frame.render_widget(volume, chunks[1]);
    frame.render_widget(log, chunks[2]);
    frame.render_widget(help, chunks[3]);
}
