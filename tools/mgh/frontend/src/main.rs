mod board;
mod convert;
mod dac;
mod input;
mod library;
mod mux;
mod record;
mod render;
mod terminal;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mgh_core::audio::UNITY_VOLUME;
use mgh_core::{
    ControlEvent, DisplayShadow, GameConfig, GameLoop, JudgePolicy, PendingEvents, SongIndex, TickGate,
};
use rtrb::RingBuffer;
use tracing::{info, Level};
use tracing_subscriber::util::SubscriberInitExt;

use crate::board::{AutoPlayer, Button, HostBoard, InstantClock, Player};
use crate::input::Command;
use crate::library::DirLibrary;
use crate::mux::Panel;
use crate::render::PanelWidget;
use crate::terminal::Term;

/// Screen refresh interval.
const REDRAW: Duration = Duration::from_millis(40);

#[derive(Parser)]
#[command(name = "mgh")]
#[command(version, about = "Miniature Guitar Hero player and chart tools", long_about = None)]
struct Cli {
    /// Log verbosity. Logs go to stderr; redirect it while the panel is up
    /// (e.g. `2>mgh.log`)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play songs from a directory of <n>.txt charts and <n>.wav audio
    Play {
        /// Song directory
        #[arg(short, long, default_value = ".")]
        songs: PathBuf,

        /// Song to start on (defaults to 1)
        #[arg(long)]
        song: Option<u8>,

        /// Number of songs in the rotation
        #[arg(long, default_value_t = 7)]
        num_songs: u8,

        /// Press every due note automatically
        #[arg(long)]
        autoplay: bool,

        /// With --autoplay, miss every Kth note
        #[arg(long, value_name = "K", requires = "autoplay")]
        miss_every: Option<u32>,

        /// When presses are judged
        #[arg(long, value_enum, default_value_t = JudgeArg::EveryFrame)]
        judge: JudgeArg,

        /// Playback gain, 1024 is unity
        #[arg(long, default_value_t = UNITY_VOLUME)]
        volume: u16,

        /// Don't open an audio device
        #[arg(long)]
        mute: bool,
    },

    /// Play a WAV file and record d/f/j/k presses into <NAME>_0.txt .. <NAME>_3.txt
    Record {
        wav: PathBuf,

        /// Don't open an audio device
        #[arg(long)]
        mute: bool,
    },

    /// Build <NAME>_led.txt from the note times in <NAME>_0.txt .. <NAME>_3.txt
    Convert {
        name: String,
    },

    /// Print a chart's frame count and frames
    Inspect {
        chart: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum JudgeArg {
    EveryFrame,
    OnInputEdge,
}

impl From<JudgeArg> for JudgePolicy {
    fn from(arg: JudgeArg) -> Self {
        match arg {
            JudgeArg::EveryFrame => JudgePolicy::EveryFrame,
            JudgeArg::OnInputEdge => JudgePolicy::OnInputEdge,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn setup_logging(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(std::io::stderr)
        .compact()
        .finish()
        .init();
}

struct PlayOptions {
    songs: PathBuf,
    song: Option<u8>,
    autoplay: bool,
    miss_every: Option<u32>,
    mute: bool,
    config: GameConfig,
}

fn play(opts: PlayOptions) -> anyhow::Result<()> {
    ensure!(opts.songs.is_dir(), "{} is not a directory", opts.songs.display());
    ensure!(opts.config.num_songs > 0, "need at least one song");
    let first = opts
        .song
        .map(|n| SongIndex::new(n, opts.config.num_songs))
        .transpose()
        .context("--song")?;

    let events = Arc::new(PendingEvents::new());
    let shadow = Arc::new(DisplayShadow::new());
    let gate = Arc::new(TickGate::new());
    let panel = Arc::new(Panel::default());
    let quit = Arc::new(AtomicBool::new(false));

    let library = DirLibrary::new(&opts.songs);
    let sample_rate = library.sample_rate();

    // a few blocks of slack between the loop and the DAC
    let (producer, consumer) = RingBuffer::<i16>::new(opts.config.audio_block * 4);

    let term = Term::init()?;
    let started = Instant::now();
    let player = if opts.autoplay {
        Player::Auto(AutoPlayer::new(opts.miss_every))
    } else {
        Player::Keyboard(Button::new(term.reports_release()))
    };
    let board = HostBoard::new(InstantClock { instant: started }, player, producer, events.clone());

    let dac = dac::spawn(consumer, sample_rate, opts.mute, quit.clone());
    let mux = mux::spawn(shadow.clone(), panel.clone(), gate.clone(), quit.clone());

    let mut game = GameLoop::new(opts.config, library, board, &events, &shadow);
    game.boot();
    let result = match first.filter(|&s| s != SongIndex::FIRST) {
        Some(song) => game.select_song(song).map_err(anyhow::Error::from),
        None => Ok(()),
    }
    .and_then(|()| run(&mut game, term, &events, &panel, &gate));

    quit.store(true, Ordering::Relaxed);
    info!("quitting, final score {}", game.session().state().score);
    let _ = dac.join();
    let _ = mux.join();
    result
}

fn run(
    game: &mut GameLoop<'_, HostBoard, DirLibrary>,
    mut term: Term,
    events: &PendingEvents,
    panel: &Panel,
    gate: &TickGate,
) -> anyhow::Result<()> {
    let mut last_draw: Option<Instant> = None;

    loop {
        for event in input::poll_events() {
            match input::play_command(&event) {
                Some(Command::Strum(down)) => game.board_mut().strum(down),
                Some(Command::Next) => events.raise(ControlEvent::AdvanceSong),
                Some(Command::PlayPause) => events.raise(ControlEvent::PlayPause),
                Some(Command::Quit) => return Ok(()),
                None => {}
            }
        }

        game.board_mut().poll_input_edge();
        game.step();

        if last_draw.map_or(true, |at| at.elapsed() >= REDRAW) {
            last_draw = Some(Instant::now());
            let view = panel.view();
            let state = game.session().state();
            let widget = PanelWidget {
                view: &view,
                state: &state,
                reference: game.board().reference(),
                overruns: gate.missed(),
            };
            term.draw(|f| f.render_widget(widget, f.area()))?;
        }

        thread::sleep(Duration::from_millis(1));
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    match cli.command {
        Commands::Play { songs, song, num_songs, autoplay, miss_every, judge, volume, mute } => {
            let config = GameConfig { num_songs, volume, judge: judge.into(), ..Default::default() };
            play(PlayOptions { songs, song, autoplay, miss_every, mute, config })
        }
        Commands::Record { wav, mute } => {
            for path in record::record(&wav, mute)? {
                println!("wrote {}", path.display());
            }
            Ok(())
        }
        Commands::Convert { name } => {
            let out = convert::convert(&name)?;
            println!("wrote {}", out.display());
            Ok(())
        }
        Commands::Inspect { chart } => {
            print!("{}", convert::inspect(&chart)?);
            Ok(())
        }
    }
}
