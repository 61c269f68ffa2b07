use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tandem_core::audio::AudioOutput;
use tandem_core::clock::SystemClock;
use tandem_core::driver::{Driver, DriverConfig, DriverParts};
use tandem_core::handoff::FrameHandoff;
use tandem_core::input::InputTranslator;
use tandem_machines::registry;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod audio;
mod config;
mod emulator;
mod error;
mod input;
mod video;

use config::Config;
use emulator::{SdlHooks, Session, UiEvent, window_title};
use error::FrontendError;

#[derive(Debug, Parser)]
#[command(name = "tandem", version, about = "Frame-paced emulator frontend")]
struct Cli {
    /// Machine to run (see --list)
    #[arg(default_value = "testcard")]
    machine: String,

    /// ROM image to load at startup
    rom: Option<PathBuf>,

    /// Integer window scale (overrides the config file)
    #[arg(long)]
    scale: Option<u32>,

    /// Config file (default: <config dir>/tandem/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run as fast as possible
    #[arg(long)]
    unlimited: bool,

    /// Do not open an audio device
    #[arg(long)]
    mute: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// List available machines and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

fn run(cli: Cli) -> Result<(), FrontendError> {
    if cli.list {
        for entry in registry::all() {
            println!("{:<12} {}", entry.name, entry.description);
        }
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let bindings = config.key_bindings()?;

    let entry = registry::find(&cli.machine).ok_or_else(|| FrontendError::UnknownMachine {
        name: cli.machine.clone(),
        available: registry::names(),
    })?;
    let machine = (entry.create)();
    let (width, height) = machine.display_size();

    // Allocated up front: failing here aborts before the driver exists.
    let handoff = Arc::new(FrameHandoff::new(width, height)?);

    let sdl = sdl2::init().map_err(FrontendError::Sdl)?;
    let sdl_video = sdl.video().map_err(FrontendError::Sdl)?;
    let sdl_events = sdl.event().map_err(FrontendError::Sdl)?;
    sdl_events
        .register_custom_event::<UiEvent>()
        .map_err(FrontendError::Sdl)?;

    let scale = cli.scale.unwrap_or(config.video.scale).max(1);
    let mut video = video::Video::open(&sdl_video, &window_title(None), (width, height), scale)?;
    let mut event_pump = sdl.event_pump().map_err(FrontendError::Sdl)?;

    let hooks = Arc::new(SdlHooks::new(sdl_events.event_sender()));
    let audio: Option<Box<dyn AudioOutput>> = if config.audio.enabled && !cli.mute {
        Some(Box::new(audio::CpalOutput))
    } else {
        None
    };

    let mut driver = Driver::start(
        DriverParts {
            machine,
            handoff: Arc::clone(&handoff),
            hooks: hooks.clone(),
            audio,
            clock: Box::new(SystemClock::new()),
        },
        DriverConfig {
            direct_boot: config.emulation.direct_boot,
            limit_fps: config.emulation.limit_fps && !cli.unlimited,
        },
    )?;
    info!(machine = entry.name, width, height, "driver started");

    let translator = InputTranslator::new(bindings, &input::alt_scancodes());
    let mut session = Session {
        driver: &driver,
        handoff: &handoff,
        hooks: &hooks,
        translator: &translator,
        video: &mut video,
    };

    match &cli.rom {
        Some(rom) => session.load(rom),
        None => info!("no ROM given: drop one onto the window, or press Alt+P to run without"),
    }
    let result = session.run(&mut event_pump);

    // The driver closes audio and tears the machine down on its own thread;
    // wait for that before SDL and the frame buffer go away.
    driver.stop()?;
    result
}
