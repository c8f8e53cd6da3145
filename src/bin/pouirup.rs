// pouirup CLI
// Gesture and key remapping daemon over evdev and uinput

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;

use pouirup_core::input::{DeviceUse, HookOptions, InputHook};
use pouirup_core::instance::{default_lock_path, InstanceLock};
use pouirup_core::output::{SharedOutput, VirtualDevice};
use pouirup_core::remap::ThreadScheduler;
use pouirup_core::window::detect_window_source;
use pouirup_core::{Config, Engine, EventTracer};

/// Milliseconds between checks of the signal flags
const POLL_TIMEOUT_MS: i32 = 100;

/// Mouse gestures, trackpad gestures and layered key remapping
#[derive(Parser, Debug)]
#[command(name = "pouirup")]
#[command(version)]
#[command(about = "Gesture and layered key remapping daemon", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Devices to use, by name or path (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Write the event trace (to the configured path, or stdout)
    #[arg(long)]
    trace: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List detected input devices
    #[arg(long)]
    list_devices: bool,
}

/// Flags flipped by the signal thread
struct Signalled {
    running: AtomicBool,
    active: AtomicBool,
}

fn load_config(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return Config::from_toml_path(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match Config::default_path() {
        Some(path) if path.exists() => Config::from_toml_path(&path)
            .with_context(|| format!("loading config {}", path.display())),
        _ => {
            log::info!("No config file, using built-in layout");
            Config::builtin().context("built-in config")
        }
    }
}

fn list_devices() -> Result<()> {
    let devices = InputHook::list_devices();
    if devices.is_empty() {
        bail!("no input devices found (are you in the 'input' group?)");
    }
    println!("Input devices:");
    for device in devices {
        println!("  {:<9} {} ({})", device.kind.to_string(), device.name, device.path);
    }
    Ok(())
}

fn check_config(config: &Config) {
    let (execution, function) = config.layout.layer_counts();
    println!("Configuration is valid");
    println!("  remap: {}", config.remap_enabled);
    println!("  character keys: {}", config.layout.char_count());
    println!("  execution layer: {} entries", execution);
    println!("  function layer: {} entries", function);
    println!("  pointer gestures: {}", config.pointer.enabled);
    println!("  trackpad gestures: {}", config.trackpad.enabled);
    println!("  gesture bindings: {}", config.bindings.len());
}

fn hook_options(config: &Config) -> HookOptions {
    let tracing = config.trace.enabled;
    let pick = |intercept: bool, observe: bool| {
        if intercept {
            DeviceUse::Grab
        } else if observe {
            DeviceUse::Observe
        } else {
            DeviceUse::Ignore
        }
    };
    HookOptions {
        keyboards: pick(config.remap_enabled, tracing),
        mice: pick(config.pointer.enabled, tracing),
        touchpads: pick(false, config.trackpad.enabled || tracing),
        device_filter: config.device_filter.clone(),
    }
}

fn spawn_signal_thread(flags: Arc<Signalled>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGUSR1, SIGUSR2])
        .context("installing signal handlers")?;
    std::thread::Builder::new()
        .name("pouirup-signals".to_string())
        .spawn(move || {
            for signal in &mut signals {
                match signal {
                    SIGUSR1 => flags.active.store(false, Ordering::SeqCst),
                    SIGUSR2 => flags.active.store(true, Ordering::SeqCst),
                    _ => {
                        log::info!("Received signal {}, shutting down", signal);
                        flags.running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        })
        .context("spawning signal thread")?;
    Ok(())
}

fn run(config: Config) -> Result<()> {
    let _lock = InstanceLock::acquire(default_lock_path()).context("single instance check")?;

    let device = Arc::new(Mutex::new(VirtualDevice::new().context("creating virtual device")?));
    let output: SharedOutput = device.clone();

    let mut engine = Engine::new(&config, output, Arc::new(ThreadScheduler));
    if config.trace.enabled {
        let tracer = EventTracer::open(config.trace.path.as_deref(), detect_window_source())
            .context("opening event trace")?;
        engine = engine.with_tracer(tracer);
    }

    let mut hook = InputHook::open(&hook_options(&config), Arc::clone(&device)).context("opening input devices")?;
    log::info!("Using devices: {}", hook.device_names().join(", "));

    let flags = Arc::new(Signalled {
        running: AtomicBool::new(true),
        active: AtomicBool::new(true),
    });
    spawn_signal_thread(Arc::clone(&flags))?;

    hook.activate()?;
    let result = event_loop(&mut hook, &mut engine, &flags);

    if let Err(e) = engine.reset() {
        log::warn!("Releasing held keys failed: {}", e);
    }
    hook.deactivate();
    if let Err(e) = device.lock().release_all() {
        log::warn!("Releasing virtual device keys failed: {}", e);
    }
    log::info!("Stopped");
    result
}

fn event_loop(hook: &mut InputHook, engine: &mut Engine, flags: &Signalled) -> Result<()> {
    while flags.running.load(Ordering::SeqCst) && engine.is_running() {
        let wanted = flags.active.load(Ordering::SeqCst);
        if wanted != hook.is_active() {
            if wanted {
                hook.activate()?;
            } else {
                engine.reset()?;
                hook.deactivate();
            }
        }
        hook.poll(POLL_TIMEOUT_MS, engine)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if args.list_devices {
        return list_devices();
    }

    let mut config = load_config(&args)?;
    if args.check_config {
        check_config(&config);
        return Ok(());
    }
    if args.trace {
        config.trace.enabled = true;
    }
    if !args.devices.is_empty() {
        config.device_filter = args.devices.clone();
    }

    run(config)
}
