use fret_gestures::console_display;
use fret_gestures::demo::{completion_offset_ms, demo_script};
use fret_gestures::osc_sender;
use fret_gestures::runtime::Runtime;
use fret_gestures::script_reader::{play_script, ScriptCommand, ScriptReader};
use fret_gestures::session::{Session, SessionConfig};
use fret_gestures::synth::SynthDispatcher;
use fret_gestures::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fret-gestures")]
#[command(about = "Gesture-driven six-string fretboard instrument")]
struct Cli {
    /// JSONL gesture script to play ("-" for stdin). Defaults to stdin
    /// unless --demo is given.
    #[arg(long)]
    script: Option<String>,

    /// Start the built-in demo performance
    #[arg(long)]
    demo: bool,

    /// Honour `at_ms` timestamps in the script instead of playing it at once
    #[arg(long)]
    realtime: bool,

    /// Session config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of gestures kept in the log (overrides the config file)
    #[arg(long)]
    log_limit: Option<usize>,

    /// Enable console display (terminal status view)
    #[arg(long)]
    console: bool,

    /// Print every status frame as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Play tones on the default audio output (requires the `audio` feature)
    #[arg(long)]
    audio: bool,
}

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    let clock = SessionClock::new();

    let mut config = cli
        .config
        .as_deref()
        .and_then(SessionConfig::load)
        .unwrap_or_default();
    if let Some(limit) = cli.log_limit {
        config.log_limit = limit;
    }

    info!("═══════════════════════════════════════════════");
    info!("  FRET GESTURES v{}", env!("CARGO_PKG_VERSION"));
    info!("  Log limit: {}  Master gain: {:.2}", config.log_limit, config.master_gain);
    if cli.console { info!("  UI: Console"); }
    if cli.osc { info!("  UI: OSC → {}", cli.osc_target); }
    if cli.json { info!("  UI: JSON status lines"); }
    info!("═══════════════════════════════════════════════");

    // ─── Tone device ────────────────────────────────────────────────
    #[cfg(feature = "audio")]
    let mut _audio_output = None;
    let dispatcher = if cli.audio {
        #[cfg(feature = "audio")]
        {
            use fret_gestures::audio_output::AudioOutput;
            use fret_gestures::software_device::SoftwareToneDevice;

            let device = SoftwareToneDevice::new(48_000);
            match AudioOutput::start(device.clone()) {
                Ok(output) => {
                    _audio_output = Some(output);
                    SynthDispatcher::new(Box::new(device), config.master_gain)
                }
                Err(e) => {
                    warn!("Audio unavailable ({}); running silent", e);
                    SynthDispatcher::silent(config.master_gain)
                }
            }
        }
        #[cfg(not(feature = "audio"))]
        {
            warn!("Built without the 'audio' feature; running silent");
            SynthDispatcher::silent(config.master_gain)
        }
    } else {
        SynthDispatcher::silent(config.master_gain)
    };

    let demo_length_ms = completion_offset_ms(&demo_script(), config.demo_completion_delay_ms);

    // Channel: inputs → runtime
    let (input_tx, input_rx) = bounded::<SessionEvent>(1024);

    // Channels: runtime → sinks
    let mut status_txs: Vec<Sender<StatusFrame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<StatusFrame>(256);
        status_txs.push(tx);
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            console_display::ConsoleDisplay::new(rx).run();
        })?);
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<StatusFrame>(1024);
        status_txs.push(tx);
        let target = cli.osc_target.clone();
        handles.push(thread::Builder::new().name("osc".into()).spawn(move || {
            osc_sender::OscSender::new(rx, target).run();
        })?);
    }

    // ─── JSON status lines ──────────────────────────────────────────
    if cli.json {
        let (tx, rx) = bounded::<StatusFrame>(1024);
        status_txs.push(tx);
        handles.push(thread::Builder::new().name("json".into()).spawn(move || {
            let stdout = io::stdout();
            for frame in rx.iter() {
                match serde_json::to_string(&frame) {
                    Ok(line) => {
                        let mut out = stdout.lock();
                        if writeln!(out, "{}", line).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize status frame: {}", e),
                }
            }
        })?);
    }

    // ─── Runtime ────────────────────────────────────────────────────
    let session = Session::new(config, dispatcher);
    let rt_clock = clock.clone();
    let runtime = thread::Builder::new().name("runtime".into()).spawn(move || {
        Runtime::new(input_rx, status_txs, session, rt_clock).run();
    })?;

    // ─── Input source ───────────────────────────────────────────────
    let mut demo_done_ms = if cli.demo { demo_length_ms } else { 0 };
    if cli.demo {
        let _ = input_tx.send(SessionEvent::StartDemo);
    }

    let source = match cli.script.as_deref() {
        Some(path) => Some(path.to_string()),
        None if cli.demo => None,
        None => Some("-".to_string()),
    };
    if let Some(source) = source {
        let lines = if source == "-" {
            info!("Reading gesture script from stdin");
            ScriptReader::new(io::stdin().lock()).read_all()
        } else {
            match File::open(&source) {
                Ok(f) => ScriptReader::new(BufReader::new(f)).read_all(),
                Err(e) => {
                    error!("Cannot open script {}: {}", source, e);
                    Vec::new()
                }
            }
        };
        let scripted_demo = lines.iter().any(|l| l.command == ScriptCommand::Demo);
        let sent = play_script(lines, &input_tx, &clock, cli.realtime);
        info!("Script delivered {} event(s)", sent);
        if scripted_demo {
            demo_done_ms = demo_done_ms.max(clock.now_ms() + demo_length_ms);
        }
    }

    // Let a running demo play out before shutting down
    let now = clock.now_ms();
    if demo_done_ms > now {
        thread::sleep(Duration::from_millis(demo_done_ms - now));
    }

    let _ = input_tx.send(SessionEvent::Shutdown);
    drop(input_tx);
    if runtime.join().is_err() {
        error!("Runtime thread panicked");
    }
    for h in handles {
        let _ = h.join();
    }
    Ok(())
}
