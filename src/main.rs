use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use beacon_stream::control::{ChildCommand, Console, console};
use beacon_stream::daemon::build_synthesizer;
use beacon_stream::persona::{Intensity, PersonaStore, Trait};
use beacon_stream::voice::{AudioCapture, AudioPlayback, DecodedAudio, Microphone, Speaker, rms};
use beacon_stream::{Config, Daemon, ErrorKind, WireFormat};

/// beacon-stream - voice persona assistant for live streams
#[derive(Parser)]
#[command(name = "beacon-stream", version, about)]
struct Cli {
    /// Path to a config file (defaults to ~/.config/omni/beacon-stream/config.toml)
    #[arg(short, long, env = "BEACON_STREAM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the assistant loop (default)
    Run {
        /// Event encoding written to stdout
        #[arg(long, value_enum, default_value_t = WireFormat::Json)]
        wire: WireFormat,
        /// Continue the conversation saved in the backup file
        #[arg(long)]
        resume: bool,
    },
    /// Operator console supervising an assistant process
    Control,
    /// Inspect or edit the persona file
    Persona {
        #[command(subcommand)]
        action: PersonaAction,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello chat! This is a test of the text to speech system.")]
        text: String,
    },
}

#[derive(Subcommand)]
enum PersonaAction {
    /// Print the persona file as loaded
    Show,
    /// Set trait intensities (e.g. `humor=80 sarcasm=20`) and save
    Set {
        /// `trait=value` pairs
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// Print the system prompt compiled from the current traits
    Compile,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout is reserved for events
    let filter = match cli.verbose {
        0 => "info,beacon_stream=info",
        1 => "info,beacon_stream=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(err) = e.downcast_ref::<beacon_stream::Error>()
                && err.kind() == ErrorKind::CriticalInit
            {
                tracing::error!("a critical error occurred, the assistant will now exit: {err}");
            } else {
                tracing::error!("fatal: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Run {
        wire: WireFormat::Json,
        resume: false,
    }) {
        Command::Run { wire, resume } => {
            Daemon::new(config, wire, resume).run().await?;
            Ok(())
        }
        Command::Control => run_control(config, cli.config).await,
        Command::Persona { action } => persona(&config, action),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Interactive console on this terminal
async fn run_control(config: Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    let launcher = ChildCommand::assistant(exe, config_path);
    let console = Console::new(PersonaStore::new(&config.persona_path));

    console::run(
        console,
        launcher,
        config.shutdown_grace,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;
    Ok(())
}

/// Persona file subcommands
fn persona(config: &Config, action: PersonaAction) -> anyhow::Result<()> {
    let mut store = PersonaStore::new(&config.persona_path);
    let loaded = store.load();
    if let Some(diagnostic) = &loaded.diagnostic {
        eprintln!("warning: {diagnostic}");
    }

    match action {
        PersonaAction::Show => {
            println!("{}", serde_json::to_string_pretty(&loaded.config)?);
        }
        PersonaAction::Compile => {
            println!("{}", beacon_stream::persona::compile(&loaded.config.traits));
        }
        PersonaAction::Set { assignments } => {
            let mut traits = loaded.config.traits;
            for assignment in &assignments {
                let (name, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("expected trait=value, got {assignment}"))?;
                let name: Trait = name.parse()?;
                let value = Intensity::new(value.trim().parse()?)?;
                traits.set(name, value);
            }
            let updated = beacon_stream::PersonaConfig::compiled(traits);
            store.save(&updated)?;
            println!("saved {}", store.path().display());
        }
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
#[allow(clippy::future_not_send)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let mut playback = AudioPlayback::new()?;

    let sample_rate = 24_000_u32;
    let frequency = 440.0_f32;
    let num_samples = sample_rate as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback
        .play(DecodedAudio {
            samples,
            sample_rate,
        })
        .await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test the configured TTS provider end to end
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synthesizer = build_synthesizer(config).await?;

    println!("Synthesizing speech...");
    let mp3_data = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
