use std::path::PathBuf;

use avatar_assistant_core::{
    AnimationClip, AppConfig, Assistant, AvatarRig, ClipLibrary, MeshPart, ModelOption,
    MOUTH_OPEN_TARGET,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> avatar_assistant_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Chat {
            base_url,
            token,
            model,
            message,
            config,
        } => runtime.block_on(run_chat(base_url, token, model, message, config)),
        Commands::Models { base_url, token } => runtime.block_on(list_models(base_url, token)),
    }
}

/// Runs one chat round trip against the backend and drives the avatar frame
/// loop with the synthesized reply, so the whole pipeline can be exercised
/// from a terminal.
async fn run_chat(
    base_url: String,
    token: String,
    model: String,
    message: String,
    config: Option<PathBuf>,
) -> avatar_assistant_core::Result<()> {
    let mut config = load_config(config)?;
    config.api.base_url = base_url;

    let model = ModelOption {
        name: model.clone(),
        api_name: model,
    };
    let mut assistant = Assistant::new(&config, token, model, demo_library()?, demo_rig())?;

    tracing::info!(status = %assistant.status(), "session mounted");
    let turn = assistant.submit_text(&message).await;
    println!("{}", turn.reply);

    if let Some(speech) = turn.speech {
        tracing::info!(status = %assistant.status(), "driving playback");
        // Stand-in for the embedder's decoder: a synthetic voiced waveform
        // pushed block by block while the frame loop runs.
        match speech {
            avatar_assistant_core::SpeechAudio::Url(url) => {
                tracing::info!(url, "backend returned streamable audio")
            }
            avatar_assistant_core::SpeechAudio::Bytes(bytes) => {
                tracing::info!(len = bytes.len(), "backend returned inline audio")
            }
        }
        for frame in 0..180 {
            let block: Vec<f32> = (0..512)
                .map(|i| ((frame * 512 + i) as f32 * 0.05).sin() * 0.3)
                .collect();
            assistant.push_speech_samples(&block)?;
            assistant.update(1.0 / 60.0);
        }
        assistant.finish_speaking();
    }

    tracing::info!(status = %assistant.status(), "turn complete");
    assistant.shutdown();
    Ok(())
}

/// Prints the chat models the backend advertises.
async fn list_models(base_url: String, token: String) -> avatar_assistant_core::Result<()> {
    let mut config = AppConfig::default();
    config.api.base_url = base_url;

    let client = avatar_assistant_core::ApiClient::new(&config.api, token)?;
    for model in client.available_models().await {
        println!("{}\t{}", model.name, model.api_name);
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> avatar_assistant_core::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let raw = std::fs::read(&path)?;
    serde_json::from_slice(&raw).map_err(|err| {
        avatar_assistant_core::AvatarError::msg(format!(
            "failed to parse config {}: {err}",
            path.display()
        ))
    })
}

/// Clip metadata matching the stock ReadyPlayerMe idle/talk variation packs.
/// The real durations come from the decoded assets at integration time; the
/// CLI only needs plausible values to exercise the schedulers.
fn demo_library() -> avatar_assistant_core::Result<ClipLibrary> {
    let idle = (1..=8)
        .map(|i| {
            AnimationClip::new(
                format!("F_Standing_Idle_Variations_00{i}"),
                7.0 + i as f32 * 0.4,
            )
        })
        .collect();
    let talk = (1..=8)
        .map(|i| AnimationClip::new(format!("F_Talking_Variations_00{i}"), 5.0 + i as f32 * 0.3))
        .collect();
    ClipLibrary::new(idle, talk)
}

fn demo_rig() -> AvatarRig {
    AvatarRig::new(vec![
        MeshPart::new("Wolf3D_Head", [MOUTH_OPEN_TARGET, "mouthSmile"]),
        MeshPart::new("Wolf3D_Teeth", [MOUTH_OPEN_TARGET]),
        MeshPart::new("Wolf3D_Body", Vec::<String>::new()),
    ])
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat assistant with an animated avatar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message through the assistant and animate the reply.
    Chat {
        /// Base URL of the assistant backend.
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        base_url: String,
        /// Bearer token for the backend.
        #[arg(long, default_value = "")]
        token: String,
        /// Chat model to use.
        #[arg(long, default_value = "default")]
        model: String,
        /// Message text to send.
        message: String,
        /// Optional JSON config file overriding the built-in tuning values.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the chat models the backend offers.
    Models {
        /// Base URL of the assistant backend.
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        base_url: String,
        /// Bearer token for the backend.
        #[arg(long, default_value = "")]
        token: String,
    },
}
