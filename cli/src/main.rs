//! eKYC command line: runs one verification session end to end against the
//! simulated camera and backend.

use anyhow::{bail, Context};
use clap::Parser;
use ekyc_capture::{Camera, SimulatedCamera};
use ekyc_services::{SimulatedServices, VerificationServices};
use ekyc_types::{Image, ImageFormat};
use ekyc_utils::LogFormat;
use ekyc_verification::{ChallengeState, DisplayResult, Wizard, WizardConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attempts per stage action before the run gives up.
const MAX_ATTEMPTS: u32 = 5;

/// Upper bound on challenge attempts over the whole liveness stage.
const MAX_CHALLENGE_ATTEMPTS: u32 = 30;

#[derive(Parser)]
#[command(name = "ekyc", about = "eKYC identity verification flow")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, global = true, env = "EKYC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "EKYC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "EKYC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a full verification session.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Identity document image (jpg, png or bmp).
    #[arg(long)]
    document: PathBuf,

    /// Seed for reproducible outcomes and challenge order.
    #[arg(long, env = "EKYC_SEED")]
    seed: Option<u64>,

    /// Auto-attempt delay for liveness challenges, in milliseconds.
    #[arg(long, env = "EKYC_AUTO_ATTEMPT_MS")]
    auto_attempt_ms: Option<u64>,

    /// Simulate a user who denies camera access.
    #[arg(long)]
    deny_camera: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = cli
        .config
        .as_deref()
        .map(|path| (path, WizardConfig::from_toml_file(path)));
    let Command::Run(args) = cli.command;

    let base = match &loaded {
        Some((_, Ok(config))) => config.clone(),
        _ => WizardConfig::default(),
    };
    let config = merge_config(base, cli.log_level, cli.log_format, &args);
    config.validate()?;

    ekyc_utils::init_logging(config.log_format, &config.log_level);
    match &loaded {
        Some((path, Ok(_))) => tracing::info!("Loaded config from {}", path.display()),
        Some((path, Err(e))) => tracing::warn!(
            "Failed to load config file {}: {e}, using CLI defaults",
            path.display()
        ),
        None => {}
    }
    tracing::info!(
        auto_attempt_ms = config.auto_attempt_delay_ms,
        camera_available = config.camera_available,
        seed = ?config.simulation.seed,
        "starting verification session"
    );

    let document = read_document(&args.document)?;
    let services = SimulatedServices::new(config.simulation.clone());
    let camera = SimulatedCamera::new(config.camera_available);
    let rng = match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut wizard = Wizard::new(Arc::new(services), Arc::new(camera), config, rng);

    drive(&mut wizard, document).await?;

    let result = wizard
        .results()
        .context("session ended before the results stage")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", render(result));
    }
    Ok(())
}

fn merge_config(
    base: WizardConfig,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    args: &RunArgs,
) -> WizardConfig {
    let mut simulation = base.simulation.clone();
    if args.seed.is_some() {
        simulation.seed = args.seed;
    }
    WizardConfig {
        auto_attempt_delay_ms: args.auto_attempt_ms.unwrap_or(base.auto_attempt_delay_ms),
        camera_available: base.camera_available && !args.deny_camera,
        log_level: log_level.unwrap_or(base.log_level.clone()),
        log_format: log_format.unwrap_or(base.log_format),
        simulation,
        ..base
    }
}

fn read_document(path: &Path) -> anyhow::Result<Image> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("{} has no file extension", path.display()))?;
    let format = ImageFormat::from_extension(ext)?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Image::new(format, bytes)?)
}

/// Walk the wizard to the results stage the way a cooperative user would.
async fn drive<S: VerificationServices, C: Camera>(
    wizard: &mut Wizard<S, C>,
    document: Image,
) -> anyhow::Result<()> {
    // Document upload
    let mut found = false;
    for attempt in 1..=MAX_ATTEMPTS {
        match wizard.submit_document(document.clone()).await {
            Ok(true) => {
                found = true;
                break;
            }
            Ok(false) => break,
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "document submission failed, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !found {
        let message = wizard
            .document()
            .and_then(|d| d.message())
            .unwrap_or("no face found on the document");
        bail!("document rejected: {message}");
    }
    wizard.advance().await?;

    // Live capture
    if wizard.live().is_some_and(|l| l.camera_blocked()) {
        let message = wizard.live().and_then(|l| l.message()).unwrap_or_default();
        bail!("live capture blocked: {message}");
    }
    let mut verified = false;
    for attempt in 1..=MAX_ATTEMPTS {
        match wizard.capture_and_verify().await {
            Ok(true) => {
                verified = true;
                break;
            }
            Ok(false) => tracing::info!(attempt, "face not verified, capturing again"),
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "face match failed, capturing again");
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !verified {
        bail!("live face could not be verified after {MAX_ATTEMPTS} captures");
    }
    wizard.advance().await?;

    // Liveness challenges
    if !wizard.liveness().is_some_and(|e| e.has_live_session()) {
        bail!("liveness challenges blocked: camera unavailable");
    }
    let mut attempts = 0;
    loop {
        let Some(state) = wizard.liveness().map(|e| e.state()) else {
            bail!("left the liveness stage unexpectedly");
        };
        if state.is_terminal() {
            break;
        }
        attempts += 1;
        if attempts > MAX_CHALLENGE_ATTEMPTS {
            bail!("liveness challenges not completed after {MAX_CHALLENGE_ATTEMPTS} attempts");
        }
        if let Some(engine) = wizard.liveness() {
            tracing::info!(feedback = %engine.feedback().message(), "liveness");
        }
        let result = if state == ChallengeState::Retrying {
            wizard.retry_challenge().await.map(Some)
        } else {
            wizard.step_challenge().await
        };
        match result {
            Ok(Some(outcome)) => tracing::info!(outcome = ?outcome, "challenge attempted"),
            Ok(None) if state == ChallengeState::Passed => {}
            Ok(None) => bail!("no challenge pending in state {state:?}"),
            Err(e) if e.is_retryable() => tracing::warn!(error = %e, "challenge attempt failed"),
            Err(e) => return Err(e.into()),
        }
    }

    wizard.advance().await?;
    Ok(())
}

fn render(result: &DisplayResult) -> String {
    fn availability(image: &Option<String>) -> &'static str {
        if image.is_some() {
            "available"
        } else {
            "Not available"
        }
    }

    let mut out = String::new();
    out.push_str("Verification results\n");
    out.push_str(&format!(
        "  ID card image:        {}\n",
        availability(&result.document_image)
    ));
    out.push_str(&format!(
        "  Face from ID card:    {}\n",
        availability(&result.document_face_image)
    ));
    out.push_str(&format!(
        "  Live capture:         {}\n",
        availability(&result.live_image)
    ));
    out.push_str(&format!("  Face match score:     {}\n", result.display_score));
    out.push_str(&format!("  Face match status:    {}\n", result.status));
    out.push_str("  Liveness detection:\n");
    for line in &result.liveness {
        out.push_str(&format!(
            "    {:<20}{}\n",
            line.label,
            if line.passed { "PASSED" } else { "FAILED" }
        ));
    }
    out.push_str(&format!(
        "  Overall:              {}\n",
        if result.all_passed {
            "VERIFIED"
        } else {
            "NOT VERIFIED"
        }
    ));
    out
}
