//! stemforge - command-line front end
//!
//! ```text
//! stemforge separate song.mp3 --stems 6
//! stemforge list abc_song --stems 6
//! stemforge fuse --master a_song.wav --role vocals=a_song.wav --role drums=b_song.wav@0.8 --out mix.mp3
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use stemforge::config::StemforgeConfig;
use stemforge::fusion::{FusionRequest, FusionService, RoleAssignment, RoleOutcome};
use stemforge::separation::{job_key_for, ProgressEvent, SeparationService};
use stemforge_core::config::{default_config_path, save_config};

#[derive(Parser, Debug)]
#[command(name = "stemforge", version, about = "Stem separation and tempo-synced stem fusion")]
struct Cli {
    /// Config file (default: ~/.config/stemforge/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output root, overriding the config
    #[arg(short = 'o', long, global = true)]
    output_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Separate a track into stems
    Separate(SeparateArgs),
    /// List the stems of a finished job
    List(ListArgs),
    /// Mix stems from several jobs at the master's tempo
    Fuse(FuseArgs),
    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Args, Debug)]
struct SeparateArgs {
    input: PathBuf,
    /// 4, 6 or 8
    #[arg(short = 'c', long)]
    stems: Option<u32>,
    #[arg(short, long)]
    model: Option<String>,
    #[arg(short, long)]
    device: Option<String>,
    /// Skip the enhancement pass
    #[arg(long)]
    no_enhance: bool,
    /// Silence-trim threshold for enhancement, dB below peak
    #[arg(long)]
    silence_db: Option<f32>,
    /// Print events as server-sent-event frames
    #[arg(long)]
    sse: bool,
}

#[derive(Args, Debug)]
struct ListArgs {
    job_key: String,
    #[arg(short = 'c', long)]
    stems: Option<u32>,
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args, Debug)]
struct FuseArgs {
    /// Input file of the master job; its tempo wins
    #[arg(long)]
    master: PathBuf,
    /// `role=input[@volume][!]`, `!` mutes the role
    #[arg(long = "role", value_parser = parse_role, required = true)]
    roles: Vec<RoleArg>,
    /// Stem count every referenced job was separated with
    #[arg(short = 'c', long)]
    stems: Option<u32>,
    #[arg(short, long)]
    model: Option<String>,
    /// MP3 file to write
    #[arg(long = "out")]
    output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
struct RoleArg {
    role: String,
    input: PathBuf,
    volume: f32,
    muted: bool,
}

fn parse_role(arg: &str) -> std::result::Result<RoleArg, String> {
    let (role, rest) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected role=input, got {:?}", arg))?;
    if role.is_empty() {
        return Err("empty role name".to_string());
    }
    let (rest, muted) = match rest.strip_suffix('!') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    let (input, volume) = match rest.rsplit_once('@') {
        Some((input, volume)) => (
            input,
            volume
                .parse::<f32>()
                .map_err(|e| format!("bad volume {:?}: {}", volume, e))?,
        ),
        None => (rest, 1.0),
    };
    if input.is_empty() {
        return Err(format!("missing input for role {}", role));
    }
    Ok(RoleArg {
        role: role.to_string(),
        input: PathBuf::from(input),
        volume,
        muted,
    })
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match &cli.config {
        Some(path) => StemforgeConfig::load_strict(path)?,
        None => StemforgeConfig::load(&config_path),
    };
    if let Some(root) = &cli.output_root {
        config.separation.output_root = root.clone();
    }

    match cli.command {
        Command::Separate(args) => separate(config, args),
        Command::List(args) => list(config, args),
        Command::Fuse(args) => fuse(config, args),
        Command::Config { write } => {
            print!("{}", serde_yaml::to_string(&config)?);
            if write {
                save_config(&config, &config_path)?;
            }
            Ok(())
        }
    }
}

fn separate(config: StemforgeConfig, args: SeparateArgs) -> Result<()> {
    let service = SeparationService::with_config(config.separation);
    let mut request = service.request(&args.input);
    if let Some(stems) = args.stems {
        request.stem_count = stems;
    }
    if let Some(model) = args.model {
        request.model = model;
    }
    if let Some(device) = args.device {
        request.device = device;
    }
    if args.no_enhance {
        request.enhance = false;
    }
    if let Some(db) = args.silence_db {
        request.silence_threshold_db = db.abs();
    }

    log::info!("Separating {:?} into {} stems", request.input, request.stem_count);

    let mut outcome = None;
    for event in service.spawn(request)? {
        if args.sse {
            print!("{}", event.sse_frame());
        } else {
            println!("{}", event.wire_line());
        }
        if event.is_terminal() {
            outcome = Some(event);
        }
    }

    match outcome {
        Some(ProgressEvent::Complete { record, .. }) => {
            if !args.sse {
                for stem in &record.stems {
                    println!("  {:<24} {}", stem.display_name, stem.relative_path.display());
                }
            }
            Ok(())
        }
        Some(event) => bail!("{}", event.description()),
        None => bail!("separation ended without a result"),
    }
}

fn list(config: StemforgeConfig, args: ListArgs) -> Result<()> {
    let stems = args.stems.unwrap_or(config.separation.stem_count);
    let model = args.model.unwrap_or_else(|| config.separation.model.clone());
    let service = SeparationService::with_config(config.separation);

    let artifacts = service.list_stems(&args.job_key, &model, stems)?;
    if artifacts.is_empty() {
        bail!("no stems found for {}", args.job_key);
    }
    for stem in artifacts {
        println!("{:<24} {}", stem.display_name, stem.relative_path.display());
    }
    Ok(())
}

fn fuse(config: StemforgeConfig, args: FuseArgs) -> Result<()> {
    let stems = args.stems.unwrap_or(config.separation.stem_count);
    let model = args.model.unwrap_or_else(|| config.separation.model.clone());
    let separation = SeparationService::with_config(config.separation);
    let fusion = FusionService::with_config(config.fusion, config.bpm);

    let mut records = HashMap::new();
    for input in std::iter::once(&args.master).chain(args.roles.iter().map(|r| &r.input)) {
        let key = job_key_for(input);
        if records.contains_key(&key) {
            continue;
        }
        let record = separation
            .record_for(input, &model, stems)
            .with_context(|| format!("No separation found for {:?}", input))?;
        records.insert(key, record);
    }

    let mut request = FusionRequest::new(job_key_for(&args.master));
    for arg in args.roles {
        let mut assignment = RoleAssignment::new(job_key_for(&arg.input)).with_volume(arg.volume);
        if arg.muted {
            assignment = assignment.muted();
        }
        request = request.with_role(arg.role, assignment);
    }

    let report = fusion.fuse(&request, &records, &args.output)?;

    println!("Master tempo: {:.2} BPM", report.master_bpm);
    for role in &report.roles {
        let status = match &role.outcome {
            RoleOutcome::Copied => "copied".to_string(),
            RoleOutcome::Stretched { source_bpm, rate } => {
                format!("stretched from {:.2} BPM (x{:.3})", source_bpm, rate)
            }
            RoleOutcome::Muted => "muted".to_string(),
            RoleOutcome::Skipped(reason) => format!("skipped: {}", reason),
        };
        println!("  {:<12} {:<24} {}", role.role, role.source_job, status);
    }
    println!("Wrote {}", args.output.display());
    Ok(())
}
