//! cubescan CLI: guided cube scan, live calibration, one-shot classification.

use clap::{Args, Parser, Subcommand};
#[cfg(not(feature = "tracing"))]
use cubescan::core::{init_with_level, level_from_verbosity};
use cubescan::{
    parse_script, run_calibration, run_scan, CalibrationStore, ClassifierKind, CommandSolver,
    Confidence, DirArtifactStore, FrameDirectory, FrameScan, JsonCalibrationStore, ScanConfig,
    ScanServices, Solver,
};
use std::fs;
use std::path::PathBuf;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "cubescan")]
#[command(about = "Scan a Rubik's cube face by face and assemble its facelet string")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture all six faces and print the facelet string.
    Scan(ScanArgs),

    /// Record calibration centers from the middle of the frame.
    Calibrate(CalibrateArgs),

    /// Detect and classify one face in a single image.
    Classify(ClassifyArgs),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration file (flat JSON of HSV centers).
    #[arg(long)]
    calibration: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Directory of frame images, replayed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Operator script, one command per line.
    #[arg(long)]
    script: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Directory for face previews and the facelets file.
    #[arg(long)]
    scans_dir: Option<PathBuf>,

    /// External solver program, called with the facelet string.
    #[arg(long)]
    solver: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    #[arg(long)]
    frames: PathBuf,

    #[arg(long)]
    script: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Save recorded samples when the script quits without saving.
    #[arg(long)]
    save_on_quit: bool,
}

#[derive(Debug, Clone, Args)]
struct ClassifyArgs {
    /// Image containing one cube face.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    common: CommonArgs,

    /// Use the raw HSV classifier instead of the perceptual one.
    #[arg(long)]
    hsv: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan(args) => run_scan_cmd(args),
        Commands::Calibrate(args) => run_calibrate_cmd(args),
        Commands::Classify(args) => run_classify_cmd(args),
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        let _ = LogTracer::init();
        cubescan::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = init_with_level(level_from_verbosity(verbose));
    }
}

fn load_config(common: &CommonArgs) -> CliResult<ScanConfig> {
    let mut cfg = match &common.config {
        Some(path) => ScanConfig::load_json(path)?,
        None => ScanConfig::default(),
    };
    if let Some(path) = &common.calibration {
        cfg.calibration_path = path.clone();
    }
    Ok(cfg)
}

fn run_scan_cmd(args: ScanArgs) -> CliResult<()> {
    let mut cfg = load_config(&args.common)?;
    if let Some(dir) = args.scans_dir {
        cfg.scans_dir = dir;
    }
    if let Some(solver) = args.solver {
        cfg.solver_command = Some(solver);
    }

    let mut input = parse_script(&fs::read_to_string(&args.script)?)?;
    let mut calibration = JsonCalibrationStore::new(&cfg.calibration_path);
    let mut artifacts = DirArtifactStore::new(&cfg.scans_dir);
    let solver = cfg.solver_command.as_ref().map(CommandSolver::new);

    let outcome = run_scan(
        &FrameDirectory::new(args.frames),
        &mut input,
        &cfg.pipeline(),
        ScanServices {
            calibration: &mut calibration,
            artifacts: &mut artifacts,
            solver: solver.as_ref().map(|s| s as &dyn Solver),
        },
    )?;

    println!("{}", outcome.facelets);
    match (&outcome.solution, &outcome.solver_error) {
        (Some(moves), _) => println!("solution: {moves}"),
        (None, Some(err)) => eprintln!("solver failed: {err}"),
        (None, None) => {}
    }
    Ok(())
}

fn run_calibrate_cmd(args: CalibrateArgs) -> CliResult<()> {
    let cfg = load_config(&args.common)?;
    let mut input = parse_script(&fs::read_to_string(&args.script)?)?;
    let mut store = JsonCalibrationStore::new(&cfg.calibration_path);

    let saved = run_calibration(
        &FrameDirectory::new(args.frames),
        &mut input,
        &mut store,
        cfg.thresholds,
        args.save_on_quit,
    )?;
    match saved {
        Some(cal) => println!(
            "saved {} centers to {}",
            cal.centers().len(),
            store.path().display()
        ),
        None => println!("no calibration saved"),
    }
    Ok(())
}

fn run_classify_cmd(args: ClassifyArgs) -> CliResult<()> {
    let cfg = load_config(&args.common)?;
    let frame = image::open(&args.image)?.to_rgb8();
    let calibration = JsonCalibrationStore::new(&cfg.calibration_path)
        .load()?
        .unwrap_or_default();

    let mut pipeline = cfg.pipeline();
    if args.hsv {
        pipeline.classifier = cfg.classifier(ClassifierKind::Hsv);
    }

    match pipeline.scan_frame(&frame, &calibration) {
        FrameScan::NoFace => return Err("no face detected".into()),
        FrameScan::Unclassified(face) => {
            for row in face.colors.chunks(3) {
                let cells: Vec<String> = row.iter().map(|c| format!("{:?}", c.0)).collect();
                println!("{}", cells.join(" "));
            }
            return Err("no calibration loaded; run `cubescan calibrate` first".into());
        }
        FrameScan::Face(face) => {
            for (i, (m, c)) in face.matches.iter().zip(face.centers).enumerate() {
                log::debug!(
                    "sticker {i} at ({:.1}, {:.1}): {} (distance {:.1})",
                    c.x,
                    c.y,
                    m.label,
                    m.distance
                );
            }
            for row in face.matches.chunks(3) {
                let cells: Vec<String> = row
                    .iter()
                    .map(|m| format!("{}{}", m.label, confidence_mark(m.confidence)))
                    .collect();
                println!("{}", cells.join(" "));
            }
        }
    }
    Ok(())
}

fn confidence_mark(c: Confidence) -> &'static str {
    match c {
        Confidence::High => " ",
        Confidence::Medium => "?",
        Confidence::Low => "!",
    }
}
