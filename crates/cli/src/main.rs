//! Command-line surface extraction tool

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use voxsurf_algorithms::gradient::EdgePolarity;
use voxsurf_algorithms::segmentation::{run_segmentation, DebugSink, NullSink, SegmentationParams};
use voxsurf_core::io::{read_volume, read_volume_info, write_volume, DataType};
use voxsurf_core::{Connectivity, Volume, VoxelElement};

#[derive(Parser, Debug)]
#[command(
    name = "voxsurf",
    version,
    about = "Extract the outer surface of a volume with a two-stage marker-controlled watershed"
)]
struct Args {
    /// Input intensity volume (NIfTI-1, optionally gzipped)
    #[arg(short, long)]
    input: PathBuf,

    /// Rough binary mask of the object
    #[arg(short, long)]
    mask: PathBuf,

    /// Output surface mask
    #[arg(short, long)]
    output: PathBuf,

    /// Fiducial capsule mask to fold into the surface
    #[arg(short, long)]
    fiducials: Option<PathBuf>,

    /// Gaussian smoothing sigma in millimetres
    #[arg(long, default_value_t = 2.0)]
    smoothing: f64,

    /// Erosion radius in millimetres for the object marker
    #[arg(long, default_value_t = 3.0)]
    erode: f64,

    /// Dilation radius in millimetres for the background marker
    #[arg(long, default_value_t = 3.0)]
    dilate: f64,

    /// Expect a dark-to-light transition at the surface
    #[arg(long)]
    darktolight: bool,

    /// Flood connectivity: 6, 18 or 26
    #[arg(long, default_value_t = 6)]
    connectivity: u8,

    /// Write intermediate volumes next to the output
    #[arg(short, long)]
    debug: bool,

    /// Filename prefix for intermediate volumes
    #[arg(long, default_value = "voxsurf")]
    debug_prefix: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Debug sink that writes every intermediate as `<prefix>_<name>.nii.gz`
/// into the output directory
struct FileSink {
    dir: PathBuf,
    prefix: String,
}

impl FileSink {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.nii.gz", self.prefix, name))
    }
}

impl DebugSink for FileSink {
    fn labels(&mut self, name: &str, volume: &Volume<u8>) {
        let path = self.path(name);
        if let Err(e) = write_volume(volume, &path) {
            error!(path = %path.display(), "failed to write debug volume: {e}");
        }
    }

    fn field(&mut self, name: &str, volume: &Volume<f32>) {
        let path = self.path(name);
        if let Err(e) = write_volume(volume, &path) {
            error!(path = %path.display(), "failed to write debug volume: {e}");
        }
    }
}

fn connectivity_from(arg: u8) -> Result<Connectivity> {
    Ok(match arg {
        6 => Connectivity::Six,
        18 => Connectivity::Eighteen,
        26 => Connectivity::TwentySix,
        other => bail!("unsupported connectivity {other}, expected 6, 18 or 26"),
    })
}

fn run<T: VoxelElement>(args: &Args) -> Result<()> {
    let intensity: Volume<T> = read_volume(&args.input)
        .with_context(|| format!("reading intensity volume {}", args.input.display()))?;
    let mask: Volume<u8> = read_volume(&args.mask)
        .with_context(|| format!("reading mask volume {}", args.mask.display()))?;
    let fiducials: Option<Volume<u8>> = match &args.fiducials {
        Some(path) => Some(
            read_volume(path)
                .with_context(|| format!("reading fiducial volume {}", path.display()))?,
        ),
        None => None,
    };

    let params = SegmentationParams {
        erode_mm: args.erode,
        dilate_mm: args.dilate,
        smoothing_mm: args.smoothing,
        polarity: if args.darktolight {
            EdgePolarity::DarkToLight
        } else {
            EdgePolarity::LightToDark
        },
        connectivity: connectivity_from(args.connectivity)?,
    };

    let out_dir = args
        .output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let mut file_sink;
    let mut null_sink;
    let sink: &mut dyn DebugSink = if args.debug {
        file_sink = FileSink {
            dir: out_dir,
            prefix: args.debug_prefix.clone(),
        };
        &mut file_sink
    } else {
        null_sink = NullSink;
        &mut null_sink
    };

    let pb = spinner("extracting surface");
    let started = Instant::now();
    let surface = run_segmentation(&intensity, &mask, fiducials.as_ref(), params, sink)
        .context("surface extraction failed")?;
    pb.finish_with_message(format!(
        "surface extracted in {:.1}s",
        started.elapsed().as_secs_f64()
    ));

    write_volume(&surface, &args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        voxels = surface.count_eq(1),
        "surface mask written"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let info = read_volume_info(&args.input)
        .with_context(|| format!("reading header of {}", args.input.display()))?;
    if info.ndim != 3 {
        bail!(
            "{} has {} dimensions, expected a 3D volume",
            args.input.display(),
            info.ndim
        );
    }
    info!(data_type = ?info.data_type, "input volume opened");

    // dispatch on the stored element type; everything is flooded as f32
    // internally, this only controls the decode path
    match info.data_type {
        DataType::UInt8 => run::<u8>(&args),
        DataType::Int16 => run::<i16>(&args),
        DataType::UInt16 => run::<u16>(&args),
        DataType::Int32 => run::<i32>(&args),
        DataType::Float32 => run::<f32>(&args),
        DataType::Float64 => run::<f64>(&args),
    }
}
