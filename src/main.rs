use anyhow::{bail, Context, Result};
use ndarray::{Array2, ArrayView2};
use pose_rows::{
    extract_detections, extract_poses, Codec, Detection, DetectorOutput, Pose, Record, Tracked,
};
use serde::Serialize;
use std::{
    io::Read,
    path::{Path, PathBuf},
};
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;

#[derive(structopt::StructOpt)]
enum Command {
    /// Extract detections from one frame of detector output (JSON) and print their rows.
    EncodeDetections {
        /// JSON file to read, stdin if absent.
        input: Option<PathBuf>,
    },

    /// Extract poses from one frame of detector output (JSON) and print their rows.
    EncodePoses {
        /// JSON file to read, stdin if absent.
        input: Option<PathBuf>,
    },

    /// Read detection rows and print the detections as JSON.
    DecodeDetections {
        /// Rows carry a leading object id column.
        #[structopt(short, long)]
        tracked: bool,

        /// Row file to read, stdin if absent.
        input: Option<PathBuf>,
    },

    /// Read pose rows and print the poses as JSON.
    DecodePoses {
        /// Rows carry a leading object id column.
        #[structopt(short, long)]
        tracked: bool,

        /// Row file to read, stdin if absent.
        input: Option<PathBuf>,
    },
}

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(flatten)]
    codec: Codec,

    #[structopt(subcommand)]
    command: Command,
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Parse one row per non-empty line, values separated by commas or whitespace.
fn parse_rows(text: &str, empty_width: usize) -> Result<Array2<f64>> {
    let mut values = Vec::new();
    let mut nrows = 0;
    let mut ncols = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let start = values.len();
        for cell in line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|cell| !cell.is_empty())
        {
            values.push(
                cell.parse::<f64>()
                    .with_context(|| format!("line {}: invalid number {:?}", lineno + 1, cell))?,
            );
        }
        let width = values.len() - start;
        match ncols {
            None => ncols = Some(width),
            Some(expected) if expected != width => {
                bail!("line {}: expected {} values, got {}", lineno + 1, expected, width)
            }
            Some(_) => {}
        }
        nrows += 1;
    }

    let shape = (nrows, ncols.unwrap_or(empty_width));
    Array2::from_shape_vec(shape, values).context("failed to build row array")
}

fn print_rows(rows: ArrayView2<'_, f64>) {
    for row in rows.outer_iter() {
        let cells = row.iter().map(f64::to_string).collect::<Vec<_>>();
        println!("{}", cells.join(","));
    }
}

fn decode<R>(codec: &Codec, input: Option<&Path>, tracked: bool) -> Result<String>
where
    R: Record + Serialize,
{
    let text = read_input(input)?;
    let json = if tracked {
        let rows = parse_rows(&text, codec.width::<Tracked<R>>())?;
        let records = codec
            .decode_tracked::<R>(rows.view())
            .context("failed decoding tracked rows")?;
        info!(records = records.len(), "decoded tracked rows");
        serde_json::to_string_pretty(&records)?
    } else {
        let rows = parse_rows(&text, codec.width::<R>())?;
        let records = codec
            .decode::<R>(rows.view())
            .context("failed decoding rows")?;
        info!(records = records.len(), "decoded rows");
        serde_json::to_string_pretty(&records)?
    };
    Ok(json)
}

fn read_detector_output(input: Option<&Path>) -> Result<DetectorOutput> {
    let text = read_input(input)?;
    serde_json::from_str(&text).context("failed parsing detector output")
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let codec = opt.codec;

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(opt.log_level),
    )?;

    debug!(num_keypoints = codec.num_keypoints, "configured codec");

    match opt.command {
        Command::EncodeDetections { input } => {
            let output = read_detector_output(input.as_deref())?;
            let detections =
                extract_detections(&output).context("failed extracting detections")?;
            let rows = codec.encode(&detections).context("failed encoding detections")?;
            info!(rows = rows.nrows(), "encoded detections");
            print_rows(rows.view());
        }
        Command::EncodePoses { input } => {
            let output = read_detector_output(input.as_deref())?;
            let poses = extract_poses(&output).context("failed extracting poses")?;
            let rows = codec.encode(&poses).context("failed encoding poses")?;
            info!(rows = rows.nrows(), "encoded poses");
            print_rows(rows.view());
        }
        Command::DecodeDetections { tracked, input } => {
            println!("{}", decode::<Detection>(&codec, input.as_deref(), tracked)?);
        }
        Command::DecodePoses { tracked, input } => {
            println!("{}", decode::<Pose>(&codec, input.as_deref(), tracked)?);
        }
    }

    Ok(())
}
