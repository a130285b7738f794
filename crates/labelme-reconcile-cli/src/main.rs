// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use labelme_reconcile::{
    Error, Settings,
    geojson::merge_feature_collections,
    labelme::{
        DiffMode, LabelmeReader, LabelmeWriter, MergeStatus, copy_unannotated_images,
        diff_folders, merge_images, merge_to_file, standardize_folder,
    },
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file, defaults to settings.toml in the user config directory
    #[clap(long)]
    config: Option<PathBuf>,

    /// Worker threads used for per-image processing
    #[clap(long)]
    threads: Option<usize>,

    /// Write a Chrome trace of the run to this file
    #[cfg(feature = "trace-file")]
    #[clap(long)]
    trace_file: Option<PathBuf>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Compare two annotation folders for the same images.  Every image whose
    /// rectangles differ is copied to the output folder together with a
    /// document holding only the differing rectangles.
    Diff {
        /// Folder with the first annotation set and the images
        #[clap(long)]
        folder1: PathBuf,

        /// Folder with the second annotation set
        #[clap(long)]
        folder2: PathBuf,

        /// Output folder for differing images and documents
        #[clap(long)]
        output: PathBuf,

        /// IoU at or below which two rectangles count as different
        #[clap(long)]
        overlap: Option<f64>,

        /// Only keep differing rectangles from the first folder
        #[clap(long)]
        only_first: bool,
    },
    /// Merge tile documents named <image>_x_<col>_y_<row>.json into one
    /// document per full image.
    Merge {
        /// Folder holding the tile documents
        #[clap(long)]
        tiles: PathBuf,

        /// Full images to rebuild documents for
        #[clap(long, required = true, num_args = 1..)]
        image: Vec<PathBuf>,

        /// Output document for a single image (*.json), otherwise a folder
        /// receiving <image>.json per image
        #[clap(long)]
        output: PathBuf,
    },
    /// Rewrite every document of a folder in place: clear imageData, point
    /// imagePath at the sibling image and remove unwanted labels.
    Standardize {
        /// Folder with the documents
        #[clap(long)]
        json_dir: PathBuf,

        /// Image extension used for imagePath
        #[clap(long)]
        extension: Option<String>,

        /// Label to remove, replaces the configured list when given
        #[clap(long = "remove-label")]
        remove_label: Vec<String>,
    },
    /// Copy images that have no sibling .json document.
    CopyUnannotated {
        /// Folder to scan
        #[clap(long)]
        src: PathBuf,

        /// Destination folder
        #[clap(long)]
        dst: PathBuf,

        /// Image extension to look for
        #[clap(long)]
        extension: Option<String>,
    },
    /// Concatenate the features of several GeoJSON FeatureCollections.
    MergeGeojson {
        /// Input FeatureCollection files, the first one provides the crs
        #[clap(long, required = true, num_args = 1..)]
        geojson: Vec<PathBuf>,

        /// Output file
        #[clap(long)]
        output: PathBuf,
    },
}

fn progress_bar(len: usize, msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(msg);
    bar
}

fn handle_diff(
    settings: &Settings,
    folder1: &Path,
    folder2: &Path,
    output: &Path,
    overlap: Option<f64>,
    only_first: bool,
) -> Result<(), Error> {
    let mode = match only_first {
        true => DiffMode::OnlyFirst,
        false => DiffMode::Symmetric,
    };
    let mut options = settings.diff_options(mode);
    if let Some(overlap) = overlap {
        options.threshold = overlap;
    }

    let total = LabelmeReader::new().list_documents(folder1)?.len();
    let bar = progress_bar(total, "Comparing");
    let report = diff_folders(folder1, folder2, output, &options, |_| bar.inc(1))?;
    bar.finish_and_clear();

    for (name, err) in report.skipped() {
        println!("Skipped {}: {}", name, err);
    }
    println!("{}", report);
    Ok(())
}

fn print_merge_status(image: &Path, status: &MergeStatus) {
    match status {
        MergeStatus::Written {
            document,
            tiles,
            shapes,
            skipped_tiles,
        } => {
            println!(
                "{}: {} shapes from {} tiles written to {}",
                image.display(),
                shapes,
                tiles,
                document.display()
            );
            if *skipped_tiles > 0 {
                println!("{}: {} unreadable tiles skipped", image.display(), skipped_tiles);
            }
        }
        MergeStatus::Failed(err) => println!("{}: failed: {}", image.display(), err),
    }
}

fn handle_merge(
    settings: &Settings,
    tiles: &Path,
    images: &[PathBuf],
    output: &Path,
) -> Result<(), Error> {
    let reader = LabelmeReader::new();
    let writer = LabelmeWriter::with_options(settings.write_options());

    let single_file = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if let ([image], true) = (images, single_file) {
        let status = merge_to_file(&reader, &writer, tiles, image, output)?;
        print_merge_status(image, &status);
        return Ok(());
    }

    let bar = progress_bar(images.len(), "Merging");
    let outcomes = merge_images(&reader, &writer, tiles, images, output, |_| bar.inc(1))?;
    bar.finish_and_clear();

    for outcome in &outcomes {
        print_merge_status(&outcome.image, &outcome.status);
    }
    let merged = outcomes
        .iter()
        .filter(|o| matches!(o.status, MergeStatus::Written { .. }))
        .count();
    println!("{} of {} images merged", merged, outcomes.len());
    Ok(())
}

fn handle_standardize(
    settings: &Settings,
    json_dir: &Path,
    extension: Option<String>,
    remove_label: Vec<String>,
) -> Result<(), Error> {
    let mut options = settings.standardize_options();
    if let Some(extension) = extension {
        options.image_extension = extension.trim_start_matches('.').to_string();
    }
    if !remove_label.is_empty() {
        options.remove_labels = remove_label;
    }

    let writer = LabelmeWriter::with_options(settings.write_options());
    let report = standardize_folder(&LabelmeReader::new(), &writer, json_dir, &options)?;

    for (path, err) in &report.failed {
        println!("Failed {}: {}", path.display(), err);
    }
    println!(
        "{} documents updated, {} shapes removed, {} failed",
        report.updated.len(),
        report.removed_shapes(),
        report.failed.len()
    );
    Ok(())
}

fn handle_copy_unannotated(
    settings: &Settings,
    src: &Path,
    dst: &Path,
    extension: Option<String>,
) -> Result<(), Error> {
    let extension = extension.unwrap_or_else(|| settings.image_extension.clone());
    let report = copy_unannotated_images(src, dst, extension.trim_start_matches('.'))?;

    for (path, err) in &report.failed {
        println!("Failed {}: {}", path.display(), err);
    }
    println!(
        "Copied {} unannotated images to {}, {} failed",
        report.copied.len(),
        dst.display(),
        report.failed.len()
    );
    Ok(())
}

fn handle_merge_geojson(
    settings: &Settings,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<(), Error> {
    let (collection, report) = merge_feature_collections(inputs)?;
    LabelmeWriter::with_options(settings.write_options()).write_json(&collection, output)?;

    for (name, err) in &report.skipped {
        println!("Skipped {}: {}", name, err);
    }
    println!(
        "{} features from {} files written to {}",
        report.feature_count(),
        report.merged.len(),
        output.display()
    );
    Ok(())
}

/// Holds the trace file open until the command completes.
#[cfg(feature = "profiling")]
struct Profiling {
    #[cfg(feature = "trace-file")]
    _flush: Option<tracing_chrome::FlushGuard>,
}

#[cfg(feature = "profiling")]
#[cfg_attr(not(feature = "trace-file"), allow(unused_variables))]
fn init_profiling(args: &Args) -> Profiling {
    use tracing_subscriber::{
        EnvFilter,
        fmt::{self, format::FmtSpan},
        prelude::*,
    };

    let filter = EnvFilter::try_from_env("LABELME_RECONCILE_TRACE")
        .unwrap_or_else(|_| EnvFilter::new("labelme_reconcile=info"));
    let spans = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    #[cfg(feature = "trace-file")]
    let (chrome, flush) = match &args.trace_file {
        Some(path) => {
            let (layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
                .file(path)
                .include_args(true)
                .build();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "trace-file"))]
    let chrome: Option<tracing_subscriber::layer::Identity> = None;

    // log records already go through env_logger, so only spans are routed here
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(chrome)
        .with(spans);
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        log::warn!("Tracing disabled: {}", err);
    }

    Profiling {
        #[cfg(feature = "trace-file")]
        _flush: flush,
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    #[cfg(feature = "profiling")]
    let _profiling = init_profiling(&args);

    let settings = Settings::load(args.config.as_deref())?;

    if let Some(threads) = args.threads.or(settings.threads) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        log::debug!("Using {} worker threads", threads);
    }

    match args.cmd {
        Command::Diff {
            folder1,
            folder2,
            output,
            overlap,
            only_first,
        } => handle_diff(&settings, &folder1, &folder2, &output, overlap, only_first),
        Command::Merge {
            tiles,
            image,
            output,
        } => handle_merge(&settings, &tiles, &image, &output),
        Command::Standardize {
            json_dir,
            extension,
            remove_label,
        } => handle_standardize(&settings, &json_dir, extension, remove_label),
        Command::CopyUnannotated {
            src,
            dst,
            extension,
        } => handle_copy_unannotated(&settings, &src, &dst, extension),
        Command::MergeGeojson { geojson, output } => {
            handle_merge_geojson(&settings, &geojson, &output)
        }
    }
}
