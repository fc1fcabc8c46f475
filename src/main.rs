use chrono::NaiveDateTime;
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};
use swathfire::{
    granule_name_of, is_container_path, process_granule, save_csv, BoundingBox, Config, Coord,
    FireDatabase, FireRecord, Granule, SwathFireResult,
};
use walkdir::WalkDir;

/*-------------------------------------------------------------------------------------------------
 *                                     Command Line Options
 *-----------------------------------------------------------------------------------------------*/

///
/// Detect active fires in pre-decoded swath granules and report their
/// radiative power.
///
/// Every granule container found in the given files and directories is
/// cropped to the bounding box, run through the contextual detection
/// cascade, and written out as one CSV per granule, plus an optional sqlite
/// archive. Unreadable granules are skipped with an error and the exit
/// status is non-zero if any input could not be read.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "swathfire")]
#[clap(author, version, about)]
struct SwathFireOptionsInit {
    /// Granule container files, or directories to search for containers.
    #[clap(required = true)]
    inputs: Vec<PathBuf>,

    /// The minimum latitude of the detection bounding box.
    #[clap(long = "minLat", default_value_t = 65.0)]
    min_lat: f64,

    /// The maximum latitude of the detection bounding box.
    #[clap(long = "maxLat", default_value_t = 65.525)]
    max_lat: f64,

    /// The minimum longitude of the detection bounding box.
    #[clap(long = "minLon", default_value_t = -148.0)]
    min_lon: f64,

    /// The maximum longitude of the detection bounding box.
    #[clap(long = "maxLon", default_value_t = -146.0)]
    max_lon: f64,

    /// Tighten (< 1.0) or loosen (> 1.0) every detection threshold.
    #[clap(long, default_value_t = 1.0)]
    reduction_factor: f32,

    /// The path to a fires database file to archive detections in.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "FIRES_DB" environment variable. Without either, no archive is kept.
    #[clap(short, long)]
    #[clap(env = "FIRES_DB")]
    fires_store_file: Option<PathBuf>,

    /// Directory for the per-granule CSV files.
    ///
    /// Defaults to the directory each granule container came from.
    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    /// Only process granules that are not in the archive yet.
    #[clap(short = 'n', long)]
    only_new: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct SwathFireOptions {
    inputs: Vec<PathBuf>,
    area: BoundingBox,
    reduction_factor: f32,
    fires_store_file: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    only_new: bool,
    verbose: bool,
}

impl Display for SwathFireOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?;
        writeln!(f, "    Bounding box: {}", self.area)?;
        writeln!(f, "Reduction factor: {}", self.reduction_factor)?;
        match &self.fires_store_file {
            Some(path) => writeln!(f, "         Archive: {}", path.display())?,
            None => writeln!(f, "         Archive: none")?,
        }
        match &self.output_dir {
            Some(path) => writeln!(f, "      Output dir: {}", path.display())?,
            None => writeln!(f, "      Output dir: alongside the granules")?,
        }
        writeln!(f, "        Only new: {}", if self.only_new { "yes" } else { "no" })?;
        writeln!(f, "\n")?;

        Ok(())
    }
}

/// Get the command line arguments and check them.
fn parse_args() -> SwathFireResult<SwathFireOptions> {
    let SwathFireOptionsInit {
        inputs,
        min_lat,
        max_lat,
        min_lon,
        max_lon,
        reduction_factor,
        fires_store_file,
        output_dir,
        only_new,
        verbose,
    } = SwathFireOptionsInit::parse();

    if !(min_lat < max_lat) || !(min_lon < max_lon) {
        return Err("the bounding box is empty".into());
    }

    if !(reduction_factor > 0.0) {
        return Err("the reduction factor must be positive".into());
    }

    let checked = SwathFireOptions {
        inputs,
        area: BoundingBox {
            ll: Coord {
                lat: min_lat,
                lon: min_lon,
            },
            ur: Coord {
                lat: max_lat,
                lon: max_lon,
            },
        },
        reduction_factor,
        fires_store_file,
        output_dir,
        only_new,
        verbose,
    };

    if checked.verbose {
        info!("{}", checked);
    }

    Ok(checked)
}

/*-------------------------------------------------------------------------------------------------
 *                              Steps in the processing pipeline
 *-----------------------------------------------------------------------------------------------*/

struct GranuleResult {
    name: String,
    scan_time: Option<NaiveDateTime>,
    records: Vec<FireRecord>,
}

/// Find every granule container under the inputs, oldest path first.
fn gather_container_paths(
    inputs: &[PathBuf],
    db: Option<&FireDatabase>,
    only_new: bool,
) -> SwathFireResult<Vec<PathBuf>> {
    let mut paths = vec![];
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).into_iter().filter_map(|res| res.ok()) {
                if entry.file_type().is_file() && is_container_path(entry.path()) {
                    paths.push(entry.into_path());
                }
            }
        } else {
            paths.push(input.clone());
        }
    }

    paths.sort();

    if only_new {
        match db {
            Some(db) => {
                let before = paths.len();
                let mut kept = Vec::with_capacity(paths.len());
                for path in paths {
                    if !db.is_granule_present(&granule_name_of(&path))? {
                        kept.push(path);
                    }
                }

                info!("skipping {} already-archived granule(s)", before - kept.len());
                return Ok(kept);
            }
            None => warn!("--only-new has no effect without a fires database"),
        }
    }

    Ok(paths)
}

fn granule_worker(
    paths: Receiver<PathBuf>,
    results: Sender<GranuleResult>,
    config: &Config,
    output_dir: Option<&Path>,
    unreadable: &AtomicUsize,
) {
    for path in paths {
        let granule = match Granule::open(&path) {
            Ok(granule) => granule,
            Err(err) => {
                error!("unable to read {}: {}", path.display(), err);
                unreadable.fetch_add(1, Ordering::SeqCst);
                continue;
            }
        };

        info!("processing {}", granule.name);
        let records = process_granule(&granule, config);

        // No fires, no CSV.
        if !records.is_empty() {
            let csv_path = csv_path_for(&path, output_dir, &granule.name);
            if let Err(err) = save_csv(&records, &csv_path) {
                error!("unable to write {}: {}", csv_path.display(), err);
            }
        }

        let result = GranuleResult {
            name: granule.name,
            scan_time: granule.scan_time,
            records,
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

fn csv_path_for(container: &Path, output_dir: Option<&Path>, name: &str) -> PathBuf {
    let file_name = format!("{}.frp.csv", name);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => container.with_file_name(file_name),
    }
}

fn collect_results(
    results: Receiver<GranuleResult>,
    db: Option<&FireDatabase>,
) -> SwathFireResult<()> {
    let mut add = match db {
        Some(db) => Some(db.prepare_to_add()?),
        None => None,
    };

    let mut num_granules = 0_usize;
    let mut num_fires = 0_usize;
    let mut strongest: Option<FireRecord> = None;

    for result in results {
        num_granules += 1;
        num_fires += result.records.len();

        for record in &result.records {
            let stronger = strongest
                .as_ref()
                .map(|s| record.power > s.power)
                .unwrap_or(true);
            if stronger {
                strongest = Some(record.clone());
            }
        }

        if let Some(add) = add.as_mut() {
            add.add(&result.name, result.scan_time, &result.records)?;
        }
    }

    info!(
        "processed {} granule(s), {} fire pixel(s) detected",
        num_granules, num_fires
    );
    if let Some(strongest) = strongest {
        info!(
            "strongest detection: {:.0} MW at ({:.4}, {:.4}), confidence {:.0}",
            strongest.power,
            strongest.lat,
            strongest.lon,
            strongest.confidence * 100.0
        );
    }

    Ok(())
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> SwathFireResult<()> {
    SimpleLogger::new().init()?;

    let opts = parse_args()?;

    let config = Config {
        reduction_factor: opts.reduction_factor,
        area: opts.area,
        ..Config::default()
    };

    let db = match &opts.fires_store_file {
        Some(path) => {
            FireDatabase::initialize(path)?;
            Some(FireDatabase::connect(path)?)
        }
        None => None,
    };

    let paths = gather_container_paths(&opts.inputs, db.as_ref(), opts.only_new)?;
    info!("{} granule container(s) to process", paths.len());

    let unreadable = AtomicUsize::new(0);
    let num_workers = num_cpus::get();

    let collect_result = thread::scope(|scope| {
        let (path_tx, path_rx) = bounded::<PathBuf>(64);
        let (result_tx, result_rx) = bounded::<GranuleResult>(64);

        for _ in 0..num_workers {
            let path_rx = path_rx.clone();
            let result_tx = result_tx.clone();
            let config = &config;
            let output_dir = opts.output_dir.as_deref();
            let unreadable = &unreadable;

            scope.spawn(move || {
                granule_worker(path_rx, result_tx, config, output_dir, unreadable)
            });
        }
        drop(path_rx);
        drop(result_tx);

        scope.spawn(move || {
            for path in paths {
                if path_tx.send(path).is_err() {
                    break;
                }
            }
        });

        collect_results(result_rx, db.as_ref())
    });
    collect_result?;

    let num_unreadable = unreadable.load(Ordering::SeqCst);
    if num_unreadable > 0 {
        return Err(format!("{} granule container(s) could not be read", num_unreadable).into());
    }

    Ok(())
}
