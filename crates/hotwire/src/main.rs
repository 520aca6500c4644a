//! hotwire CLI: turns a pair of cross-section drawings into a four-axis
//! hot-wire program.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hotwire::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hotwire")]
#[command(about = "Four-axis hot-wire foam cutter path generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a program from an XY and a UV drawing
    Generate {
        /// XY cross-section (.dxf or .svg)
        #[arg(long)]
        xy: PathBuf,
        /// UV cross-section (.dxf or .svg)
        #[arg(long)]
        uv: PathBuf,
        /// JSON config; defaults are used when missing or invalid
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON kerf table mapping cut speed to offset
        #[arg(long)]
        offset_table: Option<PathBuf>,
        /// Directory the program is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Order both profiles into continuous loops, seeded by their first curve
        #[arg(long)]
        sort: bool,
        /// Repair self collisions and crossing neighbours
        #[arg(long)]
        repair: bool,
    },
    /// Check whether a drawing can be imported
    Check {
        file: PathBuf,
    },
    /// List the curves a drawing imports as
    Inspect {
        file: PathBuf,
        /// Resample splines by curvature
        #[arg(long)]
        refine: bool,
    },
    /// Write the default config
    InitConfig {
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    logging::init_tracing();
    let cli = Cli::parse();
    let log = ErrorLog::default_location().unwrap_or_else(|_| ErrorLog::new("hotwire-error.log"));

    let result = match cli.command {
        Commands::Generate {
            xy,
            uv,
            config,
            offset_table,
            output_dir,
            sort,
            repair,
        } => guard(&log, "generate", || {
            let options = GenerateOptions {
                xy: &xy,
                uv: &uv,
                config: config.as_deref(),
                offset_table: offset_table.as_deref(),
                output_dir: &output_dir,
                sort,
                repair,
            };
            generate(&options)
        }),
        Commands::Check { file } => guard(&log, "check", || {
            println!("{}: {:?}", file.display(), check_file(&file));
            Ok(())
        }),
        Commands::Inspect { file, refine } => guard(&log, "inspect", || inspect(&file, refine)),
        Commands::InitConfig { path } => guard(&log, "init-config", || {
            HotwireConfig::default().save_to_path(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err} ({})", log.path().display());
            ExitCode::FAILURE
        }
    }
}

struct GenerateOptions<'a> {
    xy: &'a Path,
    uv: &'a Path,
    config: Option<&'a Path>,
    offset_table: Option<&'a Path>,
    output_dir: &'a Path,
    sort: bool,
    repair: bool,
}

fn generate(options: &GenerateOptions) -> Result<()> {
    check_paths(options.xy, options.uv)?;

    let config = match options.config {
        Some(path) => {
            let load = HotwireConfig::load_or_default(path);
            if let ConfigStatus::Defaulted { reason } = &load.status {
                eprintln!("Using default config: {reason}");
            }
            load.config
        }
        None => HotwireConfig::default(),
    };
    let auto_repair = config.auto_repair;

    let mut project = Project::new("hotwire", config);
    project.import(Plane::Xy, options.xy)?;
    project.import(Plane::Uv, options.uv)?;

    if options.sort {
        let tol = project.config.tolerances.clone();
        for plane in [Plane::Xy, Plane::Uv] {
            let profile = project.profile_mut(plane);
            if let Some(&seed) = profile.ids().first() {
                let report = profile.sort(&[seed], &tol)?;
                println!("{plane:?}: {} loop(s)", report.groups);
            }
        }
    }

    if let Some(table) = options.offset_table {
        let function = OffsetFunction::load_from_path(table)?;
        assign_offsets_from_function(&mut project, &function)?;
    }
    if options.repair || auto_repair {
        let report = repair_collisions(&mut project);
        if !report.is_empty() {
            println!("Repaired collisions: {report:?}");
        }
    }

    let report = generate_to_dir(&mut project, options.output_dir)?;
    println!(
        "Wrote {} ({} curve pairs, {} points)",
        report.output.display(),
        report.pairs,
        report.points
    );
    Ok(())
}

fn inspect(file: &Path, refine: bool) -> Result<()> {
    let primitives = load_primitives(file)?;
    let tol = Tolerances::default();
    let profile = Profile::from_primitives("inspect", &primitives, refine, &tol);
    println!("{}: {} curve(s)", file.display(), profile.len());
    for curve in profile.curves() {
        println!(
            "  #{:<3} {:?} {:?} points={} length={:.3}",
            curve.index,
            curve.kind(),
            curve.interpolation(),
            curve.raw_points().len(),
            curve.length(LengthMode::Raw)
        );
    }
    Ok(())
}
