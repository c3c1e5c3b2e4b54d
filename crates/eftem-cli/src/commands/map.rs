use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use eftem_core::dataset::{begin_run, FitResult};
use eftem_core::fit::ErrorCode;
use eftem_core::image::{EnergyImage, ResultImage};
use eftem_core::io::image_io::{
    energy_loss_from_file_name, load_energy_image, save_result_image, save_scaled,
};
use eftem_core::pipeline::config::MapConfig;
use eftem_core::pipeline::{run_pipeline_reported, ProgressReporter, Stage};
use eftem_core::report::RunReport;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use tracing::info;

use crate::summary::{print_map_summary, print_run_summary};

#[derive(Args)]
pub struct MapArgs {
    /// Input images, one per energy loss
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Map config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Edge energy loss in eV (predicted from the stack if omitted)
    #[arg(long)]
    pub edge: Option<f32>,

    /// Convergence tolerance of the background fit
    #[arg(long)]
    pub epsilon: Option<f32>,

    /// Number of worker threads (defaults to available cores)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Comma-separated energy losses in eV, in file order. Read from the
    /// file names if omitted.
    #[arg(long)]
    pub eloss: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = "eftem-out")]
    pub output: PathBuf,
}

struct BarReporter {
    pb: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: Stage, _sub_tasks: usize) {
        self.pb.set_message(stage.to_string());
        self.pb.set_position(0);
    }

    fn progress(&self, percent: u8) {
        self.pb.set_position(percent as u64);
    }

    fn stage_skipped(&self, stage: Stage) {
        self.pb.println(format!("  {stage}: skipped (fewer than 3 pre-edge images)"));
    }
}

pub fn run(args: &MapArgs) -> Result<()> {
    let config = load_config(args)?;
    let energy_losses = resolve_energy_losses(args)?;

    let images = args
        .files
        .iter()
        .zip(&energy_losses)
        .map(|(path, &e)| {
            load_energy_image(path, e)
                .with_context(|| format!("Failed to load {}", path.display()))
        })
        .collect::<Result<Vec<EnergyImage>>>()?;

    let edge = config
        .resolve_edge(&energy_losses)
        .context("Cannot predict an edge, pass --edge")?;
    let input = begin_run(images, edge, config.epsilon)?;
    let ctx = config.context()?;

    print_map_summary(&input, &config, ctx.workers(), &args.output);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40}] {pos}%")?
            .progress_chars("=> "),
    );
    let reporter = BarReporter { pb: pb.clone() };
    let output = run_pipeline_reported(&input, &ctx, &reporter)?;
    pb.finish_with_message("Done");

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_images(&output.result, &args.output)?;

    let report = RunReport::build(&input, &output.result, &output.timings);
    let report_path = args.output.join("report.toml");
    std::fs::write(&report_path, toml::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    print_run_summary(&report, output.total_elapsed());
    println!("\nResults saved to {}", args.output.display());
    Ok(())
}

fn load_config(args: &MapArgs) -> Result<MapConfig> {
    let mut config: MapConfig = if let Some(ref path) = args.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid map config")?
    } else {
        MapConfig::default()
    };
    if args.edge.is_some() {
        config.edge_energy_loss = args.edge;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    Ok(config)
}

fn resolve_energy_losses(args: &MapArgs) -> Result<Vec<f32>> {
    if let Some(ref list) = args.eloss {
        let values = list
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<f32>()
                    .with_context(|| format!("Invalid energy loss '{}'", s.trim()))
            })
            .collect::<Result<Vec<f32>>>()?;
        if values.len() != args.files.len() {
            bail!(
                "{} energy losses given for {} files",
                values.len(),
                args.files.len()
            );
        }
        return Ok(values);
    }

    args.files
        .iter()
        .map(|path| {
            energy_loss_from_file_name(path).with_context(|| {
                format!(
                    "No energy loss in file name {}, pass --eloss",
                    path.display()
                )
            })
        })
        .collect()
}

/// `index` is the image's position among results of its kind, so images at
/// equal energy losses do not overwrite each other.
fn file_name(label: &str, index: usize) -> String {
    let name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    format!("{name}_{index:02}.tif")
}

fn write_images(result: &FitResult, dir: &Path) -> Result<()> {
    let error = result.error.view();
    let save = |index: usize, img: &ResultImage| -> Result<()> {
        let path = dir.join(file_name(&img.label, index));
        save_result_image(img, error, &path)
            .with_context(|| format!("Failed to write {}", path.display()))
    };

    for images in [
        &result.background,
        &result.relative_background,
        &result.map,
        &result.sigma2,
        &result.snr,
    ] {
        for (index, img) in images.iter().enumerate() {
            save(index, img)?;
        }
    }

    save_scaled(result.r.view(), error, &dir.join("r.tif"))?;
    save_scaled(result.a.view(), error, &dir.join("a.tif"))?;
    save_scaled(result.coeff_of_det.view(), error, &dir.join("coeff_of_det.tif"))?;
    save_scaled(result.chi2.view(), error, &dir.join("chi2.tif"))?;

    let unmasked = Array2::from_elem(result.error.dim(), ErrorCode::None);
    save_scaled(result.error_map().view(), unmasked.view(), &dir.join("errors.tif"))?;

    info!(dir = %dir.display(), "Result images written");
    Ok(())
}
