//! nbrwatch CLI - forest disturbance detection with the Normalized Burn Ratio

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use nbrwatch_algorithms::analysis::{compute_disturbance, DisturbanceResult};
use nbrwatch_algorithms::imagery::{Catalog, UnmatchedPolicy};
use nbrwatch_algorithms::temporal::{
    format_date, parse_date, parse_reference_date, quick_select_dates, resolve_windows,
};
use nbrwatch_colormap::{auto_params, raster_to_rgba, Normalization, Palette, StyleRegistry, VisParams};
use nbrwatch_core::io::{read_geotiff, write_geotiff, write_rgba_tiff, GeoTiffOptions};
use nbrwatch_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "nbrwatch")]
#[command(author, version, about = "Forest disturbance detection with the Normalized Burn Ratio", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Resolve the pre/post windows of a reference date
    Windows {
        /// Reference date (YYYY-MM-DD); lists quick-select dates when omitted
        date: Option<String>,
        /// Window length in days
        #[arg(short, long, default_value = "60")]
        days: u32,
        /// Override today's date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Run the disturbance analysis over a scene catalog
    Analyze {
        /// Catalog manifest (TOML)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Reference date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Window length in days (overrides the catalog)
        #[arg(long)]
        days: Option<u32>,
        /// Severity threshold on dNBR (overrides the catalog)
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
        /// 20m scenes without a 10m counterpart: pass-through or drop
        #[arg(long)]
        unmatched: Option<UnmatchedPolicy>,
        /// Also write RGBA previews of every layer
        #[arg(long)]
        render: bool,
        /// Write the analysis summary as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
        /// Override today's date (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,
    },
    /// Render a single-band raster to an RGBA TIFF
    Render {
        /// Input raster file
        input: PathBuf,
        /// Output RGBA TIFF
        output: PathBuf,
        /// Layer preset: nbr, delta, disturbance; data range when omitted
        #[arg(short, long)]
        preset: Option<String>,
        /// Comma-separated hex palette (replaces the preset palette)
        #[arg(long)]
        palette: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f64>,
        /// Opacity in [0, 1]
        #[arg(long)]
        opacity: Option<f64>,
    },
    /// Render input bands with a named band-expression style
    Style {
        /// Output RGBA TIFF
        output: Option<PathBuf>,
        /// Input band files, in band order
        #[arg(short, long, num_args = 1..)]
        bands: Vec<PathBuf>,
        /// Style name
        #[arg(short, long, default_value = StyleRegistry::DEFAULT_STYLE)]
        name: String,
        /// JSON file with additional styles
        #[arg(long)]
        styles: Option<PathBuf>,
        /// Normalization minimum
        #[arg(long, default_value = "-30", allow_hyphen_values = true)]
        min: f64,
        /// Normalization maximum
        #[arg(long, default_value = "30", allow_hyphen_values = true)]
        max: f64,
        /// Raw no-data value
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        nodata: f64,
        /// List available styles and exit
        #[arg(long)]
        list: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    write_geotiff(
        raster,
        path,
        Some(GeoTiffOptions {
            write_nodata_tag: true,
        }),
    )
    .with_context(|| format!("Failed to write {}", path.display()))
}

fn write_preview(raster: &Raster<f64>, params: &VisParams, path: &Path) -> Result<()> {
    let rgba = raster_to_rgba(raster, params);
    write_rgba_tiff(&rgba, raster.rows(), raster.cols(), path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn today(arg: Option<&str>) -> Result<NaiveDate> {
    match arg {
        Some(s) => parse_date(s).context("Invalid --today"),
        None => Ok(Local::now().date_naive()),
    }
}

/// Validate the reference date before any computation
fn reference_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_reference_date(input, today).map_err(|e| {
        debug!(error = %e, "rejected reference date");
        anyhow::anyhow!(e.user_message())
    })
}

fn parse_palette(s: &str) -> Result<Palette> {
    let colors: Vec<&str> = s.split(',').map(str::trim).filter(|c| !c.is_empty()).collect();
    Palette::from_hex(&colors).with_context(|| format!("Invalid palette: {}", s))
}

fn write_layers(result: &DisturbanceResult, dir: &Path, render: bool) -> Result<()> {
    let layers = [
        (format!("nbr_{}", result.pre_year), &result.pre_composite.raster, VisParams::nbr()),
        (format!("nbr_{}", result.post_year), &result.post_composite.raster, VisParams::nbr()),
        (
            format!("dnbr_{}_{}", result.pre_year, result.post_year),
            &result.delta,
            VisParams::delta(),
        ),
        ("disturbance".to_string(), &result.disturbance, VisParams::disturbance()),
    ];

    let pb = spinner("Writing outputs...");
    for (name, raster, vis) in &layers {
        let path = dir.join(format!("{}.tif", name));
        write_result(raster, &path)?;
        debug!(path = %path.display(), "layer written");
        if render {
            write_preview(raster, vis, &dir.join(format!("{}_preview.tif", name)))?;
        }
    }
    pb.finish_and_clear();
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Windows ──────────────────────────────────────────────────
        Commands::Windows { date, days, today: today_arg } => {
            let today = today(today_arg.as_deref())?;
            let Some(date) = date else {
                println!("Quick select:");
                for (label, d) in quick_select_dates(today) {
                    println!("  {:<6} {}", label, format_date(d));
                }
                return Ok(());
            };
            let reference = reference_date(&date, today)?;
            let windows = resolve_windows(reference, days)?;
            println!("Reference date: {}", format_date(reference));
            println!("Post-disturbance period: {}", windows.post);
            println!("Pre-disturbance period: {}", windows.pre);
        }

        // ── Analyze ──────────────────────────────────────────────────
        Commands::Analyze {
            catalog,
            date,
            output,
            days,
            threshold,
            unmatched,
            render,
            summary_json,
            today: today_arg,
        } => {
            let reference = reference_date(&date, today(today_arg.as_deref())?)?;

            let pb = spinner("Loading catalog...");
            let catalog = Catalog::load(&catalog)
                .with_context(|| format!("Failed to load catalog {}", catalog.display()))?;
            let forest = catalog.forest_mask().context("Failed to read forest mask")?;
            pb.finish_and_clear();
            info!("Catalog: {} scenes", catalog.scenes().len());

            let mut params = catalog.analysis_params();
            if let Some(days) = days {
                params.window_days = days;
            }
            if let Some(threshold) = threshold {
                params.severity_threshold = threshold;
            }
            if let Some(unmatched) = unmatched {
                params.unmatched = unmatched;
            }

            let start = Instant::now();
            let pb = spinner("Computing disturbance...");
            let result = compute_disturbance(&catalog, catalog.domain(), &forest, reference, &params)
                .context("Failed to compute disturbance")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            write_layers(&result, &output, render)?;

            let summary = result.summary();
            print!("{}", summary);
            if let Some(path) = summary_json {
                let json = serde_json::to_string_pretty(&summary)?;
                fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            done("Disturbance layers", &output, elapsed);
        }

        // ── Render ───────────────────────────────────────────────────
        Commands::Render {
            input,
            output,
            preset,
            palette,
            min,
            max,
            opacity,
        } => {
            let raster = read_raster(&input)?;
            let start = Instant::now();
            let mut params = match preset.as_deref() {
                Some(name) => VisParams::named(name)
                    .with_context(|| format!("Unknown preset: {}. Use nbr, delta, or disturbance.", name))?,
                None => auto_params(&raster, Palette::grayscale()),
            };
            if let Some(p) = palette {
                params.palette = parse_palette(&p)?;
            }
            if let Some(min) = min {
                params.min = min;
            }
            if let Some(max) = max {
                params.max = max;
            }
            if let Some(opacity) = opacity {
                params = params.with_opacity(opacity);
            }
            write_preview(&raster, &params, &output)?;
            done("Preview", &output, start.elapsed());
        }

        // ── Style ────────────────────────────────────────────────────
        Commands::Style {
            output,
            bands,
            name,
            styles,
            min,
            max,
            nodata,
            list,
        } => {
            let mut registry = StyleRegistry::with_presets();
            if let Some(path) = styles {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let added = registry
                    .extend_from_json(&text)
                    .with_context(|| format!("Invalid styles in {}", path.display()))?;
                info!("Loaded {} styles from {}", added, path.display());
            }
            if list {
                for style in registry.names() {
                    let marker = if style == registry.active_name() { "*" } else { " " };
                    println!("{} {}", marker, style);
                }
                return Ok(());
            }
            if !registry.select(&name) {
                anyhow::bail!("Unknown style: {}", name);
            }
            let Some(output) = output else {
                anyhow::bail!("An output file is required");
            };
            let style = registry
                .active()
                .context("Active style missing from registry")?;

            let rasters = bands
                .iter()
                .map(|p| read_raster(p))
                .collect::<Result<Vec<_>>>()?;
            let refs: Vec<&Raster<f64>> = rasters.iter().collect();
            let Some(first) = rasters.first() else {
                anyhow::bail!("At least one --bands file is required");
            };

            let start = Instant::now();
            let norm = Normalization {
                min,
                max,
                nodata: Some(nodata),
            };
            let rgba = style.render(&refs, &norm).context("Failed to render style")?;
            write_rgba_tiff(&rgba, first.rows(), first.cols(), &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            done(&format!("Style '{}'", name), &output, start.elapsed());
        }
    }

    Ok(())
}
