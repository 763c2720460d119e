use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use terra_vision::{analyze, AnalysisConfig, ColorSpace, DifferenceMode, Image};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "change_tester")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compares two captures of the same area and writes a change report", long_about = None)]
struct Cli {
    /// The earlier capture.
    before: PathBuf,

    /// The later capture.
    after: PathBuf,

    /// Directory receiving heatmap.png, overlay.png and report.json.
    #[arg(short, long, default_value = "change_output")]
    output: PathBuf,

    /// JSON file with an `AnalysisConfig`; missing fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed change threshold in [0, 1].
    #[arg(long, conflicts_with = "adaptive")]
    threshold: Option<f64>,

    /// Derive the threshold from the difference map.
    #[arg(long)]
    adaptive: bool,

    #[arg(long)]
    min_region_area: Option<usize>,

    #[arg(long)]
    max_shift: Option<u32>,

    /// grayscale, rgb, hsv or lab.
    #[arg(long, value_parser = parse_color_space)]
    color_space: Option<ColorSpace>,

    /// Odd morphology kernel size; 1 disables cleanup.
    #[arg(long)]
    kernel: Option<u32>,

    /// Average the difference map over square blocks of this size.
    #[arg(long)]
    block_size: Option<u32>,

    /// Outline every region's bounding box on the overlay.
    #[arg(long)]
    boxes: bool,
}

fn parse_color_space(value: &str) -> Result<ColorSpace, String> {
    match value.to_ascii_lowercase().as_str() {
        "grayscale" | "gray" => Ok(ColorSpace::Grayscale),
        "rgb" => Ok(ColorSpace::Rgb),
        "hsv" => Ok(ColorSpace::Hsv),
        "lab" => Ok(ColorSpace::Lab),
        other => Err(format!("unknown color space `{other}`")),
    }
}

impl Cli {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                AnalysisConfig::from_json(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => AnalysisConfig::default(),
        };

        if self.adaptive {
            config.threshold = None;
        } else if let Some(threshold) = self.threshold {
            config.threshold = Some(threshold);
        }
        if let Some(area) = self.min_region_area {
            config.min_region_area = area;
        }
        if let Some(shift) = self.max_shift {
            config.alignment_max_shift = shift;
        }
        if let Some(color_space) = self.color_space {
            config.color_space = color_space;
        }
        if let Some(kernel) = self.kernel {
            config.morphology_kernel_size = kernel;
        }
        if let Some(size) = self.block_size {
            config.difference_mode = DifferenceMode::Block { size };
        }
        if self.boxes {
            config.visualization.draw_region_boxes = true;
        }
        Ok(config)
    }
}

fn load(path: &Path) -> Result<Image> {
    let decoded = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    Ok(Image::from_dynamic(&decoded))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // --- 1. Argument Parsing & Setup ---
    let cli = Cli::parse();
    let config = cli.analysis_config()?;

    // --- 2. Image Decoding ---
    let before = load(&cli.before)?;
    let after = load(&cli.after)?;
    info!(
        before = %cli.before.display(),
        after = %cli.after.display(),
        "loaded {}x{} and {}x{}",
        before.width(),
        before.height(),
        after.width(),
        after.height()
    );

    // --- 3. Analysis ---
    let (report, artifact) = analyze(&before, &after, &config).context("change analysis failed")?;

    // --- 4. Output ---
    fs::create_dir_all(&cli.output).with_context(|| format!("creating {}", cli.output.display()))?;
    let heatmap_path = cli.output.join("heatmap.png");
    let overlay_path = cli.output.join("overlay.png");
    let report_path = cli.output.join("report.json");

    artifact
        .heatmap
        .save(&heatmap_path)
        .with_context(|| format!("writing {}", heatmap_path.display()))?;
    artifact
        .overlay
        .save(&overlay_path)
        .with_context(|| format!("writing {}", overlay_path.display()))?;
    fs::write(&report_path, report.to_json()?).with_context(|| format!("writing {}", report_path.display()))?;

    info!(
        regions = report.region_count(),
        changed = report.total_changed_pixels,
        "{:.2}% of the area changed",
        report.percent_changed * 100.0
    );
    for region in report.regions.iter().take(10) {
        info!(
            id = region.id,
            area = region.area,
            "centroid ({:.1}, {:.1}), mean intensity {:.3}",
            region.centroid.0,
            region.centroid.1,
            region.mean_intensity
        );
    }
    println!("Analysis complete. Output saved to {}", cli.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_replace_defaults() {
        let cli = Cli::parse_from([
            "change_tester",
            "a.png",
            "b.png",
            "--threshold",
            "0.2",
            "--kernel",
            "3",
            "--color-space",
            "rgb",
            "--block-size",
            "4",
        ]);
        let config = cli.analysis_config().unwrap();
        assert_eq!(config.threshold, Some(0.2));
        assert_eq!(config.morphology_kernel_size, 3);
        assert_eq!(config.color_space, ColorSpace::Rgb);
        assert_eq!(config.difference_mode, DifferenceMode::Block { size: 4 });
    }

    #[test]
    fn adaptive_flag_clears_the_threshold() {
        let cli = Cli::parse_from(["change_tester", "a.png", "b.png", "--adaptive"]);
        assert_eq!(cli.analysis_config().unwrap().threshold, None);
    }

    #[test]
    fn unknown_color_space_is_rejected() {
        assert!(parse_color_space("cmyk").is_err());
        assert_eq!(parse_color_space("LAB"), Ok(ColorSpace::Lab));
    }
}
