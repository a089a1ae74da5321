#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod app;
mod canvas;
mod config;
mod error;
mod export;
mod headless;
mod keyboard;
mod session;
mod types;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use crate::app::CropperApp;
use crate::config::{AppConfig, LogLevel};
use crate::export::ImageSource;
use crate::types::CropArea;

/// Crop an image by placing two anchors.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Image file or `data:` URL to open on startup
    image: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write exports into this directory instead of asking
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Export at the display's pixel ratio
    #[arg(long)]
    hidpi_export: bool,

    /// Crop without opening a window; repeat for several areas
    #[arg(long, value_name = "X0,Y0,X1,Y1", value_parser = headless::parse_crop, requires = "image")]
    crop: Vec<CropArea>,

    /// With --crop, print a PNG data URL preview instead of writing files
    #[arg(long, requires = "crop")]
    thumbnail: bool,

    /// List the formats exports can be written in and exit
    #[arg(long)]
    list_formats: bool,
}

/// Runs the command line mode. Returns the process exit code.
fn run_headless(args: &Args, config: &AppConfig) -> i32 {
    if args.list_formats {
        for format in headless::format_list() {
            println!("{format}");
        }
        return 0;
    }

    let Some(image) = args.image.as_deref() else {
        return 2;
    };
    let source = match ImageSource::parse(image) {
        Ok(source) => source,
        Err(e) => {
            log::error!("{e}");
            return 1;
        }
    };

    if args.thumbnail {
        for area in &args.crop {
            match headless::thumbnail_data_url(&source, area) {
                Ok(url) => println!("{url}"),
                Err(e) => {
                    log::error!("Thumbnail failed: {e}");
                    return 1;
                }
            }
        }
        return 0;
    }

    let output_dir = config.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    // No display to take a ratio from, so a hidpi export means 2x
    let ratio = if config.hidpi_export { 2.0 } else { 1.0 };
    match headless::crop_to_files(&source, &args.crop, ratio, &output_dir) {
        Ok(written) if written.is_empty() => {
            log::error!("No valid crop areas");
            1
        }
        Ok(written) => {
            for path in written {
                println!("{}", path.display());
            }
            0
        }
        Err(e) => {
            log::error!("Export failed: {e}");
            1
        }
    }
}

fn main() -> eframe::Result {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(AppConfig::default_path);
    let loaded = config_path
        .as_deref()
        .filter(|path| path.exists())
        .map(AppConfig::load_from);

    let level = args
        .log_level
        .or_else(|| match &loaded {
            Some(Ok(config)) => Some(config.log_level),
            _ => None,
        })
        .unwrap_or_default();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()))
        .init();

    let mut config = match (loaded, &config_path) {
        (Some(Ok(config)), Some(path)) => {
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        (Some(Err(e)), Some(path)) => {
            log::warn!("Ignoring {}: {e}", path.display());
            AppConfig::default()
        }
        _ => AppConfig::default(),
    };
    if args.output_dir.is_some() {
        config.output_dir = args.output_dir.clone();
    }
    if args.hidpi_export {
        config.hidpi_export = true;
    }

    if args.list_formats || !args.crop.is_empty() {
        std::process::exit(run_headless(&args, &config));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Anchor Crop",
        options,
        Box::new(|cc| Ok(Box::new(CropperApp::new(cc, config, args.image)))),
    )
}
