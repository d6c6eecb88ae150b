use std::time::Instant;

use planscan::{
    georef::GeoBoundingBox,
    naming::{NamingConfig, PolePattern},
    DetectionOptions, PlanScanBuilder,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(image_path) = args.next() else {
        eprintln!("usage: planscan <plan-image> [lat-center] [lon-center] [scale] [dpi]");
        std::process::exit(2);
    };
    let lat: f64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(-6.88);
    let lon: f64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(109.115);
    let scale: f64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(0.005);
    let dpi: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(300);

    let image = match image::open(&image_path) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("could not read plan raster {image_path}: {err}");
            return;
        }
    };

    let bounds = GeoBoundingBox::from_center(lat, lon, scale).expect("invalid map calibration");
    let naming = NamingConfig::new("FOT", "FDT", PolePattern::LetterThenDigits)
        .expect("invalid naming standard");

    let engine = PlanScanBuilder::new()
        .det_model("models/det.onnx")
        .rec_model("models/rec.onnx", "models/keys.txt")
        .build()
        .expect("failed to build engine");

    let start = Instant::now();
    let entities = engine
        .detect(&image, &bounds, &naming, &DetectionOptions::for_dpi(dpi))
        .expect("detection failed");
    log::debug!("detection took {:?}", start.elapsed());

    if entities.is_empty() {
        log::warn!("0 objects found; try rescanning the plan at a higher DPI");
        return;
    }
    for entity in &entities {
        println!(
            "{}\t{}\t{:.6}\t{:.6}",
            entity.category, entity.label, entity.lat, entity.lon
        );
    }
    log::info!("{} objects found", entities.len());
}
