// rudet-cli/src/main.rs
// ------------------------------------------------------------
// Single-image detection:  decode → preprocess → TractYolo →
// postprocess (NMS) → rescale → draw + report
// ------------------------------------------------------------

use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rudet_detect::{postprocess, scale_to_original, Detection, PostprocessConfig};
use rudet_model::{load_class_names, Network, TractYolo};
use rudet_preprocess::{load_image, Preprocessor};
use std::path::PathBuf;
use std::time::Instant;

/// Run a YOLO detection model over one image and report the boxes.
#[derive(Parser)]
#[command(name = "rudet")]
struct CliArgs {
    /// ONNX detection model
    #[arg(long)]
    model: PathBuf,

    /// Model input width in pixels
    #[arg(long)]
    width: u32,

    /// Model input height in pixels
    #[arg(long)]
    height: u32,

    /// Image to run detection on
    #[arg(long)]
    image: PathBuf,

    /// Minimum combined score for a candidate to survive filtering
    #[arg(long, default_value_t = 0.4)]
    score_thresh: f32,

    /// Maximum IoU two reported boxes may share
    #[arg(long, default_value_t = 0.5)]
    iou_thresh: f32,

    /// Class-name file, one name per line (coco.names format)
    #[arg(long)]
    names: Option<PathBuf>,

    /// Where to write the annotated image
    #[arg(long, default_value = "det.jpg")]
    output: PathBuf,
}

fn class_label(names: &[String], class: usize) -> String {
    names
        .get(class)
        .cloned()
        .unwrap_or_else(|| format!("class {class}"))
}

/// Draw hollow boxes over the source image.
fn draw_detections(image: &mut RgbImage, dets: &[Detection]) {
    for det in dets {
        let [left, top, right, bottom] = det.bbox;
        let rect = Rect::at(left as i32, top as i32).of_size(
            (right - left).max(1.0) as u32,
            (bottom - top).max(1.0) as u32,
        );
        draw_hollow_rect_mut(image, rect, Rgb([0, 255, 0]));
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let names = match &args.names {
        Some(path) => load_class_names(path)
            .with_context(|| format!("reading class names from {}", path.display()))?,
        None => Vec::new(),
    };

    let mut frame = load_image(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;
    let (orig_w, orig_h) = frame.dimensions();

    let model = TractYolo::new(&args.model, args.width, args.height)
        .with_context(|| format!("loading {}", args.model.display()))?;

    let start = Instant::now();

    let tensor = Preprocessor::new(args.width, args.height).run(&frame);
    let preds = model.forward(&tensor).context("inference failed")?;

    let cfg = PostprocessConfig {
        score_thresh: args.score_thresh,
        iou_thresh: args.iou_thresh,
    };
    let batches = postprocess(preds.view(), &cfg)?;
    // single-image invocation: the batch holds exactly one detection list
    let dets = batches.into_iter().next().unwrap_or_default();

    let dets = scale_to_original(
        &dets,
        orig_w as f32 / args.width as f32,
        orig_h as f32 / args.height as f32,
    );

    let elapsed = start.elapsed();
    println!("Got detections: {}", dets.len());
    for det in &dets {
        let [left, top, right, bottom] = det.bbox;
        println!(
            "{left:.1}\t{top:.1}\t{right:.1}\t{bottom:.1}\t{:.3}\t{}",
            det.score,
            class_label(&names, det.class),
        );
    }
    println!("Processed in {:.1} ms", elapsed.as_secs_f64() * 1e3);

    if !dets.is_empty() {
        draw_detections(&mut frame, &dets);
        frame
            .save(&args.output)
            .with_context(|| format!("writing {}", args.output.display()))?;
        println!("Annotated image written to {}", args.output.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_label_falls_back_to_the_id() {
        let names = vec!["person".to_string(), "bicycle".to_string()];
        assert_eq!(class_label(&names, 1), "bicycle");
        assert_eq!(class_label(&names, 7), "class 7");
        assert_eq!(class_label(&[], 0), "class 0");
    }

    #[test]
    fn draw_marks_the_box_outline() {
        let mut img = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let dets = vec![Detection {
            bbox: [2.0, 3.0, 10.0, 12.0],
            score: 0.9,
            class: 0,
        }];
        draw_detections(&mut img, &dets);
        assert_eq!(*img.get_pixel(2, 3), Rgb([0, 255, 0]));
        // interior stays untouched
        assert_eq!(*img.get_pixel(5, 7), Rgb([0, 0, 0]));
    }

    #[test]
    fn draw_handles_an_empty_list() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        draw_detections(&mut img, &[]);
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
