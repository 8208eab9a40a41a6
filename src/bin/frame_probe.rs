use frameseek::{open, DecodedPicture, ExtractorConfig, RenderSurface};
use image::RgbImage;
use std::cell::RefCell;
use std::env;
use std::rc::Rc;

/// Keeps the full-size pixels of the last delivered picture.
#[derive(Default)]
struct CaptureSurface {
    last: Option<RgbImage>,
}

impl RenderSurface for CaptureSurface {
    fn deliver(&mut self, picture: &DecodedPicture) {
        self.last = picture.to_rgb_image();
    }
}

fn usage() {
    println!("Usage: frame_probe <file.mp4|url> [--at <seconds>] [--out <file.jpg>]");
    println!("Example: frame_probe clip.mp4 --at 2.5 --out frame.jpg");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    println!("🎞️  Frame Probe");
    println!("==============");

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        return;
    }
    let source = &args[1];
    let mut at = None;
    let mut out = None;
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("--at", Some(value)) => match value.parse::<f64>() {
                Ok(secs) => at = Some(secs),
                Err(_) => {
                    println!("❌ Invalid time: {}", value);
                    return;
                }
            },
            ("--out", Some(value)) => out = Some(value.clone()),
            _ => {
                usage();
                return;
            }
        }
    }

    match probe(source, at, out).await {
        Ok(_) => println!("\n✅ Probe completed successfully"),
        Err(e) => println!("\n❌ Probe failed: {}", e),
    }
}

async fn probe(
    source: &str,
    at: Option<f64>,
    out: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let surface = Rc::new(RefCell::new(CaptureSurface::default()));
    let mut extractor = open(source, ExtractorConfig::default(), Box::new(surface.clone())).await?;

    let track = extractor.track().cloned().ok_or("track not available")?;
    let descriptor = &track.descriptor;
    println!("📄 Source: {}", source);
    println!("🎬 Track {}: {}", descriptor.track_id, descriptor.codec_identifier);
    println!("📐 Size: {}x{}", descriptor.width, descriptor.height);
    println!("⏱️  Timescale: {}", descriptor.timescale);
    println!("⏳ Duration: {:.3}s", track.duration_secs);
    println!(
        "📦 Layout: {}",
        if track.fragmented { "fragmented" } else { "progressive" }
    );

    let count = extractor.index_to_end().await?;
    let timescale = descriptor.timescale.max(1) as f64;
    let key_frames: Vec<String> = extractor
        .index()
        .key_frame_times()
        .iter()
        .map(|pts| format!("{:.3}", *pts as f64 / timescale))
        .collect();
    println!("🔢 Samples: {}", count);
    println!("🔑 Key frames ({}): {}", key_frames.len(), key_frames.join(", "));

    if let Some(secs) = at {
        let Some(frame) = extractor.seek(Some(secs)).await? else {
            println!("⚠️  No picture at {:.3}s", secs);
            return Ok(());
        };
        let image = surface.borrow_mut().last.take().ok_or("picture had no pixels")?;
        let path = out.unwrap_or_else(|| format!("frame_{:.3}.jpg", frame.timestamp));
        image.save(&path)?;
        println!(
            "🖼️  Picture at {:.3}s ({}x{}) written to {}",
            frame.timestamp, frame.width, frame.height, path
        );
    }

    for line in extractor.diagnostics().lines() {
        println!("  {}", line);
    }
    extractor.close();
    Ok(())
}
