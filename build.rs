//! Build script for the OmniSky agent
//!
//! Generates and embeds the Windows executable icon

fn main() {
    #[cfg(windows)]
    {
        use std::path::PathBuf;

        let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| ".".into()));
        let ico_path = out_dir.join("omnisky.ico");
        let rc_path = out_dir.join("omnisky.rc");

        match generate_icon(&ico_path) {
            Ok(()) => {
                let rc = format!(
                    "1 ICON \"{}\"\n",
                    ico_path.display().to_string().replace('\\', "\\\\")
                );
                if let Err(e) = std::fs::write(&rc_path, rc) {
                    println!("cargo:warning=Failed to write resource script: {}", e);
                } else {
                    embed_resource::compile(&rc_path, embed_resource::NONE);
                }
            }
            Err(e) => println!("cargo:warning=Failed to generate icon: {}", e),
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}

/// Write a multi-size ICO with PNG-compressed entries
#[cfg(windows)]
fn generate_icon(ico_path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    use image::ImageEncoder;
    use std::fs::File;
    use std::io::{BufWriter, Cursor, Write};

    let sizes: &[u32] = &[16, 32, 48, 256];

    let mut images: Vec<Vec<u8>> = Vec::new();
    for &size in sizes {
        let img = generate_icon_image(size);
        let mut png_data: Vec<u8> = Vec::new();
        {
            let mut cursor = Cursor::new(&mut png_data);
            let encoder = image::codecs::png::PngEncoder::new(&mut cursor);
            encoder.write_image(img.as_raw(), size, size, image::ExtendedColorType::Rgba8)?;
        }
        images.push(png_data);
    }

    let file = File::create(ico_path)?;
    let mut writer = BufWriter::new(file);

    // ICONDIR: reserved, type 1 (icon), image count
    writer.write_all(&[0, 0, 1, 0])?;
    writer.write_all(&(sizes.len() as u16).to_le_bytes())?;

    let mut offset = 6 + sizes.len() * 16;
    for (png, &size) in images.iter().zip(sizes) {
        // 0 means 256
        let dim = if size >= 256 { 0u8 } else { size as u8 };
        writer.write_all(&[dim, dim, 0, 0])?;
        writer.write_all(&[1, 0, 32, 0])?; // planes, bits per pixel
        writer.write_all(&(png.len() as u32).to_le_bytes())?;
        writer.write_all(&(offset as u32).to_le_bytes())?;
        offset += png.len();
    }

    for png in &images {
        writer.write_all(png)?;
    }

    writer.flush()?;
    Ok(())
}

/// Sky-blue disc with a white pause glyph
#[cfg(windows)]
fn generate_icon_image(size: u32) -> image::RgbaImage {
    use image::{Rgba, RgbaImage};

    let mut img = RgbaImage::new(size, size);
    let center = size as f32 / 2.0;
    let radius = center - 1.0;

    let bar_width = size as f32 * 0.12;
    let bar_height = size as f32 * 0.44;
    let gap = size as f32 * 0.08;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist >= radius + 1.0 {
                continue;
            }

            let t = dist / radius;
            let alpha = if dist < radius {
                255
            } else {
                ((radius + 1.0 - dist) * 255.0) as u8
            };
            let mut pixel = Rgba([
                (14.0 - t * 11.0) as u8,
                (165.0 - t * 60.0) as u8,
                (233.0 - t * 72.0) as u8,
                alpha,
            ]);

            let in_bar = dy.abs() <= bar_height / 2.0
                && dx.abs() >= gap / 2.0
                && dx.abs() <= gap / 2.0 + bar_width;
            if in_bar {
                pixel = Rgba([255, 255, 255, 255]);
            }

            img.put_pixel(x, y, pixel);
        }
    }

    img
}
