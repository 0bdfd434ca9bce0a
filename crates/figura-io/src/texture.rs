use crate::{LoadError, Result};

/// Decoded RGBA8 image, rows top to bottom.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureAsset {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_texture(bytes: &[u8], url: &str) -> Result<TextureAsset> {
    if image::guess_format(bytes).is_err() {
        return Err(LoadError::UnsupportedFormat {
            url: url.to_string(),
        });
    }
    let image = image::load_from_memory(bytes)
        .map_err(|err| LoadError::parse(url, err))?
        .to_rgba8();
    Ok(TextureAsset {
        url: url.to_string(),
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn decodes_png_to_rgba() -> anyhow::Result<()> {
        let mut bytes = Vec::new();
        RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        let texture = decode_texture(&bytes, "sky.png")?;
        assert_eq!((texture.width, texture.height), (3, 2));
        assert_eq!(texture.rgba.len(), 24);
        assert_eq!(&texture.rgba[..4], &[10, 20, 30, 255]);
        Ok(())
    }

    #[test]
    fn rejects_unknown_bytes() {
        let err = decode_texture(b"not an image", "x.bin");
        assert!(matches!(err, Err(LoadError::UnsupportedFormat { .. })));
    }
}
