//! Render surfaces that receive delivered pictures.

use crate::decoder::DecodedPicture;
use base64::{engine::general_purpose, Engine as _};
use image::{ImageOutputFormat, RgbImage};
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;

/// Receives each delivered picture. The picture is released right after
/// `deliver` returns, so a surface that wants the pixels copies them.
pub trait RenderSurface {
    fn deliver(&mut self, picture: &DecodedPicture);
}

/// Lets a caller keep a handle on a surface it hands to the extractor.
impl<S: RenderSurface> RenderSurface for Rc<RefCell<S>> {
    fn deliver(&mut self, picture: &DecodedPicture) {
        self.borrow_mut().deliver(picture);
    }
}

/// Surface that ignores everything.
#[derive(Debug, Default)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn deliver(&mut self, _picture: &DecodedPicture) {}
}

/// Keeps the last delivered picture as a JPEG data URI, scaled to fit.
#[derive(Debug)]
pub struct DataUriSurface {
    max_width: u32,
    max_height: u32,
    last: Option<DataUriFrame>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataUriFrame {
    pub pts: i64,
    pub width: u32,
    pub height: u32,
    pub data_uri: String,
}

impl DataUriSurface {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            last: None,
        }
    }

    pub fn last(&self) -> Option<&DataUriFrame> {
        self.last.as_ref()
    }

    pub fn take_last(&mut self) -> Option<DataUriFrame> {
        self.last.take()
    }
}

impl RenderSurface for DataUriSurface {
    fn deliver(&mut self, picture: &DecodedPicture) {
        let Some(image) = picture.to_rgb_image() else {
            warn!("picture at {} has inconsistent pixel data", picture.pts);
            return;
        };
        let image = resize_image(image, self.max_width, self.max_height);
        match image_to_base64(&image) {
            Ok(data_uri) => {
                self.last = Some(DataUriFrame {
                    pts: picture.pts,
                    width: image.width(),
                    height: image.height(),
                    data_uri,
                })
            }
            Err(e) => warn!("failed to encode picture at {}: {}", picture.pts, e),
        }
    }
}

/// Resize image helper
pub(crate) fn resize_image(image: RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = (image.width(), image.height());

    if width <= max_width && height <= max_height {
        return image;
    }

    let width_ratio = max_width as f32 / width as f32;
    let height_ratio = max_height as f32 / height as f32;
    let ratio = width_ratio.min(height_ratio);

    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    image::imageops::resize(
        &image,
        new_width,
        new_height,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Encode as a JPEG data URI.
pub(crate) fn image_to_base64(image: &RgbImage) -> Result<String, image::ImageError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    image.write_to(&mut cursor, ImageOutputFormat::Jpeg(85))?;

    let base64_string = general_purpose::STANDARD.encode(&buffer);
    Ok(format!("data:image/jpeg;base64,{}", base64_string))
}
