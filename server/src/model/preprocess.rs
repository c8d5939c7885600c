use image::DynamicImage;
use ndarray::Array4;

use crate::error::InferenceError;

pub const CROP_SIZE: u32 = 224;
const CROP_PCT: f32 = 0.875;

// ImageNet normalization constants
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize shortest edge to crop_size / crop_pct, center crop, normalize,
/// and lay out as an NCHW tensor.
pub fn to_input_tensor(img: &DynamicImage) -> Result<Array4<f32>, InferenceError> {
    let resize_size = (CROP_SIZE as f32 / CROP_PCT).ceil() as u32;
    let (w, h) = (img.width(), img.height());
    let (new_w, new_h) = if w < h {
        (
            resize_size,
            ((h as f32 / w as f32) * resize_size as f32).round() as u32,
        )
    } else {
        (
            ((w as f32 / h as f32) * resize_size as f32).round() as u32,
            resize_size,
        )
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    let crop_x = (new_w.saturating_sub(CROP_SIZE)) / 2;
    let crop_y = (new_h.saturating_sub(CROP_SIZE)) / 2;
    let rgb = resized
        .crop_imm(crop_x, crop_y, CROP_SIZE, CROP_SIZE)
        .to_rgb8();

    let hw = (CROP_SIZE * CROP_SIZE) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in rgb.into_raw().chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * hw + i] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    Array4::from_shape_vec((1, 3, CROP_SIZE as usize, CROP_SIZE as usize), data)
        .map_err(|e| InferenceError::Backend(format!("failed to shape input tensor: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_has_nchw_shape() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(640, 480));
        let tensor = to_input_tensor(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn undersized_images_still_produce_full_crop() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(16, 40));
        let tensor = to_input_tensor(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }
}
