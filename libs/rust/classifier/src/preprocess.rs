use image::imageops::FilterType;
use image::DynamicImage;
use tract_onnx::prelude::*;

use crate::error::ClassifierError;

// Channel statistics the resnet18 export was trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode an uploaded image and turn it into the model's input tensor.
/// Undecodable bytes fail here; nothing downstream ever sees them.
pub fn tensor_from_bytes(bytes: &[u8], width: u32, height: u32) -> Result<Tensor, ClassifierError> {
    let img = image::load_from_memory(bytes)?;
    Ok(tensor_from_image(&img, width, height))
}

/// Bilinear resize to the model's input size, then scale to [0,1] and
/// normalize per channel. Layout is NCHW with batch 1.
pub fn tensor_from_image(img: &DynamicImage, width: u32, height: u32) -> Tensor {
    let rgb = img.resize_exact(width, height, FilterType::Triangle).to_rgb8();
    let arr = tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            let v = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
            (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
        },
    );
    arr.into()
}
