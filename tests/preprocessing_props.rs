use diagnostic_api::image_preprocessor::{preprocess_image, IMAGE_SIZE};
use image::{DynamicImage, GrayImage, Luma};
use proptest::prelude::*;
use std::io::Cursor;

fn encode(width: u32, height: u32, seed: u8, format: image::ImageFormat) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| {
        Luma([(x as u8).wrapping_mul(31) ^ (y as u8).wrapping_add(seed)])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn preprocessed_png_has_fixed_shape_and_unit_range(
        width in 1u32..400,
        height in 1u32..400,
        seed in any::<u8>(),
    ) {
        let bytes = encode(width, height, seed, image::ImageFormat::Png);
        let tensor = preprocess_image(&bytes, "image/png").unwrap();

        prop_assert_eq!(tensor.shape(), &[1, IMAGE_SIZE, IMAGE_SIZE, 1]);
        prop_assert!(tensor.view().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn preprocessing_is_deterministic(
        width in 1u32..200,
        height in 1u32..200,
        seed in any::<u8>(),
    ) {
        let bytes = encode(width, height, seed, image::ImageFormat::Bmp);
        let first = preprocess_image(&bytes, "image/bmp").unwrap();
        let second = preprocess_image(&bytes, "image/bmp").unwrap();

        prop_assert_eq!(first, second);
    }

    #[test]
    fn non_image_content_types_are_rejected(
        subtype in "[a-z]{1,12}",
        top in prop::sample::select(vec!["text", "application", "audio", "video", "multipart"]),
    ) {
        let content_type = format!("{}/{}", top, subtype);
        let bytes = encode(8, 8, 0, image::ImageFormat::Png);

        prop_assert!(preprocess_image(&bytes, &content_type).is_err());
    }
}
