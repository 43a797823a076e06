// End-to-end checks of the image analyses, using images synthesised in memory
use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};

use forensic_lens::image_forensics::{
    CompressionReport, CompressionSignature, DecodeLimits, ImageCodec, JpegFrame, PixelBuffer,
    RasterCodec,
};
use forensic_lens::{ForensicError, ForensicsConfig, ForensicsEngine};

fn engine() -> ForensicsEngine {
    ForensicsEngine::new(ForensicsConfig::default()).expect("engine init failed")
}

fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode failed");
    bytes
}

fn gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn decode(bytes: &[u8]) -> PixelBuffer {
    RasterCodec
        .decode(bytes, &DecodeLimits::default())
        .expect("decode failed")
}

#[test]
fn test_noise_filter_keeps_border_pixels() {
    let img = gradient(20, 12);
    let png = encode(&img, ImageFormat::Png);

    let out = decode(&engine().apply_noise_filter(&png).expect("noise filter failed"));
    assert_eq!(out.dimensions(), (20, 12));
    for x in 0..20 {
        assert_eq!(out.pixel(x, 0), img.get_pixel(x, 0).0);
        assert_eq!(out.pixel(x, 11), img.get_pixel(x, 11).0);
    }
}

#[test]
fn test_invert_filter_twice_restores_png() {
    let engine = engine();
    let png = encode(&gradient(9, 7), ImageFormat::Png);

    let once = engine.apply_color_filter(&png, "invert").expect("invert failed");
    let twice = engine.apply_color_filter(&once, "invert").expect("invert failed");
    assert_eq!(decode(&twice), decode(&png));
}

#[test]
fn test_block_patterns_on_solid_image() {
    let img: RgbImage = ImageBuffer::from_pixel(32, 24, Rgb([10, 200, 90]));
    let report = engine()
        .detect_patterns(&encode(&img, ImageFormat::Png))
        .expect("detect failed");

    assert_eq!(report.total_unique_patterns, 1);
    assert_eq!(report.total_blocks, 12);
    assert_eq!(report.potential_copy_paste_regions[0].count, 12);
}

#[test]
fn test_copy_pasted_block_is_reported() {
    let mut img = gradient(64, 64);
    // 把左上角 8x8 块复制到右下角
    for y in 0..8 {
        for x in 0..8 {
            let p = *img.get_pixel(x, y);
            img.put_pixel(56 + x, 56 + y, p);
        }
    }
    let report = engine()
        .detect_patterns(&encode(&img, ImageFormat::Png))
        .expect("detect failed");

    assert!(report.repeated_patterns_found);
    assert!(report.potential_copy_paste_regions.iter().all(|r| r.count >= 2));
}

#[test]
fn test_ela_on_jpeg() {
    let jpeg = encode(&gradient(40, 30), ImageFormat::Jpeg);
    let result = engine().perform_ela(&jpeg, Some(0.95)).expect("ela failed");

    assert_eq!(decode(&result.difference_image).dimensions(), (40, 30));
    assert_eq!(result.original_hash.len(), 64);
    assert_eq!(result.resaved_hash.len(), 64);
    assert_ne!(result.original_hash, result.resaved_hash);
}

#[test]
fn test_ela_rejects_png() {
    let png = encode(&gradient(16, 16), ImageFormat::Png);

    assert!(matches!(
        engine().perform_ela(&png, Some(0.9)),
        Err(ForensicError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_compression_history_on_solid_jpeg() {
    let img: RgbImage = ImageBuffer::from_pixel(128, 64, Rgb([90, 90, 90]));
    let report = engine()
        .analyze_compression_history(&encode(&img, ImageFormat::Jpeg))
        .expect("analysis failed");

    match report {
        CompressionReport::Analyzed(analysis) => {
            assert_eq!(analysis.estimated_compression_cycles, 3);
            assert!(analysis.zero_ratio > 0.95);
            assert_eq!(analysis.compression_signature, CompressionSignature::NoDistinctive);
            assert_eq!(analysis.histogram.iter().sum::<u32>(), 64);
        }
        other => panic!("unexpected report: {:?}", other),
    }
}

#[test]
fn test_compression_history_explains_non_jpeg() {
    let png = encode(&gradient(16, 16), ImageFormat::Png);
    let report = engine()
        .analyze_compression_history(&png)
        .expect("analysis failed");

    assert!(matches!(report, CompressionReport::NotApplicable { .. }));
}

#[test]
fn test_decode_failure_is_propagated() {
    assert!(matches!(
        engine().detect_patterns(b"\x89PNG\r\n\x1a\ntruncated"),
        Err(ForensicError::Decode(_))
    ));
}

#[test]
fn test_metadata_of_plain_jpeg() {
    let jpeg = encode(&gradient(48, 32), ImageFormat::Jpeg);
    let metadata = engine()
        .extract_metadata(&jpeg, "scan.jpg")
        .expect("metadata failed");

    assert_eq!(metadata.filename, "scan.jpg");
    assert_eq!(metadata.all_tags.get("Compression Type").map(String::as_str), Some("Baseline"));
    assert!(metadata.gps_coordinates.is_none());

    let json = serde_json::to_value(&metadata).expect("serialize failed");
    assert_eq!(json["fileSize"], jpeg.len() as u64);
    assert!(json["allTags"].is_object());
}

#[test]
fn test_jpeg_structure_reports_frame_header() {
    let jpeg = encode(&gradient(48, 32), ImageFormat::Jpeg);
    let report = engine()
        .analyze_jpeg_structure(&jpeg)
        .expect("analysis failed");

    let frame: JpegFrame = report.frame.expect("frame missing");
    assert_eq!((frame.image_width, frame.image_height), (48, 32));
    assert_eq!(frame.data_precision, 8);
    assert_eq!(report.file_hash.len(), 64);
}

#[test]
fn test_thumbnail_of_jpeg_without_exif() {
    let jpeg = encode(&gradient(300, 200), ImageFormat::Jpeg);
    let report = engine().analyze_thumbnail(&jpeg).expect("thumbnail failed");

    assert!(!report.has_thumbnail);
    assert!(report.thumbnail_offset_tag.is_none());
    let json = serde_json::to_value(&report).expect("serialize failed");
    assert_eq!(json["hasThumbnail"], false);
}

#[test]
fn test_metadata_rejects_non_image() {
    assert!(matches!(
        engine().extract_metadata(b"just some text", "notes.txt"),
        Err(ForensicError::UnsupportedFormat(_))
    ));
}
