//! # 元数据取证（EXIF / JPEG 帧结构 / 缩略图）
//!
//! ## 设计思路
//!
//! 像素之外的证据同样重要：拍摄时间、GPS 坐标、相机字段、编码参数与嵌入缩略图。
//! 编辑软件常常只改主图而不更新 IFD1 中的缩略图，二者对照即可暴露修改痕迹。
//!
//! - EXIF 解析委托给 `kamadak-exif`（crate 名 `exif`），只对能携带 EXIF 的容器调用。
//! - JPEG 帧头（SOF 段）结构固定，直接扫描标记段读取，不需要完整解码。
//!
//! ## 实现思路
//!
//! 1. 读取 EXIF 时 `NotFound` 视为“没有 EXIF”，其余错误向上返回
//! 2. 主图 IFD 的字段以标签名为键，其余 IFD 加前缀区分
//! 3. GPS 度分秒换算为十进制度，南纬 / 西经取负
//! 4. 缩略图：读取 IFD1 的偏移 / 长度标签，并按配置上限重新生成 JPEG 缩略图

use std::collections::BTreeMap;
use std::io::Cursor;

use exif::{In, Tag, Value};
use image::ImageFormat;
use serde::Serialize;

use super::codec::{DecodeLimits, ImageCodec};
use super::compression::scaled_dimensions;
use super::ela::{jpeg_quality, serialize_base64};
use super::pixels::PixelBuffer;
use crate::config::{ForensicsConfig, ResampleFilter};
use crate::error::ForensicError;
use crate::hashing::{ContentHasher, DEFAULT_ALGORITHM};

pub const EMBEDDED_THUMBNAIL_NOTE: &str =
    "Thumbnail was generated from the primary image; the embedded one is only located by its EXIF tags";
pub const NO_THUMBNAIL_NOTE: &str = "This image does not contain an embedded thumbnail";
pub const UNREADABLE_EXIF_NOTE: &str =
    "EXIF could not be read, so a thumbnail was generated from the primary image";

/// 十进制度表示的 GPS 坐标。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// 图片元数据报告。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub filename: String,
    pub file_size: u64,
    /// 标签名 → 可读值，含 JPEG 帧头字段与全部 EXIF 字段。
    pub all_tags: BTreeMap<String, String>,
    pub gps_coordinates: Option<GpsCoordinates>,
    /// `DateTimeOriginal`，格式 `YYYY-MM-DDTHH:MM:SS`（EXIF 不带时区）。
    pub date_taken: Option<String>,
}

/// SOF 段中的一个颜色分量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JpegComponent {
    pub id: u8,
    pub name: &'static str,
    pub horizontal_sampling: u8,
    pub vertical_sampling: u8,
    pub quantization_table: u8,
}

impl JpegComponent {
    pub fn describe(&self) -> String {
        format!(
            "{} component: Quantization table {}, Sampling factors {} horiz/{} vert",
            self.name, self.quantization_table, self.horizontal_sampling, self.vertical_sampling
        )
    }
}

/// JPEG 帧头（第一个 SOF 段）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JpegFrame {
    pub compression_type: &'static str,
    pub data_precision: u8,
    pub image_height: u16,
    pub image_width: u16,
    pub number_of_components: u8,
    pub components: Vec<JpegComponent>,
}

impl JpegFrame {
    fn describe_into(&self, tags: &mut BTreeMap<String, String>) {
        tags.insert("Compression Type".to_string(), self.compression_type.to_string());
        tags.insert("Data Precision".to_string(), format!("{} bits", self.data_precision));
        tags.insert("Image Height".to_string(), format!("{} pixels", self.image_height));
        tags.insert("Image Width".to_string(), format!("{} pixels", self.image_width));
        tags.insert(
            "Number of Components".to_string(),
            self.number_of_components.to_string(),
        );
        for (index, component) in self.components.iter().enumerate() {
            tags.insert(format!("Component {}", index + 1), component.describe());
        }
    }
}

/// JPEG 结构报告；不是 JPEG 或没有 SOF 段时只有文件哈希。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JpegStructureReport {
    #[serde(flatten)]
    pub frame: Option<JpegFrame>,
    pub file_hash: String,
}

/// 从主图重新生成的 JPEG 缩略图。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedThumbnail {
    pub width: u32,
    pub height: u32,
    pub length: usize,
    #[serde(rename = "thumbnailBase64", serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
    pub hash: String,
}

/// 缩略图报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailReport {
    pub has_thumbnail: bool,
    pub thumbnail_offset_tag: Option<u32>,
    pub thumbnail_length_tag: Option<u32>,
    /// 偏移与长度都落在 EXIF 缓冲内时，嵌入缩略图字节的 SHA-256。
    pub embedded_thumbnail_hash: Option<String>,
    pub generated_thumbnail: Option<GeneratedThumbnail>,
    pub note: &'static str,
}

/// 缩略图生成参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailSettings {
    pub max_dimension: u32,
    pub quality: f32,
    pub filter: ResampleFilter,
}

impl From<&ForensicsConfig> for ThumbnailSettings {
    fn from(config: &ForensicsConfig) -> Self {
        Self {
            max_dimension: config.thumbnail_max_dimension,
            quality: config.thumbnail_quality,
            filter: config.thumbnail_resize_filter,
        }
    }
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self::from(&ForensicsConfig::default())
    }
}

/// 度分秒 → 十进制度。
pub fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

fn carries_exif(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Tiff | ImageFormat::Png | ImageFormat::WebP
    )
}

fn read_exif(bytes: &[u8]) -> Result<Option<exif::Exif>, ForensicError> {
    match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(ForensicError::Decode(format!("EXIF 解析失败：{}", e))),
    }
}

fn tag_key(field: &exif::Field) -> String {
    if field.ifd_num == In::PRIMARY {
        field.tag.to_string()
    } else if field.ifd_num == In::THUMBNAIL {
        format!("Thumbnail {}", field.tag)
    } else {
        format!("IFD{} {}", field.ifd_num.index(), field.tag)
    }
}

fn gps_axis(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative_ref: u8) -> Option<f64> {
    let degrees = match &exif.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(parts) if parts.len() >= 3 => {
            dms_to_degrees(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64())
        }
        _ => return None,
    };
    if !degrees.is_finite() {
        return None;
    }

    let negative = match exif.get_field(ref_tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(values)) => values
            .first()
            .and_then(|v| v.first())
            .is_some_and(|c| c.eq_ignore_ascii_case(&negative_ref)),
        _ => false,
    };

    Some(if negative { -degrees } else { degrees })
}

fn gps_coordinates(exif: &exif::Exif) -> Option<GpsCoordinates> {
    Some(GpsCoordinates {
        latitude: gps_axis(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?,
        longitude: gps_axis(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?,
    })
}

fn date_time_original(exif: &exif::Exif) -> Option<String> {
    let raw = match &exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?.value {
        Value::Ascii(values) => values.first()?,
        _ => return None,
    };
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        dt.year, dt.month, dt.day, dt.hour, dt.minute, dt.second
    ))
}

fn uint_field(exif: &exif::Exif, tag: Tag, ifd: In) -> Option<u32> {
    exif.get_field(tag, ifd).and_then(|f| f.value.get_uint(0))
}

/// IFD1 偏移相对 TIFF 头，正好是 `Exif::buf()` 的起点。
fn embedded_thumbnail(tiff: &[u8], offset: u32, length: u32) -> Option<&[u8]> {
    let start = offset as usize;
    let end = start.checked_add(length as usize)?;
    tiff.get(start..end).filter(|slice| !slice.is_empty())
}

fn sof_compression_type(marker: u8) -> Option<&'static str> {
    let kind = match marker {
        0xC0 => "Baseline",
        0xC1 => "Extended sequential, Huffman",
        0xC2 => "Progressive, Huffman",
        0xC3 => "Lossless, Huffman",
        0xC5 => "Differential sequential, Huffman",
        0xC6 => "Differential progressive, Huffman",
        0xC7 => "Differential lossless, Huffman",
        0xC9 => "Extended sequential, arithmetic",
        0xCA => "Progressive, arithmetic",
        0xCB => "Lossless, arithmetic",
        0xCD => "Differential sequential, arithmetic",
        0xCE => "Differential progressive, arithmetic",
        0xCF => "Differential lossless, arithmetic",
        _ => return None,
    };
    Some(kind)
}

fn component_name(id: u8) -> &'static str {
    match id {
        1 => "Y",
        2 => "Cb",
        3 => "Cr",
        4 => "I",
        5 => "Q",
        _ => "Unknown",
    }
}

fn read_u16_be(bytes: &[u8], pos: usize) -> Result<u16, ForensicError> {
    bytes
        .get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| ForensicError::Decode(format!("JPEG 数据在偏移 {} 处截断", pos)))
}

fn parse_sof(compression_type: &'static str, segment: &[u8]) -> Result<JpegFrame, ForensicError> {
    if segment.len() < 6 {
        return Err(ForensicError::Decode(format!("SOF 段过短：{} 字节", segment.len())));
    }
    let number_of_components = segment[5];
    let needed = 6 + 3 * number_of_components as usize;
    if segment.len() < needed {
        return Err(ForensicError::Decode(format!(
            "SOF 段声明 {} 个分量，但只有 {} 字节",
            number_of_components,
            segment.len()
        )));
    }

    let components = segment[6..needed]
        .chunks_exact(3)
        .map(|c| JpegComponent {
            id: c[0],
            name: component_name(c[0]),
            horizontal_sampling: c[1] >> 4,
            vertical_sampling: c[1] & 0x0F,
            quantization_table: c[2],
        })
        .collect();

    Ok(JpegFrame {
        compression_type,
        data_precision: segment[0],
        image_height: u16::from_be_bytes([segment[1], segment[2]]),
        image_width: u16::from_be_bytes([segment[3], segment[4]]),
        number_of_components,
        components,
    })
}

/// 扫描标记段，返回第一个 SOF 段描述的帧头。
///
/// 不以 SOI 开头时返回 `None`；SOF 出现前就遇到 SOS / EOI 同样返回 `None`。
/// 段长度越界视为数据损坏。
pub fn parse_jpeg_frame(bytes: &[u8]) -> Result<Option<JpegFrame>, ForensicError> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Ok(None);
    }

    let mut pos = 2;
    while pos + 1 < bytes.len() {
        if bytes[pos] != 0xFF {
            return Err(ForensicError::Decode(format!("偏移 {} 处缺少 JPEG 标记", pos)));
        }
        let marker = bytes[pos + 1];
        pos += 2;

        match marker {
            // 填充字节
            0xFF => {
                pos -= 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => continue,
            0xD9 | 0xDA => return Ok(None),
            _ => {}
        }

        let length = read_u16_be(bytes, pos)? as usize;
        if length < 2 || pos + length > bytes.len() {
            return Err(ForensicError::Decode(format!(
                "JPEG 段 0x{:02X} 长度越界：{}（剩余 {} 字节）",
                marker,
                length,
                bytes.len() - pos
            )));
        }

        if let Some(compression_type) = sof_compression_type(marker) {
            return parse_sof(compression_type, &bytes[pos + 2..pos + length]).map(Some);
        }
        pos += length;
    }

    Ok(None)
}

/// 提取全部元数据标签、GPS 坐标与原始拍摄时间。
pub fn extract_metadata(
    codec: &dyn ImageCodec,
    bytes: &[u8],
    filename: &str,
) -> Result<ImageMetadata, ForensicError> {
    let format = codec.sniff_format(bytes).ok_or_else(|| {
        ForensicError::UnsupportedFormat("元数据提取仅支持可识别的图片格式".to_string())
    })?;

    let mut all_tags = BTreeMap::new();
    if format == ImageFormat::Jpeg {
        if let Some(frame) = parse_jpeg_frame(bytes)? {
            frame.describe_into(&mut all_tags);
        }
    }

    let mut gps = None;
    let mut date_taken = None;
    if carries_exif(format) {
        if let Some(exif) = read_exif(bytes)? {
            for field in exif.fields() {
                all_tags.insert(tag_key(field), field.display_value().with_unit(&exif).to_string());
            }
            gps = gps_coordinates(&exif);
            date_taken = date_time_original(&exif);
        }
    }

    Ok(ImageMetadata {
        filename: filename.to_string(),
        file_size: bytes.len() as u64,
        all_tags,
        gps_coordinates: gps,
        date_taken,
    })
}

/// JPEG 帧头结构与整个文件的 SHA-256。
pub fn analyze_jpeg_structure(
    hasher: &dyn ContentHasher,
    bytes: &[u8],
) -> Result<JpegStructureReport, ForensicError> {
    Ok(JpegStructureReport {
        frame: parse_jpeg_frame(bytes)?,
        file_hash: hasher.hash_hex(bytes, DEFAULT_ALGORITHM)?,
    })
}

/// 按 `max_dimension` 等比缩小（不放大）并编码为 JPEG。
pub fn generate_thumbnail(
    codec: &dyn ImageCodec,
    hasher: &dyn ContentHasher,
    pixels: &PixelBuffer,
    settings: &ThumbnailSettings,
) -> Result<GeneratedThumbnail, ForensicError> {
    let (width, height) = scaled_dimensions(pixels.width(), pixels.height(), settings.max_dimension);
    let resized = codec.resize_exact(pixels, width, height, settings.filter)?;
    let data = codec.encode_jpeg(&resized, jpeg_quality(settings.quality))?;

    Ok(GeneratedThumbnail {
        width,
        height,
        length: data.len(),
        hash: hasher.hash_hex(&data, DEFAULT_ALGORITHM)?,
        data,
    })
}

/// 检查 EXIF 缩略图标签，并在有嵌入缩略图或 EXIF 不可读时生成对照缩略图。
pub fn analyze_thumbnail(
    codec: &dyn ImageCodec,
    hasher: &dyn ContentHasher,
    bytes: &[u8],
    settings: &ThumbnailSettings,
    limits: &DecodeLimits,
) -> Result<ThumbnailReport, ForensicError> {
    let pixels = codec.decode(bytes, limits)?;

    let exif = match codec.sniff_format(bytes) {
        Some(format) if carries_exif(format) => read_exif(bytes),
        _ => Ok(None),
    };

    let exif = match exif {
        Ok(exif) => exif,
        Err(err) => {
            log::warn!("⚠️ EXIF 读取失败，改为从主图生成缩略图：{}", err);
            return Ok(ThumbnailReport {
                has_thumbnail: false,
                thumbnail_offset_tag: None,
                thumbnail_length_tag: None,
                embedded_thumbnail_hash: None,
                generated_thumbnail: Some(generate_thumbnail(codec, hasher, &pixels, settings)?),
                note: UNREADABLE_EXIF_NOTE,
            });
        }
    };

    let tags = exif.as_ref().and_then(|exif| {
        let offset = uint_field(exif, Tag::JPEGInterchangeFormat, In::THUMBNAIL)?;
        let length = uint_field(exif, Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?;
        Some((exif, offset, length))
    });

    match tags {
        Some((exif, offset, length)) => {
            let embedded_thumbnail_hash = embedded_thumbnail(exif.buf(), offset, length)
                .map(|thumb| hasher.hash_hex(thumb, DEFAULT_ALGORITHM))
                .transpose()?;

            Ok(ThumbnailReport {
                has_thumbnail: true,
                thumbnail_offset_tag: Some(offset),
                thumbnail_length_tag: Some(length),
                embedded_thumbnail_hash,
                generated_thumbnail: Some(generate_thumbnail(codec, hasher, &pixels, settings)?),
                note: EMBEDDED_THUMBNAIL_NOTE,
            })
        }
        None => Ok(ThumbnailReport {
            has_thumbnail: false,
            thumbnail_offset_tag: None,
            thumbnail_length_tag: None,
            embedded_thumbnail_hash: None,
            generated_thumbnail: None,
            note: NO_THUMBNAIL_NOTE,
        }),
    }
}
