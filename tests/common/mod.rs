// 集成测试共用的 PNG 构造工具
#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

use card_png::png::layout::{FOOTER_SIZE, HEADER_SIZE};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 17) as u8, (y * 29) as u8, 90, 255])
    }));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("encode png fixture failed");
    buffer
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 200, 60])));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .expect("encode jpeg fixture failed");
    buffer
}

/// 完整的块字节（长度、类型、内容、CRC）。
pub fn chunk(type_code: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    let mut digest = crc.digest();
    digest.update(type_code);
    digest.update(content);

    let mut out = Vec::with_capacity(content.len() + 12);
    out.extend_from_slice(&(content.len() as u32).to_be_bytes());
    out.extend_from_slice(type_code);
    out.extend_from_slice(content);
    out.extend_from_slice(&digest.finalize().to_be_bytes());
    out
}

/// `keyword || base64(json)` 组成的 tEXt 卡片块。
pub fn card_chunk(keyword: &[u8], json: &str) -> Vec<u8> {
    let mut content = keyword.to_vec();
    content.extend_from_slice(general_purpose::STANDARD.encode(json).as_bytes());
    chunk(b"tEXt", &content)
}

/// 在 IHDR 之后插入若干块。
pub fn insert_after_header(png: &[u8], chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = png[..HEADER_SIZE].to_vec();
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out.extend_from_slice(&png[HEADER_SIZE..]);
    out
}

/// 在 IEND 之前插入若干块。
pub fn insert_before_footer(png: &[u8], chunks: &[Vec<u8>]) -> Vec<u8> {
    let split = png.len() - FOOTER_SIZE;
    let mut out = png[..split].to_vec();
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out.extend_from_slice(&png[split..]);
    out
}

pub fn sheet_json(spec: &str, version: &str, name: &str) -> String {
    serde_json::json!({
        "spec": spec,
        "spec_version": version,
        "data": { "name": name, "description": format!("{} 的描述", name) },
    })
    .to_string()
}
