//! # 转换处理器
//!
//! ## 设计思路
//!
//! 不以 PNG 签名开头的输入（JPEG、WebP 等）没有可扫描的块，
//! 统一解码后重新编码为 PNG，得到与扫描处理器相同形状的 `PngData`，载荷恒为空。
//!
//! ## 实现思路
//!
//! 1. 读入全部字节（受 `max_file_size` 限制）
//! 2. 文件签名明确不是图片时尽早拒绝
//! 3. `image` 通用解码，失败时用 `jpeg-decoder` 重试（兼容通用解码器拒绝的 JPEG 变体）
//! 4. 重新编码为 PNG 并拆分 header / body
//!
//! 解码最多执行一次，成功或失败的结果都会被缓存。

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};
use jpeg_decoder::PixelFormat;
use std::io::Read;

use super::{PngData, RawCard};
use crate::{CardConfig, CardError};

/// 非 PNG 输入的转换处理器。
pub struct ConverterProcessor {
    reader: Option<Box<dyn Read + Send>>,
    max_file_size: u64,
    decoded: Option<Result<PngData, CardError>>,
}

impl ConverterProcessor {
    pub(crate) fn new(reader: Box<dyn Read + Send>, config: &CardConfig) -> Self {
        Self {
            reader: Some(reader),
            max_file_size: config.max_file_size,
            decoded: None,
        }
    }

    /// 已经失败的处理器（例如文件无法打开、所有下载地址都失败）。
    pub(crate) fn failed(err: CardError) -> Self {
        Self {
            reader: None,
            max_file_size: 0,
            decoded: Some(Err(err)),
        }
    }

    /// 已缓存的错误；尚未解码时为 `None`。
    pub fn err(&self) -> Option<&CardError> {
        self.decoded.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    /// 触发解码并返回尺寸；失败时返回 `None`。
    pub fn image_size(&mut self) -> Option<(u32, u32)> {
        self.decode().ok().map(|png| (png.width(), png.height()))
    }

    pub fn get(&mut self) -> Result<RawCard, CardError> {
        let png = self.decode()?.clone();
        Ok(RawCard {
            png,
            ..RawCard::default()
        })
    }

    /// 提前释放读取源；已缓存的结果不受影响。
    pub fn close(&mut self) {
        self.reader = None;
    }

    fn decode(&mut self) -> Result<&PngData, CardError> {
        let max_file_size = self.max_file_size;
        let reader = &mut self.reader;
        let outcome = self
            .decoded
            .get_or_insert_with(|| convert(reader.take(), max_file_size));
        outcome.as_ref().map_err(Clone::clone)
    }
}

fn convert(reader: Option<Box<dyn Read + Send>>, max_file_size: u64) -> Result<PngData, CardError> {
    let mut reader = reader.ok_or_else(|| CardError::Stream("输入流已关闭".to_string()))?;

    let mut data = Vec::new();
    reader
        .by_ref()
        .take(max_file_size.saturating_add(1))
        .read_to_end(&mut data)?;
    drop(reader);

    if data.len() as u64 > max_file_size {
        return Err(CardError::ResourceLimit(format!(
            "图片过大：超过 {:.2} MB 限制",
            max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    if data.is_empty() {
        return Err(CardError::InvalidFormat("图片内容为空".to_string()));
    }

    if let Some(kind) = infer::get(&data) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(CardError::InvalidFormat(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }
        log::debug!("🔎 转换输入类型：{}", kind.mime_type());
    }

    let image = match image::load_from_memory(&data) {
        Ok(image) => image,
        Err(err) => {
            log::warn!("⚠️ 通用解码失败，尝试 jpeg-decoder 回退：{}", err);
            decode_jpeg_fallback(&data).map_err(|fallback| {
                CardError::Decode(format!("图片解码失败：{}；JPEG 回退解码失败：{}", err, fallback))
            })?
        }
    };

    let png = PngData::encode(&image)?;
    log::info!(
        "🔁 已转换为 PNG - 尺寸: {}x{} 输入: {} bytes 输出: {} bytes",
        png.width(),
        png.height(),
        data.len(),
        png.header.len() + png.body.len()
    );

    Ok(png)
}

/// 使用 jpeg-decoder 解码，按输出像素格式构建图像。
///
/// 覆盖通用解码器不支持的 JPEG 变体（无损 SOF3、12 位精度等）。
fn decode_jpeg_fallback(data: &[u8]) -> Result<DynamicImage, String> {
    let mut decoder = jpeg_decoder::Decoder::new(data);
    let pixels = decoder.decode().map_err(|e| e.to_string())?;
    let info = decoder.info().ok_or_else(|| "无法读取 JPEG 头信息".to_string())?;
    let (width, height) = (u32::from(info.width), u32::from(info.height));

    let image = match info.pixel_format {
        PixelFormat::L8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        PixelFormat::L16 => {
            // 16 位输出为大端序
            let samples = pixels
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, samples).map(DynamicImage::ImageLuma16)
        }
        PixelFormat::RGB24 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        PixelFormat::CMYK32 => RgbImage::from_raw(width, height, cmyk_to_rgb(&pixels)).map(DynamicImage::ImageRgb8),
    };

    image.ok_or_else(|| format!("JPEG 像素缓冲长度异常：{}x{} {:?}", width, height, info.pixel_format))
}

fn cmyk_to_rgb(pixels: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    for cmyk in pixels.chunks_exact(4) {
        let k = 255 - u16::from(cmyk[3]);
        for &channel in &cmyk[..3] {
            rgb.push(((255 - u16::from(channel)) * k / 255) as u8);
        }
    }
    rgb
}
