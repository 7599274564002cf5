//! # 图片容器模块
//!
//! ## 设计思路
//!
//! `PngData` 把一张 PNG 拆成两段：固定长度的 `header`（签名 + IHDR）
//! 与其余所有块组成的 `body`（卡片块已剔除）。写回时卡片块插在两段之间。
//!
//! ## 实现思路
//!
//! - 两段都使用 `bytes::Bytes`，在 RawCard / RawJsonCard / CharacterCard 之间转换时只增加引用计数。
//! - 缩略图优先使用 `fast_image_resize`，失败时回退到 `image::resize_exact`。

use bytes::Bytes;
use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgba};
use std::io::Cursor;

use super::layout::{self, HEADER_SIZE};
use crate::CardError;

/// 拆分后的 PNG 数据。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PngData {
    pub header: Bytes,
    pub body: Bytes,
}

impl PngData {
    /// 拆分一张完整的 PNG。
    pub fn from_png_bytes(bytes: impl Into<Bytes>) -> Result<Self, CardError> {
        let mut bytes: Bytes = bytes.into();
        if bytes.len() < HEADER_SIZE {
            return Err(CardError::InvalidFormat(format!(
                "PNG 数据过短：{} 字节（至少 {} 字节）",
                bytes.len(),
                HEADER_SIZE
            )));
        }
        if !layout::has_png_signature(&bytes) {
            return Err(CardError::InvalidFormat("缺少 PNG 签名".to_string()));
        }

        let header = bytes.split_to(HEADER_SIZE);
        Ok(Self { header, body: bytes })
    }

    pub fn width(&self) -> u32 {
        layout::width(&self.header)
    }

    pub fn height(&self) -> u32 {
        layout::height(&self.header)
    }

    /// `header || body`，不含任何卡片块。
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.body.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out
    }

    /// 解码像素数据。
    pub fn image(&self) -> Result<DynamicImage, CardError> {
        image::load_from_memory_with_format(&self.to_vec(), ImageFormat::Png)
            .map_err(|e| CardError::Decode(format!("PNG 解码失败：{}", e)))
    }

    /// 生成缩略图：较长的一边缩放到 `size`，默认滤镜。
    pub fn thumbnail(&self, size: u32) -> Result<DynamicImage, CardError> {
        self.thumbnail_with_filter(size, FilterType::Triangle)
    }

    pub fn thumbnail_with_filter(&self, size: u32, filter: FilterType) -> Result<DynamicImage, CardError> {
        let source = self.image()?;
        resize_to_fit(source, size, filter)
    }

    /// 原地降采样并重新编码；卡片载荷不受影响（它不在 `PngData` 中）。
    pub fn scale_down(&mut self, size: u32, filter: FilterType) -> Result<(), CardError> {
        let resized = self.thumbnail_with_filter(size, filter)?;
        *self = Self::encode(&resized)?;
        Ok(())
    }

    /// 将任意图像编码为 PNG 并拆分。
    pub(crate) fn encode(image: &DynamicImage) -> Result<Self, CardError> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| CardError::Encode(format!("PNG 编码失败：{}", e)))?;
        Self::from_png_bytes(buffer)
    }
}

/// 按较长边缩放到 `size` 的正方形内。
fn resize_to_fit(image: DynamicImage, size: u32, filter: FilterType) -> Result<DynamicImage, CardError> {
    if size == 0 {
        return Err(CardError::InvalidFormat("缩略图尺寸必须大于 0".to_string()));
    }

    let (width, height) = image.dimensions();
    let (target_width, target_height) = if width > height {
        (size, scaled_side(height, size, width))
    } else {
        (scaled_side(width, size, height), size)
    };

    log::debug!(
        "🧩 缩放图片：{}x{} -> {}x{}（filter={:?}）",
        width,
        height,
        target_width,
        target_height,
        filter
    );

    match resize_with_fast_image_resize(&image, target_width, target_height, filter) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            Ok(image.resize_exact(target_width, target_height, filter))
        }
    }
}

fn scaled_side(side: u32, target: u32, longest: u32) -> u32 {
    if longest == 0 {
        return 1;
    }
    ((side as u64 * target as u64 / longest as u64) as u32).max(1)
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<DynamicImage, CardError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image = fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
        .map_err(|e| CardError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| CardError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| CardError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
