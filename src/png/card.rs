//! # 卡片表示流水线
//!
//! ## 设计思路
//!
//! 同一张图片的三种表示，`PngData` 在它们之间原样传递：
//!
//! ```text
//! RawCard (base64 字节) ⇄ RawJsonCard (JSON 字节) ⇄ CharacterCard (Sheet)
//! ```
//!
//! 每一步遇到空输入都返回空结果而不是错误；只有非法 base64 / JSON 才会失败。
//!
//! ## 实现思路
//!
//! 写回 PNG 时，卡片块插在 header 与 body 之间；
//! 块内容边写边计算 CRC（类型 + 关键字 + 载荷，不含长度字段）。

use base64::{Engine as _, engine::general_purpose};
use crc::{CRC_32_ISO_HDLC, Crc, Digest};
use image::{DynamicImage, GrayImage};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::layout::{self, CHUNK_OVERHEAD, DEFAULT_KEYWORD, DEFAULT_REVISION, TEXT_CHUNK_TYPE};
use super::{PngData, Processor};
use crate::CardError;
use crate::character::{Revision, Sheet};

static PNG_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// base64 编码的卡片载荷。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCard {
    pub png: PngData,
    pub raw_chara_data: Vec<u8>,
    pub revision: Revision,
}

/// 已解码为 JSON 字节的卡片载荷。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawJsonCard {
    pub png: PngData,
    pub raw_json_data: Vec<u8>,
    pub revision: Revision,
}

/// 结构化卡片；`sheet` 为 `None` 表示没有载荷。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterCard {
    pub png: PngData,
    pub sheet: Option<Sheet>,
}

impl RawCard {
    /// 生成 `size × size` 的黑色占位卡片（无载荷）。
    pub fn placeholder(size: u32) -> Result<Self, CardError> {
        let image = DynamicImage::ImageLuma8(GrayImage::new(size, size));
        let png = PngData::encode(&image)?;
        Processor::from_bytes(png.to_vec()).first().get()
    }

    pub fn has_payload(&self) -> bool {
        !self.raw_chara_data.is_empty()
    }

    /// base64 解码。
    pub fn to_raw_json(&self) -> Result<RawJsonCard, CardError> {
        let mut raw_json_card = RawJsonCard {
            png: self.png.clone(),
            raw_json_data: Vec::new(),
            revision: self.revision,
        };

        if self.raw_chara_data.is_empty() {
            return Ok(raw_json_card);
        }

        raw_json_card.raw_json_data = general_purpose::STANDARD
            .decode(&self.raw_chara_data)
            .map_err(|e| CardError::Decode(format!("Base64 解码失败：{}", e)))?;

        Ok(raw_json_card)
    }

    /// base64 解码后再解析 JSON。
    pub fn decode(&self) -> Result<CharacterCard, CardError> {
        self.to_raw_json()?.to_character()
    }

    /// 写出完整 PNG：header、卡片块（有载荷时）、body。
    pub fn write_png<W: Write>(&self, w: &mut W) -> Result<(), CardError> {
        w.write_all(&self.png.header)?;
        self.write_chara_chunk(w)?;
        w.write_all(&self.png.body)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CardError> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        self.write_png(&mut buffer)?;
        Ok(buffer)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), CardError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| CardError::FileSystem(format!("无法创建文件 {}：{}", path.display(), e)))?;

        let mut writer = BufWriter::new(file);
        self.write_png(&mut writer)?;
        writer
            .flush()
            .map_err(|e| CardError::FileSystem(format!("写入文件 {} 失败：{}", path.display(), e)))
    }

    /// 写出后的 PNG 总长度。
    pub fn encoded_len(&self) -> usize {
        let chunk_len = if self.raw_chara_data.is_empty() {
            0
        } else {
            CHUNK_OVERHEAD + self.keyword().len() + self.raw_chara_data.len()
        };
        self.png.header.len() + chunk_len + self.png.body.len()
    }

    /// 当前修订号的关键字；未知修订号回退到 V2。
    fn keyword(&self) -> &'static [u8] {
        layout::keyword(self.revision).unwrap_or(DEFAULT_KEYWORD)
    }

    fn write_chara_chunk<W: Write>(&self, w: &mut W) -> Result<(), CardError> {
        if self.raw_chara_data.is_empty() {
            return Ok(());
        }

        if layout::keyword(self.revision).is_none() {
            log::warn!(
                "⚠️ 未知修订号 {}，回退为 {} 关键字",
                self.revision,
                DEFAULT_REVISION
            );
        }
        let keyword = self.keyword();

        let chunk_len = u32::try_from(keyword.len() + self.raw_chara_data.len()).map_err(|_| {
            CardError::ResourceLimit(format!("卡片载荷过大：{} 字节", self.raw_chara_data.len()))
        })?;
        w.write_all(&chunk_len.to_be_bytes())?;

        let mut crc_writer = CrcWriter::new(w);
        crc_writer.write_all(&TEXT_CHUNK_TYPE.to_be_bytes())?;
        crc_writer.write_all(keyword)?;
        crc_writer.write_all(&self.raw_chara_data)?;
        let crc = crc_writer.finalize();

        w.write_all(&crc.to_be_bytes())?;
        Ok(())
    }
}

impl RawJsonCard {
    /// 解析 JSON；没有数据时返回当前修订号的空白记录。
    pub fn to_character(&self) -> Result<CharacterCard, CardError> {
        if self.raw_json_data.is_empty() {
            return Ok(CharacterCard {
                png: self.png.clone(),
                sheet: Some(Sheet::default_for(self.revision)),
            });
        }

        let mut sheet = Sheet::from_bytes(&self.raw_json_data)?;
        // 以块关键字的修订号为准
        sheet.set_revision(self.revision);

        Ok(CharacterCard {
            png: self.png.clone(),
            sheet: Some(sheet),
        })
    }

    /// base64 编码。
    pub fn to_raw(&self) -> RawCard {
        let raw_chara_data = if self.raw_json_data.is_empty() {
            Vec::new()
        } else {
            general_purpose::STANDARD.encode(&self.raw_json_data).into_bytes()
        };

        RawCard {
            png: self.png.clone(),
            raw_chara_data,
            revision: self.revision,
        }
    }
}

impl CharacterCard {
    pub fn to_raw_json(&self) -> Result<RawJsonCard, CardError> {
        let Some(sheet) = &self.sheet else {
            return Ok(RawJsonCard {
                png: self.png.clone(),
                ..RawJsonCard::default()
            });
        };

        Ok(RawJsonCard {
            png: self.png.clone(),
            raw_json_data: sheet.to_bytes()?,
            revision: sheet.revision,
        })
    }

    /// JSON 编码后再 base64 编码。
    pub fn encode(&self) -> Result<RawCard, CardError> {
        Ok(self.to_raw_json()?.to_raw())
    }
}

/// 写入下游的同时累计 CRC。
struct CrcWriter<'w, W: Write> {
    inner: &'w mut W,
    digest: Digest<'static, u32>,
}

impl<'w, W: Write> CrcWriter<'w, W> {
    fn new(inner: &'w mut W) -> Self {
        Self {
            inner,
            digest: PNG_CRC.digest(),
        }
    }

    fn finalize(self) -> u32 {
        self.digest.finalize()
    }
}

impl<W: Write> Write for CrcWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.digest.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
