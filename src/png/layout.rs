//! PNG 二进制布局常量（所有多字节整数均为大端）。

use crate::character::Revision;

/// PNG 签名长度。
pub const SIGNATURE_SIZE: usize = 8;
/// 完整 IHDR 块长度：长度(4) + 类型(4) + 内容(13) + CRC(4)。
pub const IHDR_SIZE: usize = 25;
/// 签名 + IHDR，即 `PngData::header` 的固定长度。
pub const HEADER_SIZE: usize = SIGNATURE_SIZE + IHDR_SIZE;

pub const CHUNK_LENGTH_SIZE: usize = 4;
pub const CHUNK_TYPE_SIZE: usize = 4;
pub const CHUNK_CRC_SIZE: usize = 4;
/// 块除内容外的固定开销。
pub const CHUNK_OVERHEAD: usize = CHUNK_LENGTH_SIZE + CHUNK_TYPE_SIZE + CHUNK_CRC_SIZE;

/// IEND 块长度（空内容）。
pub const FOOTER_SIZE: usize = 12;

const WIDTH_OFFSET: usize = SIGNATURE_SIZE + CHUNK_LENGTH_SIZE + CHUNK_TYPE_SIZE;
const HEIGHT_OFFSET: usize = WIDTH_OFFSET + 4;

pub const PNG_SIGNATURE: [u8; SIGNATURE_SIZE] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// `tEXt`
pub const TEXT_CHUNK_TYPE: u32 = u32::from_be_bytes(*b"tEXt");
/// `IEND`
pub const IEND_CHUNK_TYPE: u32 = u32::from_be_bytes(*b"IEND");

/// `chara\0`
pub const CHARA_KEYWORD: &[u8] = b"chara\0";
/// `ccv3\0`
pub const CCV3_KEYWORD: &[u8] = b"ccv3\0";

/// 修订号 → 关键字。
pub const KEYWORDS: [(Revision, &[u8]); 2] =
    [(Revision::V2, CHARA_KEYWORD), (Revision::V3, CCV3_KEYWORD)];

/// 写入时未知修订号回退的修订号与关键字。
pub const DEFAULT_REVISION: Revision = Revision::V2;
pub const DEFAULT_KEYWORD: &[u8] = CHARA_KEYWORD;

pub fn keyword(revision: Revision) -> Option<&'static [u8]> {
    KEYWORDS
        .iter()
        .find(|(candidate, _)| *candidate == revision)
        .map(|(_, keyword)| *keyword)
}

pub fn keyword_len(revision: Revision) -> usize {
    keyword(revision).map(<[u8]>::len).unwrap_or(0)
}

/// 根据关键字前缀识别载荷修订号。
pub fn match_keyword(content: &[u8]) -> Option<Revision> {
    KEYWORDS
        .iter()
        .find(|(_, keyword)| content.starts_with(keyword))
        .map(|(revision, _)| *revision)
}

pub fn has_png_signature(bytes: &[u8]) -> bool {
    bytes.len() >= SIGNATURE_SIZE && bytes[..SIGNATURE_SIZE] == PNG_SIGNATURE
}

/// IHDR 中的宽度；前缀不足时返回 0。
pub fn width(header: &[u8]) -> u32 {
    read_u32(header, WIDTH_OFFSET).unwrap_or(0)
}

/// IHDR 中的高度；前缀不足时返回 0。
pub fn height(header: &[u8]) -> u32 {
    read_u32(header, HEIGHT_OFFSET).unwrap_or(0)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes(field.try_into().ok()?))
}
