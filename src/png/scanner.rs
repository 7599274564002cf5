//! # 扫描处理器
//!
//! ## 设计思路
//!
//! 输入流的前 33 字节（签名 + IHDR）已由入口读走并交给本处理器，
//! 这里逐块读取剩余数据：
//! - 非 `tEXt` 块：长度、类型、内容与 CRC 原样拷入 body，不校验 CRC
//! - `tEXt` 块：读入复用的暂存缓冲，按关键字前缀识别卡片载荷，交给 `ScanMode` 取舍
//! - 非深度扫描一旦持有非空载荷，停止解析，剩余字节整体拷贝
//!
//! ## 实现思路
//!
//! - 读取源在 `get()` 时从处理器中取出，扫描结束（成功或失败）即被释放。
//! - 暂存缓冲只 `clear()` 不收缩，多块流中避免反复分配。
//! - 恰好在块边界结束视为正常结束；块头或块内容的任何截断都是致命错误。

use bytes::Bytes;
use std::io::{self, Read};
use std::time::Instant;

use super::layout::{self, CHUNK_CRC_SIZE, TEXT_CHUNK_TYPE};
use super::{PngData, RawCard, ScanMode};
use crate::{CardConfig, CardError};

/// 每块循环开始时读取的块头。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChunkDescriptor {
    length: u32,
    type_code: u32,
}

impl ChunkDescriptor {
    fn type_name(&self) -> String {
        String::from_utf8_lossy(&self.type_code.to_be_bytes()).into_owned()
    }
}

/// 以 PNG 签名开头的输入流的扫描处理器。
pub struct ScanningProcessor {
    header: Bytes,
    reader: Option<Box<dyn Read + Send>>,
    scan_mode: ScanMode,
    body_buffer_capacity: usize,
    preserve_foreign_text_chunks: bool,
    err: Option<CardError>,
}

impl ScanningProcessor {
    pub(crate) fn new(header: Bytes, reader: Box<dyn Read + Send>, config: &CardConfig) -> Self {
        Self {
            header,
            reader: Some(reader),
            scan_mode: config.scan_mode,
            body_buffer_capacity: config.body_buffer_capacity,
            preserve_foreign_text_chunks: config.preserve_foreign_text_chunks,
            err: None,
        }
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.scan_mode
    }

    pub fn set_scan_mode(&mut self, scan_mode: ScanMode) {
        self.scan_mode = scan_mode;
    }

    /// 最近一次 `get()` 的错误。
    pub fn err(&self) -> Option<&CardError> {
        self.err.as_ref()
    }

    pub fn image_size(&self) -> (u32, u32) {
        (layout::width(&self.header), layout::height(&self.header))
    }

    /// 扫描整个输入流并返回原始卡片。
    ///
    /// 读取源只能被消费一次，再次调用返回 `CardError::Stream`。
    pub fn get(&mut self) -> Result<RawCard, CardError> {
        let result = match self.reader.take() {
            Some(reader) => self.scan(reader),
            None => Err(CardError::Stream("输入流已被消费或已关闭".to_string())),
        };

        if let Err(err) = &result {
            self.err = Some(err.clone());
        }
        result
    }

    /// 提前释放读取源。
    pub fn close(&mut self) {
        self.reader = None;
    }

    fn scan(&self, mut reader: Box<dyn Read + Send>) -> Result<RawCard, CardError> {
        let started = Instant::now();
        let mut body = Vec::with_capacity(self.body_buffer_capacity);
        let mut chunk_buffer = Vec::new();
        let mut card = RawCard {
            png: PngData {
                header: self.header.clone(),
                body: Bytes::new(),
            },
            ..RawCard::default()
        };
        let mut chunk_count = 0usize;

        while let Some(chunk) = read_chunk_descriptor(&mut reader)? {
            chunk_count += 1;

            if chunk.type_code != TEXT_CHUNK_TYPE {
                copy_chunk(&mut reader, &chunk, &mut body)?;
                continue;
            }

            let crc = read_text_chunk(&mut reader, &chunk, &mut chunk_buffer)?;

            let Some(revision) = layout::match_keyword(&chunk_buffer) else {
                if self.preserve_foreign_text_chunks {
                    append_chunk(&mut body, &chunk, &chunk_buffer, crc);
                } else {
                    log::debug!("🗑️ 丢弃非卡片 tEXt 块 - {} 字节", chunk.length);
                }
                continue;
            };

            if self.scan_mode.criteria.accepts(&card, &chunk_buffer, revision) {
                card.revision = revision;
                card.raw_chara_data = chunk_buffer[layout::keyword_len(revision)..].to_vec();
            }

            if !self.scan_mode.deep_scan && !card.raw_chara_data.is_empty() {
                let tail = io::copy(&mut reader, &mut body)?;
                log::debug!("⏩ 已命中卡片块，剩余 {} 字节直接拷贝", tail);
                break;
            }
        }

        card.png.body = Bytes::from(body);

        log::debug!(
            "✅ 扫描完成 - 策略: {} 块数: {} 修订号: {} 载荷: {} 字节 耗时: {:?}",
            self.scan_mode.as_str(),
            chunk_count,
            card.revision,
            card.raw_chara_data.len(),
            started.elapsed()
        );

        Ok(card)
    }
}

/// 读取块头；恰好在块边界遇到流结束时返回 `None`。
fn read_chunk_descriptor<R: Read>(reader: &mut R) -> Result<Option<ChunkDescriptor>, CardError> {
    let mut length = [0u8; 4];
    if !read_exact_or_eof(reader, &mut length)? {
        return Ok(None);
    }

    let mut type_code = [0u8; 4];
    reader
        .read_exact(&mut type_code)
        .map_err(|e| CardError::Stream(format!("读取块类型失败：{}", e)))?;

    Ok(Some(ChunkDescriptor {
        length: u32::from_be_bytes(length),
        type_code: u32::from_be_bytes(type_code),
    }))
}

/// 读满 `buf`；一个字节都没有读到时返回 `Ok(false)`，读到一部分则视为截断。
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, CardError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(CardError::Stream(format!(
                    "块长度字段被截断：只读到 {}/{} 字节",
                    filled,
                    buf.len()
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// 将非 `tEXt` 块原样拷入 body。
fn copy_chunk<R: Read>(reader: &mut R, chunk: &ChunkDescriptor, body: &mut Vec<u8>) -> Result<(), CardError> {
    body.extend_from_slice(&chunk.length.to_be_bytes());
    body.extend_from_slice(&chunk.type_code.to_be_bytes());

    let expected = u64::from(chunk.length) + CHUNK_CRC_SIZE as u64;
    let copied = io::copy(&mut reader.by_ref().take(expected), body)?;
    if copied != expected {
        return Err(CardError::Stream(format!(
            "{} 块被截断：声明 {} 字节，实际 {} 字节",
            chunk.type_name(),
            expected,
            copied
        )));
    }

    Ok(())
}

/// 读取 `tEXt` 块内容到暂存缓冲，并返回未校验的 CRC 字节。
fn read_text_chunk<R: Read>(
    reader: &mut R,
    chunk: &ChunkDescriptor,
    buffer: &mut Vec<u8>,
) -> Result<[u8; CHUNK_CRC_SIZE], CardError> {
    buffer.clear();

    let expected = u64::from(chunk.length);
    let read = reader.by_ref().take(expected).read_to_end(buffer)?;
    if read as u64 != expected {
        return Err(CardError::Stream(format!(
            "tEXt 块被截断：声明 {} 字节，实际 {} 字节",
            expected, read
        )));
    }

    let mut crc = [0u8; CHUNK_CRC_SIZE];
    reader
        .read_exact(&mut crc)
        .map_err(|e| CardError::Stream(format!("读取 tEXt 块 CRC 失败：{}", e)))?;

    Ok(crc)
}

fn append_chunk(body: &mut Vec<u8>, chunk: &ChunkDescriptor, content: &[u8], crc: [u8; CHUNK_CRC_SIZE]) {
    body.extend_from_slice(&chunk.length.to_be_bytes());
    body.extend_from_slice(&chunk.type_code.to_be_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(&crc);
}
