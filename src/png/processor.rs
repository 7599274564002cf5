//! # 入口选择模块
//!
//! ## 设计思路
//!
//! 所有来源（读取器 / 字节 / 文件 / URL）先读取 33 字节前缀做签名探测：
//! - 以 PNG 签名开头且前缀完整：交给扫描处理器
//! - 其他情况：前缀与剩余数据拼回一条流，交给转换处理器
//!
//! 两种处理器是封闭集合，用枚举表达，对外暴露同一组操作。

use bytes::Bytes;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::Path;

use super::layout::{self, HEADER_SIZE};
use super::{CardFetcher, ConverterProcessor, RawCard, ScanMode, ScanningProcessor};
use crate::{CardConfig, CardError};

/// 卡片处理器。
pub enum Processor {
    Scanning(ScanningProcessor),
    Converter(ConverterProcessor),
}

impl Processor {
    /// 从任意读取器创建处理器，使用默认配置。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use card_png::png::Processor;
    ///
    /// let file = std::fs::File::open("card.png")?;
    /// let card = Processor::from_image(file).last_version().get()?;
    /// println!("revision = {}", card.revision);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_image<R: Read + Send + 'static>(reader: R) -> Self {
        Self::from_image_with_config(reader, &CardConfig::default())
    }

    pub fn from_image_with_config<R: Read + Send + 'static>(mut reader: R, config: &CardConfig) -> Self {
        let mut header = vec![0u8; HEADER_SIZE];
        let filled = match read_prefix(&mut reader, &mut header) {
            Ok(filled) => filled,
            Err(err) => return Processor::Converter(ConverterProcessor::failed(err.into())),
        };
        header.truncate(filled);

        if filled < HEADER_SIZE || !layout::has_png_signature(&header) {
            log::debug!("🔀 输入不是完整 PNG（前缀 {} 字节），使用转换处理器", filled);
            let replay = Cursor::new(header).chain(reader);
            return Processor::Converter(ConverterProcessor::new(Box::new(replay), config));
        }

        Processor::Scanning(ScanningProcessor::new(Bytes::from(header), Box::new(reader), config))
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::from_bytes_with_config(data, &CardConfig::default())
    }

    pub fn from_bytes_with_config(data: impl Into<Vec<u8>>, config: &CardConfig) -> Self {
        Self::from_image_with_config(Cursor::new(data.into()), config)
    }

    /// 打开失败时返回一个携带 `FileSystem` 错误的处理器。
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::from_file_with_config(path, &CardConfig::default())
    }

    pub fn from_file_with_config(path: impl AsRef<Path>, config: &CardConfig) -> Self {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::from_image_with_config(file, config),
            Err(e) => Processor::Converter(ConverterProcessor::failed(CardError::FileSystem(format!(
                "无法打开文件 {}：{}",
                path.display(),
                e
            )))),
        }
    }

    /// 依次尝试各个 URL，使用第一个成功的响应体。
    ///
    /// 全部失败时返回携带最后一个错误的处理器。
    pub fn from_url<S: AsRef<str>>(fetcher: &CardFetcher, urls: &[S]) -> Self {
        Self::from_url_with_config(fetcher, urls, &CardConfig::default())
    }

    pub fn from_url_with_config<S: AsRef<str>>(fetcher: &CardFetcher, urls: &[S], config: &CardConfig) -> Self {
        match fetcher.fetch(urls) {
            Ok(response) => Self::from_image_with_config(response, config),
            Err(err) => Processor::Converter(ConverterProcessor::failed(err)),
        }
    }

    /// 设置扫描策略；转换处理器忽略该设置。
    pub fn scan_mode(mut self, scan_mode: ScanMode) -> Self {
        if let Processor::Scanning(scanner) = &mut self {
            scanner.set_scan_mode(scan_mode);
        }
        self
    }

    pub fn first(self) -> Self {
        self.scan_mode(ScanMode::FIRST)
    }

    pub fn last_version(self) -> Self {
        self.scan_mode(ScanMode::LAST_VERSION)
    }

    pub fn last_longest(self) -> Self {
        self.scan_mode(ScanMode::LAST_LONGEST)
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, Processor::Scanning(_))
    }

    pub fn err(&self) -> Option<&CardError> {
        match self {
            Processor::Scanning(scanner) => scanner.err(),
            Processor::Converter(converter) => converter.err(),
        }
    }

    /// 图片宽高；转换处理器会因此触发解码，失败时返回 `None`。
    pub fn image_size(&mut self) -> Option<(u32, u32)> {
        match self {
            Processor::Scanning(scanner) => Some(scanner.image_size()),
            Processor::Converter(converter) => converter.image_size(),
        }
    }

    pub fn get(&mut self) -> Result<RawCard, CardError> {
        match self {
            Processor::Scanning(scanner) => scanner.get(),
            Processor::Converter(converter) => converter.get(),
        }
    }

    pub fn close(&mut self) {
        match self {
            Processor::Scanning(scanner) => scanner.close(),
            Processor::Converter(converter) => converter.close(),
        }
    }
}

/// 尽量读满 `buf`，返回实际读到的字节数（流提前结束时小于 `buf.len()`）。
fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    /// 每次最多返回一个字节，模拟网络流的零碎读取。
    struct TrickleReader(Cursor<Vec<u8>>);

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let limit = buf.len().min(1);
            self.0.read(&mut buf[..limit])
        }
    }

    fn placeholder_bytes() -> Vec<u8> {
        RawCard::placeholder(2).unwrap().to_bytes().unwrap()
    }

    #[test]
    fn png_signature_selects_scanner() {
        assert!(Processor::from_bytes(placeholder_bytes()).is_scanning());
    }

    #[test]
    fn short_or_foreign_input_selects_converter() {
        assert!(!Processor::from_bytes(vec![0x89, 0x50, 0x4E]).is_scanning());
        assert!(!Processor::from_bytes(vec![0u8; 100]).is_scanning());
        assert!(!Processor::from_bytes(Vec::new()).is_scanning());
    }

    #[test]
    fn prefix_is_replayed_into_converter() {
        let mut processor = Processor::from_bytes(vec![0xFF, 0xD8]);
        // 两个字节的 JPEG 起始标记无法解码，但错误必须来自解码而不是读取
        assert!(matches!(processor.get(), Err(CardError::Decode(_))));
    }

    #[test]
    fn read_error_while_reading_prefix_is_reported() {
        let mut processor = Processor::from_image(FailingReader);
        assert!(matches!(processor.get(), Err(CardError::Stream(_))));
        assert!(processor.err().is_some());
    }

    #[test]
    fn trickling_reader_still_fills_full_prefix() {
        let bytes = placeholder_bytes();
        let mut processor = Processor::from_image(TrickleReader(Cursor::new(bytes.clone())));
        assert!(processor.is_scanning());
        assert_eq!(processor.image_size(), Some((2, 2)));
        assert_eq!(processor.get().unwrap().to_bytes().unwrap(), bytes);
    }

    #[test]
    fn missing_file_reports_file_system_error() {
        let mut processor = Processor::from_file("/definitely/not/here/card.png");
        assert!(matches!(processor.err(), Some(CardError::FileSystem(_))));
        assert!(matches!(processor.get(), Err(CardError::FileSystem(_))));
        assert_eq!(processor.image_size(), None);
    }

    #[test]
    fn scan_mode_is_ignored_by_converter() {
        let processor = Processor::from_bytes(vec![1, 2, 3]).last_longest();
        assert!(!processor.is_scanning());
    }

    #[test]
    fn closed_processor_cannot_be_read() {
        let mut processor = Processor::from_bytes(placeholder_bytes());
        processor.close();
        assert!(matches!(processor.get(), Err(CardError::Stream(_))));
    }
}
