//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `CardConfig`，保证运行时行为可观测、可调整、可测试。
//! 处理器、下载器与缩放逻辑都只读取配置快照，不持有全局状态。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置。
//! - 扫描策略的字符串解析放在 `ScanMode` 自身（见 `png::scan_mode`）。

use image::imageops::FilterType;

use crate::png::ScanMode;

/// 卡片处理配置。
///
/// 字段覆盖了扫描、转换、下载与缩放四个阶段。
#[derive(Debug, Clone)]
pub struct CardConfig {
    /// 新建扫描处理器时使用的块选择策略。
    pub scan_mode: ScanMode,
    /// Body 累积缓冲的初始容量（字节）。
    pub body_buffer_capacity: usize,
    /// 是否保留关键字不匹配的 `tEXt` 块（默认丢弃）。
    pub preserve_foreign_text_chunks: bool,
    /// 转换处理器一次读入的最大体积（字节）。
    pub max_file_size: u64,
    /// 网络下载超时时间（秒）。
    pub download_timeout: u64,
    /// 建立连接超时时间（秒）。
    pub connect_timeout: u64,
    /// 最大重定向次数。
    pub max_redirects: usize,
    /// 缩略图与降采样使用的滤镜。
    pub resize_filter: FilterType,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            scan_mode: ScanMode::default(),
            body_buffer_capacity: 32 * 1024,
            preserve_foreign_text_chunks: false,
            max_file_size: 50 * 1024 * 1024,
            download_timeout: 30,
            connect_timeout: 8,
            max_redirects: 5,
            resize_filter: FilterType::Triangle,
        }
    }
}

impl CardConfig {
    /// 以指定扫描策略派生一份配置。
    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }
}
