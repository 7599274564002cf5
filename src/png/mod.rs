//! # PNG 卡片模块（png）
//!
//! ## 设计思路
//!
//! 该模块将“来源探测 → 块扫描 / 格式转换 → 表示转换 → 写回 PNG”
//! 按职责拆分为多个子模块：
//!
//! - `layout`：签名、块头、关键字等二进制布局常量
//! - `scan_mode`：多个卡片块并存时的选择策略
//! - `scanner`：流式块扫描，剥离卡片块并重建 body
//! - `converter`：非 PNG 输入的解码与重新编码
//! - `processor`：签名探测与统一入口
//! - `fetch`：多地址顺序下载
//! - `container` / `card`：图片容器与三种卡片表示
//!
//! ## 新同事快速上手
//!
//! ```text
//! 文件 / 字节 / URL
//!    ↓
//! processor.rs（读取 33 字节前缀做签名探测）
//!    ├─ scanner.rs（PNG：逐块扫描，ScanMode 取舍）
//!    └─ converter.rs（其他格式：解码 → 重新编码为 PNG）
//!    ↓
//! RawCard ⇄ RawJsonCard ⇄ CharacterCard（card.rs）
//!    ↓
//! RawCard::write_png（header + 卡片块 + body）
//! ```

pub mod layout;

mod card;
mod container;
mod converter;
mod fetch;
mod processor;
mod scan_mode;
mod scanner;

pub use card::{CharacterCard, RawCard, RawJsonCard};
pub use container::PngData;
pub use converter::ConverterProcessor;
pub use fetch::CardFetcher;
pub use processor::Processor;
pub use scan_mode::{Criteria, ScanMode};
pub use scanner::ScanningProcessor;
