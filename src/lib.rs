//! # card-png：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  来源：文件 / 字节 / 读取器 / URL（CardFetcher）          │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ 签名探测（33 字节前缀）
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  png::Processor                                          │
//! │   ├─ ScanningProcessor   逐块扫描 tEXt，ScanMode 取舍     │
//! │   └─ ConverterProcessor  非 PNG → 解码 → 重新编码        │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ RawCard
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  RawCard ⇄ RawJsonCard ⇄ CharacterCard(Sheet)            │
//! │  RawCard::write_png → header + 卡片块 + body             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `CardError` |
//! | [`config`] | 扫描、转换、下载与缩放配置 `CardConfig` |
//! | [`character`] | 修订号、`spec` 标记与角色卡外壳 `Sheet` |
//! | [`png`] | 块扫描、格式转换、卡片表示转换与写回 |

pub mod character;
pub mod config;
pub mod error;
pub mod png;

pub use config::CardConfig;
pub use error::CardError;
