//! # 角色卡记录模块
//!
//! ## 设计思路
//!
//! PNG 链路只关心“修订号 → 关键字”的映射与 JSON 字节的往返，
//! 角色卡字段本身的语义不在这里解释。本模块提供最小的结构化记录：
//! - `Revision`：载荷格式代际（V2 / V3），`NONE` 表示没有载荷
//! - `Stamp`：修订号对应的 `spec` / `spec_version` 字符串
//! - `Sheet`：`{"spec", "spec_version", "data"}` 外壳，`data` 原样保留
//!
//! ## 实现思路
//!
//! 修订号使用可比较的新类型而不是封闭枚举：写入时需要表达“未知修订号”，
//! 以便回退到默认关键字。

mod sheet;

pub use sheet::Sheet;

use clap::ValueEnum;
use clap::builder::PossibleValue;

use crate::CardError;

/// 角色卡载荷的格式代际。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u8);

impl Revision {
    /// 没有载荷。
    pub const NONE: Self = Self(0);
    pub const V2: Self = Self(2);
    pub const V3: Self = Self(3);

    /// 该修订号对应的标记；未知修订号返回 `None`。
    pub fn stamp(self) -> Option<Stamp> {
        STAMPS.iter().copied().find(|stamp| stamp.revision == self)
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::NONE => f.write_str("none"),
            Self(value) => write!(f, "v{}", value),
        }
    }
}

impl std::str::FromStr for Revision {
    type Err = CardError;

    /// 接受 `v2` / `v3` / `2` / `3`（不区分大小写）。
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().trim_start_matches('v') {
            "2" => Ok(Self::V2),
            "3" => Ok(Self::V3),
            _ => Err(CardError::InvalidFormat(format!("未知修订号：{}（可选：v2 / v3）", value))),
        }
    }
}

impl ValueEnum for Revision {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::V2, Self::V3]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match *self {
            Self::V2 => Some(PossibleValue::new("v2").alias("2")),
            Self::V3 => Some(PossibleValue::new("v3").alias("3")),
            _ => None,
        }
    }
}

/// `spec` 字段取值。
pub const SPEC_V2: &str = "chara_card_v2";
pub const SPEC_V3: &str = "chara_card_v3";

/// `spec_version` 字段取值。
pub const VERSION_V2: &str = "2.0";
pub const VERSION_V3: &str = "3.0";

/// 修订号与 `spec` / `spec_version` 的对应关系。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub spec: &'static str,
    pub version: &'static str,
    pub revision: Revision,
}

pub const STAMPS: [Stamp; 2] = [
    Stamp {
        spec: SPEC_V2,
        version: VERSION_V2,
        revision: Revision::V2,
    },
    Stamp {
        spec: SPEC_V3,
        version: VERSION_V3,
        revision: Revision::V3,
    },
];

/// 默认标记（V2），未知修订号统一回退到这里。
pub const DEFAULT_STAMP: Stamp = STAMPS[0];
