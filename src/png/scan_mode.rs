//! # 块选择策略
//!
//! 一张 PNG 里可能有多个携带卡片的 `tEXt` 块，`ScanMode` 决定谁胜出：
//! - `deep_scan`：是否必须读完整个流；为 `false` 时命中第一个非空载荷即停止解析
//! - `criteria`：新候选是否替换当前持有的候选
//!
//! 两个判定条件都是 `>=`，平局时后出现的块胜出。

use clap::ValueEnum;
use clap::builder::PossibleValue;
use std::str::FromStr;

use super::RawCard;
use super::layout;
use crate::CardError;
use crate::character::Revision;

/// 候选块的接受条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criteria {
    /// 修订号不低于当前持有的修订号。
    ByRecency,
    /// 去掉关键字后的载荷长度不小于当前持有的载荷长度。
    BySize,
}

impl Criteria {
    /// `chunk` 为完整块内容（含关键字前缀）。
    pub fn accepts(self, held: &RawCard, chunk: &[u8], revision: Revision) -> bool {
        match self {
            Criteria::ByRecency => revision >= held.revision,
            Criteria::BySize => {
                chunk.len().saturating_sub(layout::keyword_len(revision)) >= held.raw_chara_data.len()
            }
        }
    }
}

/// 扫描策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanMode {
    pub deep_scan: bool,
    pub criteria: Criteria,
}

impl ScanMode {
    /// 第一个卡片块即返回，剩余数据直接拷贝。
    pub const FIRST: Self = Self {
        deep_scan: false,
        criteria: Criteria::BySize,
    };
    /// 读完整个流，保留修订号最高者。
    pub const LAST_VERSION: Self = Self {
        deep_scan: true,
        criteria: Criteria::ByRecency,
    };
    /// 读完整个流，保留载荷最长者。
    pub const LAST_LONGEST: Self = Self {
        deep_scan: true,
        criteria: Criteria::BySize,
    };

    /// 输出稳定名称，供日志与命令行使用。
    ///
    /// 自定义组合（不属于三个命名策略）输出 `custom`。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FIRST => "first",
            Self::LAST_VERSION => "last_version",
            Self::LAST_LONGEST => "last_longest",
            _ => "custom",
        }
    }
}

impl Default for ScanMode {
    fn default() -> Self {
        Self::FIRST
    }
}

impl FromStr for ScanMode {
    type Err = CardError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.trim().to_lowercase().replace('-', "_").as_str() {
            "first" => Ok(Self::FIRST),
            "last_version" => Ok(Self::LAST_VERSION),
            "last_longest" => Ok(Self::LAST_LONGEST),
            other => Err(CardError::InvalidFormat(format!(
                "未知扫描策略：{}（可选：first / last_version / last_longest）",
                other
            ))),
        }
    }
}

/// 命令行取值；自定义组合不在可选列表中。
impl ValueEnum for ScanMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::FIRST, Self::LAST_VERSION, Self::LAST_LONGEST]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match *self {
            Self::FIRST => PossibleValue::new("first"),
            Self::LAST_VERSION => PossibleValue::new("last_version").alias("last-version"),
            Self::LAST_LONGEST => PossibleValue::new("last_longest").alias("last-longest"),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn held(data_len: usize, revision: Revision) -> RawCard {
        RawCard {
            raw_chara_data: vec![b'A'; data_len],
            revision,
            ..RawCard::default()
        }
    }

    fn chunk(revision: Revision, payload_len: usize) -> Vec<u8> {
        let mut chunk = layout::keyword(revision).unwrap().to_vec();
        chunk.resize(chunk.len() + payload_len, b'B');
        chunk
    }

    #[test]
    fn by_size_accepts_ties() {
        let current = held(10, Revision::V3);
        assert!(Criteria::BySize.accepts(&current, &chunk(Revision::V2, 10), Revision::V2));
        assert!(!Criteria::BySize.accepts(&current, &chunk(Revision::V2, 9), Revision::V2));
    }

    #[test]
    fn by_size_ignores_keyword_length() {
        // chara\0 比 ccv3\0 多一个字节，不能算进载荷长度
        let current = held(5, Revision::V3);
        assert!(!Criteria::BySize.accepts(&current, &chunk(Revision::V2, 4), Revision::V2));
    }

    #[test]
    fn by_recency_accepts_equal_or_higher_revision() {
        let current = held(100, Revision::V2);
        assert!(Criteria::ByRecency.accepts(&current, &chunk(Revision::V2, 1), Revision::V2));
        assert!(Criteria::ByRecency.accepts(&current, &chunk(Revision::V3, 1), Revision::V3));

        let current = held(1, Revision::V3);
        assert!(!Criteria::ByRecency.accepts(&current, &chunk(Revision::V2, 500), Revision::V2));
    }

    #[test]
    fn any_candidate_beats_the_empty_baseline() {
        let empty = RawCard::default();
        for revision in [Revision::V2, Revision::V3] {
            assert!(Criteria::BySize.accepts(&empty, &chunk(revision, 0), revision));
            assert!(Criteria::ByRecency.accepts(&empty, &chunk(revision, 0), revision));
        }
    }

    #[test]
    fn scan_mode_names_round_trip() {
        for mode in [ScanMode::FIRST, ScanMode::LAST_VERSION, ScanMode::LAST_LONGEST] {
            assert_eq!(mode.as_str().parse::<ScanMode>().unwrap(), mode);
        }
        assert_eq!(" Last-Longest ".parse::<ScanMode>().unwrap(), ScanMode::LAST_LONGEST);
        assert!(matches!("newest".parse::<ScanMode>(), Err(CardError::InvalidFormat(_))));
        assert_eq!(ScanMode::default(), ScanMode::FIRST);

        let custom = ScanMode {
            deep_scan: false,
            criteria: Criteria::ByRecency,
        };
        assert_eq!(custom.as_str(), "custom");
    }

    #[test]
    fn value_enum_lists_only_named_modes() {
        let names: Vec<String> = ScanMode::value_variants()
            .iter()
            .filter_map(ValueEnum::to_possible_value)
            .map(|value| value.get_name().to_string())
            .collect();
        assert_eq!(names, ["first", "last_version", "last_longest"]);

        assert_eq!(<ScanMode as ValueEnum>::from_str("last-version", false), Ok(ScanMode::LAST_VERSION));
        let custom = ScanMode {
            deep_scan: false,
            criteria: Criteria::ByRecency,
        };
        assert_eq!(custom.to_possible_value(), None);
    }

    proptest! {
        #[test]
        fn by_size_matches_payload_length_comparison(held_len in 0usize..64, payload_len in 0usize..64, v3 in any::<bool>()) {
            let revision = if v3 { Revision::V3 } else { Revision::V2 };
            let current = held(held_len, Revision::V3);
            prop_assert_eq!(
                Criteria::BySize.accepts(&current, &chunk(revision, payload_len), revision),
                payload_len >= held_len
            );
        }
    }
}
