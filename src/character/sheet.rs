//! # 角色卡外壳
//!
//! JSON 形状固定为 `{"spec": ..., "spec_version": ..., "data": {...}}`。
//! `data` 内部字段不做解释，作为 `serde_json::Map` 原样往返。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DEFAULT_STAMP, Revision, SPEC_V3, VERSION_V3};
use crate::CardError;

/// 结构化角色卡记录。
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub spec: String,
    pub version: String,
    pub revision: Revision,
    pub data: Map<String, Value>,
}

#[derive(Serialize)]
struct SheetWrapperRef<'a> {
    spec: &'a str,
    spec_version: &'a str,
    data: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct SheetWrapper {
    #[serde(default)]
    spec: String,
    #[serde(default)]
    spec_version: String,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl Sheet {
    /// 指定修订号的空白记录。
    pub fn default_for(revision: Revision) -> Self {
        let mut sheet = Self {
            spec: String::new(),
            version: String::new(),
            revision: Revision::NONE,
            data: Map::new(),
        };
        sheet.set_revision(revision);
        sheet
    }

    /// 设置修订号并同步 `spec` / `spec_version`。
    ///
    /// 未知修订号（包括 `NONE`）回退到 V2。
    pub fn set_revision(&mut self, revision: Revision) {
        let stamp = revision.stamp().unwrap_or(DEFAULT_STAMP);
        self.revision = stamp.revision;
        self.spec = stamp.spec.to_string();
        self.version = stamp.version.to_string();
    }

    /// 从 JSON 字节解码。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CardError> {
        let wrapper: SheetWrapper = serde_json::from_slice(bytes)
            .map_err(|e| CardError::Decode(format!("角色卡 JSON 解析失败：{}", e)))?;

        let revision = if wrapper.spec == SPEC_V3 || wrapper.spec_version == VERSION_V3 {
            Revision::V3
        } else {
            Revision::V2
        };

        let mut sheet = Self {
            spec: wrapper.spec,
            version: wrapper.spec_version,
            revision,
            data: wrapper.data.unwrap_or_default(),
        };
        sheet.set_revision(revision);
        Ok(sheet)
    }

    /// 编码为紧凑 JSON 字节。
    pub fn to_bytes(&self) -> Result<Vec<u8>, CardError> {
        let wrapper = SheetWrapperRef {
            spec: &self.spec,
            spec_version: &self.version,
            data: &self.data,
        };
        serde_json::to_vec(&wrapper)
            .map_err(|e| CardError::Encode(format!("角色卡 JSON 编码失败：{}", e)))
    }

    /// `data.name`，缺失或非字符串时返回空串。
    pub fn name(&self) -> &str {
        self.data.get("name").and_then(Value::as_str).unwrap_or("")
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.data.insert("name".to_string(), Value::String(name.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{SPEC_V2, VERSION_V2};

    #[test]
    fn default_for_unknown_revision_falls_back_to_v2() {
        let sheet = Sheet::default_for(Revision(9));
        assert_eq!(sheet.revision, Revision::V2);
        assert_eq!(sheet.spec, SPEC_V2);
        assert_eq!(sheet.version, VERSION_V2);
        assert!(sheet.data.is_empty());
    }

    #[test]
    fn from_bytes_detects_v3_by_spec_or_version() {
        let by_spec = Sheet::from_bytes(br#"{"spec":"chara_card_v3","data":{"name":"A"}}"#).unwrap();
        assert_eq!(by_spec.revision, Revision::V3);
        assert_eq!(by_spec.version, VERSION_V3);
        assert_eq!(by_spec.name(), "A");

        let by_version = Sheet::from_bytes(br#"{"spec_version":"3.0","data":{}}"#).unwrap();
        assert_eq!(by_version.revision, Revision::V3);
        assert_eq!(by_version.spec, SPEC_V3);
    }

    #[test]
    fn from_bytes_defaults_to_v2_and_tolerates_missing_data() {
        let sheet = Sheet::from_bytes(br#"{"spec":"something_else"}"#).unwrap();
        assert_eq!(sheet.revision, Revision::V2);
        assert_eq!(sheet.spec, SPEC_V2);
        assert!(sheet.data.is_empty());
    }

    #[test]
    fn from_bytes_rejects_malformed_json() {
        assert!(matches!(Sheet::from_bytes(b"{not json"), Err(CardError::Decode(_))));
    }

    #[test]
    fn json_round_trip_keeps_data_fields() {
        let mut sheet = Sheet::default_for(Revision::V3);
        sheet.set_name("Seraphina");
        sheet
            .data
            .insert("tags".to_string(), serde_json::json!(["fantasy", "guide"]));

        let bytes = sheet.to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["spec"], "chara_card_v3");
        assert_eq!(value["spec_version"], "3.0");
        assert_eq!(value["data"]["name"], "Seraphina");

        assert_eq!(Sheet::from_bytes(&bytes).unwrap(), sheet);
    }
}
