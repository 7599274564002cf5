//! # 下载模块
//!
//! ## 设计思路
//!
//! 同一张卡片可能有多个候选地址（原图、镜像、CDN）。按顺序逐个请求，
//! 第一个成功的响应体直接作为处理器的读取源；全部失败时只上报最后一个错误。
//!
//! ## 实现思路
//!
//! - 阻塞式 `reqwest` 客户端，单次 GET，`Accept: image/png`。
//! - 非 2xx 状态码视为失败，继续尝试下一个地址。
//! - 日志中的 URL 去掉 query 与 fragment。

use reqwest::blocking::{Client, Response};
use std::time::Duration;

use crate::{CardConfig, CardError};

/// 多地址顺序下载器。
pub struct CardFetcher {
    client: Client,
    download_timeout: u64,
}

impl CardFetcher {
    /// 根据配置构建可复用的 HTTP 客户端。
    pub fn new(config: &CardConfig) -> Result<Self, CardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| CardError::Network(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            client,
            download_timeout: config.download_timeout,
        })
    }

    /// 依次请求各地址，返回第一个成功的响应。
    pub fn fetch<S: AsRef<str>>(&self, urls: &[S]) -> Result<Response, CardError> {
        let mut last_err: Option<CardError> = None;

        for (idx, url) in urls.iter().enumerate() {
            let url = url.as_ref();
            if idx > 0 {
                log::debug!("↪️ 尝试候选地址 {}/{}: {}", idx + 1, urls.len(), redact_url_for_log(url));
            }

            match self.fetch_one(url) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    log::warn!("⚠️ 下载失败 - {}：{}", redact_url_for_log(url), err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CardError::Network("没有可用的下载地址".to_string())))
    }

    fn fetch_one(&self, url: &str) -> Result<Response, CardError> {
        log::info!("🌐 开始下载卡片 - URL: {}", redact_url_for_log(url));

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "image/png")
            .send()
            .map_err(|e| self.map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CardError::Network(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status_message(status.as_u16())
            )));
        }

        Ok(response)
    }

    /// 统一映射 reqwest 错误到业务错误。
    fn map_reqwest_error(&self, e: reqwest::Error, url: &str) -> CardError {
        let err_msg = e.to_string().replace(url, &redact_url_for_log(url));

        if e.is_timeout() {
            CardError::Network(format!("下载超时（{}秒）", self.download_timeout))
        } else if e.is_connect() {
            CardError::Network(format!("无法连接：{}", err_msg))
        } else {
            CardError::Network(format!("请求失败：{}", err_msg))
        }
    }
}

fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

/// 常见 HTTP 状态码文案。
fn status_message(code: u16) -> &'static str {
    match code {
        404 => "未找到",
        403 => "访问被拒绝",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}
