// 远程计算服务
//
// 缓存层把计算视为不透明函数：给定规范化输入，返回结果记录或失败。
// 这里定义该接口并提供基于 HTTP 的实现。失败不做重试，重试策略属于调用方。

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::core::http::build_http_client;
use crate::data::cache::CanonicalRecord;
use crate::models::{HttpSettings, ResultRecord};

/// 计算失败
#[derive(Error, Debug)]
pub enum CalculatorError {
    /// 端点未配置或无效
    #[error("计算端点配置错误: {0}")]
    Config(String),

    /// 网络传输错误
    #[error("请求计算端点失败: {0}")]
    Transport(#[source] reqwest::Error),

    /// 非 2xx 响应
    #[error("计算端点返回错误状态 {status}: {body}")]
    Status { status: u16, body: String },

    /// 响应无法解析
    #[error("计算结果解析失败: {0}")]
    Decode(String),
}

/// 计算接口
#[async_trait]
pub trait Calculator: Send + Sync {
    /// 对规范化输入执行计算
    async fn compute(
        &self,
        tool: &str,
        input: &CanonicalRecord,
    ) -> Result<ResultRecord, CalculatorError>;
}

/// HTTP 计算端点
///
/// 以 JSON POST `{"tool": ..., "input": {...}}`，响应体即结果记录。
#[derive(Debug, Clone)]
pub struct HttpCalculator {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpCalculator {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// 根据配置创建
    pub fn from_settings(settings: &HttpSettings) -> Result<Self, CalculatorError> {
        let endpoint = settings
            .endpoint
            .as_deref()
            .ok_or_else(|| CalculatorError::Config("未设置计算端点".to_string()))?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CalculatorError::Config(format!("端点 URL 无效: {e}")))?;
        let client = build_http_client(settings).map_err(CalculatorError::Transport)?;
        Ok(Self::new(client, endpoint))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// 请求体
    pub fn request_body(tool: &str, input: &CanonicalRecord) -> serde_json::Value {
        json!({
            "tool": tool,
            "input": input,
        })
    }
}

#[async_trait]
impl Calculator for HttpCalculator {
    async fn compute(
        &self,
        tool: &str,
        input: &CanonicalRecord,
    ) -> Result<ResultRecord, CalculatorError> {
        tracing::debug!(tool = %tool, endpoint = %self.endpoint, "调用远程计算");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&Self::request_body(tool, input))
            .send()
            .await
            .map_err(CalculatorError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalculatorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ResultRecord>()
            .await
            .map_err(|e| CalculatorError::Decode(e.to_string()))
    }
}
