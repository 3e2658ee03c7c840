use crate::models::HttpSettings;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("calccache/", env!("CARGO_PKG_VERSION"));

/// 构建调用远程计算端点的 HTTP 客户端
///
/// 代理沿用进程环境变量（HTTP_PROXY/HTTPS_PROXY/ALL_PROXY）。
pub fn build_http_client(settings: &HttpSettings) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpSettings::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_contains_version() {
        assert!(USER_AGENT.starts_with("calccache/"));
        assert!(USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
