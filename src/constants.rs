//! 全局常量与调试开关
//!
//! 集中管理 HTTP 内容类型常量和环境变量开关，
//! 避免各模块散落字符串字面量。

/// `text/plain` 内容类型
pub const TEXT_PLAIN: &str = "text/plain";

/// `application/json` 内容类型
pub const APPLICATION_JSON: &str = "application/json";

/// `application/x-www-form-urlencoded` 内容类型
pub const APPLICATION_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// `multipart/form-data` 内容类型
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// 全局调试开关环境变量，非空即开启
pub const LIVINGKIT_DEBUG: &str = "LIVINGKIT_DEBUG";

/// HTTP 客户端请求/响应转储开关环境变量
pub const DEBUG_HTTPCLIENT: &str = "DEBUG_HTTPCLIENT";

/// HTTP 客户端转储是否包含 body 的开关环境变量
pub const DEBUG_HTTPCLIENT_BODY: &str = "DEBUG_HTTPCLIENT_BODY";

/// 检查某个环境变量开关是否开启（存在且非空）
pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

/// 全局调试模式是否开启
pub fn debug_enabled() -> bool {
    env_flag(LIVINGKIT_DEBUG)
}

/// 修改同一个环境变量开关的测试拿这把锁串行执行
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
