//! UUID 辅助函数
//!
//! 统一资源 ID 的生成与校验入口，路由中间件和业务代码共用。

use uuid::Uuid;

/// 生成一个随机 UUID v4 字符串（连字符格式）
pub fn new_v4_string() -> String {
    Uuid::new_v4().to_string()
}

/// 校验输入是否为合法 UUID
pub fn is_valid_uuid(input: &str) -> bool {
    Uuid::parse_str(input).is_ok()
}
