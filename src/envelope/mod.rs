//! Response envelope
//!
//! Every API response body is `{"code": .., "msg": .., "data": ..}`. A code of
//! 200 carries data; every other code carries `null`.

use serde::{Deserialize, Serialize};

/// Envelope code for success
pub const SUCCESS_CODE: u16 = 200;

/// Envelope code used when a failure does not name one
pub const DEFAULT_FAILURE_CODE: u16 = 500;

/// Uniform `{code, msg, data}` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResult<T> {
    /// Successful result carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: "success".into(),
            data: Some(data),
        }
    }

    /// Failed result with the default code (500)
    pub fn fail(msg: impl Into<String>) -> Self {
        Self::fail_with_code(msg, DEFAULT_FAILURE_CODE)
    }

    /// Failed result with an explicit code
    pub fn fail_with_code(msg: impl Into<String>, code: u16) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

impl<T: Serialize> ApiResult<T> {
    /// Serialize to a JSON string
    pub fn to_json(&self) -> String {
        // only reachable through a failing Serialize impl on T
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"code":{},"msg":{},"data":null}}"#,
                DEFAULT_FAILURE_CODE,
                serde_json::Value::String(e.to_string())
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let result = ApiResult::success("https://cdn.example.com/a.png".to_string());
        assert!(result.is_success());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"code": 200, "msg": "success", "data": "https://cdn.example.com/a.png"})
        );
    }

    #[test]
    fn test_fail_defaults_to_500_with_null_data() {
        let result: ApiResult<String> = ApiResult::fail("Forbidden");
        assert!(!result.is_success());
        assert_eq!(
            result.to_json(),
            r#"{"code":500,"msg":"Forbidden","data":null}"#
        );
    }

    #[test]
    fn test_fail_with_code() {
        let result: ApiResult<()> = ApiResult::fail_with_code("未经授权的访问", 401);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"code": 401, "msg": "未经授权的访问", "data": null})
        );
    }
}
