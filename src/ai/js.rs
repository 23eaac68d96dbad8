use async_trait::async_trait;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::js_sys::{Function, Promise};

use super::oracle::{MoveOracle, MoveRequestError};

/// 包装前端传入的 `(instruction) => Promise<string>` 回调。
pub struct JsMoveOracle {
    callback: Function,
}

impl JsMoveOracle {
    pub fn new(callback: Function) -> Self {
        Self { callback }
    }
}

fn transport_error(error: JsValue) -> MoveRequestError {
    MoveRequestError::Transport {
        message: error.as_string().unwrap_or_else(|| format!("{error:?}")),
    }
}

#[async_trait(?Send)]
impl MoveOracle for JsMoveOracle {
    async fn choose_move(&self, instruction: &str) -> Result<String, MoveRequestError> {
        let returned = self
            .callback
            .call1(&JsValue::NULL, &JsValue::from_str(instruction))
            .map_err(transport_error)?;
        // 同步返回的字符串也按已完成的 Promise 处理。
        let reply = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(transport_error)?;
        reply.as_string().ok_or_else(|| MoveRequestError::Transport {
            message: "reply was not a string".to_string(),
        })
    }
}
