//! 运行时初始化：panic 钩子与控制台日志。

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

pub fn init_logging() {
    if console_log::init_with_level(log::Level::Debug).is_ok() {
        log::info!("[game_arcade] initialised");
    }
}
