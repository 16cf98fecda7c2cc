//! 可观测性：tracing 订阅器初始化（默认 info，可用 RUST_LOG 覆盖；debug 开关打开时默认 debug）

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
