use std::io;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Process-wide multi-thread runtime hosting the controller, its fetch tasks
/// and debounce timers.
pub fn tokio_runtime() -> io::Result<&'static Runtime> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .thread_name("chart-refresh")
        .enable_all()
        .build()?;
    Ok(RUNTIME.get_or_init(|| runtime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_shared() {
        let first = tokio_runtime().unwrap();
        let second = tokio_runtime().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.block_on(async { 40 + 2 }), 42);
    }
}
