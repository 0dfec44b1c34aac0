//! 诊断输出通道
//!
//! 调试镜像、panic 恢复和 HTTP 客户端转储都把人类可读的诊断文本
//! 写到同一种通道上。默认指向 stderr，测试或嵌入方可以换成内存缓冲。

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// 线程安全的诊断输出通道
///
/// 克隆后共享同一个底层 writer，每次 `write_line` 追加一行并立即 flush。
/// 写入失败只会吞掉错误，诊断输出不能影响业务请求。
#[derive(Clone)]
pub struct DiagnosticSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DiagnosticSink {
    /// 用任意 writer 构造诊断通道
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// 指向进程 stderr 的诊断通道
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// 写出一行诊断文本
    pub fn write_line(&self, text: &str) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{text}");
            let _ = writer.flush();
        }
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink").finish_non_exhaustive()
    }
}

/// 内存缓冲 sink，主要用于测试中断言诊断输出
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前已写入的全部文本
    pub fn contents(&self) -> String {
        match self.buffer.lock() {
            Ok(buffer) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory sink poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
