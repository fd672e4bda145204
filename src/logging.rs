use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the log directory, the tracing subscriber, and the panic hook.
/// Must be called early, before any session work.
///
/// Panics and unhandled faults are logged with full detail and then chained
/// to the previous hook; the process is kept alive so the editor stays
/// usable. Callers that want fail-fast semantics should not install this.
pub fn init(data_dir: &Path) {
    let log_dir = data_dir.join("logs");
    let _ = fs::create_dir_all(&log_dir);
    LOG_DIR.set(log_dir.clone()).ok();

    rotate_logs(&log_dir);

    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = format_panic(info);
        if let Some(dir) = LOG_DIR.get() {
            let path = dir.join("crash.log");
            if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&path) {
                let _ = f.write_all(msg.as_bytes());
                let _ = f.write_all(b"\n");
            }
        }
        eprintln!("{}", msg);
        prev_hook(info);
    }));
}

/// Append a non-fatal error with context to the crash log.
pub fn log_error(context: &str, error: &str) {
    append_line("ERROR", context, error);
    tracing::error!("[{}] {}", context, error);
}

pub fn log_warn(context: &str, message: &str) {
    append_line("WARN ", context, message);
    tracing::warn!("[{}] {}", context, message);
}

fn append_line(level: &str, context: &str, message: &str) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let line = format!("[{}] {} [{}] {}\n", timestamp, level, context, message);
    if let Some(dir) = LOG_DIR.get() {
        let path = dir.join("crash.log");
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = f.write_all(line.as_bytes());
        }
    }
}

fn format_panic(info: &std::panic::PanicHookInfo) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "unknown".into());
    let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".into()
    };

    let bt = std::backtrace::Backtrace::force_capture();

    format!(
        "=== MINDMARK CRASH ===\n\
         Timestamp: {}\n\
         Location:  {}\n\
         Message:   {}\n\
         Thread:    {:?}\n\
         PID:       {}\n\
         \n\
         Backtrace:\n{}\n\
         === END CRASH ===\n",
        timestamp,
        location,
        payload,
        std::thread::current().name().unwrap_or("unnamed"),
        std::process::id(),
        bt
    )
}

fn rotate_logs(log_dir: &Path) {
    let crash_log = log_dir.join("crash.log");
    if let Ok(meta) = fs::metadata(&crash_log) {
        // Rotate if > 2MB, keep the last 5
        if meta.len() > 2 * 1024 * 1024 {
            for i in (1..5).rev() {
                let from = log_dir.join(format!("crash.{}.log", i));
                let to = log_dir.join(format!("crash.{}.log", i + 1));
                let _ = fs::rename(&from, &to);
            }
            let _ = fs::rename(&crash_log, log_dir.join("crash.1.log"));
        }
    }
}

/// Read the crash log for the shell's diagnostics view.
pub fn read_crash_log() -> Result<String, String> {
    let dir = LOG_DIR.get().ok_or("log dir not initialized")?;
    let path = dir.join("crash.log");
    fs::read_to_string(&path).map_err(|e| e.to_string())
}

pub fn clear_crash_log() -> Result<(), String> {
    let dir = LOG_DIR.get().ok_or("log dir not initialized")?;
    let path = dir.join("crash.log");
    fs::write(&path, "").map_err(|e| e.to_string())
}
