//! UI-related string formatting, like sizes and timestamps.

use chrono::{DateTime, Local, Utc};
use filejacket::file::FileState;
use filejacket::File;

/// 把字节数格式化为人类可读的大小 (例如 "1.2 KiB")
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// 把 UTC 时间转换为本地时区显示
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|utc_time| {
        let local_time = utc_time.with_timezone(&Local);
        local_time.format("%Y-%m-%d %H:%M:%S %Z").to_string()
    })
    .unwrap_or_else(|| "N/A".to_string())
}

/// 文件对象当前生命周期状态的一句话描述
pub fn describe_state(state: &FileState) -> &'static str {
    if state.adding {
        "new (never saved)"
    } else if state.changing && state.renaming {
        "changed, rename pending"
    } else if state.changing {
        "changed since last save"
    } else if state.renaming {
        "rename pending"
    } else {
        "clean"
    }
}

/// 文件的显示名:完整文件名,没有时退回到 "?"
pub fn display_name(file: &File) -> String {
    file.complete_filename().unwrap_or_else(|| "?".to_string())
}
