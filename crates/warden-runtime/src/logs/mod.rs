//! Log tailing and log export.

mod cursor;
mod export;
mod tailer;

pub use cursor::LogCursor;
pub use export::{ALL_LEVELS, LogExport, export_logs};
pub use tailer::{LogTailer, TailerExit};
