use std::io::Stderr;
use std::sync::{LazyLock, Mutex};

pub mod init;
pub mod message;

/// Shared handle on stderr so log lines and messages don't interleave.
pub static TERMINAL_STDERR: LazyLock<Mutex<Stderr>> =
    LazyLock::new(|| Mutex::new(std::io::stderr()));
