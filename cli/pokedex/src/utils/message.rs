use std::fmt::Display;

/// Write a message to stderr.
///
/// This is a wrapper around `eprintln!` that can be further extended
/// to include word wrapping, ANSI filtering etc.
fn print_message(v: impl Display) {
    use std::io::Write;

    if let Ok(mut stderr) = super::TERMINAL_STDERR.lock() {
        let _ = writeln!(stderr, "{v}");
    } else {
        eprintln!("{v}");
    }
}

/// alias for [print_message]
pub(crate) fn plain(v: impl Display) {
    print_message(v);
}
pub(crate) fn error(v: impl Display) {
    print_message(std::format_args!("❌ ERROR: {v}"));
}
pub(crate) fn created(v: impl Display) {
    print_message(std::format_args!("✨ {v}"));
}
/// double width character, add an additional space for alignment
pub(crate) fn deleted(v: impl Display) {
    print_message(std::format_args!("🗑️  {v}"));
}
/// double width character, add an additional space for alignment
pub(crate) fn warning(v: impl Display) {
    print_message(std::format_args!("⚠️  {v}"));
}
