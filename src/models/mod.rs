pub mod format_options;
