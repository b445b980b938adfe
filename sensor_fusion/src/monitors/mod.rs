pub mod diagnostics_monitor;
