// UI and formatting module

pub mod health_formatters;

// Re-export commonly used items for cleaner imports
pub use health_formatters::{
    format_event, health_label, print_units_table, print_verdict, unit_icon, unit_kind_label,
};
