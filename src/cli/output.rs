use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::AppError;

pub fn render_table<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return "No devices.".to_string();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_error(err: &AppError) {
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&err.to_json()).unwrap_or_default()
    );
}
