//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::auth::UserType;
use crate::config::UserEntry;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print a table of configured accounts
pub fn print_user_table(users: &[UserEntry]) {
    if users.is_empty() {
        info("No users configured. Add [[users]] entries to kuryr-admin.toml");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Email").fg(Color::Cyan),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Business").fg(Color::Cyan),
        ]);

    for user in users {
        let type_color = match user.user_type {
            UserType::Administrator => Color::Yellow,
            UserType::Operator => Color::Green,
        };

        table.add_row(vec![
            Cell::new(user.id),
            Cell::new(&user.email),
            Cell::new(user.user_type).fg(type_color),
            Cell::new(user.biz_id),
        ]);
    }

    println!("{table}");
}
