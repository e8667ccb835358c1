//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{Amount, Product, SupplierNode};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print success status indented (green checkmark with leading spaces)
pub fn success_detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print failure status (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Debt with currency label, red when positive
pub fn debt(amount: Amount, currency: &str) -> String {
    let text = format!("{amount} {currency}");
    if amount.is_positive() {
        text.red().to_string()
    } else {
        text
    }
}

/// One-line listing of a supplier with its structural fields
pub fn supplier_line(node: &SupplierNode, currency: &str) -> String {
    format!(
        "{:>4}  {}{}  [tree {} lft {} rght {} level {}]  {}",
        node.id.to_string().bold(),
        "  ".repeat(node.depth() as usize),
        node,
        node.tree_id(),
        node.left_bound(),
        node.right_bound(),
        node.depth(),
        debt(node.debt, currency)
    )
}

pub fn product_line(product: &Product) -> String {
    format!(
        "{:>4}  {} {} ({}), supplier {}",
        product.id.to_string().bold(),
        product.name,
        product.model,
        product.release_date,
        product.supplier
    )
}
