use std::fmt::Write;

use crate::cart::CartLine;

/// Subject and body shared verbatim by every row of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedMessage {
    pub subject: String,
    pub message: String,
}

pub fn build_combined_message(lines: &[CartLine], note: Option<&str>) -> CombinedMessage {
    let subject = match lines.len() {
        1 => "Quote request for 1 product".to_string(),
        n => format!("Quote request for {} products", n),
    };

    let mut message = String::from("Quote request for the following products:\n");
    for (index, line) in lines.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = write!(
            message,
            "\n{}. {} (Quantity: {})",
            index + 1,
            line.name,
            line.quantity
        );
        if let Some(specs) = non_blank(line.custom_specifications.as_deref()) {
            let _ = write!(message, "\n   Specifications: {}", specs);
        }
    }

    if let Some(note) = non_blank(note) {
        let _ = write!(message, "\n\nAdditional notes:\n{}", note);
    }

    CombinedMessage { subject, message }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
