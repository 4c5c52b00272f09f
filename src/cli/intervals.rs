use super::ui;
use crate::core::TimeToken;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

/// Prints the supported time strings from finest to coarsest.
pub fn run() -> Result<()> {
    println!(
        "\n{}",
        ui::style_text("Supported intervals and periods", ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Token"),
        ui::header_cell("Count"),
        ui::header_cell("Unit"),
        ui::header_cell("Resample rule"),
    ]);

    for (rank, token) in TimeToken::vocabulary().enumerate() {
        table.add_row(vec![
            Cell::new(rank).set_alignment(CellAlignment::Right),
            Cell::new(token.as_str()),
            Cell::new(token.count()).set_alignment(CellAlignment::Right),
            Cell::new(token.unit()),
            Cell::new(token.offset_alias(true)?),
        ]);
    }

    println!("{table}");
    println!(
        "{}",
        ui::style_text(
            "Tokens are ordered by position, not by the time they cover.",
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
