//! Status reporting.
//!
//! Pure read: joins messages to their status rows, maps status codes to
//! display labels and renders a bordered table. Messages without a status
//! row are kept and shown with an unknown status, and unrecognized codes
//! render as `?` instead of failing.

use itertools::Itertools;

use crate::{
    error::Error,
    message::{MessageStatus, ReplaySelection, StatusRow},
    store::Store,
};

const HEADERS: [&str; 4] = ["ID", "Topic", "Status", "Updated At"];

/// One rendered line of the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub id: i64,
    pub topic_name: String,
    pub status_label: String,
    pub updated_at: String,
}

impl From<StatusRow> for DisplayRow {
    fn from(row: StatusRow) -> Self {
        Self {
            id: row.id,
            topic_name: row.topic_name,
            status_label: match row.status {
                Some(code) => MessageStatus::label(code),
                None => "?".to_owned(),
            },
            updated_at: row
                .updated_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Display rows for the selection, in store order. The `force` flag plays
/// no part here.
pub async fn report(store: &Store, selection: &ReplaySelection) -> Result<Vec<DisplayRow>, Error> {
    Ok(store
        .status_rows(selection)
        .await?
        .into_iter()
        .map(DisplayRow::from)
        .collect())
}

/// Render rows as a bordered four-column table.
pub fn render(rows: &[DisplayRow]) -> String {
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|row| {
            [
                row.id.to_string(),
                row.topic_name.clone(),
                row.status_label.clone(),
                row.updated_at.clone(),
            ]
        })
        .collect();

    let widths: Vec<usize> = (0..HEADERS.len())
        .map(|col| {
            cells
                .iter()
                .map(|row| row[col].len())
                .chain([HEADERS[col].len()])
                .max()
                .unwrap_or_default()
        })
        .collect();

    let border = format!(
        "+{}+",
        widths.iter().map(|w| "-".repeat(w + 2)).join("+")
    );

    let line = |cells: &[String]| {
        format!(
            "|{}|",
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!(" {cell:<width$} "))
                .join("|")
        )
    };

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();

    let mut out = vec![border.clone(), line(&header), border.clone()];
    for row in &cells {
        out.push(line(row));
    }
    if !cells.is_empty() {
        out.push(border);
    }

    out.join("\n") + "\n"
}
