use std::path::Path;

use owo_colors::OwoColorize;

use super::{BoardSession, print_json, row_key_for};
use crate::display::format_field;
use crate::entity::FieldMap;
use crate::error::{DeskError, Result};
use crate::inline_edit::InlineFieldEditor;
use crate::registry::schema;
use crate::types::{EntityKind, Id};

/// Change one field of one entity and save the board.
///
/// Fields that have an inline editor go through it, exactly as a click in the
/// tree would; anything else is a plain single-field mutation.
pub async fn cmd_set(board_path: &Path, kind: EntityKind, id: Id, field: &str, value: &str, json: bool) -> Result<()> {
    let board = BoardSession::open(board_path)?;
    let record = board.client.store().fetch_entity(kind, id).await?;
    let spec = schema(kind).require_field(field)?;

    let result = match row_key_for(&record) {
        Some(key) if spec.inline => {
            let editor = InlineFieldEditor::for_record(board.client.clone(), key, &record, field)?;
            editor.change_str(value).await
        }
        _ => match spec.parse_value(value) {
            Ok(parsed) => {
                let fields = FieldMap::single(spec.name, parsed);
                board.client.mutate(kind, id, &fields).await
            }
            Err(e) => Err(e),
        },
    };
    if let Err(DeskError::InvalidValue { .. }) = &result
        && !spec.vocabulary().is_empty()
    {
        eprintln!("{} {}", "must be one of:".yellow(), spec.vocabulary().join(", "));
    }
    let updated = result?;
    board.save(board_path)?;

    if json {
        return print_json(&updated);
    }
    println!(
        "{} {}: {} -> {}",
        updated.number().cyan(),
        spec.label,
        format_field(record.get_field(field).as_ref()),
        format_field(updated.get_field(field).as_ref()).green()
    );
    Ok(())
}
