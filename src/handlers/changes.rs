//! Field-level diff between two product states

use serde_json::json;

use crate::aggregate::Product;
use crate::domain::FieldChange;

/// One change per semantic field that differs between `old` and `new`.
///
/// Identity, version, hash and timestamps are not reported.
pub fn calculate_changes(old: &Product, new: &Product) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    macro_rules! diff {
        ($field:ident) => {
            if old.$field != new.$field {
                changes.push(FieldChange {
                    field: stringify!($field).to_string(),
                    old_value: Some(json!(old.$field)),
                    new_value: json!(new.$field),
                });
            }
        };
    }

    diff!(sku);
    diff!(base_title);
    diff!(description);
    diff!(prices);
    diff!(variants);
    diff!(metadata);

    changes
}
