//! Shopping-list aggregation.
//!
//! Cart rows are grouped by `(ingredient name, measurement unit)` and each group sums
//! `amount * cart quantity`. The rendered list is a header, a blank line, then one
//! `- name: total unit` line per group, ordered by name then unit.

use crate::db::models::shopping_cart::CartIngredientRow;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const HEADER: &str = "Shopping list:";
pub const FILENAME: &str = "shopping_list.txt";

/// One aggregated line of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: Decimal,
}

/// Group and sum cart rows. The result is sorted by name, then unit.
pub fn aggregate(rows: &[CartIngredientRow]) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(&str, &str), Decimal> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.name.as_str(), row.measurement_unit.as_str()))
            .or_insert(Decimal::ZERO) += Decimal::from(row.amount) * row.quantity;
    }

    totals
        .into_iter()
        .map(|((name, unit), total)| ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total: total.normalize(),
        })
        .collect()
}

/// Render aggregated items as the downloadable text body.
pub fn render(items: &[ShoppingListItem]) -> String {
    let mut out = format!("{HEADER}\n\n");
    for item in items {
        out.push_str(&format!("- {}: {} {}\n", item.name, item.total, item.measurement_unit));
    }
    out
}
