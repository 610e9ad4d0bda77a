use std::collections::BTreeMap;

use diesel::prelude::*;

use crate::dealer::sync::want::DealerSpec;
use crate::models::DealershipRow;
use crate::schema::dealerships;

pub fn read_current(conn: &mut SqliteConnection) -> anyhow::Result<BTreeMap<String, DealerSpec>> {
    let rows: Vec<DealershipRow> = dealerships::table
        .select(DealershipRow::as_select())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.name,
                DealerSpec {
                    is_active: row.is_active,
                    filtering_rules: row.filtering_rules,
                    output_rules: row.output_rules,
                    qr_output_path: row.qr_output_path,
                    url_template: row.url_template,
                    extra: row.extra,
                },
            )
        })
        .collect())
}
