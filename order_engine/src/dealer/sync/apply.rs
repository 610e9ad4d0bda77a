use diesel::prelude::*;

use crate::dealer::sync::diff::DealerDiff;
use crate::models::NewDealershipRow;
use crate::schema::dealerships;

/// Apply the diff inside the current transaction.
pub fn apply_diff(conn: &mut SqliteConnection, diff: &DealerDiff) -> anyhow::Result<()> {
    for (name, spec) in &diff.upsert {
        let row = NewDealershipRow {
            name,
            is_active: spec.is_active,
            filtering_rules: &spec.filtering_rules,
            output_rules: &spec.output_rules,
            qr_output_path: &spec.qr_output_path,
            url_template: &spec.url_template,
            extra: &spec.extra,
        };
        diesel::insert_into(dealerships::table)
            .values(&row)
            .on_conflict(dealerships::name)
            .do_update()
            .set(&row)
            .execute(conn)?;
    }

    for name in &diff.delete {
        diesel::delete(dealerships::table.filter(dealerships::name.eq(name))).execute(conn)?;
    }

    Ok(())
}
