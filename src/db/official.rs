// src/db/official.rs
use crate::db::from_millis;
use crate::domain::official::{OfficialPrice, ValidOfficialPrice};
use crate::errors::ServerError;
use rusqlite::{params, Connection};

pub fn insert_official_price(
    conn: &Connection,
    row: &ValidOfficialPrice,
    now_ms: i64,
) -> Result<i64, ServerError> {
    conn.execute(
        r#"
        insert into official_prices (
            mandi, district, crop, min_price, max_price, modal_price,
            price_date, reported_by, created_at
        ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        params![
            row.mandi,
            row.district,
            row.crop,
            row.min_price,
            row.max_price,
            row.modal_price,
            row.date,
            row.reported_by,
            now_ms
        ],
    )
    .map_err(|e| ServerError::DbError(format!("insert official price failed: {e}")))?;
    Ok(conn.last_insert_rowid())
}

/// Highest modal price first, like the mandi comparison table.
pub fn list_official_prices(
    conn: &Connection,
    crop: &str,
    district: Option<&str>,
    mandi: Option<&str>,
) -> Result<Vec<OfficialPrice>, ServerError> {
    let mut stmt = conn
        .prepare(
            r#"
            select id, mandi, district, crop, min_price, max_price, modal_price,
                   price_date, reported_by, created_at
            from official_prices
            where crop = ?1 and (?2 is null or district = ?2) and (?3 is null or mandi = ?3)
            order by modal_price desc, id
            "#,
        )
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let rows = stmt
        .query_map(params![crop, district, mandi], |row| {
            Ok(OfficialPrice {
                id: row.get(0)?,
                mandi: row.get(1)?,
                district: row.get(2)?,
                crop: row.get(3)?,
                min_price: row.get(4)?,
                max_price: row.get(5)?,
                modal_price: row.get(6)?,
                date: row.get(7)?,
                reported_by: row.get(8)?,
                created_at: from_millis(row.get(9)?),
            })
        })
        .map_err(|e| ServerError::DbError(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| ServerError::DbError(e.to_string()))?);
    }
    Ok(out)
}
