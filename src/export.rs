//! CSV downloads: comma separated, a header row, every value double quoted.

use crate::{
    entities::{delivery_note, driver, material, route, truck},
    errors::ServiceError,
};
use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};

/// Placeholder written for absent optional values.
pub const EMPTY: &str = "-";

fn write_csv<I, R>(header: &[&str], rows: I) -> Result<String, ServiceError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ServiceError::SerializationError(e.to_string()))
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| EMPTY.to_string())
}

fn text(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(EMPTY)
        .to_string()
}

pub fn drivers_csv(drivers: &[driver::Model]) -> Result<String, ServiceError> {
    write_csv(
        &["Nama Supir", "Nama PT", "Username", "Status"],
        drivers.iter().map(|d| {
            [
                d.name.clone(),
                d.company_name.clone(),
                d.username.clone(),
                active_label(d.is_active).to_string(),
            ]
        }),
    )
}

pub fn trucks_csv(trucks: &[truck::Model]) -> Result<String, ServiceError> {
    write_csv(
        &["Nomor Polisi", "Status"],
        trucks
            .iter()
            .map(|t| [t.plate_number.clone(), active_label(t.is_active).to_string()]),
    )
}

pub fn materials_csv(materials: &[material::Model]) -> Result<String, ServiceError> {
    write_csv(
        &["Nama Material", "Satuan"],
        materials.iter().map(|m| [m.name.clone(), m.unit.clone()]),
    )
}

pub fn routes_csv(routes: &[route::Model]) -> Result<String, ServiceError> {
    write_csv(
        &["Nama Rute", "Uang Jalan"],
        routes
            .iter()
            .map(|r| [r.name.clone(), r.allowance.normalize().to_string()]),
    )
}

fn active_label(active: bool) -> &'static str {
    if active {
        "Aktif"
    } else {
        "Nonaktif"
    }
}

/// Full delivery-note report, one row per note.
pub fn delivery_notes_csv(notes: &[delivery_note::Model]) -> Result<String, ServiceError> {
    write_csv(
        &[
            "Nomor Surat Jalan",
            "Tanggal",
            "Nomor Polisi",
            "Supir",
            "PT",
            "Rute",
            "Material",
            "Kuantitas Pengisian",
            "Satuan",
            "Status",
            "Tanggal Pengiriman",
            "Kuantitas Terkirim",
            "Nomor Invoice",
        ],
        notes.iter().map(|n| {
            vec![
                n.document_number.clone(),
                date(Some(n.document_date)),
                n.truck_plate.clone(),
                n.driver_name.clone(),
                n.driver_company.clone(),
                n.route_name.clone(),
                n.material_name.clone(),
                n.quantity_loaded.normalize().to_string(),
                n.unit.clone(),
                n.status.to_string(),
                date(n.delivery_date),
                n.quantity_delivered
                    .map(|q| q.normalize().to_string())
                    .unwrap_or_else(|| EMPTY.to_string()),
                text(n.invoice_number.as_deref()),
            ]
        }),
    )
}

/// Delivered notes with their invoice state.
pub fn invoices_csv(notes: &[delivery_note::Model]) -> Result<String, ServiceError> {
    write_csv(
        &[
            "Nomor Surat Jalan",
            "Tanggal Pengiriman",
            "Supir",
            "Rute",
            "Kuantitas Terkirim",
            "Nomor Invoice",
            "Tanggal Invoice",
            "Status Invoice",
        ],
        notes.iter().map(|n| {
            vec![
                n.document_number.clone(),
                date(n.delivery_date),
                n.driver_name.clone(),
                n.route_name.clone(),
                n.quantity_delivered
                    .map(|q| q.normalize().to_string())
                    .unwrap_or_else(|| EMPTY.to_string()),
                text(n.invoice_number.as_deref()),
                date(n.invoice_date),
                if n.is_invoiced() { "sudah" } else { "belum" }.to_string(),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn every_value_is_quoted() {
        let now = Utc::now();
        let routes = vec![route::Model {
            id: Uuid::new_v4(),
            name: "Jakarta-Bandung".into(),
            allowance: dec!(500000.00),
            created_at: now,
            updated_at: now,
        }];
        let csv = routes_csv(&routes).unwrap();
        assert_eq!(
            csv,
            "\"Nama Rute\",\"Uang Jalan\"\n\"Jakarta-Bandung\",\"500000\"\n"
        );
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        let now = Utc::now();
        let materials = vec![material::Model {
            id: Uuid::new_v4(),
            name: "Batu \"split\"".into(),
            unit: "M3".into(),
            created_at: now,
            updated_at: now,
        }];
        let csv = materials_csv(&materials).unwrap();
        assert!(csv.ends_with("\"Batu \"\"split\"\"\",\"M3\"\n"));
    }

    #[test]
    fn missing_values_become_dash() {
        assert_eq!(date(None), "-");
        assert_eq!(text(Some("  ")), "-");
        assert_eq!(text(Some("INV/1")), "INV/1");
    }
}
