use super::{IntegrationItem, ItemType};
use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
use serde_json::Value;
use tracing::warn;

/// Map one HubSpot record into an [`IntegrationItem`].
///
/// Total: missing or malformed fields fall back to placeholder names and
/// null timestamps. Unparseable timestamps are logged and dropped.
pub fn normalize(record: &Value, item_type: ItemType, app_base_url: &str) -> IntegrationItem {
    let raw_id = record_id(record);
    let properties = record.get("properties").unwrap_or(&Value::Null);

    let mut item = IntegrationItem::new(
        format!("{}_{}", raw_id, item_type),
        display_name(properties, item_type),
        item_type,
    );

    item.creation_time = timestamp(
        &raw_id,
        "createdate",
        [prop(properties, "createdate"), prop(record, "createdAt")],
    );
    item.last_modified_time = timestamp(
        &raw_id,
        "hs_lastmodifieddate",
        [
            prop(properties, "hs_lastmodifieddate"),
            prop(properties, "lastmodifieddate"),
            prop(record, "updatedAt"),
        ],
    );

    if item_type == ItemType::Contact && !raw_id.is_empty() {
        item.url = Some(format!(
            "{}/contacts/{}",
            app_base_url.trim_end_matches('/'),
            raw_id
        ));
    }

    item
}

/// Parse a HubSpot ISO-8601 timestamp.
///
/// A trailing `Z` is rewritten to `+00:00` first. Timestamps without an
/// offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let normalized = match raw.strip_suffix('Z') {
        Some(head) => format!("{}+00:00", head),
        None => raw.to_string(),
    };

    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|err| {
            NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .map_err(|_| err)
        })
}

fn record_id(record: &Value) -> String {
    match record.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}

/// Non-empty string property, if any.
fn prop<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn display_name(properties: &Value, item_type: ItemType) -> String {
    match item_type {
        ItemType::Contact => {
            let full = [prop(properties, "firstname"), prop(properties, "lastname")]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !full.is_empty() {
                full
            } else {
                prop(properties, "email")
                    .unwrap_or("Unnamed Contact")
                    .to_string()
            }
        }
        ItemType::Company => prop(properties, "name")
            .unwrap_or("Unnamed Company")
            .to_string(),
        ItemType::Deal => prop(properties, "dealname")
            .unwrap_or("Unnamed Deal")
            .to_string(),
    }
}

fn timestamp<const N: usize>(
    record_id: &str,
    field: &str,
    candidates: [Option<&str>; N],
) -> Option<DateTime<Utc>> {
    let mut failed = None;
    for raw in candidates.into_iter().flatten() {
        match parse_timestamp(raw) {
            Ok(ts) => return Some(ts),
            Err(e) => failed = Some((raw, e)),
        }
    }

    if let Some((raw, e)) = failed {
        warn!(record_id, field, value = raw, error = %e, "Unparseable timestamp, leaving it empty");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const APP: &str = "https://app.hubspot.com";

    #[test]
    fn test_contact_full_name() {
        let record = json!({
            "id": "101",
            "properties": {
                "firstname": "Ada",
                "lastname": "Lovelace",
                "email": "ada@example.com",
                "createdate": "2024-03-01T10:00:00.000Z",
                "hs_lastmodifieddate": "2024-03-02T11:30:00Z"
            }
        });

        let item = normalize(&record, ItemType::Contact, APP);
        assert_eq!(item.id, "101_Contact");
        assert_eq!(item.name, "Ada Lovelace");
        assert_eq!(item.item_type, ItemType::Contact);
        assert_eq!(
            item.creation_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            item.last_modified_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 11, 30, 0).unwrap())
        );
        assert_eq!(item.url.as_deref(), Some("https://app.hubspot.com/contacts/101"));
    }

    #[test]
    fn test_contact_name_fallbacks() {
        let only_first = json!({"id": "1", "properties": {"firstname": "Grace"}});
        assert_eq!(normalize(&only_first, ItemType::Contact, APP).name, "Grace");

        let only_email = json!({"id": "2", "properties": {"firstname": "", "email": "x@y.z"}});
        assert_eq!(normalize(&only_email, ItemType::Contact, APP).name, "x@y.z");

        let nothing = json!({"id": "3", "properties": {}});
        assert_eq!(normalize(&nothing, ItemType::Contact, APP).name, "Unnamed Contact");
    }

    #[test]
    fn test_company_and_deal_names() {
        let company = json!({"id": "7", "properties": {"name": "Initech"}});
        let item = normalize(&company, ItemType::Company, APP);
        assert_eq!(item.name, "Initech");
        assert_eq!(item.id, "7_Company");
        assert_eq!(item.url, None);

        let unnamed = json!({"id": "8"});
        assert_eq!(normalize(&unnamed, ItemType::Company, APP).name, "Unnamed Company");

        let deal = json!({"id": "9", "properties": {"dealname": "Renewal"}});
        assert_eq!(normalize(&deal, ItemType::Deal, APP).name, "Renewal");
        let unnamed = json!({"id": "10", "properties": {"amount": "5"}});
        assert_eq!(normalize(&unnamed, ItemType::Deal, APP).name, "Unnamed Deal");
    }

    #[test]
    fn test_same_raw_id_distinct_across_types() {
        let record = json!({"id": "55", "properties": {}});
        let ids: Vec<String> = ItemType::ALL
            .iter()
            .map(|t| normalize(&record, *t, APP).id)
            .collect();
        assert_eq!(ids, vec!["55_Contact", "55_Company", "55_Deal"]);
    }

    #[test]
    fn test_garbage_record_is_total() {
        for record in [json!(null), json!("text"), json!({"properties": 12}), json!([])] {
            let item = normalize(&record, ItemType::Contact, APP);
            assert_eq!(item.name, "Unnamed Contact");
            assert_eq!(item.creation_time, None);
            assert_eq!(item.last_modified_time, None);
            assert_eq!(item.url, None);
        }
    }

    #[test]
    fn test_bad_timestamp_becomes_null() {
        let record = json!({
            "id": "4",
            "properties": {"createdate": "yesterday", "hs_lastmodifieddate": "2024-13-45T00:00:00Z"}
        });
        let item = normalize(&record, ItemType::Deal, APP);
        assert_eq!(item.creation_time, None);
        assert_eq!(item.last_modified_time, None);
    }

    #[test]
    fn test_top_level_timestamps_used_as_fallback() {
        let record = json!({
            "id": "5",
            "createdAt": "2023-01-01T00:00:00Z",
            "updatedAt": "2023-02-01T00:00:00Z",
            "properties": {"name": "Acme"}
        });
        let item = normalize(&record, ItemType::Company, APP);
        assert_eq!(
            item.creation_time,
            Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            item.last_modified_time,
            Some(Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unparseable_property_falls_through_to_top_level() {
        let record = json!({
            "id": "6",
            "createdAt": "2023-04-01T08:00:00Z",
            "updatedAt": "2023-04-02T08:00:00Z",
            "properties": {
                "name": "Globex",
                "createdate": "last tuesday",
                "hs_lastmodifieddate": "soon"
            }
        });
        let item = normalize(&record, ItemType::Company, APP);
        assert_eq!(
            item.creation_time,
            Some(Utc.with_ymd_and_hms(2023, 4, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(
            item.last_modified_time,
            Some(Utc.with_ymd_and_hms(2023, 4, 2, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_numeric_id() {
        let record = json!({"id": 77, "properties": {"dealname": "Big"}});
        assert_eq!(normalize(&record, ItemType::Deal, APP).id, "77_Deal");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp("2024-05-06T07:08:09Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-06T07:08:09+00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-06T09:08:09+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-06T07:08:09").unwrap(), expected);
        assert!(parse_timestamp("not a date").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
