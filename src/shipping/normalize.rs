//! Quote normalization and the per-carrier service allow-list.
//!
//! The provider has shipped two incompatible response shapes for the cost
//! endpoint: a flat list with the service embedded in each entry, and the
//! older nested carrier → services → cost-tiers form. Both are accepted here;
//! which one matched is logged so the contract can be confirmed against the
//! live API (open question, see DESIGN.md).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One selectable carrier + service combination with a quoted cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub courier: String,
    pub courier_name: String,
    pub service: String,
    pub service_label: String,
    pub cost: i64,
    pub etd: String,
}

/// Business policy: not every service the provider quotes is offered to the
/// customer.
fn allowed_services(courier: &str) -> &'static [&'static str] {
    match courier {
        "jne" => &["REG", "YES", "OKE"],
        "tiki" => &["REG", "ONS", "ECO"],
        _ => &[],
    }
}

/// Customer-facing relabeling of the provider's service codes.
fn service_label(code: &str) -> Option<&'static str> {
    match code {
        "REG" => Some("Reguler"),
        "YES" | "ONS" => Some("One Night Service"),
        "OKE" | "ECO" => Some("Ekonomis"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct FlatQuote {
    #[serde(default)]
    name: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cost: i64,
    #[serde(default)]
    etd: String,
}

#[derive(Debug, Deserialize)]
struct NestedCarrier {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    costs: Vec<NestedService>,
}

#[derive(Debug, Deserialize)]
struct NestedService {
    #[serde(default)]
    service: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cost: Vec<NestedTier>,
}

#[derive(Debug, Deserialize)]
struct NestedTier {
    #[serde(default)]
    value: i64,
    #[serde(default)]
    etd: String,
}

/// Parses a raw cost payload for `courier` and applies the allow-list and
/// relabeling. Unknown shapes and disallowed services yield nothing rather
/// than an error: a checkout with no quotes renders "no service available",
/// it does not fail.
pub fn normalize_quotes(courier: &str, payload: &Value) -> Vec<ShippingOption> {
    let entries = match payload.as_array() {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    let mut options = Vec::new();
    for entry in entries {
        if entry.get("costs").is_some() {
            tracing::debug!(courier, "cost payload in nested carrier/services shape");
            if let Ok(carrier) = serde_json::from_value::<NestedCarrier>(entry.clone()) {
                let code = nonempty_or(&carrier.code, courier).to_lowercase();
                for svc in carrier.costs {
                    let Some(tier) = svc.cost.first() else { continue };
                    push_option(
                        &mut options,
                        &code,
                        nonempty_or(&carrier.name, &code.to_uppercase()),
                        &svc.service,
                        &svc.description,
                        tier.value,
                        &tier.etd,
                    );
                }
            }
        } else {
            tracing::debug!(courier, "cost payload in flat per-service shape");
            if let Ok(flat) = serde_json::from_value::<FlatQuote>(entry.clone()) {
                let code = nonempty_or(&flat.code, courier).to_lowercase();
                push_option(
                    &mut options,
                    &code,
                    nonempty_or(&flat.name, &code.to_uppercase()),
                    &flat.service,
                    &flat.description,
                    flat.cost,
                    &flat.etd,
                );
            }
        }
    }
    options
}

fn push_option(
    options: &mut Vec<ShippingOption>,
    courier: &str,
    courier_name: &str,
    service: &str,
    description: &str,
    cost: i64,
    etd: &str,
) {
    if !allowed_services(courier).contains(&service) {
        return;
    }
    let label = service_label(service)
        .map(String::from)
        .unwrap_or_else(|| nonempty_or(description, service).to_string());
    options.push(ShippingOption {
        courier: courier.to_string(),
        courier_name: courier_name.to_string(),
        service: service.to_string(),
        service_label: label,
        cost,
        etd: etd.trim_end_matches(" day").trim_end_matches(" hari").to_string(),
    });
}

fn nonempty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_shape_filters_and_relabels() {
        let payload = json!([
            { "name": "Jalur Nugraha Ekakurir (JNE)", "code": "jne", "service": "REG",
              "description": "Layanan Reguler", "cost": 20000, "etd": "2-3 day" },
            { "name": "Jalur Nugraha Ekakurir (JNE)", "code": "jne", "service": "JTR",
              "description": "JNE Trucking", "cost": 95000, "etd": "5-7 day" }
        ]);
        let options = normalize_quotes("jne", &payload);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].service, "REG");
        assert_eq!(options[0].service_label, "Reguler");
        assert_eq!(options[0].cost, 20_000);
        assert_eq!(options[0].etd, "2-3");
    }

    #[test]
    fn nested_shape_produces_same_options() {
        let payload = json!([
            { "code": "jne", "name": "Jalur Nugraha Ekakurir (JNE)", "costs": [
                { "service": "REG", "description": "Layanan Reguler",
                  "cost": [{ "value": 20000, "etd": "2-3", "note": "" }] },
                { "service": "JTR", "description": "JNE Trucking",
                  "cost": [{ "value": 95000, "etd": "5-7", "note": "" }] }
            ]}
        ]);
        let options = normalize_quotes("jne", &payload);
        assert_eq!(options.len(), 1);
        assert_eq!(
            options[0],
            ShippingOption {
                courier: "jne".into(),
                courier_name: "Jalur Nugraha Ekakurir (JNE)".into(),
                service: "REG".into(),
                service_label: "Reguler".into(),
                cost: 20_000,
                etd: "2-3".into(),
            }
        );
    }

    #[test]
    fn two_carriers_each_with_one_allowed_service() {
        let jne = json!([
            { "code": "jne", "name": "JNE", "service": "YES", "cost": 35000, "etd": "1 day" },
            { "code": "jne", "name": "JNE", "service": "JTR", "cost": 90000, "etd": "6 day" }
        ]);
        let tiki = json!([
            { "code": "tiki", "name": "TIKI", "service": "ECO", "cost": 17000, "etd": "4 day" },
            { "code": "tiki", "name": "TIKI", "service": "TRC", "cost": 80000, "etd": "7 day" }
        ]);
        let mut options = normalize_quotes("jne", &jne);
        options.extend(normalize_quotes("tiki", &tiki));

        let pairs: Vec<(&str, &str)> = options
            .iter()
            .map(|o| (o.courier.as_str(), o.service.as_str()))
            .collect();
        assert_eq!(pairs, vec![("jne", "YES"), ("tiki", "ECO")]);
        assert_eq!(options[0].service_label, "One Night Service");
        assert_eq!(options[1].service_label, "Ekonomis");
    }

    #[test]
    fn unknown_shape_yields_no_options() {
        assert!(normalize_quotes("jne", &json!({ "error": "boom" })).is_empty());
        assert!(normalize_quotes("jne", &json!([])).is_empty());
    }

    #[test]
    fn entries_missing_carrier_code_fall_back_to_requested_courier() {
        let payload = json!([
            { "service": "REG", "cost": 12000, "etd": "3 day" }
        ]);
        let options = normalize_quotes("jne", &payload);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].courier, "jne");
        assert_eq!(options[0].courier_name, "JNE");
    }
}
