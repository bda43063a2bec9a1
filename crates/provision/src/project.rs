use chrono::Utc;
use serde::Serialize;

/// Request body for creating a project under an account. Field names follow
/// the platform's wire format.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub project_type: String,
    pub contract_type: String,
    pub current_phase: String,
    pub project_value: ProjectValue,
    pub start_date: String,
    pub end_date: String,
    pub job_number: String,
    pub address_line_1: String,
    pub city: String,
    pub state_or_province: String,
    pub postal_code: String,
    pub country: String,
    pub timezone: String,
    pub products: Vec<ProductKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectValue {
    pub value: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductKey {
    pub key: String,
}

impl ProjectSpec {
    /// A throwaway project with a timestamped name so repeated runs never
    /// collide on project names.
    pub fn generated(prefix: &str) -> Self {
        Self::named(&format!(
            "{}Test-Project-{}",
            prefix,
            Utc::now().timestamp_millis()
        ))
    }

    pub fn named(name: &str) -> Self {
        let today = Utc::now().date_naive();
        Self {
            name: name.to_string(),
            project_type: "New Construction".to_string(),
            contract_type: "Unit Price".to_string(),
            current_phase: "Design".to_string(),
            project_value: ProjectValue {
                value: 10_000.0,
                currency: "USD".to_string(),
            },
            start_date: today.format("%Y-%m-%d").to_string(),
            end_date: (today + chrono::Duration::days(365))
                .format("%Y-%m-%d")
                .to_string(),
            job_number: "0000".to_string(),
            address_line_1: "123 Main Street".to_string(),
            city: "San Francisco".to_string(),
            state_or_province: "California".to_string(),
            postal_code: "94105".to_string(),
            country: "United States".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            products: vec![
                ProductKey {
                    key: "docs".to_string(),
                },
                ProductKey {
                    key: "build".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_platform_field_names() {
        let spec = ProjectSpec::named("Fixture-Project");
        let json = serde_json::to_value(&spec).unwrap();
        let object = json.as_object().unwrap();

        assert!(object.contains_key("projectValue"));
        assert!(object.contains_key("jobNumber"));
        assert!(object.contains_key("stateOrProvince"));
        assert!(object.contains_key("startDate"));
        assert_eq!(json["type"], "New Construction");
        assert_eq!(json["projectValue"]["currency"], "USD");
        assert_eq!(json["products"][0]["key"], "docs");
    }

    #[test]
    fn generated_names_carry_the_prefix() {
        let spec = ProjectSpec::generated("E2E-");
        assert!(spec.name.starts_with("E2E-Test-Project-"));
    }
}
