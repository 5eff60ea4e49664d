use std::{collections::BTreeMap, fmt};

use serde::Serialize;

/// Field-keyed validation failures, reported to the client as one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Collects `(field, message)` pairs. Only the first message per field is
/// kept.
#[derive(Debug, Default)]
pub struct Validator {
    prefix: Option<String>,
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        let key = match &self.prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_owned(),
        };
        self.errors.0.entry(key).or_insert_with(|| message.to_owned());
    }

    /// Run `f` with every field key prefixed by `index`, for validating the
    /// items of a batch body.
    pub fn item<F>(&mut self, index: usize, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let previous = self.prefix.replace(index.to_string());
        f(self);
        self.prefix = previous;
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

pub const NAME_MIN_BYTES: usize = 3;
pub const NAME_MAX_BYTES: usize = 500;

pub fn validate_location_name(v: &mut Validator, name: &str) {
    v.check(!name.is_empty(), "name", "must be provided");
    v.check(
        name.len() >= NAME_MIN_BYTES,
        "name",
        "must be at least 3 bytes long",
    );
    v.check(
        name.len() <= NAME_MAX_BYTES,
        "name",
        "must not be more than 500 bytes long",
    );
}

pub fn validate_reading(
    v: &mut Validator,
    location_id: i64,
    co2: i32,
    temperature: f64,
    humidity: i32,
) {
    v.check(location_id > 0, "location_id", "must be greater than zero");

    v.check(co2 >= 0, "co2", "must be greater than or equal to zero ppm");
    v.check(co2 < 5000, "co2", "must be less than 5000 ppm");

    v.check(temperature.is_finite(), "temperature", "must be a finite number");
    v.check(
        temperature >= -100.0,
        "temperature",
        "must be greater than or equal to -100 degrees Celsius",
    );
    v.check(
        temperature <= 100.0,
        "temperature",
        "must be less than or equal to 100 degrees Celsius",
    );

    v.check(humidity >= 0, "humidity", "must be greater than or equal to zero percent");
    v.check(humidity <= 100, "humidity", "must be less than or equal to 100 percent");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_validator_is_valid() {
        assert!(Validator::new().into_result().is_ok());
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut v = Validator::new();
        validate_location_name(&mut v, "");
        let errors = v.into_result().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("name"), Some("must be provided"));
    }

    #[test]
    fn location_name_bounds() {
        let longest = "x".repeat(500);
        let too_long = "x".repeat(501);
        for (name, ok) in [
            ("ab", false),
            ("abc", true),
            ("Office", true),
            (longest.as_str(), true),
            (too_long.as_str(), false),
        ] {
            let mut v = Validator::new();
            validate_location_name(&mut v, name);
            assert_eq!(v.into_result().is_ok(), ok, "name of {} bytes", name.len());
        }
    }

    #[test]
    fn name_length_counts_bytes() {
        let mut v = Validator::new();
        // two characters, four bytes
        validate_location_name(&mut v, "öä");
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn reading_within_domain_is_valid() {
        let mut v = Validator::new();
        validate_reading(&mut v, 1, 0, -100.0, 0);
        validate_reading(&mut v, 1, 4999, 100.0, 100);
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn reading_errors_are_accumulated() {
        let mut v = Validator::new();
        validate_reading(&mut v, 0, 5000, 100.5, -1);
        let errors = v.into_result().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("co2"), Some("must be less than 5000 ppm"));
        assert!(errors.get("location_id").is_some());
        assert!(errors.get("temperature").is_some());
        assert!(errors.get("humidity").is_some());
    }

    #[test]
    fn nan_temperature_is_rejected() {
        let mut v = Validator::new();
        validate_reading(&mut v, 1, 400, f64::NAN, 50);
        assert_eq!(
            v.into_result().unwrap_err().get("temperature"),
            Some("must be a finite number")
        );
    }

    #[test]
    fn items_are_prefixed_by_index() {
        let mut v = Validator::new();
        v.item(0, |v| validate_reading(v, 1, 400, 20.0, 50));
        v.item(1, |v| validate_reading(v, 1, -1, 20.0, 50));
        v.check(false, "body", "top level");

        let errors = v.into_result().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("1.co2").is_some());
        assert_eq!(errors.get("body"), Some("top level"));
    }

    #[test]
    fn display_joins_fields() {
        let mut v = Validator::new();
        v.add_error("a", "bad");
        v.add_error("b", "worse");
        assert_eq!(v.into_result().unwrap_err().to_string(), "a: bad; b: worse");
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut v = Validator::new();
        v.add_error("name", "must be provided");
        let json = serde_json::to_value(v.into_result().unwrap_err()).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "must be provided" }));
    }
}
