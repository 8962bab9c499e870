pub struct Validator;

impl Validator {
    pub fn clamp_to_range(value: f64, range: (f64, f64)) -> f64 {
        value.clamp(range.0, range.1)
    }

    pub fn require_finite(name: &str, value: f64) -> Result<f64, String> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("{name} must be a finite number"))
        }
    }

    pub fn validate_option(value: &str, valid: &[&str]) -> bool {
        valid.contains(&value)
    }
}
