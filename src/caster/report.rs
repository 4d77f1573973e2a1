use super::ValidationError;

/// One display line per error: `<path>: expected <type>, got <value>`.
pub fn report(errors: &[ValidationError]) -> Vec<String> {
    if errors.is_empty() {
        return vec!["no errors provided".to_string()];
    }
    errors.iter().map(ToString::to_string).collect()
}
