use std::env;

/// Returns the value of environment variable `key`, or `fallback` (or empty
/// string) if unset.
pub fn get_env(key: &str, fallback: Option<&str>) -> String {
    env::var(key).unwrap_or_else(|_| fallback.unwrap_or("").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_falls_back_when_unset() {
        assert_eq!(get_env("SEEK_TUNE_TEST_UNSET_VAR", Some("fallback")), "fallback");
    }
}
