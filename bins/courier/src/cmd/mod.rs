pub mod config;
pub mod error;
pub mod provision;
pub mod publish;

use error::CliError;

/// Разобрать `key=value`. Пустой ключ — ошибка, пустое значение допустимо.
pub(crate) fn parse_pair(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(CliError::Usage(format!("expected key=value, got '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_split_on_first_equals() {
        assert_eq!(parse_pair("trace=a=b").unwrap(), ("trace".into(), "a=b".into()));
        assert_eq!(parse_pair("empty=").unwrap(), ("empty".into(), String::new()));
        assert!(parse_pair("=v").is_err());
        assert!(parse_pair("novalue").is_err());
    }
}
