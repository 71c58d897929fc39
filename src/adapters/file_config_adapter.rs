//! INI file configuration adapter.

use crate::domain::error::BacktesterError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktesterError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| BacktesterError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
directory = ./dataset
symbols = AAPL,MSFT

[strategy]
name = EMA below close
program = Indicator("EMA", stock, time) < Indicator("ClosePrice", stock, time)
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "directory"),
            Some("./dataset".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("EMA below close".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "program"),
            Some(
                "Indicator(\"EMA\", stock, time) < Indicator(\"ClosePrice\", stock, time)"
                    .to_string()
            )
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank_key() {
        let adapter = FileConfigAdapter::from_string("[data]\ndirectory = \n").unwrap();
        assert_eq!(adapter.get_string("data", "directory"), None);
        assert_eq!(adapter.get_string("data", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Backtest]\nStop_Loss = 0.05\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "stop_loss", 0.0), 0.05);
    }

    #[test]
    fn get_int_returns_value() {
        let adapter = FileConfigAdapter::from_string("[indicators]\nwindow = 20\n").unwrap();
        assert_eq!(adapter.get_int("indicators", "window", 40), 20);
    }

    #[test]
    fn get_int_returns_default_for_missing() {
        let adapter = FileConfigAdapter::from_string("[indicators]\n").unwrap();
        assert_eq!(adapter.get_int("indicators", "window", 40), 40);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_hold = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_hold", -1), -1);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ntransaction_cost = 0.0025\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "transaction_cost", 0.0), 0.0025);
    }

    #[test]
    fn get_double_returns_default_for_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nstop_loss = not_a_number\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "stop_loss", 99.9), 99.9);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(!adapter.get_bool("backtest", "d", true));
        assert!(!adapter.get_bool("backtest", "e", true));
        assert!(!adapter.get_bool("backtest", "f", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nexit_on_signal = maybe\n").unwrap();
        assert!(adapter.get_bool("backtest", "exit_on_signal", true));
        assert!(!adapter.get_bool("backtest", "missing", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ndirectory = /var/prices\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "directory"),
            Some("/var/prices".to_string())
        );
    }

    #[test]
    fn from_file_reports_config_parse_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(
            matches!(err, BacktesterError::ConfigParse { ref file, .. } if file.ends_with("config.ini"))
        );
    }
}
