use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::error::ConfigError;

pub const FOLDER_PATH_KEY: &str = "folderPath";
pub const OUTPUT_PATH_KEY: &str = "outputPath";
pub const EXCEL_PATH_KEY: &str = "excelFilePath";
pub const FOLDER_COUNT_KEY: &str = "folderCount";
pub const FILE_EXTENSION_KEY: &str = "fileExtension";

pub const DEFAULT_EXTENSION: &str = "txt";

lazy_static! {
    // `key=value` or `key: value`; the value is taken literally, no `$VAR` expansion.
    static ref SETTING_RE: Regex = Regex::new(r"^\s*([^=:\s]+)\s*[=:]\s*(.*?)\s*$").unwrap();
}

/// Settings for one run, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub input_root: PathBuf,
    /// Destination of the detail CSV; `None` when the key is left empty.
    pub output_path: Option<PathBuf>,
    pub report_path: PathBuf,
    /// Folders per worker when sizing the pool.
    pub partition_size: usize,
    pub file_extension: String,
}

impl RunConfiguration {
    /// Loads a flat `key=value` file. Values are kept exactly as written.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let read_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let reader = BufReader::new(File::open(path).map_err(read_err)?);
        let mut pairs = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(read_err)?;
            if let Some(pair) = parse_setting(&line).map_err(|text| ConfigError::Syntax {
                path: path.to_path_buf(),
                line: idx + 1,
                text,
            })? {
                pairs.push(pair);
            }
        }
        debug!("Read {} settings from {}", pairs.len(), path.display());
        Self::from_pairs(pairs)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let settings: HashMap<String, String> = pairs.into_iter().collect();
        let required = |key: &'static str| -> Result<String, ConfigError> {
            settings
                .get(key)
                .map(|v| v.trim().to_string())
                .ok_or(ConfigError::MissingKey(key))
        };

        let input_root = required(FOLDER_PATH_KEY)?;
        if input_root.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: FOLDER_PATH_KEY,
                value: input_root,
                reason: "path must not be empty".to_string(),
            });
        }
        let output_path = required(OUTPUT_PATH_KEY)?;
        let report_path = required(EXCEL_PATH_KEY)?;
        if report_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: EXCEL_PATH_KEY,
                value: report_path,
                reason: "path must not be empty".to_string(),
            });
        }

        let raw_count = required(FOLDER_COUNT_KEY)?;
        let partition_size = match raw_count.parse::<usize>() {
            Ok(0) => {
                return Err(ConfigError::InvalidValue {
                    key: FOLDER_COUNT_KEY,
                    value: raw_count,
                    reason: "must be at least 1".to_string(),
                })
            }
            Ok(n) => n,
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    key: FOLDER_COUNT_KEY,
                    value: raw_count,
                    reason: e.to_string(),
                })
            }
        };

        let file_extension = settings
            .get(FILE_EXTENSION_KEY)
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(Self {
            input_root: PathBuf::from(input_root),
            output_path: (!output_path.is_empty()).then(|| PathBuf::from(output_path)),
            report_path: PathBuf::from(report_path),
            partition_size,
            file_extension,
        })
    }
}

/// `Ok(None)` for blank and comment lines, `Err` with the line text when it is not a setting.
fn parse_setting(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return Ok(None);
    }
    match SETTING_RE.captures(line) {
        Some(caps) => Ok(Some((caps[1].to_string(), caps[2].to_string()))),
        None => Err(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_key_value_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config2.txt");
        fs::write(
            &path,
            "# run settings\nfolderPath=./data\noutputPath=./output.csv\nexcelFilePath=./output.xlsx\nfolderCount=2\n",
        )
        .unwrap();

        let config = RunConfiguration::load(&path).unwrap();
        assert_eq!(config.input_root, PathBuf::from("./data"));
        assert_eq!(config.output_path, Some(PathBuf::from("./output.csv")));
        assert_eq!(config.report_path, PathBuf::from("./output.xlsx"));
        assert_eq!(config.partition_size, 2);
        assert_eq!(config.file_extension, "txt");
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = RunConfiguration::from_pairs(pairs(&[
            ("folderPath", "./data"),
            ("outputPath", "./out.csv"),
            ("folderCount", "2"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("excelFilePath")));
    }

    #[test]
    fn folder_count_must_be_positive_integer() {
        for bad in ["zero", "0", "-3"] {
            let err = RunConfiguration::from_pairs(pairs(&[
                ("folderPath", "./data"),
                ("outputPath", ""),
                ("excelFilePath", "./r.xlsx"),
                ("folderCount", bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: "folderCount", .. }));
        }
    }

    #[test]
    fn empty_output_disables_csv_and_extension_is_normalized() {
        let config = RunConfiguration::from_pairs(pairs(&[
            ("folderPath", "./data"),
            ("outputPath", ""),
            ("excelFilePath", "./r.xlsx"),
            ("folderCount", "3"),
            ("fileExtension", ".log"),
        ]))
        .unwrap();
        assert_eq!(config.output_path, None);
        assert_eq!(config.file_extension, "log");
    }

    #[test]
    fn dollar_values_are_not_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(
            &path,
            "folderPath = /data/$HOME/logs\noutputPath=${PATH}.csv\nexcelFilePath: ./out.xlsx\n\n! legacy comment\nfolderCount=1\n",
        )
        .unwrap();

        let config = RunConfiguration::load(&path).unwrap();
        assert_eq!(config.input_root, PathBuf::from("/data/$HOME/logs"));
        assert_eq!(config.output_path, Some(PathBuf::from("${PATH}.csv")));
        assert_eq!(config.report_path, PathBuf::from("./out.xlsx"));
    }

    #[test]
    fn line_without_separator_is_a_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(&path, "folderPath=./data\nfolderCount\n").unwrap();

        let err = RunConfiguration::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: 2, .. }));
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = RunConfiguration::load(Path::new("/nonexistent/config.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.txt"));
    }
}
