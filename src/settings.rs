//! Settings that tune the built-in mappers and the renderer.
//!
//! Settings are read through `config` from an optional file (any format the
//! `config` crate understands) layered under `LAZYMAP_`-prefixed environment
//! variables, e.g. `LAZYMAP_DATE_FORMATS="%d/%m/%Y,%Y-%m-%d"`.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// chrono formats tried, in order, by the Date mapper.
    pub date_formats: Vec<String>,
    /// chrono formats tried, in order, by the DateTime mapper.
    pub datetime_formats: Vec<String>,
    /// Marker used in place of an instance that is already being rendered.
    pub truncation_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_formats: vec![String::from("%Y-%m-%d")],
            datetime_formats: vec![
                String::from("%Y-%m-%dT%H:%M:%S"),
                String::from("%Y-%m-%d %H:%M:%S"),
            ],
            truncation_marker: String::from("..."),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&str>) -> Result<Settings> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("LAZYMAP")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("date_formats")
                    .with_list_parse_key("datetime_formats"),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }
}
