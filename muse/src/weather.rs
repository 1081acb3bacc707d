//! Weather context
//!
//! Maps OpenWeatherMap-style icon codes to the category keys used in the
//! content table.

use serde_json::Value;

const ICON_CATEGORIES: [(&str, &str); 18] = [
    ("01d", "day_sunny"),
    ("02d", "day_cloudy"),
    ("03d", "cloudy"),
    ("04d", "cloudy_windy"),
    ("09d", "showers"),
    ("10d", "rain"),
    ("11d", "thunderstorm"),
    ("13d", "snow"),
    ("50d", "fog"),
    ("01n", "night_clear"),
    ("02n", "night_cloudy"),
    ("03n", "night_cloudy"),
    ("04n", "night_cloudy"),
    ("09n", "night_showers"),
    ("10n", "night_rain"),
    ("11n", "night_thunderstorm"),
    ("13n", "night_snow"),
    ("50n", "night_alt_cloudy_windy"),
];

/// Category label for an icon code
pub fn category_for_icon(icon: &str) -> Option<&'static str> {
    ICON_CATEGORIES
        .iter()
        .find(|(code, _)| *code == icon)
        .map(|(_, category)| *category)
}

/// Context change delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextUpdate {
    /// Current weather with its icon code
    CurrentWeather { icon: String },
}

impl ContextUpdate {
    /// Read the icon from a current-weather payload
    ///
    /// Accepts `{"data": {"weather": [{"icon": ..}]}}` or the inner
    /// `{"weather": [..]}` object.
    pub fn from_weather_payload(payload: &Value) -> Option<Self> {
        let data = payload.get("data").unwrap_or(payload);
        let icon = data
            .get("weather")?
            .get(0)?
            .get("icon")?
            .as_str()?;
        Some(ContextUpdate::CurrentWeather {
            icon: icon.to_string(),
        })
    }

    /// Category this update selects, `None` for unknown icons
    pub fn category(&self) -> Option<&'static str> {
        match self {
            ContextUpdate::CurrentWeather { icon } => category_for_icon(icon),
        }
    }
}
