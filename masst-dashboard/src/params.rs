//! Search form model
//!
//! Holds what the user typed into the data selection card. The bounds below
//! are only rendered into the input widgets; nothing here rejects an
//! out-of-range value before it reaches the MASST client.

use crate::dispatch::SearchEvent;
use serde::Deserialize;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PRECURSOR_TOLERANCE: f64 = 0.05;
pub const DEFAULT_FRAGMENT_TOLERANCE: f64 = 0.05;
pub const DEFAULT_COSINE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_MIN_MATCHED_PEAKS: u32 = 4;
pub const DEFAULT_ANALOG_BELOW: f64 = 130.0;
pub const DEFAULT_ANALOG_ABOVE: f64 = 200.0;

/// Range and step of a numeric input widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Bounds {
    const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const PRECURSOR_TOLERANCE_BOUNDS: Bounds = Bounds::new(0.01, 0.5, 0.02);
pub const FRAGMENT_TOLERANCE_BOUNDS: Bounds = Bounds::new(0.01, 0.5, 0.02);
pub const COSINE_THRESHOLD_BOUNDS: Bounds = Bounds::new(0.5, 1.0, 0.05);
pub const MIN_MATCHED_PEAKS_BOUNDS: Bounds = Bounds::new(1.0, 100.0, 1.0);
pub const DELTA_MASS_BOUNDS: Bounds = Bounds::new(0.0, 300.0, 1.0);
pub const PRECURSOR_MZ_BOUNDS: Bounds = Bounds::new(1.0, 10000.0, 1.0);
pub const CHARGE_BOUNDS: Bounds = Bounds::new(1.0, 40.0, 1.0);

/// What is being searched for
#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumQuery {
    /// A Universal Spectrum Identifier or GNPS library accession
    Usi(String),
    /// A raw peak list, one "m/z intensity" pair per line
    Peaks { peaks: String, precursor_mz: String },
}

/// Mass offset window for analog search (Da)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalogWindow {
    pub below: f64,
    pub above: f64,
}

impl Default for AnalogWindow {
    fn default() -> Self {
        Self {
            below: DEFAULT_ANALOG_BELOW,
            above: DEFAULT_ANALOG_ABOVE,
        }
    }
}

/// Everything the MASST client needs for one search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParameters {
    pub query: SpectrumQuery,
    pub precursor_tolerance: f64,
    pub fragment_tolerance: f64,
    pub cosine_threshold: f64,
    pub min_matched_peaks: u32,
    pub analog: bool,
    pub analog_window: AnalogWindow,
}

impl SearchParameters {
    /// Parameters with the dashboard defaults for the given query
    pub fn new(query: SpectrumQuery) -> Self {
        Self {
            query,
            precursor_tolerance: DEFAULT_PRECURSOR_TOLERANCE,
            fragment_tolerance: DEFAULT_FRAGMENT_TOLERANCE,
            cosine_threshold: DEFAULT_COSINE_THRESHOLD,
            min_matched_peaks: DEFAULT_MIN_MATCHED_PEAKS,
            analog: false,
            analog_window: AnalogWindow::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_analog(mut self, below: f64, above: f64) -> Self {
        self.analog = true;
        self.analog_window = AnalogWindow { below, above };
        self
    }

    /// Build parameters from submitted form state.
    ///
    /// `event` decides whether the USI box or the peak list is used; the
    /// other input is ignored even if filled in.
    pub fn from_form(form: &SearchForm, event: SearchEvent) -> Self {
        let query = match event {
            SearchEvent::SearchByIdentifier => SpectrumQuery::Usi(form.usi1.trim().to_string()),
            SearchEvent::SearchByPeaks => SpectrumQuery::Peaks {
                peaks: form.peaks.clone(),
                precursor_mz: form.precursor_mz.trim().to_string(),
            },
        };

        Self {
            query,
            precursor_tolerance: parse_or(
                "pm_tolerance",
                &form.pm_tolerance,
                DEFAULT_PRECURSOR_TOLERANCE,
            ),
            fragment_tolerance: parse_or(
                "fragment_tolerance",
                &form.fragment_tolerance,
                DEFAULT_FRAGMENT_TOLERANCE,
            ),
            cosine_threshold: parse_or(
                "cosine_threshold",
                &form.cosine_threshold,
                DEFAULT_COSINE_THRESHOLD,
            ),
            min_matched_peaks: parse_or(
                "min_matched_peaks",
                &form.min_matched_peaks,
                DEFAULT_MIN_MATCHED_PEAKS,
            ),
            analog: form.analog_select == "Yes",
            analog_window: AnalogWindow {
                below: parse_or("delta_mass_below", &form.delta_mass_below, DEFAULT_ANALOG_BELOW),
                above: parse_or("delta_mass_above", &form.delta_mass_above, DEFAULT_ANALOG_ABOVE),
            },
        }
    }
}

fn parse_or<T>(field: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(field, value = raw, %default, "Unparseable form value, using default");
            default
        }
    }
}

/// Raw form fields as posted by the dashboard page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub usi1: String,
    pub peaks: String,
    pub precursor_mz: String,
    /// Shown on the page but not forwarded; the MGF always says CHARGE=1
    pub charge: String,
    pub pm_tolerance: String,
    pub fragment_tolerance: String,
    pub cosine_threshold: String,
    pub min_matched_peaks: String,
    pub analog_select: String,
    pub delta_mass_below: String,
    pub delta_mass_above: String,
}

impl Default for SearchForm {
    fn default() -> Self {
        Self {
            usi1: String::new(),
            peaks: String::new(),
            precursor_mz: String::new(),
            charge: String::new(),
            pm_tolerance: DEFAULT_PRECURSOR_TOLERANCE.to_string(),
            fragment_tolerance: DEFAULT_FRAGMENT_TOLERANCE.to_string(),
            cosine_threshold: DEFAULT_COSINE_THRESHOLD.to_string(),
            min_matched_peaks: DEFAULT_MIN_MATCHED_PEAKS.to_string(),
            analog_select: "No".to_string(),
            delta_mass_below: DEFAULT_ANALOG_BELOW.to_string(),
            delta_mass_above: DEFAULT_ANALOG_ABOVE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_form_gives_default_parameters() {
        let form = SearchForm {
            usi1: "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00011432553".to_string(),
            ..Default::default()
        };
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByIdentifier);
        let expected = SearchParameters::new(SpectrumQuery::Usi(
            "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00011432553".to_string(),
        ));
        assert_eq!(params, expected);
    }

    #[test]
    fn test_event_selects_query_kind() {
        let form = SearchForm {
            usi1: "mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00011432558".to_string(),
            peaks: "100.0 5\n120.0 10".to_string(),
            precursor_mz: " 150.1 ".to_string(),
            ..Default::default()
        };
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByPeaks);
        assert_eq!(
            params.query,
            SpectrumQuery::Peaks {
                peaks: "100.0 5\n120.0 10".to_string(),
                precursor_mz: "150.1".to_string(),
            }
        );
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let form = SearchForm {
            pm_tolerance: "2.5".to_string(),
            cosine_threshold: "0.1".to_string(),
            min_matched_peaks: "500".to_string(),
            ..Default::default()
        };
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByIdentifier);
        assert_eq!(params.precursor_tolerance, 2.5);
        assert!(!PRECURSOR_TOLERANCE_BOUNDS.contains(params.precursor_tolerance));
        assert_eq!(params.cosine_threshold, 0.1);
        assert_eq!(params.min_matched_peaks, 500);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let form = SearchForm {
            fragment_tolerance: "abc".to_string(),
            min_matched_peaks: "4.5".to_string(),
            delta_mass_above: String::new(),
            ..Default::default()
        };
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByIdentifier);
        assert_eq!(params.fragment_tolerance, DEFAULT_FRAGMENT_TOLERANCE);
        assert_eq!(params.min_matched_peaks, DEFAULT_MIN_MATCHED_PEAKS);
        assert_eq!(params.analog_window.above, DEFAULT_ANALOG_ABOVE);
    }

    #[test]
    fn test_analog_select() {
        let mut form = SearchForm {
            analog_select: "Yes".to_string(),
            delta_mass_below: "50".to_string(),
            ..Default::default()
        };
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByIdentifier);
        assert!(params.analog);
        assert_eq!(params.analog_window, AnalogWindow { below: 50.0, above: 200.0 });

        form.analog_select = "yes".to_string();
        let params = SearchParameters::from_form(&form, SearchEvent::SearchByIdentifier);
        assert!(!params.analog);
    }
}
