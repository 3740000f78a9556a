//! Mirror plot view for a selected match

use serde::{Deserialize, Serialize};

const METABOLOMICS_USI_URL: &str = "https://metabolomics-usi.gnps2.org";
const REFERENCE_DATASET: &str = "MSV000084314";
const REFERENCE_MGF_DIR: &str = "updates/2020-11-18_mwang87_d115210a/other/MGF";

/// Shown instead of a plot when no row is selected
pub const NO_SELECTION_PROMPT: &str = "Choose Match to Show Mirror Plot";

/// The columns of a result table row the mirror plot needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRow {
    #[serde(rename = "Accession")]
    pub accession: String,
    #[serde(rename = "DB Scan", deserialize_with = "scan_string")]
    pub db_scan: String,
}

// Table rows may carry the scan as a JSON number
fn scan_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected scan string or number, got {other}"
        ))),
    }
}

impl MatchRow {
    /// USI of the matched spectrum in the reference MGF files
    pub fn database_usi(&self) -> String {
        format!(
            "mzspec:{REFERENCE_DATASET}:{REFERENCE_MGF_DIR}/{}.mgf:scan:{}",
            self.accession, self.db_scan
        )
    }
}

/// External links for one query/match pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorLinks {
    /// Interactive viewer page
    pub viewer_url: String,
    /// Rendered SVG mirror plot
    pub image_url: String,
}

impl MirrorLinks {
    pub fn new(query_usi: &str, row: &MatchRow) -> Self {
        let params = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("usi1", query_usi)
            .append_pair("usi2", &row.database_usi())
            .finish();
        Self {
            viewer_url: format!("{METABOLOMICS_USI_URL}/dashinterface?{params}"),
            image_url: format!("{METABOLOMICS_USI_URL}/svg/mirror/?{params}"),
        }
    }
}

/// What the mirror plot panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorView {
    Prompt,
    Plot(MirrorLinks),
}

impl MirrorView {
    pub fn for_selection(query_usi: &str, row: Option<&MatchRow>) -> Self {
        match row {
            Some(row) => MirrorView::Plot(MirrorLinks::new(query_usi, row)),
            None => MirrorView::Prompt,
        }
    }

    /// HTML fragment for the panel
    pub fn to_html(&self) -> String {
        match self {
            MirrorView::Prompt => NO_SELECTION_PROMPT.to_string(),
            MirrorView::Plot(links) => format!(
                r#"<a href="{viewer}" target="_blank">View Spectrum Mirror Plot in Metabolomics Resolver</a><br><img src="{image}">"#,
                viewer = crate::page::escape_html(&links.viewer_url),
                image = crate::page::escape_html(&links.image_url),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> MatchRow {
        MatchRow {
            accession: "MSV000082493".to_string(),
            db_scan: "1234".to_string(),
        }
    }

    #[test]
    fn test_database_usi() {
        assert_eq!(
            row().database_usi(),
            "mzspec:MSV000084314:updates/2020-11-18_mwang87_d115210a/other/MGF/MSV000082493.mgf:scan:1234"
        );
    }

    #[test]
    fn test_mirror_links() {
        let links = MirrorLinks::new("mzspec:GNPS:GNPS-LIBRARY:accession:CCMSLIB00011432553", &row());
        let expected_params = "usi1=mzspec%3AGNPS%3AGNPS-LIBRARY%3Aaccession%3ACCMSLIB00011432553\
            &usi2=mzspec%3AMSV000084314%3Aupdates%2F2020-11-18_mwang87_d115210a%2Fother%2FMGF%2FMSV000082493.mgf%3Ascan%3A1234";
        assert_eq!(
            links.image_url,
            format!("https://metabolomics-usi.gnps2.org/svg/mirror/?{expected_params}")
        );
        assert_eq!(
            links.viewer_url,
            format!("https://metabolomics-usi.gnps2.org/dashinterface?{expected_params}")
        );
    }

    #[test]
    fn test_row_from_table_json() {
        let row: MatchRow =
            serde_json::from_str(r#"{"Accession": "MSV000082493", "DB Scan": 1234, "Cosine": 0.91}"#)
                .unwrap();
        assert_eq!(row, self::row());
    }

    #[test]
    fn test_no_selection_prompts() {
        let view = MirrorView::for_selection("x", None);
        assert_eq!(view, MirrorView::Prompt);
        assert_eq!(view.to_html(), "Choose Match to Show Mirror Plot");
    }

    #[test]
    fn test_plot_html() {
        let html = MirrorView::for_selection("x", Some(&row())).to_html();
        assert!(html.contains(r#"target="_blank""#));
        assert!(html.contains("<img src=\"https://metabolomics-usi.gnps2.org/svg/mirror/?usi1=x&amp;usi2="));
    }
}
