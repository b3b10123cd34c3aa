//! Creative ids and sizes from ad-serving impression URLs.

use crate::error::Result;
use crate::rules::{Finding, RequestView};
use bidlens_core::RequestId;
use serde::{Deserialize, Serialize};

const GAM_ADVIEW: &str = "googleads.g.doubleclick.net/pagead/adview";

/// Platform that served a creative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativePlatform {
    /// Google Ad Manager
    GoogleAdManager,
    /// Amazon ad delivery
    Amazon,
}

/// A served creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeDetail {
    /// Capture the creative came from
    pub request_id: RequestId,
    /// Impression URL
    pub url: String,
    /// Serving platform
    pub platform: CreativePlatform,
    /// Creative id
    pub creative_id: Option<String>,
    /// `WxH` or the platform's size string
    pub size: Option<String>,
}

pub(crate) fn is_gam_adview(view: &RequestView<'_>) -> bool {
    view.url().contains(GAM_ADVIEW)
}

pub(crate) fn extract_gam_creative(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    Ok(vec![detail(
        view,
        CreativePlatform::GoogleAdManager,
        &["ad_id", "crid"],
    )])
}

pub(crate) fn extract_amazon_creative(view: &RequestView<'_>) -> Result<Vec<Finding>> {
    Ok(vec![detail(view, CreativePlatform::Amazon, &["crid"])])
}

fn detail(view: &RequestView<'_>, platform: CreativePlatform, id_params: &[&str]) -> Finding {
    let params = view.query();
    Finding::Creative(CreativeDetail {
        request_id: view.request.id.clone(),
        url: view.request.url.clone(),
        platform,
        creative_id: params.first_of(id_params).map(str::to_string),
        size: params.first_of(&["sz"]).map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidlens_capture::{CapturedRequest, RequestStarted};
    use bidlens_core::TabId;

    fn view_of(request: &CapturedRequest) -> RequestView<'_> {
        RequestView::new(request)
    }

    #[test]
    fn test_gam_prefers_ad_id() {
        let request = CapturedRequest::from_start(RequestStarted::new(
            "1",
            "https://googleads.g.doubleclick.net/pagead/adview?ai=x&ad_id=123&crid=456&sz=300x250",
            "GET",
            TabId::new(1),
        ));
        let view = view_of(&request);
        assert!(is_gam_adview(&view));

        match &extract_gam_creative(&view).expect("extract")[0] {
            Finding::Creative(detail) => {
                assert_eq!(detail.creative_id.as_deref(), Some("123"));
                assert_eq!(detail.size.as_deref(), Some("300x250"));
                assert_eq!(detail.platform, CreativePlatform::GoogleAdManager);
            }
            other => panic!("expected creative, got {other:?}"),
        }
    }

    #[test]
    fn test_gam_falls_back_to_crid() {
        let request = CapturedRequest::from_start(RequestStarted::new(
            "1",
            "https://googleads.g.doubleclick.net/pagead/adview?crid=456",
            "GET",
            TabId::new(1),
        ));
        match &extract_gam_creative(&view_of(&request)).expect("extract")[0] {
            Finding::Creative(detail) => {
                assert_eq!(detail.creative_id.as_deref(), Some("456"));
                assert_eq!(detail.size, None);
            }
            other => panic!("expected creative, got {other:?}"),
        }
    }
}
