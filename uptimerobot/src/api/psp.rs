//! Public status page (PSP) API implementation

use super::common::Field;
use super::error::ApiError;
use crate::api::Client;
use serde::{Deserialize, Serialize};

/// Status page as returned by GET /psps/{id}
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Psp {
    pub id: i64,
    pub friendly_name: String,
    #[serde(default)]
    pub url_key: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub monitor_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub hide_url_links: Option<bool>,
    #[serde(default)]
    pub no_index: Option<bool>,
    #[serde(default)]
    pub ga_code: Option<String>,
    #[serde(default)]
    pub share_analytics_consent: Option<bool>,
    #[serde(default)]
    pub use_small_cookie_consent_modal: Option<bool>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub homepage_link: Option<String>,
    /// Only reported, never echoed
    #[serde(default)]
    pub is_password_set: Option<bool>,
    #[serde(default)]
    pub custom_settings: Option<CustomSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSettings {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub font: Field<Font>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub page: Field<Page>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub colors: Field<Colors>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub features: Field<Features>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub family: Field<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub layout: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub theme: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub density: Field<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub main: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub text: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub link: Field<String>,
}

/// Feature toggles. Each flag is tri-state so "not configured" never
/// turns into `false` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub show_bars: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub show_outage_updates: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub show_outage_details: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub enable_floating_status: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub show_monitor_url: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub hide_paused_monitors: Field<bool>,
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub show_cookie_bar: Field<bool>,
}

/// Request body for POST /psps and PATCH /psps/{id}
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PspPayload {
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub friendly_name: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub status: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub monitor_ids: Field<Vec<i64>>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub custom_domain: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub password: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub sort: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub hide_url_links: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub no_index: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub ga_code: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub share_analytics_consent: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub use_small_cookie_consent_modal: Field<bool>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub icon: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub logo: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub homepage_link: Field<String>,
    #[serde(skip_serializing_if = "Field::is_absent")]
    pub custom_settings: Field<CustomSettings>,
}

/// PSP API accessor
pub struct PspApi<'a> {
    client: &'a Client,
}

impl<'a> PspApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: i64) -> Result<Psp, ApiError> {
        self.client.get(&format!("/psps/{}", id)).await
    }

    pub async fn create(&self, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.client.post("/psps", payload).await
    }

    pub async fn update(&self, id: i64, payload: &PspPayload) -> Result<Psp, ApiError> {
        self.client.patch(&format!("/psps/{}", id), payload).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("/psps/{}", id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn payload_leaves_unconfigured_fields_out() {
        let payload = PspPayload {
            friendly_name: Field::Value("Status".to_string()),
            custom_domain: Field::Null,
            custom_settings: Field::Value(CustomSettings {
                features: Field::Value(Features {
                    show_bars: Field::Value(false),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "friendlyName": "Status",
                "customDomain": null,
                "customSettings": {"features": {"showBars": false}}
            })
        );
    }

    #[test]
    fn psp_decodes_sparse_response() {
        let psp: Psp = serde_json::from_value(json!({
            "id": 12,
            "friendlyName": "Status",
            "monitorIds": [1, 2],
            "customSettings": {"font": {"family": "Inter"}, "features": null}
        }))
        .unwrap();

        assert_eq!(psp.monitor_ids, Some(vec![1, 2]));
        assert!(psp.status.is_none());
        let settings = psp.custom_settings.unwrap();
        assert_eq!(
            settings.font.value().unwrap().family,
            Field::Value("Inter".to_string())
        );
        assert_eq!(settings.features, Field::Null);
        assert_eq!(settings.page, Field::Absent);
    }

    #[tokio::test]
    async fn create_posts_payload_and_decodes_psp() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/psps")
            .match_body(Matcher::Json(json!({
                "friendlyName": "Status",
                "monitorIds": [1, 2, 3]
            })))
            .with_status(201)
            .with_body(r#"{"id":99,"friendlyName":"Status","monitorIds":[1,2,3]}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let payload = PspPayload {
            friendly_name: Field::Value("Status".to_string()),
            monitor_ids: Field::Value(vec![1, 2, 3]),
            ..Default::default()
        };

        let psp = client.psps().create(&payload).await.unwrap();

        assert_eq!(psp.id, 99);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_uses_patch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/psps/5")
            .with_body(r#"{"id":5,"friendlyName":"Renamed"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let payload = PspPayload {
            friendly_name: Field::Value("Renamed".to_string()),
            ..Default::default()
        };

        let psp = client.psps().update(5, &payload).await.unwrap();

        assert_eq!(psp.friendly_name, "Renamed");
        mock.assert_async().await;
    }
}
